//! Typed error hierarchy for defectdesk.
//!
//! Two top-level enums cover the two failure domains:
//! - `DefectError`: ticket allocation and lifecycle store failures
//! - `ClassifierError`: AI classification failures

use defectdesk_common::{DefectStatus, DomainError};
use thiserror::Error;

/// Errors from the ticket allocator and the defect lifecycle store.
#[derive(Debug, Error)]
pub enum DefectError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Illegal transition for {ticket_id}: {from} -> {to}")]
    InvalidTransition {
        ticket_id: String,
        from: DefectStatus,
        to: DefectStatus,
    },

    #[error("Defect {ticket_id} not found")]
    NotFound { ticket_id: String },

    #[error("Ticket {ticket_id} was allocated twice; giving up after {attempts} attempts")]
    AllocationConflict { ticket_id: String, attempts: u32 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DomainError> for DefectError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Errors from the AI classification collaborator.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("AI classifier not configured; set ANTHROPIC_API_KEY")]
    NotConfigured,

    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("AI response was not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("AI response rejected: {0}")]
    Validation(String),
}

impl From<DomainError> for ClassifierError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defect_error_not_found_carries_ticket() {
        let err = DefectError::NotFound {
            ticket_id: "SAFE-20241024-001".into(),
        };
        match &err {
            DefectError::NotFound { ticket_id } => assert_eq!(ticket_id, "SAFE-20241024-001"),
            _ => panic!("Expected NotFound"),
        }
        assert!(err.to_string().contains("SAFE-20241024-001"));
    }

    #[test]
    fn defect_error_invalid_transition_names_both_states() {
        let err = DefectError::InvalidTransition {
            ticket_id: "MECH-20241024-003".into(),
            from: DefectStatus::Closed,
            to: DefectStatus::Open,
        };
        let msg = err.to_string();
        assert!(msg.contains("CLOSED -> OPEN"), "{}", msg);
    }

    #[test]
    fn domain_errors_become_validation_errors() {
        let domain = "Unknown".parse::<defectdesk_common::Category>().unwrap_err();
        let err: DefectError = domain.into();
        assert!(matches!(err, DefectError::Validation(ref m) if m.contains("Unknown")));

        let domain = "URGENT".parse::<defectdesk_common::Priority>().unwrap_err();
        let err: ClassifierError = domain.into();
        assert!(matches!(err, ClassifierError::Validation(_)));
    }

    #[test]
    fn defect_error_converts_from_rusqlite() {
        let err: DefectError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DefectError::Database(_)));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&DefectError::LockPoisoned);
        assert_std_error(&ClassifierError::NotConfigured);
    }
}
