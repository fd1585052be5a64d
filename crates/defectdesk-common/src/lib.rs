//! Shared domain types for defectdesk.
//!
//! These types carry no storage or transport concerns. The server crate
//! persists them, the CLI prints them, and the classifier parses model
//! output into them.

pub mod category;
pub mod status;
pub mod ticket;

pub use category::{Category, Priority};
pub use status::{DefectStatus, replay_history};
pub use ticket::TicketId;

use thiserror::Error;

/// Errors raised while parsing or validating domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid {kind}: '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Malformed ticket ID '{value}': {reason}")]
    MalformedTicketId { value: String, reason: String },

    #[error("Illegal status step {from} -> {to}")]
    IllegalStep { from: String, to: DefectStatus },
}

impl DomainError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownValue {
            kind,
            value: value.to_string(),
        }
    }
}
