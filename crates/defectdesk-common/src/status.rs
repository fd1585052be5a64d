//! Defect status state machine.
//!
//! ```text
//! OPEN ──> IN_PROGRESS ──> RESOLVED ──> CLOSED
//!   │           │
//!   └───────────┴──> REJECTED
//! ```
//!
//! `CLOSED` and `REJECTED` are terminal. `RESOLVED -> REJECTED` is not a
//! legal step.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
    Rejected,
}

impl DefectStatus {
    pub const ALL: [DefectStatus; 5] = [
        Self::Open,
        Self::InProgress,
        Self::Resolved,
        Self::Closed,
        Self::Rejected,
    ];

    /// Status every defect starts in.
    pub const INITIAL: DefectStatus = Self::Open;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Legal next states.
    pub fn successors(&self) -> &'static [DefectStatus] {
        match self {
            Self::Open => &[Self::InProgress, Self::Rejected],
            Self::InProgress => &[Self::Resolved, Self::Rejected],
            Self::Resolved => &[Self::Closed],
            Self::Closed | Self::Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, next: DefectStatus) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for DefectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefectStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            "CLOSED" => Ok(Self::Closed),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(DomainError::unknown("status", s)),
        }
    }
}

/// Replay `(from, to)` pairs oldest-first and return the status they end in.
///
/// The first step must be `(None, OPEN)`; each following step must start
/// where the previous one ended and be legal per the transition table.
/// An empty log replays to the initial status.
pub fn replay_history<I>(steps: I) -> Result<DefectStatus, DomainError>
where
    I: IntoIterator<Item = (Option<DefectStatus>, DefectStatus)>,
{
    let mut current: Option<DefectStatus> = None;
    for (from, to) in steps {
        let legal = match (current, from) {
            (None, None) => to == DefectStatus::INITIAL,
            (Some(cur), Some(f)) => cur == f && cur.can_transition_to(to),
            _ => false,
        };
        if !legal {
            return Err(DomainError::IllegalStep {
                from: from.map(|s| s.to_string()).unwrap_or_else(|| "null".into()),
                to,
            });
        }
        current = Some(to);
    }
    Ok(current.unwrap_or(DefectStatus::INITIAL))
}
