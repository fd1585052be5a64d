use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Category, DomainError};

const DATE_FORMAT: &str = "%Y%m%d";

/// Human-readable defect identifier: `<PREFIX>-<YYYYMMDD>-<NNN>`.
///
/// The sequence is zero-padded to three digits and widens past 999, so
/// `SAFE-20241024-1000` is valid and sorts numerically after `-999` when
/// compared through [`TicketId::sequence`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketId {
    category: Category,
    date: NaiveDate,
    sequence: u32,
}

impl TicketId {
    pub fn new(category: Category, date: NaiveDate, sequence: u32) -> Self {
        Self {
            category,
            date,
            sequence,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Everything before the sequence number, dash included
    /// (`SAFE-20241024-`). Used to scope lookups to one prefix+date.
    pub fn scope(category: Category, date: NaiveDate) -> String {
        format!("{}-{}-", category.ticket_prefix(), date.format(DATE_FORMAT))
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:03}",
            Self::scope(self.category, self.date),
            self.sequence
        )
    }
}

impl FromStr for TicketId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| DomainError::MalformedTicketId {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.trim().split('-');
        let (Some(prefix), Some(date), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed("expected PREFIX-YYYYMMDD-NNN"));
        };

        let category = Category::from_ticket_prefix(prefix)
            .map_err(|_| malformed("unknown category prefix"))?;
        if date.len() != 8 {
            return Err(malformed("date must be YYYYMMDD"));
        }
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| malformed("date must be YYYYMMDD"))?;
        if seq.len() < 3 || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("sequence must be at least three digits"));
        }
        let sequence: u32 = seq.parse().map_err(|_| malformed("sequence out of range"))?;
        if sequence == 0 {
            return Err(malformed("sequence starts at 001"));
        }

        Ok(Self::new(category, date, sequence))
    }
}

impl TryFrom<String> for TicketId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TicketId> for String {
    fn from(id: TicketId) -> Self {
        id.to_string()
    }
}
