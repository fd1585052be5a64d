//! Ticket ID allocation.
//!
//! The next sequence number for a prefix+date scope is one past the highest
//! number ever issued there. "Highest" is the larger of the persisted
//! high-water mark in `ticket_sequences` and the largest suffix parsed from
//! the ticket IDs currently in `defects`. Row counts are never used: a
//! deleted or skipped record would make a count collide with a live ID.
//!
//! Allocation must run inside the same `BEGIN IMMEDIATE` transaction as the
//! insert that consumes the ID. The write lock serializes concurrent
//! allocators, and a rollback also rolls back the high-water mark.

use chrono::NaiveDate;
use defectdesk_common::{Category, TicketId};
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::{debug, warn};

use crate::errors::DefectError;

/// One initial attempt plus one retry.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 2;

/// Reserve the next ticket ID for `category` on `date`.
pub fn next_ticket_id(
    tx: &Transaction<'_>,
    category: Category,
    date: NaiveDate,
) -> Result<TicketId, DefectError> {
    let scope = TicketId::scope(category, date);

    let high_water: u32 = tx
        .query_row(
            "SELECT last_seq FROM ticket_sequences WHERE scope = ?1",
            params![scope],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    let existing = highest_existing_sequence(tx, &scope)?;
    let next = high_water.max(existing).checked_add(1).ok_or_else(|| {
        DefectError::Validation(format!("Ticket sequence exhausted for {}", scope))
    })?;

    tx.execute(
        "INSERT INTO ticket_sequences (scope, last_seq) VALUES (?1, ?2)
         ON CONFLICT(scope) DO UPDATE SET last_seq = excluded.last_seq",
        params![scope, next],
    )?;

    let id = TicketId::new(category, date, next);
    debug!(ticket_id = %id, high_water, existing, "allocated ticket id");
    Ok(id)
}

/// Largest numeric suffix among stored IDs in `scope`. Suffixes that are
/// not plain digits (hand-edited or legacy rows) are ignored.
fn highest_existing_sequence(tx: &Transaction<'_>, scope: &str) -> Result<u32, DefectError> {
    let mut stmt = tx.prepare(
        "SELECT ticket_id FROM defects WHERE substr(ticket_id, 1, length(?1)) = ?1",
    )?;
    let rows = stmt.query_map(params![scope], |row| row.get::<_, String>(0))?;

    let mut highest = 0u32;
    for row in rows {
        let ticket_id = row?;
        let suffix = &ticket_id[scope.len()..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = suffix.parse::<u32>() {
                highest = highest.max(n);
            }
        }
    }
    Ok(highest)
}

/// True when an insert failed on a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}

/// Run an allocate+insert attempt, retrying once on `AllocationConflict`.
///
/// `attempt` receives the 1-based attempt number and must roll back its own
/// transaction before returning an error. A conflict on the last attempt is
/// surfaced with the attempt count; any other error is returned untouched.
pub(crate) fn with_allocation_retry<T>(
    mut attempt: impl FnMut(u32) -> Result<T, DefectError>,
) -> Result<T, DefectError> {
    let mut n = 1;
    loop {
        match attempt(n) {
            Err(DefectError::AllocationConflict { ticket_id, .. }) if n < MAX_ALLOCATION_ATTEMPTS => {
                warn!(%ticket_id, attempt = n, "ticket id collided on insert, retrying");
                n += 1;
            }
            Err(DefectError::AllocationConflict { ticket_id, .. }) => {
                return Err(DefectError::AllocationConflict {
                    ticket_id,
                    attempts: n,
                });
            }
            other => return other,
        }
    }
}
