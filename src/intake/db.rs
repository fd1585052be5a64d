use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, SecondsFormat};
use defectdesk_common::{Category, DefectStatus, Priority, TicketId, replay_history};
use rusqlite::{
    Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params, params_from_iter,
};
use tracing::{debug, info};

use super::allocator::{is_unique_violation, next_ticket_id, with_allocation_retry};
use super::models::*;
use crate::errors::DefectError;

/// Longest `issue` excerpt kept from the classifier output.
const MAX_ISSUE_CHARS: usize = 200;

/// Days before the reference date covered by the summary trend.
const TREND_DAYS: u32 = 7;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DEFECT_COLUMNS: &str = "ticket_id, created_at, raw_input, equipment, location, issue, category, priority, \
     priority_reasoning, recommended_actions, assigned_team, estimated_resolution_time, status, \
     resolution_notes, resolved_at, resolved_by, actual_resolution_time_hours";

/// Async-safe handle to the defect database.
///
/// Wraps `DefectDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads. The mutex is also the in-process half of
/// write serialization; `BEGIN IMMEDIATE` covers other processes.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<DefectDb>>,
}

impl DbHandle {
    pub fn new(db: DefectDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R, DefectError>
    where
        F: FnOnce(&DefectDb) -> Result<R, DefectError> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| DefectError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. For startup code, the CLI
    /// and tests; never from a hot async path.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, DefectDb>, DefectError> {
        self.inner.lock().map_err(|_| DefectError::LockPoisoned)
    }
}

pub struct DefectDb {
    conn: Connection,
}

impl DefectDb {
    /// Open (or create) a SQLite database at the given path with default
    /// settings and the built-in team list.
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        Self::open(path, DEFAULT_BUSY_TIMEOUT, &TeamSeed::defaults())
    }

    /// Open (or create) a SQLite database, run migrations and seed `teams`
    /// if the teams table is empty.
    pub fn open(path: &Path, busy_timeout: Duration, teams: &[TeamSeed]) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        conn.busy_timeout(busy_timeout)
            .context("Failed to set busy timeout")?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .context("Failed to enable WAL journal mode")?;
        debug!(path = %path.display(), journal_mode = %mode, "opened defect database");
        let db = Self { conn };
        db.init(teams)?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> anyhow::Result<Self> {
        Self::in_memory_with_teams(&TeamSeed::defaults())
    }

    pub fn in_memory_with_teams(teams: &[TeamSeed]) -> anyhow::Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init(teams)?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn init(&self, teams: &[TeamSeed]) -> anyhow::Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        self.seed_teams(teams).context("Failed to seed teams")?;
        Ok(())
    }

    fn run_migrations(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS teams (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    team_name TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    contact_email TEXT,
                    contact_phone TEXT,
                    specialization TEXT
                );

                CREATE TABLE IF NOT EXISTS defects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_id TEXT UNIQUE NOT NULL,
                    created_at TEXT NOT NULL,
                    created_on TEXT NOT NULL,
                    raw_input TEXT NOT NULL,
                    equipment TEXT,
                    location TEXT,
                    issue TEXT,
                    category TEXT NOT NULL,
                    priority TEXT NOT NULL,
                    priority_reasoning TEXT,
                    recommended_actions TEXT NOT NULL DEFAULT '[]',
                    assigned_team TEXT NOT NULL,
                    estimated_resolution_time TEXT,
                    status TEXT NOT NULL DEFAULT 'OPEN'
                        CHECK (status IN ('OPEN', 'IN_PROGRESS', 'RESOLVED', 'CLOSED', 'REJECTED')),
                    resolution_notes TEXT,
                    resolved_at TEXT,
                    resolved_by TEXT,
                    actual_resolution_time_hours REAL
                );

                CREATE TABLE IF NOT EXISTS defect_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    defect_id INTEGER NOT NULL REFERENCES defects(id),
                    changed_at TEXT NOT NULL,
                    status_from TEXT,
                    status_to TEXT NOT NULL,
                    note TEXT,
                    changed_by TEXT
                );

                CREATE TABLE IF NOT EXISTS notifications (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    defect_id INTEGER NOT NULL REFERENCES defects(id),
                    team_name TEXT NOT NULL,
                    notification_type TEXT NOT NULL,
                    message TEXT NOT NULL,
                    sent_at TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'PENDING'
                );

                CREATE TABLE IF NOT EXISTS ticket_sequences (
                    scope TEXT PRIMARY KEY,
                    last_seq INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_defects_status ON defects(status);
                CREATE INDEX IF NOT EXISTS idx_defects_created_on ON defects(created_on);
                CREATE INDEX IF NOT EXISTS idx_history_defect ON defect_history(defect_id);
                CREATE INDEX IF NOT EXISTS idx_notifications_defect ON notifications(defect_id);

                CREATE TRIGGER IF NOT EXISTS defect_history_no_update
                BEFORE UPDATE ON defect_history
                BEGIN
                    SELECT RAISE(ABORT, 'defect_history is append-only');
                END;

                CREATE TRIGGER IF NOT EXISTS defect_history_no_delete
                BEFORE DELETE ON defect_history
                BEGIN
                    SELECT RAISE(ABORT, 'defect_history is append-only');
                END;
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    fn seed_teams(&self, teams: &[TeamSeed]) -> anyhow::Result<()> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }
        for team in teams {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO teams (team_name, contact_email, contact_phone, specialization)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        team.name,
                        team.contact_email,
                        team.contact_phone,
                        team.specialization
                    ],
                )
                .with_context(|| format!("Failed to insert team {}", team.name))?;
        }
        info!(count = teams.len(), "seeded teams");
        Ok(())
    }

    // ── Teams ─────────────────────────────────────────────────────────

    pub fn list_teams(&self) -> Result<Vec<Team>, DefectError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, team_name, contact_email, contact_phone, specialization FROM teams ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Team {
                id: row.get(0)?,
                name: row.get(1)?,
                contact_email: row.get(2)?,
                contact_phone: row.get(3)?,
                specialization: row.get(4)?,
            })
        })?;
        let mut teams = Vec::new();
        for row in rows {
            teams.push(row?);
        }
        Ok(teams)
    }

    /// Canonical team name for `name` (case-insensitive), or a
    /// validation error when no such team exists.
    fn resolve_team(conn: &Connection, name: &str) -> Result<String, DefectError> {
        conn.query_row(
            "SELECT team_name FROM teams WHERE team_name = ?1",
            params![name.trim()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| DefectError::Validation(format!("Unknown team '{}'", name)))
    }

    // ── Create ────────────────────────────────────────────────────────

    /// Store a classified defect as `OPEN` under a freshly allocated ticket.
    pub fn create(&self, new: &NewDefect) -> Result<Defect, DefectError> {
        self.create_at(new, Local::now())
    }

    /// [`create`](Self::create) with an explicit creation instant, which
    /// also fixes the ticket date.
    pub fn create_at(&self, new: &NewDefect, at: DateTime<Local>) -> Result<Defect, DefectError> {
        if new.raw_input.trim().is_empty() {
            return Err(DefectError::Validation("raw_input must not be empty".into()));
        }
        let date = at.date_naive();
        let created_at = timestamp(at);

        let ticket_id = with_allocation_retry(|attempt| {
            let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
            let team = Self::resolve_team(&tx, &new.team)?;
            let ticket_id = next_ticket_id(&tx, new.category, date)?;

            let defect_id = match insert_defect(&tx, &ticket_id, new, &team, &created_at) {
                Ok(id) => id,
                Err(e) if is_unique_violation(&e) => {
                    return Err(DefectError::AllocationConflict {
                        ticket_id: ticket_id.to_string(),
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e.into()),
            };

            append_history(
                &tx,
                defect_id,
                None,
                DefectStatus::INITIAL,
                Some("Defect reported and categorized"),
                Some("System"),
                &created_at,
            )?;
            insert_notification(
                &tx,
                defect_id,
                &team,
                NotificationKind::NewDefect,
                &format!("New {} priority defect: {}", new.priority, ticket_id),
                &created_at,
            )?;
            tx.commit()?;
            Ok(ticket_id)
        })?;

        info!(
            ticket_id = %ticket_id,
            category = %new.category,
            priority = %new.priority,
            "defect created"
        );
        self.get(&ticket_id.to_string())
    }

    // ── Transitions ───────────────────────────────────────────────────

    /// Move a defect to `to`, appending one history entry.
    pub fn transition(
        &self,
        ticket_id: &str,
        to: DefectStatus,
        note: Option<&str>,
        actor: Option<&str>,
    ) -> Result<Defect, DefectError> {
        self.transition_at(ticket_id, to, note, actor, Local::now())
    }

    pub fn transition_at(
        &self,
        ticket_id: &str,
        to: DefectStatus,
        note: Option<&str>,
        actor: Option<&str>,
        at: DateTime<Local>,
    ) -> Result<Defect, DefectError> {
        let note = non_blank(note);
        let actor = non_blank(actor);
        let changed_at = timestamp(at);

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let (defect_id, current, team, created_at): (i64, String, String, String) = tx
            .query_row(
                "SELECT id, status, assigned_team, created_at FROM defects WHERE ticket_id = ?1",
                params![ticket_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?
            .ok_or_else(|| not_found(ticket_id))?;
        let from = DefectStatus::from_str(&current)?;

        if !from.can_transition_to(to) {
            return Err(DefectError::InvalidTransition {
                ticket_id: ticket_id.to_string(),
                from,
                to,
            });
        }

        match to {
            DefectStatus::Resolved => {
                let hours = DateTime::parse_from_rfc3339(&created_at)
                    .ok()
                    .map(|created| hours_between(created.with_timezone(&Local), at));
                tx.execute(
                    "UPDATE defects SET status = ?1, resolved_at = ?2, resolved_by = ?3,
                        resolution_notes = COALESCE(?4, resolution_notes),
                        actual_resolution_time_hours = ?5
                     WHERE id = ?6",
                    params![to.as_str(), changed_at, actor, note, hours, defect_id],
                )?;
            }
            DefectStatus::Rejected => {
                tx.execute(
                    "UPDATE defects SET status = ?1, resolution_notes = COALESCE(?2, resolution_notes)
                     WHERE id = ?3",
                    params![to.as_str(), note, defect_id],
                )?;
            }
            _ => {
                tx.execute(
                    "UPDATE defects SET status = ?1 WHERE id = ?2",
                    params![to.as_str(), defect_id],
                )?;
            }
        }

        append_history(&tx, defect_id, Some(from), to, note, actor, &changed_at)?;
        insert_notification(
            &tx,
            defect_id,
            &team,
            NotificationKind::StatusUpdate,
            &format!("Status changed from {} to {}", from, to),
            &changed_at,
        )?;
        tx.commit()?;

        info!(ticket_id, %from, %to, actor = actor.unwrap_or("-"), "defect transitioned");
        self.get(ticket_id)
    }

    /// Correct category, priority or team. The ticket ID is left as issued.
    pub fn correct_classification(
        &self,
        ticket_id: &str,
        correction: &ClassificationCorrection,
    ) -> Result<Defect, DefectError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let defect_id = defect_id(&tx, ticket_id)?;

        if let Some(category) = correction.category {
            tx.execute(
                "UPDATE defects SET category = ?1 WHERE id = ?2",
                params![category.as_str(), defect_id],
            )?;
        }
        if let Some(priority) = correction.priority {
            tx.execute(
                "UPDATE defects SET priority = ?1 WHERE id = ?2",
                params![priority.as_str(), defect_id],
            )?;
        }
        if let Some(team) = &correction.team {
            let team = Self::resolve_team(&tx, team)?;
            tx.execute(
                "UPDATE defects SET assigned_team = ?1 WHERE id = ?2",
                params![team, defect_id],
            )?;
        }
        tx.commit()?;

        info!(ticket_id, ?correction, "classification corrected");
        self.get(ticket_id)
    }

    // ── Reads ─────────────────────────────────────────────────────────

    pub fn get(&self, ticket_id: &str) -> Result<Defect, DefectError> {
        self.find(ticket_id)?.ok_or_else(|| not_found(ticket_id))
    }

    pub fn find(&self, ticket_id: &str) -> Result<Option<Defect>, DefectError> {
        let sql = format!("SELECT {} FROM defects WHERE ticket_id = ?1", DEFECT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![ticket_id], read_defect_row)
            .optional()?;
        row.map(DefectRow::into_defect).transpose()
    }

    /// Defects matching `filter`, newest first.
    pub fn list(&self, filter: &DefectFilter) -> Result<Vec<Defect>, DefectError> {
        let mut sql = format!("SELECT {} FROM defects WHERE 1 = 1", DEFECT_COLUMNS);
        let mut values: Vec<String> = Vec::new();
        let mut push = |clause: &str, value: String| {
            values.push(value);
            sql.push_str(&format!(" AND {} ?{}", clause, values.len()));
        };

        if let Some(category) = filter.category {
            push("category =", category.as_str().to_string());
        }
        if let Some(priority) = filter.priority {
            push("priority =", priority.as_str().to_string());
        }
        if let Some(status) = filter.status {
            push("status =", status.as_str().to_string());
        }
        if let Some(team) = &filter.team {
            push("assigned_team COLLATE NOCASE =", team.trim().to_string());
        }
        if let Some(from) = filter.created_from {
            push("created_on >=", from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = filter.created_to {
            push("created_on <=", to.format("%Y-%m-%d").to_string());
        }
        sql.push_str(" ORDER BY id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), read_defect_row)?;
        let mut defects = Vec::new();
        for row in rows {
            defects.push(row?.into_defect()?);
        }
        Ok(defects)
    }

    /// Status history for a defect, oldest first.
    pub fn history(&self, ticket_id: &str) -> Result<Vec<HistoryEntry>, DefectError> {
        let defect_id = defect_id(&self.conn, ticket_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, status_from, status_to, changed_at, note, changed_by
             FROM defect_history WHERE defect_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![defect_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let ticket: TicketId = ticket_id.parse()?;
        let mut entries = Vec::new();
        for row in rows {
            let (id, from, to, changed_at, note, changed_by) = row?;
            entries.push(HistoryEntry {
                id,
                ticket_id: ticket.clone(),
                status_from: from.as_deref().map(DefectStatus::from_str).transpose()?,
                status_to: DefectStatus::from_str(&to)?,
                changed_at,
                note,
                changed_by,
            });
        }
        Ok(entries)
    }

    pub fn notifications(&self, ticket_id: &str) -> Result<Vec<Notification>, DefectError> {
        let defect_id = defect_id(&self.conn, ticket_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, team_name, notification_type, message, sent_at, status
             FROM notifications WHERE defect_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![defect_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let ticket: TicketId = ticket_id.parse()?;
        let mut notifications = Vec::new();
        for row in rows {
            let (id, team, kind, message, sent_at, status) = row?;
            notifications.push(Notification {
                id,
                ticket_id: ticket.clone(),
                team,
                kind: NotificationKind::from_str(&kind).map_err(DefectError::Validation)?,
                message,
                sent_at,
                status,
            });
        }
        Ok(notifications)
    }

    /// Counts over current records. Every known status, priority, category
    /// and team is present, with zero when nothing matches.
    pub fn summary(&self) -> Result<Summary, DefectError> {
        self.summary_as_of(Local::now().date_naive())
    }

    /// [`summary`](Self::summary) with the trend window ending at `today`.
    pub fn summary_as_of(&self, today: NaiveDate) -> Result<Summary, DefectError> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM defects", [], |row| row.get(0))?;

        let zeroed = |keys: Vec<String>| -> BTreeMap<String, i64> {
            keys.into_iter().map(|k| (k, 0)).collect()
        };
        let mut summary = Summary {
            total,
            by_status: zeroed(DefectStatus::ALL.iter().map(|s| s.as_str().to_string()).collect()),
            by_priority: zeroed(Priority::ALL.iter().map(|p| p.as_str().to_string()).collect()),
            by_category: zeroed(Category::ALL.iter().map(|c| c.as_str().to_string()).collect()),
            by_team: zeroed(self.list_teams()?.into_iter().map(|t| t.name).collect()),
            recent_trend: Vec::new(),
        };

        for (column, counts) in [
            ("status", &mut summary.by_status),
            ("priority", &mut summary.by_priority),
            ("category", &mut summary.by_category),
            ("assigned_team", &mut summary.by_team),
        ] {
            let sql = format!("SELECT {0}, COUNT(*) FROM defects GROUP BY {0}", column);
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                let (key, count) = row?;
                counts.insert(key, count);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT created_on, COUNT(*) FROM defects
             WHERE created_on >= date(?1, ?2)
             GROUP BY created_on
             ORDER BY created_on",
        )?;
        let window = format!("-{} days", TREND_DAYS);
        let rows = stmt.query_map(params![today.format("%Y-%m-%d").to_string(), window], |row| {
            Ok(DailyCount {
                date: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        summary.recent_trend = rows.collect::<Result<_, _>>()?;
        Ok(summary)
    }

    /// Most recent resolved or closed defects that carry resolution notes.
    pub fn recent_resolutions(&self, limit: u32) -> Result<Vec<Defect>, DefectError> {
        let sql = format!(
            "SELECT {} FROM defects
             WHERE status IN ('RESOLVED', 'CLOSED') AND resolution_notes IS NOT NULL
             ORDER BY id DESC LIMIT ?1",
            DEFECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], read_defect_row)?;
        let mut defects = Vec::new();
        for row in rows {
            defects.push(row?.into_defect()?);
        }
        Ok(defects)
    }

    /// Replay every defect's history and report the ones whose log does not
    /// end at their stored status.
    pub fn verify_history(&self) -> Result<Vec<HistoryMismatch>, DefectError> {
        let mut stmt = self
            .conn
            .prepare("SELECT ticket_id, status FROM defects ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut mismatches = Vec::new();
        for row in rows {
            let (ticket_id, stored) = row?;
            let steps: Vec<_> = self
                .history(&ticket_id)?
                .into_iter()
                .map(|e| (e.status_from, e.status_to))
                .collect();
            let detail = match replay_history(steps) {
                Ok(replayed) if replayed.as_str() == stored => continue,
                Ok(replayed) => format!("history ends at {} but record says {}", replayed, stored),
                Err(e) => e.to_string(),
            };
            mismatches.push(HistoryMismatch { ticket_id, detail });
        }
        Ok(mismatches)
    }
}

// ── Row helpers ───────────────────────────────────────────────────────

fn not_found(ticket_id: &str) -> DefectError {
    DefectError::NotFound {
        ticket_id: ticket_id.to_string(),
    }
}

fn defect_id(conn: &Connection, ticket_id: &str) -> Result<i64, DefectError> {
    conn.query_row(
        "SELECT id FROM defects WHERE ticket_id = ?1",
        params![ticket_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| not_found(ticket_id))
}

fn timestamp(at: DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, false)
}

fn hours_between(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
    let hours = (to - from).num_seconds() as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn insert_defect(
    tx: &Transaction<'_>,
    ticket_id: &TicketId,
    new: &NewDefect,
    team: &str,
    created_at: &str,
) -> rusqlite::Result<i64> {
    let issue = new
        .extracted
        .issue
        .as_deref()
        .map(|i| i.chars().take(MAX_ISSUE_CHARS).collect::<String>());
    let actions = serde_json::to_string(&new.recommended_actions)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    tx.execute(
        "INSERT INTO defects (
            ticket_id, created_at, created_on, raw_input, equipment, location, issue,
            category, priority, priority_reasoning, recommended_actions,
            assigned_team, estimated_resolution_time, status
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            ticket_id.to_string(),
            created_at,
            ticket_id.date().format("%Y-%m-%d").to_string(),
            new.raw_input,
            new.extracted.equipment,
            new.extracted.location,
            issue,
            new.category.as_str(),
            new.priority.as_str(),
            new.priority_reasoning,
            actions,
            team,
            new.estimated_resolution_time,
            DefectStatus::INITIAL.as_str(),
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

fn append_history(
    tx: &Transaction<'_>,
    defect_id: i64,
    from: Option<DefectStatus>,
    to: DefectStatus,
    note: Option<&str>,
    actor: Option<&str>,
    changed_at: &str,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO defect_history (defect_id, changed_at, status_from, status_to, note, changed_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            defect_id,
            changed_at,
            from.map(|s| s.as_str()),
            to.as_str(),
            note,
            actor
        ],
    )?;
    Ok(())
}

fn insert_notification(
    tx: &Transaction<'_>,
    defect_id: i64,
    team: &str,
    kind: NotificationKind,
    message: &str,
    sent_at: &str,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO notifications (defect_id, team_name, notification_type, message, sent_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5, 'SENT')",
        params![defect_id, team, kind.as_str(), message, sent_at],
    )?;
    Ok(())
}

/// Intermediate row struct for defects.
struct DefectRow {
    ticket_id: String,
    created_at: String,
    raw_input: String,
    equipment: Option<String>,
    location: Option<String>,
    issue: Option<String>,
    category: String,
    priority: String,
    priority_reasoning: Option<String>,
    recommended_actions: String,
    assigned_team: String,
    estimated_resolution_time: Option<String>,
    status: String,
    resolution_notes: Option<String>,
    resolved_at: Option<String>,
    resolved_by: Option<String>,
    actual_resolution_time_hours: Option<f64>,
}

fn read_defect_row(row: &Row<'_>) -> rusqlite::Result<DefectRow> {
    Ok(DefectRow {
        ticket_id: row.get(0)?,
        created_at: row.get(1)?,
        raw_input: row.get(2)?,
        equipment: row.get(3)?,
        location: row.get(4)?,
        issue: row.get(5)?,
        category: row.get(6)?,
        priority: row.get(7)?,
        priority_reasoning: row.get(8)?,
        recommended_actions: row.get(9)?,
        assigned_team: row.get(10)?,
        estimated_resolution_time: row.get(11)?,
        status: row.get(12)?,
        resolution_notes: row.get(13)?,
        resolved_at: row.get(14)?,
        resolved_by: row.get(15)?,
        actual_resolution_time_hours: row.get(16)?,
    })
}

impl DefectRow {
    fn into_defect(self) -> Result<Defect, DefectError> {
        let recommended_actions: Vec<String> = serde_json::from_str(&self.recommended_actions)
            .context("Failed to parse recommended_actions JSON")?;
        Ok(Defect {
            ticket_id: self.ticket_id.parse()?,
            created_at: self.created_at,
            raw_input: self.raw_input,
            extracted: ExtractedFields {
                equipment: self.equipment,
                location: self.location,
                issue: self.issue,
            },
            category: Category::from_str(&self.category)?,
            priority: Priority::from_str(&self.priority)?,
            priority_reasoning: self.priority_reasoning,
            recommended_actions,
            assigned_team: self.assigned_team,
            estimated_resolution_time: self.estimated_resolution_time,
            status: DefectStatus::from_str(&self.status)?,
            resolution_notes: self.resolution_notes,
            resolved_at: self.resolved_at,
            resolved_by: self.resolved_by,
            actual_resolution_time_hours: self.actual_resolution_time_hours,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
