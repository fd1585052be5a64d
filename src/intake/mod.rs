//! Defect intake back-end.
//!
//! ## Overview
//!
//! Free-text defect reports are triaged by an AI classifier, stored under a
//! category- and date-scoped ticket ID, and then moved through a fixed
//! lifecycle. Every status change appends one row to an append-only history
//! and one notification for the assigned team.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │  (UI/CLI)│ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘          │         │                                        │
//!                       │         │ Classifier::classify()                  │
//!                       │         v                                        │
//!                       │  classifier.rs  (Classifier trait, Anthropic)    │
//!                       │         │                                        │
//!                       │         │ DefectDb::create() / transition()      │
//!                       │         v                                        │
//!                       │  db.rs  (DbHandle, schema, lifecycle store)      │
//!                       │         └─ allocator.rs  (ticket IDs)            │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module      | Responsibility                                         |
//! |-------------|--------------------------------------------------------|
//! | `models`    | Shared types: `Defect`, `NewDefect`, `HistoryEntry`    |
//! | `embedded`  | Statically embeds the intake UI (`rust-embed`)         |
//!
//! ## Typical Request Flow (`POST /api/v1/defects/report`)
//!
//! 1. `api::report_defect` loads recent resolutions for prompt context.
//! 2. The classifier returns category, priority, team and extracted fields.
//!    Nothing is stored if classification fails.
//! 3. `DefectDb::create` opens a `BEGIN IMMEDIATE` transaction, allocates
//!    the ticket ID, inserts the record with its first history entry and a
//!    `NEW_DEFECT` notification, and commits.

pub mod allocator;
pub mod api;
pub mod classifier;
pub mod db;
pub mod embedded;
pub mod models;
pub mod server;
