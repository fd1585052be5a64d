//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `serve`         | `Serve`                                            |
//! | `check`         | `Init`, `Check`                                    |
//! | `defects`       | `Report`, `List`, `Show`, `Status`, `Teams`        |

pub mod check;
pub mod defects;
pub mod serve;

pub use check::{cmd_check, cmd_init};
pub use defects::{cmd_list, cmd_report, cmd_show, cmd_status, cmd_teams};
pub use serve::cmd_serve;

use anyhow::{Context, Result};
use defectdesk::config::DefectDeskToml;
use defectdesk::intake::db::DefectDb;

/// Open the configured database, creating parent directories as needed.
pub(crate) fn open_db(config: &DefectDeskToml) -> Result<DefectDb> {
    let path = &config.database.path;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    DefectDb::open(path, config.database.busy_timeout(), &config.team_seeds())
}
