//! Intake server command: `defectdesk serve`.

use anyhow::Result;
use defectdesk::config::DefectDeskToml;
use defectdesk::intake::server::{ServerConfig, start_server};

pub async fn cmd_serve(
    config: DefectDeskToml,
    host: Option<String>,
    port: Option<u16>,
    open: bool,
    dev: bool,
) -> Result<()> {
    let teams = config.team_seeds();
    start_server(ServerConfig {
        host: host.unwrap_or(config.server.host),
        port: port.unwrap_or(config.server.port),
        db_path: config.database.path.clone(),
        busy_timeout: config.database.busy_timeout(),
        teams,
        ai: config.ai,
        dev_mode: dev,
        open_browser: open && !dev,
    })
    .await
}
