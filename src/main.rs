use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use defectdesk::config::load_config;
use defectdesk::telemetry;
use defectdesk_common::{Category, DefectStatus, Priority};
use std::path::PathBuf;
use tracing::warn;

mod cmd;

#[derive(Parser)]
#[command(name = "defectdesk")]
#[command(version, about = "Manufacturing defect intake, triage and tracking")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to defectdesk.toml (default: ./defectdesk.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file. Overrides the config file and DEFECTDESK_DB_PATH.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and web UI
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Open the UI in a browser once the server is listening
        #[arg(long)]
        open: bool,

        /// Allow cross-origin requests (for UI development)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and seed teams
    Init,
    /// Database health overview
    Check,
    /// Report a defect. Classified by AI unless category, priority and team are all given.
    Report {
        description: String,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        team: Option<String>,
    },
    /// List defects, newest first
    List {
        #[arg(long)]
        status: Option<DefectStatus>,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        team: Option<String>,

        /// Earliest creation date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest creation date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Show one defect with its history
    Show { ticket: String },
    /// Move a defect to a new status
    Status {
        ticket: String,

        status: DefectStatus,

        #[arg(short, long)]
        note: Option<String>,

        #[arg(long)]
        actor: Option<String>,
    },
    /// List teams
    Teams,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(path) = &cli.db_path {
        config.database.path = path.clone();
    }

    // One-shot commands stay quiet unless asked; the server logs at the
    // configured level.
    let mut logging = config.logging.clone();
    if !matches!(cli.command, Commands::Serve { .. }) && !cli.verbose {
        logging.level = "warn".to_string();
    }
    let _log_guard = telemetry::init_tracing(&logging, cli.verbose)?;

    for warning in config.validate() {
        warn!("{}", warning);
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            open,
            dev,
        } => cmd::cmd_serve(config, host, port, open, dev).await?,
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::Check => cmd::cmd_check(&config)?,
        Commands::Report {
            description,
            category,
            priority,
            team,
        } => cmd::cmd_report(&config, description, category, priority, team).await?,
        Commands::List {
            status,
            priority,
            category,
            team,
            from,
            to,
            limit,
        } => {
            let filter = defectdesk::intake::models::DefectFilter {
                category,
                priority,
                status,
                team,
                created_from: from,
                created_to: to,
                limit: Some(limit),
            };
            cmd::cmd_list(&config, &filter)?
        }
        Commands::Show { ticket } => cmd::cmd_show(&config, &ticket)?,
        Commands::Status {
            ticket,
            status,
            note,
            actor,
        } => cmd::cmd_status(&config, &ticket, status, note.as_deref(), actor.as_deref())?,
        Commands::Teams => cmd::cmd_teams(&config)?,
    }

    Ok(())
}
