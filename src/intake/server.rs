use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    response::{Html, IntoResponse},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::api::{self, AppState};
use super::classifier::{AnthropicClassifier, Classifier};
use super::db::{DbHandle, DefectDb};
use super::embedded::Assets;
use super::models::TeamSeed;
use crate::config::AiConfig;

/// Configuration for the intake server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
    pub teams: Vec<TeamSeed>,
    pub ai: AiConfig,
    pub dev_mode: bool,
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            db_path: PathBuf::from("defects.db"),
            busy_timeout: Duration::from_secs(5),
            teams: TeamSeed::defaults(),
            ai: AiConfig::default(),
            dev_mode: false,
            open_browser: false,
        }
    }
}

/// Build the full application router with the API and the embedded UI.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .fallback(static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve embedded static files or fall back to index.html.
async fn static_handler(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty()
        && let Some(content) = Assets::get(path)
    {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return ([(header::CONTENT_TYPE, mime.to_string())], content.data.into_owned())
            .into_response();
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).to_string()).into_response(),
        None => (StatusCode::NOT_FOUND, "UI not found").into_response(),
    }
}

/// Build the classifier when an API key is available.
fn build_classifier(ai: &AiConfig, teams: &[TeamSeed]) -> Result<Option<Arc<dyn Classifier>>> {
    let Some(key) = ai.api_key.clone() else {
        warn!("ANTHROPIC_API_KEY not set; /api/v1/defects/report will return 503");
        return Ok(None);
    };
    let names = teams.iter().map(|t| t.name.clone()).collect();
    let classifier =
        AnthropicClassifier::new(key, ai, names).context("Failed to build AI classifier")?;
    info!(model = classifier.model(), "AI classifier ready");
    Ok(Some(Arc::new(classifier)))
}

/// Start the intake server.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    if let Some(parent) = config.db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db = DefectDb::open(&config.db_path, config.busy_timeout, &config.teams)
        .context("Failed to initialize defect database")?;
    let classifier = build_classifier(&config.ai, &config.teams)?;

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        classifier,
        history_context: config.ai.history_context,
    });

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    let url = format!("http://{}", local_addr);
    info!(%local_addr, db = %config.db_path.display(), "defectdesk listening");
    println!("DefectDesk running at {}", url);

    if config.open_browser
        && let Err(e) = open::that(&url)
    {
        warn!(error = %e, "could not open browser");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
