use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate};
use defectdesk_common::{Category, DefectStatus, Priority};
use serde::Deserialize;
use tracing::{error, warn};

use super::classifier::Classifier;
use super::db::DbHandle;
#[cfg(test)]
use super::db::DefectDb;
use super::models::{ClassificationCorrection, DefectDetail, DefectFilter, NewDefect};
use crate::errors::{ClassifierError, DefectError};

const DEFAULT_ACTOR: &str = "API User";

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub classifier: Option<Arc<dyn Classifier>>,
    /// Recent resolutions passed to the classifier as context
    pub history_context: u32,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReportRequest {
    pub description: String,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
    pub note: Option<String>,
    pub actor: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub team: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn into_filter(self) -> Result<DefectFilter, ApiError> {
        fn parse<T: FromStr>(value: Option<String>) -> Result<Option<T>, ApiError>
        where
            T::Err: std::fmt::Display,
        {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| T::from_str(v.trim()).map_err(|e| ApiError::BadRequest(e.to_string())))
                .transpose()
        }
        fn date(value: Option<String>) -> Result<Option<NaiveDate>, ApiError> {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| {
                    NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").map_err(|_| {
                        ApiError::BadRequest(format!("Invalid date '{}': expected YYYY-MM-DD", v))
                    })
                })
                .transpose()
        }

        Ok(DefectFilter {
            status: parse::<DefectStatus>(self.status)?,
            priority: parse::<Priority>(self.priority)?,
            category: parse::<Category>(self.category)?,
            team: self.team.filter(|t| !t.trim().is_empty()),
            created_from: date(self.from)?,
            created_to: date(self.to)?,
            limit: self.limit,
        })
    }
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<DefectError> for ApiError {
    fn from(err: DefectError) -> Self {
        let msg = err.to_string();
        match err {
            DefectError::NotFound { .. } => ApiError::NotFound(msg),
            DefectError::InvalidTransition { .. } | DefectError::AllocationConflict { .. } => {
                ApiError::Conflict(msg)
            }
            DefectError::Validation(_) => ApiError::BadRequest(msg),
            DefectError::Database(_) | DefectError::LockPoisoned | DefectError::Other(_) => {
                error!(error = %msg, "defect store failure");
                ApiError::Internal(msg)
            }
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        let msg = err.to_string();
        match err {
            ClassifierError::NotConfigured => ApiError::Unavailable(msg),
            _ => {
                warn!(error = %msg, "classification failed");
                ApiError::BadGateway(msg)
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/api/v1/defects/report", post(report_defect))
        .route("/api/v1/defects", get(list_defects).post(create_defect))
        .route(
            "/api/v1/defects/{ticket_id}",
            get(get_defect).patch(correct_defect),
        )
        .route("/api/v1/defects/{ticket_id}/status", put(update_status))
        .route("/api/v1/defects/{ticket_id}/history", get(get_history))
        .route(
            "/api/v1/defects/{ticket_id}/notifications",
            get(get_notifications),
        )
        .route("/api/v1/analytics/summary", get(get_summary))
        .route("/api/v1/teams", get(list_teams))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn service_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "defectdesk",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "report": "POST /api/v1/defects/report",
            "defects": "GET /api/v1/defects",
            "summary": "GET /api/v1/analytics/summary",
            "teams": "GET /api/v1/teams",
            "health": "GET /health"
        }
    }))
}

async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let database = match state.db.call(|db| db.list_teams()).await {
        Ok(_) => "connected",
        Err(e) => {
            error!(error = %e, "health check could not reach the database");
            "error"
        }
    };
    let ai_agent = if state.classifier.is_some() {
        "ready"
    } else {
        "not configured"
    };
    Json(serde_json::json!({
        "status": if database == "connected" { "healthy" } else { "degraded" },
        "timestamp": Local::now().to_rfc3339(),
        "database": database,
        "ai_agent": ai_agent,
    }))
}

async fn report_defect(
    State(state): State<SharedState>,
    Json(req): Json<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let description = req.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::BadRequest("description must not be empty".into()));
    }
    let classifier = state
        .classifier
        .clone()
        .ok_or(ClassifierError::NotConfigured)?;

    let limit = state.history_context;
    let history = state.db.call(move |db| db.recent_resolutions(limit)).await?;
    let classification = classifier.classify(&description, &history).await?;

    let new = classification.into_new_defect(description);
    let defect = state.db.call(move |db| db.create(&new)).await?;
    Ok((StatusCode::CREATED, Json(defect)))
}

async fn create_defect(
    State(state): State<SharedState>,
    Json(new): Json<NewDefect>,
) -> Result<impl IntoResponse, ApiError> {
    let defect = state.db.call(move |db| db.create(&new)).await?;
    Ok((StatusCode::CREATED, Json(defect)))
}

async fn list_defects(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter()?;
    let defects = state.db.call(move |db| db.list(&filter)).await?;
    Ok(Json(serde_json::json!({
        "count": defects.len(),
        "defects": defects,
    })))
}

async fn get_defect(
    State(state): State<SharedState>,
    Path(ticket_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .db
        .call(move |db| {
            Ok(DefectDetail {
                defect: db.get(&ticket_id)?,
                history: db.history(&ticket_id)?,
            })
        })
        .await?;
    Ok(Json(detail))
}

async fn correct_defect(
    State(state): State<SharedState>,
    Path(ticket_id): Path<String>,
    Json(correction): Json<ClassificationCorrection>,
) -> Result<impl IntoResponse, ApiError> {
    if correction.is_empty() {
        return Err(ApiError::BadRequest(
            "Provide at least one of category, priority or team".into(),
        ));
    }
    let defect = state
        .db
        .call(move |db| db.correct_classification(&ticket_id, &correction))
        .await?;
    Ok(Json(defect))
}

async fn update_status(
    State(state): State<SharedState>,
    Path(ticket_id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status =
        DefectStatus::from_str(&req.status).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let note = req.note;
    let actor = req.actor.unwrap_or_else(|| DEFAULT_ACTOR.to_string());
    let defect = state
        .db
        .call(move |db| db.transition(&ticket_id, status, note.as_deref(), Some(actor.as_str())))
        .await?;
    Ok(Json(defect))
}

async fn get_history(
    State(state): State<SharedState>,
    Path(ticket_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.db.call(move |db| db.history(&ticket_id)).await?;
    Ok(Json(history))
}

async fn get_notifications(
    State(state): State<SharedState>,
    Path(ticket_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state.db.call(move |db| db.notifications(&ticket_id)).await?;
    Ok(Json(notifications))
}

async fn get_summary(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let summary = state.db.call(|db| db.summary()).await?;
    Ok(Json(summary))
}

async fn list_teams(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let teams = state.db.call(|db| db.list_teams()).await?;
    Ok(Json(serde_json::json!({
        "count": teams.len(),
        "teams": teams,
    })))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::classifier::Classification;
    use crate::intake::models::{Defect, ExtractedFields};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Returns a fixed classification and records the history it was given.
    struct FixedClassifier {
        seen_history: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(
            &self,
            _description: &str,
            history: &[Defect],
        ) -> Result<Classification, ClassifierError> {
            self.seen_history.lock().unwrap().push(history.len());
            Ok(Classification {
                extracted: ExtractedFields {
                    equipment: Some("Robot arm".into()),
                    location: Some("Cell 7".into()),
                    issue: Some("Gripper slipping".into()),
                },
                category: Category::Mechanical,
                priority: Priority::High,
                priority_reasoning: Some("Multiple units affected".into()),
                recommended_actions: vec!["Replace gripper pads".into()],
                assigned_team: "Maintenance".into(),
                estimated_resolution_time: Some("3 hours".into()),
            })
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl Classifier for BrokenClassifier {
        async fn classify(&self, _: &str, _: &[Defect]) -> Result<Classification, ClassifierError> {
            Err(ClassifierError::MalformedResponse("not json".into()))
        }
    }

    fn app_with(classifier: Option<Arc<dyn Classifier>>) -> Router {
        let db = DefectDb::new_in_memory().unwrap();
        let state = Arc::new(AppState {
            db: DbHandle::new(db),
            classifier,
            history_context: 5,
        });
        api_router().with_state(state)
    }

    fn test_app() -> Router {
        app_with(None)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn safety_payload() -> serde_json::Value {
        serde_json::json!({
            "raw_input": "Emergency stop on Line 2 does not latch",
            "extracted": {"equipment": "E-stop", "location": "Line 2", "issue": "Does not latch"},
            "category": "Safety",
            "priority": "CRITICAL",
            "team": "Safety",
            "recommended_actions": ["Lock out line", "Replace E-stop switch"]
        })
    }

    /// Create a defect through the API and return its ticket ID.
    async fn create(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/defects", safety_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let defect: serde_json::Value = body_json(response.into_body()).await;
        defect["ticket_id"].as_str().unwrap().to_string()
    }

    async fn set_status(app: &Router, ticket: &str, status: &str) -> Response {
        app.clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/defects/{}/status", ticket),
                serde_json::json!({"status": status, "note": "via test", "actor": "tester"}),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["database"], "connected");
        assert_eq!(health["ai_agent"], "not configured");
    }

    #[tokio::test]
    async fn test_service_info() {
        let response = test_app().oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let info: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(info["service"], "defectdesk");
    }

    #[tokio::test]
    async fn test_create_defect_returns_201_with_ticket() {
        let app = test_app();
        let response = app
            .oneshot(json_request("POST", "/api/v1/defects", safety_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let defect: serde_json::Value = body_json(response.into_body()).await;
        let ticket = defect["ticket_id"].as_str().unwrap();
        let today = Local::now().format("%Y%m%d").to_string();
        assert_eq!(ticket, format!("SAFE-{}-001", today));
        assert_eq!(defect["status"], "OPEN");
        assert_eq!(defect["priority"], "CRITICAL");
        assert_eq!(defect["location"], "Line 2");
    }

    #[tokio::test]
    async fn test_create_defect_with_unknown_team_is_400() {
        let mut payload = safety_payload();
        payload["team"] = "Marketing".into();
        let response = test_app()
            .oneshot(json_request("POST", "/api/v1/defects", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().contains("Marketing"));
    }

    #[tokio::test]
    async fn test_get_unknown_defect_is_404() {
        let app = test_app();
        for uri in [
            "/api/v1/defects/SAFE-20241024-999",
            "/api/v1/defects/SAFE-20241024-999/history",
            "/api/v1/defects/SAFE-20241024-999/notifications",
        ] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
        let response = set_status(&app, "SAFE-20241024-999", "IN_PROGRESS").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_defect_includes_history() {
        let app = test_app();
        let ticket = create(&app).await;

        let response = app
            .oneshot(get_request(&format!("/api/v1/defects/{}", ticket)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let detail: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(detail["ticket_id"], ticket.as_str());
        assert_eq!(detail["history"].as_array().unwrap().len(), 1);
        assert_eq!(detail["history"][0]["status_to"], "OPEN");
    }

    #[tokio::test]
    async fn test_lifecycle_and_illegal_transition_is_409() {
        let app = test_app();
        let ticket = create(&app).await;

        for status in ["IN_PROGRESS", "RESOLVED", "CLOSED"] {
            let response = set_status(&app, &ticket, status).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", status);
        }

        let response = set_status(&app, &ticket, "OPEN").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().contains("CLOSED -> OPEN"));

        let response = app
            .clone()
            .oneshot(get_request(&format!("/api/v1/defects/{}/history", ticket)))
            .await
            .unwrap();
        let history: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[3]["changed_by"], "tester");
    }

    #[tokio::test]
    async fn test_unknown_status_value_is_400() {
        let app = test_app();
        let ticket = create(&app).await;
        let response = set_status(&app, &ticket, "ESCALATED").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_defaults_actor() {
        let app = test_app();
        let ticket = create(&app).await;
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/defects/{}/status", ticket),
                serde_json::json!({"status": "in progress"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_request(&format!("/api/v1/defects/{}/history", ticket)))
            .await
            .unwrap();
        let history: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(history[1]["changed_by"], DEFAULT_ACTOR);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let app = test_app();
        let first = create(&app).await;
        create(&app).await;
        set_status(&app, &first, "REJECTED").await;

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/defects?status=REJECTED"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["defects"][0]["ticket_id"], first.as_str());

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/defects?category=Safety&limit=1"))
            .await
            .unwrap();
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["count"], 1);

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/defects?priority=URGENT"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get_request("/api/v1/defects?from=yesterday"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_correct_classification() {
        let app = test_app();
        let ticket = create(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/v1/defects/{}", ticket),
                serde_json::json!({"priority": "MEDIUM", "team": "Engineering"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let defect: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(defect["ticket_id"], ticket.as_str());
        assert_eq!(defect["priority"], "MEDIUM");
        assert_eq!(defect["assigned_team"], "Engineering");

        let response = app
            .oneshot(json_request(
                "PATCH",
                &format!("/api/v1/defects/{}", ticket),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summary_and_teams() {
        let app = test_app();
        create(&app).await;

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/analytics/summary"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(summary["total"], 1);
        assert_eq!(summary["by_status"]["OPEN"], 1);
        assert_eq!(summary["recent_trend"].as_array().map(Vec::len), Some(1));
        assert_eq!(summary["recent_trend"][0]["count"], 1);
        assert_eq!(summary["by_status"]["CLOSED"], 0);
        assert_eq!(summary["by_category"]["Safety"], 1);

        let response = app.oneshot(get_request("/api/v1/teams")).await.unwrap();
        let teams: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(teams["count"], 5);
        assert_eq!(teams["teams"][0]["name"], "Maintenance");
    }

    #[tokio::test]
    async fn test_notifications_endpoint() {
        let app = test_app();
        let ticket = create(&app).await;
        set_status(&app, &ticket, "IN_PROGRESS").await;

        let response = app
            .oneshot(get_request(&format!("/api/v1/defects/{}/notifications", ticket)))
            .await
            .unwrap();
        let notifications: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0]["kind"], "NEW_DEFECT");
        assert_eq!(notifications[1]["kind"], "STATUS_UPDATE");
    }

    #[tokio::test]
    async fn test_report_without_classifier_is_503() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/api/v1/defects/report",
                serde_json::json!({"description": "Robot gripper slipping"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_report_classifies_then_creates() {
        let classifier = Arc::new(FixedClassifier {
            seen_history: Mutex::new(Vec::new()),
        });
        let app = app_with(Some(classifier.clone()));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/defects/report",
                serde_json::json!({"description": "Robot arm in cell 7 keeps dropping parts"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let defect: serde_json::Value = body_json(response.into_body()).await;
        assert!(defect["ticket_id"].as_str().unwrap().starts_with("MECH-"));
        assert_eq!(defect["assigned_team"], "Maintenance");
        assert_eq!(defect["raw_input"], "Robot arm in cell 7 keeps dropping parts");
        assert_eq!(*classifier.seen_history.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_report_with_failing_classifier_is_502_and_stores_nothing() {
        let app = app_with(Some(Arc::new(BrokenClassifier)));
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/defects/report",
                serde_json::json!({"description": "Strange noise"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = app.oneshot(get_request("/api/v1/defects")).await.unwrap();
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_report_rejects_blank_description() {
        let app = app_with(Some(Arc::new(BrokenClassifier)));
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/defects/report",
                serde_json::json!({"description": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
