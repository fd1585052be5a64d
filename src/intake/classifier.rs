//! AI triage of free-text defect reports.
//!
//! The classifier never touches the store: the caller fetches the
//! historical context, classifies, then hands the result to `DefectDb::create`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use defectdesk_common::{Category, Priority};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::models::{Defect, ExtractedFields, NewDefect};
use crate::config::AiConfig;
use crate::errors::ClassifierError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const REQUIRED_FIELDS: &[&str] = &[
    "extracted_info",
    "category",
    "priority",
    "recommended_actions",
    "assigned_team",
];

/// Validated classifier output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub extracted: ExtractedFields,
    pub category: Category,
    pub priority: Priority,
    pub priority_reasoning: Option<String>,
    pub recommended_actions: Vec<String>,
    pub assigned_team: String,
    pub estimated_resolution_time: Option<String>,
}

impl Classification {
    pub fn into_new_defect(self, raw_input: String) -> NewDefect {
        NewDefect {
            raw_input,
            extracted: self.extracted,
            category: self.category,
            priority: self.priority,
            team: self.assigned_team,
            priority_reasoning: self.priority_reasoning,
            recommended_actions: self.recommended_actions,
            estimated_resolution_time: self.estimated_resolution_time,
        }
    }
}

/// Abstraction over the AI service for testability.
/// Real implementation: `AnthropicClassifier`.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `description`, using `history` (recent resolutions) as
    /// context for the recommended actions.
    async fn classify(
        &self,
        description: &str,
        history: &[Defect],
    ) -> Result<Classification, ClassifierError>;
}

/// Classifier backed by the Anthropic Messages API.
pub struct AnthropicClassifier {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    teams: Vec<String>,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClassifier {
    pub fn new(api_key: String, ai: &AiConfig, teams: Vec<String>) -> Result<Self, ClassifierError> {
        if api_key.trim().is_empty() {
            return Err(ClassifierError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ai.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/v1/messages", ai.api_url.trim_end_matches('/')),
            model: ai.model.clone(),
            max_tokens: ai.max_tokens,
            temperature: ai.temperature,
            teams,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Classifier for AnthropicClassifier {
    async fn classify(
        &self,
        description: &str,
        history: &[Defect],
    ) -> Result<Classification, ClassifierError> {
        let prompt = build_prompt(description, history, &self.teams);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: [Message {
                role: "user",
                content: &prompt,
            }],
        };

        debug!(model = %self.model, history = history.len(), "sending classification request");
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "AI service rejected classification request");
            return Err(ClassifierError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let message: MessagesResponse = resp.json().await?;
        let text = message
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| ClassifierError::MalformedResponse("no text block in reply".into()))?;
        parse_response(&text)
    }
}

/// Build the analysis prompt sent to the model.
pub fn build_prompt(description: &str, history: &[Defect], teams: &[String]) -> String {
    let mut historical = String::new();
    if !history.is_empty() {
        historical.push_str("\nHISTORICAL RESOLVED DEFECTS:\n");
        for defect in history {
            historical.push_str(&format!(
                "- {} | Category: {} | Solution: {}\n",
                defect.raw_input.trim(),
                defect.category,
                defect.resolution_notes.as_deref().unwrap_or("-"),
            ));
        }
    }

    let categories: String = Category::ALL
        .iter()
        .map(|c| format!("   - {} ({})\n", c, c.description()))
        .collect();
    let priorities: String = Priority::ALL
        .iter()
        .map(|p| format!("   - {}: {}\n", p, p.description()))
        .collect();

    format!(
        "You are an AI assistant for a manufacturing plant's defect management system.
Analyze the following defect report and provide a structured response.

DEFECT REPORT:
{description}
{historical}
Respond with a JSON object containing:

1. extracted_info: object with
   - equipment: affected equipment or machine
   - location: where in the plant (line, area, station)
   - issue: the specific problem
2. category: exactly ONE of
{categories}3. priority: exactly ONE of
{priorities}4. priority_reasoning: short explanation of the priority
5. recommended_actions: list of 3-5 concrete action steps. Prefer solutions
   that worked for the historical defects above.
6. assigned_team: one of {teams}
7. estimated_resolution_time: realistic estimate such as \"2 hours\" or \"1 day\"

RESPOND ONLY WITH VALID JSON, NO MARKDOWN, NO TEXT OUTSIDE THE JSON.
",
        description = description.trim(),
        historical = historical,
        categories = categories,
        priorities = priorities,
        teams = teams.join(", "),
    )
}

#[derive(Deserialize)]
struct RawClassification {
    extracted_info: ExtractedFields,
    category: String,
    priority: String,
    #[serde(default)]
    priority_reasoning: Option<String>,
    recommended_actions: Vec<String>,
    assigned_team: String,
    #[serde(default)]
    estimated_resolution_time: Option<String>,
}

/// Strip an optional Markdown code fence from a model reply.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parse and validate a model reply. Unknown categories or priorities and
/// missing fields are errors; nothing is defaulted.
pub fn parse_response(text: &str) -> Result<Classification, ClassifierError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ClassifierError::MalformedResponse("expected a JSON object".into()))?;
    for field in REQUIRED_FIELDS {
        if !object.contains_key(*field) {
            return Err(ClassifierError::Validation(format!(
                "Missing required field: {}",
                field
            )));
        }
    }

    let raw: RawClassification = serde_json::from_value(value)
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

    let assigned_team = raw.assigned_team.trim().to_string();
    if assigned_team.is_empty() {
        return Err(ClassifierError::Validation("assigned_team is empty".into()));
    }

    Ok(Classification {
        extracted: raw.extracted_info,
        category: Category::from_str(&raw.category)?,
        priority: Priority::from_str(&raw.priority)?,
        priority_reasoning: raw.priority_reasoning,
        recommended_actions: raw.recommended_actions,
        assigned_team,
        estimated_resolution_time: raw.estimated_resolution_time,
    })
}
