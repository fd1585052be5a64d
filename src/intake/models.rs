use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use defectdesk_common::{Category, DefectStatus, Priority, TicketId};
use serde::{Deserialize, Serialize};

/// Fields the classifier pulled out of the free-text report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
}

/// A classified report, ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDefect {
    pub raw_input: String,
    #[serde(default)]
    pub extracted: ExtractedFields,
    pub category: Category,
    pub priority: Priority,
    pub team: String,
    #[serde(default)]
    pub priority_reasoning: Option<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(default)]
    pub estimated_resolution_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    pub ticket_id: TicketId,
    pub created_at: String,
    pub raw_input: String,
    #[serde(flatten)]
    pub extracted: ExtractedFields,
    pub category: Category,
    pub priority: Priority,
    pub priority_reasoning: Option<String>,
    pub recommended_actions: Vec<String>,
    pub assigned_team: String,
    pub estimated_resolution_time: Option<String>,
    pub status: DefectStatus,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
    pub actual_resolution_time_hours: Option<f64>,
}

/// One append-only row of `defect_history`. `status_from` is `None` only
/// for the creation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub ticket_id: TicketId,
    pub status_from: Option<DefectStatus>,
    pub status_to: DefectStatus,
    pub changed_at: String,
    pub note: Option<String>,
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub specialization: Option<String>,
}

/// Team definition as written in `defectdesk.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSeed {
    pub name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
}

impl TeamSeed {
    fn new(name: &str, email: &str, phone: &str, specialization: &str) -> Self {
        Self {
            name: name.to_string(),
            contact_email: Some(email.to_string()),
            contact_phone: Some(phone.to_string()),
            specialization: Some(specialization.to_string()),
        }
    }

    /// Teams seeded when the config lists none.
    pub fn defaults() -> Vec<TeamSeed> {
        vec![
            Self::new("Maintenance", "maintenance@plant.com", "+1-555-0101", "Mechanical repairs"),
            Self::new("Quality Control", "qc@plant.com", "+1-555-0102", "Quality assurance"),
            Self::new("Safety", "safety@plant.com", "+1-555-0103", "Safety systems"),
            Self::new("Engineering", "engineering@plant.com", "+1-555-0104", "Technical design"),
            Self::new("Production", "production@plant.com", "+1-555-0105", "Production operations"),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewDefect,
    StatusUpdate,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewDefect => "NEW_DEFECT",
            Self::StatusUpdate => "STATUS_UPDATE",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW_DEFECT" => Ok(Self::NewDefect),
            "STATUS_UPDATE" => Ok(Self::StatusUpdate),
            _ => Err(format!("Invalid notification type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub ticket_id: TicketId,
    pub team: String,
    pub kind: NotificationKind,
    pub message: String,
    pub sent_at: String,
    pub status: String,
}

/// Read-only filter for `list`. Unset fields do not constrain; the date
/// range is inclusive on the local creation date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefectFilter {
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub status: Option<DefectStatus>,
    pub team: Option<String>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

/// Partial correction of the classifier's output. The ticket ID never
/// changes, even when the category does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationCorrection {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub team: Option<String>,
}

impl ClassificationCorrection {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.priority.is_none() && self.team.is_none()
    }
}

/// Defects created on one calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
    pub by_team: BTreeMap<String, i64>,
    /// Days with at least one new defect in the trailing window, oldest first.
    #[serde(default)]
    pub recent_trend: Vec<DailyCount>,
}

impl Summary {
    pub fn status_count(&self, status: DefectStatus) -> i64 {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }

    pub fn priority_count(&self, priority: Priority) -> i64 {
        self.by_priority.get(priority.as_str()).copied().unwrap_or(0)
    }
}

/// A defect whose stored status disagrees with its replayed history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryMismatch {
    pub ticket_id: String,
    pub detail: String,
}

// API view types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectDetail {
    #[serde(flatten)]
    pub defect: Defect,
    pub history: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defect_deserializes_with_defaults() {
        let json = serde_json::json!({
            "raw_input": "Conveyor belt squealing",
            "category": "Mechanical",
            "priority": "LOW",
            "team": "Maintenance"
        });
        let new: NewDefect = serde_json::from_value(json).unwrap();
        assert_eq!(new.category, Category::Mechanical);
        assert_eq!(new.extracted, ExtractedFields::default());
        assert!(new.recommended_actions.is_empty());
    }

    #[test]
    fn test_new_defect_rejects_unknown_category() {
        let json = serde_json::json!({
            "raw_input": "x",
            "category": "Unknown",
            "priority": "LOW",
            "team": "Maintenance"
        });
        assert!(serde_json::from_value::<NewDefect>(json).is_err());
    }

    #[test]
    fn test_default_teams_cover_every_routing_option() {
        let names: Vec<String> = TeamSeed::defaults().into_iter().map(|t| t.name).collect();
        for expected in ["Maintenance", "Quality Control", "Safety", "Engineering", "Production"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_correction_is_empty() {
        assert!(ClassificationCorrection::default().is_empty());
        let c = ClassificationCorrection {
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert!(!c.is_empty());
    }

    #[test]
    fn test_notification_kind_round_trip_strings() {
        for kind in [NotificationKind::NewDefect, NotificationKind::StatusUpdate] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("PAGE".parse::<NotificationKind>().is_err());
    }
}
