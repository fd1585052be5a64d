use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Defect category assigned at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Mechanical,
    Electrical,
    #[serde(rename = "Quality Control")]
    QualityControl,
    Safety,
    Process,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Mechanical,
        Self::Electrical,
        Self::QualityControl,
        Self::Safety,
        Self::Process,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mechanical => "Mechanical",
            Self::Electrical => "Electrical",
            Self::QualityControl => "Quality Control",
            Self::Safety => "Safety",
            Self::Process => "Process",
        }
    }

    /// Fixed code that leads every ticket ID of this category.
    pub fn ticket_prefix(&self) -> &'static str {
        match self {
            Self::Mechanical => "MECH",
            Self::Electrical => "ELEC",
            Self::QualityControl => "QC",
            Self::Safety => "SAFE",
            Self::Process => "PROC",
        }
    }

    pub fn from_ticket_prefix(prefix: &str) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|c| c.ticket_prefix() == prefix)
            .ok_or_else(|| DomainError::unknown("ticket prefix", prefix))
    }

    /// One-line hint used in the classifier prompt.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Mechanical => "physical parts, hydraulics, pneumatics, wear",
            Self::Electrical => "wiring, circuits, sensors, power",
            Self::QualityControl => "finish, dimensions, defects in product",
            Self::Safety => "hazards, risks, PPE issues",
            Self::Process => "procedures, workflow, configuration",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    /// Accepts display names in any case, with spaces, underscores or
    /// hyphens between words ("Quality Control", "quality_control").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "mechanical" => Ok(Self::Mechanical),
            "electrical" => Ok(Self::Electrical),
            "qualitycontrol" => Ok(Self::QualityControl),
            "safety" => Ok(Self::Safety),
            "process" => Ok(Self::Process),
            _ => Err(DomainError::unknown("category", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Critical => "Immediate safety risk OR complete production halt",
            Self::High => "Significant quality impact OR multiple units affected",
            Self::Medium => "Single unit affected, workaround exists",
            Self::Low => "Minor/cosmetic issue, no production impact",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(DomainError::unknown("priority", s)),
        }
    }
}
