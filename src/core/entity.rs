//! Case status and incident category enums shared across the crate

use serde::{Deserialize, Serialize};

/// Workflow status of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum CaseStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Cancelled,
}

impl CaseStatus {
    /// Every status, in lifecycle order
    pub const ALL: [CaseStatus; 4] = [
        CaseStatus::Pending,
        CaseStatus::InProgress,
        CaseStatus::Resolved,
        CaseStatus::Cancelled,
    ];

    /// Label used in the `Status` column of the table
    pub fn as_label(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "Pending",
            CaseStatus::InProgress => "In Progress",
            CaseStatus::Resolved => "Resolved",
            CaseStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether the case is closed to ordinary edits
    pub fn is_locked(&self) -> bool {
        *self == CaseStatus::Resolved
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect();
        match normalized.as_str() {
            "pending" => Ok(CaseStatus::Pending),
            "inprogress" => Ok(CaseStatus::InProgress),
            "resolved" => Ok(CaseStatus::Resolved),
            "cancelled" | "canceled" => Ok(CaseStatus::Cancelled),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Incident category chosen by the reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum IncidentType {
    Bullying,
    Fighting,
    Vandalism,
    Theft,
    Substance,
    Harassment,
    Truancy,
    #[default]
    Other,
}

impl IncidentType {
    pub const ALL: [IncidentType; 8] = [
        IncidentType::Bullying,
        IncidentType::Fighting,
        IncidentType::Vandalism,
        IncidentType::Theft,
        IncidentType::Substance,
        IncidentType::Harassment,
        IncidentType::Truancy,
        IncidentType::Other,
    ];
}

impl std::fmt::Display for IncidentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentType::Bullying => write!(f, "bullying"),
            IncidentType::Fighting => write!(f, "fighting"),
            IncidentType::Vandalism => write!(f, "vandalism"),
            IncidentType::Theft => write!(f, "theft"),
            IncidentType::Substance => write!(f, "substance"),
            IncidentType::Harassment => write!(f, "harassment"),
            IncidentType::Truancy => write!(f, "truancy"),
            IncidentType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for IncidentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bullying" => Ok(IncidentType::Bullying),
            "fighting" => Ok(IncidentType::Fighting),
            "vandalism" => Ok(IncidentType::Vandalism),
            "theft" => Ok(IncidentType::Theft),
            "substance" => Ok(IncidentType::Substance),
            "harassment" => Ok(IncidentType::Harassment),
            "truancy" => Ok(IncidentType::Truancy),
            "other" => Ok(IncidentType::Other),
            _ => Err(format!("Unknown incident type: {}", s)),
        }
    }
}
