//! Filter enums for list-style commands

use clap::ValueEnum;

use crate::core::entity::{CaseStatus, IncidentType};

/// Status filter for list commands
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Pending only
    Pending,
    /// In Progress only
    InProgress,
    /// Resolved only
    Resolved,
    /// Cancelled only
    Cancelled,
    /// Pending and In Progress
    Open,
    /// All statuses - default
    #[default]
    All,
}

impl StatusFilter {
    /// Check if a status matches this filter
    pub fn matches(&self, status: CaseStatus) -> bool {
        match self {
            StatusFilter::Open => matches!(status, CaseStatus::Pending | CaseStatus::InProgress),
            StatusFilter::All => true,
            single => single.as_status() == Some(status),
        }
    }

    /// The one status this filter selects, if it selects exactly one
    pub fn as_status(&self) -> Option<CaseStatus> {
        match self {
            StatusFilter::Pending => Some(CaseStatus::Pending),
            StatusFilter::InProgress => Some(CaseStatus::InProgress),
            StatusFilter::Resolved => Some(CaseStatus::Resolved),
            StatusFilter::Cancelled => Some(CaseStatus::Cancelled),
            StatusFilter::Open | StatusFilter::All => None,
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusFilter::Pending => write!(f, "pending"),
            StatusFilter::InProgress => write!(f, "in-progress"),
            StatusFilter::Resolved => write!(f, "resolved"),
            StatusFilter::Cancelled => write!(f, "cancelled"),
            StatusFilter::Open => write!(f, "open"),
            StatusFilter::All => write!(f, "all"),
        }
    }
}

/// Incident type filter for list commands
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum TypeFilter {
    Bullying,
    Fighting,
    Vandalism,
    Theft,
    Substance,
    Harassment,
    Truancy,
    Other,
    /// All incident types - default
    #[default]
    All,
}

impl TypeFilter {
    pub fn as_incident_type(&self) -> Option<IncidentType> {
        match self {
            TypeFilter::Bullying => Some(IncidentType::Bullying),
            TypeFilter::Fighting => Some(IncidentType::Fighting),
            TypeFilter::Vandalism => Some(IncidentType::Vandalism),
            TypeFilter::Theft => Some(IncidentType::Theft),
            TypeFilter::Substance => Some(IncidentType::Substance),
            TypeFilter::Harassment => Some(IncidentType::Harassment),
            TypeFilter::Truancy => Some(IncidentType::Truancy),
            TypeFilter::Other => Some(IncidentType::Other),
            TypeFilter::All => None,
        }
    }

    pub fn matches(&self, incident_type: IncidentType) -> bool {
        self.as_incident_type().map_or(true, |t| t == incident_type)
    }
}
