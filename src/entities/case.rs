//! Case entity and its table-row mapping

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::audit::AuditEntry;
use crate::core::entity::{CaseStatus, IncidentType};
use crate::core::evidence::EvidenceRef;
use crate::core::identity::{CaseId, IdParseError};
use crate::core::store::Row;

/// Reporter name used when a submission is anonymous
pub const ANONYMOUS: &str = "anonymous";

/// Column names in the external table
pub mod columns {
    pub const REPORT_ID: &str = "Report_ID";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const REPORTER: &str = "Reporter";
    pub const INCIDENT_TYPE: &str = "Incident_Type";
    pub const LOCATION: &str = "Location";
    pub const DETAILS: &str = "Details";
    pub const STATUS: &str = "Status";
    pub const VICTIM: &str = "Victim";
    pub const ACCUSED: &str = "Accused";
    pub const WITNESSES: &str = "Witnesses";
    pub const STAFF_INVESTIGATOR: &str = "Staff_Investigator";
    pub const PEER_INVESTIGATOR: &str = "Peer_Investigator";
    pub const STATEMENT: &str = "Action_Details";
    pub const HANDLED_BY: &str = "Handled_By";
    pub const EVIDENCE: &str = "Evidence";
    pub const AUDIT_LOG: &str = "Audit_Log";

    /// Known columns in the order they are written
    pub const ALL: [&str; 16] = [
        REPORT_ID,
        TIMESTAMP,
        REPORTER,
        INCIDENT_TYPE,
        LOCATION,
        DETAILS,
        STATUS,
        VICTIM,
        ACCUSED,
        WITNESSES,
        STAFF_INVESTIGATOR,
        PEER_INVESTIGATOR,
        STATEMENT,
        HANDLED_BY,
        EVIDENCE,
        AUDIT_LOG,
    ];
}

/// Why a table row could not be read as a case
#[derive(Debug, Error)]
pub enum RowError {
    #[error("row has no {} value", columns::REPORT_ID)]
    MissingId,

    #[error("invalid case id: {0}")]
    BadId(#[from] IdParseError),

    #[error("{0}")]
    BadStatus(String),

    #[error("{0}")]
    BadIncidentType(String),

    #[error("unreadable timestamp '{0}'")]
    BadTimestamp(String),

    #[error("unreadable audit log: {0}")]
    BadAuditLog(#[from] serde_json::Error),
}

/// Investigation findings recorded by officers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub victim: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub accused: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub witnesses: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub staff_investigator: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub peer_investigator: String,
    /// Action taken / closing statement
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub statement: String,
}

impl Findings {
    /// Names of required fields that are still blank
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("victim", &self.victim),
            ("accused", &self.accused),
            ("staff_investigator", &self.staff_investigator),
            ("statement", &self.statement),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Complete enough to resolve the case
    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        *self == Findings::default()
    }

    /// Copy with surrounding whitespace trimmed from every field
    pub fn trimmed(&self) -> Findings {
        Findings {
            victim: self.victim.trim().to_string(),
            accused: self.accused.trim().to_string(),
            witnesses: self.witnesses.trim().to_string(),
            staff_investigator: self.staff_investigator.trim().to_string(),
            peer_investigator: self.peer_investigator.trim().to_string(),
            statement: self.statement.trim().to_string(),
        }
    }
}

/// Per-field findings changes; `None` leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingsPatch {
    pub victim: Option<String>,
    pub accused: Option<String>,
    pub witnesses: Option<String>,
    pub staff_investigator: Option<String>,
    pub peer_investigator: Option<String>,
    pub statement: Option<String>,
}

impl FindingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == FindingsPatch::default()
    }

    /// Result of applying the patch to `current`, trimmed
    pub fn apply(&self, current: &Findings) -> Findings {
        let pick = |patch: &Option<String>, stored: &String| {
            patch.as_deref().unwrap_or(stored).trim().to_string()
        };
        Findings {
            victim: pick(&self.victim, &current.victim),
            accused: pick(&self.accused, &current.accused),
            witnesses: pick(&self.witnesses, &current.witnesses),
            staff_investigator: pick(&self.staff_investigator, &current.staff_investigator),
            peer_investigator: pick(&self.peer_investigator, &current.peer_investigator),
            statement: pick(&self.statement, &current.statement),
        }
    }

    /// Required fields this patch explicitly clears
    pub fn clears_required(&self) -> Vec<&'static str> {
        [
            ("victim", &self.victim),
            ("accused", &self.accused),
            ("staff_investigator", &self.staff_investigator),
            ("statement", &self.statement),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_some_and(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }
}

/// Replace every field
impl From<Findings> for FindingsPatch {
    fn from(findings: Findings) -> Self {
        Self {
            victim: Some(findings.victim),
            accused: Some(findings.accused),
            witnesses: Some(findings.witnesses),
            staff_investigator: Some(findings.staff_investigator),
            peer_investigator: Some(findings.peer_investigator),
            statement: Some(findings.statement),
        }
    }
}

/// Fields a reporter supplies with a submission
#[derive(Debug, Clone, Default)]
pub struct NewCase {
    pub reporter_name: Option<String>,
    pub incident_type: IncidentType,
    pub location: String,
    pub details: String,
    pub evidence: Option<EvidenceRef>,
}

impl NewCase {
    pub fn new(incident_type: IncidentType, location: &str, details: &str) -> Self {
        Self {
            incident_type,
            location: location.to_string(),
            details: details.to_string(),
            ..Default::default()
        }
    }

    pub fn with_reporter(mut self, name: impl Into<String>) -> Self {
        self.reporter_name = Some(name.into());
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceRef) -> Self {
        self.evidence = Some(evidence);
        self
    }

    /// Reporter name to record, falling back to anonymous
    pub fn reporter(&self) -> String {
        self.reporter_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(ANONYMOUS)
            .to_string()
    }
}

/// One incident report and its investigation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: CaseId,
    pub created_at: DateTime<Utc>,
    pub reporter_name: String,
    pub incident_type: IncidentType,
    pub location: String,
    pub details: String,
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Findings::is_empty")]
    pub findings: Findings,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub handled_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceRef>,
    #[serde(default)]
    pub audit_trail: Vec<AuditEntry>,
    /// Columns this crate does not know about, kept verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Case {
    /// Build a freshly submitted case
    pub fn submitted(
        case_id: CaseId,
        input: &NewCase,
        created_at: DateTime<Utc>,
        audit_trail: Vec<AuditEntry>,
    ) -> Self {
        Self {
            case_id,
            created_at,
            reporter_name: input.reporter(),
            incident_type: input.incident_type,
            location: input.location.trim().to_string(),
            details: input.details.trim().to_string(),
            status: CaseStatus::Pending,
            findings: Findings::default(),
            handled_by: String::new(),
            evidence: input.evidence.clone(),
            audit_trail,
            extra: BTreeMap::new(),
        }
    }

    /// Read a case from a table row
    pub fn from_row(row: &Row) -> Result<Self, RowError> {
        let get = |key: &str| row.get(key).map(String::as_str).unwrap_or_default();

        let raw_id = get(columns::REPORT_ID).trim();
        if raw_id.is_empty() {
            return Err(RowError::MissingId);
        }
        let case_id = CaseId::parse(raw_id)?;

        let status = match get(columns::STATUS).trim() {
            "" => CaseStatus::Pending,
            s => s.parse().map_err(RowError::BadStatus)?,
        };
        let incident_type = match get(columns::INCIDENT_TYPE).trim() {
            "" => IncidentType::Other,
            s => s.parse().map_err(RowError::BadIncidentType)?,
        };

        let created_at = parse_timestamp(get(columns::TIMESTAMP))?;

        let audit_raw = get(columns::AUDIT_LOG).trim();
        let audit_trail = if audit_raw.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(audit_raw)?
        };

        let evidence = Some(get(columns::EVIDENCE).trim())
            .filter(|s| !s.is_empty())
            .map(EvidenceRef::new);

        let reporter_name = match get(columns::REPORTER).trim() {
            "" => ANONYMOUS.to_string(),
            s => s.to_string(),
        };

        let extra = row
            .iter()
            .filter(|(k, _)| !columns::ALL.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            case_id,
            created_at,
            reporter_name,
            incident_type,
            location: get(columns::LOCATION).to_string(),
            details: get(columns::DETAILS).to_string(),
            status,
            findings: Findings {
                victim: get(columns::VICTIM).to_string(),
                accused: get(columns::ACCUSED).to_string(),
                witnesses: get(columns::WITNESSES).to_string(),
                staff_investigator: get(columns::STAFF_INVESTIGATOR).to_string(),
                peer_investigator: get(columns::PEER_INVESTIGATOR).to_string(),
                statement: get(columns::STATEMENT).to_string(),
            },
            handled_by: get(columns::HANDLED_BY).to_string(),
            evidence,
            audit_trail,
            extra,
        })
    }

    /// Write the case as a table row, unknown columns included
    pub fn to_row(&self) -> Result<Row, RowError> {
        let audit_log = serde_json::to_string(&self.audit_trail)?;
        let mut row: Row = self.extra.clone();
        let mut put = |key: &str, value: String| {
            row.insert(key.to_string(), value);
        };

        put(columns::REPORT_ID, self.case_id.to_string());
        put(
            columns::TIMESTAMP,
            self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        put(columns::REPORTER, self.reporter_name.clone());
        put(columns::INCIDENT_TYPE, self.incident_type.to_string());
        put(columns::LOCATION, self.location.clone());
        put(columns::DETAILS, self.details.clone());
        put(columns::STATUS, self.status.as_label().to_string());
        put(columns::VICTIM, self.findings.victim.clone());
        put(columns::ACCUSED, self.findings.accused.clone());
        put(columns::WITNESSES, self.findings.witnesses.clone());
        put(
            columns::STAFF_INVESTIGATOR,
            self.findings.staff_investigator.clone(),
        );
        put(
            columns::PEER_INVESTIGATOR,
            self.findings.peer_investigator.clone(),
        );
        put(columns::STATEMENT, self.findings.statement.clone());
        put(columns::HANDLED_BY, self.handled_by.clone());
        put(
            columns::EVIDENCE,
            self.evidence
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default(),
        );
        put(columns::AUDIT_LOG, audit_log);
        Ok(row)
    }

    /// Case-insensitive match against id, location, details and people involved
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            self.case_id.as_str(),
            &self.location,
            &self.details,
            &self.reporter_name,
            &self.findings.victim,
            &self.findings.accused,
            &self.handled_by,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Parse RFC 3339, or a legacy local `YYYY-MM-DD HH:MM:SS` timestamp
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RowError> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| RowError::BadTimestamp(raw.to_string()))
}
