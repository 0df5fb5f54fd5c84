//! Case service - the façade collaborators use to submit, read and update cases
//!
//! Every call takes the acting identity explicitly. Writes go through
//! [`RecordStore::apply`]; the mutation closures here re-locate the target
//! case in each fresh snapshot and never trust a value the caller may hold.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::core::audit::{AuditError, AuditLog};
use crate::core::entity::{CaseStatus, IncidentType};
use crate::core::error::CaseError;
use crate::core::evidence::{EvidenceRef, MediaTransform};
use crate::core::identity::{CaseId, IdSource};
use crate::core::store::{receipt_landed, Mutation, RecordStore, Row, Snapshot, WriteReceipt};
use crate::core::team::Actor;
use crate::core::workflow::{CaseLifecycle, TransitionError};
use crate::entities::case::{Case, Findings, FindingsPatch, NewCase};
use crate::export::DocumentExporter;

/// Identifier regenerations allowed per snapshot before giving up
pub const MAX_ID_ATTEMPTS: usize = 3;

/// Which cases a listing should return
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub incident_type: Option<IncidentType>,
    /// Case-insensitive text search
    pub search: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &Case) -> bool {
        self.status.map_or(true, |s| case.status == s)
            && self.incident_type.map_or(true, |t| case.incident_type == t)
            && self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map_or(true, |needle| case.matches_text(needle))
    }
}

/// Officer changes to a case; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct CaseUpdate {
    pub findings: FindingsPatch,
    pub status: Option<CaseStatus>,
    pub evidence: Option<EvidenceRef>,
    /// Free text appended to the audit note
    pub note: Option<String>,
}

impl CaseUpdate {
    pub fn status(status: CaseStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_findings(mut self, findings: impl Into<FindingsPatch>) -> Self {
        self.findings = findings.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Dashboard counts
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaseSummary {
    pub total: usize,
    pub by_status: BTreeMap<CaseStatus, usize>,
    pub by_type: BTreeMap<IncidentType, usize>,
    /// Rows that could not be read as cases
    pub unreadable: usize,
}

/// Result of checking one case's audit chain
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub case_id: CaseId,
    pub entries: usize,
    pub broken_at: Option<usize>,
    pub problem: Option<String>,
}

impl AuditReport {
    pub fn is_intact(&self) -> bool {
        self.problem.is_none()
    }
}

/// Façade over the record store, lifecycle and audit log
pub struct CaseService {
    store: RecordStore,
    ids: Arc<dyn IdSource>,
    lifecycle: CaseLifecycle,
    media: Option<Arc<dyn MediaTransform>>,
}

impl CaseService {
    pub fn new(store: RecordStore, ids: Arc<dyn IdSource>) -> Self {
        Self {
            store,
            ids,
            lifecycle: CaseLifecycle::new(),
            media: None,
        }
    }

    pub fn with_media(mut self, media: Arc<dyn MediaTransform>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Run raw evidence through the media transform
    pub fn attach_evidence(
        &self,
        raw: &[u8],
        name_hint: Option<&str>,
    ) -> Result<EvidenceRef, CaseError> {
        let media = self
            .media
            .as_ref()
            .ok_or_else(|| CaseError::validation("evidence storage is not configured"))?;
        Ok(media.store(raw, name_hint)?)
    }

    /// File a new report; returns its identifier
    pub fn submit(&self, input: NewCase) -> Result<CaseId, CaseError> {
        if input.location.trim().is_empty() {
            return Err(CaseError::validation("location is required"));
        }
        if input.details.trim().is_empty() {
            return Err(CaseError::validation("details are required"));
        }

        let request_id = Ulid::new();
        let reporter = input.reporter();
        let trail = AuditLog::append(&[], &reporter, "case submitted", request_id)?;
        let created_at = trail[0].timestamp;
        let mut candidate = self.ids.next_id();

        let outcome = self.store.apply(1, |snapshot: &Snapshot| {
            let receipt = WriteReceipt {
                case_id: candidate.to_string(),
                request_id,
            };
            if receipt_landed(snapshot, &receipt) {
                debug!(case_id = %candidate, "submission already present");
                return Ok(Mutation::Unchanged(candidate.clone()));
            }

            let mut regenerated = 0;
            while snapshot.contains_id(candidate.as_str()) {
                if regenerated == MAX_ID_ATTEMPTS {
                    return Err(CaseError::integrity(format!(
                        "could not find a free case id after {} attempts (last tried {})",
                        MAX_ID_ATTEMPTS, candidate
                    )));
                }
                warn!(case_id = %candidate, "case id collision, regenerating");
                candidate = self.ids.next_id();
                regenerated += 1;
            }

            let case = Case::submitted(candidate.clone(), &input, created_at, trail.clone());
            let mut next = snapshot.clone();
            next.push(encode_row(&case)?);
            Ok(Mutation::write(
                next,
                candidate.clone(),
                WriteReceipt {
                    case_id: candidate.to_string(),
                    request_id,
                },
            ))
        });
        let case_id = outcome.map_err(|e| e.with_pending_case(&candidate))?;

        info!(case_id = %case_id, incident_type = %input.incident_type, "case submitted");
        Ok(case_id)
    }

    /// Cases matching `filter`, newest first
    pub fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, CaseError> {
        let snapshot = self.store.read()?;
        let mut cases: Vec<Case> = parse_cases(&snapshot)
            .into_iter()
            .filter(|case| filter.matches(case))
            .collect();
        cases.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.case_id.cmp(&a.case_id))
        });
        Ok(cases)
    }

    pub fn get(&self, case_id: &CaseId) -> Result<Case, CaseError> {
        let snapshot = self.store.read()?;
        find_case(&snapshot, case_id).map(|(_, case)| case)
    }

    /// Apply officer changes to a case
    ///
    /// `unlock_granted` is the result of a supervisor check made for this one
    /// call; it is never stored.
    pub fn update_findings(
        &self,
        case_id: &CaseId,
        actor: &Actor,
        update: CaseUpdate,
        unlock_granted: bool,
    ) -> Result<Case, CaseError> {
        if !actor.role.can_edit() {
            return Err(TransitionError::ReadOnlyRole.into());
        }
        if actor.name.trim().is_empty() {
            return Err(CaseError::validation("actor name is required"));
        }
        if update.status == Some(CaseStatus::Resolved) {
            let cleared = update.findings.clears_required();
            if !cleared.is_empty() {
                return Err(CaseError::validation(format!(
                    "cannot resolve without: {}",
                    cleared.join(", ")
                )));
            }
        }

        let request_id = Ulid::new();

        let updated = self.store.apply(0, |snapshot: &Snapshot| {
            let (index, current) = find_case(snapshot, case_id)?;
            if AuditLog::contains_request(&current.audit_trail, &request_id) {
                return Ok(Mutation::Unchanged(current));
            }

            let requested = update.status.unwrap_or(current.status);
            let new_findings = if update.findings.is_empty() {
                current.findings.clone()
            } else {
                update.findings.apply(&current.findings)
            };
            // Missing findings are reported ahead of the transition check;
            // a locked case still reports the lock first
            let editable = !current.status.is_locked() || unlock_granted;
            if requested == CaseStatus::Resolved && editable {
                ensure_complete(&new_findings)?;
            }
            self.lifecycle
                .validate(current.status, requested, actor.role, unlock_granted)?;
            let new_evidence = update.evidence.clone().or_else(|| current.evidence.clone());

            let mut changes = Vec::new();
            if current.status.is_locked() && unlock_granted {
                changes.push("unlocked for edit".to_string());
            }
            if requested != current.status {
                changes.push(format!("status {} → {}", current.status, requested));
            }
            if new_findings != current.findings {
                changes.push("findings updated".to_string());
            }
            if new_evidence != current.evidence {
                changes.push("evidence attached".to_string());
            }
            let note = update.note.as_deref().map(str::trim).filter(|n| !n.is_empty());

            let touched = requested != current.status
                || new_findings != current.findings
                || new_evidence != current.evidence
                || note.is_some();
            if !touched {
                debug!(case_id = %case_id, "update changes nothing");
                return Ok(Mutation::Unchanged(current));
            }
            if let Some(note) = note {
                changes.push(format!("note: {}", note));
            }

            let mut next_case = current.clone();
            next_case.status = requested;
            next_case.findings = new_findings;
            next_case.evidence = new_evidence;
            next_case.handled_by = actor.name.trim().to_string();
            next_case.audit_trail = AuditLog::append(
                &current.audit_trail,
                &actor.name,
                &changes.join("; "),
                request_id,
            )?;

            let mut next = snapshot.clone();
            next.replace(index, encode_row(&next_case)?);
            Ok(Mutation::write(
                next,
                next_case,
                WriteReceipt {
                    case_id: case_id.to_string(),
                    request_id,
                },
            ))
        })?;

        info!(
            case_id = %case_id,
            actor = %actor.name,
            status = %updated.status,
            "case updated"
        );
        Ok(updated)
    }

    /// Counts by status and incident type
    pub fn summary(&self) -> Result<CaseSummary, CaseError> {
        let snapshot = self.store.read()?;
        let cases = parse_cases(&snapshot);
        let mut summary = CaseSummary {
            total: cases.len(),
            unreadable: snapshot.len() - cases.len(),
            ..Default::default()
        };
        for status in CaseStatus::ALL {
            summary.by_status.insert(status, 0);
        }
        for case in &cases {
            *summary.by_status.entry(case.status).or_default() += 1;
            *summary.by_type.entry(case.incident_type).or_default() += 1;
        }
        Ok(summary)
    }

    /// Check the audit chain of one case
    pub fn verify_audit(&self, case_id: &CaseId) -> Result<AuditReport, CaseError> {
        let case = self.get(case_id)?;
        let (broken_at, problem) = match AuditLog::verify(&case.audit_trail) {
            Ok(()) => (None, None),
            Err(e) => {
                let index = match &e {
                    AuditError::DigestMismatch { index } | AuditError::MissingActor { index } => {
                        *index
                    }
                };
                warn!(case_id = %case_id, error = %e, "audit chain broken");
                (Some(index), Some(e.to_string()))
            }
        };
        Ok(AuditReport {
            case_id: case.case_id,
            entries: case.audit_trail.len(),
            broken_at,
            problem,
        })
    }

    /// Render a case through a document exporter
    pub fn render(
        &self,
        case_id: &CaseId,
        exporter: &dyn DocumentExporter,
    ) -> Result<Vec<u8>, CaseError> {
        let case = self.get(case_id)?;
        Ok(exporter.render(&case)?)
    }
}

fn ensure_complete(findings: &Findings) -> Result<(), CaseError> {
    let missing = findings.missing_required();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CaseError::validation(format!(
            "cannot resolve without: {}",
            missing.join(", ")
        )))
    }
}

/// Locate and parse the row for `case_id`
fn find_case(snapshot: &Snapshot, case_id: &CaseId) -> Result<(usize, Case), CaseError> {
    let index = snapshot
        .position_of(case_id.as_str())
        .ok_or_else(|| CaseError::not_found(case_id))?;
    let row = snapshot
        .get(index)
        .ok_or_else(|| CaseError::not_found(case_id))?;
    let case = Case::from_row(row).map_err(|e| {
        CaseError::integrity(format!("row for {} is unreadable: {}", case_id, e))
    })?;
    Ok((index, case))
}

fn encode_row(case: &Case) -> Result<Row, CaseError> {
    case.to_row().map_err(|e| {
        CaseError::integrity(format!("case {} cannot be encoded: {}", case.case_id, e))
    })
}

/// Every readable case in the snapshot; unreadable rows are logged and skipped
fn parse_cases(snapshot: &Snapshot) -> Vec<Case> {
    snapshot
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(index, row)| match Case::from_row(row) {
            Ok(case) => Some(case),
            Err(e) => {
                warn!(row = index, error = %e, "skipping unreadable row");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::DatedIdGenerator;
    use crate::core::store::{MemoryTable, RetryPolicy, TableBackend};
    use std::sync::Mutex;

    /// Hands out a fixed sequence of ids, then repeats the last
    struct SequenceIds(Mutex<Vec<&'static str>>);

    impl SequenceIds {
        fn new(ids: &[&'static str]) -> Self {
            let mut ids = ids.to_vec();
            ids.reverse();
            Self(Mutex::new(ids))
        }
    }

    impl IdSource for SequenceIds {
        fn next_id(&self) -> CaseId {
            let mut ids = self.0.lock().unwrap();
            let id = if ids.len() > 1 { ids.pop().unwrap() } else { ids[0] };
            CaseId::parse(id).unwrap()
        }
    }

    fn service_with(table: Arc<MemoryTable>, ids: Arc<dyn IdSource>) -> CaseService {
        CaseService::new(RecordStore::new(table, RetryPolicy::immediate(5)), ids)
    }

    fn service() -> (Arc<MemoryTable>, CaseService) {
        let table = Arc::new(MemoryTable::new());
        let service = service_with(table.clone(), Arc::new(DatedIdGenerator::default()));
        (table, service)
    }

    fn report() -> NewCase {
        NewCase::new(IncidentType::Bullying, "Building 3", "Name-calling at lunch")
    }

    fn complete_findings() -> Findings {
        Findings {
            victim: "Student A".to_string(),
            accused: "Student B".to_string(),
            witnesses: "Student C".to_string(),
            staff_investigator: "Teacher D".to_string(),
            peer_investigator: String::new(),
            statement: "Both met with counsellor; parents informed".to_string(),
        }
    }

    #[test]
    fn test_submit_creates_pending_case() {
        let (table, service) = service();
        let id = service.submit(report()).unwrap();

        let case = service.get(&id).unwrap();
        assert_eq!(case.status, CaseStatus::Pending);
        assert!(case.findings.is_empty());
        assert_eq!(case.reporter_name, "anonymous");
        assert_eq!(case.audit_trail.len(), 1);
        assert_eq!(table.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_submit_requires_location_and_details() {
        let (table, service) = service();
        let err = service
            .submit(NewCase::new(IncidentType::Other, " ", "x"))
            .unwrap_err();
        assert!(matches!(err, CaseError::Validation { .. }));
        let err = service
            .submit(NewCase::new(IncidentType::Other, "Gym", ""))
            .unwrap_err();
        assert!(matches!(err, CaseError::Validation { .. }));
        assert_eq!(table.write_count(), 0);
    }

    #[test]
    fn test_id_collision_regenerates() {
        let table = Arc::new(MemoryTable::new());
        let ids = Arc::new(SequenceIds::new(&[
            "INC-20240101-0001",
            "INC-20240101-0001",
            "INC-20240101-0002",
        ]));
        let service = service_with(table, ids);

        let first = service.submit(report()).unwrap();
        let second = service.submit(report()).unwrap();
        assert_eq!(first.as_str(), "INC-20240101-0001");
        assert_eq!(second.as_str(), "INC-20240101-0002");
    }

    #[test]
    fn test_id_collision_gives_up_after_bound() {
        let table = Arc::new(MemoryTable::new());
        let ids = Arc::new(SequenceIds::new(&["INC-20240101-0001"]));
        let service = service_with(table.clone(), ids);

        service.submit(report()).unwrap();
        let err = service.submit(report()).unwrap_err();
        assert!(matches!(err, CaseError::DataIntegrity { .. }));
        assert_eq!(table.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_update_walks_lifecycle() {
        let (_table, service) = service();
        let id = service.submit(report()).unwrap();
        let officer = Actor::officer("Officer Mali");

        let case = service
            .update_findings(&id, &officer, CaseUpdate::status(CaseStatus::InProgress), false)
            .unwrap();
        assert_eq!(case.status, CaseStatus::InProgress);
        assert_eq!(case.handled_by, "Officer Mali");

        let case = service
            .update_findings(
                &id,
                &officer,
                CaseUpdate::status(CaseStatus::Resolved).with_findings(complete_findings()),
                false,
            )
            .unwrap();
        assert_eq!(case.status, CaseStatus::Resolved);
        assert_eq!(case.audit_trail.len(), 3);
        assert!(case.audit_trail[2].note.contains("In Progress → Resolved"));
        assert!(AuditLog::verify(&case.audit_trail).is_ok());
    }

    #[test]
    fn test_resolve_with_incomplete_findings_rejected() {
        let (table, service) = service();
        let id = service.submit(report()).unwrap();
        let before = table.read_all().unwrap();
        let officer = Actor::officer("Officer Mali");

        let err = service
            .update_findings(
                &id,
                &officer,
                CaseUpdate::status(CaseStatus::Resolved).with_findings(Findings::default()),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, CaseError::Validation { .. }));
        assert_eq!(table.read_all().unwrap(), before);
    }

    #[test]
    fn test_resolve_checks_stored_findings_when_none_given() {
        let (_table, service) = service();
        let id = service.submit(report()).unwrap();
        let officer = Actor::officer("Officer Mali");
        service
            .update_findings(&id, &officer, CaseUpdate::status(CaseStatus::InProgress), false)
            .unwrap();

        let err = service
            .update_findings(&id, &officer, CaseUpdate::status(CaseStatus::Resolved), false)
            .unwrap_err();
        assert!(matches!(err, CaseError::Validation { .. }));
    }

    #[test]
    fn test_readonly_rejected_before_store_access() {
        let (table, service) = service();
        let id = service.submit(report()).unwrap();
        let writes = table.write_count();

        let err = service
            .update_findings(
                &id,
                &Actor::readonly("Viewer"),
                CaseUpdate::default().with_note("hello"),
                true,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CaseError::Transition(TransitionError::ReadOnlyRole)
        ));
        assert_eq!(table.write_count(), writes);
    }

    #[test]
    fn test_unknown_case_not_found() {
        let (_table, service) = service();
        let missing = CaseId::parse("INC-20240101-9999").unwrap();
        let err = service
            .update_findings(
                &missing,
                &Actor::officer("Officer Mali"),
                CaseUpdate::status(CaseStatus::InProgress),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, CaseError::NotFound { .. }));
        assert!(matches!(service.get(&missing), Err(CaseError::NotFound { .. })));
    }

    #[test]
    fn test_noop_update_writes_nothing() {
        let (table, service) = service();
        let id = service.submit(report()).unwrap();
        let writes = table.write_count();

        let case = service
            .update_findings(&id, &Actor::officer("Officer Mali"), CaseUpdate::default(), false)
            .unwrap();
        assert_eq!(case.audit_trail.len(), 1);
        assert_eq!(table.write_count(), writes);
    }

    #[test]
    fn test_same_status_with_changed_findings_is_audited() {
        let (_table, service) = service();
        let id = service.submit(report()).unwrap();
        let mut findings = Findings::default();
        findings.victim = "Student A".to_string();

        let case = service
            .update_findings(
                &id,
                &Actor::officer("Officer Mali"),
                CaseUpdate::status(CaseStatus::Pending).with_findings(findings),
                false,
            )
            .unwrap();
        assert_eq!(case.status, CaseStatus::Pending);
        assert_eq!(case.audit_trail.len(), 2);
        assert_eq!(case.audit_trail[1].note, "findings updated");
    }

    #[test]
    fn test_findings_patch_merges_with_stored_values() {
        let (_table, service) = service();
        let id = service.submit(report()).unwrap();
        let officer = Actor::officer("Officer Mali");

        let victim_only = FindingsPatch {
            victim: Some("Student A".to_string()),
            ..Default::default()
        };
        service
            .update_findings(&id, &officer, CaseUpdate::default().with_findings(victim_only), false)
            .unwrap();

        let accused_only = FindingsPatch {
            accused: Some("Student B".to_string()),
            ..Default::default()
        };
        let case = service
            .update_findings(&id, &officer, CaseUpdate::default().with_findings(accused_only), false)
            .unwrap();
        assert_eq!(case.findings.victim, "Student A");
        assert_eq!(case.findings.accused, "Student B");
        assert_eq!(case.audit_trail.len(), 3);
    }

    #[test]
    fn test_list_filters_and_orders() {
        let (_table, service) = service();
        let a = service.submit(report()).unwrap();
        let b = service
            .submit(NewCase::new(IncidentType::Theft, "Library", "Wallet missing"))
            .unwrap();
        service
            .update_findings(
                &b,
                &Actor::officer("Officer Mali"),
                CaseUpdate::status(CaseStatus::InProgress),
                false,
            )
            .unwrap();

        let all = service.list(&CaseFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let thefts = service
            .list(&CaseFilter {
                incident_type: Some(IncidentType::Theft),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(thefts.len(), 1);
        assert_eq!(thefts[0].case_id, b);

        let pending = service
            .list(&CaseFilter {
                status: Some(CaseStatus::Pending),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].case_id, a);

        let searched = service
            .list(&CaseFilter {
                search: Some("WALLET".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[test]
    fn test_summary_counts() {
        let (table, service) = service();
        service.submit(report()).unwrap();
        service.submit(report()).unwrap();
        let mut rows = table.read_all().unwrap();
        let mut junk = crate::core::store::Row::new();
        junk.insert("Report_ID".to_string(), "garbage".to_string());
        rows.push(junk);
        table.write_all(&rows).unwrap();

        let summary = service.summary().unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.unreadable, 1);
        assert_eq!(summary.by_status[&CaseStatus::Pending], 2);
        assert_eq!(summary.by_status[&CaseStatus::Resolved], 0);
        assert_eq!(summary.by_type[&IncidentType::Bullying], 2);
    }

    #[test]
    fn test_verify_audit_detects_tampering() {
        let (table, service) = service();
        let id = service.submit(report()).unwrap();
        assert!(service.verify_audit(&id).unwrap().is_intact());

        let mut rows = table.read_all().unwrap();
        let log = rows[0]
            .get("Audit_Log")
            .unwrap()
            .replace("case submitted", "case withdrawn");
        rows[0].insert("Audit_Log".to_string(), log);
        table.write_all(&rows).unwrap();

        let report = service.verify_audit(&id).unwrap();
        assert!(!report.is_intact());
        assert_eq!(report.broken_at, Some(0));
    }

    #[test]
    fn test_attach_evidence_requires_media() {
        let (_table, service) = service();
        assert!(matches!(
            service.attach_evidence(b"img", None),
            Err(CaseError::Validation { .. })
        ));
    }
}
