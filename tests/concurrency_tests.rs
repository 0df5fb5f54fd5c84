//! Concurrent writers against a table that behaves like a shared spreadsheet
//!
//! `SimulatedTable` rejects a write from any thread whose last read is stale,
//! and can inject random read failures, rejected writes and writes that land
//! but report failure.

use casebook::core::{
    Actor, AuditLog, BackendError, CaseError, CaseId, CaseService, CaseUpdate, IdSource,
    IncidentType, RecordStore, RetryPolicy, Row, TableBackend,
};
use casebook::entities::{Case, NewCase};
use miette::Diagnostic;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

#[derive(Default)]
struct TableState {
    rows: Vec<Row>,
    version: u64,
    last_read: HashMap<ThreadId, u64>,
}

struct SimulatedTable {
    state: Mutex<TableState>,
    rng: Mutex<StdRng>,
    /// Failure probability per call, in percent
    fault_pct: AtomicU32,
    writes: AtomicUsize,
    /// Fail this many upcoming reads regardless of `fault_pct`
    fail_next_reads: AtomicUsize,
    /// Apply this many upcoming writes but report them as failed
    ghost_next_writes: AtomicUsize,
}

impl SimulatedTable {
    fn new(seed: u64) -> Self {
        Self {
            state: Mutex::new(TableState::default()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            fault_pct: AtomicU32::new(0),
            writes: AtomicUsize::new(0),
            fail_next_reads: AtomicUsize::new(0),
            ghost_next_writes: AtomicUsize::new(0),
        }
    }

    fn set_fault_pct(&self, pct: u32) {
        self.fault_pct.store(pct, Ordering::SeqCst);
    }

    fn roll(&self) -> bool {
        let pct = self.fault_pct.load(Ordering::SeqCst);
        pct > 0 && self.rng.lock().unwrap().random_range(0..100) < pct
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn rows(&self) -> Vec<Row> {
        self.state.lock().unwrap().rows.clone()
    }

    fn cases(&self) -> Vec<Case> {
        self.rows()
            .iter()
            .map(|row| Case::from_row(row).unwrap())
            .collect()
    }
}

impl TableBackend for SimulatedTable {
    fn read_all(&self) -> Result<Vec<Row>, BackendError> {
        if Self::take(&self.fail_next_reads) || self.roll() {
            return Err(BackendError::Unavailable("simulated read timeout".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        let version = state.version;
        state.last_read.insert(thread::current().id(), version);
        Ok(state.rows.clone())
    }

    fn write_all(&self, rows: &[Row]) -> Result<(), BackendError> {
        if self.roll() {
            return Err(BackendError::Unavailable("simulated write timeout".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        let seen = state.last_read.get(&thread::current().id()).copied();
        if seen != Some(state.version) {
            return Err(BackendError::Conflict(format!(
                "stale write (read v{:?}, table at v{})",
                seen, state.version
            )));
        }
        state.rows = rows.to_vec();
        state.version += 1;
        self.writes.fetch_add(1, Ordering::SeqCst);

        if Self::take(&self.ghost_next_writes) || self.roll() {
            return Err(BackendError::Unavailable(
                "connection dropped after write".to_string(),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "simulated".to_string()
    }
}

/// Ids from a shared counter, never repeating
struct CounterIds(AtomicU32);

impl IdSource for CounterIds {
    fn next_id(&self) -> CaseId {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        CaseId::parse(&format!("INC-20240101-{:04}", n)).unwrap()
    }
}

fn service_over(table: Arc<SimulatedTable>, max_attempts: u32) -> CaseService {
    CaseService::new(
        RecordStore::new(table, RetryPolicy::immediate(max_attempts)),
        Arc::new(CounterIds(AtomicU32::new(1))),
    )
}

fn report(details: &str) -> NewCase {
    NewCase::new(IncidentType::Other, "Main hall", details)
}

#[derive(Debug)]
enum Outcome {
    Submitted(CaseId),
    Noted(String),
    GaveUp,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_no_lost_updates(
        threads in 2usize..5,
        ops in 1usize..6,
        fault_pct in 0u32..25,
        seed in any::<u64>(),
    ) {
        let table = Arc::new(SimulatedTable::new(seed));
        let service = service_over(table.clone(), 40);
        let shared = service.submit(report("shared case")).unwrap();
        table.set_fault_pct(fault_pct);

        let outcomes: Vec<Outcome> = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    let service = &service;
                    let shared = &shared;
                    scope.spawn(move || {
                        let actor = Actor::officer(format!("officer {}", t));
                        let mut done = Vec::new();
                        for op in 0..ops {
                            if op % 2 == 0 {
                                match service.submit(report(&format!("t{} op{}", t, op))) {
                                    Ok(id) => done.push(Outcome::Submitted(id)),
                                    Err(CaseError::TransientStore { .. }) => done.push(Outcome::GaveUp),
                                    Err(e) => panic!("unexpected submit error: {}", e),
                                }
                            } else {
                                let marker = format!("t{} op{}", t, op);
                                let update = CaseUpdate::default().with_note(marker.clone());
                                match service.update_findings(shared, &actor, update, false) {
                                    Ok(_) => done.push(Outcome::Noted(marker)),
                                    Err(CaseError::TransientStore { .. }) => done.push(Outcome::GaveUp),
                                    Err(e) => panic!("unexpected update error: {}", e),
                                }
                            }
                        }
                        done
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        let cases = table.cases();
        let by_id: BTreeMap<String, &Case> =
            cases.iter().map(|c| (c.case_id.to_string(), c)).collect();

        // No duplicate rows
        prop_assert_eq!(by_id.len(), cases.len());
        // Never more rows than submissions attempted
        let attempted = 1 + threads * ops.div_ceil(2);
        prop_assert!(cases.len() <= attempted);
        // With every outcome known, the count is exact
        let gave_up = outcomes.iter().any(|o| matches!(o, Outcome::GaveUp));
        if !gave_up {
            prop_assert_eq!(cases.len(), attempted);
        }
        if fault_pct == 0 {
            prop_assert!(!gave_up, "gave up without injected faults");
        }

        let shared_case = by_id[shared.as_str()];
        for outcome in &outcomes {
            match outcome {
                Outcome::Submitted(id) => {
                    prop_assert!(by_id.contains_key(id.as_str()), "lost submission {}", id);
                }
                Outcome::Noted(marker) => {
                    let needle = format!("note: {}", marker);
                    let hits = shared_case
                        .audit_trail
                        .iter()
                        .filter(|e| e.note == needle)
                        .count();
                    prop_assert_eq!(hits, 1, "note {:?} landed {} times", marker, hits);
                }
                Outcome::GaveUp => {}
            }
        }

        // Even abandoned requests never land twice
        for case in &cases {
            prop_assert!(AuditLog::verify(&case.audit_trail).is_ok());
            let mut requests: Vec<_> = case.audit_trail.iter().map(|e| e.request_id).collect();
            requests.sort();
            requests.dedup();
            prop_assert_eq!(requests.len(), case.audit_trail.len());
        }
    }
}

#[test]
fn test_unknown_outcome_submission_not_duplicated() {
    let table = Arc::new(SimulatedTable::new(7));
    let service = service_over(table.clone(), 5);

    // The write lands but reports failure; the retry must recognise it
    table.ghost_next_writes.store(1, Ordering::SeqCst);
    let id = service.submit(report("window broken")).unwrap();

    let cases = table.cases();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].case_id, id);
    assert_eq!(table.writes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_outcome_after_verification_read_failure() {
    let table = Arc::new(SimulatedTable::new(11));
    let id = service_over(table.clone(), 5)
        .submit(report("first"))
        .unwrap();
    let writes_before = table.writes.load(Ordering::SeqCst);

    let flaky = Arc::new(FailAfterWrite::new(table.clone()));
    let service = CaseService::new(
        RecordStore::new(flaky, RetryPolicy::immediate(5)),
        Arc::new(CounterIds(AtomicU32::new(100))),
    );
    let actor = Actor::officer("Officer Mali");
    let case = service
        .update_findings(&id, &actor, CaseUpdate::default().with_note("called parents"), false)
        .unwrap();

    assert_eq!(case.audit_trail.len(), 2);
    assert_eq!(table.writes.load(Ordering::SeqCst), writes_before + 1);
    let stored = table.cases();
    assert_eq!(stored[0].audit_trail.len(), 2);
    assert_eq!(stored[0].audit_trail[1].note, "note: called parents");
}

#[test]
fn test_unknown_outcome_out_of_budget_is_transient() {
    let table = Arc::new(SimulatedTable::new(3));
    let service = service_over(table.clone(), 1);

    table.ghost_next_writes.store(1, Ordering::SeqCst);
    let err = service.submit(report("first")).unwrap_err();
    assert!(matches!(err, CaseError::TransientStore { attempts: 1, .. }));

    // The caller was told it failed, but the row is there exactly once
    let cases = table.cases();
    assert_eq!(cases.len(), 1);

    // ...and is pointed at the id to look up rather than told to resubmit
    let message = err.to_string();
    assert!(message.contains(cases[0].case_id.as_str()), "{}", message);
    let help = err.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("may still have been saved"), "{}", help);
    assert!(!help.contains("nothing was saved"));
}

#[test]
fn test_unreachable_table_gives_up_without_writing() {
    let table = Arc::new(SimulatedTable::new(5));
    let service = service_over(table.clone(), 3);

    table.fail_next_reads.store(100, Ordering::SeqCst);
    let err = service.submit(report("second")).unwrap_err();
    assert!(matches!(err, CaseError::TransientStore { attempts: 3, .. }));

    table.fail_next_reads.store(0, Ordering::SeqCst);
    assert!(table.cases().is_empty());
    assert_eq!(table.writes.load(Ordering::SeqCst), 0);
}

/// Fails the first read after each successful write
struct FailAfterWrite {
    inner: Arc<SimulatedTable>,
    armed: Mutex<bool>,
}

impl FailAfterWrite {
    fn new(inner: Arc<SimulatedTable>) -> Self {
        Self {
            inner,
            armed: Mutex::new(false),
        }
    }
}

impl TableBackend for FailAfterWrite {
    fn read_all(&self) -> Result<Vec<Row>, BackendError> {
        let mut armed = self.armed.lock().unwrap();
        if *armed {
            *armed = false;
            return Err(BackendError::Unavailable("verification read timed out".to_string()));
        }
        drop(armed);
        self.inner.read_all()
    }

    fn write_all(&self, rows: &[Row]) -> Result<(), BackendError> {
        self.inner.write_all(rows)?;
        *self.armed.lock().unwrap() = true;
        Ok(())
    }
}
