//! Record store - optimistic read-modify-write against a whole-table backend
//!
//! Every write follows the same cycle: read a fresh snapshot, apply the
//! caller's mutation to it, check the result's integrity, and replace the
//! table. A failed read or write backs off with full jitter and starts over
//! from a fresh read; a stale snapshot is never reused across attempts.
//!
//! Because the backend offers no version token, conflicts are detected
//! indirectly: an optional guard read just before writing compares snapshot
//! fingerprints, and an optional verification read after writing checks that
//! the request's audit entry actually landed.

mod backend;
mod csv_table;
mod sqlite_table;


pub use backend::{row_id, BackendError, MemoryTable, Row, Snapshot, TableBackend};
pub use csv_table::CsvTable;
pub use sqlite_table::SqliteTable;

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use ulid::Ulid;

use crate::core::audit::{AuditEntry, AuditLog};
use crate::core::error::CaseError;
use crate::entities::case::columns;

/// Upper bound on a single backoff sleep
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Bounded retry with jittered exponential backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per operation (reads and writes share the budget)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Re-read before writing and give up the attempt if the table changed
    pub guard_reads: bool,
    /// Re-read after writing and retry if the write was overwritten
    pub verify_writes: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            guard_reads: true,
            verify_writes: true,
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts; for tests and simulations
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Ceiling of the sleep after the `attempt`-th failure (1-based)
    pub fn backoff_cap(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
            .min(MAX_BACKOFF)
    }

    /// Full jitter: uniform in `[0, cap]`
    pub fn sample_delay(&self, attempt: u32) -> Duration {
        let cap = self.backoff_cap(attempt).as_micros() as u64;
        if cap == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::rng().random_range(0..=cap))
    }
}

/// Identifies the audit entry a write is expected to leave behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub case_id: String,
    pub request_id: Ulid,
}

/// What a mutation decided to do with the snapshot it was given
#[derive(Debug)]
pub enum Mutation<T> {
    /// Replace the table with `snapshot`
    Write {
        snapshot: Snapshot,
        value: T,
        receipt: Option<WriteReceipt>,
    },
    /// Nothing to write (no-op, or the request already landed)
    Unchanged(T),
}

impl<T> Mutation<T> {
    pub fn write(snapshot: Snapshot, value: T, receipt: WriteReceipt) -> Self {
        Mutation::Write {
            snapshot,
            value,
            receipt: Some(receipt),
        }
    }
}

/// Whether the row for `receipt.case_id` carries an audit entry from `receipt.request_id`
pub fn receipt_landed(snapshot: &Snapshot, receipt: &WriteReceipt) -> bool {
    snapshot
        .position_of(&receipt.case_id)
        .and_then(|index| snapshot.get(index))
        .and_then(|row| row.get(columns::AUDIT_LOG))
        .and_then(|raw| serde_json::from_str::<Vec<AuditEntry>>(raw).ok())
        .map(|trail| AuditLog::contains_request(&trail, &receipt.request_id))
        .unwrap_or(false)
}

/// The only component allowed to write the case table
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn TableBackend>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.backend.describe())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RecordStore {
    pub fn new(backend: Arc<dyn TableBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    fn backoff(&self, attempt: u32) {
        let delay = self.policy.sample_delay(attempt);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    fn exhausted(&self, attempts: u32, last_error: String) -> CaseError {
        warn!(attempts, error = %last_error, "retry budget exhausted");
        CaseError::TransientStore {
            message: last_error,
            attempts,
        }
    }

    /// Read the table, retrying transient failures within the attempt budget
    pub fn read(&self) -> Result<Snapshot, CaseError> {
        let mut last_error = String::from("no attempts made");
        for attempt in 1..=self.policy.max_attempts.max(1) {
            match self.backend.read_all() {
                Ok(rows) => return Ok(Snapshot::new(rows)),
                Err(e) => {
                    debug!(attempt, error = %e, "table read failed");
                    last_error = e.to_string();
                    if attempt < self.policy.max_attempts {
                        self.backoff(attempt);
                    }
                }
            }
        }
        Err(self.exhausted(self.policy.max_attempts.max(1), last_error))
    }

    /// Run one optimistic read-modify-write cycle, retrying on backend failure
    ///
    /// `expected_growth` is the minimum number of rows the mutation must add
    /// (1 for a submission, 0 for an update). Errors returned by the mutation
    /// itself are never retried.
    pub fn apply<T, F>(&self, expected_growth: usize, mut mutation: F) -> Result<T, CaseError>
    where
        F: FnMut(&Snapshot) -> Result<Mutation<T>, CaseError>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::from("no attempts made");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.backoff(attempt - 1);
            }

            let snapshot = match self.backend.read_all() {
                Ok(rows) => Snapshot::new(rows),
                Err(e) => {
                    debug!(attempt, error = %e, "snapshot read failed");
                    last_error = e.to_string();
                    continue;
                }
            };

            let (updated, value, receipt) = match mutation(&snapshot)? {
                Mutation::Unchanged(value) => return Ok(value),
                Mutation::Write {
                    snapshot: updated,
                    value,
                    receipt,
                } => (updated, value, receipt),
            };

            check_integrity(&snapshot, &updated, expected_growth)?;

            if self.policy.guard_reads {
                match self.backend.read_all() {
                    Ok(rows) => {
                        if Snapshot::new(rows).fingerprint() != snapshot.fingerprint() {
                            debug!(attempt, "table changed since snapshot read");
                            last_error = "table changed by a concurrent writer".to_string();
                            continue;
                        }
                    }
                    Err(e) => {
                        debug!(attempt, error = %e, "guard read failed");
                        last_error = e.to_string();
                        continue;
                    }
                }
            }

            if let Err(e) = self.backend.write_all(updated.rows()) {
                warn!(attempt, error = %e, "snapshot write failed");
                last_error = e.to_string();
                continue;
            }

            if let (true, Some(receipt)) = (self.policy.verify_writes, receipt.as_ref()) {
                match self.backend.read_all() {
                    Ok(rows) => {
                        let after = Snapshot::new(rows);
                        if !receipt_landed(&after, receipt) {
                            debug!(attempt, case_id = %receipt.case_id, "write was overwritten");
                            last_error = "write was overwritten by a concurrent writer".to_string();
                            continue;
                        }
                        if after.len() < updated.len() {
                            let message = format!(
                                "table shrank from {} to {} rows right after writing case {}",
                                updated.len(),
                                after.len(),
                                receipt.case_id
                            );
                            error!(%message, "integrity violation");
                            return Err(CaseError::integrity(message));
                        }
                    }
                    Err(e) => {
                        // Outcome unknown: the next attempt re-reads and
                        // recognises the request if it landed
                        debug!(attempt, error = %e, "verification read failed");
                        last_error = e.to_string();
                        continue;
                    }
                }
            }

            debug!(attempt, rows = updated.len(), "snapshot written");
            return Ok(value);
        }

        Err(self.exhausted(max_attempts, last_error))
    }
}

/// Post-conditions every mutation result must satisfy before it may be written
fn check_integrity(
    before: &Snapshot,
    after: &Snapshot,
    expected_growth: usize,
) -> Result<(), CaseError> {
    let required = before.len() + expected_growth;
    if after.len() < required {
        let message = format!(
            "mutation produced {} rows from {} (expected at least {})",
            after.len(),
            before.len(),
            required
        );
        error!(%message, "integrity violation");
        return Err(CaseError::integrity(message));
    }

    let existing = before.duplicate_ids();
    let introduced: Vec<String> = after
        .duplicate_ids()
        .into_iter()
        .filter(|id| !existing.contains(id))
        .collect();
    if !introduced.is_empty() {
        let message = format!("mutation duplicated case id(s): {}", introduced.join(", "));
        error!(%message, "integrity violation");
        return Err(CaseError::integrity(message));
    }

    Ok(())
}
