//! Append-only audit trail for a case
//!
//! Each entry carries a SHA-256 digest chained over the previous entry's digest,
//! so editing, reordering or removing an earlier entry is detectable. Ordering
//! is the position in the trail, never the timestamp.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use ulid::Ulid;

use crate::core::error::CaseError;

/// Digest the first entry of every trail chains from
pub const GENESIS_DIGEST: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// One immutable change record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub note: String,
    /// Service call that produced this entry
    pub request_id: Ulid,
    /// Chained SHA-256 over the previous digest and this entry's fields
    pub digest: String,
}

impl AuditEntry {
    fn compute_digest(
        previous: &str,
        timestamp: &DateTime<Utc>,
        actor: &str,
        note: &str,
        request_id: &Ulid,
    ) -> String {
        let timestamp = timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);
        let request_id = request_id.to_string();
        let mut hasher = Sha256::new();
        for field in [previous, timestamp.as_str(), actor, note, request_id.as_str()] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Ways a stored trail can fail verification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit entry {index} digest mismatch (entry was altered or reordered)")]
    DigestMismatch { index: usize },

    #[error("audit entry {index} has no actor")]
    MissingActor { index: usize },
}

/// Audit trail operations
pub struct AuditLog;

impl AuditLog {
    /// Return a new trail with one entry appended; the input is left untouched
    pub fn append(
        existing: &[AuditEntry],
        actor: &str,
        note: &str,
        request_id: Ulid,
    ) -> Result<Vec<AuditEntry>, CaseError> {
        Self::append_at(existing, actor, note, request_id, Utc::now())
    }

    /// Same as [`AuditLog::append`] with an explicit timestamp
    pub fn append_at(
        existing: &[AuditEntry],
        actor: &str,
        note: &str,
        request_id: Ulid,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, CaseError> {
        let actor = actor.trim();
        if actor.is_empty() {
            return Err(CaseError::validation("audit actor must not be empty"));
        }

        // Truncate to microseconds so the digest survives an RFC 3339 round trip
        let timestamp = DateTime::parse_from_rfc3339(
            &timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        )
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(timestamp);

        let previous = existing
            .last()
            .map(|e| e.digest.as_str())
            .unwrap_or(GENESIS_DIGEST);
        let digest = AuditEntry::compute_digest(previous, &timestamp, actor, note, &request_id);

        let mut trail = Vec::with_capacity(existing.len() + 1);
        trail.extend_from_slice(existing);
        trail.push(AuditEntry {
            timestamp,
            actor: actor.to_string(),
            note: note.to_string(),
            request_id,
            digest,
        });
        Ok(trail)
    }

    /// Recompute the digest chain and report the first broken entry
    pub fn verify(trail: &[AuditEntry]) -> Result<(), AuditError> {
        let mut previous = GENESIS_DIGEST.to_string();
        for (index, entry) in trail.iter().enumerate() {
            if entry.actor.trim().is_empty() {
                return Err(AuditError::MissingActor { index });
            }
            let expected = AuditEntry::compute_digest(
                &previous,
                &entry.timestamp,
                &entry.actor,
                &entry.note,
                &entry.request_id,
            );
            if expected != entry.digest {
                return Err(AuditError::DigestMismatch { index });
            }
            previous = expected;
        }
        Ok(())
    }

    /// True if `old` is an unmodified prefix of `new`
    pub fn is_prefix(old: &[AuditEntry], new: &[AuditEntry]) -> bool {
        old.len() <= new.len() && old.iter().zip(new).all(|(a, b)| a == b)
    }

    /// True if any entry in the trail was produced by `request_id`
    pub fn contains_request(trail: &[AuditEntry], request_id: &Ulid) -> bool {
        trail.iter().any(|e| &e.request_id == request_id)
    }
}
