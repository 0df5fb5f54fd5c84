//! Core module - case records, lifecycle, audit trail and the record store

pub mod audit;
pub mod config;
pub mod entity;
pub mod error;
pub mod evidence;
pub mod identity;
pub mod service;
pub mod store;
pub mod team;
pub mod workflow;

pub use audit::{AuditEntry, AuditError, AuditLog, GENESIS_DIGEST};
pub use config::{BackendKind, Config, ConfigError};
pub use entity::{CaseStatus, IncidentType};
pub use error::CaseError;
pub use evidence::{EvidenceRef, EvidenceVault, MediaError, MediaTransform};
pub use identity::{CaseId, DatedIdGenerator, IdParseError, IdSource};
pub use service::{AuditReport, CaseFilter, CaseService, CaseSummary, CaseUpdate};
pub use store::{
    BackendError, CsvTable, MemoryTable, Mutation, RecordStore, RetryPolicy, Row, Snapshot,
    SqliteTable, TableBackend, WriteReceipt,
};
pub use team::{Actor, Authenticator, Credential, Identity, Role, StaticAuthenticator};
pub use workflow::{CaseLifecycle, TransitionError};
