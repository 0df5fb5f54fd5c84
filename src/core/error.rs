//! Error taxonomy returned by the case service

use miette::Diagnostic;
use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::evidence::MediaError;
use crate::core::workflow::TransitionError;
use crate::export::ExportError;

/// Every failure a case operation can surface to its caller
#[derive(Debug, Error, Diagnostic)]
pub enum CaseError {
    /// Bad input shape or missing required field; rejected before store access
    #[error("Validation failed: {message}")]
    #[diagnostic(code(casebook::validation))]
    Validation { message: String },

    /// Illegal status move or insufficient role
    #[error("{0}")]
    #[diagnostic(
        code(casebook::transition),
        help("only officers may change cases; resolved cases need a supervisor unlock")
    )]
    Transition(#[from] TransitionError),

    #[error("Case not found: {case_id}")]
    #[diagnostic(code(casebook::not_found), help("run 'casebook list' to see known case ids"))]
    NotFound { case_id: String },

    /// Backend read/write failed or the retry budget ran out
    #[error("Case store unavailable after {attempts} attempt(s): {message}")]
    #[diagnostic(
        code(casebook::transient),
        help("the change may still have been saved; check with 'casebook list' or 'casebook show' before trying again")
    )]
    TransientStore { message: String, attempts: u32 },

    /// A post-condition failed; the collection may be inconsistent
    #[error("Data integrity violation: {message}")]
    #[diagnostic(
        code(casebook::integrity),
        severity(Error),
        help("automated writes were halted for this request; an operator must inspect the case table")
    )]
    DataIntegrity { message: String },

    #[error(transparent)]
    #[diagnostic(code(casebook::evidence))]
    Media(#[from] MediaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl CaseError {
    pub fn validation(message: impl Into<String>) -> Self {
        CaseError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(case_id: impl ToString) -> Self {
        CaseError::NotFound {
            case_id: case_id.to_string(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        CaseError::DataIntegrity {
            message: message.into(),
        }
    }

    /// Name the case a failed write may have left behind
    pub fn with_pending_case(self, case_id: impl std::fmt::Display) -> Self {
        match self {
            CaseError::TransientStore { message, attempts } => CaseError::TransientStore {
                message: format!("{} (case {} may have been recorded)", message, case_id),
                attempts,
            },
            other => other,
        }
    }

    /// Whether the end actor should retry after checking what landed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaseError::TransientStore { .. })
    }
}
