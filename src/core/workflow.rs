//! Case lifecycle engine
//!
//! Validates status transitions and edit permissions. Forward path is
//! pending → in progress → resolved, with cancellation available before
//! resolution. A resolved case is locked: the only way back is a supervisor
//! unlock, granted per edit and never persisted.

use thiserror::Error;

use crate::core::entity::CaseStatus;
use crate::core::team::Role;

/// Reasons a requested status change is refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Read-only accounts cannot change cases")]
    ReadOnlyRole,

    #[error("Invalid status transition: {from} → {to}")]
    IllegalTransition { from: CaseStatus, to: CaseStatus },

    #[error("Case is resolved and locked; a supervisor unlock is required to edit it")]
    CaseLocked,
}

/// The case status state machine
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseLifecycle;

impl CaseLifecycle {
    pub fn new() -> Self {
        Self
    }

    /// Check if an edge exists in the status graph, ignoring role
    pub fn is_valid_transition(&self, from: CaseStatus, to: CaseStatus, unlock_granted: bool) -> bool {
        if from == CaseStatus::Resolved {
            return unlock_granted && matches!(to, CaseStatus::Resolved | CaseStatus::InProgress);
        }
        from == to
            || matches!(
                (from, to),
                // Normal forward transitions
                (CaseStatus::Pending, CaseStatus::InProgress)
                    | (CaseStatus::InProgress, CaseStatus::Resolved)
                    // Cancellation before resolution
                    | (CaseStatus::Pending, CaseStatus::Cancelled)
                    | (CaseStatus::InProgress, CaseStatus::Cancelled)
            )
    }

    /// Get allowed target statuses (excluding staying put)
    pub fn allowed_transitions(&self, current: CaseStatus, unlock_granted: bool) -> Vec<CaseStatus> {
        match current {
            CaseStatus::Pending => vec![CaseStatus::InProgress, CaseStatus::Cancelled],
            CaseStatus::InProgress => vec![CaseStatus::Resolved, CaseStatus::Cancelled],
            CaseStatus::Resolved if unlock_granted => vec![CaseStatus::InProgress],
            CaseStatus::Resolved | CaseStatus::Cancelled => vec![],
        }
    }

    /// Check whether `role` may move a case from `current` to `requested`
    pub fn validate(
        &self,
        current: CaseStatus,
        requested: CaseStatus,
        role: Role,
        unlock_granted: bool,
    ) -> Result<(), TransitionError> {
        if !role.can_edit() {
            return Err(TransitionError::ReadOnlyRole);
        }

        if current.is_locked() && !unlock_granted {
            return Err(TransitionError::CaseLocked);
        }

        if !self.is_valid_transition(current, requested, unlock_granted) {
            return Err(TransitionError::IllegalTransition {
                from: current,
                to: requested,
            });
        }

        Ok(())
    }
}
