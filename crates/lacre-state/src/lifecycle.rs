//! # Seal Lifecycle Transitions
//!
//! The table of status changes an operator may request on a single seal.
//! Bulk operations (distribution, lot destruction) enforce their own
//! preconditions in the store and do not consult this table.
//!
//! `Used`, `Lost`, `Damaged` and `Destroyed` have no outgoing transitions.
//! A seal in one of them is never written again except by the
//! administrative hard delete.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lacre_core::SealStatus;

/// Errors raised when a requested status change breaks lifecycle rules.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealLifecycleError {
    /// The target status is not reachable from the current one.
    #[error("invalid seal transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: SealStatus,
        /// Requested status.
        to: SealStatus,
    },

    /// The seal is in a final state and cannot be modified.
    #[error("seal is in final state {state}")]
    FinalState {
        /// The final state.
        state: SealStatus,
    },

    /// Destruction requested without a reason.
    #[error("destruction requires a non-empty reason")]
    MissingDestructionReason,
}

/// Statuses reachable from `from` in one step.
pub fn allowed_transitions(from: SealStatus) -> &'static [SealStatus] {
    use SealStatus::*;
    match from {
        Available => &[Assigned, Reserved, Linked, Lost, Damaged, Destroyed],
        Assigned => &[Available, Reserved, Linked, Lost, Damaged],
        Reserved => &[Available, Assigned, Linked, Lost, Damaged],
        Linked => &[Used, Lost, Damaged],
        Used | Lost | Damaged | Destroyed => &[],
    }
}

/// Whether `status` has no outgoing transitions.
pub fn is_final(status: SealStatus) -> bool {
    allowed_transitions(status).is_empty()
}

/// Validate a single status change.
///
/// Writing the current status again is accepted unless the seal is final.
pub fn check_transition(from: SealStatus, to: SealStatus) -> Result<(), SealLifecycleError> {
    if is_final(from) {
        return Err(SealLifecycleError::FinalState { state: from });
    }
    if from == to || allowed_transitions(from).contains(&to) {
        return Ok(());
    }
    Err(SealLifecycleError::InvalidTransition { from, to })
}
