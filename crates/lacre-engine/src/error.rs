//! # Engine Error Types
//!
//! Two layers:
//!
//! - [`StoreError`] — raised by [`SealStore`](crate::store::SealStore) and
//!   collaborator implementations. Carries only the backend message.
//! - [`EngineError`] — raised by [`SealEngine`](crate::SealEngine)
//!   operations. Store failures are wrapped with the operation name so an
//!   operator can tell which step to retry.
//!
//! Duplicate seal codes during generation are not errors at either layer.

use thiserror::Error;

use lacre_core::{SealId, ValidationError};
use lacre_state::SealLifecycleError;

/// Failure inside a store or collaborator backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend failure: connectivity, timeout, unexpected constraint violation.
    #[error("database error: {0}")]
    Database(String),

    /// A row could not be mapped into the domain model.
    #[error("corrupt seal record {id}: {reason}")]
    CorruptRecord {
        /// Raw row id.
        id: i64,
        /// What was wrong with it.
        reason: String,
    },
}

/// Failure of a [`SealEngine`](crate::SealEngine) operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or missing input. Raised before any store access.
    #[error("validation error: {0}")]
    Validation(String),

    /// Lot destruction refused because some seals in the lot are held.
    #[error("destruction of lot {lot} refused: {held} seal(s) are held, assigned or linked")]
    GuardViolation {
        /// The lot that was requested.
        lot: String,
        /// Number of seals blocking the destruction.
        held: u64,
    },

    /// Referenced seal does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Requested status change breaks the seal lifecycle.
    #[error("lifecycle violation: {0}")]
    Lifecycle(#[from] SealLifecycleError),

    /// The seal's current holder or links forbid the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The seal changed between read and conditional write.
    #[error("{0} changed concurrently; reload and retry")]
    Stale(SealId),

    /// Store failure, wrapped with the operation that hit it.
    #[error("{operation} failed: {source}")]
    Store {
        /// Engine operation name.
        operation: &'static str,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl EngineError {
    /// Adapter for `map_err` on store calls. Logs the failure once, here.
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> EngineError {
        move |source| {
            tracing::error!(operation, error = %source, "store call failed");
            EngineError::Store { operation, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lacre_core::SealStatus;

    #[test]
    fn store_error_carries_operation() {
        let err = EngineError::store("distribute_manual")(StoreError::Database(
            "connection reset".to_string(),
        ));
        let msg = err.to_string();
        assert!(msg.contains("distribute_manual"), "{msg}");
        assert!(msg.contains("connection reset"), "{msg}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn validation_error_converts() {
        let err = EngineError::from(ValidationError::UnknownStatus("xyz".to_string()));
        match err {
            EngineError::Validation(msg) => assert!(msg.contains("xyz")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn lifecycle_error_converts() {
        let err = EngineError::from(SealLifecycleError::FinalState {
            state: SealStatus::Destroyed,
        });
        assert!(matches!(err, EngineError::Lifecycle(_)));
        assert!(err.to_string().contains("destroyed"));
    }

    #[test]
    fn guard_violation_message() {
        let err = EngineError::GuardViolation {
            lot: "L1".to_string(),
            held: 10,
        };
        assert_eq!(
            err.to_string(),
            "destruction of lot L1 refused: 10 seal(s) are held, assigned or linked"
        );
    }
}
