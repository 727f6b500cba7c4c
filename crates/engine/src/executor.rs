//! Transactional operation executor
//!
//! Every logical operation runs through [`execute`]: one transaction over a
//! scope of tables, one call of the body, and one settled [`Outcome`].
//!
//! ## Settlement
//!
//! | Body result                         | Transaction | Result                         |
//! |-------------------------------------|-------------|--------------------------------|
//! | `Ok(value)`                         | committed   | `Ok(Outcome::Committed(value))` |
//! | `Err(Error::Store(_))`              | aborted     | `Err(Store)`                   |
//! | `Err(Aborted { suppressed: true })` | aborted     | `Ok(Outcome::Suppressed)`      |
//! | `Err(Aborted { suppressed: false })`| aborted     | `Err(Aborted)`                 |
//! | `Err(Serialization \| Internal)`     | aborted     | `Err(Aborted)` with `Unknown`  |
//! | any other error                     | aborted     | passed through                 |
//!
//! Only a transaction that cannot be started fails with `Dispatch`, which
//! reports a bare failure.
//! [`report`] turns the result into exactly one completion-sink call.

use assetcache_concurrency::{Transaction, TransactionMode};
use assetcache_core::{Completion, CompletionSink, Error, ErrorCode, Result};

use crate::session::Session;

/// How an operation settled when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The transaction committed and the body produced a value
    Committed(T),
    /// The body aborted with a suppressed code; nothing was written
    Suppressed {
        /// Code recorded by the abort
        code: ErrorCode,
    },
}

impl<T> Outcome<T> {
    /// Check if the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed(_))
    }

    /// Committed value, if any
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Committed(value) => Some(value),
            Outcome::Suppressed { .. } => None,
        }
    }

    /// Map the committed value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Committed(value) => Outcome::Committed(f(value)),
            Outcome::Suppressed { code } => Outcome::Suppressed { code },
        }
    }
}

/// Run `body` in one transaction over `scope`
pub fn execute<T, F>(
    session: &Session,
    scope: &[&str],
    mode: TransactionMode,
    operation: &str,
    body: F,
) -> Result<Outcome<T>>
where
    F: FnOnce(&mut Transaction<'_>) -> Result<T>,
{
    let mut txn = match session.transaction(scope, mode) {
        Ok(txn) => txn,
        Err(e) => {
            tracing::error!(operation, error = %e, "could not start transaction");
            return Err(Error::Dispatch(format!("{}: {}", operation, e)));
        }
    };
    let txn_id = txn.id();

    let error = match body(&mut txn) {
        Ok(value) => {
            return match txn.commit() {
                Ok(()) => {
                    tracing::debug!(operation, txn_id, "transaction completed");
                    Ok(Outcome::Committed(value))
                }
                Err(e) => {
                    tracing::error!(operation, txn_id, error = %e, "transaction error");
                    Err(e.into())
                }
            };
        }
        Err(error) => error,
    };

    txn.abort(error.to_string());
    match error {
        Error::Store(e) => {
            tracing::error!(operation, txn_id, error = %e, "transaction error");
            Err(Error::Store(e))
        }
        Error::Aborted {
            code,
            suppressed: true,
            reason,
        } => {
            tracing::debug!(operation, txn_id, %code, %reason, "transaction aborted, suppressed");
            Ok(Outcome::Suppressed { code })
        }
        error @ Error::Aborted { .. } => {
            tracing::error!(operation, txn_id, code = %error.code(), error = %error, "transaction aborted");
            Err(error)
        }
        error @ (Error::Serialization(_) | Error::Internal(_)) => {
            tracing::error!(operation, txn_id, error = %error, "transaction aborted");
            Err(Error::abort(ErrorCode::Unknown, format!("{}: {}", operation, error)))
        }
        error => {
            tracing::error!(operation, txn_id, error = %error, "operation failed");
            Err(error)
        }
    }
}

// ============================================================================
// Reporting
// ============================================================================

/// Values an operation can report on success
pub trait IntoCompletion {
    /// The success completion for this value
    fn into_completion(self) -> Completion;
}

impl IntoCompletion for () {
    fn into_completion(self) -> Completion {
        Completion::Completed
    }
}

impl IntoCompletion for String {
    fn into_completion(self) -> Completion {
        Completion::CompletedWithValue(self)
    }
}

/// Completion for a settled operation
pub fn completion<T: IntoCompletion>(result: Result<Outcome<T>>) -> Completion {
    match result {
        Ok(Outcome::Committed(value)) => value.into_completion(),
        Ok(Outcome::Suppressed { .. }) => Completion::Completed,
        Err(e) if e.is_bare() => Completion::Failed,
        Err(e) => Completion::FailedWithCode(e.code()),
    }
}

/// Report a settled operation to `sink`, exactly once
pub fn report<T: IntoCompletion>(sink: &dyn CompletionSink, result: Result<Outcome<T>>) {
    sink.report(completion(result));
}
