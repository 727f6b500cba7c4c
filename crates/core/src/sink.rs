//! Completion reporting
//!
//! Every host-boundary operation reports its outcome exactly once through a
//! [`CompletionSink`], in one of four shapes: success, success with a value,
//! bare failure, or failure with an [`ErrorCode`].

use parking_lot::Mutex;

use crate::error::ErrorCode;

/// Receiver of operation outcomes
pub trait CompletionSink: Send + Sync {
    /// Operation succeeded without a value
    fn completed(&self);

    /// Operation succeeded and produced `value` (JSON text)
    fn completed_with_value(&self, value: String);

    /// Operation failed before a code could be determined
    fn failed(&self);

    /// Operation failed with `code`
    fn failed_with_code(&self, code: ErrorCode);

    /// Dispatch a [`Completion`] to the matching method
    fn report(&self, completion: Completion) {
        match completion {
            Completion::Completed => self.completed(),
            Completion::CompletedWithValue(value) => self.completed_with_value(value),
            Completion::Failed => self.failed(),
            Completion::FailedWithCode(code) => self.failed_with_code(code),
        }
    }
}

/// One reported outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Success, no value
    Completed,
    /// Success with a JSON value
    CompletedWithValue(String),
    /// Failure, no code
    Failed,
    /// Failure with a code
    FailedWithCode(ErrorCode),
}

impl Completion {
    /// Check if this is one of the success shapes
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Completion::Completed | Completion::CompletedWithValue(_)
        )
    }

    /// Returned value, if any
    pub fn value(&self) -> Option<&str> {
        match self {
            Completion::CompletedWithValue(value) => Some(value),
            _ => None,
        }
    }

    /// Failure code, if any
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Completion::FailedWithCode(code) => Some(*code),
            _ => None,
        }
    }
}

/// Sink that records every report in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    completions: Mutex<Vec<Completion>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports so far
    pub fn completions(&self) -> Vec<Completion> {
        self.completions.lock().clone()
    }

    /// Most recent report
    pub fn last(&self) -> Option<Completion> {
        self.completions.lock().last().cloned()
    }

    /// Number of reports so far
    pub fn len(&self) -> usize {
        self.completions.lock().len()
    }

    /// Check if nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.completions.lock().is_empty()
    }

    /// Drain all reports
    pub fn take(&self) -> Vec<Completion> {
        std::mem::take(&mut *self.completions.lock())
    }

    fn push(&self, completion: Completion) {
        self.completions.lock().push(completion);
    }
}

impl CompletionSink for RecordingSink {
    fn completed(&self) {
        self.push(Completion::Completed);
    }

    fn completed_with_value(&self, value: String) {
        self.push(Completion::CompletedWithValue(value));
    }

    fn failed(&self) {
        self.push(Completion::Failed);
    }

    fn failed_with_code(&self, code: ErrorCode) {
        self.push(Completion::FailedWithCode(code));
    }
}
