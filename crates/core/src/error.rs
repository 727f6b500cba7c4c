//! Error types for assetcache
//!
//! Three layers of classification:
//!
//! - [`FaultKind`]: how the object-store engine classifies its own failures
//!   (constraint violations, missing tables, read-only writes, ...).
//! - [`ErrorCode`]: the closed, host-facing taxonomy reported through a
//!   completion sink. Every fault kind maps to exactly one code via
//!   [`ErrorCode::from_fault`]; anything unrecognized becomes `Unknown`.
//! - [`Error`]: the Rust error returned by every fallible operation. It
//!   distinguishes engine faults, explicit transaction aborts (optionally
//!   suppressed), and failures that happen before any transaction exists.

use std::fmt;
use thiserror::Error;

/// Engine failure classification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Index or size out of range
    IndexSize,
    /// Invalid hierarchy operation
    HierarchyRequest,
    /// Object used in the wrong context
    WrongDocument,
    /// Invalid character in a name
    InvalidCharacter,
    /// Modification not allowed
    NoModificationAllowed,
    /// Table, index, or record not found
    NotFound,
    /// Operation not supported
    NotSupported,
    /// Object is in an invalid state (closed connection, schema op outside upgrade)
    InvalidState,
    /// Attribute already in use
    InUseAttribute,
    /// Malformed input
    Syntax,
    /// Invalid modification
    InvalidModification,
    /// Namespace violation
    Namespace,
    /// Invalid access
    InvalidAccess,
    /// Security violation
    Security,
    /// Operation timed out
    Timeout,
    /// Operation not allowed
    NotAllowed,
    /// Operation aborted
    Abort,
    /// Value cannot be cloned into the store
    DataClone,
    /// Encoding failure
    Encoding,
    /// Data not readable
    NotReadable,
    /// Uniqueness constraint violated
    Constraint,
    /// Invalid key or key path data
    Data,
    /// Request against a finished transaction
    TransactionInactive,
    /// Write in a read-only transaction
    ReadOnly,
    /// Requested version lower than the stored version
    Version,
    /// Any classification not listed above
    Other(String),
}

impl FaultKind {
    /// Canonical name of the fault kind (e.g. `"ConstraintError"`)
    pub fn name(&self) -> &str {
        match self {
            FaultKind::IndexSize => "IndexSizeError",
            FaultKind::HierarchyRequest => "HierarchyRequestError",
            FaultKind::WrongDocument => "WrongDocumentError",
            FaultKind::InvalidCharacter => "InvalidCharacterError",
            FaultKind::NoModificationAllowed => "NoModificationAllowedError",
            FaultKind::NotFound => "NotFoundError",
            FaultKind::NotSupported => "NotSupportedError",
            FaultKind::InvalidState => "InvalidStateError",
            FaultKind::InUseAttribute => "InUseAttributeError",
            FaultKind::Syntax => "SyntaxError",
            FaultKind::InvalidModification => "InvalidModificationError",
            FaultKind::Namespace => "NamespaceError",
            FaultKind::InvalidAccess => "InvalidAccessError",
            FaultKind::Security => "SecurityError",
            FaultKind::Timeout => "TimeoutError",
            FaultKind::NotAllowed => "NotAllowedError",
            FaultKind::Abort => "AbortError",
            FaultKind::DataClone => "DataCloneError",
            FaultKind::Encoding => "EncodingError",
            FaultKind::NotReadable => "NotReadableError",
            FaultKind::Constraint => "ConstraintError",
            FaultKind::Data => "DataError",
            FaultKind::TransactionInactive => "TransactionInactiveError",
            FaultKind::ReadOnly => "ReadOnlyError",
            FaultKind::Version => "VersionError",
            FaultKind::Other(name) => name,
        }
    }

    /// Parse a canonical fault name; unknown names become [`FaultKind::Other`]
    pub fn from_name(name: &str) -> Self {
        match name {
            "IndexSizeError" => FaultKind::IndexSize,
            "HierarchyRequestError" => FaultKind::HierarchyRequest,
            "WrongDocumentError" => FaultKind::WrongDocument,
            "InvalidCharacterError" => FaultKind::InvalidCharacter,
            "NoModificationAllowedError" => FaultKind::NoModificationAllowed,
            "NotFoundError" => FaultKind::NotFound,
            "NotSupportedError" => FaultKind::NotSupported,
            "InvalidStateError" => FaultKind::InvalidState,
            "InUseAttributeError" => FaultKind::InUseAttribute,
            "SyntaxError" => FaultKind::Syntax,
            "InvalidModificationError" => FaultKind::InvalidModification,
            "NamespaceError" => FaultKind::Namespace,
            "InvalidAccessError" => FaultKind::InvalidAccess,
            "SecurityError" => FaultKind::Security,
            "TimeoutError" => FaultKind::Timeout,
            "NotAllowedError" => FaultKind::NotAllowed,
            "AbortError" => FaultKind::Abort,
            "DataCloneError" => FaultKind::DataClone,
            "EncodingError" => FaultKind::Encoding,
            "NotReadableError" => FaultKind::NotReadable,
            "ConstraintError" => FaultKind::Constraint,
            "DataError" => FaultKind::Data,
            "TransactionInactiveError" => FaultKind::TransactionInactive,
            "ReadOnlyError" => FaultKind::ReadOnly,
            "VersionError" => FaultKind::Version,
            other => FaultKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failure raised by the object-store engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    /// Engine classification
    pub kind: FaultKind,
    /// Human-readable detail
    pub message: String,
}

impl StoreError {
    /// Create a store error of the given kind
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// `NotFoundError` (unknown table/index, out-of-scope table)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FaultKind::NotFound, message)
    }

    /// `ConstraintError` (duplicate primary or unique index key)
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Constraint, message)
    }

    /// `DataError` (key cannot be extracted)
    pub fn data(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Data, message)
    }

    /// `ReadOnlyError`
    pub fn read_only(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ReadOnly, message)
    }

    /// `InvalidStateError`
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(FaultKind::InvalidState, message)
    }

    /// `TransactionInactiveError`
    pub fn inactive(message: impl Into<String>) -> Self {
        Self::new(FaultKind::TransactionInactive, message)
    }
}

/// Host-facing error code
///
/// The integer values are part of the host contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Unclassified failure
    Unknown = 0,
    /// No open connection
    DatabaseNotOpened = 1,
    /// Open blocked by another connection
    OpenDatabaseBlocked = 2,
    /// Invalid database configuration
    InvalidConfig = 3,
    /// See [`FaultKind::IndexSize`]
    IndexSizeError = 4,
    /// See [`FaultKind::HierarchyRequest`]
    HierarchyRequestError = 5,
    /// See [`FaultKind::WrongDocument`]
    WrongDocumentError = 6,
    /// See [`FaultKind::InvalidCharacter`]
    InvalidCharacterError = 7,
    /// See [`FaultKind::NoModificationAllowed`]
    NoModificationAllowedError = 8,
    /// See [`FaultKind::NotFound`]
    NotFoundError = 9,
    /// See [`FaultKind::NotSupported`]
    NotSupportedError = 10,
    /// See [`FaultKind::InvalidState`]
    InvalidStateError = 11,
    /// See [`FaultKind::InUseAttribute`]
    InUseAttributeError = 12,
    /// See [`FaultKind::Syntax`]
    SyntaxError = 13,
    /// See [`FaultKind::InvalidModification`]
    InvalidModificationError = 14,
    /// See [`FaultKind::Namespace`]
    NamespaceError = 15,
    /// See [`FaultKind::InvalidAccess`]
    InvalidAccessError = 16,
    /// See [`FaultKind::Security`]
    SecurityError = 17,
    /// See [`FaultKind::Timeout`]
    TimeoutError = 18,
    /// See [`FaultKind::NotAllowed`]
    NotAllowedError = 19,
    /// See [`FaultKind::Abort`]
    AbortError = 20,
    /// See [`FaultKind::DataClone`]
    DataCloneError = 21,
    /// See [`FaultKind::Encoding`]
    EncodingError = 22,
    /// See [`FaultKind::NotReadable`]
    NotReadableError = 23,
    /// See [`FaultKind::Constraint`]
    ConstraintError = 24,
    /// See [`FaultKind::Data`]
    DataError = 25,
    /// See [`FaultKind::TransactionInactive`]
    TransactionInactiveError = 26,
    /// See [`FaultKind::ReadOnly`]
    ReadOnlyError = 27,
    /// See [`FaultKind::Version`]
    VersionError = 28,
}

impl ErrorCode {
    /// Map an engine fault kind onto the host taxonomy
    pub fn from_fault(kind: &FaultKind) -> Self {
        match kind {
            FaultKind::IndexSize => ErrorCode::IndexSizeError,
            FaultKind::HierarchyRequest => ErrorCode::HierarchyRequestError,
            FaultKind::WrongDocument => ErrorCode::WrongDocumentError,
            FaultKind::InvalidCharacter => ErrorCode::InvalidCharacterError,
            FaultKind::NoModificationAllowed => ErrorCode::NoModificationAllowedError,
            FaultKind::NotFound => ErrorCode::NotFoundError,
            FaultKind::NotSupported => ErrorCode::NotSupportedError,
            FaultKind::InvalidState => ErrorCode::InvalidStateError,
            FaultKind::InUseAttribute => ErrorCode::InUseAttributeError,
            FaultKind::Syntax => ErrorCode::SyntaxError,
            FaultKind::InvalidModification => ErrorCode::InvalidModificationError,
            FaultKind::Namespace => ErrorCode::NamespaceError,
            FaultKind::InvalidAccess => ErrorCode::InvalidAccessError,
            FaultKind::Security => ErrorCode::SecurityError,
            FaultKind::Timeout => ErrorCode::TimeoutError,
            FaultKind::NotAllowed => ErrorCode::NotAllowedError,
            FaultKind::Abort => ErrorCode::AbortError,
            FaultKind::DataClone => ErrorCode::DataCloneError,
            FaultKind::Encoding => ErrorCode::EncodingError,
            FaultKind::NotReadable => ErrorCode::NotReadableError,
            FaultKind::Constraint => ErrorCode::ConstraintError,
            FaultKind::Data => ErrorCode::DataError,
            FaultKind::TransactionInactive => ErrorCode::TransactionInactiveError,
            FaultKind::ReadOnly => ErrorCode::ReadOnlyError,
            FaultKind::Version => ErrorCode::VersionError,
            FaultKind::Other(_) => ErrorCode::Unknown,
        }
    }

    /// Stable integer value
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Stable name
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Unknown => "Unknown",
            ErrorCode::DatabaseNotOpened => "DatabaseNotOpened",
            ErrorCode::OpenDatabaseBlocked => "OpenDatabaseBlocked",
            ErrorCode::InvalidConfig => "InvalidConfig",
            ErrorCode::IndexSizeError => "IndexSizeError",
            ErrorCode::HierarchyRequestError => "HierarchyRequestError",
            ErrorCode::WrongDocumentError => "WrongDocumentError",
            ErrorCode::InvalidCharacterError => "InvalidCharacterError",
            ErrorCode::NoModificationAllowedError => "NoModificationAllowedError",
            ErrorCode::NotFoundError => "NotFoundError",
            ErrorCode::NotSupportedError => "NotSupportedError",
            ErrorCode::InvalidStateError => "InvalidStateError",
            ErrorCode::InUseAttributeError => "InUseAttributeError",
            ErrorCode::SyntaxError => "SyntaxError",
            ErrorCode::InvalidModificationError => "InvalidModificationError",
            ErrorCode::NamespaceError => "NamespaceError",
            ErrorCode::InvalidAccessError => "InvalidAccessError",
            ErrorCode::SecurityError => "SecurityError",
            ErrorCode::TimeoutError => "TimeoutError",
            ErrorCode::NotAllowedError => "NotAllowedError",
            ErrorCode::AbortError => "AbortError",
            ErrorCode::DataCloneError => "DataCloneError",
            ErrorCode::EncodingError => "EncodingError",
            ErrorCode::NotReadableError => "NotReadableError",
            ErrorCode::ConstraintError => "ConstraintError",
            ErrorCode::DataError => "DataError",
            ErrorCode::TransactionInactiveError => "TransactionInactiveError",
            ErrorCode::ReadOnlyError => "ReadOnlyError",
            ErrorCode::VersionError => "VersionError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&FaultKind> for ErrorCode {
    fn from(kind: &FaultKind) -> Self {
        ErrorCode::from_fault(kind)
    }
}

/// All assetcache errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No connection is open
    #[error("database is not opened")]
    NotOpened,

    /// Opening was blocked by another connection
    #[error("database open blocked: {0}")]
    Blocked(String),

    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Engine fault raised by a request
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transaction explicitly aborted by the operation body
    ///
    /// A suppressed abort discards the transaction's writes but is reported
    /// to the caller as a success.
    #[error("transaction aborted with {code}: {reason}")]
    Aborted {
        /// Code recorded for the abort
        code: ErrorCode,
        /// Whether the abort is reported as success
        suppressed: bool,
        /// Human-readable reason
        reason: String,
    },

    /// Failure before any transaction was opened
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// Record payload could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Bug or invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for assetcache operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Abort reported as a failure with `code`
    pub fn abort(code: ErrorCode, reason: impl Into<String>) -> Self {
        Error::Aborted {
            code,
            suppressed: false,
            reason: reason.into(),
        }
    }

    /// Abort reported as a success; `code` is recorded but not surfaced
    pub fn suppressed_abort(code: ErrorCode, reason: impl Into<String>) -> Self {
        Error::Aborted {
            code,
            suppressed: true,
            reason: reason.into(),
        }
    }

    /// Abort with `NotFoundError`
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::abort(ErrorCode::NotFoundError, reason)
    }

    /// Host-facing code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotOpened => ErrorCode::DatabaseNotOpened,
            Error::Blocked(_) => ErrorCode::OpenDatabaseBlocked,
            Error::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Error::Store(e) => ErrorCode::from_fault(&e.kind),
            Error::Aborted { code, .. } => *code,
            Error::Dispatch(_) | Error::Serialization(_) | Error::Internal(_) => {
                ErrorCode::Unknown
            }
        }
    }

    /// Check if this abort is reported as success
    pub fn is_suppressed(&self) -> bool {
        matches!(
            self,
            Error::Aborted {
                suppressed: true,
                ..
            }
        )
    }

    /// Check if this failure is reported without a code
    pub fn is_bare(&self) -> bool {
        matches!(self, Error::Dispatch(_))
    }

    /// Check if this is a not-found failure (abort or engine fault)
    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFoundError
    }

    /// Check if this is a constraint violation
    pub fn is_constraint(&self) -> bool {
        self.code() == ErrorCode::ConstraintError
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
