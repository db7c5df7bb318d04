use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for repository operations
///
/// This enum represents all error categories surfaced by the repository layer,
/// its value model and its backends. Each kind describes a specific class of
/// failure, enabling precise error handling by callers.
///
/// # Examples
///
/// ```rust,ignore
/// use mongorepo::errors::{RepoError, ErrorKind, RepoResult};
///
/// fn example() -> RepoResult<()> {
///     Err(RepoError::new("Database name is empty", ErrorKind::InvalidArgument))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Construction Errors
    /// A required argument is missing or empty
    InvalidArgument,

    // Identity Errors
    /// The provided identifier is not a valid entity id
    InvalidId,

    // Mapping Errors
    /// A selector does not resolve to a mapped member of the entity
    UnmappedMember,
    /// The class map of an entity type is inconsistent
    MappingError,
    /// Error mapping object to/from document
    ObjectMappingError,

    // Operation Errors
    /// The operation is not supported (e.g. decoding a write-only literal)
    UnsupportedOperation,
    /// The operation is not valid in the current context
    InvalidOperation,

    // Encoding Errors
    /// Error encoding or decoding text
    EncodingError,
    /// Invalid data type for operation
    InvalidDataType,
    /// Invalid field name
    InvalidFieldName,

    // Backend Errors
    /// A document with the same `_id` already exists
    DuplicateKey,
    /// Error during filter evaluation or construction
    FilterError,
    /// Error reported by the document database backend
    BackendError,

    // Async Errors
    /// The operation was cancelled before it completed
    Cancelled,

    // Generic/Internal Errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "Invalid argument"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::UnmappedMember => write!(f, "Unmapped member"),
            ErrorKind::MappingError => write!(f, "Mapping error"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::UnsupportedOperation => write!(f, "Unsupported operation"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InvalidDataType => write!(f, "Invalid data type"),
            ErrorKind::InvalidFieldName => write!(f, "Invalid field name"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom repository error type.
///
/// `RepoError` encapsulates error information including the error message, kind, and optional cause.
/// It supports error chaining and backtraces for debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use mongorepo::errors::{RepoError, ErrorKind};
///
/// // Create a simple error
/// let err = RepoError::new("Unknown member 'nme'", ErrorKind::UnmappedMember);
///
/// // Create an error with a cause
/// let cause = RepoError::new("connection reset", ErrorKind::BackendError);
/// let err = RepoError::new_with_cause("Insert failed", ErrorKind::BackendError, cause);
/// ```
///
/// # Type alias
///
/// The `RepoResult<T>` type alias is equivalent to `Result<T, RepoError>` and is used
/// throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct RepoError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<RepoError>>,
    backtrace: Atomic<Backtrace>,
}

impl RepoError {
    /// Creates a new `RepoError` with the specified message and error kind.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RepoError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `RepoError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for debugging.
    pub fn new_with_cause(message: &str, error_type: ErrorKind, cause: RepoError) -> Self {
        RepoError {
            message: message.to_string(),
            error_kind: error_type,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates the error surfaced when an async operation observes its
    /// cancellation token.
    pub fn cancelled(operation: &str) -> Self {
        RepoError::new(
            &format!("Operation '{}' was cancelled", operation),
            ErrorKind::Cancelled,
        )
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&RepoError> {
        self.cause.as_deref()
    }

    /// Returns `true` when this error reports a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        self.error_kind == ErrorKind::Cancelled
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for repository operations.
///
/// `RepoResult<T>` is shorthand for `Result<T, RepoError>`.
pub type RepoResult<T> = Result<T, RepoError>;

// From trait implementations for automatic error conversion
impl From<std::fmt::Error> for RepoError {
    fn from(err: std::fmt::Error) -> Self {
        RepoError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<std::num::ParseIntError> for RepoError {
    fn from(err: std::num::ParseIntError) -> Self {
        RepoError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}

impl From<std::num::ParseFloatError> for RepoError {
    fn from(err: std::num::ParseFloatError) -> Self {
        RepoError::new(
            &format!("Float parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}

impl From<chrono::ParseError> for RepoError {
    fn from(err: chrono::ParseError) -> Self {
        RepoError::new(
            &format!("Date parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}

impl From<regex::Error> for RepoError {
    fn from(err: regex::Error) -> Self {
        RepoError::new(&format!("Invalid regex: {}", err), ErrorKind::FilterError)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::new(&format!("JSON error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<tokio::task::JoinError> for RepoError {
    fn from(err: tokio::task::JoinError) -> Self {
        RepoError::new(
            &format!("Backend task failed: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<std::io::Error> for RepoError {
    fn from(err: std::io::Error) -> Self {
        RepoError::new(&format!("IO error: {}", err), ErrorKind::BackendError)
    }
}

impl serde::ser::Error for RepoError {
    fn custom<T: Display>(msg: T) -> Self {
        RepoError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl serde::de::Error for RepoError {
    fn custom<T: Display>(msg: T) -> Self {
        RepoError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl From<String> for RepoError {
    fn from(msg: String) -> Self {
        RepoError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for RepoError {
    fn from(msg: &str) -> Self {
        RepoError::new(msg, ErrorKind::InternalError)
    }
}
