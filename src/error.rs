//! Error types for repokit.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every error belongs to one [`ErrorKind`]; wrapping an error with a message
//! (see [`ResultExt::with_message`]) keeps the original error reachable through
//! the `source()` chain, and [`DbError::kind`] looks through the wrapping.

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// SQLSTATE codes PostgreSQL uses for conflicts the caller may retry.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Category of an error, independent of where it originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    FailedPrecondition,
    PermissionDenied,
    Unauthenticated,
    ResourceExhausted,
    Cancelled,
    Aborted,
    DeadlineExceeded,
    /// Must be treated as an internal error.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::InvalidArgument => "invalid argument",
            Self::FailedPrecondition => "failed precondition",
            Self::PermissionDenied => "permission denied",
            Self::Unauthenticated => "unauthenticated",
            Self::ResourceExhausted => "resource exhausted",
            Self::Cancelled => "canceled",
            Self::Aborted => "aborted",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("not found")]
    NotFound,

    #[error("already exists: {message}")]
    AlreadyExists { message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("failed precondition: {message}")]
    FailedPrecondition { message: String },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("resource exhausted: {message}")]
    ResourceExhausted { message: String },

    #[error("canceled")]
    Cancelled,

    #[error("aborted: {message}")]
    Aborted { message: String },

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Transaction error: {message} (transaction: {transaction_id})")]
    Transaction {
        message: String,
        transaction_id: String,
    },

    #[error("unknown: {message}")]
    Unknown { message: String },

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("{message}: {source}")]
    WithMessage {
        message: Cow<'static, str>,
        #[source]
        source: Box<DbError>,
    },
}

impl DbError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an already exists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    /// Create a failed precondition error.
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition {
            message: message.into(),
        }
    }

    /// Create a permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a resource exhausted error.
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
        }
    }

    /// Create an aborted error.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            transaction_id: transaction_id.into(),
        }
    }

    /// Create an unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Annotate `err` with a short description of the operation that failed.
    ///
    /// An absent error is replaced by [`DbError::Unknown`] so that a caller
    /// always gets something reportable.
    pub fn with_message(err: Option<DbError>, message: impl Into<Cow<'static, str>>) -> Self {
        let source = err.unwrap_or_else(|| Self::unknown("error is lost"));
        Self::WithMessage {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// The category of this error, looking through message wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::FailedPrecondition { .. } => ErrorKind::FailedPrecondition,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Aborted { .. } => ErrorKind::Aborted,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Transaction { .. } => ErrorKind::FailedPrecondition,
            Self::Connection { .. } | Self::Unknown { .. } => ErrorKind::Unknown,
            Self::Sqlx(err) => sqlx_kind(err),
            Self::WithMessage { source, .. } => source.kind(),
        }
    }

    /// Shorthand for `self.kind() == kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// The innermost error of the `source()` chain.
    pub fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        let mut current: &(dyn std::error::Error + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::WithMessage { source, .. } => source.suggestion(),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Nothing in this crate retries on its own; callers decide, typically by
    /// re-running a whole unit of work after a serialization conflict.
    pub fn is_retryable(&self) -> bool {
        if let Self::WithMessage { source, .. } = self {
            return source.is_retryable();
        }
        matches!(self, Self::Connection { .. })
            || matches!(
                self.kind(),
                ErrorKind::Aborted | ErrorKind::ResourceExhausted
            )
    }
}

/// Classify a sqlx error by what the driver already tells us about it.
fn sqlx_kind(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::PoolTimedOut => ErrorKind::ResourceExhausted,
        sqlx::Error::Database(db_err) => {
            use sqlx::error::ErrorKind as DbKind;
            match db_err.kind() {
                DbKind::UniqueViolation => ErrorKind::AlreadyExists,
                DbKind::ForeignKeyViolation | DbKind::NotNullViolation | DbKind::CheckViolation => {
                    ErrorKind::FailedPrecondition
                }
                _ => match db_err.code().as_deref() {
                    Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => ErrorKind::Aborted,
                    _ => ErrorKind::Unknown,
                },
            }
        }
        _ => ErrorKind::Unknown,
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Attach an operation description to the error of a `Result`.
pub trait ResultExt<T> {
    fn with_message(self, message: &'static str) -> DbResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<DbError>,
{
    fn with_message(self, message: &'static str) -> DbResult<T> {
        self.map_err(|err| DbError::with_message(Some(err.into()), message))
    }
}
