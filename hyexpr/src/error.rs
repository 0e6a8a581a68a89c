//! Status-style errors shared by the expression model and the serialization layer.
//!
//! Every failure carries one of a small set of codes plus a human readable
//! message. Callers add positional context while the error travels up, which
//! appends `"; <context>"` to the message and keeps the code untouched:
//!
//! ```rust
//! # use hyexpr::error::{Error, ErrorCode};
//! let err = Error::InvalidArgument("value index is out of range: 7".into())
//!     .with_context("while handling decoding_steps[3]");
//! assert_eq!(err.code(), ErrorCode::InvalidArgument);
//! assert_eq!(
//!     err.to_string(),
//!     "value index is out of range: 7; while handling decoding_steps[3]"
//! );
//! ```
use strum::{Display, EnumIs};
use thiserror::Error;

/// Error categories, one per [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorCode {
    InvalidArgument,
    FailedPrecondition,
    NotFound,
    AlreadyExists,
    Internal,
    Unimplemented,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, Error)]
pub enum Error {
    /// Malformed input: bad version, out-of-range index, unexpected type or
    /// shape, invalid request.
    #[error("{0}")]
    InvalidArgument(String),

    /// The input is well-formed but the current state does not allow the
    /// operation (missing dependencies, name collisions).
    #[error("{0}")]
    FailedPrecondition(String),

    /// Unknown codec or operator name.
    #[error("{0}")]
    NotFound(String),

    /// A distinct entity already owns the requested name.
    #[error("{0}")]
    AlreadyExists(String),

    /// Corruption of an outer transport envelope or an I/O failure.
    #[error("{0}")]
    Internal(String),

    /// No codec is able to handle the given value.
    #[error("{0}")]
    Unimplemented(String),
}

impl Error {
    /// Code of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Error::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::AlreadyExists(_) => ErrorCode::AlreadyExists,
            Error::Internal(_) => ErrorCode::Internal,
            Error::Unimplemented(_) => ErrorCode::Unimplemented,
        }
    }

    /// Message of this error, including every context appended so far.
    pub fn message(&self) -> &str {
        match self {
            Error::InvalidArgument(msg)
            | Error::FailedPrecondition(msg)
            | Error::NotFound(msg)
            | Error::AlreadyExists(msg)
            | Error::Internal(msg)
            | Error::Unimplemented(msg) => msg,
        }
    }

    fn message_mut(&mut self) -> &mut String {
        match self {
            Error::InvalidArgument(msg)
            | Error::FailedPrecondition(msg)
            | Error::NotFound(msg)
            | Error::AlreadyExists(msg)
            | Error::Internal(msg)
            | Error::Unimplemented(msg) => msg,
        }
    }

    /// Append a positional context to the message, keeping the code.
    pub fn with_context(mut self, context: impl std::fmt::Display) -> Self {
        let msg = self.message_mut();
        msg.push_str("; ");
        msg.push_str(&context.to_string());
        self
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Context helpers for [`Result`].
pub trait ResultExt<T> {
    /// Annotate the error (if any) with a fixed context.
    fn context(self, context: impl std::fmt::Display) -> Result<T>;

    /// Annotate the error (if any) with a lazily built context.
    fn with_context<C: std::fmt::Display>(self, f: impl FnOnce() -> C) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<C: std::fmt::Display>(self, f: impl FnOnce() -> C) -> Result<T> {
        self.map_err(|e| e.with_context(f()))
    }
}
