//! Error utilities for weft and its users.
//!
//! The crates in this workspace report failures as either a typed error
//! (when the caller can reasonably act on the distinction) or as an
//! [`OpaqueError`] (when only the fact of the failure matters). Both
//! convert freely into [`BoxError`], which is the currency accepted at
//! the composition seams such as [`DataSink`] pipelines.
//!
//! The [`ErrorContext`] extension trait adds call-site context to the
//! error contained in a `Result` or to a `None`, producing an
//! [`OpaqueError`] so that the `?` operator keeps working across layers:
//!
//! ```rust
//! use weft_error::{ErrorContext, OpaqueError};
//!
//! fn port(value: &str) -> Result<u16, OpaqueError> {
//!     value.parse().context("parse port")
//! }
//!
//! assert_eq!(port("80").unwrap(), 80);
//! assert!(port("nope").unwrap_err().to_string().contains("parse port"));
//! ```
//!
//! [`DataSink`]: https://docs.rs/weft-io

use std::error::Error as StdError;
use std::fmt;

/// Type-erased error, the error currency at composition boundaries.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// An opaque error with an optional chain of context messages.
///
/// Use this when the concrete failure is not actionable for the caller
/// and only the report matters. The full context chain is rendered by
/// the [`fmt::Display`] implementation, while [`StdError::source`]
/// still exposes the wrapped error for loggers that walk the chain.
pub struct OpaqueError {
    context: Option<String>,
    inner: Option<BoxError>,
}

impl OpaqueError {
    /// Create an [`OpaqueError`] from a display-able message.
    pub fn from_display(message: impl fmt::Display) -> Self {
        Self {
            context: Some(message.to_string()),
            inner: None,
        }
    }

    /// Create an [`OpaqueError`] by wrapping a concrete error.
    pub fn from_std(error: impl Into<BoxError>) -> Self {
        Self {
            context: None,
            inner: Some(error.into()),
        }
    }

    /// Wrap this error with an additional layer of context.
    #[must_use]
    pub fn context(self, context: impl fmt::Display) -> Self {
        Self {
            context: Some(match self.context {
                Some(prev) => format!("{context}: {prev}"),
                None => context.to_string(),
            }),
            inner: self.inner,
        }
    }

    /// Convert into a [`BoxError`].
    #[must_use]
    pub fn into_boxed(self) -> BoxError {
        Box::new(self)
    }
}

impl fmt::Debug for OpaqueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueError")
            .field("context", &self.context)
            .field("inner", &self.inner)
            .finish()
    }
}

impl fmt::Display for OpaqueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.context, &self.inner) {
            (Some(context), Some(inner)) => write!(f, "{context}: {inner}"),
            (Some(context), None) => context.fmt(f),
            (None, Some(inner)) => inner.fmt(f),
            (None, None) => f.write_str("unknown error"),
        }
    }
}

impl StdError for OpaqueError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

/// Extends `Result` and `Option` with methods to attach call-site context.
///
/// For a `Result` the context wraps the error variant; for an `Option`
/// a `None` becomes an error carrying the context.
pub trait ErrorContext<T>: private::Sealed {
    /// Attach context to the contained failure.
    fn context(self, context: impl fmt::Display) -> Result<T, OpaqueError>;

    /// Attach lazily-built context to the contained failure.
    fn with_context<C: fmt::Display, F: FnOnce() -> C>(self, f: F) -> Result<T, OpaqueError>;
}

impl<T, E: Into<BoxError>> ErrorContext<T> for Result<T, E> {
    fn context(self, context: impl fmt::Display) -> Result<T, OpaqueError> {
        self.map_err(|error| OpaqueError::from_std(error).context(context))
    }

    fn with_context<C: fmt::Display, F: FnOnce() -> C>(self, f: F) -> Result<T, OpaqueError> {
        self.map_err(|error| OpaqueError::from_std(error).context(f()))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, context: impl fmt::Display) -> Result<T, OpaqueError> {
        self.ok_or_else(|| OpaqueError::from_display(context))
    }

    fn with_context<C: fmt::Display, F: FnOnce() -> C>(self, f: F) -> Result<T, OpaqueError> {
        self.ok_or_else(|| OpaqueError::from_display(f()))
    }
}

mod private {
    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
    impl<T> Sealed for Option<T> {}
}
