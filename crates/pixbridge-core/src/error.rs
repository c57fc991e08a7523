//! Error types for pixbridge-core operations.
//!
//! Every fallible operation in this crate returns [`Result`]. Errors fall into
//! three kinds, see [`ErrorKind`]:
//!
//! - **Invalid argument**: bad rank, unknown dtype tag, malformed axis order,
//!   shape/size mismatch. Surfaced to the caller immediately.
//! - **Out of range**: a coordinate or plane index outside the buffer.
//! - **Internal consistency**: identity/type mismatch in a translation
//!   registry, or a view used after its owner reallocated. These abort the
//!   current call and are never recovered silently.
//!
//! # Usage
//!
//! ```rust
//! use pixbridge_core::{Error, ErrorKind, Result};
//!
//! fn check_rank(rank: usize) -> Result<()> {
//!     if !(1..=4).contains(&rank) {
//!         return Err(Error::invalid_argument(format!("rank {rank} not in 1..=4")));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_rank(5).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidArgument);
//! assert!(!err.is_fatal());
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; recoverable.
    InvalidArgument,
    /// Index outside bounds; recoverable.
    OutOfRange,
    /// Broken internal invariant; fatal for the current call.
    InternalConsistency,
}

/// Errors raised while converting between array views and pixel buffers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Bad rank, unsupported dtype tag, malformed axis order or size mismatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Coordinate outside the extent of an axis.
    ///
    /// `index` is the value as supplied by the caller (possibly negative).
    #[error("{axis} index {index} out of range for axis of size {size}")]
    OutOfRange {
        /// Axis name ("x", "y", "z", "c", "plane", ...)
        axis: &'static str,
        /// Requested index
        index: i64,
        /// Size of the axis
        size: usize,
    },

    /// Identity/type mismatch or lifetime violation.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),
}

impl Error {
    /// Creates an [`Error::InvalidArgument`] error.
    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates an [`Error::OutOfRange`] error.
    #[inline]
    pub fn out_of_range(axis: &'static str, index: i64, size: usize) -> Self {
        Self::OutOfRange { axis, index, size }
    }

    /// Creates an [`Error::InternalConsistency`] error.
    #[inline]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalConsistency(msg.into())
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InternalConsistency(_) => ErrorKind::InternalConsistency,
        }
    }

    /// Returns `true` if the current call must be aborted.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::InternalConsistency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = Error::out_of_range("x", -7, 5);
        let msg = err.to_string();
        assert!(msg.contains("-7"));
        assert!(msg.contains('5'));
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_only_internal_is_fatal() {
        assert!(Error::internal("mismatch").is_fatal());
        assert!(!Error::invalid_argument("rank").is_fatal());
        assert!(!Error::out_of_range("y", 3, 2).is_fatal());
    }
}
