//! Crate-local error kinds, grounded in the kinds enumerated by the original
//! reference implementation (EINVAL / ENOBUFS / EDOM / EIO / EOPNOTSUPP) but
//! expressed as a closed Rust enum instead of raw errno values.

use std::fmt;

/// A codec- or backend-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Null/misshaped input (missing SysEx payload, bare 0xF7, ...).
    InvalidArgument,
    /// The destination buffer was too small; serialization reports how many
    /// bytes would have been required via `Error::BufferTooSmall(needed)`.
    BufferTooSmall(usize),
    /// A SysEx payload byte had its top bit set.
    Domain,
    /// A concurrent write is already in flight on this handle.
    Busy,
    /// The backend does not support this event type, but the caller may
    /// ignore the failure (real-time messages).
    Unsupported,
    /// The backend failed to handle an otherwise well-formed event.
    Io,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::BufferTooSmall(needed) => write!(f, "buffer too small, need {needed} bytes"),
            Error::Domain => write!(f, "value out of domain"),
            Error::Busy => write!(f, "resource busy"),
            Error::Unsupported => write!(f, "operation not supported"),
            Error::Io => write!(f, "backend i/o failure"),
        }
    }
}

impl std::error::Error for Error {}
