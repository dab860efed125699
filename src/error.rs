//! Path-local error taxonomy.
//!
//! Only failures scoped to one extraction path live here. Bad arguments and
//! a failed display connection are fatal and are reported as `anyhow` errors
//! from `main` before either path runs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The `_NET_WM_ICON` property exists but fails the CARDINAL /
    /// format-32 sanity checks.
    #[error("malformed _NET_WM_ICON property: {0}")]
    MalformedProperty(&'static str),

    /// Geometry lookup failed for the icon pixmap or its mask.
    #[error("geometry unavailable for {0}")]
    GeometryUnavailable(&'static str),

    /// Transport-level failure while a request for this path was in flight.
    #[error("X protocol error: {0}")]
    Protocol(String),
}

impl From<x11rb::errors::ConnectionError> for ExtractError {
    fn from(error: x11rb::errors::ConnectionError) -> Self {
        ExtractError::Protocol(error.to_string())
    }
}

impl From<x11rb::errors::ReplyError> for ExtractError {
    fn from(error: x11rb::errors::ReplyError) -> Self {
        ExtractError::Protocol(error.to_string())
    }
}
