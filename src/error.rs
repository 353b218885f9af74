//! Unified error type.

use std::fmt;
use std::io;

/// Errors inside request handling are contained at the entry point and never
/// reach the caller as this type; they travel as boxed errors internally.
pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by usher's fallible operations.
///
/// Routing outcomes (404 and friends) are expressed as HTTP responses, not
/// as `Error`s. This type surfaces lifecycle failures: loading settings,
/// binding the listener, or starting a second dispatcher in one process.
#[derive(Debug)]
pub enum Error {
    /// The listener could not bind the requested address. Fatal, no retry.
    Bind(io::Error),
    /// `run` was called while another dispatcher instance is listening.
    AlreadyRunning,
    /// The settings file could not be read.
    Read(io::Error),
    /// The settings file could not be parsed.
    Parse(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bind(e) => write!(f, "bind: {e}"),
            Error::AlreadyRunning => write!(f, "a dispatcher is already running in this process"),
            Error::Read(e) => write!(f, "settings: {e}"),
            Error::Parse(e) => write!(f, "settings: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind(e) | Error::Read(e) => Some(e),
            Error::Parse(e) => Some(e),
            Error::AlreadyRunning => None,
        }
    }
}
