//! Request access logging.

use http::{Method, StatusCode};
use tracing::info;

/// Records one classified request and the status it was answered with.
pub(crate) fn log_request(method: &Method, path: &str, status: StatusCode) {
    info!(method = %method, path = %path, status = status.as_u16(), "request");
}
