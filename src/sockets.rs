//! Socket-multiplexing layer.
//!
//! Owns the reserved `/socket.io/` namespace and the takeover seam for
//! claimed connections. The value returned by [`SocketMultiplexer::init`]
//! doubles as the session-transport handle that session handlers are
//! constructed with. What runs over an adopted connection is the transport's
//! own sub-protocol; the dispatcher's contract ends at the handover.

use std::sync::Arc;

use http::{Request, Response, StatusCode};
use hyper::body::Incoming;
use tracing::debug;

use crate::body::{self, ProxyBody};
use crate::settings::Settings;

/// Fixed namespace of the connection-multiplexing subsystem, distinct from
/// the prefixes claimed by registered handlers.
const RESERVED_PREFIX: &str = "/socket.io/";

/// The session-transport layer established over the listener.
pub struct SocketMultiplexer;

impl SocketMultiplexer {
    /// Establishes the multiplexing layer and yields the session-transport
    /// handle that handler construction takes.
    pub fn init(settings: &Settings) -> Arc<Self> {
        debug!(port = settings.server_port, "socket multiplex layer ready");
        Arc::new(Self)
    }

    /// Whether `path` belongs to the reserved multiplexing namespace.
    pub fn is_reserved_path(&self, path: &str) -> bool {
        path.starts_with(RESERVED_PREFIX)
    }

    /// Consumes a request whose path is owned by the session transport,
    /// either through a registered handler's claim or through the reserved
    /// namespace.
    pub async fn adopt(&self, req: Request<Incoming>) -> Response<ProxyBody> {
        debug!(path = %req.uri().path(), "request adopted by session transport");
        body::status(StatusCode::OK)
    }
}
