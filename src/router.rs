//! Request classification.
//!
//! The one place that decides who owns an inbound request. Classification is
//! stateless and total: every path maps to exactly one [`Disposition`], with
//! no possibility of remaining unclassified, and performs no mutation of
//! shared state, so concurrent dispatches never need to synchronize.

use std::sync::Arc;

use crate::registry::HandlerRegistry;
use crate::sockets::SocketMultiplexer;

/// Reserved path prefixes of the embedded notebook API and asset surface.
/// `/files` and `/static` are only used when serving from a local content
/// tree.
const API_PREFIXES: [&str; 4] = ["/api", "/nbextensions", "/files", "/static"];

/// The routing outcome chosen for one request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// A registered session handler (or the socket-multiplexing layer's
    /// reserved namespace) owns the path; the transport subsystem consumes
    /// the request.
    ClaimedByHandler,
    /// Forward to the backend process listening on `target_port`.
    ReverseProxy { target_port: u16 },
    /// The embedded notebook API serves the request.
    LocalApi,
    /// Unroutable; answered with 404 and an empty body.
    NotFound,
}

/// Maps a URL path to a candidate backend port.
///
/// Consumed by the classifier, implemented by the reverse-proxy collaborator
/// (or by embedders supplying their own mapping). Must be a pure function of
/// the path: no blocking, no I/O observable to the caller.
pub trait PortResolver: Send + Sync + 'static {
    fn resolve_port(&self, path: &str) -> Option<u16>;
}

/// The request classifier.
pub struct Router {
    registry: HandlerRegistry,
    resolver: Arc<dyn PortResolver>,
    sockets: Arc<SocketMultiplexer>,
}

impl Router {
    pub fn new(
        registry: HandlerRegistry,
        resolver: Arc<dyn PortResolver>,
        sockets: Arc<SocketMultiplexer>,
    ) -> Self {
        Self { registry, resolver, sockets }
    }

    /// Classifies the request for `path` received on local port `local_port`.
    ///
    /// Decision order, first match wins:
    ///
    /// 1. a registered handler claims the path;
    /// 2. the path belongs to the socket layer's reserved namespace;
    /// 3. the resolver maps the path to a port other than the receiving one;
    /// 4. the path starts with a reserved notebook API prefix;
    /// 5. not found.
    ///
    /// Both handler checks precede generic forwarding: a handler takes over
    /// its connections at the protocol level and must never be shadowed by a
    /// proxy mapping. A mapping equal to the receiving port is skipped
    /// rather than followed; proxying a request back to the port it arrived
    /// on would let a client mask the true destination path behind a
    /// self-referential hop.
    ///
    /// Pathless request targets degrade to `""`, which matches nothing and
    /// lands on [`Disposition::NotFound`].
    pub fn classify(&self, path: &str, local_port: u16) -> Disposition {
        if self.registry.first_claiming(path).is_some() {
            return Disposition::ClaimedByHandler;
        }
        if self.sockets.is_reserved_path(path) {
            return Disposition::ClaimedByHandler;
        }
        match self.resolver.resolve_port(path) {
            Some(target_port) if target_port != local_port => {
                return Disposition::ReverseProxy { target_port };
            }
            _ => {}
        }
        if API_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            return Disposition::LocalApi;
        }
        Disposition::NotFound
    }
}
