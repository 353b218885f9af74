//! The fixed session handlers.
//!
//! Each handler is a claim predicate over a URL-path prefix plus whatever
//! configuration its session type needs. Construction is fire-and-forget:
//! the registry's `Arc` is the only reference the dispatcher keeps, and a
//! handler's resources are its own business from then on.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::registry::SessionHandler;
use crate::sockets::SocketMultiplexer;

/// Bridges terminal sessions into the kernel container.
pub struct TtyHandler {
    prefix: String,
    _transport: Arc<SocketMultiplexer>,
}

impl TtyHandler {
    pub fn new(
        prefix: &str,
        transport: Arc<SocketMultiplexer>,
        kernel_container_name: &str,
    ) -> Arc<Self> {
        info!(prefix, container = kernel_container_name, "terminal session handler registered");
        Arc::new(Self { prefix: prefix.to_owned(), _transport: transport })
    }
}

impl SessionHandler for TtyHandler {
    fn claims(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Multiplexes debug-adapter-protocol sessions behind one path prefix.
pub struct DebugAdapterHandler {
    prefix: String,
    _transport: Arc<SocketMultiplexer>,
}

impl DebugAdapterHandler {
    pub fn new(prefix: &str, transport: Arc<SocketMultiplexer>) -> Arc<Self> {
        info!(prefix, "debug adapter multiplexer registered");
        Arc::new(Self { prefix: prefix.to_owned(), _transport: transport })
    }
}

impl SessionHandler for DebugAdapterHandler {
    fn claims(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Manages the language-server process for the content tree.
pub struct LspHandler {
    prefix: &'static str,
    _transport: Arc<SocketMultiplexer>,
}

impl LspHandler {
    pub fn new(
        transport: Arc<SocketMultiplexer>,
        content_dir: PathBuf,
        logs_dir: PathBuf,
        kernel_container_name: &str,
    ) -> Arc<Self> {
        info!(
            content = %content_dir.display(),
            logs = %logs_dir.display(),
            container = kernel_container_name,
            "language server handler registered"
        );
        Arc::new(Self { prefix: "/lsp", _transport: transport })
    }
}

impl SessionHandler for LspHandler {
    fn claims(&self, path: &str) -> bool {
        path.starts_with(self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[test]
    fn handlers_claim_their_prefixes() {
        let transport = SocketMultiplexer::init(&Settings::default());

        let tty = TtyHandler::new("/tty", Arc::clone(&transport), "kernel");
        assert!(tty.claims("/tty"));
        assert!(tty.claims("/tty/session/1"));
        assert!(!tty.claims("/debugger"));

        let dap = DebugAdapterHandler::new("/debugger", Arc::clone(&transport));
        assert!(dap.claims("/debugger/attach"));
        assert!(!dap.claims("/tty"));

        let lsp = LspHandler::new(transport, PathBuf::from("/content"), PathBuf::from("/var/log"), "kernel");
        assert!(lsp.claims("/lsp"));
        assert!(!lsp.claims("/api/sessions"));
    }
}
