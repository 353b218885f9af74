//! Ordered registry of path-claiming session handlers.
//!
//! Registration order encodes priority: [`HandlerRegistry::first_claiming`]
//! scans in registration order and stops at the first match, so callers must
//! register more specific or higher-priority handlers before general ones
//! when prefixes can overlap. The registry is append-only and all
//! registration happens during startup, before traffic flows; steady-state
//! dispatch reads it without synchronization.

use std::sync::Arc;

/// A long-lived collaborator that takes over the traffic of a URL-path
/// prefix at the protocol level.
///
/// The registry's `Arc` is the only reference the dispatcher keeps; a
/// handler manages its own internal lifetime after construction.
pub trait SessionHandler: Send + Sync + 'static {
    /// Does this handler own `path`?
    fn claims(&self, path: &str) -> bool;
}

/// Append-only, ordered collection of registered handlers.
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn SessionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Appends a handler. No deduplication, no removal.
    pub fn register(&mut self, handler: Arc<dyn SessionHandler>) {
        self.handlers.push(handler);
    }

    /// First registered handler claiming `path`, if any.
    ///
    /// Zero matches is a normal outcome, not a failure.
    pub fn first_claiming(&self, path: &str) -> Option<&dyn SessionHandler> {
        self.handlers.iter().find(|h| h.claims(path)).map(|h| h.as_ref())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
