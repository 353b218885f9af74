//! # usher
//!
//! The front door of a local notebook development proxy: one listener, one
//! decision per inbound request about which backend owns it.
//!
//! ## The contract
//!
//! Every HTTP request reaching the listener is assigned to exactly one
//! consumer:
//!
//! - a registered **session handler** (terminal, debug-adapter multiplexer,
//!   language server) that has claimed the path prefix;
//! - the **socket-multiplexing layer**'s reserved namespace;
//! - the generic **reverse proxy**, when the path encodes a backend port
//!   (`/_proxy/8081/...`) that is not the port the request arrived on;
//! - the embedded **notebook API**, for its reserved prefixes;
//! - or nobody, which is a plain `404` with an empty body.
//!
//! Handlers win over forwarding, always: a session handler takes over its
//! connections at the protocol level and must not be shadowed by a proxy
//! mapping. A mapping that points back at the receiving port is skipped
//! rather than looped. Protocol upgrades skip the whole decision and belong
//! to the notebook API.
//!
//! What usher does not do: speak the proxied protocols, implement the
//! notebook server, or run the sessions behind the handlers. Those are
//! separate processes and subsystems. usher decides who gets the bytes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use usher::Settings;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::default();
//!     let handle = usher::run(settings).await.expect("bind failed");
//!     handle.wait().await;
//! }
//! ```

mod body;
mod error;
mod logging;
mod notebook;
mod proxy;
mod registry;
mod router;
mod server;
mod sessions;
mod settings;
mod sockets;

pub use error::Error;
pub use notebook::NotebookApi;
pub use proxy::ReverseProxy;
pub use registry::{HandlerRegistry, SessionHandler};
pub use router::{Disposition, PortResolver, Router};
pub use server::{Server, ServerHandle, run, stop};
pub use sessions::{DebugAdapterHandler, LspHandler, TtyHandler};
pub use settings::Settings;
pub use sockets::SocketMultiplexer;
