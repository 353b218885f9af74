//! Server lifecycle and the request/upgrade entry points.
//!
//! [`Server::run`] wires the collaborators together, registers the session
//! handlers, and starts the accept loop; the returned [`ServerHandle`] is
//! the single live instance. Each connection runs in its own task, and each
//! standard request additionally runs inside a failure boundary, so no fault
//! in one dispatch can taint the listener for the others.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use http::{Request, Response, StatusCode, header};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::body::{self, ProxyBody};
use crate::error::{BoxError, Error};
use crate::logging;
use crate::notebook::NotebookApi;
use crate::proxy::ReverseProxy;
use crate::registry::HandlerRegistry;
use crate::router::{Disposition, PortResolver, Router};
use crate::sessions::{DebugAdapterHandler, LspHandler, TtyHandler};
use crate::settings::Settings;
use crate::sockets::SocketMultiplexer;

/// Guards the single-instance invariant: one live dispatcher per process.
static RUNNING: AtomicBool = AtomicBool::new(false);

/// Everything a dispatch needs, shared across all connection tasks.
struct Dispatch {
    router: Router,
    api: Arc<NotebookApi>,
    proxy: Arc<ReverseProxy>,
    sockets: Arc<SocketMultiplexer>,
    local_port: u16,
}

/// The dispatcher, configured but not yet listening.
pub struct Server {
    settings: Settings,
    resolver: Option<Arc<dyn PortResolver>>,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings, resolver: None }
    }

    /// Replaces the default path-derived port resolver.
    ///
    /// The classifier consumes the resolver through its trait, so embedders
    /// can supply their own path-to-port mapping without touching the rest
    /// of the dispatch.
    pub fn with_resolver(mut self, resolver: Arc<dyn PortResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Binds the listener, registers the session handlers, and starts
    /// accepting traffic.
    ///
    /// Fails with [`Error::AlreadyRunning`] if another instance is live in
    /// this process, or [`Error::Bind`] if the listener cannot bind.
    pub async fn run(self) -> Result<ServerHandle, Error> {
        if RUNNING
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }
        match self.start().await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                RUNNING.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    async fn start(self) -> Result<ServerHandle, Error> {
        let Server { settings, resolver } = self;

        let api = NotebookApi::init(&settings);
        let proxy = ReverseProxy::init(&settings);

        let listener = TcpListener::bind(settings.bind_addr()).await.map_err(Error::Bind)?;
        let local_addr = listener.local_addr().map_err(Error::Bind)?;

        let sockets = SocketMultiplexer::init(&settings);

        // All registration happens here, before the accept loop starts, so
        // steady-state dispatch reads the registry without locking.
        let mut registry = HandlerRegistry::new();
        registry.register(TtyHandler::new(
            "/tty",
            Arc::clone(&sockets),
            &settings.kernel_container_name,
        ));
        if let Some(mux_path) = &settings.debug_adapter_multiplexer_path {
            registry.register(DebugAdapterHandler::new(mux_path, Arc::clone(&sockets)));
        }
        if settings.enable_lsp {
            let content_dir = settings.root_dir.join(&settings.content_dir);
            let logs_dir = settings.root_dir.join("var/log");
            registry.register(LspHandler::new(
                Arc::clone(&sockets),
                content_dir,
                logs_dir,
                &settings.kernel_container_name,
            ));
        }

        let resolver = resolver.unwrap_or_else(|| Arc::clone(&proxy) as Arc<dyn PortResolver>);
        let router = Router::new(registry, resolver, Arc::clone(&sockets));

        let dispatch = Arc::new(Dispatch {
            router,
            api: Arc::clone(&api),
            proxy,
            sockets,
            local_port: local_addr.port(),
        });

        info!(addr = %local_addr, "dispatcher listening");

        // An interrupt terminates the process directly; there is no drain.
        tokio::spawn(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(0);
            }
        });

        let accept = tokio::spawn(accept_loop(listener, dispatch));

        Ok(ServerHandle { addr: local_addr, api, accept })
    }
}

/// The single live dispatcher instance. Created by [`run`], consumed by
/// [`ServerHandle::stop`].
pub struct ServerHandle {
    addr: SocketAddr,
    api: Arc<NotebookApi>,
    accept: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to. With a configured port of 0 this
    /// is where the ephemeral port shows up.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs until the accept loop ends, which in practice means until the
    /// process exits.
    pub async fn wait(self) {
        let _ = self.accept.await;
    }

    /// Stops the dispatcher.
    ///
    /// Only the notebook collaborator is torn down. The listener and the
    /// registered session handlers are left to process exit. Consuming the
    /// handle releases the single-instance guard, so a new dispatcher may be
    /// started afterwards.
    pub fn stop(self) {
        self.api.close();
        RUNNING.store(false, Ordering::Release);
        info!(addr = %self.addr, "dispatcher stopped");
    }
}

/// Runs the dispatcher with the default path-derived resolver.
pub async fn run(settings: Settings) -> Result<ServerHandle, Error> {
    Server::new(settings).run().await
}

/// Stops a running dispatcher. See [`ServerHandle::stop`].
pub fn stop(handle: ServerHandle) {
    handle.stop();
}

// ── Accept loop ───────────────────────────────────────────────────────────────

async fn accept_loop(listener: TcpListener, dispatch: Arc<Dispatch>) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("accept error: {e}");
                continue;
            }
        };

        let dispatch = Arc::clone(&dispatch);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let conn_dispatch = Arc::clone(&dispatch);
            let svc = service_fn(move |req| {
                let dispatch = Arc::clone(&conn_dispatch);
                // Adapt the boxed entry-point error to a concrete error type at
                // the hyper boundary: `serve_connection_with_upgrades` needs the
                // service error to satisfy `Into<Box<dyn Error>>` under a
                // higher-ranked lifetime, which a bare boxed error does not.
                async move { entry(dispatch, req).await.map_err(std::io::Error::other) }
            });

            let mut builder = ConnBuilder::new(TokioExecutor::new());
            // Disable the keep-alive idle timer; idle resets show up as
            // connection flakes on the target deployment's networks.
            builder.http1().header_read_timeout(None);

            if let Err(e) = builder.serve_connection_with_upgrades(io, svc).await {
                error!(peer = %remote_addr, "connection error: {e}");
            }
        });
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Entry point for one inbound transaction.
///
/// Upgrade handshakes go straight to the notebook API's socket handler and
/// never enter classification. Standard requests run inside the failure
/// boundary: the dispatch runs as its own task, and a panic there is caught
/// at the join, logged with the request target, and turned into a terminated
/// response with no detail sent to the client. The listener keeps serving.
async fn entry(
    dispatch: Arc<Dispatch>,
    req: Request<Incoming>,
) -> Result<Response<ProxyBody>, BoxError> {
    if req.headers().contains_key(header::UPGRADE) {
        return Ok(dispatch.api.handle_upgrade(req).await);
    }

    let target = req.uri().to_string();
    match tokio::spawn(route(dispatch, req)).await {
        Ok(res) => Ok(res),
        Err(fault) => {
            error!("uncaught error handling a request to {target:?}: {fault}");
            Err(fault.into())
        }
    }
}

/// Classifies one request and executes its disposition.
async fn route(dispatch: Arc<Dispatch>, req: Request<Incoming>) -> Response<ProxyBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let res = match dispatch.router.classify(&path, dispatch.local_port) {
        Disposition::ClaimedByHandler => dispatch.sockets.adopt(req).await,
        Disposition::ReverseProxy { target_port } => {
            match dispatch.proxy.forward(req, target_port).await {
                Ok(res) => res,
                Err(e) => {
                    error!(port = target_port, "reverse proxy error: {e}");
                    body::status(StatusCode::BAD_GATEWAY)
                }
            }
        }
        Disposition::LocalApi => match dispatch.api.handle_request(req).await {
            Ok(res) => res,
            Err(e) => {
                error!("notebook API error: {e}");
                body::status(StatusCode::BAD_GATEWAY)
            }
        },
        Disposition::NotFound => body::status(StatusCode::NOT_FOUND),
    };

    logging::log_request(&method, &path, res.status());
    res
}
