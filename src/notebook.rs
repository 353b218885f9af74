//! Embedded notebook API collaborator.
//!
//! Requests classified as [`Disposition::LocalApi`](crate::Disposition), and
//! every protocol upgrade, are delegated here and carried to the notebook
//! server on its local port. The notebook server itself is a separate
//! process; this module owns the dispatcher's connection to it and nothing
//! else.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use http::{Request, Response, StatusCode, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpStream;
use tracing::{debug, error};

use crate::body::{self, ProxyBody};
use crate::error::BoxError;
use crate::settings::Settings;

/// The dispatcher's connection to the embedded notebook server.
pub struct NotebookApi {
    port: u16,
    client: Client<HttpConnector, Incoming>,
    /// Cleared by [`NotebookApi::close`]. A closed collaborator refuses
    /// traffic instead of dialing a server that is being torn down.
    open: AtomicBool,
}

impl NotebookApi {
    pub fn init(settings: &Settings) -> Arc<Self> {
        Arc::new(Self {
            port: settings.notebook_port,
            client: Client::builder(TokioExecutor::new()).build_http(),
            open: AtomicBool::new(true),
        })
    }

    /// Forwards an API request to the notebook server.
    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<ProxyBody>, BoxError> {
        if !self.open.load(Ordering::Acquire) {
            return Ok(body::status(StatusCode::SERVICE_UNAVAILABLE));
        }

        let target = Uri::builder()
            .scheme("http")
            .authority(format!("127.0.0.1:{}", self.port))
            .path_and_query(req.uri().path_and_query().map_or("/", |pq| pq.as_str()).to_owned())
            .build()?;

        let (mut parts, req_body) = req.into_parts();
        parts.uri = target;

        let res = self.client.request(Request::from_parts(parts, req_body)).await?;
        Ok(body::boxed(res))
    }

    /// Relays a protocol-upgrade handshake to the notebook server.
    ///
    /// The handshake is carried end to end: the notebook server answers the
    /// upgrade, and on a `101` both connections are handed to a relay task
    /// that copies bytes in both directions until either side closes. Bytes
    /// the client sent past the handshake are buffered inside its upgraded
    /// stream and are not lost.
    pub async fn handle_upgrade(&self, mut req: Request<Incoming>) -> Response<ProxyBody> {
        if !self.open.load(Ordering::Acquire) {
            return body::status(StatusCode::SERVICE_UNAVAILABLE);
        }

        let client_upgrade = hyper::upgrade::on(&mut req);

        let stream = match TcpStream::connect(("127.0.0.1", self.port)).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("notebook socket connect failed: {e}");
                return body::status(StatusCode::BAD_GATEWAY);
            }
        };

        let (mut sender, conn) = match hyper::client::conn::http1::handshake(TokioIo::new(stream)).await {
            Ok(pair) => pair,
            Err(e) => {
                error!("notebook handshake failed: {e}");
                return body::status(StatusCode::BAD_GATEWAY);
            }
        };

        // The connection task must keep polling after the 101 so the
        // server-side upgrade completes.
        tokio::spawn(async move {
            if let Err(e) = conn.with_upgrades().await {
                debug!("notebook upgrade connection ended: {e}");
            }
        });

        let mut res = match sender.send_request(req).await {
            Ok(res) => res,
            Err(e) => {
                error!("notebook upgrade request failed: {e}");
                return body::status(StatusCode::BAD_GATEWAY);
            }
        };

        if res.status() == StatusCode::SWITCHING_PROTOCOLS {
            let server_upgrade = hyper::upgrade::on(&mut res);
            tokio::spawn(async move {
                match tokio::try_join!(client_upgrade, server_upgrade) {
                    Ok((client_io, server_io)) => {
                        let mut client_io = TokioIo::new(client_io);
                        let mut server_io = TokioIo::new(server_io);
                        if let Err(e) =
                            tokio::io::copy_bidirectional(&mut client_io, &mut server_io).await
                        {
                            debug!("upgraded relay ended: {e}");
                        }
                    }
                    Err(e) => error!("upgrade completion failed: {e}"),
                }
            });
        }

        body::boxed(res)
    }

    /// Tears down the connection to the notebook server. Traffic arriving
    /// afterwards is refused.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
        debug!("notebook API collaborator closed");
    }
}
