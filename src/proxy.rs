//! Generic reverse proxy to local backend processes.
//!
//! The path convention is `/_proxy/{port}/...`: the first segment after the
//! prefix names the target port. Resolution is a pure function of the path;
//! forwarding streams both bodies over a pooled client. The classifier, not
//! this module, enforces that a request is never forwarded to the port it
//! arrived on.

use std::sync::Arc;

use http::{Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::body::{self, ProxyBody};
use crate::error::BoxError;
use crate::router::PortResolver;
use crate::settings::Settings;

/// Prefix of reverse-proxied paths.
const PROXY_PREFIX: &str = "/_proxy/";

/// The reverse-proxy collaborator.
pub struct ReverseProxy {
    client: Client<HttpConnector, Incoming>,
}

impl ReverseProxy {
    pub fn init(_settings: &Settings) -> Arc<Self> {
        Arc::new(Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
        })
    }

    /// Forwards the request to `127.0.0.1:{target_port}`, streaming both
    /// bodies. The path and query reach the backend unchanged.
    pub async fn forward(
        &self,
        req: Request<Incoming>,
        target_port: u16,
    ) -> Result<Response<ProxyBody>, BoxError> {
        let target = Uri::builder()
            .scheme("http")
            .authority(format!("127.0.0.1:{target_port}"))
            .path_and_query(req.uri().path_and_query().map_or("/", |pq| pq.as_str()).to_owned())
            .build()?;

        let (mut parts, req_body) = req.into_parts();
        parts.uri = target;

        let res = self.client.request(Request::from_parts(parts, req_body)).await?;
        Ok(body::boxed(res))
    }
}

impl PortResolver for ReverseProxy {
    fn resolve_port(&self, path: &str) -> Option<u16> {
        proxied_port(path)
    }
}

/// `/_proxy/8081/foo` resolves to `8081`. Anything that does not parse as a
/// nonzero port is no mapping.
fn proxied_port(path: &str) -> Option<u16> {
    let rest = path.strip_prefix(PROXY_PREFIX)?;
    let port: u16 = rest.split('/').next()?.parse().ok()?;
    (port != 0).then_some(port)
}
