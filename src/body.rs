//! Response body plumbing shared by every dispatch path.
//!
//! Dispatch outcomes come from three places with three different body types:
//! responses built locally (empty), responses streamed back from a backend
//! (`Incoming`), and upgrade handshake replies. `BoxBody` erases the
//! difference so the entry point speaks a single response type.

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty};

/// The one response body type the entry point returns.
pub(crate) type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// An empty body.
pub(crate) fn empty() -> ProxyBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// A bodyless response with the given status.
pub(crate) fn status(code: StatusCode) -> Response<ProxyBody> {
    let mut res = Response::new(empty());
    *res.status_mut() = code;
    res
}

/// Erases a backend response body so it streams through without buffering.
pub(crate) fn boxed(res: Response<hyper::body::Incoming>) -> Response<ProxyBody> {
    res.map(BodyExt::boxed)
}
