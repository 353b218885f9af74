//! End-to-end tests over a live listener.
//!
//! One test function owns the whole lifecycle: the dispatcher enforces a
//! single live instance per process, so the scenarios run sequentially
//! against servers started and stopped in order.

use std::net::SocketAddr;
use std::sync::Arc;

use usher::{PortResolver, Server, Settings};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned HTTP backend: answers every request with 200 and a body echoing
/// the request path, then closes the connection.
async fn start_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                loop {
                    match stream.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => read += n,
                    }
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                    if read == buf.len() {
                        return;
                    }
                }
                let head = String::from_utf8_lossy(&buf[..read]).into_owned();
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_owned();
                let body = format!("backend:{path}");
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body,
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// One raw HTTP/1.1 GET. Returns the parsed status code (0 if the
/// connection died before any response bytes arrived) and the raw response
/// text.
async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    let _ = stream.read_to_end(&mut raw).await;
    let text = String::from_utf8_lossy(&raw).into_owned();
    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    (status, text)
}

fn local_settings(notebook_port: u16) -> Settings {
    Settings {
        server_port: 0,
        server_host: Some("127.0.0.1".parse().unwrap()),
        notebook_port,
        ..Settings::default()
    }
}

/// Panics on `/boom` paths, resolves nothing else.
struct BoomResolver;

impl PortResolver for BoomResolver {
    fn resolve_port(&self, path: &str) -> Option<u16> {
        if path.starts_with("/boom") {
            panic!("resolver exploded");
        }
        None
    }
}

#[tokio::test]
async fn dispatcher_end_to_end() {
    let backend = start_backend().await;

    let settings = local_settings(backend.port());
    let handle = usher::run(settings.clone()).await.unwrap();
    let addr = handle.local_addr();

    // Only one dispatcher per process.
    assert!(matches!(
        usher::run(settings).await,
        Err(usher::Error::AlreadyRunning)
    ));

    // Unroutable path: 404 with an empty body.
    let (status, text) = get(addr, "/nonexistent/path").await;
    assert_eq!(status, 404);
    assert!(text.contains("content-length: 0"), "{text}");

    // Reverse proxy: path-derived port, path preserved end to end.
    let proxied = format!("/_proxy/{}/hello", backend.port());
    let (status, text) = get(addr, &proxied).await;
    assert_eq!(status, 200);
    assert!(text.contains(&format!("backend:{proxied}")), "{text}");

    // A mapping equal to the receiving port is never proxied; the path
    // matches nothing else and falls through to 404.
    let (status, _) = get(addr, &format!("/_proxy/{}/hello", addr.port())).await;
    assert_eq!(status, 404);

    // A claimed prefix is consumed by the session transport.
    let (status, _) = get(addr, "/tty/session/1").await;
    assert_eq!(status, 200);

    // So is the reserved socket namespace.
    let (status, _) = get(addr, "/socket.io/?EIO=4&transport=polling").await;
    assert_eq!(status, 200);

    // Notebook API prefixes forward to the notebook server.
    let (status, text) = get(addr, "/api/sessions").await;
    assert_eq!(status, 200);
    assert!(text.contains("backend:/api/sessions"), "{text}");

    usher::stop(handle);

    // The guard is released: a fresh dispatcher starts, this time with a
    // resolver that faults on demand.
    let handle = Server::new(local_settings(backend.port()))
        .with_resolver(Arc::new(BoomResolver))
        .run()
        .await
        .unwrap();
    let addr = handle.local_addr();

    // A classification fault terminates that request without a reply...
    let (status, text) = get(addr, "/boom").await;
    assert_eq!(status, 0, "faulted dispatch must not produce a response: {text}");

    // ...and the listener stays fully available for the next request.
    let (status, _) = get(addr, "/nonexistent").await;
    assert_eq!(status, 404);

    usher::stop(handle);
}
