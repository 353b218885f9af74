//! Minimal usher demo: the dispatcher in front of a local notebook server.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8080/api/sessions          # embedded notebook API
//!   curl http://localhost:8080/_proxy/8081/metrics   # reverse proxy to :8081
//!   curl http://localhost:8080/nonexistent           # 404, empty body
//!
//! Pass a path to a camelCase JSON settings file as the first argument to
//! override the defaults.

use usher::Settings;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path).expect("settings error"),
        None => Settings::default(),
    };

    let handle = usher::run(settings).await.expect("server error");
    handle.wait().await;
}
