//! A toy routing authority and two backend apps for trying the proxy locally.
//!
//! ```text
//! cargo run --example demo_authority
//! cargo run -- --config demos/replay-proxy.toml
//! curl -i http://127.0.0.1:8080/api/billing/invoices
//! ```

use axum::{
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use std::net::SocketAddr;

async fn authority(uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    let path = uri.path();
    if path.starts_with("/api/billing/") {
        let bypass = headers.contains_key("fly-replay-cache-control");
        (
            StatusCode::OK,
            [
                ("fly-replay", "app=billing"),
                ("fly-replay-cache", if bypass { "invalidate" } else { "/api/billing/*" }),
                ("fly-replay-cache-ttl-secs", "60"),
                ("fly-replay-cache-allow-bypass", "yes"),
            ],
            "",
        )
            .into_response()
    } else if path.starts_with("/accounts/") {
        ([("fly-replay", "app=accounts")], "").into_response()
    } else {
        (StatusCode::OK, "Served by the authority itself").into_response()
    }
}

async fn serve(addr: SocketAddr, app: Router) {
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    println!("listening on http://{}", addr);
    axum::serve(listener, app).await.unwrap();
}

#[tokio::main]
async fn main() {
    let billing = Router::new().fallback(|uri: Uri| async move { format!("billing app: {}\n", uri) });
    let accounts = Router::new().fallback(|uri: Uri| async move { format!("accounts app: {}\n", uri) });

    tokio::join!(
        serve(([127, 0, 0, 1], 8081).into(), Router::new().fallback(authority)),
        serve(([127, 0, 0, 1], 9001).into(), billing),
        serve(([127, 0, 0, 1], 9002).into(), accounts),
    );
}
