//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use replay_proxy::config::{AppConfig, ProxyConfig};
use replay_proxy::{HttpServer, RoutingCache, Shutdown};

/// Serve `router` on an ephemeral loopback port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// A running mock server and the number of requests it has handled.
pub struct MockServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct EchoState {
    app: &'static str,
    hits: Arc<AtomicUsize>,
}

/// Start a backend app that echoes what it received as JSON.
pub async fn start_echo_backend(app: &'static str) -> MockServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = EchoState {
        app,
        hits: hits.clone(),
    };
    let router = Router::new()
        .route("/", any(echo))
        .route("/{*path}", any(echo))
        .with_state(state);
    MockServer {
        addr: serve(router).await,
        hits,
    }
}

async fn echo(
    State(state): State<EchoState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "app": state.app,
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "body": String::from_utf8_lossy(&body),
        "headers": header_map(&headers),
    }))
}

fn header_map(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        map.insert(
            name.as_str().to_string(),
            Value::String(value.to_str().unwrap_or_default().to_string()),
        );
    }
    Value::Object(map)
}

/// What the mock authority saw.
#[derive(Debug, Clone)]
pub struct AuthorityRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What the mock authority answers.
#[derive(Debug, Clone)]
pub struct AuthorityReply {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl AuthorityReply {
    /// A bare `fly-replay: app=<app>` reply.
    pub fn replay(app: &str) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("fly-replay", format!("app={}", app))],
            body: String::new(),
        }
    }

    pub fn direct(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

type Decide = Arc<dyn Fn(&AuthorityRequest) -> AuthorityReply + Send + Sync>;

#[derive(Clone)]
struct AuthorityState {
    decide: Decide,
    hits: Arc<AtomicUsize>,
}

/// Start a routing authority that answers with `decide(request)`.
pub async fn start_authority<F>(decide: F) -> MockServer
where
    F: Fn(&AuthorityRequest) -> AuthorityReply + Send + Sync + 'static,
{
    let hits = Arc::new(AtomicUsize::new(0));
    let state = AuthorityState {
        decide: Arc::new(decide),
        hits: hits.clone(),
    };
    let router = Router::new()
        .route("/", any(authority))
        .route("/{*path}", any(authority))
        .with_state(state);
    MockServer {
        addr: serve(router).await,
        hits,
    }
}

async fn authority(
    State(state): State<AuthorityState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let request = AuthorityRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    };
    let reply = (state.decide)(&request);
    reply_response(reply)
}

pub fn reply_response(reply: AuthorityReply) -> Response {
    let mut response = (reply.status, reply.body).into_response();
    for (name, value) in reply.headers {
        response.headers_mut().insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(&value).unwrap(),
        );
    }
    response
}

/// Config with the given authority and backend apps, caching on.
pub fn proxy_config(authority: SocketAddr, apps: &[(&str, SocketAddr)]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.authority.address = authority.to_string();
    config.replay.enable_cache = true;
    for (name, addr) in apps {
        config.replay.apps.insert(
            name.to_string(),
            AppConfig {
                domain: addr.to_string(),
            },
        );
    }
    config
}

/// A proxy running in the background.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub cache: RoutingCache,
    pub updates: mpsc::UnboundedSender<ProxyConfig>,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// The `host` the proxy sees from our client, used as the cache key prefix.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    let cache = server.cache().clone();
    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestProxy {
        addr,
        cache,
        updates,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
