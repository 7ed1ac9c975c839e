//! End-to-end replay flows through the standalone server.

use axum::http::StatusCode;
use serde_json::Value;
use std::time::{Duration, Instant};

use replay_proxy::config::AppConfig;

mod common;

use common::{AuthorityReply, start_authority, start_echo_backend, start_proxy, proxy_config, client};

#[tokio::test]
async fn test_replay_without_cache_header_reaches_app() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| AuthorityReply::replay("billing")).await;
    let proxy = start_proxy(proxy_config(authority.addr, &[("billing", billing.addr)])).await;

    let res = client().get(proxy.url("/en-US/user123/profile?tab=1")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["app"], "billing");
    assert_eq!(echo["path"], "/en-US/user123/profile");
    assert_eq!(echo["query"], "tab=1");
    assert_eq!(echo["headers"]["fly-replay-cache-status"], "miss");
    assert_eq!(echo["headers"]["host"], proxy.host());
    assert!(proxy.cache.is_empty());
}

#[tokio::test]
async fn test_cache_status_absent_when_caching_disabled() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| {
        AuthorityReply::replay("billing").header("fly-replay-cache", "/api/*")
    })
    .await;
    let mut config = proxy_config(authority.addr, &[("billing", billing.addr)]);
    config.replay.enable_cache = false;
    let proxy = start_proxy(config).await;

    let echo: Value = client()
        .get(proxy.url("/api/x"))
        .header("fly-replay-cache-status", "hit")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(echo["headers"].get("fly-replay-cache-status").is_none());
    assert!(proxy.cache.is_empty());
}

#[tokio::test]
async fn test_cached_decision_skips_authority() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| {
        AuthorityReply::replay("billing")
            .header("fly-replay-cache", "/api/billing/*")
            .header("fly-replay-cache-ttl-secs", "60")
    })
    .await;
    let proxy = start_proxy(proxy_config(authority.addr, &[("billing", billing.addr)])).await;
    let client = client();

    let first: Value = client.get(proxy.url("/api/billing/start")).send().await.unwrap().json().await.unwrap();
    assert_eq!(first["headers"]["fly-replay-cache-status"], "miss");
    assert_eq!(authority.hits(), 1);

    let entry = proxy.cache.entries().pop().unwrap();
    assert_eq!(entry.pattern, format!("{}/api/billing/*", proxy.host()));
    assert_eq!(entry.target, "billing");
    assert!(entry.remaining_at(Instant::now()) <= Duration::from_secs(60));

    let second: Value = client.get(proxy.url("/api/billing/invoices")).send().await.unwrap().json().await.unwrap();
    assert_eq!(second["app"], "billing");
    assert_eq!(second["path"], "/api/billing/invoices");
    assert_eq!(second["headers"]["fly-replay-cache-status"], "hit");
    assert_eq!(authority.hits(), 1);
    assert_eq!(billing.hits(), 2);
}

#[tokio::test]
async fn test_bypass_consults_authority() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| {
        AuthorityReply::replay("billing")
            .header("fly-replay-cache", "/api/billing/*")
            .header("fly-replay-cache-allow-bypass", "yes")
    })
    .await;
    let proxy = start_proxy(proxy_config(authority.addr, &[("billing", billing.addr)])).await;
    let client = client();

    client.get(proxy.url("/api/billing/a")).send().await.unwrap();
    assert_eq!(authority.hits(), 1);

    let bypassed: Value = client
        .get(proxy.url("/api/billing/b"))
        .header("fly-replay-cache-control", "skip")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bypassed["headers"]["fly-replay-cache-status"], "bypass");
    assert_eq!(authority.hits(), 2);

    let cached: Value = client.get(proxy.url("/api/billing/c")).send().await.unwrap().json().await.unwrap();
    assert_eq!(cached["headers"]["fly-replay-cache-status"], "hit");
    assert_eq!(authority.hits(), 2);
}

#[tokio::test]
async fn test_skip_ignored_without_allow_bypass() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| {
        AuthorityReply::replay("billing").header("fly-replay-cache", "/api/*")
    })
    .await;
    let proxy = start_proxy(proxy_config(authority.addr, &[("billing", billing.addr)])).await;
    let client = client();

    client.get(proxy.url("/api/a")).send().await.unwrap();
    let echo: Value = client
        .get(proxy.url("/api/b"))
        .header("fly-replay-cache-control", "skip")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echo["headers"]["fly-replay-cache-status"], "hit");
    assert_eq!(authority.hits(), 1);
}

#[tokio::test]
async fn test_unknown_app_is_bad_gateway() {
    let authority = start_authority(|_| AuthorityReply::replay("ghost")).await;
    let proxy = start_proxy(proxy_config(authority.addr, &[])).await;

    let res = client().get(proxy.url("/anything")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "unknown app: ghost");
}

#[tokio::test]
async fn test_ttl_below_floor_uses_default() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| {
        AuthorityReply::replay("billing")
            .header("fly-replay-cache", "/api/*")
            .header("fly-replay-cache-ttl-secs", "5")
    })
    .await;
    let proxy = start_proxy(proxy_config(authority.addr, &[("billing", billing.addr)])).await;

    client().get(proxy.url("/api/x")).send().await.unwrap();

    let entry = proxy.cache.entries().pop().unwrap();
    let remaining = entry.remaining_at(Instant::now());
    assert!(remaining > Duration::from_secs(250), "remaining {:?}", remaining);
    assert!(remaining <= Duration::from_secs(300));
}

#[tokio::test]
async fn test_direct_authority_response_is_returned_verbatim() {
    let authority = start_authority(|_| {
        AuthorityReply::direct(StatusCode::NOT_FOUND, "no such user").header("x-authority", "1")
    })
    .await;
    let proxy = start_proxy(proxy_config(authority.addr, &[])).await;

    let res = client().get(proxy.url("/users/nobody")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["x-authority"], "1");
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(res.text().await.unwrap(), "no such user");
    assert!(proxy.cache.is_empty());
}

#[tokio::test]
async fn test_unreachable_authority_is_bad_gateway() {
    let mut config = proxy_config("127.0.0.1:1".parse().unwrap(), &[]);
    config.timeouts.connect_secs = 1;
    let proxy = start_proxy(config).await;

    let res = client().get(proxy.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_request_body_reaches_authority_and_app() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|request| {
        assert_eq!(request.method, "POST");
        assert_eq!(&request.body[..], b"{\"amount\":42}");
        AuthorityReply::replay("billing")
    })
    .await;
    let proxy = start_proxy(proxy_config(authority.addr, &[("billing", billing.addr)])).await;

    let echo: Value = client()
        .post(proxy.url("/api/charge"))
        .body("{\"amount\":42}")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["body"], "{\"amount\":42}");
    assert_eq!(authority.hits(), 1);
}

#[tokio::test]
async fn test_trace_id_propagates_to_app() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| AuthorityReply::replay("billing").header("x-trace-id", "trace-abc")).await;
    let proxy = start_proxy(proxy_config(authority.addr, &[("billing", billing.addr)])).await;

    let echo: Value = client().get(proxy.url("/t")).send().await.unwrap().json().await.unwrap();
    assert_eq!(echo["headers"]["x-trace-id"], "trace-abc");
    assert!(echo["headers"]["x-forwarded-for"].as_str().unwrap().contains("127.0.0.1"));
}

#[tokio::test]
async fn test_invalidate_removes_covering_entry() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|request| {
        if request.headers.contains_key("fly-replay-cache-control") {
            AuthorityReply::replay("billing").header("fly-replay-cache", "invalidate")
        } else {
            AuthorityReply::replay("billing")
                .header("fly-replay-cache", "/api/*")
                .header("fly-replay-cache-allow-bypass", "yes")
        }
    })
    .await;
    let proxy = start_proxy(proxy_config(authority.addr, &[("billing", billing.addr)])).await;
    let client = client();

    client.get(proxy.url("/api/a")).send().await.unwrap();
    assert_eq!(proxy.cache.len(), 1);

    let res = client
        .get(proxy.url("/api/b"))
        .header("fly-replay-cache-control", "skip")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(proxy.cache.is_empty());
}

#[tokio::test]
async fn test_debug_headers() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| {
        AuthorityReply::replay("billing")
            .header("fly-replay-cache", "/api/*")
            .header("fly-replay-cache-allow-bypass", "yes")
    })
    .await;
    let mut config = proxy_config(authority.addr, &[("billing", billing.addr)]);
    config.replay.debug = true;
    let proxy = start_proxy(config).await;
    let client = client();

    let first = client.get(proxy.url("/api/a")).send().await.unwrap();
    let headers = first.headers();
    assert_eq!(headers["x-cache"], "MISS");
    assert_eq!(headers["x-cache-action"], "STORED");
    assert_eq!(headers["x-cache-pattern"], format!("{}/api/*", proxy.host()).as_str());
    assert_eq!(headers["x-cache-allow-bypass"], "yes");
    assert_eq!(headers["x-forwarded-to"], format!("http://{}", billing.addr).as_str());

    let second = client.get(proxy.url("/api/b")).send().await.unwrap();
    assert_eq!(second.headers()["x-cache"], "HIT");
    assert_eq!(second.headers()["x-cached-app"], "billing");
    assert!(second.headers().get("x-cache-action").is_none());
}

#[tokio::test]
async fn test_reloaded_app_table_applies_to_next_request() {
    let ghost = start_echo_backend("ghost").await;
    let authority = start_authority(|_| AuthorityReply::replay("ghost")).await;
    let config = proxy_config(authority.addr, &[]);
    let proxy = start_proxy(config.clone()).await;
    let client = client();

    let res = client.get(proxy.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let mut reloaded = config;
    reloaded.replay.apps.insert("ghost".into(), AppConfig { domain: ghost.addr.to_string() });
    proxy.updates.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client.get(proxy.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(ghost.hits(), 1);
}

#[tokio::test]
async fn test_sweeper_runs_after_cache_enabled_by_reload() {
    let billing = start_echo_backend("billing").await;
    let authority = start_authority(|_| {
        AuthorityReply::replay("billing").header("fly-replay-cache", "/api/*")
    })
    .await;
    let mut config = proxy_config(authority.addr, &[("billing", billing.addr)]);
    config.replay.enable_cache = false;
    config.replay.sweep_interval_secs = 1;
    let proxy = start_proxy(config.clone()).await;

    let mut reloaded = config;
    reloaded.replay.enable_cache = true;
    proxy.updates.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    client().get(proxy.url("/api/a")).send().await.unwrap();
    assert_eq!(proxy.cache.len(), 1);

    // Already expired; only the sweeper can remove it.
    proxy.cache.store("stale", "stale.example/*", "billing", 0, false);
    assert_eq!(proxy.cache.len(), 2);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(proxy.cache.len(), 1);
    assert_eq!(proxy.cache.entries()[0].pattern, format!("{}/api/*", proxy.host()));
}

#[tokio::test]
async fn test_reloaded_body_limit_applies_to_authority_response() {
    let body = "x".repeat(64);
    let authority = start_authority(move |_| AuthorityReply::direct(StatusCode::OK, &body)).await;
    let mut config = proxy_config(authority.addr, &[]);
    config.replay.max_body_bytes = 16;
    let proxy = start_proxy(config.clone()).await;
    let client = client();

    let res = client.get(proxy.url("/big")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let mut reloaded = config;
    reloaded.replay.max_body_bytes = 1024;
    proxy.updates.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client.get(proxy.url("/big")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap().len(), 64);
}
