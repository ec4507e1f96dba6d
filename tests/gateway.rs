//! End-to-end tests over real sockets: client → gate → mock upstream.

mod common;

use std::time::Duration;

use reqwest::{redirect, StatusCode};
use serde_json::json;

use common::{gate_config, spawn_gate, start_mock_upstream, PREVIEW_PASSWORD};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_login_then_browse() {
    let upstream = start_mock_upstream().await;
    let (gate, shutdown) = spawn_gate(gate_config(upstream)).await;
    let client = client();

    let res = client
        .get(format!("http://{}/pricing", gate))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);

    let res = client
        .post(format!("http://{}/api/auth/login", gate))
        .json(&json!({ "password": PREVIEW_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let set_cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    let session = set_cookie.split(';').next().unwrap().to_string();
    assert_eq!(session, "preview_auth=authenticated");

    let res = client
        .get(format!("http://{}/pricing", gate))
        .header("cookie", &session)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!res.headers().contains_key("connection"));
    assert_eq!(res.text().await.unwrap(), "upstream: GET /pricing");

    let res = client
        .post(format!("http://{}/api/contact", gate))
        .header("cookie", &session)
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "upstream: POST /api/contact");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_down_is_bad_gateway() {
    // Grab a free port, then release it so nothing is listening there.
    let dead = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (gate, shutdown) = spawn_gate(gate_config(dead)).await;

    let res = client()
        .get(format!("http://{}/robots.txt", gate))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    // Rejections never touch the upstream, so they still work.
    let res = client()
        .get(format!("http://{}/api/contact", gate))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown_stops_accepting() {
    let upstream = start_mock_upstream().await;
    let (gate, shutdown) = spawn_gate(gate_config(upstream)).await;
    let client = client();

    let res = client
        .get(format!("http://{}/_gate/health", gate))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    drop(client);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = reqwest::Client::new()
        .get(format!("http://{}/_gate/health", gate))
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(result.is_err());
}
