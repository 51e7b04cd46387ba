//! End-to-end tests over real sockets.
//!
//! Each test binds its own server on an ephemeral port, talks to it with
//! `reqwest`, then drives shutdown through an injected signal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{routing::get, Router};
use cache_test_poc::api::{create_router, with_middleware, AppState};
use cache_test_poc::{Config, Server, ShutdownOutcome, ShutdownState};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

struct RunningServer {
    addr: SocketAddr,
    signal: oneshot::Sender<&'static str>,
    handle: JoinHandle<ShutdownOutcome>,
}

impl RunningServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) -> ShutdownOutcome {
        let _ = self.signal.send("SIGTERM");
        self.handle.await.unwrap()
    }
}

async fn start(server: Server) -> RunningServer {
    let addr = server.local_addr().unwrap();
    let (signal, signal_rx) = oneshot::channel();
    let handle = tokio::spawn(server.run(async move { signal_rx.await.unwrap_or("SIGTERM") }));
    RunningServer {
        addr,
        signal,
        handle,
    }
}

async fn bind(router: Router) -> Server {
    Server::bind(([127, 0, 0, 1], 0).into(), router).await.unwrap()
}

fn app(config: Config) -> Router {
    create_router(AppState::new(config, Instant::now()))
}

/// Router with a `/slow` route that signals once entered, then sleeps.
fn slow_app(entered: Arc<Notify>, delay: Duration) -> Router {
    let route = get(move || {
        let entered = Arc::clone(&entered);
        async move {
            entered.notify_one();
            tokio::time::sleep(delay).await;
            "done"
        }
    });
    with_middleware(Router::new().route("/slow", route))
}

#[tokio::test]
async fn serves_all_endpoints() {
    let running = start(bind(app(Config::default())).await).await;
    let client = reqwest::Client::new();

    let root: Value = client.get(running.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(root["version"], "1.0.0");
    assert_eq!(root["environment"], "development");

    let health = client.get(running.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    let health: Value = health.json().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["uptime"].as_f64().unwrap() >= 0.0);

    let info: Value = client
        .get(running.url("/cache-info"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["features"].as_array().unwrap().len(), 4);

    let missing = client.get(running.url("/does/not/exist")).send().await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    let missing: Value = missing.json().await.unwrap();
    assert_eq!(
        missing["message"],
        "The requested resource /does/not/exist was not found"
    );

    drop(client);
    assert_eq!(running.stop().await, ShutdownOutcome::Stopped);
}

#[tokio::test]
async fn malformed_json_does_not_take_the_server_down() {
    let running = start(bind(app(Config::default())).await).await;
    let client = reqwest::Client::new();

    let response = client
        .post(running.url("/health"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"unterminated\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error");

    let response = client.get(running.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    drop(client);
    assert_eq!(running.stop().await, ShutdownOutcome::Stopped);
}

#[tokio::test]
async fn in_flight_request_completes_before_exit() {
    let entered = Arc::new(Notify::new());
    let server = bind(slow_app(Arc::clone(&entered), Duration::from_millis(300))).await;
    let running = start(server).await;

    let url = running.url("/slow");
    let request = tokio::spawn(async move {
        let response = reqwest::get(url).await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>((status, body))
    });

    entered.notified().await;
    let addr = running.addr;
    let outcome = running.stop().await;

    let (status, body) = request.await.unwrap().unwrap();
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, "done");
    assert_eq!(outcome, ShutdownOutcome::Stopped);
    assert_eq!(outcome.exit_code(), 0);

    // Listener is gone once the server has stopped.
    assert!(reqwest::get(format!("http://{}/slow", addr)).await.is_err());
}

#[tokio::test]
async fn draining_refuses_new_connections_while_finishing_in_flight() {
    let entered = Arc::new(Notify::new());
    let server = bind(slow_app(Arc::clone(&entered), Duration::from_secs(1))).await;
    let mut state = server.state();
    let running = start(server).await;
    let addr = running.addr;

    let url = running.url("/slow");
    let request = tokio::spawn(async move {
        let response = reqwest::get(url).await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>((status, body))
    });
    entered.notified().await;

    let _ = running.signal.send("SIGTERM");
    state
        .wait_for(|s| *s == ShutdownState::Draining)
        .await
        .unwrap();

    // The accept loop notices the drain on its next poll.
    let deadline = Instant::now() + Duration::from_millis(500);
    let refused = loop {
        if TcpStream::connect(addr).await.is_err() {
            break true;
        }
        if Instant::now() >= deadline {
            break false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert!(refused, "listener still accepting while draining");
    assert!(!request.is_finished(), "in-flight request ended before the check");

    let (status, body) = request.await.unwrap().unwrap();
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, "done");
    assert_eq!(running.handle.await.unwrap(), ShutdownOutcome::Stopped);
}

#[tokio::test]
async fn stuck_request_is_abandoned_after_grace_period() {
    let entered = Arc::new(Notify::new());
    let server = bind(slow_app(Arc::clone(&entered), Duration::from_secs(60)))
        .await
        .with_grace_period(Duration::from_millis(200));
    let running = start(server).await;

    let url = running.url("/slow");
    let request = tokio::spawn(async move { reqwest::get(url).await });

    entered.notified().await;
    let started = Instant::now();
    let outcome = running.stop().await;

    assert_eq!(outcome, ShutdownOutcome::ForceKilled);
    assert_eq!(outcome.exit_code(), 1);
    assert!(started.elapsed() < Duration::from_secs(10));

    request.abort();
}

#[tokio::test]
async fn independent_instances_run_side_by_side() {
    let first = start(bind(app(Config::default())).await).await;
    let config = Config {
        node_env: "staging".to_string(),
        ..Config::default()
    };
    let second = start(bind(app(config)).await).await;
    assert_ne!(first.addr, second.addr);

    let body: Value = reqwest::get(second.url("/")).await.unwrap().json().await.unwrap();
    assert_eq!(body["environment"], "staging");

    assert_eq!(first.stop().await, ShutdownOutcome::Stopped);
    assert_eq!(second.stop().await, ShutdownOutcome::Stopped);
}
