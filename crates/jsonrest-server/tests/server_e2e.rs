//! End-to-end tests over a real socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jsonrest_core::{Request, ResponseWriter};
use jsonrest_middleware::{stack::default_common_stack, Api};
use jsonrest_router::{Route, Router};
use jsonrest_server::{Server, ShutdownSignal};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(rename = "Body")]
    body: String,
}

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    task: JoinHandle<jsonrest_server::ServerResult<()>>,
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server should stop")
            .expect("server task should not panic")
            .expect("server should stop cleanly");
    }
}

async fn start(api: &Api, max_body_bytes: usize) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let server = Server::builder()
        .shutdown_timeout(Duration::from_secs(2))
        .max_body_bytes(max_body_bytes)
        .build(api.make_handler());
    let task = tokio::spawn(server.serve(listener, shutdown.clone()));
    Running {
        addr,
        shutdown,
        task,
    }
}

fn message_api() -> Api {
    let router = Router::new([
        Route::get("/message/:name", |w: &mut dyn ResponseWriter, r: &mut Request| {
            let name = r.path_param("name");
            let _ = w.write_json(&json!({ "Body": format!("Hello {name}") }));
        }),
        Route::post("/echo", |w: &mut dyn ResponseWriter, r: &mut Request| {
            match r.decode_json_payload::<Value>() {
                Ok(payload) => {
                    let _ = w.write_json(&payload);
                }
                Err(e) => jsonrest_core::write_error(
                    w,
                    &e.to_string(),
                    http::StatusCode::BAD_REQUEST,
                ),
            }
        }),
        Route::get("/peer", |w: &mut dyn ResponseWriter, r: &mut Request| {
            let peer = r.remote_addr().map(|a| a.ip().to_string());
            let _ = w.write_json(&json!({ "Peer": peer }));
        }),
    ])
    .unwrap();

    let mut api = Api::new();
    api.use_middlewares(default_common_stack()).set_app(router);
    api
}

#[tokio::test]
async fn test_get_through_pipeline() {
    let running = start(&message_api(), 1024).await;

    let response = reqwest::get(running.url("/message/world")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-powered-by"], "jsonrest");
    let message: Message = response.json().await.unwrap();
    assert_eq!(message.body, "Hello world");

    running.stop().await;
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let running = start(&message_api(), 1024).await;

    let response = reqwest::get(running.url("/nowhere")).await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "Error": "Resource not found" }));

    running.stop().await;
}

#[tokio::test]
async fn test_post_body_reaches_handler() {
    let running = start(&message_api(), 1024).await;

    let response = reqwest::Client::new()
        .post(running.url("/echo"))
        .json(&json!({ "Name": "jsonrest" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["Name"], "jsonrest");

    running.stop().await;
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let running = start(&message_api(), 16).await;

    let response = reqwest::Client::new()
        .post(running.url("/echo"))
        .json(&json!({ "Name": "a name well past sixteen bytes" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "Error": "Request body too large" }));

    running.stop().await;
}

#[tokio::test]
async fn test_remote_addr_is_peer() {
    let running = start(&message_api(), 1024).await;

    let body: Value = reqwest::get(running.url("/peer"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["Peer"], "127.0.0.1");

    running.stop().await;
}

#[tokio::test]
async fn test_recovered_panic_is_500() {
    let router = Router::new([Route::get("/boom", |_w: &mut dyn ResponseWriter, _r: &mut Request| {
        panic!("boom");
    })])
    .unwrap();
    let mut api = Api::new();
    api.use_middlewares(default_common_stack()).set_app(router);
    let running = start(&api, 1024).await;

    let response = reqwest::get(running.url("/boom")).await.unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "Error": "Internal Server Error" }));

    running.stop().await;
}

#[tokio::test]
async fn test_unrecovered_panic_is_500() {
    let router = Router::new([Route::get("/boom", |_w: &mut dyn ResponseWriter, _r: &mut Request| {
        panic!("boom");
    })])
    .unwrap();
    let mut api = Api::new();
    api.set_app(router);
    let running = start(&api, 1024).await;

    let response = reqwest::get(running.url("/boom")).await.unwrap();
    assert_eq!(response.status(), 500);

    running.stop().await;
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_request() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let router = Router::new([Route::get("/slow", move |w: &mut dyn ResponseWriter, _r: &mut Request| {
        std::thread::sleep(Duration::from_millis(300));
        flag.store(true, Ordering::SeqCst);
        let _ = w.write_json(&json!({ "Body": "done" }));
    })])
    .unwrap();
    let mut api = Api::new();
    api.set_app(router);
    let running = start(&api, 1024).await;

    let url = running.url("/slow");
    let request = tokio::spawn(async move { reqwest::get(url).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    running.stop().await;
    assert!(finished.load(Ordering::SeqCst));

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
}
