//! HTTP server for the Node Coordination Service.
//!
//! Exposes the node registry and the state synchronizer over HTTP: node
//! listing and batch creation, per-node data access, and the scheduler
//! endpoints for state changes, kill requests and blocking waits.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::{HealthResponse, StateEcho};
pub use router::{build_router, AppState};
pub use server::NcsServer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn test_server(config: ServerConfig) -> (NcsServer, Router) {
        let server = NcsServer::new(config).unwrap();
        let app = server.router();
        (server, app)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, text) = send(app, method, uri, body).await;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, value)
    }

    async fn create_jobs(app: &Router, types: &[&str]) {
        let templates: Vec<Value> = types
            .iter()
            .map(|t| json!({ "metadata": { "type": t, "parent": "root" } }))
            .collect();
        let (status, _) = send(app, Method::POST, "/nodes", Some(Value::Array(templates))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (_server, app) = test_server(ServerConfig::default());
        let (status, body) = send_json(&app, Method::GET, "/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["nodes"], 0);
        assert_eq!(body["waiters"], 0);
    }

    #[tokio::test]
    async fn scheduler_echoes_ids_as_given() {
        let (server, app) = test_server(ServerConfig::default());
        create_jobs(&app, &["job", "job"]).await;

        let (status, body) =
            send_json(&app, Method::PATCH, "/scheduler/state?id=1,0,1&state=running", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ids": ["1", "0", "1"], "state": "running" }));

        let (status, body) =
            send_json(&app, Method::GET, "/scheduler/wait?id=0,0&state=running", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ids": ["0", "0"], "state": "running" }));
        assert_eq!(server.synchronizer().waiter_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn job_lifecycle_end_to_end() {
        let (_server, app) = test_server(ServerConfig::default());
        create_jobs(&app, &["job"]).await;

        let (status, body) = send_json(&app, Method::GET, "/nodes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{ "id": "0", "type": "job", "parent": "root", "state": "initial" }])
        );

        let (status, body) =
            send_json(&app, Method::PATCH, "/scheduler/state?id=0&state=running", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ids": ["0"], "state": "running" }));

        let (status, body) =
            send_json(&app, Method::GET, "/scheduler/wait?id=0&state=running", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ids": ["0"], "state": "running" }));

        let (status, _) = send(&app, Method::PUT, "/scheduler/kill?id=0", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send_json(&app, Method::GET, "/nodes?state=killing", None).await;
        assert_eq!(
            body,
            json!([{ "id": "0", "type": "job", "parent": "root", "state": "killing" }])
        );
    }

    #[tokio::test]
    async fn list_filters_and_projection() {
        let (_server, app) = test_server(ServerConfig::default());
        create_jobs(&app, &["a", "c", "b", "a"]).await;

        let (_, body) = send_json(&app, Method::GET, "/nodes?type=a,b&fields=type", None).await;
        assert_eq!(
            body,
            json!([
                { "id": "0", "type": "a" },
                { "id": "2", "type": "b" },
                { "id": "3", "type": "a" },
            ])
        );

        let (_, body) = send_json(&app, Method::GET, "/nodes?newerThan=1&metadata=state", None).await;
        assert_eq!(
            body,
            json!([{ "id": "2", "state": "initial" }, { "id": "3", "state": "initial" }])
        );
    }

    #[tokio::test]
    async fn list_rejects_bad_parameters() {
        let (server, app) = test_server(ServerConfig::default());
        create_jobs(&app, &["job"]).await;

        let (status, text) = send(&app, Method::GET, "/nodes?foo=bar", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Unsupported parameter \"foo\"");

        let (status, _) = send(&app, Method::GET, "/nodes?newerThan=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(server.synchronizer().node_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn create_rejects_whole_batch() {
        let (server, app) = test_server(ServerConfig::default());

        let (status, text) = send(&app, Method::POST, "/nodes", Some(json!({ "metadata": {} }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "POST data did not contain Array as top-level");

        let batch = json!([
            { "metadata": { "type": "job", "parent": "root" } },
            { "metadata": { "type": "job", "parent": "root", "id": "4" } },
        ]);
        let (status, text) = send(&app, Method::POST, "/nodes", Some(batch)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Node template must not contain an id.");

        let (status, text) = send(&app, Method::POST, "/nodes", Some(json!([{ "data": {} }]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Missing metadata.");

        assert_eq!(server.synchronizer().node_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn data_endpoints() {
        let (_server, app) = test_server(ServerConfig::default());
        create_jobs(&app, &["job"]).await;

        let (status, body) = send_json(&app, Method::GET, "/nodes/0/data", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, text) = send(&app, Method::GET, "/nodes/0/data/out", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(text, "Key \"out\" does not exist");

        let (status, _) = send(&app, Method::PUT, "/nodes/0/data/out", Some(json!({ "value": [1, 2] }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(&app, Method::GET, "/nodes/0/data/out", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "key": "out", "data": [1, 2] }));

        let (_, body) = send_json(&app, Method::GET, "/nodes/0/data", None).await;
        assert_eq!(body, json!(["out"]));

        let (status, text) = send(&app, Method::PUT, "/nodes/0/data/out", Some(json!({ "value": 1, "x": 2 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Data formatted incorrectly.");

        let (status, text) = send(&app, Method::GET, "/nodes/9/data", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(text, "ID \"9\" does not exist");

        let (status, _) = send(&app, Method::GET, "/nodes/abc/data/out", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scheduler_validates_ids_and_states() {
        let config = ServerConfig {
            states: Some(vec!["running".into()]),
            ..Default::default()
        };
        let (server, app) = test_server(config);
        create_jobs(&app, &["job", "job"]).await;

        let (status, text) = send(&app, Method::PATCH, "/scheduler/state?state=running", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Missing id query parameter.");

        let (status, text) = send(&app, Method::PATCH, "/scheduler/state?id=0,7&state=running", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Provided id \"7\" is not valid.");

        let (status, text) = send(&app, Method::GET, "/scheduler/wait?id=0&state=paused", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Provided state \"paused\" is not valid.");

        let (status, _) = send(&app, Method::PUT, "/scheduler/kill?id=x", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PUT, "/scheduler/kill?id=0&state=killing", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let sync = server.synchronizer();
        assert_eq!(sync.state(ncs_types::NodeId::from_raw(0)).unwrap(), ncs_types::NodeState::INITIAL);
    }

    #[tokio::test]
    async fn wait_blocks_until_all_nodes_transition() {
        let (server, app) = test_server(ServerConfig::default());
        create_jobs(&app, &["job", "job"]).await;

        let waiter = {
            let app = app.clone();
            tokio::spawn(async move { send_json(&app, Method::GET, "/scheduler/wait?id=0,1&state=done", None).await })
        };
        let sync = server.synchronizer().clone();
        for _ in 0..200 {
            if sync.waiter_count().unwrap() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(sync.waiter_count().unwrap(), 2);

        send(&app, Method::PATCH, "/scheduler/state?id=1&state=done", None).await;
        assert!(!waiter.is_finished());
        send(&app, Method::PATCH, "/scheduler/state?id=0&state=done", None).await;

        let (status, body) = waiter.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ids": ["0", "1"], "state": "done" }));
    }

    #[tokio::test]
    async fn wait_times_out_and_withdraws() {
        let config = ServerConfig {
            wait_timeout_secs: 1,
            ..Default::default()
        };
        let (server, app) = test_server(config);
        create_jobs(&app, &["job"]).await;

        let (status, _) = send(&app, Method::GET, "/scheduler/wait?id=0&state=killing", None).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(server.synchronizer().waiter_count().unwrap(), 0);
    }
}
