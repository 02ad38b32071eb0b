//! Request handlers.
//!
//! Every handler rejects query parameters it does not understand before
//! doing anything else, so a malformed request never changes state.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use ncs_registry::query::params as query_params;
use ncs_registry::NodeQuery;
use ncs_types::{MetadataObject, NodeId};

use crate::error::ApiError;
use crate::router::AppState;

/// Raw `key=value` query parameters in request order.
type Params = Vec<(String, String)>;

/// Health check response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub nodes: usize,
    pub waiters: usize,
}

/// Response of the state and wait endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEcho {
    pub ids: Vec<String>,
    pub state: String,
}

fn verify_params(route: &str, allowed: &[&str], params: &Params) -> Result<(), ApiError> {
    match params.iter().find(|(k, _)| !allowed.contains(&k.as_str())) {
        Some((k, _)) => {
            warn!(route, parameter = %k, "unsupported parameter");
            Err(ApiError::bad_request(format!("Unsupported parameter \"{k}\"")))
        }
        None => Ok(()),
    }
}

fn required<'a>(params: &'a Params, name: &str) -> Result<&'a str, ApiError> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| ApiError::bad_request(format!("Missing {name} query parameter.")))
}

fn parse_node_id(raw: &str) -> Result<NodeId, ApiError> {
    NodeId::parse(raw).map_err(|_| ApiError::not_found(format!("ID \"{raw}\" does not exist")))
}

fn echo(ids: &[NodeId], state: &str) -> StateEcho {
    StateEcho {
        ids: ids.iter().map(ToString::to_string).collect(),
        state: state.to_string(),
    }
}

/// `GET /v1/health`
pub async fn health_handler(State(app): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        nodes: app.sync.node_count()?,
        waiters: app.sync.waiter_count()?,
    }))
}

/// `GET /nodes`: metadata of many nodes at once.
///
/// Parameters (all optional): `type`, `state` (comma separated sets),
/// `newerThan` / `new` (identity lower bound, exclusive), `fields` /
/// `metadata` (attributes to return in addition to `id`).
pub async fn list_nodes(
    State(app): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Vec<MetadataObject>>, ApiError> {
    verify_params("/nodes", &query_params::ALL, &params)?;
    let query = NodeQuery::from_params(params)?;
    Ok(Json(app.sync.query(&query)?))
}

/// `POST /nodes`: create a batch of nodes from templates.
///
/// The body is a JSON array of templates. The whole batch is validated
/// before any node is created.
pub async fn create_nodes(
    State(app): State<AppState>,
    Query(params): Query<Params>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    verify_params("/nodes", &[], &params)?;
    let Value::Array(templates) = body else {
        return Err(ApiError::bad_request(
            "POST data did not contain Array as top-level",
        ));
    };
    app.sync.create_from_values(templates)?;
    Ok(StatusCode::OK)
}

/// `GET /nodes/:id/data`: the keys of a node's data.
pub async fn data_keys(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> Result<Json<Vec<String>>, ApiError> {
    verify_params("/nodes/:id/data", &[], &params)?;
    let id = parse_node_id(&id)?;
    Ok(Json(app.sync.data_keys(id)?))
}

/// `GET /nodes/:id/data/:key`: one data value.
pub async fn get_data(
    State(app): State<AppState>,
    Path((id, key)): Path<(String, String)>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    verify_params("/nodes/:id/data/:key", &[], &params)?;
    let id = parse_node_id(&id)?;
    let data = app.sync.get_data(id, &key)?;
    Ok(Json(json!({ "key": key, "data": data })))
}

/// `PUT /nodes/:id/data/:key`: replace one data value.
///
/// The body must be exactly `{ "value": <any JSON> }`.
pub async fn put_data(
    State(app): State<AppState>,
    Path((id, key)): Path<(String, String)>,
    Query(params): Query<Params>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    verify_params("/nodes/:id/data/:key", &[], &params)?;
    let id = parse_node_id(&id)?;
    let value = match body {
        Value::Object(mut object) if object.len() == 1 => object.remove("value"),
        _ => None,
    };
    let Some(value) = value else {
        return Err(ApiError::bad_request("Data formatted incorrectly."));
    };
    app.sync.put_data(id, &key, value)?;
    Ok(StatusCode::OK)
}

/// `PATCH /scheduler/state?id=<ids>&state=<state>`: move nodes to a state.
pub async fn patch_state(
    State(app): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<StateEcho>, ApiError> {
    verify_params("/scheduler/state", &["id", "state"], &params)?;
    let raw_ids = required(&params, "id")?;
    let raw_state = required(&params, "state")?;

    let ids = app.sync.resolve_ids(raw_ids)?;
    let state = app.sync.parse_state(raw_state)?;
    app.sync.set_state_all(&ids, state)?;
    Ok(Json(echo(&ids, raw_state)))
}

/// `PUT /scheduler/kill?id=<ids>`: request termination of nodes.
pub async fn put_kill(
    State(app): State<AppState>,
    Query(params): Query<Params>,
) -> Result<StatusCode, ApiError> {
    verify_params("/scheduler/kill", &["id"], &params)?;
    let raw_ids = required(&params, "id")?;

    let ids = app.sync.resolve_ids(raw_ids)?;
    app.sync.kill_all(&ids)?;
    Ok(StatusCode::OK)
}

/// `GET /scheduler/wait?id=<ids>&state=<state>`: block until every listed
/// node has reached the state.
///
/// The configured wait timeout bounds how long the request may block; on
/// expiry the registrations are withdrawn and 408 is returned.
pub async fn get_wait(
    State(app): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<StateEcho>, ApiError> {
    verify_params("/scheduler/wait", &["id", "state"], &params)?;
    let raw_ids = required(&params, "id")?;
    let raw_state = required(&params, "state")?;

    let ids = app.sync.resolve_ids(raw_ids)?;
    let state = app.sync.parse_state(raw_state)?;
    let pending = app.sync.prepare_wait(&ids, &state)?;

    match app.wait_timeout {
        Some(limit) => tokio::time::timeout(limit, pending.wait())
            .await
            .map_err(|_| {
                info!(ids = raw_ids, state = raw_state, "wait timed out");
                ApiError::new(
                    StatusCode::REQUEST_TIMEOUT,
                    format!("Timed out waiting for state \"{raw_state}\"."),
                )
            })??,
        None => pending.wait().await?,
    }
    Ok(Json(echo(&ids, raw_state)))
}
