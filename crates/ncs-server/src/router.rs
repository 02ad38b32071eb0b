use std::time::Duration;

use axum::routing::{get, patch, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use ncs_sync::StateSynchronizer;

use crate::handler;

/// HTTP endpoint paths.
pub mod endpoints {
    pub const NODES: &str = "/nodes";
    pub const NODE_DATA: &str = "/nodes/:id/data";
    pub const NODE_DATA_KEY: &str = "/nodes/:id/data/:key";
    pub const SCHEDULER_STATE: &str = "/scheduler/state";
    pub const SCHEDULER_KILL: &str = "/scheduler/kill";
    pub const SCHEDULER_WAIT: &str = "/scheduler/wait";
    pub const HEALTH: &str = "/v1/health";
}

/// State shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub sync: StateSynchronizer,
    /// Deadline for `/scheduler/wait`; `None` waits forever.
    pub wait_timeout: Option<Duration>,
}

/// Build the axum router with all NCS endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(
            endpoints::NODES,
            get(handler::list_nodes).post(handler::create_nodes),
        )
        .route(endpoints::NODE_DATA, get(handler::data_keys))
        .route(
            endpoints::NODE_DATA_KEY,
            get(handler::get_data).put(handler::put_data),
        )
        .route(
            endpoints::SCHEDULER_STATE,
            patch(handler::patch_state),
        )
        .route(endpoints::SCHEDULER_KILL, put(handler::put_kill))
        .route(endpoints::SCHEDULER_WAIT, get(handler::get_wait))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
