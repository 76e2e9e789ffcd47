use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};

use common::error::{ErrorKind, RelationError};

pub mod digis;
pub mod mounts;
pub mod pipes;
pub mod policies;

pub use digis::{ApplyDigiRequest, DeleteDigiRequest, DigiResponse, GetDigiRequest};
pub use mounts::{ApplyMountRequest, ListMountsRequest, ListMountsResponse, MountResponse};
pub use pipes::{ApplyPipeRequest, ListPipesRequest, ListPipesResponse, PipeResponse};
pub use policies::{
    ApplyPolicyRequest, ListPoliciesRequest, ListPoliciesResponse, PolicyInfo, PolicyResponse,
};

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/digis", put(digis::apply_handler))
        .route(
            "/digis/*auri",
            get(digis::get_handler).delete(digis::delete_handler),
        )
        .route("/mounts", post(mounts::apply_handler))
        .route("/mounts/*target", get(mounts::list_handler))
        .route("/pipes", post(pipes::apply_handler))
        .route("/pipes/*target", get(pipes::list_handler))
        .route(
            "/policies",
            put(policies::apply_handler).get(policies::list_handler),
        )
        .with_state(state)
}

/// HTTP status for a class of relation errors
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Parse => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// A relation error rendered as `{"msg": ...}`
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct RelationFailure(#[from] pub RelationError);

impl IntoResponse for RelationFailure {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        } else {
            tracing::debug!("request rejected: {}", self.0);
        }
        let msg = serde_json::json!({"msg": self.0.to_string()});
        (status, Json(msg)).into_response()
    }
}
