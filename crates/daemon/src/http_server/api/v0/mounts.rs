//! Mount, activate, yield and unmount

use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::auri::Auri;
use common::engine::{MountOp, MountRequest};
use common::relation::{Mount, MountMode, MountRefs};
use common::resolver::parse_auri;

use super::RelationFailure;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Apply a mount operation to `source -> target`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyMountRequest {
    pub source: Auri,
    pub target: Auri,
    #[serde(default)]
    pub mode: MountMode,
    #[serde(default)]
    pub op: MountOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountResponse {
    pub op: MountOp,
    pub mount: Mount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMountsRequest {
    pub target: Auri,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMountsResponse {
    pub target: Auri,
    pub mounts: MountRefs,
}

pub async fn apply_handler(
    State(state): State<ServiceState>,
    Json(req): Json<ApplyMountRequest>,
) -> Result<impl IntoResponse, RelationFailure> {
    let op = req.op;
    let request = MountRequest {
        source: req.source,
        target: req.target,
        mode: req.mode,
    };
    let mount = state.mounts().apply(op, &request).await?;
    Ok((http::StatusCode::OK, Json(MountResponse { op, mount })))
}

pub async fn list_handler(
    State(state): State<ServiceState>,
    Path(target): Path<String>,
) -> Result<impl IntoResponse, RelationFailure> {
    let target = parse_auri(&target)?;
    let mounts = state.mounts().list(&target).await?;
    Ok((
        http::StatusCode::OK,
        Json(ListMountsResponse { target, mounts }),
    ))
}

impl ApiRequest for ApplyMountRequest {
    type Response = MountResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/mounts")?;
        Ok(client.post(full_url).json(&self))
    }
}

impl ApiRequest for ListMountsRequest {
    type Response = ListMountsResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/mounts/{}", self.target))?;
        Ok(client.get(full_url))
    }
}
