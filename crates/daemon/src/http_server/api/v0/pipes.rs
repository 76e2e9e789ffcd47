//! Install and remove pipe edges

use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::auri::Auri;
use common::engine::{PipeOp, Piper};
use common::relation::{PipeEdge, PipeRefs};
use common::resolver::parse_auri;

use super::RelationFailure;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Apply `op` to every edge, left to right
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyPipeRequest {
    pub edges: Vec<PipeEdge>,
    #[serde(default)]
    pub op: PipeOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeResponse {
    pub op: PipeOp,
    pub edges: Vec<PipeEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPipesRequest {
    pub target: Auri,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPipesResponse {
    pub target: Auri,
    pub pipes: PipeRefs,
}

pub async fn apply_handler(
    State(state): State<ServiceState>,
    Json(req): Json<ApplyPipeRequest>,
) -> Result<impl IntoResponse, RelationFailure> {
    let piper = Piper::from_edges(req.edges);
    state.pipes().apply(req.op, &piper).await?;
    Ok((
        http::StatusCode::OK,
        Json(PipeResponse {
            op: req.op,
            edges: piper.into_edges(),
        }),
    ))
}

pub async fn list_handler(
    State(state): State<ServiceState>,
    Path(target): Path<String>,
) -> Result<impl IntoResponse, RelationFailure> {
    let target = parse_auri(&target)?;
    let pipes = state.pipes().list(&target).await?;
    Ok((http::StatusCode::OK, Json(ListPipesResponse { target, pipes })))
}

impl ApiRequest for ApplyPipeRequest {
    type Response = PipeResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/pipes")?;
        Ok(client.post(full_url).json(&self))
    }
}

impl ApiRequest for ListPipesRequest {
    type Response = ListPipesResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/pipes/{}", self.target))?;
        Ok(client.get(full_url))
    }
}
