//! Yield policies
//!
//! Policies are ordinary digis of kind `digi.dev/v1/yieldpolicy`; deleting
//! one goes through the digis endpoint.

use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::auri::{Auri, DEFAULT_NAMESPACE};
use common::relation::{yield_policy_kind, YieldPolicySpec};
use common::resolver::parse_auri;
use common::store::Selector;

use super::RelationFailure;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyPolicyRequest {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub spec: YieldPolicySpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub auri: Auri,
    pub spec: YieldPolicySpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPoliciesRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub auri: Auri,
    /// Raw spec; policies that fail to parse are listed too
    pub spec: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPoliciesResponse {
    pub policies: Vec<PolicyInfo>,
}

pub async fn apply_handler(
    State(state): State<ServiceState>,
    Json(req): Json<ApplyPolicyRequest>,
) -> Result<impl IntoResponse, RelationFailure> {
    // reject names that would not make a valid address
    let kind = yield_policy_kind();
    parse_auri(&format!("{}/{}/{}", kind, req.namespace, req.name))?;

    let digi = state
        .digis()
        .apply_policy(&req.name, &req.namespace, &req.spec)
        .await?;
    Ok((
        http::StatusCode::OK,
        Json(PolicyResponse {
            auri: digi.auri,
            spec: req.spec,
        }),
    ))
}

pub async fn list_handler(
    State(state): State<ServiceState>,
) -> Result<impl IntoResponse, RelationFailure> {
    let policies = state
        .digis()
        .list(&Selector::kind(yield_policy_kind()))
        .await?
        .into_iter()
        .map(|digi| PolicyInfo {
            auri: digi.auri,
            spec: digi.spec,
        })
        .collect();
    Ok((http::StatusCode::OK, Json(ListPoliciesResponse { policies })))
}

impl ApiRequest for ApplyPolicyRequest {
    type Response = PolicyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/policies")?;
        Ok(client.put(full_url).json(&self))
    }
}

impl ApiRequest for ListPoliciesRequest {
    type Response = ListPoliciesResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/policies")?;
        Ok(client.get(full_url))
    }
}
