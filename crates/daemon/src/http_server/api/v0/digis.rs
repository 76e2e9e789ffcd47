//! Register, fetch and delete digis

use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::auri::Auri;
use common::resolver::parse_auri;
use common::store::Digi;

use super::RelationFailure;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Create a digi or replace its spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyDigiRequest {
    pub auri: Auri,
    #[serde(default)]
    pub spec: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDigiRequest {
    pub auri: Auri,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDigiRequest {
    pub auri: Auri,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigiResponse {
    pub digi: Digi,
}

pub async fn apply_handler(
    State(state): State<ServiceState>,
    Json(req): Json<ApplyDigiRequest>,
) -> Result<impl IntoResponse, RelationFailure> {
    let digi = state.digis().apply(&req.auri, req.spec).await?;
    Ok((http::StatusCode::OK, Json(DigiResponse { digi })))
}

pub async fn get_handler(
    State(state): State<ServiceState>,
    Path(auri): Path<String>,
) -> Result<impl IntoResponse, RelationFailure> {
    let auri = parse_auri(&auri)?;
    let digi = state.digis().get(&auri).await?;
    Ok((http::StatusCode::OK, Json(DigiResponse { digi })))
}

pub async fn delete_handler(
    State(state): State<ServiceState>,
    Path(auri): Path<String>,
) -> Result<impl IntoResponse, RelationFailure> {
    let auri = parse_auri(&auri)?;
    let digi = state.digis().delete(&auri).await?;
    Ok((http::StatusCode::OK, Json(DigiResponse { digi })))
}

impl ApiRequest for ApplyDigiRequest {
    type Response = DigiResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/digis")?;
        Ok(client.put(full_url).json(&self))
    }
}

impl ApiRequest for GetDigiRequest {
    type Response = DigiResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/digis/{}", self.auri))?;
        Ok(client.get(full_url))
    }
}

impl ApiRequest for DeleteDigiRequest {
    type Response = DigiResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/digis/{}", self.auri))?;
        Ok(client.delete(full_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path_keeps_whole_auri() {
        let base = Url::parse("http://localhost:8080").unwrap();
        let auri: Auri = "digi.dev/v1/lamp/default/l1".parse().unwrap();
        let request = GetDigiRequest { auri }
            .build_request(&base, &Client::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().path(), "/api/v0/digis/digi.dev/v1/lamp/default/l1");
        assert_eq!(request.url().query(), None);
        assert_eq!(request.url().fragment(), None);

        // a name that would have split off a query is refused at parse time
        assert!("digi.dev/v1/lamp/default/l1?x=1".parse::<Auri>().is_err());
    }
}
