//! reqwest-backed implementation of [`PortalApi`].

use std::fmt::Display;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use shared::{
    domain::{DistrictMap, FilterForm, ItemId, RegionCode, SaveState, SyncJobStatus},
    error::PortalError,
    protocol::{
        body_error, decode_outcome, decode_status, ApiOutcome, SaveResponse, SyncStarted,
        DISTRICTS_PATH, SAVE_PATH, SYNC_START_PATH, SYNC_STATUS_PATH,
    },
};
use tracing::debug;
use url::Url;

use crate::{config::Settings, PortalApi};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct HttpPortalClient {
    http: Client,
    base_url: Url,
}

impl HttpPortalClient {
    pub fn new(base_url: &str) -> Result<Self, PortalError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, PortalError> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| PortalError::InvalidRequest {
                reason: format!("failed to build http client: {e}"),
            })?;
        Self::with_client(&settings.base_url, http)
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, PortalError> {
        let base_url = Url::parse(base_url).map_err(|e| PortalError::InvalidRequest {
            reason: format!("invalid base url '{base_url}': {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PortalError::InvalidRequest {
                reason: format!("base url '{base_url}' cannot carry endpoint paths"),
            });
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `path` and the percent-encoded `param` segment to the base url.
    fn endpoint(&self, path: &str, param: Option<&str>) -> Result<Url, PortalError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                PortalError::InvalidRequest {
                    reason: "base url cannot carry endpoint paths".into(),
                }
            })?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
            if let Some(param) = param {
                segments.push(param);
            }
        }
        Ok(url)
    }

    /// Non-2xx bodies only count as an application error when they carry an
    /// `error` field. Success bodies go through `decode`.
    async fn read_outcome<T, E: Display>(
        &self,
        endpoint: &str,
        response: Response,
        decode: impl FnOnce(&[u8]) -> Result<ApiOutcome<T>, E>,
    ) -> Result<ApiOutcome<T>, PortalError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PortalError::transport(endpoint, e.to_string()))?;
        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "portal response");

        if !status.is_success() {
            return match body_error(&body) {
                Some(message) => Ok(ApiOutcome::Failed(message)),
                None => Err(PortalError::Status {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                }),
            };
        }
        decode(&body).map_err(|e| PortalError::decode(endpoint, e.to_string()))
    }
}

#[async_trait]
impl PortalApi for HttpPortalClient {
    async fn fetch_districts(
        &self,
        region: &RegionCode,
    ) -> Result<ApiOutcome<DistrictMap>, PortalError> {
        let url = self.endpoint(DISTRICTS_PATH, Some(region.as_str()))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PortalError::transport(DISTRICTS_PATH, e.to_string()))?;
        self.read_outcome(DISTRICTS_PATH, response, decode_outcome).await
    }

    async fn start_sync(&self, form: &FilterForm) -> Result<ApiOutcome<SyncStarted>, PortalError> {
        let url = self.endpoint(SYNC_START_PATH, None)?;
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form.to_urlencoded())
            .send()
            .await
            .map_err(|e| PortalError::transport(SYNC_START_PATH, e.to_string()))?;
        self.read_outcome(SYNC_START_PATH, response, decode_outcome).await
    }

    async fn sync_status(&self) -> Result<ApiOutcome<SyncJobStatus>, PortalError> {
        let url = self.endpoint(SYNC_STATUS_PATH, None)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PortalError::transport(SYNC_STATUS_PATH, e.to_string()))?;
        self.read_outcome(SYNC_STATUS_PATH, response, decode_status).await
    }

    async fn toggle_save(&self, item: &ItemId) -> Result<ApiOutcome<SaveState>, PortalError> {
        let url = self.endpoint(SAVE_PATH, Some(item.as_str()))?;
        let response = self
            .http
            .post(url)
            .send()
            .await
            .map_err(|e| PortalError::transport(SAVE_PATH, e.to_string()))?;
        let outcome: ApiOutcome<SaveResponse> = self
            .read_outcome(SAVE_PATH, response, decode_outcome)
            .await?;
        Ok(outcome.map(SaveState::from))
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
