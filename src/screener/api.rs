//! Backend seams: where screener content comes from and where answers go.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::error::ApiError;

use super::ids::IdGenerator;
use super::model::{Screener, SubmissionRequest, SubmissionResponse};

/// Header carrying the per-request tracing token.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

pub const SCREENER_ENDPOINT: &str = "/screener";
pub const ANSWERS_ENDPOINT: &str = "/answers";

/// Supplies the questionnaire definition.
#[async_trait]
pub trait ScreenerProvider: Send + Sync {
    async fn fetch_screener(&self) -> Result<Screener, ApiError>;
}

/// Accepts a completed answer set and returns recommended assessments.
///
/// Not idempotent: callers must submit at most once per completed flow.
#[async_trait]
pub trait AnswerSubmitter: Send + Sync {
    async fn submit_answers(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResponse, ApiError>;
}

/// HTTP client for the screener backend.
pub struct HttpScreenerApi {
    config: ApiConfig,
    ids: Arc<dyn IdGenerator>,
    client: reqwest::Client,
}

impl HttpScreenerApi {
    pub fn new(config: ApiConfig, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            config,
            ids,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// JSON content type plus a fresh correlation id for one call.
    ///
    /// A generated id that is not a legal header value fails the call
    /// before anything is sent.
    fn headers(&self, endpoint: &str) -> Result<(HeaderMap, String), ApiError> {
        let correlation_id = self.ids.generate();
        let value = HeaderValue::from_str(&correlation_id).map_err(|e| {
            tracing::warn!(%endpoint, ?correlation_id, "Unusable correlation id: {}", e);
            ApiError::InvalidHeader {
                header: CORRELATION_HEADER,
                value: correlation_id.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CORRELATION_HEADER, value);
        Ok((headers, correlation_id))
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        correlation_id: &str,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(
                %endpoint,
                %correlation_id,
                status = status.as_u16(),
                body = %body.chars().take(200).collect::<String>(),
                "Screener backend returned an error status"
            );
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json::<T>().await.map_err(|e| {
            tracing::warn!(%endpoint, %correlation_id, "Failed to decode response: {}", e);
            ApiError::Decode {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })
    }

    fn transport_error(endpoint: &str, correlation_id: &str, e: reqwest::Error) -> ApiError {
        tracing::warn!(%endpoint, %correlation_id, "Request failed: {}", e);
        ApiError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl ScreenerProvider for HttpScreenerApi {
    async fn fetch_screener(&self) -> Result<Screener, ApiError> {
        let endpoint = self.config.path(SCREENER_ENDPOINT);
        let (headers, correlation_id) = self.headers(&endpoint)?;
        tracing::debug!(%endpoint, %correlation_id, "Fetching screener");

        let resp = self
            .client
            .get(self.config.url(SCREENER_ENDPOINT))
            .headers(headers)
            .send()
            .await
            .map_err(|e| Self::transport_error(&endpoint, &correlation_id, e))?;

        Self::read_json(&endpoint, &correlation_id, resp).await
    }
}

#[async_trait]
impl AnswerSubmitter for HttpScreenerApi {
    async fn submit_answers(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResponse, ApiError> {
        let endpoint = self.config.path(ANSWERS_ENDPOINT);
        let (headers, correlation_id) = self.headers(&endpoint)?;
        tracing::debug!(
            %endpoint,
            %correlation_id,
            session_id = %request.session_id,
            answers = request.answers.len(),
            "Submitting answers"
        );

        let resp = self
            .client
            .post(self.config.url(ANSWERS_ENDPOINT))
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&endpoint, &correlation_id, e))?;

        Self::read_json(&endpoint, &correlation_id, resp).await
    }
}
