// HTTP implementation of the draft store and generation service.

use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use url::Url;

use super::{DraftStore, GenerationService};
use crate::config::ApiConfig;
use crate::error::BackendError;
use crate::models::requests::{
    DraftSaveRequest, DraftStatus, FeedbackRequest, FinalSubmitRequest, GenerationTriggerRequest,
};
use crate::models::responses::{
    DraftSaveResponse, ErrorBody, GenerationStatus, GenerationTriggerResponse,
};
use crate::utils::logging::{mask_identity, mask_sensitive};
use crate::utils::validation::validate_base_url;

const API_KEY_HEADER: &str = "X-API-KEY";

pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    api_key: Option<String>,
    retry_attempts: usize,
}

impl HttpBackend {
    pub fn new(api: &ApiConfig) -> Result<Self, BackendError> {
        let base = validate_base_url(&api.base_url)
            .map_err(|e| BackendError::Rejected(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if let Some(key) = &api.api_key {
            info!(
                "[PHASE: initialization] [STEP: http_backend] Using API key {} for {}",
                mask_sensitive(key),
                base
            );
        }

        Ok(Self {
            client,
            base,
            api_key: api.api_key.clone().filter(|k| !k.trim().is_empty()),
            retry_attempts: api.retry_attempts.max(1),
        })
    }

    /// `{base}/seg/seg/...` with each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Rejected(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let rb = self.client.request(method, url);
        match &self.api_key {
            Some(key) => rb.header(API_KEY_HEADER, key),
            None => rb,
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.describe())
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(detail));
        }
        Err(BackendError::Status {
            status: status.as_u16(),
            body: detail,
        })
    }

    async fn send_json<T: DeserializeOwned>(rb: RequestBuilder) -> Result<T, BackendError> {
        let resp = Self::check(rb.send().await?).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn send_empty(rb: RequestBuilder) -> Result<(), BackendError> {
        Self::check(rb.send().await?).await?;
        Ok(())
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(self.retry_attempts.saturating_sub(1))
    }
}

fn should_retry(label: &'static str) -> impl FnMut(&BackendError) -> bool {
    move |e: &BackendError| {
        let retry = e.is_transient();
        if retry {
            warn!(
                "[PHASE: persistence] [STEP: retry] {} failed transiently, retrying: {}",
                label, e
            );
        }
        retry
    }
}

#[async_trait]
impl DraftStore for HttpBackend {
    async fn save_draft(
        &self,
        snapshot: &Value,
        id: Option<&str>,
        step: u32,
    ) -> Result<String, BackendError> {
        let started = Instant::now();
        let url = self.endpoint(&["api", "drafts"])?;
        let body = DraftSaveRequest {
            id: id.map(str::to_string),
            step,
            status: DraftStatus::Draft,
            data: snapshot.clone(),
        };

        let attempt = || async {
            Self::send_json::<DraftSaveResponse>(
                self.request(Method::POST, url.clone()).json(&body),
            )
            .await
        };

        // A lost create response must not turn into a second record, so only updates retry.
        let saved = if id.is_some() {
            RetryIf::spawn(self.retry_strategy(), attempt, should_retry("draft update")).await?
        } else {
            attempt().await?
        };

        info!(
            "[PHASE: persistence] [STEP: http_save] Draft saved (id={}, step={}, duration_ms={})",
            mask_identity(Some(&saved.id)),
            step,
            started.elapsed().as_millis()
        );
        Ok(saved.id)
    }

    async fn submit_final(&self, snapshot: &Value, id: &str) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "drafts", id, "submit"])?;
        let body = FinalSubmitRequest {
            status: DraftStatus::Final,
            data: snapshot.clone(),
        };
        Self::send_empty(self.request(Method::POST, url).json(&body)).await
    }

    async fn patch_feedback(
        &self,
        id: &str,
        rating: u8,
        reason: Option<&Value>,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "drafts", id, "feedback"])?;
        let body = FeedbackRequest {
            rating,
            reason: reason.cloned(),
        };
        Self::send_empty(self.request(Method::PATCH, url).json(&body)).await
    }
}

#[async_trait]
impl GenerationService for HttpBackend {
    async fn trigger(&self, request: &GenerationTriggerRequest) -> Result<String, BackendError> {
        let url = self.endpoint(&["api", "pitch", "generate"])?;
        let resp: GenerationTriggerResponse =
            Self::send_json(self.request(Method::POST, url).json(request)).await?;
        if resp.request_id.trim().is_empty() {
            return Err(BackendError::Decode(
                "generation trigger returned an empty requestId".to_string(),
            ));
        }
        Ok(resp.request_id)
    }

    async fn check_status(&self, request_id: &str) -> Result<GenerationStatus, BackendError> {
        let mut url = self.endpoint(&["api", "pitch", "status"])?;
        url.query_pairs_mut().append_pair("requestId", request_id);

        let attempt = || async {
            Self::send_json::<GenerationStatus>(self.request(Method::GET, url.clone())).await
        };
        RetryIf::spawn(self.retry_strategy(), attempt, should_retry("status check")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(&ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let b = backend("https://pitch.example.com/app/");
        assert_eq!(
            b.endpoint(&["api", "drafts"]).unwrap().as_str(),
            "https://pitch.example.com/app/api/drafts"
        );

        let b = backend("http://localhost:3000");
        assert_eq!(
            b.endpoint(&["api", "pitch", "generate"]).unwrap().as_str(),
            "http://localhost:3000/api/pitch/generate"
        );
    }

    #[test]
    fn record_ids_are_percent_encoded() {
        let b = backend("http://localhost:3000");
        let url = b.endpoint(&["api", "drafts", "a/b c", "submit"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/drafts/a%2Fb%20c/submit"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = HttpBackend::new(&ApiConfig {
            base_url: "mailto:someone@example.com".to_string(),
            ..ApiConfig::default()
        });
        assert!(matches!(result, Err(BackendError::Rejected(_))));
    }

    #[test]
    fn blank_api_key_is_dropped() {
        let b = HttpBackend::new(&ApiConfig {
            api_key: Some("   ".to_string()),
            ..ApiConfig::default()
        })
        .unwrap();
        assert!(b.api_key.is_none());
    }

    #[test]
    fn retry_strategy_respects_attempt_budget() {
        let b = HttpBackend::new(&ApiConfig {
            retry_attempts: 3,
            ..ApiConfig::default()
        })
        .unwrap();
        // First attempt + two retries.
        assert_eq!(b.retry_strategy().count(), 2);
    }
}
