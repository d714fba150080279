use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{PipeDefinition, PipeInfo, PipeRequest, PipeResponse, PipeSpec};
use crate::config::{LangbaseConfig, RequestConfig};
use crate::error::{LangbaseError, LangbaseResult};

const RUN_PATH: &str = "/v1/pipes/run";
const PIPES_PATH: &str = "/v1/pipes";

/// Client for the Langbase Pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_config: RequestConfig,
}

impl LangbaseClient {
    pub fn new(config: &LangbaseConfig, request_config: RequestConfig) -> LangbaseResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LangbaseError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_config,
        })
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a pipe.
    ///
    /// Every failure, including an unparsable body or `success: false`, is
    /// retried up to `max_retries` times with exponential backoff. When
    /// attempts run out the last error is wrapped in
    /// [`LangbaseError::Unavailable`], whose `retries` counts the attempts made.
    pub async fn call_pipe(&self, request: PipeRequest) -> LangbaseResult<PipeResponse> {
        let attempts = self.request_config.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                warn!(
                    pipe = %request.name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying pipe run"
                );
                tokio::time::sleep(delay).await;
            }

            let started = Instant::now();
            match self.run_once(&request).await {
                Ok(response) => {
                    let usage = response.raw.as_ref().and_then(|raw| raw.usage);
                    info!(
                        pipe = %request.name,
                        latency_ms = started.elapsed().as_millis() as u64,
                        attempt = attempt + 1,
                        model = ?response.raw.as_ref().and_then(|raw| raw.model.as_deref()),
                        total_tokens = ?usage.and_then(|u| u.total_tokens),
                        "Pipe run succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        pipe = %request.name,
                        error = %e,
                        latency_ms = started.elapsed().as_millis() as u64,
                        attempt = attempt + 1,
                        "Pipe run failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(LangbaseError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
            retries: attempts,
        })
    }

    async fn run_once(&self, request: &PipeRequest) -> LangbaseResult<PipeResponse> {
        let response: PipeResponse = self.post_json(RUN_PATH, request).await?;
        if !response.success {
            return Err(LangbaseError::InvalidResponse {
                message: "Pipe run reported success: false".to_string(),
            });
        }
        Ok(response)
    }

    /// Create or update the pipe described by `spec`. A 409 counts as success.
    pub async fn ensure_pipe(&self, spec: &PipeSpec) -> LangbaseResult<()> {
        let definition = PipeDefinition::from(spec);

        match self.post_json::<_, PipeInfo>(PIPES_PATH, &definition).await {
            Ok(pipe) => {
                info!(pipe = %pipe.name, url = ?pipe.url, "Pipe ready");
                Ok(())
            }
            Err(LangbaseError::Api { status: 409, .. }) => {
                info!(pipe = %spec.name, "Pipe already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.request_config.retry_delay_ms.saturating_mul(factor))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> LangbaseResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST to Langbase");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangbaseError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    LangbaseError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| LangbaseError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }
}
