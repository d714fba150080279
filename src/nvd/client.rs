use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::CveSearchResponse;
use crate::capabilities::{RelatedRecord, VulnerabilitySearch};
use crate::config::{NvdConfig, RequestConfig};

/// Client for the NVD CVE search endpoint.
///
/// Every request is followed by a fixed delay so repeated expansions stay
/// within the public rate limit.
#[derive(Clone)]
pub struct NvdClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    rate_limit: Duration,
}

impl NvdClient {
    /// Create a new NVD client
    pub fn new(config: &NvdConfig, request_config: &RequestConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            rate_limit: Duration::from_millis(config.rate_limit_ms),
        })
    }

    async fn fetch(&self, keywords: &[String], max_results: usize) -> Result<CveSearchResponse, String> {
        let query = keywords.join(" ");
        let per_page = max_results.to_string();
        let mut request = self.client.get(&self.base_url).query(&[
            ("keywordSearch", query.as_str()),
            ("resultsPerPage", per_page.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("apiKey", key);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status.as_u16(), body));
        }

        response
            .json::<CveSearchResponse>()
            .await
            .map_err(|e| format!("Failed to parse NVD response: {}", e))
    }
}

#[async_trait]
impl VulnerabilitySearch for NvdClient {
    async fn search_by_keywords(&self, keywords: &[String], max_results: usize) -> Vec<RelatedRecord> {
        if keywords.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let start = Instant::now();
        debug!(keywords = ?keywords, max_results, "Searching NVD");
        let result = self.fetch(keywords, max_results).await;

        if !self.rate_limit.is_zero() {
            tokio::time::sleep(self.rate_limit).await;
        }

        match result {
            Ok(response) => {
                let records = response.into_records(max_results);
                info!(
                    results = records.len(),
                    latency_ms = start.elapsed().as_millis(),
                    "NVD search completed"
                );
                records
            }
            Err(e) => {
                warn!(error = %e, "NVD search failed; continuing without related vulnerabilities");
                Vec::new()
            }
        }
    }
}
