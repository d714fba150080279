//! Shared fixtures for integration tests.

#![allow(dead_code)]

use breach_investigator::config::{
    Config, DatabaseConfig, InvestigationConfig, LangbaseConfig, LogFormat, LoggingConfig,
    NvdConfig, PipeConfig, RequestConfig,
};

/// Configuration pointing Langbase and NVD at `base_url`, without retries or
/// rate-limit delays.
pub fn test_config(base_url: &str) -> Config {
    Config {
        langbase: LangbaseConfig {
            api_key: "test-api-key".to_string(),
            base_url: base_url.to_string(),
        },
        database: DatabaseConfig {
            path: ":memory:".into(),
            max_connections: 1,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig {
            timeout_ms: 5000,
            max_retries: 0,
            retry_delay_ms: 10,
        },
        pipes: PipeConfig {
            hypothesis: "hypothesis-pipe".to_string(),
            report: "report-pipe".to_string(),
            recommendations: "recommendations-pipe".to_string(),
        },
        nvd: NvdConfig {
            base_url: format!("{}/rest/json/cves/2.0", base_url),
            api_key: None,
            rate_limit_ms: 0,
            max_results: 5,
        },
        investigation: InvestigationConfig::default(),
    }
}
