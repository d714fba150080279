use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub nvd: NvdConfig,
    pub investigation: InvestigationConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe name configuration
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub hypothesis: String,
    /// Investigation summaries
    pub report: String,
    /// Recommendation lists; provisioned with a smaller token budget
    pub recommendations: String,
}

/// NVD CVE API configuration
#[derive(Debug, Clone)]
pub struct NvdConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Delay after each request; the public API allows roughly 5 requests per 30s.
    pub rate_limit_ms: u64,
    pub max_results: usize,
}

/// Expansion defaults
#[derive(Debug, Clone)]
pub struct InvestigationConfig {
    pub fan_out: usize,
    pub keyword_limit: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH")
                    .unwrap_or_else(|_| "./data/investigations.db".to_string()),
            ),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS").unwrap_or(30000),
            max_retries: parse_var("MAX_RETRIES").unwrap_or(3),
            retry_delay_ms: parse_var("RETRY_DELAY_MS").unwrap_or(1000),
        };

        let pipes = PipeConfig {
            hypothesis: env::var("PIPE_HYPOTHESIS")
                .unwrap_or_else(|_| "breach-hypothesis-v1".to_string()),
            report: env::var("PIPE_REPORT")
                .unwrap_or_else(|_| "investigation-report-v1".to_string()),
            recommendations: env::var("PIPE_RECOMMENDATIONS")
                .unwrap_or_else(|_| "investigation-recommendations-v1".to_string()),
        };

        let nvd = NvdConfig {
            base_url: env::var("NVD_BASE_URL").unwrap_or_else(|_| NvdConfig::default().base_url),
            api_key: env::var("NVD_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            rate_limit_ms: parse_var("NVD_RATE_LIMIT_MS").unwrap_or(6000),
            max_results: parse_var("NVD_MAX_RESULTS").unwrap_or(5),
        };

        let investigation = InvestigationConfig {
            fan_out: parse_var("INVESTIGATION_FAN_OUT").unwrap_or(3),
            keyword_limit: parse_var("KEYWORD_LIMIT").unwrap_or(10),
        };

        Ok(Config {
            langbase,
            database,
            logging,
            request,
            pipes,
            nvd,
            investigation,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for NvdConfig {
    fn default() -> Self {
        Self {
            base_url: "https://services.nvd.nist.gov/rest/json/cves/2.0".to_string(),
            api_key: None,
            rate_limit_ms: 6000,
            max_results: 5,
        }
    }
}

impl Default for InvestigationConfig {
    fn default() -> Self {
        Self {
            fan_out: 3,
            keyword_limit: 10,
        }
    }
}
