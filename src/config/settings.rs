use serde::{Deserialize, Serialize};

use crate::search::planner::{
    PlannerConfig, DEFAULT_ENDPOINT, DEFAULT_IMAGE_FIELDS, DEFAULT_WEB_FIELDS,
};
use crate::search::rows::DEFAULT_BATCH_SIZE;
use crate::search::RetryPolicy;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rows per delivered batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Write debug logs to a file
    #[serde(default)]
    pub debug: bool,

    /// Directory for debug logs (default: next to the config file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_dir: Option<String>,

    /// Per-run log files to keep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_keep: Option<usize>,

    /// Search API endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Backoff for transient API failures
    #[serde(default)]
    pub retry: RetryPolicy,

    /// API credentials; the environment is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialSection>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            debug: false,
            debug_log_dir: None,
            debug_log_keep: None,
            api: ApiConfig::default(),
            retry: RetryPolicy::default(),
            credentials: None,
        }
    }
}

impl Config {
    /// Planner settings derived from this configuration.
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            endpoint: self.api.endpoint.clone(),
            web_fields: self.api.web_fields.clone(),
            image_fields: self.api.image_fields.clone(),
            retry: self.retry.clone(),
        }
    }
}

/// Where and how to call the search API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,

    /// `fields` projection for web search
    pub web_fields: String,

    /// `fields` projection for image search
    pub image_fields: String,

    /// Per-request network timeout
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            web_fields: DEFAULT_WEB_FIELDS.to_string(),
            image_fields: DEFAULT_IMAGE_FIELDS.to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// API key and search engine id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSection {
    pub key: String,
    pub cx: String,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
