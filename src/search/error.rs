use super::client::HttpOutcome;

/// Search-related errors
///
/// Every variant except `Cancelled` is terminal for a planning invocation: the planner
/// aborts on the first one it sees and discards whatever was accumulated.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Google Search API: Invalid API key - {detail}")]
    InvalidApiKey { detail: String },

    #[error("Google Search API: Access denied or quota exceeded - {detail}")]
    AccessDenied { detail: String },

    #[error("Google Search API: Invalid request - {detail}")]
    InvalidRequest { detail: String },

    #[error("Google Search API error: {detail} (status {status})")]
    Http { status: i32, detail: String },

    #[error("Max retries exceeded after {attempts} attempts (last status {status}): {detail}")]
    RetriesExhausted {
        status: i32,
        attempts: u32,
        detail: String,
    },

    #[error("Failed to parse Google Search API response: {0}")]
    MalformedResponse(String),

    #[error("Google Search API error: {0}")]
    Api(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid limit {0}: result budget must be a positive number")]
    InvalidLimit(i64),

    #[error("Unknown search filter: '{0}'")]
    UnknownFilter(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Search cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SearchError {
    /// Classify a terminal (unsuccessful) fetch outcome.
    pub fn from_outcome(outcome: &HttpOutcome) -> Self {
        let detail = outcome.detail();
        match outcome.status {
            401 => SearchError::InvalidApiKey { detail },
            403 => SearchError::AccessDenied { detail },
            400 => SearchError::InvalidRequest { detail },
            status if HttpOutcome::is_retryable(status) => SearchError::RetriesExhausted {
                status,
                attempts: outcome.attempts,
                detail,
            },
            status => SearchError::Http { status, detail },
        }
    }

    /// Whether the underlying condition was transient.
    ///
    /// The fetch client has already spent its retry budget by the time one of these
    /// reaches a caller, so this is informational only.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::RetriesExhausted { .. })
    }
}
