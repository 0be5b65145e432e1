//! API credentials.
//!
//! Storage is someone else's job: the search pipeline only asks a [`CredentialProvider`] for
//! an opaque key and search-engine id when an invocation starts.

use std::fmt;

use crate::config::Config;
use crate::search::SearchError;

pub const KEY_ENV: &str = "GOOGLE_SEARCH_KEY";
pub const CX_ENV: &str = "GOOGLE_SEARCH_CX";

const SETUP_HINT: &str = "set `key` and `cx` under [credentials] in the config file, \
     or the GOOGLE_SEARCH_KEY and GOOGLE_SEARCH_CX environment variables.\n\
     Get an API key: https://developers.google.com/custom-search/v1/introduction\n\
     Create a cx:    https://programmablesearchengine.google.com/controlpanel/all";

/// API key plus programmable search engine id
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub cx: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, cx: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cx: cx.into(),
        }
    }

    fn validate(self) -> Result<Self, SearchError> {
        if self.key.trim().is_empty() {
            return Err(SearchError::MissingCredentials(format!(
                "no API key configured; {SETUP_HINT}"
            )));
        }
        if self.cx.trim().is_empty() {
            return Err(SearchError::MissingCredentials(format!(
                "no search engine id (cx) configured; {SETUP_HINT}"
            )));
        }
        Ok(self)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"***REDACTED***")
            .field("cx", &self.cx)
            .finish()
    }
}

/// Source of credentials for one search invocation
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<Credentials, SearchError>;
}

/// Fixed credentials, e.g. from a config file
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Result<Credentials, SearchError> {
        self.0.clone().validate()
    }
}

/// Credentials from `GOOGLE_SEARCH_KEY` / `GOOGLE_SEARCH_CX`
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials, SearchError> {
        let key = std::env::var(KEY_ENV).unwrap_or_default();
        let cx = std::env::var(CX_ENV).unwrap_or_default();
        Credentials::new(key, cx).validate()
    }
}

/// First provider that yields valid credentials wins
pub struct ChainedCredentials {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl ChainedCredentials {
    pub fn new(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }

    /// Config file credentials, falling back to the environment.
    pub fn from_config(config: &Config) -> Self {
        let mut providers: Vec<Box<dyn CredentialProvider>> = Vec::new();
        if let Some(section) = &config.credentials {
            providers.push(Box::new(StaticCredentials::new(Credentials::new(
                section.key.clone(),
                section.cx.clone(),
            ))));
        }
        providers.push(Box::new(EnvCredentials));
        Self::new(providers)
    }
}

impl CredentialProvider for ChainedCredentials {
    fn credentials(&self) -> Result<Credentials, SearchError> {
        let mut last_err = None;
        for provider in &self.providers {
            match provider.credentials() {
                Ok(credentials) => return Ok(credentials),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            SearchError::MissingCredentials(format!("no credential source; {SETUP_HINT}"))
        }))
    }
}
