//! Pagination planning.
//!
//! One [`FetchState`] per invocation drives the API either as a single paged query or, for
//! budgets beyond one query's reach across several include sites, as one paged query per site
//! visited round-robin. Exactly one request is awaited at a time.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::client::{CancelFlag, FetchClient, RetryPolicy};
use super::error::SearchError;
use super::normalize::parse_page;
use super::predicate::Pushdown;
use super::request_url::{SiteScope, UrlParts};
use super::result::SearchItem;
use super::{SearchKind, SearchRequest, API_MAX_RESULTS};
use crate::credentials::Credentials;
use crate::logging::redact_secrets;

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

pub const DEFAULT_WEB_FIELDS: &str = "items(title,link,snippet,displayLink,formattedUrl,\
htmlFormattedUrl,htmlTitle,htmlSnippet,mime,fileFormat,pagemap),queries(nextPage)";

pub const DEFAULT_IMAGE_FIELDS: &str = "items(title,link,snippet,mime,image),queries(nextPage)";

/// Highest start index the API will serve
const MAX_START: u32 = API_MAX_RESULTS as u32;

/// Endpoint, projections and retry policy, fixed for the planner's lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub endpoint: String,
    pub web_fields: String,
    pub image_fields: String,
    pub retry: RetryPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            web_fields: DEFAULT_WEB_FIELDS.to_string(),
            image_fields: DEFAULT_IMAGE_FIELDS.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PlannerConfig {
    fn fields_for(&self, kind: SearchKind) -> &str {
        match kind {
            SearchKind::Web => &self.web_fields,
            SearchKind::Image => &self.image_fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One paged query; several include sites share it as an OR group
    Single,
    /// One paged query per include site, visited round-robin
    PerSite,
}

/// Per-site queries only pay off when one query's 100 results can't cover the budget.
pub fn select_mode(include_count: usize, max_results: usize) -> FetchMode {
    if include_count > 1 && max_results > API_MAX_RESULTS {
        FetchMode::PerSite
    } else {
        FetchMode::Single
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteCursor {
    pub next_start: u32,
    pub exhausted: bool,
}

impl Default for SiteCursor {
    fn default() -> Self {
        Self {
            next_start: 1,
            exhausted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ModeState {
    Single { next_start: u32, complete: bool },
    PerSite { sites: Vec<SiteCursor>, current: usize },
}

/// Request context for one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Round {
    pub start: u32,
    /// Index into the include list in per-site mode
    pub site: Option<usize>,
}

/// Pagination state owned by a single planning invocation
#[derive(Debug)]
pub struct FetchState<T> {
    results: Vec<T>,
    max_results: usize,
    mode: ModeState,
}

impl<T> FetchState<T> {
    pub fn new(include_count: usize, max_results: usize) -> Self {
        let mode = match select_mode(include_count, max_results) {
            FetchMode::Single => ModeState::Single {
                next_start: 1,
                complete: false,
            },
            FetchMode::PerSite => ModeState::PerSite {
                sites: vec![SiteCursor::default(); include_count],
                current: 0,
            },
        };

        Self {
            results: Vec::new(),
            max_results,
            mode,
        }
    }

    pub fn mode(&self) -> FetchMode {
        match self.mode {
            ModeState::Single { .. } => FetchMode::Single,
            ModeState::PerSite { .. } => FetchMode::PerSite,
        }
    }

    /// Budget still outstanding.
    pub fn remaining(&self) -> usize {
        self.max_results.saturating_sub(self.results.len())
    }

    pub fn results(&self) -> &[T] {
        &self.results
    }

    /// Next request to make, or `None` once the budget is met or every source is exhausted.
    pub fn next_round(&mut self) -> Option<Round> {
        if self.remaining() == 0 {
            return None;
        }

        match &mut self.mode {
            ModeState::Single {
                next_start,
                complete,
            } => (!*complete).then_some(Round {
                start: *next_start,
                site: None,
            }),
            ModeState::PerSite { sites, current } => {
                let count = sites.len();
                let idx = (0..count)
                    .map(|offset| (*current + offset) % count)
                    .find(|&i| !sites[i].exhausted)?;
                *current = idx;
                Some(Round {
                    start: sites[idx].next_start,
                    site: Some(idx),
                })
            }
        }
    }

    /// Fold one page into the state.
    ///
    /// The source for `round` is finished when the page is empty, carries no continuation, or
    /// continues past the API's last start index. Items beyond the budget are dropped.
    pub fn record_page(&mut self, round: Round, items: Vec<T>, next_start: Option<u32>) {
        let page_was_empty = items.is_empty();
        let room = self.remaining();
        self.results.extend(items.into_iter().take(room));

        let advance = match next_start {
            Some(next) if !page_was_empty && next > round.start && next <= MAX_START => {
                Some(next)
            }
            _ => None,
        };

        match &mut self.mode {
            ModeState::Single {
                next_start,
                complete,
            } => match advance {
                Some(next) => *next_start = next,
                None => *complete = true,
            },
            ModeState::PerSite { sites, current } => {
                let Some(idx) = round.site else { return };
                let cursor = &mut sites[idx];
                match advance {
                    Some(next) => cursor.next_start = next,
                    None => cursor.exhausted = true,
                }
                *current = (idx + 1) % sites.len();
            }
        }
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }
}

/// Drives translated requests through the fetch client and response normalizer
#[derive(Clone)]
pub struct FetchPlanner {
    config: PlannerConfig,
    client: FetchClient,
}

impl FetchPlanner {
    pub fn new(config: PlannerConfig, client: FetchClient) -> Self {
        Self { config, client }
    }

    /// Collect up to `pushdown.max_results` records for `request`.
    ///
    /// Any terminal fetch or parse error aborts the whole invocation and the records gathered
    /// so far are dropped. `cancel` is checked between rounds and before retry sleeps.
    pub async fn run<T: SearchItem>(
        &self,
        credentials: &Credentials,
        request: &SearchRequest,
        pushdown: &Pushdown,
        cancel: &CancelFlag,
    ) -> Result<Vec<T>, SearchError> {
        let includes = pushdown.sites.includes();
        let mut state: FetchState<T> = FetchState::new(includes.len(), pushdown.max_results);
        let parts = UrlParts {
            endpoint: &self.config.endpoint,
            fields: self.config.fields_for(request.kind),
            credentials,
            request,
            pushdown,
        };

        tracing::debug!(
            query = %request.query,
            mode = ?state.mode(),
            sites = includes.len(),
            max_results = pushdown.max_results,
            "search planning started"
        );

        let mut calls = 0u32;
        while let Some(round) = state.next_round() {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }

            let scope = match round.site {
                Some(idx) => SiteScope::Single(&includes[idx]),
                None => SiteScope::Query,
            };
            let url = parts.build(round.start, scope, Utc::now())?;

            tracing::debug!(
                start = round.start,
                site = ?round.site.map(|i| includes[i].as_str()),
                url = %redact_secrets(url.as_str()),
                "fetching search page"
            );

            let outcome = self
                .client
                .fetch_cancellable(url.as_str(), &self.config.retry, cancel)
                .await;
            calls += 1;

            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            if !outcome.success {
                let err = SearchError::from_outcome(&outcome);
                tracing::warn!(
                    status = outcome.status,
                    error = %err,
                    retryable = err.is_retryable(),
                    discarded = state.results().len(),
                    "search planning aborted"
                );
                return Err(err);
            }

            let page = parse_page::<T>(&outcome.body, state.remaining())?;
            tracing::trace!(
                items = page.items.len(),
                next_start = ?page.next_start,
                "search page parsed"
            );
            state.record_page(round, page.items, page.next_start);
        }

        tracing::info!(
            query = %request.query,
            results = state.results().len(),
            calls,
            "search completed"
        );

        Ok(state.into_results())
    }
}
