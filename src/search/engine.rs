use std::sync::Arc;
use std::time::Duration;

use super::client::{CancelFlag, FetchClient, ReqwestTransport};
use super::error::SearchError;
use super::planner::FetchPlanner;
use super::predicate::{translate, Predicate, Pushdown};
use super::result::{ImageResult, SearchItem, SearchResult};
use super::rows::{RowBatches, DEFAULT_BATCH_SIZE};
use super::{SearchKind, SearchRequest};
use crate::config::Config;
use crate::credentials::{ChainedCredentials, CredentialProvider};

/// Rows ready for delivery, plus the predicates the host still has to apply
#[derive(Debug)]
pub struct QueryOutput<T> {
    pub rows: RowBatches<T>,
    pub residual: Vec<Predicate>,
    pub pushdown: Pushdown,
}

/// Entry point tying credentials, translation, planning and batching together
pub struct SearchEngine {
    planner: FetchPlanner,
    credentials: Arc<dyn CredentialProvider>,
    batch_size: usize,
}

impl SearchEngine {
    pub fn new(planner: FetchPlanner, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            planner,
            credentials,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Engine using the real HTTP transport and config-then-environment credentials.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.api.request_timeout_secs);
        let client = FetchClient::new(Arc::new(ReqwestTransport::new(timeout)?));
        let planner = FetchPlanner::new(config.planner_config(), client);
        let credentials = Arc::new(ChainedCredentials::from_config(config));

        Ok(Self::new(planner, credentials).with_batch_size(config.batch_size))
    }

    /// Web search.
    pub async fn search(
        &self,
        request: &SearchRequest,
        predicates: Vec<Predicate>,
        cancel: &CancelFlag,
    ) -> Result<QueryOutput<SearchResult>, SearchError> {
        if request.kind != SearchKind::Web {
            return Err(SearchError::InvalidQuery(
                "image requests must go through search_images".to_string(),
            ));
        }
        self.execute(request, predicates, cancel).await
    }

    /// Image search.
    pub async fn search_images(
        &self,
        request: &SearchRequest,
        predicates: Vec<Predicate>,
        cancel: &CancelFlag,
    ) -> Result<QueryOutput<ImageResult>, SearchError> {
        if request.kind != SearchKind::Image {
            return Err(SearchError::InvalidQuery(
                "web requests must go through search".to_string(),
            ));
        }
        self.execute(request, predicates, cancel).await
    }

    async fn execute<T: SearchItem + Clone>(
        &self,
        request: &SearchRequest,
        predicates: Vec<Predicate>,
        cancel: &CancelFlag,
    ) -> Result<QueryOutput<T>, SearchError> {
        let credentials = self.credentials.credentials()?;
        let mut pushdown = translate(request, predicates)?;
        let residual = std::mem::take(&mut pushdown.residual);

        let rows = self
            .planner
            .run::<T>(&credentials, request, &pushdown, cancel)
            .await?;

        Ok(QueryOutput {
            rows: RowBatches::new(rows, self.batch_size),
            residual,
            pushdown,
        })
    }
}
