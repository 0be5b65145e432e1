use chrono::{DateTime, Utc};
use reqwest::Url;

use super::error::SearchError;
use super::predicate::Pushdown;
use super::{SearchKind, SearchRequest, PAGE_SIZE};
use crate::credentials::Credentials;

/// How include sites are expressed in one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteScope<'a> {
    /// No include sites, or all of them folded into the query as an OR group
    Query,
    /// One site via `siteSearch`
    Single(&'a str),
}

/// Everything needed to build one page request
pub struct UrlParts<'a> {
    pub endpoint: &'a str,
    pub fields: &'a str,
    pub credentials: &'a Credentials,
    pub request: &'a SearchRequest,
    pub pushdown: &'a Pushdown,
}

impl UrlParts<'_> {
    /// Full query text: structured-data prefix, query, include OR group, `-site:` excludes.
    pub fn query_text(&self, scope: SiteScope<'_>) -> String {
        let mut text = match &self.request.filters.structured_data {
            Some(prefix) if !prefix.trim().is_empty() => {
                format!("{} {}", prefix.trim(), self.request.query)
            }
            _ => self.request.query.clone(),
        };

        let includes = self.pushdown.sites.includes();
        if scope == SiteScope::Query && includes.len() > 1 {
            let group: Vec<String> = includes.iter().map(|s| format!("site:{s}")).collect();
            text.push_str(&format!(" ({})", group.join(" OR ")));
        }

        for site in self.pushdown.sites.excludes() {
            text.push_str(&format!(" -site:{site}"));
        }
        text
    }

    /// Request URL for the page starting at `start`, with date codes relative to `now`.
    pub fn build(
        &self,
        start: u32,
        scope: SiteScope<'_>,
        now: DateTime<Utc>,
    ) -> Result<Url, SearchError> {
        let mut url = Url::parse(self.endpoint).map_err(|e| {
            SearchError::Other(anyhow::anyhow!("Invalid endpoint '{}': {e}", self.endpoint))
        })?;

        let query = self.query_text(scope);
        let filters = &self.request.filters;
        {
            let mut params = url.query_pairs_mut();
            params
                .append_pair("key", &self.credentials.key)
                .append_pair("cx", &self.credentials.cx)
                .append_pair("q", &query);
            if self.request.kind == SearchKind::Image {
                params.append_pair("searchType", "image");
            }
            params
                .append_pair("num", &PAGE_SIZE.to_string())
                .append_pair("start", &start.to_string());

            let single_site = match scope {
                SiteScope::Single(site) => Some(site),
                SiteScope::Query => match self.pushdown.sites.includes() {
                    [only] => Some(only.as_str()),
                    _ => None,
                },
            };
            if let Some(site) = single_site {
                params
                    .append_pair("siteSearch", site)
                    .append_pair("siteSearchFilter", "i");
            }

            let date_restrict = filters
                .date_restrict
                .clone()
                .or_else(|| self.pushdown.window.restrict_code(now));
            if let Some(code) = date_restrict {
                params.append_pair("dateRestrict", &code);
            }

            for (name, value) in filters.api_params() {
                params.append_pair(name, value);
            }
            if let Some(sort) = filters.sort.as_ref().or(self.pushdown.sort.as_ref()) {
                params.append_pair("sort", sort);
            }

            params.append_pair("fields", self.fields);
        }
        Ok(url)
    }
}
