//! Declarative search over the Google Programmable Search JSON API.
//!
//! A caller describes what it wants (query text, named filters, predicates over the result
//! columns, a result budget) and the pipeline works out how to get it:
//!
//! 1. [`predicate::translate`] pushes what it can into request parameters and returns the rest
//!    as residual predicates,
//! 2. [`planner::FetchPlanner`] pages through the API (one site at a time when needed),
//! 3. [`client::FetchClient`] absorbs transient failures,
//! 4. [`normalize::parse_page`] turns each body into records.

pub mod client;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod planner;
pub mod predicate;
pub mod request_url;
pub mod result;
pub mod rows;
pub mod sites;
pub mod window;

pub use client::{CancelFlag, FetchClient, HttpOutcome, HttpTransport, RetryPolicy};
pub use engine::{QueryOutput, SearchEngine};
pub use error::SearchError;
pub use planner::{FetchPlanner, PlannerConfig};
pub use predicate::{CompareOp, Operand, Predicate, Pushdown, SortDirection};
pub use result::{ImageResult, SearchItem, SearchResult};
pub use rows::RowBatches;
pub use sites::SiteFilterSet;
pub use window::DateWindow;

/// Results the API returns per call
pub const PAGE_SIZE: u32 = 10;

/// Results the API will page through for one logical query
pub const API_MAX_RESULTS: usize = 100;

/// Web pages or images
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchKind {
    #[default]
    Web,
    Image,
}

/// Named filters passed through as request parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// `exactTerms` - phrase that must appear
    pub exact_terms: Option<String>,
    /// `excludeTerms` - words that must not appear
    pub exclude_terms: Option<String>,
    /// `orTerms` - alternative terms
    pub or_terms: Option<String>,
    /// `fileType` (pdf, doc, ...)
    pub file_type: Option<String>,
    /// `gl` - geolocation boost
    pub country: Option<String>,
    /// `lr` - document language (lang_en, lang_de, ...)
    pub language: Option<String>,
    /// `hl` - interface language
    pub interface_language: Option<String>,
    /// `safe` (active, off)
    pub safe: Option<String>,
    /// `rights` - Creative Commons licensing
    pub rights: Option<String>,
    /// Explicit `sort`; wins over any ordering hint
    pub sort: Option<String>,
    /// Prepended to the query, e.g. `more:pagemap:document-author:john`
    pub structured_data: Option<String>,
    /// Explicit `dateRestrict` code; wins over a date window
    pub date_restrict: Option<String>,
    /// Include domains given by name rather than by predicate
    pub sites: Vec<String>,
    pub img_size: Option<String>,
    pub img_type: Option<String>,
    pub img_color_type: Option<String>,
    pub img_dominant_color: Option<String>,
}

impl Filters {
    /// Plain pass-through parameters, in request order.
    pub fn api_params(&self) -> Vec<(&'static str, &str)> {
        [
            ("exactTerms", &self.exact_terms),
            ("excludeTerms", &self.exclude_terms),
            ("orTerms", &self.or_terms),
            ("fileType", &self.file_type),
            ("gl", &self.country),
            ("hl", &self.interface_language),
            ("lr", &self.language),
            ("safe", &self.safe),
            ("rights", &self.rights),
            ("imgSize", &self.img_size),
            ("imgType", &self.img_type),
            ("imgColorType", &self.img_color_type),
            ("imgDominantColor", &self.img_dominant_color),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

/// One search invocation as requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub kind: SearchKind,
    pub filters: Filters,
    /// Result budget; `None` means the API maximum
    pub limit: Option<i64>,
}

const COMMON_FILTERS: &[&str] = &[
    "exact_terms",
    "exclude_terms",
    "site",
    "date_restrict",
    "safe",
    "rights",
];

const WEB_FILTERS: &[&str] = &[
    "or_terms",
    "file_type",
    "country",
    "language",
    "interface_language",
    "sort",
    "structured_data",
];

const IMAGE_FILTERS: &[&str] = &["img_size", "img_type", "img_color_type", "img_dominant_color"];

impl SearchRequest {
    /// Web search for `query`.
    pub fn new(query: impl Into<String>) -> Result<Self, SearchError> {
        Self::with_kind(query, SearchKind::Web)
    }

    /// Image search for `query`.
    pub fn image(query: impl Into<String>) -> Result<Self, SearchError> {
        Self::with_kind(query, SearchKind::Image)
    }

    fn with_kind(query: impl Into<String>, kind: SearchKind) -> Result<Self, SearchError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery(
                "a search query is required".to_string(),
            ));
        }

        Ok(Self {
            query: query.trim().to_string(),
            kind,
            filters: Filters::default(),
            limit: None,
        })
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set a named filter. Names are case-insensitive; names that do not apply to this
    /// kind of search are rejected.
    pub fn with_filter(
        mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let key = name.trim().to_ascii_lowercase();
        let allowed = COMMON_FILTERS.contains(&key.as_str())
            || match self.kind {
                SearchKind::Web => WEB_FILTERS.contains(&key.as_str()),
                SearchKind::Image => IMAGE_FILTERS.contains(&key.as_str()),
            };
        if !allowed {
            return Err(SearchError::UnknownFilter(name.to_string()));
        }

        let value = value.into();
        let f = &mut self.filters;
        let slot = match key.as_str() {
            "site" => {
                f.sites.push(value);
                return Ok(self);
            }
            "exact_terms" => &mut f.exact_terms,
            "exclude_terms" => &mut f.exclude_terms,
            "or_terms" => &mut f.or_terms,
            "file_type" => &mut f.file_type,
            "country" => &mut f.country,
            "language" => &mut f.language,
            "interface_language" => &mut f.interface_language,
            "safe" => &mut f.safe,
            "rights" => &mut f.rights,
            "sort" => &mut f.sort,
            "structured_data" => &mut f.structured_data,
            "date_restrict" => &mut f.date_restrict,
            "img_size" => &mut f.img_size,
            "img_type" => &mut f.img_type,
            "img_color_type" => &mut f.img_color_type,
            "img_dominant_color" => &mut f.img_dominant_color,
            _ => return Err(SearchError::UnknownFilter(name.to_string())),
        };
        *slot = Some(value);
        Ok(self)
    }
}
