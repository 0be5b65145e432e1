//! Predicate pushdown.
//!
//! The host hands over the predicates it would otherwise evaluate itself. Anything the API can
//! express is folded into a [`Pushdown`]; the rest comes back as residual predicates, in their
//! original order, for the host to apply locally.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::error::SearchError;
use super::sites::SiteFilterSet;
use super::window::DateWindow;
use super::{SearchRequest, API_MAX_RESULTS};

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Null,
    /// Anything that is not a literal (a column, a function call, ...)
    Expression(String),
}

impl Operand {
    pub fn text(value: impl Into<String>) -> Self {
        Operand::Text(value.into())
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Operand::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Literal interpreted as a point in time, if it is one.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Operand::Timestamp(ts) => Some(*ts),
            Operand::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            Operand::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Operand::Integer(n) => write!(f, "{n}"),
            Operand::Timestamp(ts) => write!(f, "TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S")),
            Operand::Date(d) => write!(f, "DATE '{d}'"),
            Operand::Null => write!(f, "NULL"),
            Operand::Expression(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A filter, ordering or limit request over the result columns
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field = value`
    Equality { field: String, value: Operand },
    /// `field != value`
    Inequality { field: String, value: Operand },
    /// `field IN (values...)`
    Membership { field: String, values: Vec<Operand> },
    /// `field LIKE pattern`
    PatternMatch { field: String, pattern: String },
    /// `field <op> value`
    Comparison {
        field: String,
        op: CompareOp,
        value: Operand,
    },
    /// `ORDER BY field <direction>`
    OrderRequest {
        field: String,
        direction: SortDirection,
    },
    /// `LIMIT limit`
    LimitRequest { limit: i64 },
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equality { field, value } => write!(f, "{field} = {value}"),
            Predicate::Inequality { field, value } => write!(f, "{field} != {value}"),
            Predicate::Membership { field, values } => {
                let list: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{field} IN ({})", list.join(", "))
            }
            Predicate::PatternMatch { field, pattern } => {
                write!(f, "{field} LIKE '{}'", pattern.replace('\'', "''"))
            }
            Predicate::Comparison { field, op, value } => write!(f, "{field} {op} {value}"),
            Predicate::OrderRequest { field, direction } => match direction {
                SortDirection::Ascending => write!(f, "ORDER BY {field} ASC"),
                SortDirection::Descending => write!(f, "ORDER BY {field} DESC"),
            },
            Predicate::LimitRequest { limit } => write!(f, "LIMIT {limit}"),
        }
    }
}

/// What the API will be asked to do, plus what it can't
#[derive(Debug, Clone, PartialEq)]
pub struct Pushdown {
    pub sites: SiteFilterSet,
    pub window: DateWindow,
    /// Result budget for the whole invocation
    pub max_results: usize,
    /// `sort` derived from an ordering request
    pub sort: Option<String>,
    /// Predicates the host must still apply, in their original order
    pub residual: Vec<Predicate>,
}

impl Pushdown {
    /// Budget ceiling: one query's worth, or one per include site when several are given.
    pub fn ceiling(include_count: usize) -> usize {
        API_MAX_RESULTS * include_count.max(1)
    }
}

fn is_site(field: &str) -> bool {
    field.eq_ignore_ascii_case("site")
}

fn is_date(field: &str) -> bool {
    field.eq_ignore_ascii_case("date") || field.eq_ignore_ascii_case("timestamp")
}

/// Literal domain inside a `LIKE` pattern on `site`.
///
/// `domain%` and `%.domain` (or `%domain`) are accepted; contains-patterns, `_` wildcards and
/// inner `%` are not.
pub fn site_pattern_domain(pattern: &str) -> Option<String> {
    if pattern.contains('_') {
        return None;
    }

    let suffix_match = pattern.starts_with('%');
    let prefix_match = pattern.len() > 1 && pattern.ends_with('%');
    if suffix_match && prefix_match {
        return None;
    }

    let mut domain = pattern;
    if suffix_match {
        domain = domain.trim_start_matches('%').trim_start_matches('.');
    }
    if prefix_match {
        domain = domain.trim_end_matches('%').trim_end_matches('.');
    }

    if domain.is_empty() || domain.contains('%') {
        return None;
    }
    Some(domain.to_string())
}

/// Split `predicates` into API parameters and residual predicates for `request`.
///
/// Site predicates are consumed. Date comparisons feed the date window but stay residual,
/// since the API only approximates them with relative day buckets. A single `ORDER BY date`
/// becomes a sort hint unless the request already carries an explicit sort. Limits must be
/// positive.
pub fn translate(
    request: &SearchRequest,
    predicates: Vec<Predicate>,
) -> Result<Pushdown, SearchError> {
    let mut sites = SiteFilterSet::new();
    for site in &request.filters.sites {
        sites.include(site.as_str());
    }

    let mut window = DateWindow::default();
    let mut sort = None;
    let mut limits: Vec<i64> = request.limit.into_iter().collect();
    let mut residual = Vec::new();

    let order_requests = predicates
        .iter()
        .filter(|p| matches!(p, Predicate::OrderRequest { .. }))
        .count();

    for predicate in predicates {
        match &predicate {
            Predicate::Equality { field, value } if is_site(field) => {
                if let Some(domain) = value.as_text() {
                    sites.include(domain);
                    continue;
                }
            }
            Predicate::Inequality { field, value } if is_site(field) => {
                if let Some(domain) = value.as_text() {
                    sites.exclude(domain);
                    continue;
                }
            }
            Predicate::Membership { field, values } if is_site(field) => {
                let domains: Option<Vec<&str>> = values.iter().map(Operand::as_text).collect();
                if let Some(domains) = domains.filter(|d| !d.is_empty()) {
                    for domain in domains {
                        sites.include(domain);
                    }
                    continue;
                }
            }
            Predicate::PatternMatch { field, pattern } if is_site(field) => {
                if let Some(domain) = site_pattern_domain(pattern) {
                    sites.include(domain);
                    continue;
                }
            }
            Predicate::Comparison { field, op, value } if is_date(field) => {
                if let Some(ts) = value.as_timestamp() {
                    match op {
                        CompareOp::Gt | CompareOp::GtEq => {
                            window.from = Some(window.from.map_or(ts, |cur| cur.max(ts)));
                        }
                        CompareOp::Lt | CompareOp::LtEq => {
                            window.to = Some(window.to.map_or(ts, |cur| cur.min(ts)));
                        }
                    }
                }
            }
            Predicate::OrderRequest { field, direction }
                if field.eq_ignore_ascii_case("date")
                    && order_requests == 1
                    && request.filters.sort.is_none() =>
            {
                sort = Some(match direction {
                    SortDirection::Descending => "date:d".to_string(),
                    SortDirection::Ascending => "date:a".to_string(),
                });
                continue;
            }
            Predicate::LimitRequest { limit } => {
                limits.push(*limit);
                continue;
            }
            _ => {}
        }
        residual.push(predicate);
    }

    if let Some(bad) = limits.iter().copied().find(|l| *l <= 0) {
        return Err(SearchError::InvalidLimit(bad));
    }

    let ceiling = Pushdown::ceiling(sites.includes().len());
    let requested = limits
        .into_iter()
        .min()
        .map_or(API_MAX_RESULTS, |l| usize::try_from(l).unwrap_or(usize::MAX));
    let max_results = requested.min(ceiling);

    tracing::debug!(
        includes = sites.includes().len(),
        max_results,
        sort = ?sort,
        residual = residual.len(),
        "predicates translated"
    );

    Ok(Pushdown {
        sites,
        window,
        max_results,
        sort,
        residual,
    })
}
