//! Response normalization: one JSON body in, one page of records out.

use serde_json::Value;

use super::error::SearchError;
use super::result::SearchItem;

/// One parsed API response
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `queries.nextPage[0].startIndex`, if the API offered another page
    pub next_start: Option<u32>,
}

impl<T> Page<T> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_start: None,
        }
    }
}

/// Parse `body`, keeping at most `remaining` records.
///
/// An `error` object anywhere at the top level short-circuits parsing, whatever the HTTP
/// status was. A missing or empty `items` array is an empty final page.
pub fn parse_page<T: SearchItem>(body: &str, remaining: usize) -> Result<Page<T>, SearchError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| SearchError::MalformedResponse(format!("invalid JSON: {e}")))?;

    if !root.is_object() {
        return Err(SearchError::MalformedResponse(
            "expected a JSON object at the top level".to_string(),
        ));
    }

    if let Some(error) = root.get("error") {
        let message = error["message"].as_str().unwrap_or("Unknown error");
        return Err(SearchError::Api(message.to_string()));
    }

    let items = match root.get("items").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => return Ok(Page::empty()),
    };

    let items: Vec<T> = items.iter().take(remaining).map(T::from_item).collect();

    let next_start = root["queries"]["nextPage"]
        .as_array()
        .and_then(|pages| pages.first())
        .and_then(|page| page["startIndex"].as_u64())
        .and_then(|start| u32::try_from(start).ok());

    Ok(Page { items, next_start })
}
