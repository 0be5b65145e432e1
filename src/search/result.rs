use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record the response normalizer can build from one entry of `items`.
pub trait SearchItem: Send + Sized {
    /// Build a record from one JSON item. Missing fields default to empty.
    fn from_item(item: &Value) -> Self;
}

/// One web search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub display_link: String,
    pub formatted_url: String,
    pub html_formatted_url: String,
    pub html_title: String,
    pub html_snippet: String,
    pub mime: String,
    pub file_format: String,
    /// Structured page metadata, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagemap: Option<Value>,
    /// Host of `link`; never read from the payload
    pub site: String,
    /// Reserved for date ordering hints; the API never returns it
    pub date: Option<String>,
}

impl SearchItem for SearchResult {
    fn from_item(item: &Value) -> Self {
        let link = text(item, "link");
        Self {
            title: text(item, "title"),
            snippet: text(item, "snippet"),
            display_link: text(item, "displayLink"),
            formatted_url: text(item, "formattedUrl"),
            html_formatted_url: text(item, "htmlFormattedUrl"),
            html_title: text(item, "htmlTitle"),
            html_snippet: text(item, "htmlSnippet"),
            mime: text(item, "mime"),
            file_format: text(item, "fileFormat"),
            pagemap: item.get("pagemap").filter(|v| !v.is_null()).cloned(),
            site: extract_domain(&link),
            date: None,
            link,
        }
    }
}

/// One image search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub title: String,
    /// For image search the link is the image itself
    pub link: String,
    pub image_url: String,
    pub thumbnail_url: String,
    pub width: i64,
    pub height: i64,
    pub thumbnail_width: i64,
    pub thumbnail_height: i64,
    /// Page the image appears on
    pub context_link: String,
    pub mime: String,
    pub snippet: String,
    pub site: String,
}

impl SearchItem for ImageResult {
    fn from_item(item: &Value) -> Self {
        let link = text(item, "link");
        let image = &item["image"];
        Self {
            title: text(item, "title"),
            image_url: link.clone(),
            thumbnail_url: text(image, "thumbnailLink"),
            width: integer(image, "width"),
            height: integer(image, "height"),
            thumbnail_width: integer(image, "thumbnailWidth"),
            thumbnail_height: integer(image, "thumbnailHeight"),
            context_link: text(image, "contextLink"),
            mime: text(item, "mime"),
            snippet: text(item, "snippet"),
            site: extract_domain(&link),
            link,
        }
    }
}

fn text(obj: &Value, key: &str) -> String {
    obj[key].as_str().unwrap_or("").to_string()
}

fn integer(obj: &Value, key: &str) -> i64 {
    obj[key].as_i64().unwrap_or(0)
}

/// Host portion of a URL: scheme and everything from the first `/` after it are dropped.
pub fn extract_domain(url: &str) -> String {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    let end = rest.find('/').unwrap_or(rest.len());
    rest[..end].to_string()
}
