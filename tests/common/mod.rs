//! Common test utilities: a scripted transport and canned API pages

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use websearch::credentials::{Credentials, StaticCredentials};
use websearch::search::{
    FetchClient, FetchPlanner, HttpOutcome, HttpTransport, PlannerConfig, RetryPolicy,
    SearchEngine,
};

pub const ENDPOINT: &str = "http://search.test/customsearch/v1";

/// Test fixture for config files
pub struct TestFixture {
    /// Temporary directory that gets cleaned up automatically
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Create a test file with given content
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let filepath = self.path().join(name);
        if let Some(parent) = filepath.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&filepath, content).expect("Failed to write test file");
        filepath
    }

    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.path().join(name)).expect("Failed to read test file")
    }
}

/// Transport that replays scripted outcomes and records every URL it is asked for.
///
/// Once the script runs out, every further call gets an empty 200 page.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<HttpOutcome>>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new(outcomes: Vec<HttpOutcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str) -> HttpOutcome {
        self.requests.lock().unwrap().push(url.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ok(json!({})))
    }
}

/// Query parameter `name` of a recorded URL.
pub fn param(url: &str, name: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).expect("recorded URL should parse");
    parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub fn ok(body: Value) -> HttpOutcome {
    HttpOutcome::from_response(200, body.to_string())
}

pub fn status(code: i32, body: Value) -> HttpOutcome {
    HttpOutcome::from_response(code, body.to_string())
}

/// A page of `count` web items for `site`, continuing at `next` when given.
pub fn web_page(site: &str, first: usize, count: usize, next: Option<u32>) -> HttpOutcome {
    let items: Vec<Value> = (first..first + count)
        .map(|i| {
            json!({
                "title": format!("Result {i}"),
                "link": format!("https://{site}/page/{i}"),
                "snippet": format!("Snippet {i}"),
                "displayLink": site,
            })
        })
        .collect();
    let mut body = json!({ "items": items });
    if let Some(next) = next {
        body["queries"] = json!({ "nextPage": [{ "startIndex": next }] });
    }
    ok(body)
}

pub fn empty_page() -> HttpOutcome {
    ok(json!({ "searchInformation": { "totalResults": "0" } }))
}

/// Retry policy with millisecond backoff so tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff_ms: 1,
        backoff_multiplier: 2.0,
        max_backoff_ms: 5,
    }
}

pub fn planner(transport: Arc<MockTransport>, retry: RetryPolicy) -> FetchPlanner {
    let config = PlannerConfig {
        endpoint: ENDPOINT.to_string(),
        retry,
        ..PlannerConfig::default()
    };
    FetchPlanner::new(config, FetchClient::new(transport))
}

pub fn credentials() -> Credentials {
    Credentials::new("test-key", "test-cx")
}

pub fn engine(transport: Arc<MockTransport>) -> SearchEngine {
    SearchEngine::new(
        planner(transport, fast_retry(2)),
        Arc::new(StaticCredentials::new(credentials())),
    )
}
