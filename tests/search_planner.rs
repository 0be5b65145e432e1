//! Pagination planning end to end against a scripted transport

mod common;

use common::{
    credentials, empty_page, fast_retry, ok, param, planner, status, web_page, MockTransport,
};
use serde_json::json;
use websearch::search::predicate::translate;
use websearch::search::{
    CancelFlag, HttpOutcome, Operand, Predicate, SearchError, SearchRequest, SearchResult,
};

fn site(domain: &str) -> Predicate {
    Predicate::Equality {
        field: "site".to_string(),
        value: Operand::text(domain),
    }
}

async fn run(
    transport: std::sync::Arc<MockTransport>,
    request: &SearchRequest,
    predicates: Vec<Predicate>,
) -> Result<Vec<SearchResult>, SearchError> {
    let pushdown = translate(request, predicates)?;
    planner(transport, fast_retry(2))
        .run::<SearchResult>(&credentials(), request, &pushdown, &CancelFlag::new())
        .await
}

#[tokio::test]
async fn test_single_mode_follows_next_page() {
    let transport = MockTransport::new(vec![
        web_page("a.com", 0, 10, Some(11)),
        web_page("a.com", 10, 10, Some(21)),
        web_page("a.com", 20, 10, Some(31)),
    ]);
    let request = SearchRequest::new("rust").unwrap().with_limit(25);

    let results = run(transport.clone(), &request, vec![]).await.unwrap();

    assert_eq!(results.len(), 25);
    assert_eq!(results[24].title, "Result 24");
    let starts: Vec<String> = transport
        .requests()
        .iter()
        .map(|u| param(u, "start").unwrap())
        .collect();
    assert_eq!(starts, ["1", "11", "21"]);
}

#[tokio::test]
async fn test_missing_next_page_ends_run() {
    let transport = MockTransport::new(vec![web_page("a.com", 0, 10, None)]);
    let request = SearchRequest::new("rust").unwrap();

    let results = run(transport.clone(), &request, vec![]).await.unwrap();

    assert_eq!(results.len(), 10);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_empty_page_ends_run() {
    let transport = MockTransport::new(vec![web_page("a.com", 0, 10, Some(11)), empty_page()]);
    let request = SearchRequest::new("rust").unwrap();

    let results = run(transport.clone(), &request, vec![]).await.unwrap();

    assert_eq!(results.len(), 10);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_several_sites_share_one_query_within_budget() {
    let transport = MockTransport::new(vec![web_page("a.com", 0, 10, None)]);
    let request = SearchRequest::new("rust").unwrap();

    run(transport.clone(), &request, vec![site("a.com"), site("b.com")])
        .await
        .unwrap();

    let url = &transport.requests()[0];
    assert_eq!(param(url, "q").unwrap(), "rust (site:a.com OR site:b.com)");
    assert_eq!(param(url, "siteSearch"), None);
    assert_eq!(param(url, "key").unwrap(), "test-key");
    assert_eq!(param(url, "cx").unwrap(), "test-cx");
}

#[tokio::test]
async fn test_one_site_uses_site_search() {
    let transport = MockTransport::new(vec![web_page("a.com", 0, 3, None)]);
    let request = SearchRequest::new("rust").unwrap();

    run(transport.clone(), &request, vec![site("A.com")]).await.unwrap();

    let url = &transport.requests()[0];
    assert_eq!(param(url, "q").unwrap(), "rust");
    assert_eq!(param(url, "siteSearch").unwrap(), "a.com");
    assert_eq!(param(url, "siteSearchFilter").unwrap(), "i");
}

#[tokio::test]
async fn test_per_site_round_robin() {
    let transport = MockTransport::new(vec![
        web_page("a.com", 0, 10, Some(11)),
        web_page("b.com", 0, 10, Some(11)),
        web_page("c.com", 0, 5, None),
        web_page("a.com", 10, 10, None),
        web_page("b.com", 10, 10, None),
    ]);
    let request = SearchRequest::new("rust").unwrap().with_limit(150);

    let results = run(
        transport.clone(),
        &request,
        vec![site("a.com"), site("b.com"), site("c.com")],
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 45);
    let requests = transport.requests();
    let visited: Vec<(String, String)> = requests
        .iter()
        .map(|u| (param(u, "siteSearch").unwrap(), param(u, "start").unwrap()))
        .collect();
    assert_eq!(
        visited,
        [
            ("a.com".to_string(), "1".to_string()),
            ("b.com".to_string(), "1".to_string()),
            ("c.com".to_string(), "1".to_string()),
            ("a.com".to_string(), "11".to_string()),
            ("b.com".to_string(), "11".to_string()),
        ]
    );
    for url in &requests {
        assert!(!param(url, "q").unwrap().contains("site:"));
    }
}

#[tokio::test]
async fn test_excluded_sites_on_every_call() {
    let transport = MockTransport::new(vec![
        web_page("a.com", 0, 10, Some(11)),
        web_page("a.com", 10, 10, None),
    ]);
    let request = SearchRequest::new("rust").unwrap();
    let predicates = vec![Predicate::Inequality {
        field: "site".to_string(),
        value: Operand::text("spam.com"),
    }];

    run(transport.clone(), &request, predicates).await.unwrap();

    for url in transport.requests() {
        assert_eq!(param(&url, "q").unwrap(), "rust -site:spam.com");
    }
}

#[tokio::test]
async fn test_error_in_body_fails_run() {
    let transport = MockTransport::new(vec![ok(json!({
        "error": { "code": 403, "message": "Daily Limit Exceeded" }
    }))]);
    let request = SearchRequest::new("rust").unwrap();

    let err = run(transport, &request, vec![]).await.unwrap_err();

    match err {
        SearchError::Api(message) => assert_eq!(message, "Daily Limit Exceeded"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_fails_run() {
    let transport = MockTransport::new(vec![HttpOutcome::from_response(200, "<html>")]);
    let request = SearchRequest::new("rust").unwrap();

    let err = run(transport, &request, vec![]).await.unwrap_err();

    assert!(matches!(err, SearchError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_partial_results_discarded_on_failure() {
    let transport = MockTransport::new(vec![
        web_page("a.com", 0, 10, Some(11)),
        status(401, json!({ "error": { "message": "API key not valid" } })),
    ]);
    let request = SearchRequest::new("rust").unwrap();

    let err = run(transport.clone(), &request, vec![]).await.unwrap_err();

    assert!(matches!(err, SearchError::InvalidApiKey { .. }));
    assert!(err.to_string().contains("API key not valid"));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_status_classification() {
    let transport = MockTransport::new(vec![status(
        403,
        json!({ "error": { "message": "Daily Limit Exceeded" } }),
    )]);
    let request = SearchRequest::new("rust").unwrap();
    let err = run(transport, &request, vec![]).await.unwrap_err();
    match &err {
        SearchError::AccessDenied { detail } => assert_eq!(detail, "Daily Limit Exceeded"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("Daily Limit Exceeded"));

    let transport = MockTransport::new(vec![status(
        400,
        json!({ "error": { "message": "Invalid Value" } }),
    )]);
    let err = run(transport, &request, vec![]).await.unwrap_err();
    match err {
        SearchError::InvalidRequest { detail } => assert_eq!(detail, "Invalid Value"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_exhausted_retries_surface_attempts() {
    let transport = MockTransport::new(vec![
        status(503, json!({})),
        status(503, json!({})),
        status(503, json!({})),
    ]);
    let request = SearchRequest::new("rust").unwrap();

    let err = run(transport.clone(), &request, vec![]).await.unwrap_err();

    match err {
        SearchError::RetriesExhausted {
            status, attempts, ..
        } => {
            assert_eq!(status, 503);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_cancelled_before_first_round() {
    let transport = MockTransport::new(vec![web_page("a.com", 0, 10, None)]);
    let request = SearchRequest::new("rust").unwrap();
    let pushdown = translate(&request, vec![]).unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = planner(transport.clone(), fast_retry(2))
        .run::<SearchResult>(&credentials(), &request, &pushdown, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Cancelled));
    assert_eq!(transport.request_count(), 0);
}
