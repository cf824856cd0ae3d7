//! HTTP fetcher against a mock listing endpoint.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use tender_core::config::SourceConfig;
use tender_ingest::{
    ETendersAdapter, FetchError, HttpPageFetcher, PageFetcher, Pipeline, PipelineLimits, RunOutcome,
};
use tender_queue::{LogProducer, RetryPolicy};

const LISTING_PATH: &str = "/Home/PaginatedTenderOpportunities";

fn source(server: &MockServer) -> SourceConfig {
    SourceConfig {
        base_url: format!("{}{LISTING_PATH}", server.uri()),
        page_size: 2,
        max_pages: 10,
        request_timeout_secs: 1,
        date_from: NaiveDate::from_ymd_opt(2025, 10, 1),
        date_to: NaiveDate::from_ymd_opt(2025, 10, 31),
    }
}

fn listing_item(n: u32) -> serde_json::Value {
    json!({
        "id": n,
        "tender_No": format!("RFB {n}/2025"),
        "description": format!("Supply of goods {n}"),
        "date_Published": "2025-10-02T00:00:00",
        "closing_Date": "2025-11-03T11:00:00.000",
        "department": "Health"
    })
}

#[tokio::test]
async fn fetches_page_with_paging_and_window_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "2"))
        .and(query_param("length", "2"))
        .and(query_param("draw", "2"))
        .and(query_param("status", "1"))
        .and(query_param("dateFrom", "2025-10-01"))
        .and(query_param("dateTo", "2025-10-31"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "recordsTotal": 4,
            "data": [listing_item(3), listing_item(4)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(&source(&server)).unwrap();
    let page = fetcher.fetch_page(1, 2).await.unwrap();

    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["recordsTotal"], 4);
}

#[tokio::test]
async fn server_error_is_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(&source(&server)).unwrap();
    let err = fetcher.fetch_page(0, 0).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 500, ref body } if body == "upstream down"));
}

#[tokio::test]
async fn html_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(&source(&server)).unwrap();
    let err = fetcher.fetch_page(0, 0).await.unwrap_err();

    assert!(matches!(err, FetchError::Decode(ref msg) if msg.contains("<html>")));
}

#[tokio::test]
async fn slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(&source(&server)).unwrap();
    let err = fetcher.fetch_page(0, 0).await.unwrap_err();

    assert!(matches!(err, FetchError::Timeout(1000)));
}

#[tokio::test]
async fn dry_run_walks_the_whole_listing() {
    let server = MockServer::start().await;
    for (start, items) in [("0", vec![listing_item(1), listing_item(2)]), ("2", vec![listing_item(3)])] {
        Mock::given(method("GET"))
            .and(path(LISTING_PATH))
            .and(query_param("start", start))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "recordsTotal": 3,
                "recordsFiltered": 3,
                "data": items
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let fetcher = HttpPageFetcher::new(&source(&server)).unwrap();
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(ETendersAdapter),
        Arc::new(LogProducer),
        PipelineLimits {
            batch_size: 10,
            max_pages: 10,
            fetch_budget: Duration::from_secs(30),
            dispatch_budget: Duration::from_secs(30),
        },
        RetryPolicy::default(),
    );

    let summary = pipeline.run().await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.validated, 3);
    assert_eq!(summary.batches_sent, 1);
    assert_eq!(summary.messages_sent, 3);
}

#[tokio::test]
async fn capped_page_length_fetches_every_item() {
    let server = MockServer::start().await;
    for start in [0u32, 5, 10] {
        let items: Vec<serde_json::Value> = (start..start + 5).map(listing_item).collect();
        Mock::given(method("GET"))
            .and(path(LISTING_PATH))
            .and(query_param("start", start.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "recordsTotal": 15,
                "recordsFiltered": 15,
                "data": items
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = SourceConfig {
        page_size: 10,
        ..source(&server)
    };
    let fetcher = HttpPageFetcher::new(&config).unwrap();
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(ETendersAdapter),
        Arc::new(LogProducer),
        PipelineLimits {
            batch_size: 10,
            max_pages: 10,
            fetch_budget: Duration::from_secs(30),
            dispatch_budget: Duration::from_secs(30),
        },
        RetryPolicy::default(),
    );

    let summary = pipeline.run().await;

    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.fetched, 15);
    assert_eq!(summary.validated, 15);
    assert_eq!(summary.messages_sent, 15);
}
