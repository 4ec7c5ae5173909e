mod support;

use chrono::NaiveDate;
use estate_verify::api::{project_activity, ActivityKind, QueueBrowser, QueueFilter, QueueScope};
use estate_verify::models::{VerificationStatus, Visibility};
use estate_verify::ClientError;
use serde_json::{json, Value};
use std::time::Duration;
use support::{client, failure, paged_envelope, property_json};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUEUE: &str = "/admin/properties/verification-queue";

fn douala_fixture() -> Vec<Value> {
    (1..=45)
        .map(|i| property_json(&format!("p-{i}"), "YELLOW", "PUBLIC", "2026-01-01T10:00:00Z"))
        .collect()
}

fn page_of(all: &[Value], page: usize, page_size: usize) -> Vec<Value> {
    all.iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect()
}

#[tokio::test]
async fn douala_queue_reports_three_pages_of_twenty() {
    let server = MockServer::start().await;
    let fixture = douala_fixture();

    Mock::given(method("GET"))
        .and(path(QUEUE))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "20"))
        .and(query_param("city", "Douala"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(paged_envelope(page_of(&fixture, 1, 20), 45, 1, 20)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let filter = QueueFilter::new().with_city(Some("Douala".to_string()));
    let page = client(&server)
        .verification_queue(&filter)
        .await
        .expect("queue page");

    assert_eq!(page.meta.total, 45);
    assert_eq!(page.meta.total_pages, 3);
    assert_eq!(page.items.len(), 20);
    assert!(page.meta.is_consistent());
    assert!(page.meta.count <= page.meta.page_size);
}

#[tokio::test]
async fn identical_filters_issue_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(paged_envelope(page_of(&douala_fixture(), 1, 20), 45, 1, 20))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let f1 = QueueFilter::new()
        .with_city(Some("Douala".to_string()))
        .with_country(Some("Cameroon".to_string()));
    let f2: QueueFilter = serde_json::from_value(json!({
        "country": "Cameroon",
        "page_size": 20,
        "city": "Douala",
        "page": 1
    }))
    .unwrap();

    let api = client(&server);
    let (a, b) = tokio::join!(api.verification_queue(&f1), api.verification_queue(&f2));
    assert_eq!(a.expect("first"), b.expect("second"));

    // still fresh: served without another request
    api.verification_queue(&f1).await.expect("cached");
}

#[tokio::test]
async fn concurrent_failure_is_shared_then_retry_is_a_new_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(failure("Database unavailable"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let api = client(&server);
    let filter = QueueFilter::new();
    let (a, b) = tokio::join!(api.verification_queue(&filter), api.verification_queue(&filter));
    assert!(matches!(a, Err(ClientError::Server { status: Some(500), .. })));
    assert!(matches!(b, Err(ClientError::Server { status: Some(500), .. })));

    // user-triggered retry
    assert!(api.verification_queue(&filter).await.is_err());
}

#[tokio::test]
async fn queue_variant_never_sends_status_or_visibility() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE))
        .and(query_param_is_missing("verification_status"))
        .and(query_param_is_missing("visibility"))
        .and(query_param("date_from", "2026-01-01"))
        .and(query_param("date_to", "2026-01-31"))
        .and(query_param("agent_id", "agent-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paged_envelope(vec![], 0, 1, 20)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/properties"))
        .and(query_param("verification_status", "GREEN"))
        .and(query_param("visibility", "PRIVATE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paged_envelope(
            vec![property_json("p-1", "GREEN", "PRIVATE", "2026-01-03T10:00:00Z")],
            1,
            1,
            20,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let filter = QueueFilter::new()
        .with_agent(Some("agent-1".to_string()))
        .with_date_range(
            NaiveDate::from_ymd_opt(2026, 1, 1),
            NaiveDate::from_ymd_opt(2026, 1, 31),
        )
        .with_status(Some(VerificationStatus::Green))
        .with_visibility(Some(Visibility::Private));

    let api = client(&server);
    let pending = api.query(QueueScope::Pending, &filter).await.expect("queue");
    assert!(pending.items.is_empty());

    let all = api.query(QueueScope::All, &filter).await.expect("all properties");
    assert_eq!(all.items[0].visibility, Visibility::Private);
}

#[tokio::test]
async fn short_page_does_not_end_paging() {
    let server = MockServer::start().await;

    // backend returns fewer items than page_size but reports more pages
    Mock::given(method("GET"))
        .and(path(QUEUE))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "OK",
            "data": [property_json("p-1", "YELLOW", "PUBLIC", "2026-01-01T10:00:00Z")],
            "meta": {"count": 1, "total": 45, "page": 1, "page_size": 20, "total_pages": 3},
            "error": null
        })))
        .mount(&server)
        .await;

    let mut browser = QueueBrowser::new(client(&server), QueueScope::Pending);
    browser.apply(QueueFilter::new()).await.expect("first page");
    assert!(browser.has_next());
}

#[tokio::test]
async fn browser_pages_keep_predicates_and_new_filters_restart_at_one() {
    let server = MockServer::start().await;
    let fixture = douala_fixture();

    for page in 1..=3u64 {
        Mock::given(method("GET"))
            .and(path(QUEUE))
            .and(query_param("city", "Douala"))
            .and(query_param_is_missing("country"))
            .and(query_param("page", page.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(paged_envelope(
                page_of(&fixture, page as usize, 20),
                45,
                page,
                20,
            )))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(QUEUE))
        .and(query_param("city", "Douala"))
        .and(query_param("country", "Cameroon"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paged_envelope(
            page_of(&fixture, 1, 20),
            45,
            1,
            20,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut browser = QueueBrowser::new(client(&server), QueueScope::Pending);
    browser
        .apply(QueueFilter::new().with_city(Some("Douala".to_string())))
        .await
        .expect("page 1");

    let second = browser.next_page().await.expect("page 2");
    assert_eq!(second.meta.page, 2);
    assert_eq!(browser.filter().city(), Some("Douala"));

    let third = browser.next_page().await.expect("page 3");
    assert_eq!(third.items.len(), 5);
    assert!(!browser.has_next());

    let refined = browser
        .filter()
        .clone()
        .with_country(Some("Cameroon".to_string()));
    browser.apply(refined).await.expect("refined");
    assert_eq!(browser.filter().page(), 1);
    assert_eq!(browser.filter().city(), Some("Douala"));
}

#[tokio::test]
async fn failed_page_load_keeps_the_browser_where_it_was() {
    let server = MockServer::start().await;
    let fixture = douala_fixture();

    Mock::given(method("GET"))
        .and(path(QUEUE))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(paged_envelope(page_of(&fixture, 1, 20), 45, 1, 20)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUEUE))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(failure("Database unavailable")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUEUE))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(paged_envelope(page_of(&fixture, 2, 20), 45, 2, 20)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUEUE))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut browser = QueueBrowser::new(client(&server), QueueScope::Pending);
    browser.apply(QueueFilter::new()).await.expect("page 1");

    assert!(browser.next_page().await.is_err());
    assert_eq!(browser.filter().page(), 1);
    assert_eq!(browser.meta().map(|m| m.page), Some(1));
    assert!(browser.has_next());

    let retried = browser.next_page().await.expect("page 2 on retry");
    assert_eq!(retried.meta.page, 2);
    assert_eq!(browser.filter().page(), 2);
}

#[tokio::test]
async fn missing_pagination_metadata_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "OK",
            "data": [],
            "error": null
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .verification_queue(&QueueFilter::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
}

#[tokio::test]
async fn activity_feed_survives_a_failing_agent_source() {
    let server = MockServer::start().await;

    let mut approved = property_json("p-1", "GREEN", "PUBLIC", "2026-01-04T10:00:00Z");
    approved["title"] = json!("Lakeside Cabin");

    Mock::given(method("GET"))
        .and(path("/admin/properties"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paged_envelope(
            vec![approved],
            1,
            1,
            10,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/agents"))
        .respond_with(ResponseTemplate::new(500).set_body_json(failure("boom")))
        .mount(&server)
        .await;

    let api = client(&server);
    let feed = project_activity(&api, 10).await;

    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].kind, ActivityKind::PropertyApproved);
    assert_eq!(feed[0].description, "\"Lakeside Cabin\" was approved");
    assert_eq!(feed[1].kind, ActivityKind::PropertySubmitted);
}

#[tokio::test]
async fn activity_feed_is_empty_when_backend_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = client(&server);
    assert!(project_activity(&api, 10).await.is_empty());
}
