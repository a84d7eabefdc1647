use chrono::{TimeZone, Utc};
use flate2::read::GzDecoder;
use loges_forwarder::buffer::{Batch, BatchBuffer, BatchConfig, BulkEntry, FlushTrigger};
use loges_forwarder::reliability::RetryConfig;
use loges_forwarder::sender::{
    BulkClient, BulkSerializer, ClientConfig, IndexError, Indexer, resolve_endpoints,
};
use serde_json::{Value, json};
use std::io::Read;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entry(message: &str) -> BulkEntry {
    BulkEntry {
        index: "logstash-2024.05.01".to_string(),
        event_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        source: json!({ "@message": message }).to_string(),
    }
}

fn client_for(address: &str, config: ClientConfig) -> BulkClient {
    let endpoints = resolve_endpoints(address, None).unwrap();
    BulkClient::new(&endpoints, config, BulkSerializer::default()).unwrap()
}

fn ok_body() -> Value {
    json!({ "took": 2, "errors": false, "items": [] })
}

#[tokio::test]
async fn test_bulk_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(header("content-type", "application/x-ndjson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), ClientConfig::default());
    let batch = Batch::new(vec![entry("first"), entry("second")], FlushTrigger::Manual);
    let report = client.accept(&batch).await.unwrap();

    assert_eq!(report.status_code, 200);
    assert_eq!(report.documents, 2);
    assert_eq!(report.failed_items, 0);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    let lines = body.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4);

    let action: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(action["index"]["_index"], "logstash-2024.05.01");
    assert_eq!(action["index"]["_type"], "logspout");
    assert_eq!(action["index"]["_ttl"], "90d");
    assert_eq!(action["index"]["_timestamp"], "2024-05-01T12:00:00+00:00");

    let first: Value = serde_json::from_str(lines[1]).unwrap();
    let second: Value = serde_json::from_str(lines[3]).unwrap();
    assert_eq!(first["@message"], "first");
    assert_eq!(second["@message"], "second");
}

#[tokio::test]
async fn test_compressed_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(header("content-encoding", "gzip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        enable_compression: true,
        ..ClientConfig::default()
    };
    let client = client_for(&server.uri(), config);
    let batch = Batch::new(vec![entry("zipped")], FlushTrigger::Manual);
    client.accept(&batch).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let mut body = String::new();
    GzDecoder::new(&requests[0].body[..])
        .read_to_string(&mut body)
        .unwrap();
    assert!(body.contains(r#""@message":"zipped""#));
}

#[tokio::test]
async fn test_item_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 5,
            "errors": true,
            "items": [
                { "index": { "_index": "logstash-2024.05.01", "status": 201 } },
                { "index": { "_index": "logstash-2024.05.01", "status": 400,
                             "error": { "type": "mapper_parsing_exception" } } }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), ClientConfig::default());
    let batch = Batch::new(vec![entry("a"), entry("b")], FlushTrigger::Manual);
    let report = client.accept(&batch).await.unwrap();
    assert_eq!(report.failed_items, 1);
}

#[tokio::test]
async fn test_error_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), ClientConfig::default());
    let batch = Batch::new(vec![entry("a")], FlushTrigger::Manual);

    let err = client.accept(&batch).await.unwrap_err();
    assert!(matches!(err, IndexError::Status { status: 503, .. }));
    assert!(err.is_retryable());

    let err = client.accept(&batch).await.unwrap_err();
    assert!(matches!(
        err,
        IndexError::Status { status: 400, ref body } if body == "bad request"
    ));
    assert!(!err.is_retryable());

    let stats = client.connection_stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.failed_requests, 2);
}

#[tokio::test]
async fn test_retry_moves_to_next_endpoint() {
    let failing = MockServer::start().await;
    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&failing)
        .await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&healthy)
        .await;

    let address = format!("{}+{}", failing.address(), healthy.address());
    let client = client_for(&address, ClientConfig::default());
    let retry = RetryConfig {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        max_elapsed: Duration::from_secs(5),
        jitter: false,
    };
    let buffer = BatchBuffer::start(client, BatchConfig::default(), retry);

    buffer.add(entry("failover"));
    let stats = buffer.close().await;

    assert_eq!(stats.retries, 1);
    assert_eq!(stats.documents_delivered, 1);
    assert_eq!(stats.documents_dropped, 0);
}
