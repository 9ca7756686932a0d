//! Transport Integration Tests
//!
//! File sink against a temp directory; API and webhook sinks against
//! wiremock.

use std::collections::BTreeMap;

use evidence_seal::core::{seal_local, verify_json};
use evidence_seal::domain::{EvidenceBundle, EvidenceItem};
use evidence_seal::transport::signature::{self, SIGNATURE_HEADER};
use evidence_seal::transport::{ApiSink, BundleSink, FileSink, WebhookSink};
use evidence_seal::SealError;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bundle() -> EvidenceBundle {
    let items = vec![
        EvidenceItem::new("t-1", "tickets", "ticket", json!({"title": "Rotate keys"}).as_object().cloned().unwrap()),
        EvidenceItem::new("t-2", "tickets", "ticket", json!({"title": "Review access"}).as_object().cloned().unwrap()),
    ];
    seal_local(&items, Some(json!({"connector_type": "tickets"}).as_object().cloned().unwrap())).unwrap()
}

#[tokio::test]
async fn test_file_sink_writes_named_bundle() {
    let temp = TempDir::new().unwrap();
    let sink = FileSink::new(temp.path().join("nested").join("bundles"));
    let bundle = bundle();

    let delivery = sink.deliver(&bundle).await.unwrap();
    let expected = sink.dir().join(format!("bundle-{}.json", bundle.bundle_id()));
    assert_eq!(delivery.location, expected.display().to_string());

    let content = std::fs::read_to_string(&expected).unwrap();
    assert!(content.contains('\n'), "bundle should be pretty-printed");
    assert!(verify_json(content.as_bytes()).is_valid());

    let decoded: EvidenceBundle = serde_json::from_str(&content).unwrap();
    assert_eq!(decoded, bundle);
}

#[tokio::test]
async fn test_api_sink_posts_with_bearer() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bundles"))
        .and(header("authorization", "Bearer k-test"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = ApiSink::new(mock_server.uri(), "k-test");
    let bundle = bundle();
    let delivery = sink.deliver(&bundle).await.unwrap();

    assert_eq!(delivery.sink, "api");
    assert_eq!(delivery.response, Some(json!({"accepted": true})));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(verify_json(&requests[0].body).is_valid());
}

#[tokio::test]
async fn test_api_sink_non_success_is_transport_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bundles"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&mock_server)
        .await;

    let sink = ApiSink::new(mock_server.uri(), "wrong");
    match sink.deliver(&bundle()).await {
        Err(SealError::Transport(message)) => assert!(message.contains("401")),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_webhook_signature_matches_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("x-tenant", "acme"))
        .and(header_exists("x-signature-256"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = WebhookSink::new(format!("{}/hook", mock_server.uri()))
        .with_headers(BTreeMap::from([("X-Tenant".to_string(), "acme".to_string())]))
        .with_secret("topsecret");

    let delivery = sink.deliver(&bundle()).await.unwrap();
    assert_eq!(delivery.sink, "webhook");
    assert_eq!(delivery.response, None);

    let requests = mock_server.received_requests().await.unwrap();
    let request = &requests[0];
    let received = request
        .headers
        .get(SIGNATURE_HEADER)
        .unwrap()
        .to_str()
        .unwrap();

    assert!(signature::verify(b"topsecret", &request.body, received));
    assert!(!signature::verify(b"other", &request.body, received));
    assert!(verify_json(&request.body).is_valid());
}

#[tokio::test]
async fn test_unsigned_webhook_has_no_signature() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let sink = WebhookSink::new(mock_server.uri());
    sink.deliver(&bundle()).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get(SIGNATURE_HEADER).is_none());
}

#[tokio::test]
async fn test_webhook_server_error_is_retryable() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let err = WebhookSink::new(mock_server.uri())
        .deliver(&bundle())
        .await
        .unwrap_err();
    assert!(matches!(err, SealError::Transport(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_signature_vector() {
    assert_eq!(
        signature::sign(b"topsecret", br#"{"hello":"world"}"#).unwrap(),
        "sha256=afd00617ceb8f63e65ea5c310f06bf78c3901e7a713db532e25da26ad63c7236"
    );
}
