//! Sealer Integration Tests
//!
//! The same chain properties are checked against the in-process sealer
//! and against a remote sealer backed by a mock sealing service (wiremock).

use std::time::Duration;

use evidence_seal::core::{
    empty_root, seal_bundle, verify, ChainBuilder, LocalSealer, RemoteSealer, SealRequest, Sealer,
};
use evidence_seal::domain::EvidenceItem;
use evidence_seal::SealError;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const ROOT_AB: &str = "104d388d9f0b48acaa860ce058d45f18aa3fd5a9ff58f6355d7460bcee5b1684";

/// Sealing service that builds proofs the reference way
struct HonestSealService;

impl Respond for HonestSealService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<SealRequest>(&request.body) else {
            return ResponseTemplate::new(400);
        };

        let mut builder = ChainBuilder::new();
        for entry in &body.items {
            if builder
                .push(&entry.item_id, &entry.content_type, &entry.content)
                .is_err()
            {
                return ResponseTemplate::new(422);
            }
        }
        ResponseTemplate::new(200).set_body_json(builder.finish())
    }
}

/// Sealing service that hashes slightly different content
struct SkewedSealService;

impl Respond for SkewedSealService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: SealRequest = serde_json::from_slice(&request.body).unwrap();

        let mut builder = ChainBuilder::new();
        for entry in &body.items {
            let mut content = entry.content.clone();
            content.insert("skew".to_string(), json!(true));
            builder
                .push(&entry.item_id, &entry.content_type, &content)
                .unwrap();
        }
        ResponseTemplate::new(200).set_body_json(builder.finish())
    }
}

/// Sealing service that drops the last link
struct TruncatingSealService;

impl Respond for TruncatingSealService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: SealRequest = serde_json::from_slice(&request.body).unwrap();

        let mut builder = ChainBuilder::new();
        for entry in body.items.iter().take(body.items.len().saturating_sub(1)) {
            builder
                .push(&entry.item_id, &entry.content_type, &entry.content)
                .unwrap();
        }
        ResponseTemplate::new(200).set_body_json(builder.finish())
    }
}

async fn mock_service<R: Respond + 'static>(responder: R) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/seal"))
        .respond_with(responder)
        .mount(&mock_server)
        .await;
    mock_server
}

fn item(id: &str, value: Value) -> EvidenceItem {
    EvidenceItem::new(id, "suite", "note", value.as_object().cloned().unwrap())
}

fn batch(n: usize) -> Vec<EvidenceItem> {
    (0..n)
        .map(|i| item(&format!("i-{}", i), json!({"i": i, "text": format!("entry {}", i)})))
        .collect()
}

/// Properties every sealer must satisfy
async fn check_sealer(sealer: &dyn Sealer) {
    // Known vector
    let proof = sealer
        .seal(&[item("A", json!({"a": 1})), item("B", json!({"b": 2}))])
        .await
        .unwrap();
    assert_eq!(proof.root_hash().to_hex(), ROOT_AB, "{}", sealer.name());

    // Empty input
    let proof = sealer.seal(&[]).await.unwrap();
    assert!(proof.is_empty());
    assert_eq!(*proof.root_hash(), empty_root());

    // Determinism and order sensitivity
    let items = batch(8);
    let first = sealer.seal(&items).await.unwrap();
    let second = sealer.seal(&items).await.unwrap();
    assert_eq!(first, second);

    let mut reversed = items.clone();
    reversed.reverse();
    let other = sealer.seal(&reversed).await.unwrap();
    assert_ne!(first.root_hash(), other.root_hash());

    // Links are numbered and chained from genesis
    for (i, link) in first.hash_chain().iter().enumerate() {
        assert_eq!(link.sequence(), i as u64);
        assert_eq!(link.item_id(), items[i].id);
        if i == 0 {
            assert!(link.previous_hash().is_genesis());
        } else {
            assert_eq!(link.previous_hash(), first.hash_chain()[i - 1].chain_hash());
        }
    }

    // Bundles from this sealer verify
    let bundle = seal_bundle(sealer, &items, None).await.unwrap();
    assert!(verify(&bundle).is_valid());
}

#[tokio::test]
async fn test_local_sealer_properties() {
    check_sealer(&LocalSealer::new()).await;
    check_sealer(&LocalSealer::with_blocking_threshold(0)).await;
}

#[tokio::test]
async fn test_remote_sealer_properties() {
    let mock_server = mock_service(HonestSealService).await;
    let sealer = RemoteSealer::new(mock_server.uri(), Duration::from_secs(5));
    check_sealer(&sealer).await;
}

#[tokio::test]
async fn test_remote_and_local_agree() {
    let mock_server = mock_service(HonestSealService).await;
    let remote = RemoteSealer::new(mock_server.uri(), Duration::from_secs(5));

    let items = batch(20);
    let local_proof = LocalSealer::new().seal(&items).await.unwrap();
    let remote_proof = remote.seal(&items).await.unwrap();
    assert_eq!(local_proof, remote_proof);
}

#[tokio::test]
async fn test_remote_divergent_proof_rejected() {
    let mock_server = mock_service(SkewedSealService).await;
    let sealer = RemoteSealer::new(mock_server.uri(), Duration::from_secs(5));

    let result = sealer.seal(&batch(3)).await;
    assert!(matches!(result, Err(SealError::SealingUnavailable(_))));
}

#[tokio::test]
async fn test_remote_incomplete_proof_rejected() {
    let mock_server = mock_service(TruncatingSealService).await;
    let sealer = RemoteSealer::new(mock_server.uri(), Duration::from_secs(5));

    let result = sealer.seal(&batch(3)).await;
    assert!(matches!(result, Err(SealError::SealingUnavailable(_))));
}

#[tokio::test]
async fn test_remote_server_error_is_unavailable() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/seal"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let sealer = RemoteSealer::new(mock_server.uri(), Duration::from_secs(5));
    let err = sealer.seal(&batch(1)).await.unwrap_err();
    assert!(matches!(err, SealError::SealingUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_remote_garbage_body_is_unavailable() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/seal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hash": "00"})))
        .mount(&mock_server)
        .await;

    let sealer = RemoteSealer::new(mock_server.uri(), Duration::from_secs(5));
    let result = sealer.seal(&batch(1)).await;
    assert!(matches!(result, Err(SealError::SealingUnavailable(_))));
}

#[tokio::test]
async fn test_uncanonicalizable_content_fails_before_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/seal"))
        .respond_with(HonestSealService)
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut deep = json!("leaf");
    for _ in 0..80 {
        deep = json!({ "child": deep });
    }
    let items = vec![item("ok", json!({"a": 1})), item("deep", json!({ "root": deep }))];

    let remote = RemoteSealer::new(mock_server.uri(), Duration::from_secs(5));
    let local = LocalSealer::new();

    for sealer in [&remote as &dyn Sealer, &local as &dyn Sealer] {
        match sealer.seal(&items).await {
            Err(SealError::Canonicalization { item_id, .. }) => {
                assert_eq!(item_id.as_deref(), Some("deep"));
            }
            other => panic!("expected canonicalization failure, got {:?}", other),
        }
    }
}
