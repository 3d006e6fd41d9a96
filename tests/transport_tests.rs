//! HTTP transports against a local mock server.
//!
//! The transports use a blocking client, so every call runs on the blocking
//! pool while the mock server lives on the async runtime.

#![cfg(feature = "delivery")]

use reliabill::core::*;
use reliabill::delivery::{
    DeliveryConfig, FallbackTransport, HEADER_DOCUMENT_TYPE_ID, HEADER_PROCESS_ID,
    HEADER_RECIPIENT, HEADER_SENDER, OutboundDocument, StructuredAuth, StructuredTransport,
    Transport,
};
use reliabill::documents::{PEPPOL_INVOICE_DOCUMENT_TYPE_ID, PEPPOL_PROFILE_ID};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

fn document(recipient: Option<NetworkAddress>) -> OutboundDocument {
    OutboundDocument {
        invoice_id: Uuid::new_v4(),
        number: "2025-0001".into(),
        xml: b"<Invoice/>".to_vec(),
        recipient,
        sender: Some(NetworkAddress::new("0208", "0123456789")),
    }
}

fn config() -> DeliveryConfig {
    DeliveryConfig::new(std::env::temp_dir())
}

// --- fallback ---

#[tokio::test(flavor = "multi_thread")]
async fn fallback_posts_xml_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("content-type", "application/xml"))
        .and(header("authorization", "Bearer relay-key"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"messageId": "relay-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config().with_fallback(format!("{}/", server.uri()), Some("relay-key".into()));
    let receipt = blocking(move || {
        let transport = FallbackTransport::new(&config).unwrap();
        assert!(!transport.is_stub());
        transport.send(&document(None))
    })
    .await
    .unwrap();

    assert_eq!(receipt.message_id, "relay-1");
    assert!(!receipt.delivered);
}

#[tokio::test(flavor = "multi_thread")]
async fn fallback_accepts_plain_text_ids_and_polls_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(201).set_body_string("relay-42\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/messages/relay-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "delivered"})))
        .mount(&server)
        .await;

    let config = config().with_fallback(server.uri(), None);
    let (receipt, status) = blocking(move || {
        let transport = FallbackTransport::new(&config).unwrap();
        let receipt = transport.send(&document(None)).unwrap();
        let status = transport.status(&receipt.message_id).unwrap();
        (receipt, status)
    })
    .await;

    assert_eq!(receipt.message_id, "relay-42");
    assert_eq!(status, DeliveryStatus::Delivered);
}

#[tokio::test(flavor = "multi_thread")]
async fn fallback_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let config = config().with_fallback(server.uri(), None);
    let err = blocking(move || FallbackTransport::new(&config).unwrap().send(&document(None)))
        .await
        .unwrap_err();

    match err {
        InvoicingError::Transport {
            channel,
            status,
            body,
        } => {
            assert_eq!(channel, Channel::Fallback);
            assert_eq!(status, 502);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn fallback_without_message_id_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queued": true})))
        .mount(&server)
        .await;

    let config = config().with_fallback(server.uri(), None);
    let err = blocking(move || FallbackTransport::new(&config).unwrap().send(&document(None)))
        .await
        .unwrap_err();
    assert!(matches!(err, InvoicingError::Http(_)));
}

// --- structured ---

#[tokio::test(flavor = "multi_thread")]
async fn structured_send_sets_routing_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoices/outgoing/ubl"))
        .and(header("authorization", "Bearer ap-key"))
        .and(header(HEADER_RECIPIENT, "0208:0987654321"))
        .and(header(HEADER_SENDER, "0208:0123456789"))
        .and(header(HEADER_PROCESS_ID, PEPPOL_PROFILE_ID))
        .and(header_exists(HEADER_DOCUMENT_TYPE_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uuid": "ap-7",
            "peppolMessage": {"success": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config().with_structured(server.uri(), StructuredAuth::ApiKey("ap-key".into()));
    let receipt = blocking(move || {
        StructuredTransport::new(&config)
            .unwrap()
            .send(&document(Some(NetworkAddress::new("0208", "0987654321"))))
    })
    .await
    .unwrap();

    assert_eq!(receipt.message_id, "ap-7");
    assert!(receipt.delivered);
    assert!(PEPPOL_INVOICE_DOCUMENT_TYPE_ID.contains("Invoice-2::Invoice"));
}

#[tokio::test(flavor = "multi_thread")]
async fn structured_login_is_cached_and_renewed_after_401() {
    let server = MockServer::start().await;
    let credentials = json!({"email": "ops@acme.example", "password": "s3cret"});

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(&credentials))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "stale"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh", "expires_in": 3600})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/invoices/outgoing/ubl"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/invoices/outgoing/ubl"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messageId": "ap-9"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/ap-9"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SEND_FAILED"})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = StructuredAuth::Login {
        auth_url: format!("{}/auth", server.uri()),
        email: "ops@acme.example".into(),
        password: "s3cret".into(),
    };
    let config = config().with_structured(server.uri(), auth);
    let (receipt, status) = blocking(move || {
        let transport = StructuredTransport::new(&config).unwrap();
        let receipt = transport
            .send(&document(Some(NetworkAddress::new("0208", "0987654321"))))
            .unwrap();
        // Served from the cache: no third login.
        let status = transport.status(&receipt.message_id).unwrap();
        (receipt, status)
    })
    .await;

    assert_eq!(receipt.message_id, "ap-9");
    assert!(!receipt.delivered);
    assert_eq!(status, DeliveryStatus::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn structured_api_key_is_not_retried_on_401() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoices/outgoing/ubl"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&server)
        .await;

    let config = config().with_structured(server.uri(), StructuredAuth::ApiKey("nope".into()));
    let err = blocking(move || {
        StructuredTransport::new(&config)
            .unwrap()
            .send(&document(Some(NetworkAddress::new("0208", "0987654321"))))
    })
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        InvoicingError::Transport {
            channel: Channel::Structured,
            status: 401,
            ..
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn structured_status_from_success_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/invoices/ap-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"peppolMessage": {"success": true}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/ap-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"peppolMessage": {}})))
        .mount(&server)
        .await;

    let config = config().with_structured(server.uri(), StructuredAuth::ApiKey("k".into()));
    let statuses = blocking(move || {
        let transport = StructuredTransport::new(&config).unwrap();
        (
            transport.status("ap-1").unwrap(),
            transport.status("ap-2").unwrap(),
        )
    })
    .await;

    assert_eq!(statuses, (DeliveryStatus::Delivered, DeliveryStatus::Sent));
}
