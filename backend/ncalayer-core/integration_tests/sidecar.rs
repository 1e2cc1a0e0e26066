use crate::agent::{MockAgent, PROBE_METHOD};

use ncalayer_core::sidecar::KmdHttpApi;
use ncalayer_core::{
    Document, NcaLayerClient, NcaLayerError, OneOrMany, SignerParams, SigningParams, Storages,
};

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_bytes, body_json, body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OPERATION_ID: &str = "op-1";

fn api(server: &MockServer) -> KmdHttpApi {
    KmdHttpApi::new(&format!("{}/", server.uri())).expect("valid base URL")
}

async fn mount_operation(server: &MockServer, manifest: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_json(manifest))
        .respond_with(ResponseTemplate::new(200).set_body_string(OPERATION_ID))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_document(server: &MockServer, body: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/{OPERATION_ID}")))
        .and(body_string(body))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

fn documents(bodies: &[&str]) -> OneOrMany<Document> {
    OneOrMany::Many(bodies.iter().map(|body| Document::from(*body)).collect())
}

/// Bodies of the per-document POSTs, in the order the server received them.
async fn document_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|request| request.url.path() == format!("/{OPERATION_ID}"))
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect()
}

// ============================================
// HTTP API OPERATION
// ============================================

/// **VALUE**: Verifies documents are posted one by one and signatures come back in
/// input order, even when an earlier document is slower.
///
/// **WHY THIS MATTERS**: Signatures are matched to documents by position only.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Concurrent per-document POSTs
/// - Collecting results in completion order
/// - A manifest with the wrong count or base64 flag
#[tokio::test]
async fn given_three_documents_when_sign_documents_then_sequential_and_ordered() {
    // GIVEN: An HTTP API where the first document is the slowest to sign
    let server = MockServer::start().await;
    mount_operation(&server, json!({"numberOfDocuments": 3, "base64": true})).await;
    mount_document(
        &server,
        "A",
        ResponseTemplate::new(200)
            .set_body_string("sig-A")
            .set_delay(Duration::from_millis(200)),
        1,
    )
    .await;
    mount_document(&server, "B", ResponseTemplate::new(200).set_body_string("sig-B"), 1).await;
    mount_document(&server, "C", ResponseTemplate::new(200).set_body_string("sig-C"), 1).await;

    // WHEN: Three documents are signed
    let signed = api(&server)
        .sign_documents(&documents(&["A", "B", "C"]), None)
        .await
        .expect("signing should succeed");

    // THEN: Signatures in input order, POSTs issued in input order
    assert_eq!(
        signed,
        OneOrMany::Many(vec![
            "sig-A".to_string(),
            "sig-B".to_string(),
            "sig-C".to_string()
        ])
    );
    assert_eq!(document_bodies(&server).await, vec!["A", "B", "C"]);
}

/// **VALUE**: Verifies the operation id is appended to the base URL verbatim.
///
/// **WHY THIS MATTERS**: The id is opaque. Resolving it as a relative URL turns an id
/// like `op:1` into a scheme and `//host` into another server.
///
/// **BUG THIS CATCHES**: Would catch building the document URL with `Url::join`.
#[tokio::test]
async fn given_operation_id_with_colon_when_sign_documents_then_posted_to_base_plus_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("op:1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/op:1"))
        .and(body_string("A"))
        .respond_with(ResponseTemplate::new(200).set_body_string("sig-A"))
        .expect(1)
        .mount(&server)
        .await;

    let signed = api(&server)
        .sign_documents(&OneOrMany::One(Document::from("A")), None)
        .await
        .expect("signing should succeed");

    assert_eq!(signed, OneOrMany::One("sig-A".to_string()));
}

/// **VALUE**: Verifies ids that look like URL syntax stay under the base URL.
#[test]
fn given_url_like_operation_ids_when_operation_url_then_base_is_kept() {
    let api = KmdHttpApi::new("https://127.0.0.1:24680/api/").expect("valid base URL");

    let colon = api.operation_url("op:1").expect("valid URL");
    let slashes = api.operation_url("//elsewhere/x").expect("valid URL");

    assert_eq!(colon.as_str(), "https://127.0.0.1:24680/api/op:1");
    assert_eq!(slashes.host_str(), Some("127.0.0.1"));
    assert!(slashes.path().starts_with("/api/"), "got {slashes}");
}

/// **VALUE**: Verifies a single binary document posts raw bytes and gets back one
/// base64 signature, unwrapped.
#[tokio::test]
async fn given_single_binary_document_when_sign_documents_then_base64_of_response_bytes() {
    let server = MockServer::start().await;
    mount_operation(
        &server,
        json!({"numberOfDocuments": 1, "base64": false, "encapsulateContent": true}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(format!("/{OPERATION_ID}")))
        .and(body_bytes(vec![0u8, 255, 7]))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xde, 0xad]))
        .expect(1)
        .mount(&server)
        .await;

    let signed = api(&server)
        .sign_documents(&OneOrMany::One(Document::from(vec![0u8, 255, 7])), Some(true))
        .await
        .expect("signing should succeed");

    assert_eq!(signed, OneOrMany::One("3q0=".to_string()));
}

/// **VALUE**: Verifies 409 on the manifest is a cancellation and no document is sent.
///
/// **WHY THIS MATTERS**: The user declined the whole operation on their phone.
#[tokio::test]
async fn given_manifest_rejected_with_409_when_sign_documents_then_cancelled_without_uploads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;
    mount_document(&server, "A", ResponseTemplate::new(200), 0).await;

    let err = api(&server)
        .sign_documents(&documents(&["A", "B"]), None)
        .await
        .expect_err("operation declined");

    assert!(err.is_cancelled_by_user(), "got {err:?}");
}

/// **VALUE**: Verifies 401 on a document cancels the batch and stops further uploads.
///
/// **BUG THIS CATCHES**: Would catch returning a partial result with the signatures
/// collected so far, or continuing with the remaining documents.
#[tokio::test]
async fn given_document_rejected_with_401_when_sign_documents_then_cancelled_without_partial_result()
{
    let server = MockServer::start().await;
    mount_operation(&server, json!({"numberOfDocuments": 3, "base64": true})).await;
    mount_document(&server, "A", ResponseTemplate::new(200).set_body_string("sig-A"), 1).await;
    mount_document(&server, "B", ResponseTemplate::new(401), 1).await;
    mount_document(&server, "C", ResponseTemplate::new(200), 0).await;

    let err = api(&server)
        .sign_documents(&documents(&["A", "B", "C"]), None)
        .await
        .expect_err("second document declined");

    assert!(err.is_cancelled_by_user(), "got {err:?}");
    assert_eq!(document_bodies(&server).await, vec!["A", "B"]);
}

/// **VALUE**: Verifies other HTTP failures keep the numeric status and are not
/// cancellations.
#[tokio::test]
async fn given_server_error_when_sign_documents_then_sidecar_error_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = api(&server)
        .sign_documents(&documents(&["A"]), None)
        .await
        .expect_err("server error");

    assert!(matches!(err, NcaLayerError::Sidecar { .. }), "got {err:?}");
    assert_eq!(err.status_code(), Some(500));
    assert!(!err.is_cancelled_by_user());
    assert!(err.to_string().contains("returned error '500: Internal Server Error'"));
}

#[tokio::test]
async fn given_reachable_and_failing_endpoints_when_probe_then_only_2xx_counts() {
    let up = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&up)
        .await;
    let down = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&down)
        .await;

    assert!(api(&up).probe(Duration::from_secs(1)).await);
    assert!(!api(&down).probe(Duration::from_secs(1)).await);
}

// ============================================
// TRANSPORT SELECTION
// ============================================

/// **VALUE**: Verifies a reachable HTTP API takes over CMS signing from plain NCALayer.
///
/// **WHY THIS MATTERS**: Users with KAZTOKEN mobile/desktop next to NCALayer get
/// multi-document signing without switching agents.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The probe result being ignored (batch refused as unsupported)
/// - The batch also being sent over the WebSocket
/// - Signing starting before the probe has finished
#[tokio::test]
async fn given_reachable_http_api_when_sign_cms_batch_then_signed_over_http() {
    // GIVEN: Plain NCALayer plus a reachable HTTP API
    let agent = MockAgent::plain().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    mount_operation(
        &server,
        json!({"numberOfDocuments": 2, "base64": true, "encapsulateContent": false}),
    )
    .await;
    mount_document(&server, "QQ==", ResponseTemplate::new(200).set_body_string("sig-1"), 1).await;
    mount_document(&server, "Qg==", ResponseTemplate::new(200).set_body_string("sig-2"), 1).await;

    let client =
        NcaLayerClient::new(agent.config_with_sidecar(&server.uri())).expect("valid config");
    client.connect().await.expect("connect should succeed");

    // WHEN: A batch is signed with detached content
    let signing_params = SigningParams {
        encapsulate: Some(false),
        ..SigningParams::cms_default()
    };
    let signed = client
        .sign_cms(
            &Storages::all(),
            OneOrMany::Many(vec![Document::from("QQ=="), Document::from("Qg==")]),
            &signing_params,
            &SignerParams::any(),
            None,
        )
        .await
        .expect("signing should succeed");

    // THEN: HTTP API signed it; the agent only ever saw the probe
    assert_eq!(
        signed,
        OneOrMany::Many(vec!["sig-1".to_string(), "sig-2".to_string()])
    );
    let capabilities = client.capabilities();
    assert!(capabilities.kmd_http_api);
    assert!(capabilities.multisign);
    assert!(!capabilities.enhanced_agent);
    assert_eq!(agent.methods(), vec![PROBE_METHOD.to_string()]);
}

/// **VALUE**: Verifies an unreachable HTTP API plus plain NCALayer refuses a batch
/// without a single signing request on either transport.
#[tokio::test]
async fn given_unreachable_http_api_when_sign_cms_batch_then_no_signing_requests() {
    let agent = MockAgent::plain().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client =
        NcaLayerClient::new(agent.config_with_sidecar(&server.uri())).expect("valid config");
    client.connect().await.expect("connect should succeed");

    let err = client
        .sign_cms(
            &Storages::all(),
            OneOrMany::Many(vec![Document::from("QQ=="), Document::from("Qg==")]),
            &SigningParams::cms_default(),
            &SignerParams::any(),
            None,
        )
        .await
        .expect_err("batch must be refused");

    assert!(matches!(err, NcaLayerError::Capability { .. }), "got {err:?}");
    assert_eq!(agent.methods(), vec![PROBE_METHOD.to_string()]);
}

/// **VALUE**: Verifies a disallowed HTTP API is never probed nor used.
#[tokio::test]
async fn given_http_api_disallowed_when_sign_cms_then_agent_signs_and_api_untouched() {
    let agent = MockAgent::plain().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = ncalayer_core::ClientConfig {
        allow_kmd_http_api: false,
        ..agent.config_with_sidecar(&server.uri())
    };
    let client = NcaLayerClient::new(config).expect("valid config");
    client.connect().await.expect("connect should succeed");

    let signed = client
        .sign_cms(
            &Storages::all(),
            OneOrMany::One(Document::from("QQ==")),
            &SigningParams::cms_default(),
            &SignerParams::any(),
            None,
        )
        .await
        .expect("signing should succeed");

    assert_eq!(signed, OneOrMany::One("sig:QQ==".to_string()));
    assert!(!client.capabilities().kmd_http_api);
}
