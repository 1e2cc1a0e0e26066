use crate::agent::{
    GREETING, Greeting, MockAgent, PROBE_METHOD, Reply, SIGN_METHOD, plain_ncalayer,
    wrapped_cancelled,
};

use ncalayer_core::{
    Document, NcaLayerClient, NcaLayerError, OneOrMany, SignerParams, SigningParams, Storages,
};

use serde_json::{Value, json};

async fn connected(agent: &MockAgent) -> NcaLayerClient {
    let client = NcaLayerClient::new(agent.config()).expect("valid config");
    client.connect().await.expect("connect should succeed");
    client
}

fn last_sign_args(agent: &MockAgent) -> Value {
    agent
        .received()
        .into_iter()
        .rev()
        .find(|request| crate::agent::method_of(request) == SIGN_METHOD)
        .map(|request| request["args"].clone())
        .expect("a sign request was sent")
}

/// **VALUE**: Verifies a single binary document is base64-encoded, signed as CMS and
/// returned unwrapped.
///
/// **WHY THIS MATTERS**: This is the everyday flow: one PDF, one signature.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Raw bytes reaching a text-only transport
/// - The single result being wrapped in an array
/// - Missing default locale or storages
#[tokio::test]
async fn given_single_binary_document_when_sign_cms_then_single_signature() {
    // GIVEN: A connection to plain NCALayer
    let agent = MockAgent::plain().await;
    let client = connected(&agent).await;

    // WHEN: One binary document is signed
    let signed = client
        .sign_cms(
            &Storages::all(),
            OneOrMany::One(Document::from(vec![1u8, 2, 3])),
            &SigningParams::cms_default(),
            &SignerParams::any(),
            None,
        )
        .await
        .expect("signing should succeed");

    // THEN: One signature back, and the request carried the encoded payload
    assert_eq!(signed, OneOrMany::One("sig:AQID".to_string()));
    assert_eq!(
        last_sign_args(&agent),
        json!({
            "allowedStorages": null,
            "format": "cms",
            "data": "AQID",
            "signingParams": {},
            "signerParams": {"extKeyUsageOids": []},
            "locale": "ru"
        })
    );
}

/// **VALUE**: Verifies a batch on KAZTOKEN mobile/desktop goes out as one array and
/// comes back in input order.
#[tokio::test]
async fn given_batch_on_enhanced_agent_when_sign_cms_then_signatures_in_order() {
    let agent = MockAgent::kaztoken().await;
    let client = connected(&agent).await;

    let signed = client
        .sign_cms(
            &Storages::Only(vec!["PKCS12".to_string()]),
            OneOrMany::Many(vec![
                Document::from("QQ=="),
                Document::from(b"B".to_vec()),
                Document::from("Qw=="),
            ]),
            &SigningParams::cms_default(),
            &SignerParams::any(),
            Some("kk"),
        )
        .await
        .expect("signing should succeed");

    assert_eq!(
        signed,
        OneOrMany::Many(vec![
            "sig:QQ==".to_string(),
            "sig:Qg==".to_string(),
            "sig:Qw==".to_string()
        ])
    );
    let args = last_sign_args(&agent);
    assert_eq!(args["data"], json!(["QQ==", "Qg==", "Qw=="]));
    assert_eq!(args["allowedStorages"], json!(["PKCS12"]));
    assert_eq!(args["locale"], "kk");
}

/// **VALUE**: Verifies a batch on plain NCALayer is refused before anything is sent.
///
/// **WHY THIS MATTERS**: Plain NCALayer would sign only the first document and the
/// caller would never notice the rest were skipped.
///
/// **BUG THIS CATCHES**: Would catch the capability check running after transmission.
#[tokio::test]
async fn given_batch_on_plain_agent_when_sign_cms_then_capability_error_and_nothing_sent() {
    // GIVEN: Plain NCALayer, no HTTP API
    let agent = MockAgent::plain().await;
    let client = connected(&agent).await;

    // WHEN: A batch is signed
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

    // THEN: Capability error pointing at KAZTOKEN, only the probe went out
    assert!(matches!(err, NcaLayerError::Capability { .. }), "got {err:?}");
    assert!(err.to_string().contains("KAZTOKEN mobile/desktop instead of NCALayer"));
    assert_eq!(agent.methods(), vec![PROBE_METHOD.to_string()]);
}

#[tokio::test]
async fn given_empty_batch_when_sign_cms_then_validation_error() {
    let agent = MockAgent::kaztoken().await;
    let client = connected(&agent).await;

    let err = client
        .sign_cms(
            &Storages::all(),
            OneOrMany::Many(Vec::new()),
            &SigningParams::cms_default(),
            &SignerParams::any(),
            None,
        )
        .await
        .expect_err("empty batch");

    assert!(matches!(err, NcaLayerError::Validation { .. }), "got {err:?}");
    assert_eq!(agent.methods(), vec![PROBE_METHOD.to_string()]);
}

/// **VALUE**: Verifies XML signing sends the xml format and returns the signed XML.
#[tokio::test]
async fn given_xml_document_when_sign_xml_then_xml_format_requested() {
    let agent = MockAgent::plain().await;
    let client = connected(&agent).await;

    let signed = client
        .sign_xml(
            &Storages::all(),
            OneOrMany::One("<doc/>".to_string()),
            &SigningParams::default(),
            &SignerParams::any(),
            None,
        )
        .await
        .expect("signing should succeed");

    assert_eq!(signed, OneOrMany::One("sig:<doc/>".to_string()));
    let args = last_sign_args(&agent);
    assert_eq!(args["format"], "xml");
    assert_eq!(args["data"], "<doc/>");
}

/// **VALUE**: Verifies the user closing the signing dialog surfaces as a cancellation.
#[tokio::test]
async fn given_user_cancels_dialog_when_sign_cms_then_cancelled_by_user() {
    let agent = MockAgent::start(Greeting::Frame(GREETING.to_string()), |request: &Value| {
        match crate::agent::method_of(request).as_str() {
            SIGN_METHOD => Reply::Frame(wrapped_cancelled()),
            _ => plain_ncalayer(request),
        }
    })
    .await;
    let client = connected(&agent).await;

    let err = client
        .sign_cms(
            &Storages::all(),
            OneOrMany::One(Document::from("QQ==")),
            &SigningParams::cms_default(),
            &SignerParams::any(),
            None,
        )
        .await
        .expect_err("user cancelled");

    assert!(err.is_cancelled_by_user(), "got {err:?}");
}
