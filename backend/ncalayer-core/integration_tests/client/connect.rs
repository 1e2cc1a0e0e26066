use crate::agent::{GREETING, Greeting, MockAgent, PROBE_METHOD, Reply, plain_ncalayer};

use ncalayer_core::{NcaLayerClient, NcaLayerError, ProbeOutcome};

use serde_json::Value;

/// **VALUE**: Verifies `connect` resolves with the version from the agent's greeting.
///
/// **WHY THIS MATTERS**: This is the first thing every signing flow does. If the
/// greeting is not read correctly no document can be signed.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Waiting for a request/response before the agent has spoken
/// - Returning the raw greeting instead of `result.version`
/// - The greeting frame being lost because the reader started too early
#[tokio::test]
async fn given_agent_greets_with_version_when_connect_then_resolves_with_version() {
    // GIVEN: A plain NCALayer agent
    let agent = MockAgent::plain().await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");

    // WHEN: Client connects
    let version = client.connect().await.expect("connect should succeed");

    // THEN: Version is the greeting's, and the connection is usable
    assert_eq!(version, "1.3.2");
    assert!(client.is_connected());
}

/// **VALUE**: Verifies a greeting without `result.version` fails the connection.
///
/// **BUG THIS CATCHES**: Would catch a client that reports Ready to a peer that is
/// not speaking the NCALayer protocol.
#[tokio::test]
async fn given_greeting_without_version_when_connect_then_handshake_error() {
    // GIVEN: An agent whose greeting has no version
    let agent = MockAgent::start(
        Greeting::Frame(r#"{"result":{}}"#.to_string()),
        plain_ncalayer,
    )
    .await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");

    // WHEN: Client connects
    let err = client.connect().await.expect_err("connect should fail");

    // THEN: Handshake error, and the client stays unusable
    assert!(matches!(err, NcaLayerError::Handshake { .. }), "got {err:?}");
    assert!(!client.is_connected());
    assert!(agent.methods().is_empty(), "no request may follow a failed handshake");
}

/// **VALUE**: Verifies a peer that hangs up before greeting yields ConnectionClosed.
#[tokio::test]
async fn given_agent_closes_before_greeting_when_connect_then_connection_closed() {
    let agent = MockAgent::start(Greeting::Close, plain_ncalayer).await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");

    let err = client.connect().await.expect_err("connect should fail");

    assert!(
        matches!(
            err,
            NcaLayerError::ConnectionClosed { .. } | NcaLayerError::Transport { .. }
        ),
        "got {err:?}"
    );
}

/// **VALUE**: Verifies an unreachable agent produces the install remediation.
///
/// **WHY THIS MATTERS**: By far the most common failure in the field is NCALayer
/// not running. The message must tell the user what to install and where.
#[tokio::test]
async fn given_no_agent_listening_when_connect_then_transport_error_with_remediation() {
    // GIVEN: A port with nothing listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let config = ncalayer_core::ClientConfig {
        ncalayer_url: format!("ws://127.0.0.1:{port}"),
        allow_kmd_http_api: false,
        ..ncalayer_core::ClientConfig::default()
    };
    let client = NcaLayerClient::new(config).expect("valid config");

    // WHEN: Client connects
    let err = client.connect().await.expect_err("connect should fail");

    // THEN: Transport error pointing at the NCALayer download page
    assert!(matches!(err, NcaLayerError::Transport { .. }), "got {err:?}");
    assert!(err.to_string().contains("https://ncl.pki.gov.kz/"));
}

/// **VALUE**: Verifies a client connects at most once.
///
/// **WHY THIS MATTERS**: A second socket to the same agent would race the first for
/// responses that carry no request id.
///
/// **BUG THIS CATCHES**: Would catch `connect` silently opening a second socket or
/// tearing down the working one.
#[tokio::test]
async fn given_connected_client_when_connect_again_then_already_connected() {
    // GIVEN: A connected client
    let agent = MockAgent::plain().await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");
    client.connect().await.expect("first connect should succeed");

    // WHEN: connect is called again
    let err = client.connect().await.expect_err("second connect should fail");

    // THEN: Refused, no new socket, first connection still works
    assert!(matches!(err, NcaLayerError::AlreadyConnected { .. }), "got {err:?}");
    assert_eq!(agent.connections(), 1);
    assert!(client.is_connected());
}

/// **VALUE**: Verifies a failed connect also cannot be retried on the same client.
#[tokio::test]
async fn given_failed_connect_when_connect_again_then_already_connected() {
    let agent = MockAgent::start(
        Greeting::Frame(r#"{"result":{"version":""}}"#.to_string()),
        plain_ncalayer,
    )
    .await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");
    client.connect().await.expect_err("first connect should fail");

    let err = client.connect().await.expect_err("second connect should fail");

    assert!(matches!(err, NcaLayerError::AlreadyConnected { .. }), "got {err:?}");
}

/// **VALUE**: Verifies KAZTOKEN mobile/desktop is detected through the extension probe.
///
/// **WHY THIS MATTERS**: Multi-document signing is only offered when the probe succeeds.
#[tokio::test]
async fn given_enhanced_agent_when_connect_then_enhanced_and_multisign_flags_set() {
    // GIVEN: An agent that answers the extension module
    let agent = MockAgent::kaztoken().await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");

    // WHEN: Client connects
    client.connect().await.expect("connect should succeed");

    // THEN: Probe was sent and both flags are set
    let capabilities = client.capabilities();
    assert!(capabilities.enhanced_agent);
    assert!(capabilities.multisign);
    assert!(!capabilities.kmd_http_api);
    assert_eq!(client.probe_outcome(), Some(ProbeOutcome::Supported));
    assert_eq!(agent.methods(), vec![PROBE_METHOD.to_string()]);
}

/// **VALUE**: Verifies a rejected probe leaves every flag false and connect succeeds.
///
/// **BUG THIS CATCHES**: Would catch the probe's rejection failing `connect`, which
/// would make plain NCALayer unusable.
#[tokio::test]
async fn given_plain_agent_when_connect_then_probe_unsupported_and_flags_clear() {
    let agent = MockAgent::plain().await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");

    client.connect().await.expect("connect should succeed");

    let capabilities = client.capabilities();
    assert!(!capabilities.enhanced_agent);
    assert!(!capabilities.multisign);
    assert!(matches!(
        client.probe_outcome(),
        Some(ProbeOutcome::Unsupported { .. })
    ));
}

/// **VALUE**: Verifies the socket dying during the probe is told apart from a rejection.
///
/// **WHY THIS MATTERS**: Reporting "plain NCALayer" when the agent actually went away
/// hides the real problem until the first signing attempt.
#[tokio::test]
async fn given_agent_closes_during_probe_when_connect_then_transport_lost() {
    // GIVEN: An agent that hangs up when probed
    let agent = MockAgent::start(Greeting::Frame(GREETING.to_string()), |request: &Value| {
        match crate::agent::method_of(request).as_str() {
            PROBE_METHOD => Reply::Close,
            _ => plain_ncalayer(request),
        }
    })
    .await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");

    // WHEN: Client connects
    let version = client.connect().await.expect("connect still resolves");

    // THEN: Outcome records the lost transport, and later requests fail fast
    assert_eq!(version, "1.3.2");
    assert!(matches!(
        client.probe_outcome(),
        Some(ProbeOutcome::TransportLost { .. })
    ));
    assert!(!client.capabilities().multisign);
    assert!(!client.is_connected());

    let err = client
        .send_request(&ncalayer_core::protocol::Request::extension_version())
        .await
        .expect_err("connection is gone");
    assert!(
        matches!(
            err,
            NcaLayerError::ConnectionClosed { .. } | NcaLayerError::Transport { .. }
        ),
        "got {err:?}"
    );
}

/// **VALUE**: Verifies observers see the raw greeting, probe request and probe answer.
#[tokio::test]
async fn given_observers_when_connect_then_raw_frames_observed() {
    use std::sync::{Arc, Mutex};

    let agent = MockAgent::plain().await;
    let requests = Arc::new(Mutex::new(Vec::new()));
    let responses = Arc::new(Mutex::new(Vec::new()));

    let client = {
        let requests = Arc::clone(&requests);
        let responses = Arc::clone(&responses);
        NcaLayerClient::new(agent.config())
            .expect("valid config")
            .with_request_observer(move |json| requests.lock().expect("lock").push(json.to_string()))
            .with_response_observer(move |text| {
                responses.lock().expect("lock").push(text.to_string())
            })
    };

    client.connect().await.expect("connect should succeed");

    let requests = requests.lock().expect("lock").clone();
    let responses = responses.lock().expect("lock").clone();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("getVersion"));
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0], GREETING);
}
