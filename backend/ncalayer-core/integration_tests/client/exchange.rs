use crate::agent::{
    GREETING, Greeting, MockAgent, PROBE_METHOD, Reply, flat_error, flat_result, plain_ncalayer,
    wrapped_cancelled, wrapped_error, wrapped_result,
};

use ncalayer_core::protocol::Request;
use ncalayer_core::{NcaLayerClient, NcaLayerError};

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

const ECHO_MODULE: &str = "test.echo";

/// Agent that rejects the probe and answers `test.echo.<method>` with a canned frame.
async fn scripted_agent(reply: impl Fn(&str) -> Reply + Send + 'static) -> MockAgent {
    MockAgent::start(Greeting::Frame(GREETING.to_string()), move |request: &Value| {
        if request["module"] == ECHO_MODULE {
            reply(request["method"].as_str().unwrap_or_default())
        } else {
            plain_ncalayer(request)
        }
    })
    .await
}

async fn connected(agent: &MockAgent) -> NcaLayerClient {
    let client = NcaLayerClient::new(agent.config()).expect("valid config");
    client.connect().await.expect("connect should succeed");
    client
}

fn echo(method: &str) -> Request {
    Request::new(ECHO_MODULE, method, Some(json!({"n": 1})))
}

/// **VALUE**: Verifies requests before `connect` fail immediately.
///
/// **BUG THIS CATCHES**: Would catch a request waiting forever on a socket that
/// does not exist.
#[tokio::test]
async fn given_unconnected_client_when_send_request_then_not_connected() {
    let agent = MockAgent::plain().await;
    let client = NcaLayerClient::new(agent.config()).expect("valid config");

    let err = client
        .send_request(&echo("anything"))
        .await
        .expect_err("client is not connected");

    assert!(matches!(err, NcaLayerError::NotConnected { .. }), "got {err:?}");
    assert_eq!(agent.connections(), 0);
}

/// **VALUE**: Verifies both success shapes resolve with their payload.
#[tokio::test]
async fn given_success_frames_when_send_request_then_payload_returned() {
    // GIVEN: An agent answering in the wrapped shape for "wrapped", flat otherwise
    let agent = scripted_agent(|method| match method {
        "wrapped" => Reply::Frame(wrapped_result(json!({"certificate": "MIIB"}))),
        _ => Reply::Frame(flat_result(json!("responseObject"))),
    })
    .await;
    let client = connected(&agent).await;

    // WHEN: Both methods are called in turn
    let wrapped = client.send_request(&echo("wrapped")).await.expect("wrapped");
    let flat = client.send_request(&echo("flat")).await.expect("flat");

    // THEN: Each resolves with its own payload, sent with the request's args
    assert_eq!(wrapped, json!({"certificate": "MIIB"}));
    assert_eq!(flat, json!("responseObject"));
    let last = agent.received().pop().expect("requests recorded");
    assert_eq!(last, json!({"module": ECHO_MODULE, "method": "flat", "args": {"n": 1}}));
}

/// **VALUE**: Verifies peer failures in either shape reject with the peer's fields.
#[tokio::test]
async fn given_failure_frames_when_send_request_then_peer_errors() {
    let agent = scripted_agent(|method| match method {
        "wrapped" => Reply::Frame(wrapped_error("EKEY", "Wrong password", Some("attempt 2"))),
        _ => Reply::Frame(flat_error("500", "Internal error")),
    })
    .await;
    let client = connected(&agent).await;

    let wrapped = client.send_request(&echo("wrapped")).await.expect_err("wrapped");
    let flat = client.send_request(&echo("flat")).await.expect_err("flat");

    assert!(
        wrapped.to_string().contains("EKEY: Wrong password (attempt 2)"),
        "got {wrapped}"
    );
    assert!(flat.to_string().contains("500: Internal error"), "got {flat}");
    assert!(!wrapped.is_cancelled_by_user());
    assert!(!flat.is_cancelled_by_user());
}

/// **VALUE**: Verifies a closed signing dialog surfaces as a cancellation.
///
/// **WHY THIS MATTERS**: Web flows hide the error banner when the user cancels;
/// showing "signing failed" for a deliberate cancel generates support tickets.
#[tokio::test]
async fn given_cancelled_dialog_when_send_request_then_cancelled_by_user() {
    let agent = scripted_agent(|_| Reply::Frame(wrapped_cancelled())).await;
    let client = connected(&agent).await;

    let err = client.send_request(&echo("sign")).await.expect_err("cancelled");

    assert!(err.is_cancelled_by_user(), "got {err:?}");
}

/// **VALUE**: Verifies a second request while one is outstanding is refused and the
/// first still gets its own answer.
///
/// **WHY THIS MATTERS**: NCALayer frames carry no request id. Letting two requests
/// wait would pair responses with requests by luck.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The second request replacing the first waiter (first hangs forever)
/// - The second request being transmitted anyway
#[tokio::test]
async fn given_outstanding_request_when_second_sent_then_request_in_flight() {
    // GIVEN: An agent that never answers "slow"
    let agent = scripted_agent(|method| match method {
        "slow" => Reply::Silent,
        _ => Reply::Frame(wrapped_result(json!("fast"))),
    })
    .await;
    let client = Arc::new(connected(&agent).await);

    let first = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.send_request(&echo("slow")).await })
    };
    // Wait until the agent has the first request.
    for _ in 0..100 {
        if agent.methods().iter().any(|m| m.ends_with(".slow")) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // WHEN: A second request is issued
    let err = client
        .send_request(&echo("fast"))
        .await
        .expect_err("second request must be refused");

    // THEN: Refused without being sent; the first is still pending
    assert!(matches!(err, NcaLayerError::RequestInFlight { .. }), "got {err:?}");
    assert!(!agent.methods().iter().any(|m| m.ends_with(".fast")));
    assert!(!first.is_finished());
    first.abort();
}

/// **VALUE**: Verifies the late answer to a request whose caller gave up never
/// becomes the answer to the next request.
///
/// **WHY THIS MATTERS**: Frames carry no request id. A caller that wraps a sign call
/// in a timeout and then signs another document would otherwise receive the first
/// document's signature.
///
/// **BUG THIS CATCHES**: Would catch a dropped waiter freeing the slot while its
/// answer is still on the wire.
#[tokio::test]
async fn given_timed_out_request_when_next_request_sent_then_never_gets_late_answer() {
    // GIVEN: An agent that answers "signA" slowly and "signB" at once
    let agent = scripted_agent(|method| match method {
        "signA" => Reply::Delayed(
            Duration::from_millis(300),
            wrapped_result(json!("signature-of-A")),
        ),
        _ => Reply::Frame(wrapped_result(json!("signature-of-B"))),
    })
    .await;
    let client = connected(&agent).await;

    // WHEN: The caller gives up on A and immediately asks for B
    let timed_out =
        tokio::time::timeout(Duration::from_millis(100), client.send_request(&echo("signA")))
            .await;
    assert!(timed_out.is_err(), "A should still be pending");

    let err = client
        .send_request(&echo("signB"))
        .await
        .expect_err("A's answer is still outstanding");

    // THEN: B is refused without being sent
    assert!(matches!(err, NcaLayerError::RequestInFlight { .. }), "got {err:?}");
    assert!(!agent.methods().iter().any(|m| m.ends_with(".signB")));

    // AND: Once A's answer has come and gone, B gets its own signature
    tokio::time::sleep(Duration::from_millis(400)).await;
    let b = client.send_request(&echo("signB")).await.expect("B succeeds");
    assert_eq!(b, json!("signature-of-B"));
}

/// **VALUE**: Verifies an outstanding request fails when the agent hangs up.
#[tokio::test]
async fn given_outstanding_request_when_agent_closes_then_connection_closed() {
    let agent = scripted_agent(|_| Reply::Close).await;
    let client = connected(&agent).await;

    let err = client.send_request(&echo("sign")).await.expect_err("socket closed");

    assert!(
        matches!(
            err,
            NcaLayerError::ConnectionClosed { .. } | NcaLayerError::Transport { .. }
        ),
        "got {err:?}"
    );
    assert!(!client.is_connected());
}

/// **VALUE**: Verifies a duplicate frame with nobody waiting is dropped rather than
/// answering the next request.
#[tokio::test]
async fn given_duplicate_frame_when_next_request_sent_then_gets_own_response() {
    let agent = scripted_agent(|method| match method {
        "first" => Reply::Frames(vec![
            wrapped_result(json!("first")),
            wrapped_result(json!("duplicate")),
        ]),
        _ => Reply::Frame(wrapped_result(json!("second"))),
    })
    .await;
    let client = connected(&agent).await;

    let first = client.send_request(&echo("first")).await.expect("first");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = client.send_request(&echo("second")).await.expect("second");

    assert_eq!(first, json!("first"));
    assert_eq!(second, json!("second"));
}

/// **VALUE**: Verifies an undecodable frame fails only its own request.
#[tokio::test]
async fn given_garbage_frame_when_send_request_then_decode_error_and_connection_usable() {
    let agent = scripted_agent(|method| match method {
        "garbage" => Reply::Frame("<html>".to_string()),
        _ => Reply::Frame(wrapped_result(json!("ok"))),
    })
    .await;
    let client = connected(&agent).await;

    let err = client.send_request(&echo("garbage")).await.expect_err("garbage");
    let ok = client.send_request(&echo("fine")).await.expect("fine");

    assert!(matches!(err, NcaLayerError::Decode { .. }), "got {err:?}");
    assert_eq!(ok, json!("ok"));
    assert_eq!(
        agent.methods().first().map(String::as_str),
        Some(PROBE_METHOD)
    );
}
