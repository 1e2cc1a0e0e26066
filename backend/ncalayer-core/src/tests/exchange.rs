// Unit tests for the single response slot
// Tests settle-once delivery, in-flight refusal and connection termination

use crate::client::exchange::{ExchangeSlot, Inbound};
use crate::error::NcaLayerError;

/// **VALUE**: Verifies a frame delivered to a waiting exchange reaches it unchanged.
#[tokio::test]
async fn given_waiting_exchange_when_frame_delivered_then_exchange_receives_it() {
    let slot = ExchangeSlot::new();
    let pending = slot.open().expect("slot should be free");

    assert!(slot.deliver("frame".to_string()));

    assert_eq!(pending.wait().await, Inbound::Frame("frame".to_string()));
}

/// **VALUE**: Verifies a second exchange is refused while the first one waits.
///
/// **WHY THIS MATTERS**: Frames carry no request id. Two waiters would make the
/// pairing of responses to requests a guess.
///
/// **BUG THIS CATCHES**: Would catch the second exchange replacing the first, which
/// leaves the first caller hanging forever.
#[tokio::test]
async fn given_waiting_exchange_when_second_opened_then_request_in_flight() {
    let slot = ExchangeSlot::new();
    let first = slot.open().expect("slot should be free");

    let err = slot.open().err().expect("second exchange should be refused");
    assert!(matches!(err, NcaLayerError::RequestInFlight { .. }));

    // The first exchange is still the one that gets the frame.
    assert!(slot.deliver("first".to_string()));
    assert_eq!(first.wait().await, Inbound::Frame("first".to_string()));

    // And the slot is free again afterwards.
    assert!(slot.open().is_ok());
}

/// **VALUE**: Verifies frames with nobody waiting are discarded and not replayed
/// to the next exchange.
///
/// **BUG THIS CATCHES**: Would catch a late duplicate frame being handed to the next
/// request as its answer.
#[tokio::test]
async fn given_no_waiter_when_frame_delivered_then_discarded() {
    let slot = ExchangeSlot::new();

    assert!(!slot.deliver("stray".to_string()));

    let pending = slot.open().expect("slot should be free");
    assert!(slot.deliver("fresh".to_string()));
    assert_eq!(pending.wait().await, Inbound::Frame("fresh".to_string()));
}

/// **VALUE**: Verifies an exchange is settled at most once.
#[tokio::test]
async fn given_settled_exchange_when_terminated_then_first_outcome_wins() {
    let slot = ExchangeSlot::new();
    let pending = slot.open().expect("slot should be free");

    assert!(slot.deliver("answer".to_string()));
    slot.terminate(Inbound::Closed);

    assert_eq!(pending.wait().await, Inbound::Frame("answer".to_string()));
}

/// **VALUE**: Verifies closing the connection settles the waiter and refuses later exchanges.
///
/// **WHY THIS MATTERS**: Without this a request issued after the agent exits would
/// wait forever instead of failing.
#[tokio::test]
async fn given_waiting_exchange_when_connection_closes_then_waiter_and_later_requests_fail() {
    let slot = ExchangeSlot::new();
    let pending = slot.open().expect("slot should be free");

    slot.terminate(Inbound::Closed);

    let outcome = pending.wait().await.into_frame();
    assert!(matches!(outcome, Err(NcaLayerError::ConnectionClosed { .. })));
    assert!(slot.is_terminated());

    let err = slot.open().err().expect("slot is terminated");
    assert!(matches!(err, NcaLayerError::ConnectionClosed { .. }));
    assert!(!slot.deliver("late".to_string()));
}

/// **BUG THIS CATCHES**: Would catch a socket error being reported as a clean close.
#[test]
fn given_transport_failure_when_slot_opened_then_transport_error() {
    let slot = ExchangeSlot::new();

    slot.terminate(Inbound::Failed("connection reset".to_string()));

    match slot.open().err() {
        Some(NcaLayerError::Transport { cause, .. }) => assert_eq!(cause, "connection reset"),
        other => panic!("expected Transport error, got {other:?}"),
    }
}

/// **VALUE**: Verifies an abandoned exchange keeps the slot until its answer arrives.
///
/// **WHY THIS MATTERS**: Frames carry no request id. The answer to a request whose
/// caller gave up is still on its way and must not become the next request's answer.
///
/// **BUG THIS CATCHES**: Would catch a caller that timed out on document A handing
/// A's signature to the request for document B.
#[tokio::test]
async fn given_dropped_exchange_when_late_answer_arrives_then_discarded_and_slot_freed() {
    let slot = ExchangeSlot::new();
    drop(slot.open().expect("slot should be free"));

    let err = slot.open().err().expect("late answer still pending");
    assert!(matches!(err, NcaLayerError::RequestInFlight { .. }));
    let err = slot.open().err().expect("late answer still pending");
    assert!(matches!(err, NcaLayerError::RequestInFlight { .. }));

    assert!(!slot.deliver("answer-to-abandoned".to_string()));

    let pending = slot.open().expect("slot free once the late answer is gone");
    assert!(slot.deliver("fresh".to_string()));
    assert_eq!(pending.wait().await, Inbound::Frame("fresh".to_string()));
}

/// **VALUE**: Verifies a late answer that arrives before the next request is
/// swallowed and leaves the slot free.
#[tokio::test]
async fn given_dropped_exchange_when_answer_arrives_first_then_next_exchange_gets_own_frame() {
    let slot = ExchangeSlot::new();
    drop(slot.open().expect("slot should be free"));

    assert!(!slot.deliver("answer-to-abandoned".to_string()));

    let pending = slot.open().expect("slot should be free");
    assert!(slot.deliver("fresh".to_string()));
    assert_eq!(pending.wait().await, Inbound::Frame("fresh".to_string()));
}

/// **VALUE**: Verifies closing the connection ends an abandoned exchange too.
#[test]
fn given_abandoned_exchange_when_connection_closes_then_slot_terminated() {
    let slot = ExchangeSlot::new();
    drop(slot.open().expect("slot should be free"));
    assert!(slot.open().is_err());

    slot.terminate(Inbound::Closed);

    assert!(slot.is_terminated());
    let err = slot.open().err().expect("slot is terminated");
    assert!(matches!(err, NcaLayerError::ConnectionClosed { .. }));
}
