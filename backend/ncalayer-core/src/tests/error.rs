use crate::error::NcaLayerError;

use common::HttpStatusCode;

/// **VALUE**: Verifies errors display their category, message and source location.
///
/// **WHY THIS MATTERS**: The location in the log line is what lets a developer find
/// the failing call site from a user's bug report.
#[test]
fn given_error_when_displayed_then_includes_location() {
    let err = NcaLayerError::not_connected();

    let text = err.to_string();

    assert!(text.starts_with("Not Connected Error: "), "unexpected display: {text}");
    assert!(text.contains("error.rs:"), "location missing: {text}");
}

/// **VALUE**: Verifies only cancellations carry the cancelled-by-user flag.
///
/// **BUG THIS CATCHES**: Would catch a peer or sidecar failure being hidden from the
/// user as if they had cancelled.
#[test]
fn given_errors_when_checked_then_only_cancelled_is_flagged() {
    assert!(NcaLayerError::cancelled().is_cancelled_by_user());

    for err in [
        NcaLayerError::peer("500", "boom", None),
        NcaLayerError::sidecar_status(HttpStatusCode::CONFLICT, "Conflict"),
        NcaLayerError::connection_closed(),
        NcaLayerError::validation("empty"),
    ] {
        assert!(!err.is_cancelled_by_user(), "{err} must not be a cancellation");
    }
}

/// **VALUE**: Verifies transport errors carry the install remediation and the cause.
#[test]
fn given_transport_error_when_displayed_then_remediation_and_cause() {
    let text = NcaLayerError::transport("Connection refused").to_string();

    assert!(text.contains("https://ncl.pki.gov.kz/"), "remediation missing: {text}");
    assert!(text.contains("(Connection refused)"), "cause missing: {text}");
}

/// **VALUE**: Verifies the capability wording depends on which agent is connected.
#[test]
fn given_multisign_unavailable_when_displayed_then_wording_matches_agent() {
    let plain = NcaLayerError::multisign_unavailable(false).to_string();
    let enhanced = NcaLayerError::multisign_unavailable(true).to_string();

    assert!(plain.contains("available when using KAZTOKEN mobile/desktop instead of NCALayer"));
    assert!(enhanced.contains("multi-document signing is unavailable"));
}

#[test]
fn given_sidecar_errors_when_inspected_then_status_code_exposed() {
    let status = NcaLayerError::sidecar_status(HttpStatusCode(500), "Internal Server Error");
    let comms = NcaLayerError::sidecar_communication("connection refused");

    assert_eq!(status.status_code(), Some(500));
    assert!(
        status
            .to_string()
            .contains("KAZTOKEN mobile/desktop returned error '500: Internal Server Error'")
    );
    assert_eq!(comms.status_code(), None);
    assert!(comms.to_string().contains("failed to communicate with KAZTOKEN mobile/desktop"));
    assert_eq!(comms.error_category(), "sidecar");
}
