// Unit tests for error module
// Tests JSON serialization (used by --json) and mapping of core errors

use crate::error::NcaSignError;

use ncalayer_core::NcaLayerError;
use ncalayer_core::error::ConfigError;

use common::{ErrorLocation, HttpStatusCode};

/// **VALUE**: Tests that errors serialise with a type tag for `--json` output.
///
/// **WHY THIS MATTERS**: Scripts wrapping `ncasign --json` branch on the `type` field.
///
/// **BUG THIS CATCHES**: Would catch removing `#[derive(Serialize)]` or changing the
/// tag layout.
#[test]
fn given_ncasign_error_when_serialized_then_tagged_json() {
    // GIVEN: An NcaSignError
    let err = NcaSignError::Output {
        message: String::from("disk full"),
        location: ErrorLocation::caller(),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_value(&err).expect("Error should be serializable");

    // THEN: Tagged with the variant name, data carries the message
    assert_eq!(json["type"], "Output");
    assert_eq!(json["data"]["message"], "disk full");
}

/// **VALUE**: Verifies a core cancellation maps to the quiet Cancelled variant.
///
/// **WHY THIS MATTERS**: `main` exits without an error message on cancellation; any
/// other mapping would print "Signing Error" for a deliberate user choice.
#[test]
fn given_core_cancellation_when_converted_then_cancelled() {
    let err = NcaSignError::from(NcaLayerError::cancelled());

    assert!(err.is_cancelled_by_user());
}

/// **VALUE**: Verifies other core errors keep their category, text and HTTP status.
#[test]
fn given_core_sidecar_error_when_converted_then_signing_with_status() {
    let err = NcaSignError::from(NcaLayerError::sidecar_status(
        HttpStatusCode(503),
        "Service Unavailable",
    ));

    assert!(!err.is_cancelled_by_user());
    match err {
        NcaSignError::Signing {
            category,
            message,
            status_code,
            ..
        } => {
            assert_eq!(category, "sidecar");
            assert!(message.contains("503: Service Unavailable"));
            assert_eq!(status_code, Some(503));
        }
        other => panic!("expected Signing error, got {other:?}"),
    }
}

#[test]
fn given_config_error_when_converted_then_config_variant() {
    let err = NcaSignError::from(ConfigError::validation("default_locale cannot be empty"));

    assert!(matches!(err, NcaSignError::Config { .. }));
    assert!(err.to_string().contains("default_locale cannot be empty"));
}
