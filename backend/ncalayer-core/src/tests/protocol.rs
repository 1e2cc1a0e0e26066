// Unit tests for the protocol module
// Tests frame shape detection, result folding and the version handshake

use crate::document::OneOrMany;
use crate::error::NcaLayerError;
use crate::params::{SignFormat, SignerParams, SigningParams, Storages};
use crate::protocol::{Request, SignArgs, WireResponse, decode_handshake, decode_response};

use serde_json::json;

// ============================================
// HANDSHAKE
// ============================================

/// **VALUE**: Verifies the agent version is taken from `result.version` of the greeting.
///
/// **WHY THIS MATTERS**: `connect` resolves with exactly this string; callers log it
/// and use it to decide whether the installed agent is recent enough.
///
/// **BUG THIS CATCHES**: Would catch reading the wrong JSON path or returning the
/// whole frame instead of the version.
#[test]
fn given_greeting_with_version_when_decode_handshake_then_returns_version() {
    let version = decode_handshake(r#"{"result":{"version":"1.4.0"}}"#)
        .expect("greeting with version should decode");

    assert_eq!(version, "1.4.0");
}

/// **VALUE**: Verifies every greeting without a usable version is a handshake error.
///
/// **WHY THIS MATTERS**: A connection whose greeting cannot be understood is not an
/// NCALayer connection; it must never reach the Ready state.
///
/// **BUG THIS CATCHES**: Would catch treating an empty string or a number as a version,
/// or panicking on non-JSON input.
#[test]
fn given_greeting_without_usable_version_when_decode_handshake_then_handshake_error() {
    let frames = [
        r#"{"result":{}}"#,
        r#"{"result":{"version":""}}"#,
        r#"{"result":{"version":14}}"#,
        r#"{"status":true}"#,
        "not json at all",
    ];

    for frame in frames {
        let err = decode_handshake(frame).expect_err("greeting should be rejected");
        assert!(
            matches!(err, NcaLayerError::Handshake { .. }),
            "expected Handshake error for {frame}, got {err:?}"
        );
    }
}

// ============================================
// RESPONSE SHAPES
// ============================================

/// **VALUE**: Verifies the wrapped shape resolves with `body.result`.
///
/// **WHY THIS MATTERS**: This is how a completed `sign` call returns its signatures.
///
/// **BUG THIS CATCHES**: Would catch returning the body object instead of its `result`.
#[test]
fn given_wrapped_success_with_result_when_decoded_then_returns_result() {
    let result = decode_response(r#"{"status":true,"body":{"result":["c2lnMQ==","c2lnMg=="]}}"#)
        .expect("wrapped success should resolve");

    assert_eq!(result, json!(["c2lnMQ==", "c2lnMg=="]));
}

/// **VALUE**: Verifies a wrapped success without a result means the user cancelled.
///
/// **WHY THIS MATTERS**: NCALayer reports a closed dialog as `status: true` with an
/// empty body. Callers rely on the cancelled flag to stay quiet instead of showing an error.
///
/// **BUG THIS CATCHES**: Would catch resolving with `null` (a silent "success" with
/// no signature) or reporting a generic error.
#[test]
fn given_wrapped_success_without_result_when_decoded_then_cancelled_by_user() {
    for frame in [r#"{"status":true,"body":{}}"#, r#"{"status":true}"#] {
        let err = decode_response(frame).expect_err("missing result should reject");
        assert!(err.is_cancelled_by_user(), "expected cancellation for {frame}");
    }
}

/// **VALUE**: Verifies a present-but-null result still counts as a result.
///
/// **BUG THIS CATCHES**: Would catch conflating "key absent" with "value null".
#[test]
fn given_wrapped_success_with_null_result_when_decoded_then_resolves_null() {
    let result = decode_response(r#"{"status":true,"body":{"result":null}}"#)
        .expect("explicit null result should resolve");

    assert!(result.is_null());
}

/// **VALUE**: Verifies a wrapped failure keeps code, message and details apart.
///
/// **WHY THIS MATTERS**: Support staff need the peer's code and details verbatim to
/// diagnose token and certificate problems.
///
/// **BUG THIS CATCHES**: Would catch dropping the details or marking the failure as a
/// cancellation.
#[test]
fn given_wrapped_failure_when_decoded_then_peer_error_with_details() {
    let err = decode_response(
        r#"{"status":false,"code":"500","message":"Token not found","details":"slot 0 empty"}"#,
    )
    .expect_err("status false should reject");

    match &err {
        NcaLayerError::Peer {
            code,
            message,
            details,
            ..
        } => {
            assert_eq!(code, "500");
            assert_eq!(message, "Token not found");
            assert_eq!(details.as_deref(), Some("slot 0 empty"));
        }
        other => panic!("expected Peer error, got {other:?}"),
    }
    assert!(!err.is_cancelled_by_user());
    assert!(err.to_string().contains("500: Token not found (slot 0 empty)"));
}

/// **VALUE**: Verifies a wrapped failure with no code renders the code as "unknown"
/// and omits the details parentheses.
#[test]
fn given_wrapped_failure_without_code_when_decoded_then_code_unknown() {
    let err = decode_response(r#"{"status":false,"message":"boom","details":null}"#)
        .expect_err("status false should reject");

    let text = err.to_string();
    assert!(text.contains("unknown: boom"), "unexpected display: {text}");
    assert!(!text.contains('('), "null details must not render: {text}");
}

/// **VALUE**: Verifies the flat shape resolves with `responseObject` on code "200".
#[test]
fn given_flat_success_when_decoded_then_returns_response_object() {
    let result = decode_response(r#"{"code":"200","responseObject":"c2lnbmF0dXJl"}"#)
        .expect("flat 200 should resolve");

    assert_eq!(result, json!("c2lnbmF0dXJl"));
}

/// **VALUE**: Verifies any other flat code is a peer error carrying code and message.
///
/// **WHY THIS MATTERS**: Plain NCALayer answers unknown modules this way; the
/// extension probe depends on it rejecting rather than resolving.
///
/// **BUG THIS CATCHES**: Would catch treating numeric 200 or "500" as success.
#[test]
fn given_flat_non_success_code_when_decoded_then_peer_error() {
    let err = decode_response(r#"{"code":"500","message":"Module not found"}"#)
        .expect_err("flat 500 should reject");

    match err {
        NcaLayerError::Peer {
            code,
            message,
            details,
            ..
        } => {
            assert_eq!(code, "500");
            assert_eq!(message, "Module not found");
            assert_eq!(details, None);
        }
        other => panic!("expected Peer error, got {other:?}"),
    }

    let numeric = decode_response(r#"{"code":200,"responseObject":"x"}"#)
        .expect_err("numeric code is not the success marker");
    assert!(matches!(numeric, NcaLayerError::Peer { .. }));
}

/// **VALUE**: Verifies frames that match neither shape are decode errors.
///
/// **BUG THIS CATCHES**: Would catch a stray frame being mistaken for a successful
/// response with an empty result.
#[test]
fn given_unrecognised_frame_when_decoded_then_decode_error() {
    for frame in [r#"{"result":"x"}"#, r#"["status"]"#, "{truncated"] {
        let err = decode_response(frame).expect_err("frame should be rejected");
        assert!(
            matches!(err, NcaLayerError::Decode { .. }),
            "expected Decode error for {frame}, got {err:?}"
        );
    }
}

/// **VALUE**: Verifies shape detection prefers `status` when both keys exist.
#[test]
fn given_frame_with_status_and_code_when_parsed_then_wrapped_shape() {
    let frame = WireResponse::parse(r#"{"status":true,"code":"500","body":{"result":1}}"#)
        .expect("frame should parse");

    assert!(matches!(frame, WireResponse::Wrapped(_)));
    assert_eq!(frame.into_result().expect("wrapped success"), json!(1));
}

// ============================================
// REQUESTS
// ============================================

/// **VALUE**: Verifies the probe request has no `args` key at all.
#[test]
fn given_extension_probe_when_serialized_then_module_method_only() {
    let json: serde_json::Value = serde_json::from_str(
        &Request::extension_version()
            .to_json()
            .expect("probe should serialize"),
    )
    .expect("probe should be JSON");

    assert_eq!(
        json,
        json!({"module": "kz.digiflow.mobile.extensions", "method": "getVersion"})
    );
}

/// **VALUE**: Verifies the `sign` request carries every argument under its wire name.
///
/// **WHY THIS MATTERS**: NCALayer ignores unknown keys silently; a misnamed key
/// turns into a default value, not an error.
///
/// **BUG THIS CATCHES**: Would catch snake_case keys leaking onto the wire, or
/// `allowedStorages` being sent as an empty list instead of `null`.
#[test]
fn given_sign_args_when_request_built_then_uses_wire_names() {
    let data = OneOrMany::Many(vec!["QQ==".to_string(), "Qg==".to_string()]);
    let signing = SigningParams {
        encapsulate: Some(true),
        ..SigningParams::default()
    };
    let args = SignArgs {
        allowed_storages: &Storages::all(),
        format: SignFormat::Cms,
        data: &data,
        signing_params: &signing,
        signer_params: &SignerParams::any(),
        locale: "kk",
    };

    let request = Request::basics_sign(&args).expect("args should serialize");

    assert_eq!(request.module, "kz.gov.pki.knca.basics");
    assert_eq!(request.method, "sign");
    assert_eq!(
        request.args,
        Some(json!({
            "allowedStorages": null,
            "format": "cms",
            "data": ["QQ==", "Qg=="],
            "signingParams": {"encapsulate": true},
            "signerParams": {"extKeyUsageOids": []},
            "locale": "kk"
        }))
    );
}
