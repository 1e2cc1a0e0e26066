use crate::document::{Document, OneOrMany, SignInput, Signed};
use crate::error::NcaLayerError;

use serde_json::json;

/// **VALUE**: Verifies positional results keep the input's single-or-batch shape.
///
/// **WHY THIS MATTERS**: A caller that passed one document expects one signature,
/// not a one-element array; a batch caller indexes results by input position.
///
/// **BUG THIS CATCHES**: Would catch wrapping a single result in `Many` or reordering a batch.
#[test]
fn given_input_shape_when_reshape_then_result_has_same_shape_and_order() {
    let one: SignInput = OneOrMany::One(Document::from("QQ=="));
    let many: SignInput = OneOrMany::Many(vec![
        Document::from("QQ=="),
        Document::from(vec![1u8, 2]),
        Document::from("Qw=="),
    ]);

    assert_eq!(
        one.reshape(vec!["s".to_string()]).expect("one result"),
        OneOrMany::One("s".to_string())
    );
    assert_eq!(
        many.reshape(vec!["a", "b", "c"]).expect("three results"),
        OneOrMany::Many(vec!["a", "b", "c"])
    );
}

/// **VALUE**: Verifies a result count that does not match the input is rejected.
///
/// **BUG THIS CATCHES**: Would catch silently truncating or padding signatures,
/// which would pair a signature with the wrong document.
#[test]
fn given_mismatched_result_count_when_reshape_then_decode_error() {
    let many: SignInput = OneOrMany::Many(vec![Document::from("QQ=="), Document::from("Qg==")]);
    let one: SignInput = OneOrMany::One(Document::from("QQ=="));

    let err = many.reshape(vec!["only one"]).expect_err("count mismatch");
    assert!(matches!(err, NcaLayerError::Decode { .. }));

    let err = one.reshape(Vec::<String>::new()).expect_err("no result");
    assert!(matches!(err, NcaLayerError::Decode { .. }));
}

/// **VALUE**: Verifies `sign` results are interpreted against the input shape.
///
/// **WHY THIS MATTERS**: NCALayer returns a bare string for single input and an
/// array for a batch; the client hands callers the matching [`Signed`] shape.
#[test]
fn given_agent_result_when_from_result_then_signed_matches_input() {
    let single = OneOrMany::One("QQ==".to_string());
    let batch = OneOrMany::Many(vec!["QQ==".to_string(), "Qg==".to_string()]);

    assert_eq!(
        Signed::from_result(&single, json!("sig")).expect("string result"),
        OneOrMany::One("sig".to_string())
    );
    assert_eq!(
        Signed::from_result(&batch, json!(["s1", "s2"])).expect("array result"),
        OneOrMany::Many(vec!["s1".to_string(), "s2".to_string()])
    );
}

/// **VALUE**: Verifies non-string results are decode errors, not stringified JSON.
#[test]
fn given_non_string_result_when_from_result_then_decode_error() {
    let single = OneOrMany::One("QQ==".to_string());
    let batch = OneOrMany::Many(vec!["QQ==".to_string()]);

    assert!(matches!(
        Signed::from_result(&single, json!({"cms": "x"})),
        Err(NcaLayerError::Decode { .. })
    ));
    assert!(matches!(
        Signed::from_result(&batch, json!([42])),
        Err(NcaLayerError::Decode { .. })
    ));
}

/// **VALUE**: Verifies `OneOrMany` serialises untagged in both directions.
#[test]
fn given_one_or_many_when_serialized_then_scalar_or_array() {
    let one = OneOrMany::One("a".to_string());
    let many = OneOrMany::Many(vec!["a".to_string(), "b".to_string()]);

    assert_eq!(serde_json::to_value(&one).expect("serialize"), json!("a"));
    assert_eq!(serde_json::to_value(&many).expect("serialize"), json!(["a", "b"]));

    let parsed: OneOrMany<String> = serde_json::from_value(json!(["x"])).expect("deserialize");
    assert!(parsed.is_many());
}

/// **VALUE**: Verifies reading a file yields the exact bytes as a binary document.
#[tokio::test]
async fn given_file_on_disk_when_read_file_then_binary_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("payload.bin");
    std::fs::write(&path, [0u8, 159, 146, 150]).expect("write payload");

    let document = Document::read_file(&path).await.expect("read payload");

    assert_eq!(document, Document::Binary(vec![0, 159, 146, 150]));
    assert!(!document.is_base64());
}

/// **BUG THIS CATCHES**: Would catch an IO failure surfacing as a panic.
#[tokio::test]
async fn given_missing_file_when_read_file_then_validation_error() {
    let dir = tempfile::tempdir().expect("tempdir");

    let err = Document::read_file(dir.path().join("absent.xml"))
        .await
        .expect_err("missing file");

    assert!(matches!(err, NcaLayerError::Validation { .. }));
    assert!(err.to_string().contains("absent.xml"));
}
