use ncasign::commands::sign::{SignedFile, cms_output_path, pair, write_cms, write_xml};
use ncasign::error::NcaSignError;

use std::path::{Path, PathBuf};

/// **VALUE**: Verifies CMS output lands as DER bytes under `<name>.cms`, one per input.
///
/// **WHY THIS MATTERS**: Downstream tooling (openssl, document archives) expects DER,
/// not the base64 text the agent returns.
///
/// **BUG THIS CATCHES**: Would catch writing the base64 text verbatim, or two inputs
/// with different directories overwriting each other's output by index.
#[tokio::test]
async fn given_signed_files_when_write_cms_then_der_files_named_after_inputs() {
    // GIVEN: Two signed inputs from different directories
    let out_dir = tempfile::tempdir().expect("tempdir");
    let signed = pair(
        &[PathBuf::from("/in/contract.pdf"), PathBuf::from("/other/annex.pdf")],
        vec!["AQID".to_string(), "/w==".to_string()],
    );

    // WHEN: Writing them out
    let written = write_cms(out_dir.path(), &signed).await.expect("write should succeed");

    // THEN: One DER file per input, in input order
    assert_eq!(
        written,
        vec![
            out_dir.path().join("contract.pdf.cms"),
            out_dir.path().join("annex.pdf.cms")
        ]
    );
    assert_eq!(std::fs::read(&written[0]).expect("read"), vec![1, 2, 3]);
    assert_eq!(std::fs::read(&written[1]).expect("read"), vec![0xff]);
}

/// **BUG THIS CATCHES**: Would catch a malformed signature producing an empty file
/// instead of an error.
#[tokio::test]
async fn given_invalid_base64_signature_when_write_cms_then_error_and_no_file() {
    let out_dir = tempfile::tempdir().expect("tempdir");
    let signed = vec![SignedFile {
        path: PathBuf::from("doc.pdf"),
        signature: "***".to_string(),
    }];

    let err = write_cms(out_dir.path(), &signed).await.expect_err("bad base64");

    assert!(matches!(err, NcaSignError::Signing { .. }), "got {err:?}");
    assert!(!out_dir.path().join("doc.pdf.cms").exists());
}

#[tokio::test]
async fn given_signed_xml_when_write_xml_then_written_verbatim() {
    let out_dir = tempfile::tempdir().expect("tempdir");
    let path = out_dir.path().join("signed.xml");

    write_xml(&path, "<doc><ds:Signature/></doc>")
        .await
        .expect("write should succeed");

    assert_eq!(
        std::fs::read_to_string(&path).expect("read"),
        "<doc><ds:Signature/></doc>"
    );
}

#[test]
fn given_path_without_file_name_when_cms_output_path_then_fallback_name() {
    assert_eq!(
        cms_output_path(Path::new("/out"), Path::new("/")),
        Path::new("/out/document.cms")
    );
}
