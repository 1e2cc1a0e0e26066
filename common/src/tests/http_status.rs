use crate::HttpStatusCode;

#[test]
fn given_status_codes_when_classified_then_matching_class() {
    assert!(HttpStatusCode(200).is_success());
    assert!(HttpStatusCode(204).is_success());
    assert!(!HttpStatusCode(301).is_success());
    assert!(HttpStatusCode::CONFLICT.is_client_error());
    assert!(HttpStatusCode::UNAUTHORIZED.is_client_error());
    assert!(HttpStatusCode(503).is_server_error());
    assert!(!HttpStatusCode(503).is_client_error());
}

#[test]
fn given_status_code_when_displayed_then_bare_number() {
    assert_eq!(HttpStatusCode::from(409).to_string(), "409");
}
