//! Tests for the domain error payload.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn validation_error() -> Error {
    Error::invalid_request("unknown sort").with_details(json!({ "field": "sortBy" }))
}

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::not_found("gone"), ErrorCode::NotFound)]
#[case(Error::conflict("raced"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
#[case(Error::misconfigured("no seed"), ErrorCode::Misconfigured)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn serialises_code_in_snake_case(validation_error: Error) {
    let value = serde_json::to_value(&validation_error).expect("serialise error");

    assert_eq!(value["code"], "invalid_request");
    assert_eq!(value["message"], "unknown sort");
    assert_eq!(value["details"]["field"], "sortBy");
}

#[rstest]
fn omits_missing_details() {
    let value = serde_json::to_value(Error::misconfigured("seed missing")).expect("serialise");

    assert_eq!(value["code"], "misconfigured");
    assert!(value.get("details").is_none());
}

#[rstest]
fn deserialisation_revalidates_message() {
    let payload = json!({ "code": "not_found", "message": " " });
    let result = serde_json::from_value::<Error>(payload);

    assert!(result.is_err());
}

#[rstest]
fn round_trips_through_json(validation_error: Error) {
    let encoded = serde_json::to_string(&validation_error).expect("serialise");
    let decoded: Error = serde_json::from_str(&encoded).expect("deserialise");

    assert_eq!(decoded, validation_error);
}

#[rstest]
#[case(ErrorCode::InvalidRequest, false)]
#[case(ErrorCode::NotFound, false)]
#[case(ErrorCode::Conflict, true)]
#[case(ErrorCode::ServiceUnavailable, true)]
#[case(ErrorCode::Misconfigured, false)]
#[case(ErrorCode::InternalError, false)]
fn display_matches_wire_code(#[case] code: ErrorCode, #[case] retryable: bool) {
    let wire = serde_json::to_value(code).expect("serialise code");

    assert_eq!(wire, code.to_string());
    assert_eq!(code.is_retryable(), retryable);
}

#[rstest]
fn display_prefixes_the_code() {
    let err = Error::conflict("revision 3 was superseded");

    assert_eq!(err.to_string(), "conflict: revision 3 was superseded");
}
