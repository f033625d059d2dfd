use super::describe;
use super::AuthError;
use super::DeleteError;
use super::FailureKind;
use super::FetchError;
use super::GENERIC_ERROR_MESSAGE;
use super::NETWORK_ERROR_MESSAGE;
use crate::domain::models::ApiError;

#[test]
fn it_keeps_backend_messages() {
    let err = AuthError::from(ApiError::Rejected {
        status: Some(400),
        message: Some("Email already exists".to_string()),
    });

    assert_eq!(err.kind, FailureKind::Rejected);
    assert_eq!(err.message, "Email already exists");
    assert_eq!(err.to_string(), "Email already exists");
}

#[test]
fn it_falls_back_to_generic_messages() {
    let (kind, message) = describe(&ApiError::Rejected {
        status: Some(500),
        message: None,
    });
    assert_eq!(kind, FailureKind::Rejected);
    assert_eq!(message, GENERIC_ERROR_MESSAGE);

    let (_, message) = describe(&ApiError::Rejected {
        status: None,
        message: Some("".to_string()),
    });
    assert_eq!(message, GENERIC_ERROR_MESSAGE);

    let err = FetchError::from(ApiError::Network("connection refused".to_string()));
    assert_eq!(err.kind, FailureKind::Network);
    assert_eq!(err.message, NETWORK_ERROR_MESSAGE);
}

#[test]
fn it_flags_undecodable_responses() {
    let err = DeleteError::from(ApiError::InvalidResponse("missing field".to_string()));
    assert_eq!(err.kind, FailureKind::InvalidResponse);
}

#[test]
fn it_displays_kinds_in_kebab_case() {
    assert_eq!(FailureKind::InvalidResponse.to_string(), "invalid-response");
    assert_eq!(FailureKind::Busy.to_string(), "busy");
}
