#[cfg(test)]
#[path = "errors_test.rs"]
mod tests;

use super::ApiError;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error, please check your connection and try again";
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong, please try again";
pub const INVALID_RESPONSE_MESSAGE: &str = "Received an unexpected response from the server";
pub const UNAUTHENTICATED_MESSAGE: &str = "You need to log in first";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum FailureKind {
    /// The backend answered and refused the request.
    Rejected,
    /// No response arrived, including timeouts.
    Network,
    /// The backend answered with a body that could not be decoded.
    InvalidResponse,
    /// No session is active to authorize the request.
    Unauthenticated,
    /// The request failed client side validation and was never sent.
    Invalid,
    /// Another operation of the same kind is still in flight.
    Busy,
}

/// Kind and user facing message for an `ApiError`. Backend messages are kept
/// verbatim, everything else is normalized to a generic message.
pub fn describe(err: &ApiError) -> (FailureKind, String) {
    return match err {
        ApiError::Network(_) => (FailureKind::Network, NETWORK_ERROR_MESSAGE.to_string()),
        ApiError::Rejected { message, .. } => (
            FailureKind::Rejected,
            message
                .clone()
                .filter(|msg| return !msg.is_empty())
                .unwrap_or_else(|| return GENERIC_ERROR_MESSAGE.to_string()),
        ),
        ApiError::InvalidResponse(_) => (
            FailureKind::InvalidResponse,
            INVALID_RESPONSE_MESSAGE.to_string(),
        ),
    };
}

/// Registration or login was rejected, or the persisted session was unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    pub kind: FailureKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: FailureKind, message: &str) -> AuthError {
        return AuthError {
            kind,
            message: message.to_string(),
        };
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> AuthError {
        let (kind, message) = describe(&err);
        return AuthError { kind, message };
    }
}

/// A feed page could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: &str) -> FetchError {
        return FetchError {
            kind,
            message: message.to_string(),
        };
    }

    pub fn unauthenticated() -> FetchError {
        return FetchError::new(FailureKind::Unauthenticated, UNAUTHENTICATED_MESSAGE);
    }
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> FetchError {
        let (kind, message) = describe(&err);
        return FetchError { kind, message };
    }
}

/// A recommendation could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DeleteError {
    pub kind: FailureKind,
    pub message: String,
}

impl DeleteError {
    pub fn new(kind: FailureKind, message: &str) -> DeleteError {
        return DeleteError {
            kind,
            message: message.to_string(),
        };
    }

    pub fn unauthenticated() -> DeleteError {
        return DeleteError::new(FailureKind::Unauthenticated, UNAUTHENTICATED_MESSAGE);
    }
}

impl From<ApiError> for DeleteError {
    fn from(err: ApiError) -> DeleteError {
        let (kind, message) = describe(&err);
        return DeleteError { kind, message };
    }
}

/// A new recommendation was invalid or could not be published.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CreateError {
    pub kind: FailureKind,
    pub message: String,
}

impl CreateError {
    pub fn new(kind: FailureKind, message: &str) -> CreateError {
        return CreateError {
            kind,
            message: message.to_string(),
        };
    }

    pub fn unauthenticated() -> CreateError {
        return CreateError::new(FailureKind::Unauthenticated, UNAUTHENTICATED_MESSAGE);
    }
}

impl From<ApiError> for CreateError {
    fn from(err: ApiError) -> CreateError {
        let (kind, message) = describe(&err);
        return CreateError { kind, message };
    }
}
