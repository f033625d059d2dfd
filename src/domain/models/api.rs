use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::FeedItem;
use super::FeedPage;
use super::NewBook;
use super::User;

/// Failure talking to the backend, before it is mapped to an operation
/// specific error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response was received, including timeouts.
    #[error("network error: {0}")]
    Network(String),

    /// The backend replied with `success: false` or a non 2xx status.
    #[error("request rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: Option<u16>,
        message: Option<String>,
    },

    /// A successful response did not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload of a successful register or login call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
    #[serde(default)]
    pub message: Option<String>,
}

/// Every backend call the client makes. Authorized calls take the bearer
/// token explicitly so implementations never hold session state.
#[async_trait]
pub trait BookApi: Send + Sync {
    async fn register(&self, req: &RegisterRequest) -> Result<AuthPayload, ApiError>;

    async fn login(&self, req: &LoginRequest) -> Result<AuthPayload, ApiError>;

    /// Fetches one 1-based page of the community feed.
    async fn feed_page(&self, token: &str, page: u32, limit: u32) -> Result<FeedPage, ApiError>;

    /// Fetches every recommendation shared by the token's owner.
    async fn user_books(&self, token: &str) -> Result<Vec<FeedItem>, ApiError>;

    /// Publishes a recommendation, returning the backend's message.
    async fn create_book(&self, token: &str, book: &NewBook) -> Result<String, ApiError>;

    /// Deletes a recommendation by id, returning the backend's message.
    async fn delete_book(&self, token: &str, id: &str) -> Result<String, ApiError>;
}

pub type BookApiBox = Arc<dyn BookApi>;
