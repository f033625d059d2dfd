#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ApiError;
use crate::domain::models::AuthPayload;
use crate::domain::models::BookApi;
use crate::domain::models::FeedItem;
use crate::domain::models::FeedPage;
use crate::domain::models::LoginRequest;
use crate::domain::models::NewBook;
use crate::domain::models::RegisterRequest;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

fn convert_err(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Network(format!("request timed out: {err}"));
    }
    return ApiError::Network(err.to_string());
}

/// Fields every backend response carries, successful or not.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FailureBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedResponse {
    books: Vec<FeedItem>,
    total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BooksResponse {
    books: Vec<FeedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EmptyRequest {}

/// Bookworm REST backend over HTTP. The base URL points at the `/api` root.
pub struct HttpApi {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl Default for HttpApi {
    fn default() -> HttpApi {
        let timeout = Config::get(ConfigKey::RequestTimeout)
            .parse::<u64>()
            .unwrap_or_else(|_| {
                tracing::warn!(
                    value = %Config::get(ConfigKey::RequestTimeout),
                    "Invalid request timeout, using default"
                );
                return DEFAULT_TIMEOUT_MS;
            });

        return HttpApi::new(
            &Config::get(ConfigKey::BackendURL),
            Duration::from_millis(timeout),
        );
    }
}

impl HttpApi {
    pub fn new(url: &str, timeout: Duration) -> HttpApi {
        return HttpApi {
            url: url.trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        };
    }

    /// Appends path segments to the base URL. Each segment is percent encoded
    /// as a whole, so `/`, `?` or `#` inside one can not change the route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.url).map_err(|err| {
            return ApiError::Network(format!("invalid backend url {}: {err}", self.url));
        })?;

        url.path_segments_mut()
            .map_err(|_| return ApiError::Network(format!("invalid backend url {}", self.url)))?
            .pop_if_empty()
            .extend(segments);

        return Ok(url);
    }

    fn bearer(token: &str) -> String {
        return format!("Bearer {token}");
    }

    /// Applies the envelope rules: non 2xx and `success: false` are
    /// rejections carrying the backend message when there is one, and a
    /// successful body must decode into `T`.
    async fn read<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ApiError> {
        let status = res.status();
        let body = res.text().await.map_err(convert_err)?;

        if !status.is_success() {
            let failure = serde_json::from_str::<FailureBody>(&body).unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                message = ?failure.message,
                "Backend request failed"
            );
            return Err(ApiError::Rejected {
                status: Some(status.as_u16()),
                message: failure.message,
            });
        }

        let envelope = serde_json::from_str::<Envelope>(&body)
            .map_err(|err| return ApiError::InvalidResponse(err.to_string()))?;
        if !envelope.success {
            tracing::error!(
                status = status.as_u16(),
                message = ?envelope.message,
                "Backend reported failure"
            );
            return Err(ApiError::Rejected {
                status: Some(status.as_u16()),
                message: envelope.message,
            });
        }

        return serde_json::from_str::<T>(&body)
            .map_err(|err| return ApiError::InvalidResponse(err.to_string()));
    }

    async fn read_message(res: reqwest::Response) -> Result<String, ApiError> {
        let envelope = HttpApi::read::<Envelope>(res).await?;
        return Ok(envelope.message.unwrap_or_default());
    }
}

#[async_trait]
impl BookApi for HttpApi {
    #[allow(clippy::implicit_return)]
    async fn register(&self, req: &RegisterRequest) -> Result<AuthPayload, ApiError> {
        tracing::debug!(username = %req.username, email = %req.email, "Registering");
        let res = self
            .client
            .post(self.endpoint(&["auth", "register"])?)
            .timeout(self.timeout)
            .json(req)
            .send()
            .await
            .map_err(convert_err)?;

        return HttpApi::read::<AuthPayload>(res).await;
    }

    #[allow(clippy::implicit_return)]
    async fn login(&self, req: &LoginRequest) -> Result<AuthPayload, ApiError> {
        tracing::debug!(email = %req.email, "Logging in");
        let res = self
            .client
            .post(self.endpoint(&["auth", "login"])?)
            .timeout(self.timeout)
            .json(req)
            .send()
            .await
            .map_err(convert_err)?;

        return HttpApi::read::<AuthPayload>(res).await;
    }

    #[allow(clippy::implicit_return)]
    async fn feed_page(&self, token: &str, page: u32, limit: u32) -> Result<FeedPage, ApiError> {
        tracing::debug!(page, limit, "Fetching feed page");
        let res = self
            .client
            .post(self.endpoint(&["book"])?)
            .query(&[("page", page), ("limit", limit)])
            .header("Authorization", HttpApi::bearer(token))
            .timeout(self.timeout)
            .json(&EmptyRequest {})
            .send()
            .await
            .map_err(convert_err)?;

        let feed = HttpApi::read::<FeedResponse>(res).await?;
        return Ok(FeedPage {
            items: feed.books,
            total_pages: feed.total_pages,
        });
    }

    #[allow(clippy::implicit_return)]
    async fn user_books(&self, token: &str) -> Result<Vec<FeedItem>, ApiError> {
        tracing::debug!("Fetching user books");
        let res = self
            .client
            .post(self.endpoint(&["book", "user"])?)
            .header("Authorization", HttpApi::bearer(token))
            .timeout(self.timeout)
            .json(&EmptyRequest {})
            .send()
            .await
            .map_err(convert_err)?;

        let books = HttpApi::read::<BooksResponse>(res).await?;
        return Ok(books.books);
    }

    #[allow(clippy::implicit_return)]
    async fn create_book(&self, token: &str, book: &NewBook) -> Result<String, ApiError> {
        tracing::debug!(title = %book.title, rating = book.rating.value(), "Creating book");
        let res = self
            .client
            .post(self.endpoint(&["book", "create"])?)
            .header("Authorization", HttpApi::bearer(token))
            .timeout(self.timeout)
            .json(book)
            .send()
            .await
            .map_err(convert_err)?;

        return HttpApi::read_message(res).await;
    }

    #[allow(clippy::implicit_return)]
    async fn delete_book(&self, token: &str, id: &str) -> Result<String, ApiError> {
        tracing::debug!(%id, "Deleting book");
        if id.is_empty() || id == "." || id == ".." {
            return Err(ApiError::Rejected {
                status: None,
                message: Some(format!("Invalid recommendation id '{id}'")),
            });
        }

        let res = self
            .client
            .delete(self.endpoint(&["book", id])?)
            .header("Authorization", HttpApi::bearer(token))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(convert_err)?;

        return HttpApi::read_message(res).await;
    }
}
