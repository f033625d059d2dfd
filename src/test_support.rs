//! Scripted collaborators for service tests.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use test_utils::book_fixture;
use test_utils::user_fixture;
use tokio::sync::oneshot;

use crate::domain::models::ApiError;
use crate::domain::models::AuthPayload;
use crate::domain::models::BookApi;
use crate::domain::models::FeedItem;
use crate::domain::models::FeedPage;
use crate::domain::models::LoginRequest;
use crate::domain::models::NewBook;
use crate::domain::models::RegisterRequest;
use crate::domain::models::SecureStore;
use crate::domain::models::User;
use crate::infrastructure::storage::MemoryStore;

pub fn user(id: &str) -> User {
    return serde_json::from_value(user_fixture(id)).unwrap();
}

pub fn item(id: &str) -> FeedItem {
    return serde_json::from_value(book_fixture(id, 4)).unwrap();
}

pub fn page(ids: &[&str], total_pages: u32) -> FeedPage {
    return FeedPage {
        items: ids.iter().map(|id| return item(id)).collect(),
        total_pages,
    };
}

pub fn auth(id: &str, token: &str) -> AuthPayload {
    return AuthPayload {
        token: token.to_string(),
        user: user(id),
        message: Some("Welcome!".to_string()),
    };
}

pub fn rejected(message: &str) -> ApiError {
    return ApiError::Rejected {
        status: Some(400),
        message: Some(message.to_string()),
    };
}

pub fn ids(items: &[FeedItem]) -> Vec<String> {
    return items.iter().map(|item| return item.id.to_string()).collect();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Register(RegisterRequest),
    Login(LoginRequest),
    FeedPage { token: String, page: u32, limit: u32 },
    UserBooks { token: String },
    CreateBook { token: String, book: NewBook },
    DeleteBook { token: String, id: String },
}

struct Reply<T> {
    result: Result<T, ApiError>,
    gate: Option<oneshot::Receiver<()>>,
}

type Queue<T> = Mutex<VecDeque<Reply<T>>>;

fn push<T>(queue: &Queue<T>, result: Result<T, ApiError>, gated: bool) -> Option<oneshot::Sender<()>> {
    let (tx, rx) = oneshot::channel();
    let gate = if gated { Some(rx) } else { None };
    queue.lock().unwrap().push_back(Reply { result, gate });
    if gated {
        return Some(tx);
    }
    return None;
}

async fn pop<T>(queue: &Queue<T>) -> Result<T, ApiError> {
    let reply = queue.lock().unwrap().pop_front();
    let Some(reply) = reply else {
        return Err(ApiError::Network("no scripted reply".to_string()));
    };

    if let Some(gate) = reply.gate {
        let _ = gate.await;
    }
    return reply.result;
}

/// `BookApi` answering from per endpoint queues. Gated replies wait until the
/// returned sender fires (or is dropped), which lets tests hold a request in
/// flight.
#[derive(Default)]
pub struct FakeApi {
    auth: Queue<AuthPayload>,
    feed: Queue<FeedPage>,
    user_books: Queue<Vec<FeedItem>>,
    creates: Queue<String>,
    deletes: Queue<String>,
    requests: Mutex<Vec<Request>>,
}

impl FakeApi {
    pub fn reply_auth(&self, result: Result<AuthPayload, ApiError>) {
        push(&self.auth, result, false);
    }

    pub fn reply_auth_gated(&self, result: Result<AuthPayload, ApiError>) -> oneshot::Sender<()> {
        return push(&self.auth, result, true).unwrap();
    }

    pub fn reply_feed(&self, result: Result<FeedPage, ApiError>) {
        push(&self.feed, result, false);
    }

    pub fn reply_feed_gated(&self, result: Result<FeedPage, ApiError>) -> oneshot::Sender<()> {
        return push(&self.feed, result, true).unwrap();
    }

    pub fn reply_user_books(&self, result: Result<Vec<FeedItem>, ApiError>) {
        push(&self.user_books, result, false);
    }

    pub fn reply_create(&self, result: Result<String, ApiError>) {
        push(&self.creates, result, false);
    }

    pub fn reply_delete(&self, result: Result<String, ApiError>) {
        push(&self.deletes, result, false);
    }

    pub fn reply_delete_gated(&self, result: Result<String, ApiError>) -> oneshot::Sender<()> {
        return push(&self.deletes, result, true).unwrap();
    }

    pub fn requests(&self) -> Vec<Request> {
        return self.requests.lock().unwrap().clone();
    }

    pub fn feed_requests(&self) -> Vec<u32> {
        return self
            .requests()
            .iter()
            .filter_map(|req| {
                if let Request::FeedPage { page, .. } = req {
                    return Some(*page);
                }
                return None;
            })
            .collect();
    }

    fn record(&self, req: Request) {
        self.requests.lock().unwrap().push(req);
    }
}

#[async_trait]
impl BookApi for FakeApi {
    #[allow(clippy::implicit_return)]
    async fn register(&self, req: &RegisterRequest) -> Result<AuthPayload, ApiError> {
        self.record(Request::Register(req.clone()));
        return pop(&self.auth).await;
    }

    #[allow(clippy::implicit_return)]
    async fn login(&self, req: &LoginRequest) -> Result<AuthPayload, ApiError> {
        self.record(Request::Login(req.clone()));
        return pop(&self.auth).await;
    }

    #[allow(clippy::implicit_return)]
    async fn feed_page(&self, token: &str, page: u32, limit: u32) -> Result<FeedPage, ApiError> {
        self.record(Request::FeedPage {
            token: token.to_string(),
            page,
            limit,
        });
        return pop(&self.feed).await;
    }

    #[allow(clippy::implicit_return)]
    async fn user_books(&self, token: &str) -> Result<Vec<FeedItem>, ApiError> {
        self.record(Request::UserBooks {
            token: token.to_string(),
        });
        return pop(&self.user_books).await;
    }

    #[allow(clippy::implicit_return)]
    async fn create_book(&self, token: &str, book: &NewBook) -> Result<String, ApiError> {
        self.record(Request::CreateBook {
            token: token.to_string(),
            book: book.clone(),
        });
        return pop(&self.creates).await;
    }

    #[allow(clippy::implicit_return)]
    async fn delete_book(&self, token: &str, id: &str) -> Result<String, ApiError> {
        self.record(Request::DeleteBook {
            token: token.to_string(),
            id: id.to_string(),
        });
        return pop(&self.deletes).await;
    }
}

/// `MemoryStore` whose operations can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_remove: AtomicBool,
}

#[async_trait]
impl SecureStore for FlakyStore {
    #[allow(clippy::implicit_return)]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_get.load(Ordering::SeqCst) {
            bail!("storage unavailable");
        }
        return self.inner.get(key).await;
    }

    #[allow(clippy::implicit_return)]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_set.load(Ordering::SeqCst) {
            bail!("storage full");
        }
        return self.inner.set(key, value).await;
    }

    #[allow(clippy::implicit_return)]
    async fn remove(&self, key: &str) -> Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            bail!("storage locked");
        }
        return self.inner.remove(key).await;
    }
}
