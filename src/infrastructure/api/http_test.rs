use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mockito::Matcher;
use serde_json::json;
use test_utils::auth_body;
use test_utils::failure_body;
use test_utils::feed_body;
use tokio::sync::watch;

use super::HttpApi;
use crate::domain::models::ApiError;
use crate::domain::models::BookApi;
use crate::domain::models::FailureKind;
use crate::domain::models::Session;
use crate::domain::models::SessionHandle;
use crate::domain::models::NETWORK_ERROR_MESSAGE;
use crate::domain::services::FeedPager;
use crate::domain::services::FeedSource;
use crate::test_support::user;
use crate::domain::models::LoginRequest;
use crate::domain::models::NewBook;
use crate::domain::models::Rating;
use crate::domain::models::RegisterRequest;

impl HttpApi {
    fn with_url(url: String) -> HttpApi {
        return HttpApi::new(&url, Duration::from_millis(2000));
    }
}

fn login_request() -> LoginRequest {
    return LoginRequest {
        email: "ada@bookworm.test".to_string(),
        password: "hunter22".to_string(),
    };
}

#[tokio::test]
async fn it_registers() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/register")
        .match_body(Matcher::Json(json!({
            "username": "ada",
            "email": "ada@bookworm.test",
            "password": "hunter22",
        })))
        .with_status(201)
        .with_body(auth_body("u1", "token123"))
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let res = api
        .register(&RegisterRequest {
            username: "ada".to_string(),
            email: "ada@bookworm.test".to_string(),
            password: "hunter22".to_string(),
        })
        .await?;

    mock.assert_async().await;
    assert_eq!(res.token, "token123");
    assert_eq!(res.user.id, "u1");
    assert_eq!(res.user.username, "reader-u1");
    assert_eq!(res.message, Some("Welcome!".to_string()));

    return Ok(());
}

#[tokio::test]
async fn it_trims_trailing_slashes_from_the_base_url() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(auth_body("u1", "token123"))
        .create_async()
        .await;

    let api = HttpApi::with_url(format!("{}/", server.url()));
    api.login(&login_request()).await?;
    mock.assert_async().await;

    return Ok(());
}

#[tokio::test]
async fn it_keeps_backend_messages_on_error_statuses() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .with_status(400)
        .with_body(failure_body("Invalid credentials"))
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let res = api.login(&login_request()).await;

    mock.assert_async().await;
    assert_eq!(
        res.unwrap_err(),
        ApiError::Rejected {
            status: Some(400),
            message: Some("Invalid credentials".to_string()),
        }
    );
}

#[tokio::test]
async fn it_treats_unsuccessful_envelopes_as_rejections() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(failure_body("User does not exist"))
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let res = api.login(&login_request()).await;

    mock.assert_async().await;
    assert_eq!(
        res.unwrap_err(),
        ApiError::Rejected {
            status: Some(200),
            message: Some("User does not exist".to_string()),
        }
    );
}

#[tokio::test]
async fn it_tolerates_error_bodies_without_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let res = api.login(&login_request()).await;

    mock.assert_async().await;
    assert_eq!(
        res.unwrap_err(),
        ApiError::Rejected {
            status: Some(502),
            message: None,
        }
    );
}

#[tokio::test]
async fn it_fails_with_network_errors_when_unreachable() {
    let api = HttpApi::with_url("http://127.0.0.1:1/api".to_string());
    let res = api.login(&login_request()).await;

    assert!(matches!(res, Err(ApiError::Network(_))));
}

#[tokio::test]
async fn it_fetches_feed_pages() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/book")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".to_string(), "2".to_string()),
            Matcher::UrlEncoded("limit".to_string(), "2".to_string()),
        ]))
        .match_header("authorization", "Bearer token123")
        .with_status(200)
        .with_body(feed_body(&["b3", "b4"], 3))
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let page = api.feed_page("token123", 2, 2).await?;

    mock.assert_async().await;
    assert_eq!(page.total_pages, 3);
    assert_eq!(
        page.items
            .iter()
            .map(|item| return item.id.as_str())
            .collect::<Vec<&str>>(),
        vec!["b3", "b4"]
    );

    return Ok(());
}

#[tokio::test]
async fn it_flags_successful_bodies_missing_fields() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/book")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({ "success": true }).to_string())
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let res = api.feed_page("token123", 1, 2).await;

    mock.assert_async().await;
    assert!(matches!(res, Err(ApiError::InvalidResponse(_))));
}

#[tokio::test]
async fn it_fetches_user_books() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/book/user")
        .match_header("authorization", "Bearer token123")
        .with_status(200)
        .with_body(feed_body(&["b1"], 1))
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let books = api.user_books("token123").await?;

    mock.assert_async().await;
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, "b1");

    return Ok(());
}

#[tokio::test]
async fn it_creates_books() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/book/create")
        .match_header("authorization", "Bearer token123")
        .match_body(Matcher::Json(json!({
            "title": "Dune",
            "caption": "Spice must flow",
            "rating": 5,
            "image": "data:image/png;base64,cG5n",
        })))
        .with_status(201)
        .with_body(json!({ "success": true, "message": "Book created" }).to_string())
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let message = api
        .create_book(
            "token123",
            &NewBook {
                title: "Dune".to_string(),
                caption: "Spice must flow".to_string(),
                rating: Rating::try_from(5u8)?,
                image: "data:image/png;base64,cG5n".to_string(),
            },
        )
        .await?;

    mock.assert_async().await;
    assert_eq!(message, "Book created");

    return Ok(());
}

#[tokio::test]
async fn it_deletes_books() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/book/b1")
        .match_header("authorization", "Bearer token123")
        .with_status(200)
        .with_body(json!({ "success": true, "message": "Book deleted" }).to_string())
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let message = api.delete_book("token123", "b1").await?;

    mock.assert_async().await;
    assert_eq!(message, "Book deleted");

    return Ok(());
}

#[tokio::test]
async fn it_reports_unauthorized_deletes() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/book/b1")
        .with_status(401)
        .with_body(failure_body("Unauthorized"))
        .create_async()
        .await;

    let api = HttpApi::with_url(server.url());
    let res = api.delete_book("stale", "b1").await;

    mock.assert_async().await;
    assert_eq!(
        res.unwrap_err(),
        ApiError::Rejected {
            status: Some(401),
            message: Some("Unauthorized".to_string()),
        }
    );
}

#[tokio::test]
async fn it_keeps_ids_inside_a_single_path_segment() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let escaped = server
        .mock("DELETE", "/api/book/..%2Fauth%2Fregister")
        .with_status(200)
        .with_body(json!({ "success": true, "message": "Book deleted" }).to_string())
        .create_async()
        .await;
    let query = server
        .mock("DELETE", "/api/book/b1%3Fforce=true%23top")
        .match_query(Matcher::Missing)
        .with_status(200)
        .with_body(json!({ "success": true, "message": "Book deleted" }).to_string())
        .create_async()
        .await;
    let register = server
        .mock("DELETE", "/api/auth/register")
        .expect(0)
        .create_async()
        .await;

    let api = HttpApi::with_url(format!("{}/api", server.url()));
    api.delete_book("token123", "../auth/register").await?;
    api.delete_book("token123", "b1?force=true#top").await?;

    escaped.assert_async().await;
    query.assert_async().await;
    register.assert_async().await;

    return Ok(());
}

#[tokio::test]
async fn it_refuses_ids_that_name_no_segment() {
    let api = HttpApi::with_url("http://127.0.0.1:1/api".to_string());

    for id in ["", ".", ".."] {
        let res = api.delete_book("token123", id).await;
        assert!(
            matches!(res, Err(ApiError::Rejected { status: None, .. })),
            "id {id:?} gave {res:?}"
        );
    }
}

#[tokio::test]
async fn it_times_out_when_the_backend_never_answers() -> Result<()> {
    // Connections complete in the backlog but nothing ever reads or replies.
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let url = format!("http://{}/api", listener.local_addr()?);

    let api = HttpApi::new(&url, Duration::from_millis(50));
    let res = api.feed_page("token123", 1, 2).await;
    assert!(matches!(res, Err(ApiError::Network(_))), "got {res:?}");

    let (_tx, rx) = watch::channel(Some(Session::new(user("u1"), "token123".to_string())));
    let pager = FeedPager::new(
        Arc::new(HttpApi::new(&url, Duration::from_millis(50))),
        SessionHandle::new(rx),
        FeedSource::Community,
        2,
    );
    let err = pager.load_initial().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Network);
    assert_eq!(err.message, NETWORK_ERROR_MESSAGE);

    drop(listener);
    return Ok(());
}
