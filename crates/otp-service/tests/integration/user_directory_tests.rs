//! Integration tests for the user directory endpoints

use chrono::Utc;
use otp_service::models::{ListUsersResponse, User, UserResponse};
use otp_service::repositories::UserRepository;
use otp_test_utils::*;
use reqwest::StatusCode;

/// Spawn a server holding `n` users and return it with a valid token.
async fn server_with_users(n: usize) -> Result<(TestOtpServer, String), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;
    for i in 0..n {
        server
            .users()
            .create(User::new(format!("+1650555{:04}", i), Utc::now()))
            .await?;
    }
    let token = TestTokenBuilder::new().sign();
    Ok((server, token))
}

async fn list(
    server: &TestOtpServer,
    token: &str,
    query: &str,
) -> Result<ListUsersResponse, anyhow::Error> {
    let response = server
        .get_authed(&format!("/api/v1/users{}", query), token)
        .await?;
    anyhow::ensure!(
        response.status() == StatusCode::OK,
        "list failed with {}",
        response.status()
    );
    Ok(response.json().await?)
}

#[tokio::test]
async fn test_list_defaults() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_users(12).await?;

    let page = list(&server, &token, "").await?;

    assert_eq!(page.total, 12);
    assert_eq!(page.page, 1);
    assert_eq!(page.limit, 10);
    assert_eq!(page.users.len(), 10);

    Ok(())
}

#[tokio::test]
async fn test_pagination_slices() -> Result<(), anyhow::Error> {
    let n = 23;
    let (server, token) = server_with_users(n).await?;

    for (page, limit) in [(1, 10), (2, 10), (3, 10), (4, 10), (1, 100), (5, 5), (6, 5)] {
        let result = list(&server, &token, &format!("?page={page}&limit={limit}")).await?;

        let expected = limit.min(n.saturating_sub((page - 1) * limit));
        assert_eq!(result.total, n, "page {page} limit {limit}");
        assert_eq!(result.users.len(), expected, "page {page} limit {limit}");
        assert_eq!(result.page, page);
        assert_eq!(result.limit, limit);
    }

    Ok(())
}

#[tokio::test]
async fn test_pages_do_not_overlap() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_users(7).await?;

    let mut seen = Vec::new();
    for page in 1..=3 {
        let result = list(&server, &token, &format!("?page={page}&limit=3")).await?;
        seen.extend(result.users.into_iter().map(|u| u.phone_number));
    }

    let expected: Vec<String> = (0..7).map(|i| format!("+1650555{:04}", i)).collect();
    assert_eq!(seen, expected);

    Ok(())
}

#[tokio::test]
async fn test_search_by_phone_number() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_users(5).await?;

    // '+' must be percent-encoded in a query string
    let result = list(&server, &token, "?search=%2B16505550003").await?;

    assert_eq!(result.total, 1);
    assert_eq!(result.users.len(), 1);
    assert_eq!(result.users[0].phone_number, "+16505550003");

    let result = list(&server, &token, "?search=%2B19995550000").await?;
    assert_eq!(result.total, 0);
    assert!(result.users.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invalid_list_parameters() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_users(1).await?;

    let cases = [
        ("?page=0", "INVALID_PAGINATION"),
        ("?limit=0", "INVALID_PAGINATION"),
        ("?limit=101", "INVALID_PAGINATION"),
        ("?page=abc", "INVALID_PAGINATION"),
        ("?search=ab", "INVALID_SEARCH_QUERY"),
        ("?search=%3Cscript%3E", "INVALID_SEARCH_QUERY"),
    ];
    for (query, code) in cases {
        let response = server
            .get_authed(&format!("/api/v1/users{}", query), &token)
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {query}");
        let body: serde_json::Value = response.json().await?;
        assert_error_code(&body, code);
        assert!(body["error"]["details"].is_string(), "query {query}");
    }

    let response = server
        .get_authed("/api/v1/users?limit=101", &token)
        .await?;
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["message"], "Invalid pagination parameters");
    assert_eq!(body["error"]["details"], "limit must be between 1 and 100");

    Ok(())
}

#[tokio::test]
async fn test_get_user_matches_login() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;
    let login = server.login(TEST_PHONE_ALICE).await?;

    let response = server
        .get_authed(&format!("/api/v1/users/{}", login.user.id), &login.token)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let user: UserResponse = response.json().await?;
    assert_eq!(user, login.user);

    // Same record through the directory's phone index
    let by_phone = server.users().get_by_phone_number(TEST_PHONE_ALICE).await?;
    assert_eq!(UserResponse::from(by_phone), user);

    Ok(())
}

#[tokio::test]
async fn test_get_unknown_user() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_users(0).await?;

    let response = server
        .get_authed(&format!("/api/v1/users/{}", uuid::Uuid::new_v4()), &token)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await?;
    assert_error_code(&body, "USER_NOT_FOUND");

    Ok(())
}

#[tokio::test]
async fn test_get_user_rejects_malformed_id() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_users(0).await?;

    let upper = uuid::Uuid::new_v4().to_string().to_uppercase();
    for id in ["not-a-uuid", upper.as_str(), "00000000000000000000000000000000"] {
        let response = server
            .get_authed(&format!("/api/v1/users/{}", id), &token)
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "id {id}");
        let body: serde_json::Value = response.json().await?;
        assert_error_code(&body, "INVALID_UUID");
        assert_eq!(body["error"]["message"], "Invalid UUID format");
    }

    Ok(())
}

#[tokio::test]
async fn test_duplicate_phone_create_keeps_first() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let first = server
        .users()
        .create(User::new(TEST_PHONE_ALICE, Utc::now()))
        .await?;
    let second = server
        .users()
        .create(User::new(TEST_PHONE_ALICE, Utc::now()))
        .await;

    assert!(matches!(
        second,
        Err(otp_service::errors::OtpError::UserAlreadyExists)
    ));
    assert_eq!(server.users().get_by_phone_number(TEST_PHONE_ALICE).await?, first);
    assert_eq!(server.users().len().await, 1);

    Ok(())
}
