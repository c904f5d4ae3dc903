//! Integration tests for bearer token validation on protected routes

use chrono::{Duration, Utc};
use otp_test_utils::*;
use reqwest::StatusCode;

const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

async fn assert_rejected(
    response: reqwest::Response,
    message: &str,
) -> Result<(), anyhow::Error> {
    assert_rejected_with(response, "INVALID_TOKEN", message).await
}

async fn assert_rejected_with(
    response: reqwest::Response,
    code: &str,
    message: &str,
) -> Result<(), anyhow::Error> {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_error_code(&body, code);
    assert_eq!(body["error"]["message"], message);
    Ok(())
}

#[tokio::test]
async fn test_issued_token_grants_access() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;
    let login = server.login(TEST_PHONE_ALICE).await?;

    let response = server.get_authed("/api/v1/users", &login.token).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_missing_authorization_header() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/api/v1/users", server.url()))
        .send()
        .await?;

    assert_rejected_with(
        response,
        "MISSING_AUTH_HEADER",
        "Authorization header is required",
    )
    .await
}

#[tokio::test]
async fn test_non_bearer_scheme() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/api/v1/users", server.url()))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;

    assert_rejected_with(
        response,
        "INVALID_AUTH_FORMAT",
        "Invalid authorization header format",
    )
    .await
}

#[tokio::test]
async fn test_garbage_token() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let response = server.get_authed("/api/v1/users", "not.a.token").await?;

    assert_rejected(response, INVALID_TOKEN_MESSAGE).await
}

#[tokio::test]
async fn test_token_expires_after_24_hours() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;
    let login = server.login(TEST_PHONE_ALICE).await?;

    server.clock().advance(Duration::hours(24) - Duration::seconds(1));
    let response = server.get_authed("/api/v1/users", &login.token).await?;
    assert_eq!(response.status(), StatusCode::OK);

    server.clock().advance(Duration::seconds(1));
    let response = server.get_authed("/api/v1/users", &login.token).await?;
    assert_rejected(response, INVALID_TOKEN_MESSAGE).await
}

#[tokio::test]
async fn test_token_signed_with_other_secret() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let token = TestTokenBuilder::new()
        .signed_with(TEST_WRONG_JWT_SECRET)
        .sign();
    let response = server.get_authed("/api/v1/users", &token).await?;

    assert_rejected(response, INVALID_TOKEN_MESSAGE).await
}

#[tokio::test]
async fn test_externally_minted_token_is_accepted() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    // Signature and lifetime are all that is checked
    let token = TestTokenBuilder::new()
        .for_user(TEST_USER_BOB, TEST_PHONE_BOB)
        .sign();
    let response = server.get_authed("/api/v1/users", &token).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_expired_minted_token() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let token = TestTokenBuilder::new()
        .issued_at((Utc::now() - Duration::hours(2)).timestamp())
        .expires_in(-3600)
        .sign();
    let response = server.get_authed("/api/v1/users", &token).await?;

    assert_rejected(response, INVALID_TOKEN_MESSAGE).await
}

#[tokio::test]
async fn test_iat_within_clock_skew_accepted() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let token = TestTokenBuilder::new()
        .issued_at((Utc::now() + Duration::seconds(60)).timestamp())
        .sign();
    let response = server.get_authed("/api/v1/users", &token).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_iat_beyond_clock_skew_rejected() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let token = TestTokenBuilder::new()
        .issued_at((Utc::now() + Duration::hours(1)).timestamp())
        .expires_in(7200)
        .sign();
    let response = server.get_authed("/api/v1/users", &token).await?;

    assert_rejected(response, INVALID_TOKEN_MESSAGE).await
}

#[tokio::test]
async fn test_oversized_token_rejected() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let token = "a".repeat(4097);
    let response = server.get_authed("/api/v1/users", &token).await?;

    assert_rejected(response, INVALID_TOKEN_MESSAGE).await
}
