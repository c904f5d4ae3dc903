//! Integration tests for OTP request rate limiting

use chrono::Duration;
use otp_test_utils::*;
use reqwest::StatusCode;

#[tokio::test]
async fn test_fourth_request_in_window_is_throttled() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    for _ in 0..3 {
        let response = server.request_otp(TEST_PHONE_ALICE).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = server.request_otp(TEST_PHONE_ALICE).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json().await?;
    assert_error_code(&body, "RATE_LIMIT_EXCEEDED");

    // Nothing was delivered for the throttled request
    assert_eq!(server.sent_count(TEST_PHONE_ALICE).await, 3);

    Ok(())
}

#[tokio::test]
async fn test_throttled_request_keeps_current_code() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    for _ in 0..3 {
        server.request_otp(TEST_PHONE_ALICE).await?;
    }
    let code = server.last_code(TEST_PHONE_ALICE).await.unwrap();

    let response = server.request_otp(TEST_PHONE_ALICE).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = server.verify_otp(TEST_PHONE_ALICE, &code).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_window_elapses() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    for _ in 0..3 {
        server.request_otp(TEST_PHONE_ALICE).await?;
    }

    server.clock().advance(Duration::seconds(600));

    let response = server.request_otp(TEST_PHONE_ALICE).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.sent_count(TEST_PHONE_ALICE).await, 4);

    Ok(())
}

#[tokio::test]
async fn test_limit_is_per_phone_number() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    for _ in 0..3 {
        server.request_otp(TEST_PHONE_ALICE).await?;
    }

    let response = server.request_otp(TEST_PHONE_BOB).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_successful_login_does_not_reset_limit() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    for _ in 0..3 {
        server.login(TEST_PHONE_ALICE).await?;
    }

    let response = server.request_otp(TEST_PHONE_ALICE).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_admit_exactly_three() -> Result<(), anyhow::Error> {
    let server = TestOtpServer::spawn().await?;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = server.client().clone();
        let url = format!("{}/api/v1/auth/request-otp", server.url());
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .json(&serde_json::json!({ "phone_number": TEST_PHONE_CHARLIE }))
                .send()
                .await
                .map(|r| r.status())
        }));
    }

    let mut admitted = 0;
    let mut throttled = 0;
    for handle in handles {
        match handle.await?? {
            StatusCode::OK => admitted += 1,
            StatusCode::TOO_MANY_REQUESTS => throttled += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(admitted, 3);
    assert_eq!(throttled, 7);
    assert_eq!(server.sent_count(TEST_PHONE_CHARLIE).await, 3);

    Ok(())
}
