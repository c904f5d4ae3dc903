//! Test server harness for E2E testing
//!
//! Provides `TestOtpServer` for spawning real OTP service instances in tests.

use crate::test_ids::TEST_JWT_SECRET;
use otp_service::clock::ManualClock;
use otp_service::config::DEFAULT_JWT_CLOCK_SKEW_SECONDS;
use otp_service::crypto::TokenIssuer;
use otp_service::models::VerifyOtpResponse;
use otp_service::observability::metrics::init_metrics_recorder;
use otp_service::repositories::{InMemoryUserRepository, StoreOtpRepository};
use otp_service::routes::{self, AppState};
use otp_service::services::{AuthService, CapturingOtpSender, UserService};
use otp_service::store::MemoryStore;
use secrecy::SecretString;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the OTP service in E2E tests
///
/// Runs on the in-process store with a manual clock, so tests can move
/// past OTP, rate limit and token lifetimes without sleeping. Codes are
/// captured instead of sent.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login_e2e() -> Result<()> {
///     let server = TestOtpServer::spawn().await?;
///
///     let response = server
///         .client()
///         .post(format!("{}/api/v1/auth/request-otp", server.url()))
///         .json(&json!({ "phone_number": TEST_PHONE_ALICE }))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestOtpServer {
    addr: SocketAddr,
    clock: Arc<ManualClock>,
    sender: Arc<CapturingOtpSender>,
    users: Arc<InMemoryUserRepository>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestOtpServer {
    /// Spawn a new test server instance with empty state
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Sign tokens with `TEST_JWT_SECRET`
    /// - Start the HTTP server in the background
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let users = Arc::new(InMemoryUserRepository::new());
        let sender = Arc::new(CapturingOtpSender::new());

        let token_issuer = TokenIssuer::new(
            SecretString::from(TEST_JWT_SECRET),
            clock.clone(),
            DEFAULT_JWT_CLOCK_SKEW_SECONDS,
        );

        let auth_service = Arc::new(AuthService::new(
            Arc::new(StoreOtpRepository::new(store, clock.clone())),
            users.clone(),
            token_issuer,
            sender.clone(),
            clock.clone(),
        ));

        let state = Arc::new(AppState {
            auth_service,
            user_service: Arc::new(UserService::new(users.clone())),
        });

        // Initialize metrics recorder for test server
        // Note: This may fail if already installed in the test process.
        // In that case, we create a new recorder without installing it globally.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            clock,
            sender,
            users,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// HTTP client shared across calls to this server
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The server's clock; advance it to expire codes, windows and tokens
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// The user directory behind the server
    pub fn users(&self) -> &InMemoryUserRepository {
        &self.users
    }

    /// Most recent code delivered to `phone_number`
    pub async fn last_code(&self, phone_number: &str) -> Option<String> {
        self.sender.last_code(phone_number).await
    }

    /// Number of codes delivered to `phone_number`
    pub async fn sent_count(&self, phone_number: &str) -> usize {
        self.sender.sent_count(phone_number).await
    }

    /// POST /api/v1/auth/request-otp
    pub async fn request_otp(&self, phone_number: &str) -> Result<reqwest::Response, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/api/v1/auth/request-otp", self.url()))
            .json(&serde_json::json!({ "phone_number": phone_number }))
            .send()
            .await?;
        Ok(response)
    }

    /// POST /api/v1/auth/verify-otp
    pub async fn verify_otp(
        &self,
        phone_number: &str,
        otp: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/api/v1/auth/verify-otp", self.url()))
            .json(&serde_json::json!({ "phone_number": phone_number, "otp": otp }))
            .send()
            .await?;
        Ok(response)
    }

    /// GET `path` with a bearer token
    pub async fn get_authed(
        &self,
        path: &str,
        token: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let response = self
            .client
            .get(format!("{}{}", self.url(), path))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(response)
    }

    /// Run the full request/verify flow over HTTP and return the verify body
    ///
    /// # Example
    /// ```rust,ignore
    /// let login = server.login(TEST_PHONE_ALICE).await?;
    /// assert!(login.is_new_user);
    /// ```
    pub async fn login(&self, phone_number: &str) -> Result<VerifyOtpResponse, anyhow::Error> {
        let response = self.request_otp(phone_number).await?;
        anyhow::ensure!(
            response.status().is_success(),
            "request-otp failed with {}",
            response.status()
        );

        let code = self
            .last_code(phone_number)
            .await
            .ok_or_else(|| anyhow::anyhow!("No code captured for {}", phone_number))?;

        let response = self.verify_otp(phone_number, &code).await?;
        anyhow::ensure!(
            response.status().is_success(),
            "verify-otp failed with {}",
            response.status()
        );

        Ok(response.json::<VerifyOtpResponse>().await?)
    }
}

impl Drop for TestOtpServer {
    fn drop(&mut self) {
        // Explicitly abort the HTTP server task to ensure immediate cleanup
        // when the test completes.
        self._handle.abort();
    }
}
