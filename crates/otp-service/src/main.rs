//! OTP Auth Service
//!
//! Entry point for the phone number login service.

use otp_service::clock::{Clock, SystemClock};
use otp_service::config::{Config, StoreBackend};
use otp_service::crypto::TokenIssuer;
use otp_service::observability::metrics::init_metrics_recorder;
use otp_service::repositories::{InMemoryUserRepository, StoreOtpRepository};
use otp_service::routes::{self, AppState};
use otp_service::services::{AuthService, LogOtpSender, UserService};
use otp_service::store::{EphemeralStore, MemoryStore, RedisStore};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "otp_service=debug,otp_auth_service=debug,tower_http=debug".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting OTP Auth Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        store_backend = ?config.store_backend,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Arc<dyn EphemeralStore> = match config.store_backend {
        StoreBackend::Redis => {
            info!("Connecting to Redis...");
            let redis = RedisStore::connect(config.redis_url.expose_secret())
                .await
                .map_err(|e| {
                    error!("Failed to connect to Redis: {}", e);
                    e
                })?;
            info!("Redis connection established");
            Arc::new(redis)
        }
        StoreBackend::Memory => {
            warn!("Using in-process store; OTP state is not shared between instances");
            Arc::new(MemoryStore::new(clock.clone()))
        }
    };

    let user_repo = Arc::new(InMemoryUserRepository::new());
    let token_issuer = TokenIssuer::new(
        config.jwt_secret.clone(),
        clock.clone(),
        config.jwt_clock_skew_seconds,
    );

    let auth_service = Arc::new(AuthService::new(
        Arc::new(StoreOtpRepository::new(store, clock.clone())),
        user_repo.clone(),
        token_issuer,
        Arc::new(LogOtpSender),
        clock,
    ));

    let state = Arc::new(AppState {
        auth_service,
        user_service: Arc::new(UserService::new(user_repo)),
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("OTP Auth Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("OTP Auth Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
