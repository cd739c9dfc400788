pub mod api;
pub mod auth;
pub mod claims;
pub mod cli;
pub mod jwt;
pub mod request_log;
pub mod session;

use api::create_api_router;
use axum::{Router, middleware};
use session::{SessionConfig, SessionManager};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// How long in-flight requests get to finish once shutdown starts.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ServerConfig {
    /// Token secrets and lifetimes
    pub session: SessionConfig,
    /// Drain deadline for in-flight requests on shutdown
    pub shutdown_timeout: Duration,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let session = Arc::new(SessionManager::new(config.session.clone()));
    create_app_with_session(session)
}

/// Create the application router around an existing session manager.
pub fn create_app_with_session(session: Arc<SessionManager>) -> Router {
    create_api_router(session).layer(middleware::from_fn(request_log::log_request))
}

/// Run the server on the given listener until SIGINT or SIGTERM.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    serve_until(listener, app, shutdown_signal(), config.shutdown_timeout).await
}

/// Serve `app` until `signal` resolves, then give in-flight requests
/// `drain_timeout` to finish. Requests still running after that are
/// abandoned and this returns.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    drain_timeout: Duration,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let signal = async move {
        signal.await;
        let _ = signalled_tx.send(());
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        _ = signalled_rx => {}
    }

    match tokio::time::timeout(drain_timeout, &mut server).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                timeout_secs = drain_timeout.as_secs_f64(),
                "In-flight requests did not finish in time, forcing shutdown"
            );
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Attempting shutdown");
}
