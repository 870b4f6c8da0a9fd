//! `ccmasterd`: binds the RPC surface and resumes monitors for any
//! non-terminal sessions recovered from the last snapshot (spec §4.D:
//! "restart should re-discover identities").

use std::sync::Arc;

use ccmaster_core::config::{self, Paths};
use ccmaster_daemon::process_launcher::ProcessPool;
use ccmaster_daemon::rpc;
use ccmaster_daemon::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let paths = match Paths::resolve() {
        Ok(paths) => paths,
        Err(e) => {
            tracing::error!(error = %e, "failed to resolve base directory");
            std::process::exit(1);
        }
    };

    let pool = Arc::new(ProcessPool::new());
    let state = AppState::new(paths, pool.clone(), pool);

    for session in state.registry.all() {
        if !session.status.is_terminal() {
            state.spawn_monitor(session.session_id);
        }
    }

    let addr = config::rpc_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr, "failed to bind RPC listener");
            std::process::exit(1);
        }
    };
    tracing::info!(addr, "ccmasterd listening");

    let router = rpc::router(state.clone());
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    if let Err(e) = state.registry.snapshot() {
        tracing::warn!(error = %e, "failed to write final session snapshot");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
