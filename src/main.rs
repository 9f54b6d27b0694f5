//! build-tracker server: config from env, database bootstrap, API with
//! graceful shutdown.

use build_tracker::error::ResultExt;
use build_tracker::{
    api_mux, ensure_database_exists, ensure_schema, logger, status_check, store, AppError, AppState,
    Config, Shutdown,
};
use tokio::net::TcpListener;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    logger::init()?;

    let span = logger::root_span(env!("CARGO_PKG_NAME"), &config.app_version);
    if let Err(err) = run(config).instrument(span).await {
        tracing::error!(error = %err, "service stopped with error");
        return Err(err.into());
    }
    Ok(())
}

async fn run(config: Config) -> Result<(), AppError> {
    tracing::info!(addr = %config.addr(), "starting service");

    ensure_database_exists(&config.database_url)
        .await
        .context("ensure database")?;
    let pool = store::connect(
        &config.database_url,
        config.db_max_open_conns,
        config.db_min_conns,
    )?;
    status_check(&pool, config.status_check_timeout)
        .await
        .context("waiting for database")?;
    ensure_schema(&pool).await.context("ensure schema")?;

    let addr = config.addr();
    let shutdown_timeout = config.shutdown_timeout;
    let (shutdown, mut requests) = Shutdown::channel();
    let app = api_mux(AppState::new(pool.clone(), config), shutdown);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("bind {addr}: {e}")))?;
    tracing::info!(%addr, "listening");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                stop_rx.await.ok();
            })
            .await
    });

    tokio::select! {
        _ = shutdown_signal() => {}
        reason = requests.recv() => {
            tracing::warn!(
                reason = reason.as_deref().unwrap_or("channel closed"),
                "shutdown requested by api"
            );
        }
        res = &mut server => {
            pool.close().await;
            return match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(AppError::Internal(format!("server: {e}"))),
                Err(e) => Err(AppError::Internal(format!("server task: {e}"))),
            };
        }
    }

    let _ = stop_tx.send(());
    tracing::info!(timeout_secs = shutdown_timeout.as_secs(), "draining connections");
    match tokio::time::timeout(shutdown_timeout, &mut server).await {
        Ok(Ok(Ok(()))) => tracing::info!("shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "server task failed"),
        Err(_) => {
            tracing::warn!("graceful shutdown timed out, aborting open connections");
            server.abort();
        }
    }
    pool.close().await;
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, initiating graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
    }
}
