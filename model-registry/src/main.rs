use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use model_registry::{
    config::Config,
    db,
    observe::Telemetry,
    repository::SqliteModelRepository,
    router::app_router,
    rpc::ModelRegistryRpc,
    service::RegistryService,
    state::AppState,
};

/// Resolves once SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender also means shutdown.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to read REGISTRY_* configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();
    info!(?config, "starting model registry");

    // Generate a managed connection for the SQLite DB, with the schema at the latest version.
    let conn = db::open(&config.db_path).context("failed to load DB")?;

    let telemetry = Telemetry::new("model-registry");
    let repo = Arc::new(SqliteModelRepository::new(conn));
    let service = Arc::new(RegistryService::new(repo, telemetry.clone()));

    let state = AppState::new(service.clone(), telemetry.clone());
    let app = app_router(&state).with_state(state);
    let rpc = ModelRegistryRpc::new(service, telemetry);

    let (stop_tx, stop_rx) = watch::channel(false);

    let http_addr = config.http_addr();
    let http = axum::Server::try_bind(&http_addr)
        .with_context(|| format!("failed to bind REST listener on {http_addr}"))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(wait_for(stop_rx.clone()));
    info!(%http_addr, "REST server listening");

    let grpc_addr = config.grpc_addr();
    let grpc = tonic::transport::Server::builder()
        .add_service(rpc.into_server())
        .serve_with_shutdown(grpc_addr, wait_for(stop_rx));
    info!(%grpc_addr, "RPC server listening");

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested, draining connections");
        let _ = stop_tx.send(true);
    });

    tokio::try_join!(
        async { http.await.context("REST server failed") },
        async { grpc.await.context("RPC server failed") },
    )?;

    info!("model registry stopped");
    Ok(())
}
