use std::path::Path;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;

use scrum_board::{
    config::Config,
    db::{
        models::Board,
        repos::board::{ensure_default_board, ListBoards},
    },
    logging::init_tracing,
    Database,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.environment);

    tracing::info!(
        environment = ?config.environment,
        database = %config.database_url,
        "starting scrum board"
    );

    if let Some(parent) = Path::new(&config.database_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("creating database directory {}", parent.display())
            })?;
        }
    }

    let db = Database::open(&config.database_url, config.max_connections)
        .context("opening database")?;

    db.run(ensure_default_board).await?;
    let boards = db.run(|conn| Ok(Board::count(conn)?)).await?;
    tracing::info!(boards, "database ready");

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("binding {}", config.listen_addr()))?;
    tracing::info!("scrum board listening on {}", listener.local_addr()?);

    axum::serve(listener, scrum_board::app(db.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close();
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
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
                tracing::error!(%err, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received");
}
