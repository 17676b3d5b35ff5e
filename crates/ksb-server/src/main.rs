mod config;
mod seed;

use std::sync::Arc;

use tracing::info;

use ksb_api::{AppState, AppStateInner};
use ksb_chat::{ChatService, FriendsOnly};
use ksb_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ksb=debug,ksb_api=debug,ksb_chat=info,ksb_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and seed it before serving anything
    let db = Arc::new(Database::open(&config.db_path)?);
    seed::run(&db, config.admin.as_ref())?;

    let mut chat = ChatService::new(db);
    if config.dm_requires_friendship {
        info!("Direct messages require an accepted friendship");
        chat = chat.with_policy(FriendsOnly);
    }

    let state: AppState = Arc::new(AppStateInner {
        chat,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl_days: config.token_ttl_days,
    });

    let app = ksb_api::router(state);

    info!("KSB server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
