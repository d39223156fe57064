use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use parlor::bus::EventBus;
use parlor::config::Config;
use parlor::directory::ParticipantDirectory;
use parlor::repository::ChatRepository;
use parlor::server;
use parlor::store::Store;
use parlor::upload::{DisabledUploader, HttpUploader, ObjectUploader};
use parlor::ChatService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default filter if RUST_LOG is not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("Parlor daemon starting...");

    let bus = Arc::new(EventBus::with_capacity(config.bus_capacity));

    info!("Initializing store at {}", config.db_path.display());
    let store = Store::new(&config.db_path)
        .await
        .with_context(|| format!("Failed to open store at {}", config.db_path.display()))?;
    store.init().await.context("Failed to initialize schema")?;

    let directory = Arc::new(ParticipantDirectory::from_store(&store));

    let uploader: Arc<dyn ObjectUploader> = match &config.upload_url {
        Some(url) => {
            info!("Photo uploads go to {}", url);
            Arc::new(
                HttpUploader::new(url.clone(), config.upload_token.clone())
                    .context("Failed to build upload client")?,
            )
        }
        None => {
            warn!("PARLOR_UPLOAD_URL not set, group photo uploads are disabled");
            Arc::new(DisabledUploader)
        }
    };

    let repo: Arc<dyn ChatRepository> = Arc::new(store);
    let service = Arc::new(ChatService::new(
        repo,
        directory,
        bus,
        uploader,
        config.message_limit,
    ));
    let app = server::router(service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!("Starting chat server on port {}", config.port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        res = axum::serve(listener, app) => {
            if let Err(e) = res {
                warn!("Server stopped with error: {}", e);
            }
        }
    }

    Ok(())
}
