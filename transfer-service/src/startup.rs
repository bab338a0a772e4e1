//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;

use service_core::error::AppError;
use tokio::{net::TcpListener, signal};

use crate::config::{StorageBackend, TransferConfig};
use crate::services::{CredentialStore, Database, InMemoryStore};
use crate::utils::CredentialHasher;
use crate::{build_router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect the configured store, bind the listener and wire the state.
    ///
    /// Port 0 binds a random free port.
    pub async fn build(config: TransferConfig) -> Result<Self, AppError> {
        let store = open_store(&config).await?;
        let state = AppState::new(config.clone(), store, CredentialHasher::default());

        let addr = config.common.bind_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, storage = ?config.storage, "Transfer service bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        let app = build_router(self.state);

        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn open_store(config: &TransferConfig) -> Result<Arc<dyn CredentialStore>, AppError> {
    match (config.storage, config.database.as_ref()) {
        (StorageBackend::Memory, _) => {
            tracing::warn!("Using in-memory storage; state will not survive a restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        (StorageBackend::Postgres, Some(db)) => {
            let database = Database::new(&db.url, db.max_connections, db.min_connections).await?;
            database.run_migrations().await?;
            Ok(Arc::new(database))
        }
        (StorageBackend::Postgres, None) => Err(AppError::ConfigError(anyhow::anyhow!(
            "DATABASE_URL is required for the postgres storage backend"
        ))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
