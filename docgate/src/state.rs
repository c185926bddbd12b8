use anyhow::Context;
use docgate_core::{
    backend::StoreBackendBuilder,
    error::StoreResult,
    store::DocumentStore,
};
use docgate_memory::InMemoryStore;
use tracing::info;

use crate::{
    config::{GatewayConfig, StoreConfig},
    mail::Mailer,
};

/// Shared by every request handler. Cloning shares the store and the mail transport.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: DocumentStore,
    pub mailer: Mailer,
    /// Name of the configured database, reported by the service banner.
    pub database: String,
}

impl AppState {
    pub fn new(store: DocumentStore, mailer: Mailer, database: impl Into<String>) -> Self {
        Self {
            store,
            mailer,
            database: database.into(),
        }
    }
}

/// Connects the configured backend.
pub async fn build_store(config: &StoreConfig) -> StoreResult<DocumentStore> {
    match config {
        StoreConfig::Memory { database } => {
            let backend = InMemoryStore::builder()
                .database(database.clone())
                .build()
                .await?;

            Ok(DocumentStore::new(backend))
        },
        #[cfg(feature = "mongodb")]
        StoreConfig::MongoDb { uri, database } => {
            let backend = docgate_mongodb::MongoDbStore::builder(uri.expose(), database)
                .app_name(env!("CARGO_PKG_NAME"))
                .build()
                .await?;

            Ok(DocumentStore::new(backend))
        },
        #[cfg(not(feature = "mongodb"))]
        StoreConfig::MongoDb { .. } => Err(docgate_core::error::StoreError::Initialization(
            "this build does not include the mongodb backend; set STORE_BACKEND=memory".to_string(),
        )),
    }
}

pub async fn init_app_state(config: &GatewayConfig) -> anyhow::Result<AppState> {
    let store = build_store(&config.store)
        .await
        .with_context(|| format!("failed to initialize the {} store", config.store.backend_name()))?;

    let mailer = Mailer::from_config(&config.email).context("failed to initialize the email transport")?;

    info!(
        backend = config.store.backend_name(),
        database = config.store.database(),
        email = mailer.transport_name().unwrap_or("not_configured"),
        "application state initialized"
    );

    Ok(AppState::new(store, mailer, config.store.database()))
}
