use std::net::TcpListener;
use std::sync::Arc;

use urlshort::configuration::{get_configuration, StorageBackend};
use urlshort::startup::run;
use urlshort::store::{InMemoryStore, PgStore, UrlStore, UserStore};
use urlshort::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, message: &'static str) -> std::io::Error {
    std::io::Error::new(kind, message)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    init_telemetry(&configuration.application.log_level);
    tracing::info!("Configuration loaded");

    let engine = configuration.jwt.engine().map_err(|e| {
        tracing::error!(error = %e, "Invalid token settings");
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let (users, urls): (Arc<dyn UserStore>, Arc<dyn UrlStore>) = match configuration.application.storage {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database");
            let store = PgStore::connect(&configuration.database).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to prepare database");
                startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
            })?;
            let store = Arc::new(store);
            (store.clone(), store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let store = Arc::new(InMemoryStore::new());
            (store.clone(), store)
        }
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    run(listener, users, urls, engine)?.await
}
