//! # Storage Queue Service
//!
//! Binary entry point for the storage queue HTTP front door.
//!
//! This executable:
//! - Loads configuration from files and the environment
//! - Initializes logging, then reports where the configuration came from
//! - Builds the queue client
//! - Starts the HTTP server from storage-queue-api

mod settings;

use anyhow::Context;
use std::sync::Arc;
use storage_queue::{QueueClient, QueueClientFactory};
use storage_queue_api::{start_server, LoggingConfig, ServiceError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = settings::load_config().context("Failed to load service configuration")?;
    initialize_logging(&loaded.config.logging)?;
    loaded.log_sources();
    let service_config = loaded.config;

    let queue_config = service_config.storage.queue_config()?;
    info!(
        provider = %queue_config.provider.provider_type(),
        output_queue = %service_config.queues.output,
        input_queue = %service_config.queues.input,
        "Starting storage queue service"
    );

    let client: Arc<dyn QueueClient> = Arc::from(
        QueueClientFactory::create_client(queue_config).context("Failed to build queue client")?,
    );

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, client).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
            ServiceError::QueueSetup(_) => 4,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}

/// Initialize logging from configuration; `RUST_LOG` takes precedence
fn initialize_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }
    Ok(())
}
