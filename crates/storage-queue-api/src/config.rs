//! Configuration types for the HTTP front door

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use storage_queue::{QueueConfig, QueueName};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Queue the front door writes greetings to
pub const DEFAULT_OUTPUT_QUEUE: &str = "outqueue";

/// Queue the front door peeks on every request
pub const DEFAULT_INPUT_QUEUE: &str = "inqueue";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Queues used by the front door
    pub queues: QueuesConfig,

    /// Storage account settings
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the values that cannot be validated by deserialization alone
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must not be 0".to_string(),
            });
        }

        self.queues.output_queue()?;
        self.queues.input_queue()?;
        self.storage.queue_config()?;
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            enable_cors: true,
        }
    }
}

/// Queue names used by the front door
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuesConfig {
    /// Queue the greeting is enqueued onto
    pub output: String,

    /// Queue peeked on every request
    pub input: String,

    /// Create both queues when the service starts instead of only referencing them
    pub create_queues_on_startup: bool,
}

impl QueuesConfig {
    pub fn output_queue(&self) -> Result<QueueName, ConfigError> {
        parse_queue_name("queues.output", &self.output)
    }

    pub fn input_queue(&self) -> Result<QueueName, ConfigError> {
        parse_queue_name("queues.input", &self.input)
    }
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            output: DEFAULT_OUTPUT_QUEUE.to_string(),
            input: DEFAULT_INPUT_QUEUE.to_string(),
            create_queues_on_startup: false,
        }
    }
}

fn parse_queue_name(key: &str, value: &str) -> Result<QueueName, ConfigError> {
    QueueName::new(value.to_string()).map_err(|e| ConfigError::Invalid {
        message: format!("{}: {}", key, e),
    })
}

/// Storage account configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage account connection string
    pub connection_string: Option<String>,

    /// Keep messages in process memory instead of a storage account
    pub in_memory: bool,

    /// Upper bound for a single queue call, in seconds
    pub operation_timeout_seconds: u64,
}

impl StorageConfig {
    /// Build the queue client configuration
    pub fn queue_config(&self) -> Result<QueueConfig, ConfigError> {
        let mut config = if self.in_memory {
            QueueConfig::default()
        } else {
            let connection_string =
                self.connection_string
                    .as_deref()
                    .ok_or_else(|| ConfigError::Missing {
                        key: "storage.connection_string".to_string(),
                    })?;
            QueueConfig::azure_storage(connection_string)
        };

        config.operation_timeout_seconds = self.operation_timeout_seconds;
        Ok(config)
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("in_memory", &self.in_memory)
            .field("operation_timeout_seconds", &self.operation_timeout_seconds)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            in_memory: false,
            operation_timeout_seconds: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
