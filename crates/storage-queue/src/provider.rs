//! Provider types and configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderType {
    AzureStorage,
    InMemory,
}

impl ProviderType {
    /// Get maximum encoded message size for provider
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::AzureStorage => 64 * 1024, // 64KB
            Self::InMemory => 64 * 1024,
        }
    }

    /// Get maximum number of messages a single dequeue may lease
    pub fn max_dequeue_batch(&self) -> u32 {
        match self {
            Self::AzureStorage => 32,
            Self::InMemory => 32,
        }
    }

    /// Get the longest visibility timeout the provider accepts
    pub fn max_visibility_timeout(&self) -> Duration {
        Duration::days(7)
    }

    /// Get the longest finite message time-to-live the provider accepts
    pub fn max_message_ttl(&self) -> Duration {
        Duration::seconds(i32::MAX as i64)
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AzureStorage => write!(f, "AzureStorage"),
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

/// Configuration for queue client initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub provider: ProviderConfig,

    /// Upper bound for a single client call, in seconds
    #[serde(default = "default_operation_timeout_seconds")]
    pub operation_timeout_seconds: u64,

    /// Visibility timeout used when callers do not pick one, in seconds
    #[serde(default = "default_visibility_timeout_seconds")]
    pub default_visibility_timeout_seconds: u64,
}

fn default_operation_timeout_seconds() -> u64 {
    30
}

fn default_visibility_timeout_seconds() -> u64 {
    30
}

impl QueueConfig {
    /// Create configuration for the given provider with default timeouts
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            operation_timeout_seconds: default_operation_timeout_seconds(),
            default_visibility_timeout_seconds: default_visibility_timeout_seconds(),
        }
    }

    /// Configuration for an Azure storage account connection string
    pub fn azure_storage(connection_string: impl Into<String>) -> Self {
        Self::new(ProviderConfig::AzureStorage(AzureStorageConfig {
            connection_string: connection_string.into(),
        }))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::seconds(self.operation_timeout_seconds as i64)
    }

    pub fn default_visibility_timeout(&self) -> Duration {
        Duration::seconds(self.default_visibility_timeout_seconds as i64)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(ProviderConfig::InMemory(InMemoryConfig::default()))
    }
}

/// Provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    AzureStorage(AzureStorageConfig),
    InMemory(InMemoryConfig),
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::AzureStorage(_) => ProviderType::AzureStorage,
            Self::InMemory(_) => ProviderType::InMemory,
        }
    }
}

/// Azure Queue Storage configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AzureStorageConfig {
    /// Storage account connection string
    pub connection_string: String,
}

impl std::fmt::Debug for AzureStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureStorageConfig")
            .field("connection_string", &"<redacted>")
            .finish()
    }
}

/// In-memory provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Maximum number of messages per queue
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Message time-to-live applied when a message does not set one, in seconds
    #[serde(default = "default_message_ttl_seconds")]
    pub default_message_ttl_seconds: u64,

    /// How long a deleted queue name stays unusable, in seconds
    #[serde(default)]
    pub queue_delete_cooldown_seconds: u64,
}

fn default_max_queue_size() -> usize {
    10000
}

fn default_message_ttl_seconds() -> u64 {
    7 * 24 * 60 * 60
}

impl InMemoryConfig {
    pub fn default_message_ttl(&self) -> Duration {
        Duration::seconds(self.default_message_ttl_seconds as i64)
    }

    pub fn queue_delete_cooldown(&self) -> Duration {
        Duration::seconds(self.queue_delete_cooldown_seconds as i64)
    }
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            default_message_ttl_seconds: default_message_ttl_seconds(),
            queue_delete_cooldown_seconds: 0,
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
