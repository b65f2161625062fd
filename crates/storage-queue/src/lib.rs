//! # Storage Queue
//!
//! At-least-once work queue client for Azure Queue Storage, with an
//! in-memory provider for tests and local development.
//!
//! This library provides:
//! - Queue lifecycle operations (ensure, properties, delete)
//! - Enqueue, peek and leased dequeue with visibility timeouts
//! - Lease updates and deletes through pop receipts
//! - A process-then-delete helper for batches
//!
//! ## Module Organization
//!
//! - [`account`] - Connection string parsing and credentials
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message structures and receipt handles
//! - [`provider`] - Provider types and configuration
//! - [`client`] - Client traits and implementations
//! - [`providers`] - Azure Storage and in-memory providers
//! - [`processing`] - Batch processing helper
//!
//! ## Delivery Contract
//!
//! A dequeued message stays invisible to other consumers until its
//! visibility timeout elapses or it is deleted. Messages that are not
//! deleted in time are delivered again, so handlers must be idempotent.

// Module declarations
pub mod account;
pub mod client;
pub mod error;
pub mod message;
pub mod processing;
pub mod provider;
pub mod providers;

// Re-export commonly used types at crate root for convenience
pub use account::{
    StorageAccount, StorageCredential, DEVELOPMENT_ACCOUNT_KEY, DEVELOPMENT_ACCOUNT_NAME,
};
pub use client::{QueueClient, QueueClientFactory, QueueProvider, StandardQueueClient};
pub use error::{ConfigurationError, QueueError, SerializationError, ValidationError};
pub use message::{
    EnqueuedMessage, Message, MessageId, PeekedMessage, QueueHandle, QueueName, QueueProperties,
    ReceiptHandle, ReceivedMessage, Timestamp, NEVER_EXPIRES_SECONDS,
};
pub use processing::{process_batch, BatchOutcome};
pub use provider::{AzureStorageConfig, InMemoryConfig, ProviderConfig, ProviderType, QueueConfig};
pub use providers::{AzureStorageQueueProvider, InMemoryProvider};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
