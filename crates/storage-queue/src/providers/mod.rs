//! Queue provider implementations.
//!
//! This module contains concrete implementations of the `QueueProvider`
//! trait for the supported queue backends.

pub mod azure;
pub mod memory;

pub use azure::{AzureStorageQueueProvider, STORAGE_API_VERSION};
pub use memory::InMemoryProvider;
