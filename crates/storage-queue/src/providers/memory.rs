//! In-memory queue provider implementation for testing and development.
//!
//! This module provides a fully functional in-memory queue implementation that:
//! - Implements visibility timeouts with pop receipts that change on every lease
//! - Tracks dequeue counts and message time-to-live
//! - Simulates the cool-down period after a queue is deleted
//! - Provides thread-safe concurrent access
//!
//! This provider is intended for:
//! - Unit testing of queue consumers
//! - Running the demo and the HTTP front door without a storage account

use crate::client::QueueProvider;
use crate::error::QueueError;
use crate::message::{
    never_expires, EnqueuedMessage, Message, MessageId, PeekedMessage, QueueName, QueueProperties,
    ReceiptHandle, ReceivedMessage, Timestamp,
};
use crate::provider::{InMemoryConfig, ProviderType};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all queues
struct QueueStorage {
    queues: HashMap<QueueName, InMemoryQueue>,
    /// Deleted queue names and the time they become usable again
    deleted: HashMap<QueueName, Timestamp>,
    config: InMemoryConfig,
}

impl QueueStorage {
    fn new(config: InMemoryConfig) -> Self {
        Self {
            queues: HashMap::new(),
            deleted: HashMap::new(),
            config,
        }
    }

    /// Forget deleted names whose cooldown has elapsed
    fn purge_elapsed_cooldowns(&mut self) {
        let now = Timestamp::now();
        self.deleted.retain(|_, available_at| now < *available_at);
    }

    /// Get an existing queue with expired messages already dropped
    fn queue_mut(&mut self, queue_name: &QueueName) -> Result<&mut InMemoryQueue, QueueError> {
        let queue = self
            .queues
            .get_mut(queue_name)
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_name: queue_name.to_string(),
            })?;
        queue.purge_expired();
        Ok(queue)
    }
}

/// Internal queue state for a single queue
struct InMemoryQueue {
    /// Messages in insertion order
    messages: Vec<StoredMessage>,
}

impl InMemoryQueue {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    fn purge_expired(&mut self) {
        let now = Timestamp::now();
        self.messages.retain(|m| !m.is_expired_at(&now));
    }

    fn visible_messages(&mut self, max_messages: u32) -> impl Iterator<Item = &mut StoredMessage> {
        let now = Timestamp::now();
        self.messages
            .iter_mut()
            .filter(move |m| m.is_visible_at(&now))
            .take(max_messages as usize)
    }

    /// Find the message a receipt refers to and check the lease is still held
    fn leased_message(
        &mut self,
        receipt: &ReceiptHandle,
    ) -> Result<(usize, &mut StoredMessage), QueueError> {
        let index = self
            .messages
            .iter()
            .position(|m| &m.message_id == receipt.message_id())
            .ok_or_else(|| QueueError::MessageNotFound {
                message_id: receipt.message_id().to_string(),
            })?;

        let message = &mut self.messages[index];
        let lease_held = message.pop_receipt.as_deref() == Some(receipt.pop_receipt())
            && !message.is_visible_at(&Timestamp::now());
        if !lease_held {
            return Err(QueueError::LeaseExpired {
                message_id: receipt.message_id().to_string(),
            });
        }

        Ok((index, message))
    }
}

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    message_id: MessageId,
    body: Bytes,
    inserted_at: Timestamp,
    /// `None` for messages that never expire
    expires_at: Option<Timestamp>,
    visible_at: Timestamp,
    dequeue_count: u32,
    /// Receipt of the most recent lease, if the message was ever dequeued
    pop_receipt: Option<String>,
}

impl StoredMessage {
    fn from_message(message: &Message, default_ttl: Duration) -> Self {
        let now = Timestamp::now();
        let ttl = message.time_to_live.unwrap_or(default_ttl);
        let delay = message.initial_visibility_delay.unwrap_or_else(Duration::zero);
        let expires_at = if never_expires(ttl) {
            None
        } else {
            Some(now.saturating_add(ttl))
        };

        Self {
            message_id: MessageId::new(),
            body: message.body.clone(),
            expires_at,
            visible_at: now.saturating_add(delay),
            inserted_at: now,
            dequeue_count: 0,
            pop_receipt: None,
        }
    }

    fn is_expired_at(&self, now: &Timestamp) -> bool {
        self.expires_at.as_ref().is_some_and(|expires_at| now >= expires_at)
    }

    fn is_visible_at(&self, now: &Timestamp) -> bool {
        *now >= self.visible_at
    }

    /// Start a new lease, invalidating any previous receipt
    fn lease(&mut self, visibility_timeout: Duration) -> String {
        let receipt = uuid::Uuid::new_v4().to_string();
        self.visible_at = Timestamp::after(visibility_timeout);
        self.pop_receipt = Some(receipt.clone());
        receipt
    }

    fn to_peeked(&self) -> PeekedMessage {
        PeekedMessage {
            message_id: self.message_id.clone(),
            body: self.body.clone(),
            dequeue_count: self.dequeue_count,
            inserted_at: self.inserted_at.clone(),
            expires_at: self.expires_at.clone(),
        }
    }
}

// ============================================================================
// InMemoryProvider
// ============================================================================

/// In-memory queue provider implementation
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct InMemoryProvider {
    storage: Arc<RwLock<QueueStorage>>,
}

impl InMemoryProvider {
    /// Create new in-memory provider with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(QueueStorage::new(config))),
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, QueueStorage>, QueueError> {
        self.storage.write().map_err(|_| QueueError::ProviderError {
            provider: ProviderType::InMemory.to_string(),
            code: "LockPoisoned".to_string(),
            message: "queue storage lock poisoned by a panicked writer".to_string(),
        })
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl QueueProvider for InMemoryProvider {
    async fn create_queue(&self, queue: &QueueName) -> Result<(), QueueError> {
        let mut storage = self.write()?;
        storage.purge_elapsed_cooldowns();

        if storage.deleted.contains_key(queue) {
            return Err(QueueError::QueueBeingDeleted {
                queue_name: queue.to_string(),
            });
        }

        storage
            .queues
            .entry(queue.clone())
            .or_insert_with(InMemoryQueue::new);
        Ok(())
    }

    async fn get_properties(&self, queue: &QueueName) -> Result<QueueProperties, QueueError> {
        let mut storage = self.write()?;
        let queue = storage.queue_mut(queue)?;

        Ok(QueueProperties {
            approximate_message_count: queue.messages.len() as u64,
        })
    }

    async fn put_message(
        &self,
        queue: &QueueName,
        message: &Message,
    ) -> Result<EnqueuedMessage, QueueError> {
        let mut storage = self.write()?;
        let max_queue_size = storage.config.max_queue_size;
        let default_ttl = storage.config.default_message_ttl();
        let queue = storage.queue_mut(queue)?;

        if queue.messages.len() >= max_queue_size {
            return Err(QueueError::ProviderError {
                provider: ProviderType::InMemory.to_string(),
                code: "QueueFull".to_string(),
                message: format!("queue holds the maximum of {} messages", max_queue_size),
            });
        }

        let stored = StoredMessage::from_message(message, default_ttl);
        let enqueued = EnqueuedMessage {
            message_id: stored.message_id.clone(),
            inserted_at: stored.inserted_at.clone(),
            expires_at: stored.expires_at.clone(),
        };
        queue.messages.push(stored);

        Ok(enqueued)
    }

    async fn peek_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
    ) -> Result<Vec<PeekedMessage>, QueueError> {
        let mut storage = self.write()?;
        let queue = storage.queue_mut(queue)?;

        Ok(queue
            .visible_messages(max_messages)
            .map(|m| m.to_peeked())
            .collect())
    }

    async fn get_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let mut storage = self.write()?;
        let queue_name = queue;
        let queue = storage.queue_mut(queue_name)?;

        let received = queue
            .visible_messages(max_messages)
            .map(|m| {
                m.dequeue_count += 1;
                let pop_receipt = m.lease(visibility_timeout);
                ReceivedMessage {
                    message_id: m.message_id.clone(),
                    body: m.body.clone(),
                    receipt_handle: ReceiptHandle::new(
                        queue_name.clone(),
                        m.message_id.clone(),
                        pop_receipt,
                        m.visible_at.clone(),
                        ProviderType::InMemory,
                    ),
                    dequeue_count: m.dequeue_count,
                    inserted_at: m.inserted_at.clone(),
                    expires_at: m.expires_at.clone(),
                }
            })
            .collect();

        Ok(received)
    }

    async fn update_message(
        &self,
        receipt: &ReceiptHandle,
        new_content: Option<&Bytes>,
        visibility_timeout: Duration,
    ) -> Result<ReceiptHandle, QueueError> {
        let mut storage = self.write()?;
        let queue = storage.queue_mut(receipt.queue())?;
        let (_, message) = queue.leased_message(receipt)?;

        if let Some(body) = new_content {
            message.body = body.clone();
        }
        let pop_receipt = message.lease(visibility_timeout);

        Ok(ReceiptHandle::new(
            receipt.queue().clone(),
            message.message_id.clone(),
            pop_receipt,
            message.visible_at.clone(),
            ProviderType::InMemory,
        ))
    }

    async fn delete_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let mut storage = self.write()?;
        let queue = storage.queue_mut(receipt.queue())?;
        let (index, _) = queue.leased_message(receipt)?;
        queue.messages.remove(index);
        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueName) -> Result<(), QueueError> {
        let mut storage = self.write()?;
        storage.purge_elapsed_cooldowns();

        if storage.queues.remove(queue).is_none() {
            return Err(QueueError::QueueNotFound {
                queue_name: queue.to_string(),
            });
        }

        let cooldown = storage.config.queue_delete_cooldown();
        if cooldown > Duration::zero() {
            storage
                .deleted
                .insert(queue.clone(), Timestamp::after(cooldown));
        }
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
