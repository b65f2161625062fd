//! Client traits and implementations for queue operations.

use crate::account::StorageAccount;
use crate::error::{QueueError, ValidationError};
use crate::message::{
    never_expires, EnqueuedMessage, Message, PeekedMessage, QueueHandle, QueueName,
    QueueProperties, ReceiptHandle, ReceivedMessage, NEVER_EXPIRES_SECONDS,
};
use crate::provider::{InMemoryConfig, ProviderConfig, ProviderType, QueueConfig};
use crate::providers::{AzureStorageQueueProvider, InMemoryProvider};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use std::future::Future;
use tracing::{debug, instrument};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Shortest lease a dequeue may take, in seconds
const MIN_LEASE_SECONDS: i64 = 1;

fn is_whole_seconds(duration: Duration) -> bool {
    duration.subsec_nanos() == 0
}

/// Main interface for queue operations across all providers
///
/// Every call suspends on provider I/O. Nothing is retried internally;
/// callers decide retry policy from [`QueueError::is_transient`].
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Create the queue if it does not exist and return a handle to it
    async fn ensure_queue(&self, name: &QueueName) -> Result<QueueHandle, QueueError>;

    /// Reference a queue without contacting the service
    fn queue(&self, name: QueueName) -> QueueHandle;

    /// Fetch queue attributes including the approximate message count
    async fn queue_properties(&self, queue: &QueueHandle) -> Result<QueueProperties, QueueError>;

    /// Append a message to the queue
    async fn enqueue(
        &self,
        queue: &QueueHandle,
        message: Message,
    ) -> Result<EnqueuedMessage, QueueError>;

    /// Look at the head message without leasing it
    async fn peek(&self, queue: &QueueHandle) -> Result<Option<PeekedMessage>, QueueError>;

    /// Look at up to `max_messages` messages from the head without leasing them
    async fn peek_messages(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
    ) -> Result<Vec<PeekedMessage>, QueueError>;

    /// Lease the head message for `visibility_timeout`
    ///
    /// The timeout is whole seconds, from one second up to seven days.
    async fn dequeue(
        &self,
        queue: &QueueHandle,
        visibility_timeout: Duration,
    ) -> Result<Option<ReceivedMessage>, QueueError>;

    /// Lease up to `max_messages` messages for `visibility_timeout`
    async fn dequeue_batch(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Replace content and/or visibility of a leased message
    ///
    /// Returns the new lease; the one passed in is no longer valid.
    async fn update_message(
        &self,
        receipt: &ReceiptHandle,
        new_content: Option<Bytes>,
        visibility_timeout: Duration,
    ) -> Result<ReceiptHandle, QueueError>;

    /// Remove a leased message permanently
    async fn delete_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;

    /// Remove the queue and every message in it
    async fn delete_queue(&self, queue: &QueueHandle) -> Result<(), QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// Interface implemented by specific queue providers (Azure, in-memory)
#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Create queue if absent
    async fn create_queue(&self, queue: &QueueName) -> Result<(), QueueError>;

    /// Fetch queue attributes
    async fn get_properties(&self, queue: &QueueName) -> Result<QueueProperties, QueueError>;

    /// Put a message
    async fn put_message(
        &self,
        queue: &QueueName,
        message: &Message,
    ) -> Result<EnqueuedMessage, QueueError>;

    /// Peek messages
    async fn peek_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
    ) -> Result<Vec<PeekedMessage>, QueueError>;

    /// Get (lease) messages
    async fn get_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Update a leased message
    async fn update_message(
        &self,
        receipt: &ReceiptHandle,
        new_content: Option<&Bytes>,
        visibility_timeout: Duration,
    ) -> Result<ReceiptHandle, QueueError>;

    /// Delete a leased message
    async fn delete_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;

    /// Delete queue
    async fn delete_queue(&self, queue: &QueueName) -> Result<(), QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// Factory for creating queue clients with appropriate providers
pub struct QueueClientFactory;

impl QueueClientFactory {
    /// Create queue client from configuration
    pub fn create_client(config: QueueConfig) -> Result<Box<dyn QueueClient>, QueueError> {
        let provider: Box<dyn QueueProvider> = match &config.provider {
            ProviderConfig::InMemory(in_memory_config) => {
                Box::new(InMemoryProvider::new(in_memory_config.clone()))
            }
            ProviderConfig::AzureStorage(azure_config) => {
                let account = StorageAccount::from_connection_string(&azure_config.connection_string)?;
                Box::new(AzureStorageQueueProvider::new(
                    account,
                    config.operation_timeout(),
                )?)
            }
        };

        Ok(Box::new(StandardQueueClient::new(provider, config)))
    }

    /// Create test client with in-memory provider
    pub fn create_test_client() -> Box<dyn QueueClient> {
        let provider = InMemoryProvider::new(InMemoryConfig::default());
        let config = QueueConfig::default();
        Box::new(StandardQueueClient::new(Box::new(provider), config))
    }
}

/// Standard queue client implementation
///
/// Validates arguments against provider limits, bounds each call by the
/// configured operation timeout, and forwards to the provider.
pub struct StandardQueueClient {
    provider: Box<dyn QueueProvider>,
    config: QueueConfig,
}

impl StandardQueueClient {
    /// Create new standard queue client with provider
    pub fn new(provider: Box<dyn QueueProvider>, config: QueueConfig) -> Self {
        Self { provider, config }
    }

    /// Visibility timeout to use when the caller has no preference
    pub fn default_visibility_timeout(&self) -> Duration {
        self.config.default_visibility_timeout()
    }

    /// Run a provider call under the configured operation timeout
    async fn bounded<T, F>(&self, operation: F) -> Result<T, QueueError>
    where
        F: Future<Output = Result<T, QueueError>> + Send,
    {
        let limit = self.config.operation_timeout();
        match limit.to_std() {
            Ok(std_limit) if !std_limit.is_zero() => {
                tokio::time::timeout(std_limit, operation)
                    .await
                    .map_err(|_| QueueError::Timeout { duration: limit })?
            }
            _ => operation.await,
        }
    }

    fn validate_batch_size(&self, max_messages: u32) -> Result<(), QueueError> {
        let max_size = self.provider.provider_type().max_dequeue_batch();
        if max_messages == 0 {
            return Err(ValidationError::OutOfRange {
                field: "max_messages".to_string(),
                message: format!("must be between 1 and {}", max_size),
            }
            .into());
        }
        if max_messages > max_size {
            return Err(QueueError::BatchTooLarge {
                size: max_messages as usize,
                max_size: max_size as usize,
            });
        }
        Ok(())
    }

    /// Check a visibility duration: whole seconds between `min` and the provider maximum
    fn validate_visibility(
        &self,
        field: &str,
        visibility_timeout: Duration,
        min: Duration,
    ) -> Result<(), QueueError> {
        let max = self.provider.provider_type().max_visibility_timeout();
        if !is_whole_seconds(visibility_timeout) {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                message: "must be a whole number of seconds".to_string(),
            }
            .into());
        }
        if visibility_timeout < min || visibility_timeout > max {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                message: format!(
                    "must be between {} and {} seconds",
                    min.num_seconds(),
                    max.num_seconds()
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Check a message time-to-live: never-expires or whole seconds up to the provider maximum
    fn validate_ttl(&self, ttl: Duration) -> Result<(), QueueError> {
        if never_expires(ttl) {
            return Ok(());
        }

        let max = self.provider.provider_type().max_message_ttl();
        if !is_whole_seconds(ttl) {
            return Err(ValidationError::InvalidFormat {
                field: "time_to_live".to_string(),
                message: "must be a whole number of seconds".to_string(),
            }
            .into());
        }
        if ttl < Duration::seconds(1) || ttl > max {
            return Err(ValidationError::OutOfRange {
                field: "time_to_live".to_string(),
                message: format!(
                    "must be {} (never expires) or between 1 and {} seconds",
                    NEVER_EXPIRES_SECONDS,
                    max.num_seconds()
                ),
            }
            .into());
        }
        Ok(())
    }

    fn validate_body(&self, body: &Bytes) -> Result<(), QueueError> {
        // Bodies travel base64-encoded
        let encoded_size = body.len().div_ceil(3) * 4;
        let max_size = self.provider.provider_type().max_message_size();
        if encoded_size > max_size {
            return Err(QueueError::MessageTooLarge {
                size: encoded_size,
                max_size,
            });
        }
        Ok(())
    }

    fn validate_receipt(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        if receipt.provider_type() != self.provider.provider_type() {
            return Err(ValidationError::InvalidFormat {
                field: "receipt".to_string(),
                message: format!(
                    "receipt issued by {} cannot be used with {}",
                    receipt.provider_type(),
                    self.provider.provider_type()
                ),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl QueueClient for StandardQueueClient {
    #[instrument(skip(self), fields(provider = %self.provider.provider_type()))]
    async fn ensure_queue(&self, name: &QueueName) -> Result<QueueHandle, QueueError> {
        self.bounded(self.provider.create_queue(name)).await?;
        debug!(queue = %name, "Queue ready");
        Ok(self.queue(name.clone()))
    }

    fn queue(&self, name: QueueName) -> QueueHandle {
        QueueHandle::new(name, self.provider.provider_type())
    }

    async fn queue_properties(&self, queue: &QueueHandle) -> Result<QueueProperties, QueueError> {
        self.bounded(self.provider.get_properties(queue.name())).await
    }

    #[instrument(skip(self, message), fields(queue = %queue, size = message.body.len()))]
    async fn enqueue(
        &self,
        queue: &QueueHandle,
        message: Message,
    ) -> Result<EnqueuedMessage, QueueError> {
        self.validate_body(&message.body)?;
        if let Some(ttl) = message.time_to_live {
            self.validate_ttl(ttl)?;
        }
        if let Some(delay) = message.initial_visibility_delay {
            self.validate_visibility("visibility_delay", delay, Duration::zero())?;
        }

        let enqueued = self
            .bounded(self.provider.put_message(queue.name(), &message))
            .await?;
        debug!(message_id = %enqueued.message_id, "Message enqueued");
        Ok(enqueued)
    }

    async fn peek(&self, queue: &QueueHandle) -> Result<Option<PeekedMessage>, QueueError> {
        let messages = self.peek_messages(queue, 1).await?;
        Ok(messages.into_iter().next())
    }

    async fn peek_messages(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
    ) -> Result<Vec<PeekedMessage>, QueueError> {
        self.validate_batch_size(max_messages)?;
        self.bounded(self.provider.peek_messages(queue.name(), max_messages))
            .await
    }

    async fn dequeue(
        &self,
        queue: &QueueHandle,
        visibility_timeout: Duration,
    ) -> Result<Option<ReceivedMessage>, QueueError> {
        let messages = self.dequeue_batch(queue, 1, visibility_timeout).await?;
        Ok(messages.into_iter().next())
    }

    #[instrument(skip(self), fields(queue = %queue))]
    async fn dequeue_batch(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        self.validate_batch_size(max_messages)?;
        self.validate_visibility(
            "visibility_timeout",
            visibility_timeout,
            Duration::seconds(MIN_LEASE_SECONDS),
        )?;

        let messages = self
            .bounded(
                self.provider
                    .get_messages(queue.name(), max_messages, visibility_timeout),
            )
            .await?;
        debug!(count = messages.len(), "Messages leased");
        Ok(messages)
    }

    #[instrument(skip(self, receipt, new_content), fields(message_id = %receipt.message_id()))]
    async fn update_message(
        &self,
        receipt: &ReceiptHandle,
        new_content: Option<Bytes>,
        visibility_timeout: Duration,
    ) -> Result<ReceiptHandle, QueueError> {
        self.validate_receipt(receipt)?;
        self.validate_visibility("visibility_timeout", visibility_timeout, Duration::zero())?;
        if let Some(ref body) = new_content {
            self.validate_body(body)?;
        }

        self.bounded(self.provider.update_message(
            receipt,
            new_content.as_ref(),
            visibility_timeout,
        ))
        .await
    }

    #[instrument(skip(self, receipt), fields(message_id = %receipt.message_id()))]
    async fn delete_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        self.validate_receipt(receipt)?;
        self.bounded(self.provider.delete_message(receipt)).await
    }

    #[instrument(skip(self), fields(queue = %queue))]
    async fn delete_queue(&self, queue: &QueueHandle) -> Result<(), QueueError> {
        self.bounded(self.provider.delete_queue(queue.name())).await
    }

    fn provider_type(&self) -> ProviderType {
        self.provider.provider_type()
    }
}
