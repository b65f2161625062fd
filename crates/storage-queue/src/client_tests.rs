//! Tests for queue client traits and implementations.

use super::*;
use crate::error::{ConfigurationError, QueueError};
use crate::message::{Message, MessageId, QueueName, ReceiptHandle, Timestamp};
use crate::provider::{ProviderType, QueueConfig};
use chrono::Duration;

fn queue_name(name: &str) -> QueueName {
    QueueName::new(name.to_string()).unwrap()
}

// ============================================================================
// Contract Tests - QueueClient Trait
// ============================================================================

/// Ensuring a queue twice returns equal handles and keeps its messages
async fn check_ensure_queue_idempotent(client: &dyn QueueClient) {
    // Arrange
    let name = queue_name("approvers-input");
    let first = client.ensure_queue(&name).await.unwrap();
    client
        .enqueue(&first, Message::from_text("survivor"))
        .await
        .unwrap();

    // Act
    let second = client.ensure_queue(&name).await.unwrap();

    // Assert
    assert_eq!(first, second);
    let props = client.queue_properties(&second).await.unwrap();
    assert_eq!(props.approximate_message_count, 1);
}

/// Enqueue, dequeue and delete leave the queue empty
async fn check_round_trip(client: &dyn QueueClient) {
    // Arrange
    let queue = client
        .ensure_queue(&queue_name("round-trip"))
        .await
        .unwrap();

    // Act
    let enqueued = client
        .enqueue(&queue, Message::from_text("Hello World!"))
        .await
        .unwrap();
    let received = client
        .dequeue(&queue, Duration::seconds(30))
        .await
        .unwrap()
        .expect("message should be available");
    client
        .delete_message(&received.receipt_handle)
        .await
        .unwrap();

    // Assert
    assert_eq!(received.message_id, enqueued.message_id);
    assert_eq!(received.body_text().unwrap(), "Hello World!");
    assert!(client.dequeue(&queue, Duration::seconds(30)).await.unwrap().is_none());
}

/// A leased message is not handed to a second consumer
async fn check_lease_hides_message(client: &dyn QueueClient) {
    // Arrange
    let queue = client.ensure_queue(&queue_name("leased")).await.unwrap();
    client
        .enqueue(&queue, Message::from_text("exclusive"))
        .await
        .unwrap();

    // Act
    let first = client.dequeue(&queue, Duration::minutes(5)).await.unwrap();
    let second = client.dequeue(&queue, Duration::minutes(5)).await.unwrap();

    // Assert
    assert!(first.is_some());
    assert!(second.is_none());
}

#[tokio::test]
async fn test_in_memory_client_contract() {
    let client = QueueClientFactory::create_test_client();
    check_ensure_queue_idempotent(client.as_ref()).await;
    check_round_trip(client.as_ref()).await;
    check_lease_hides_message(client.as_ref()).await;
}

#[tokio::test]
async fn test_peek_does_not_lease() {
    let client = QueueClientFactory::create_test_client();
    let queue = client.ensure_queue(&queue_name("peeked")).await.unwrap();
    client
        .enqueue(&queue, Message::from_text("Hello World!"))
        .await
        .unwrap();

    for _ in 0..3 {
        let peeked = client.peek(&queue).await.unwrap().unwrap();
        assert_eq!(peeked.body_text().unwrap(), "Hello World!");
        assert_eq!(peeked.dequeue_count, 0);
    }

    assert!(client
        .dequeue(&queue, Duration::seconds(30))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_update_message_through_client() {
    let client = QueueClientFactory::create_test_client();
    let queue = client.ensure_queue(&queue_name("updated")).await.unwrap();
    client
        .enqueue(&queue, Message::from_text("Hello World Again!"))
        .await
        .unwrap();
    let received = client
        .dequeue(&queue, Duration::seconds(30))
        .await
        .unwrap()
        .unwrap();

    let new_receipt = client
        .update_message(
            &received.receipt_handle,
            Some(Bytes::from("Updated contents.")),
            Duration::zero(),
        )
        .await
        .unwrap();

    assert_eq!(new_receipt.message_id(), &received.message_id);
    let peeked = client.peek(&queue).await.unwrap().unwrap();
    assert_eq!(peeked.body_text().unwrap(), "Updated contents.");
}

#[tokio::test]
async fn test_delete_queue_through_client() {
    let client = QueueClientFactory::create_test_client();
    let queue = client.ensure_queue(&queue_name("doomed")).await.unwrap();

    client.delete_queue(&queue).await.unwrap();

    let result = client.enqueue(&queue, Message::from_text("late")).await;
    assert!(matches!(result, Err(QueueError::QueueNotFound { .. })));
}

#[tokio::test]
async fn test_queue_reference_without_service_call() {
    let client = QueueClientFactory::create_test_client();
    let handle = client.queue(queue_name("not-created"));

    assert_eq!(handle.provider_type(), ProviderType::InMemory);
    let result = client.peek(&handle).await;
    assert!(matches!(result, Err(QueueError::QueueNotFound { .. })));
}

// ============================================================================
// Validation Tests
// ============================================================================

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_batch_size_bounds() {
        let client = QueueClientFactory::create_test_client();
        let queue = client.ensure_queue(&queue_name("bounds")).await.unwrap();

        let zero = client.dequeue_batch(&queue, 0, Duration::seconds(30)).await;
        assert!(matches!(zero, Err(QueueError::ValidationError(_))));

        let too_many = client.dequeue_batch(&queue, 33, Duration::seconds(30)).await;
        match too_many {
            Err(QueueError::BatchTooLarge { size, max_size }) => {
                assert_eq!(size, 33);
                assert_eq!(max_size, 32);
            }
            other => panic!("Expected BatchTooLarge, got {:?}", other),
        }

        let peek_too_many = client.peek_messages(&queue, 33).await;
        assert!(matches!(peek_too_many, Err(QueueError::BatchTooLarge { .. })));

        assert!(client
            .dequeue_batch(&queue, 32, Duration::seconds(30))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_visibility_timeout_bounds() {
        let client = QueueClientFactory::create_test_client();
        let queue = client.ensure_queue(&queue_name("visibility")).await.unwrap();

        let negative = client.dequeue(&queue, Duration::seconds(-1)).await;
        assert!(matches!(negative, Err(QueueError::ValidationError(_))));

        let too_long = client
            .dequeue(&queue, Duration::days(7) + Duration::seconds(1))
            .await;
        assert!(matches!(too_long, Err(QueueError::ValidationError(_))));

        assert!(client.dequeue(&queue, Duration::days(7)).await.is_ok());
        assert!(client.dequeue(&queue, Duration::seconds(1)).await.is_ok());
    }

    /// A dequeue must take a lease of at least one whole second.
    #[tokio::test]
    async fn test_dequeue_rejects_zero_and_fractional_leases() {
        // Arrange
        let client = QueueClientFactory::create_test_client();
        let queue = client.ensure_queue(&queue_name("short-leases")).await.unwrap();
        client
            .enqueue(&queue, Message::from_text("lease me"))
            .await
            .unwrap();

        // Act
        let zero = client.dequeue(&queue, Duration::zero()).await;
        let fractional = client.dequeue(&queue, Duration::milliseconds(1500)).await;
        let batch_zero = client.dequeue_batch(&queue, 4, Duration::zero()).await;

        // Assert
        assert!(matches!(zero, Err(QueueError::ValidationError(_))));
        assert!(matches!(fractional, Err(QueueError::ValidationError(_))));
        assert!(matches!(batch_zero, Err(QueueError::ValidationError(_))));

        let received = client
            .dequeue(&queue, Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();
        client.delete_message(&received.receipt_handle).await.unwrap();
    }

    /// Enqueue delays and update timeouts may be zero but not fractional.
    #[tokio::test]
    async fn test_delay_and_update_accept_zero() {
        let client = QueueClientFactory::create_test_client();
        let queue = client.ensure_queue(&queue_name("zero-delay")).await.unwrap();

        let fractional = client
            .enqueue(
                &queue,
                Message::from_text("soon").with_visibility_delay(Duration::milliseconds(10)),
            )
            .await;
        assert!(matches!(fractional, Err(QueueError::ValidationError(_))));

        client
            .enqueue(
                &queue,
                Message::from_text("now").with_visibility_delay(Duration::zero()),
            )
            .await
            .unwrap();
        let received = client
            .dequeue(&queue, Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();

        let fractional_update = client
            .update_message(&received.receipt_handle, None, Duration::milliseconds(500))
            .await;
        assert!(matches!(
            fractional_update,
            Err(QueueError::ValidationError(_))
        ));
        assert!(client
            .update_message(&received.receipt_handle, None, Duration::zero())
            .await
            .is_ok());
    }

    /// Out-of-range time-to-live values are refused and leave the client usable.
    #[tokio::test]
    async fn test_ttl_bounds() {
        // Arrange
        let client = QueueClientFactory::create_test_client();
        let queue = client.ensure_queue(&queue_name("ttl-bounds")).await.unwrap();

        // Act
        let huge = client
            .enqueue(&queue, Message::from_text("huge").with_ttl(Duration::MAX))
            .await;
        let zero = client
            .enqueue(&queue, Message::from_text("zero").with_ttl(Duration::zero()))
            .await;
        let negative = client
            .enqueue(&queue, Message::from_text("negative").with_ttl(Duration::seconds(-2)))
            .await;
        let fractional = client
            .enqueue(
                &queue,
                Message::from_text("fractional").with_ttl(Duration::milliseconds(2500)),
            )
            .await;

        // Assert
        assert!(matches!(huge, Err(QueueError::ValidationError(_))));
        assert!(matches!(zero, Err(QueueError::ValidationError(_))));
        assert!(matches!(negative, Err(QueueError::ValidationError(_))));
        assert!(matches!(fractional, Err(QueueError::ValidationError(_))));

        client
            .enqueue(&queue, Message::from_text("after").with_ttl(Duration::hours(1)))
            .await
            .unwrap();
        let props = client.queue_properties(&queue).await.unwrap();
        assert_eq!(props.approximate_message_count, 1);
    }

    /// The never-expires time-to-live is accepted and the message stays.
    #[tokio::test]
    async fn test_never_expiring_message_accepted() {
        let client = QueueClientFactory::create_test_client();
        let queue = client.ensure_queue(&queue_name("ttl-forever")).await.unwrap();

        let enqueued = client
            .enqueue(&queue, Message::from_text("forever").without_expiry())
            .await
            .unwrap();

        assert!(enqueued.expires_at.is_none());
        let peeked = client.peek(&queue).await.unwrap().unwrap();
        assert_eq!(peeked.body_text().unwrap(), "forever");
    }

    #[tokio::test]
    async fn test_message_size_limit_uses_encoded_size() {
        let client = QueueClientFactory::create_test_client();
        let queue = client.ensure_queue(&queue_name("sizes")).await.unwrap();

        // 48 KiB encodes to exactly 64 KiB
        let fits = Message::new(Bytes::from(vec![b'a'; 48 * 1024]));
        assert!(client.enqueue(&queue, fits).await.is_ok());

        let too_big = Message::new(Bytes::from(vec![b'a'; 48 * 1024 + 1]));
        match client.enqueue(&queue, too_big).await {
            Err(QueueError::MessageTooLarge { size, max_size }) => {
                assert!(size > max_size);
                assert_eq!(max_size, 64 * 1024);
            }
            other => panic!("Expected MessageTooLarge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_receipt_from_other_provider_rejected() {
        let client = QueueClientFactory::create_test_client();
        let foreign = ReceiptHandle::new(
            queue_name("foreign"),
            MessageId::new(),
            "receipt".to_string(),
            Timestamp::after(Duration::seconds(30)),
            ProviderType::AzureStorage,
        );

        let result = client.delete_message(&foreign).await;
        assert!(matches!(result, Err(QueueError::ValidationError(_))));
    }
}

// ============================================================================
// Timeout Tests
// ============================================================================

mod timeouts {
    use super::*;
    use crate::message::{
        EnqueuedMessage, PeekedMessage, QueueProperties, ReceivedMessage,
    };

    /// Provider whose queue creation never finishes in time
    struct StalledProvider;

    #[async_trait]
    impl QueueProvider for StalledProvider {
        async fn create_queue(&self, _queue: &QueueName) -> Result<(), QueueError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(())
        }

        async fn get_properties(&self, _queue: &QueueName) -> Result<QueueProperties, QueueError> {
            unimplemented!()
        }

        async fn put_message(
            &self,
            _queue: &QueueName,
            _message: &Message,
        ) -> Result<EnqueuedMessage, QueueError> {
            unimplemented!()
        }

        async fn peek_messages(
            &self,
            _queue: &QueueName,
            _max_messages: u32,
        ) -> Result<Vec<PeekedMessage>, QueueError> {
            unimplemented!()
        }

        async fn get_messages(
            &self,
            _queue: &QueueName,
            _max_messages: u32,
            _visibility_timeout: Duration,
        ) -> Result<Vec<ReceivedMessage>, QueueError> {
            unimplemented!()
        }

        async fn update_message(
            &self,
            _receipt: &ReceiptHandle,
            _new_content: Option<&Bytes>,
            _visibility_timeout: Duration,
        ) -> Result<ReceiptHandle, QueueError> {
            unimplemented!()
        }

        async fn delete_message(&self, _receipt: &ReceiptHandle) -> Result<(), QueueError> {
            unimplemented!()
        }

        async fn delete_queue(&self, _queue: &QueueName) -> Result<(), QueueError> {
            unimplemented!()
        }

        fn provider_type(&self) -> ProviderType {
            ProviderType::InMemory
        }
    }

    #[tokio::test]
    async fn test_slow_provider_call_times_out() {
        let config = QueueConfig {
            operation_timeout_seconds: 1,
            ..QueueConfig::default()
        };
        let client = StandardQueueClient::new(Box::new(StalledProvider), config);

        let result = client.ensure_queue(&queue_name("stalled")).await;

        match result {
            Err(err @ QueueError::Timeout { .. }) => assert!(err.is_transient()),
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }
}

// ============================================================================
// Factory Tests
// ============================================================================

mod factory {
    use super::*;

    #[test]
    fn test_factory_builds_azure_client() {
        let client =
            QueueClientFactory::create_client(QueueConfig::azure_storage("UseDevelopmentStorage=true"))
                .unwrap();
        assert_eq!(client.provider_type(), ProviderType::AzureStorage);
    }

    #[test]
    fn test_factory_rejects_bad_connection_string() {
        let result = QueueClientFactory::create_client(QueueConfig::azure_storage("nonsense"));
        assert!(matches!(
            result,
            Err(QueueError::ConfigurationError(ConfigurationError::Parsing { .. }))
        ));
    }

    #[test]
    fn test_factory_builds_in_memory_client() {
        let client = QueueClientFactory::create_client(QueueConfig::default()).unwrap();
        assert_eq!(client.provider_type(), ProviderType::InMemory);
    }
}
