//! Tests for the storage-queue library module.

use super::*;
use chrono::Duration;

#[test]
fn test_queue_name_validation() {
    // Valid names
    assert!(QueueName::new("approvers-input".to_string()).is_ok());
    assert!(QueueName::new("queue123".to_string()).is_ok());
    assert!(QueueName::new("abc".to_string()).is_ok());
    assert!(QueueName::new("a".repeat(63)).is_ok());

    // Invalid names
    assert!(QueueName::new("".to_string()).is_err());
    assert!(QueueName::new("ab".to_string()).is_err());
    assert!(QueueName::new("a".repeat(64)).is_err());
    assert!(QueueName::new("Upper-case".to_string()).is_err());
    assert!(QueueName::new("queue_123".to_string()).is_err());
    assert!(QueueName::new("-leading-hyphen".to_string()).is_err());
    assert!(QueueName::new("trailing-hyphen-".to_string()).is_err());
    assert!(QueueName::new("double--hyphen".to_string()).is_err());
    assert!(QueueName::new("special@chars".to_string()).is_err());
}

#[test]
fn test_message_id_generation() {
    let id1 = MessageId::new();
    let id2 = MessageId::new();
    assert_ne!(id1, id2);
    assert!(!id1.as_str().is_empty());
}

#[test]
fn test_provider_limits_exposed() {
    assert_eq!(ProviderType::AzureStorage.max_dequeue_batch(), 32);
    assert_eq!(ProviderType::AzureStorage.max_message_size(), 64 * 1024);
    assert_eq!(
        ProviderType::AzureStorage.max_visibility_timeout(),
        Duration::days(7)
    );
}

#[test]
fn test_error_transience() {
    assert!(QueueError::ConnectionFailed {
        message: "network error".to_string(),
    }
    .is_transient());

    assert!(!QueueError::QueueNotFound {
        queue_name: "test".to_string(),
    }
    .is_transient());

    assert!(!QueueError::LeaseExpired {
        message_id: "id".to_string(),
    }
    .is_transient());
}

#[tokio::test]
async fn test_end_to_end_with_test_client() {
    // Arrange
    let client = QueueClientFactory::create_test_client();
    let queue = client
        .ensure_queue(&QueueName::new("input".to_string()).unwrap())
        .await
        .unwrap();

    // Act
    client
        .enqueue(&queue, Message::from_text("Hello World!"))
        .await
        .unwrap();
    let peeked = client.peek(&queue).await.unwrap().unwrap();
    let received = client
        .dequeue(&queue, Duration::minutes(5))
        .await
        .unwrap()
        .unwrap();
    client
        .delete_message(&received.receipt_handle)
        .await
        .unwrap();

    // Assert
    assert_eq!(peeked.body_text().unwrap(), "Hello World!");
    assert_eq!(received.body_text().unwrap(), "Hello World!");
    assert!(client.peek(&queue).await.unwrap().is_none());
}
