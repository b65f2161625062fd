//! Tests for batch processing.

use super::*;
use crate::client::QueueClientFactory;
use crate::message::{Message, QueueName};

async fn queue_with_messages(client: &dyn QueueClient, count: usize) -> QueueHandle {
    let queue = client
        .ensure_queue(&QueueName::new("batch-queue".to_string()).unwrap())
        .await
        .unwrap();
    for i in 0..count {
        client
            .enqueue(&queue, Message::from_text(format!("{} - Hello World", i)))
            .await
            .unwrap();
    }
    queue
}

#[tokio::test]
async fn test_successful_batch_deletes_everything() {
    // Arrange
    let client = QueueClientFactory::create_test_client();
    let queue = queue_with_messages(client.as_ref(), 20).await;

    // Act
    let outcome = process_batch(
        client.as_ref(),
        &queue,
        32,
        Duration::minutes(5),
        |_message| async { Ok::<(), String>(()) },
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(outcome.processed, 20);
    assert_eq!(outcome.received(), 20);
    let props = client.queue_properties(&queue).await.unwrap();
    assert_eq!(props.approximate_message_count, 0);
}

#[tokio::test]
async fn test_failed_messages_stay_in_queue() {
    // Arrange
    let client = QueueClientFactory::create_test_client();
    let queue = queue_with_messages(client.as_ref(), 4).await;

    // Act - fail every message whose body starts with an odd number
    let outcome = process_batch(
        client.as_ref(),
        &queue,
        32,
        Duration::seconds(1),
        |message| async move {
            let text = message.body_text().map_err(|e| e.to_string())?.to_string();
            if text.starts_with('1') || text.starts_with('3') {
                Err(format!("cannot handle {}", text))
            } else {
                Ok(())
            }
        },
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.failed, 2);
    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    let remaining = client.peek_messages(&queue, 32).await.unwrap();
    let bodies: Vec<_> = remaining.iter().map(|m| m.body_text().unwrap()).collect();
    assert_eq!(bodies, vec!["1 - Hello World", "3 - Hello World"]);
    assert!(remaining.iter().all(|m| m.dequeue_count == 1));
}

#[tokio::test]
async fn test_handler_outliving_lease_counts_lease_lost() {
    // Arrange
    let client = QueueClientFactory::create_test_client();
    let queue = queue_with_messages(client.as_ref(), 1).await;

    // Act
    let outcome = process_batch(
        client.as_ref(),
        &queue,
        1,
        Duration::seconds(1),
        |_message| async {
            tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
            Ok::<(), String>(())
        },
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(outcome.lease_lost, 1);
    assert_eq!(outcome.processed, 0);
    let props = client.queue_properties(&queue).await.unwrap();
    assert_eq!(props.approximate_message_count, 1);
}

#[tokio::test]
async fn test_empty_queue_yields_empty_outcome() {
    let client = QueueClientFactory::create_test_client();
    let queue = queue_with_messages(client.as_ref(), 0).await;

    let outcome = process_batch(
        client.as_ref(),
        &queue,
        10,
        Duration::seconds(30),
        |_message| async { Ok::<(), String>(()) },
    )
    .await
    .unwrap();

    assert_eq!(outcome, BatchOutcome::default());
}

#[tokio::test]
async fn test_invalid_batch_size_is_rejected() {
    let client = QueueClientFactory::create_test_client();
    let queue = queue_with_messages(client.as_ref(), 0).await;

    let result = process_batch(
        client.as_ref(),
        &queue,
        33,
        Duration::seconds(30),
        |_message| async { Ok::<(), String>(()) },
    )
    .await;

    assert!(matches!(result, Err(QueueError::BatchTooLarge { .. })));
}
