//! Process-then-delete helper for leased batches.
//!
//! A message is deleted only after its handler succeeded. Messages whose
//! handler failed are left alone and reappear once their visibility timeout
//! elapses, which is what gives the queue its at-least-once guarantee.

use crate::client::QueueClient;
use crate::error::QueueError;
use crate::message::{QueueHandle, ReceivedMessage};
use chrono::Duration;
use std::fmt::Display;
use std::future::Future;
use tracing::{info, warn};

#[cfg(test)]
#[path = "processing_tests.rs"]
mod tests;

/// Tally of one [`process_batch`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Handled and deleted
    pub processed: usize,
    /// Handler failed; left to reappear after the visibility timeout
    pub failed: usize,
    /// Handled, but the lease ran out before the delete landed
    pub lease_lost: usize,
}

impl BatchOutcome {
    /// Number of messages the dequeue returned
    pub fn received(&self) -> usize {
        self.processed + self.failed + self.lease_lost
    }
}

/// Lease up to `max_messages`, run `handler` on each and delete the successes
///
/// A lost lease on delete is counted rather than returned, since another
/// consumer already owns the redelivered message. Any other delete failure
/// stops the batch and is returned; messages not yet handled simply time out
/// and come back.
pub async fn process_batch<F, Fut, E>(
    client: &dyn QueueClient,
    queue: &QueueHandle,
    max_messages: u32,
    visibility_timeout: Duration,
    mut handler: F,
) -> Result<BatchOutcome, QueueError>
where
    F: FnMut(ReceivedMessage) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let messages = client
        .dequeue_batch(queue, max_messages, visibility_timeout)
        .await?;

    let mut outcome = BatchOutcome::default();
    for message in messages {
        let receipt = message.receipt_handle.clone();
        let message_id = message.message_id.clone();

        if let Err(e) = handler(message).await {
            warn!(
                queue = %queue,
                message_id = %message_id,
                error = %e,
                "Handler failed; message will reappear after its visibility timeout"
            );
            outcome.failed += 1;
            continue;
        }

        match client.delete_message(&receipt).await {
            Ok(()) => outcome.processed += 1,
            Err(e) if e.is_lease_lost() => {
                warn!(
                    queue = %queue,
                    message_id = %message_id,
                    error = %e,
                    "Lease lost before delete; message may be processed again"
                );
                outcome.lease_lost += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        queue = %queue,
        processed = outcome.processed,
        failed = outcome.failed,
        lease_lost = outcome.lease_lost,
        "Batch processed"
    );
    Ok(outcome)
}
