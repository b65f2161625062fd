//! The demo walkthroughs.
//!
//! Each walkthrough prints numbered steps to the given writer and reports
//! how long the whole step took, in seconds.

use crate::{CliError, Commands};
use bytes::Bytes;
use chrono::Duration;
use std::io::Write;
use std::time::Instant;
use storage_queue::{process_batch, Message, QueueClient, QueueHandle, QueueName};
use tracing::{error, warn};

#[cfg(test)]
#[path = "demo_tests.rs"]
mod tests;

/// Queue the basic walkthrough peeks from
pub const DEMO_INPUT_QUEUE: &str = "approvers-input";

/// Queue the walkthroughs write to
pub const DEMO_OUTPUT_QUEUE: &str = "approvers-output";

/// Printed when a queue cannot be created, usually because the emulator is down
pub const EMULATOR_HINT: &str = "If you are running with the default configuration please make sure the storage emulator (Azurite) is running on 127.0.0.1:10001, then run the demo again.";

const BATCH_SIZE: usize = 20;
const BATCH_DEQUEUE_COUNT: u32 = 21;

/// Run one walkthrough (or all of them) against the given queues
pub async fn run_demo(
    client: &dyn QueueClient,
    command: Commands,
    input: &QueueName,
    output: &QueueName,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let started = Instant::now();
    let input_queue = create_queue(client, input, out).await?;
    let output_queue = create_queue(client, output, out).await?;
    report_duration(out, "Queue creation", started)?;

    let steps: &[Commands] = match command {
        Commands::All => &[
            Commands::Basic,
            Commands::UpdateMessage,
            Commands::ProcessBatch,
            Commands::DeleteQueue,
        ],
        _ => std::slice::from_ref(&command),
    };

    for step in steps {
        run_step(client, *step, &input_queue, &output_queue, out).await?;
    }

    Ok(())
}

/// Create a queue if needed, printing the emulator hint on failure
pub async fn create_queue(
    client: &dyn QueueClient,
    name: &QueueName,
    out: &mut dyn Write,
) -> Result<QueueHandle, CliError> {
    writeln!(out, "1. Create queue '{}'", name)?;

    match client.ensure_queue(name).await {
        Ok(handle) => Ok(handle),
        Err(e) => {
            error!(queue = %name, error = %e, "Queue creation failed");
            writeln!(out, "{}", EMULATOR_HINT)?;
            Err(CliError::QueueSetup {
                queue: name.to_string(),
                source: e,
            })
        }
    }
}

/// Peek the input queue, then put one message on the output queue
pub async fn basic_operations(
    client: &dyn QueueClient,
    input: &QueueHandle,
    output: &QueueHandle,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    writeln!(out, "2. Peek at the next message in '{}'", input)?;
    match client.peek(input).await? {
        Some(peeked) => writeln!(out, "The peeked message is: {}", display_body(&peeked.body))?,
        None => writeln!(out, "The queue is empty")?,
    }

    writeln!(out, "3. Insert a single message into '{}'", output)?;
    client
        .enqueue(output, Message::from_text("Hello World!"))
        .await?;
    Ok(())
}

/// Enqueue a message, lease it, and replace its content with immediate visibility
pub async fn update_enqueued_message(
    client: &dyn QueueClient,
    queue: &QueueHandle,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    writeln!(out, "4. Insert another test message")?;
    client
        .enqueue(queue, Message::from_text("Hello World Again!"))
        .await?;

    writeln!(out, "5. Change the contents of a queued message")?;
    let Some(received) = client.dequeue(queue, Duration::seconds(30)).await? else {
        writeln!(out, "No message available to update")?;
        return Ok(());
    };

    client
        .update_message(
            &received.receipt_handle,
            Some(Bytes::from_static(b"Updated contents.")),
            Duration::zero(),
        )
        .await?;
    Ok(())
}

/// Enqueue a batch, report the queue length, then process and delete the batch
pub async fn process_batch_of_messages(
    client: &dyn QueueClient,
    queue: &QueueHandle,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    writeln!(out, "6. Enqueue {} messages", BATCH_SIZE)?;
    for i in 0..BATCH_SIZE {
        client
            .enqueue(queue, Message::from_text(format!("{} - Hello World", i)))
            .await?;
    }

    writeln!(out, "7. Get the queue length")?;
    let properties = client.queue_properties(queue).await?;
    writeln!(
        out,
        "Number of messages in queue: {}",
        properties.approximate_message_count
    )?;

    writeln!(
        out,
        "8. Dequeue {} messages, allowing 5 minutes for processing",
        BATCH_DEQUEUE_COUNT
    )?;
    let outcome = process_batch(
        client,
        queue,
        BATCH_DEQUEUE_COUNT,
        Duration::minutes(5),
        |message| {
            let written = writeln!(
                out,
                "Processing & deleting message with content: {}",
                display_body(&message.body)
            )
            .map_err(|e| e.to_string());
            async move { written }
        },
    )
    .await?;

    if outcome.failed > 0 || outcome.lease_lost > 0 {
        warn!(
            failed = outcome.failed,
            lease_lost = outcome.lease_lost,
            "Some messages were not deleted"
        );
    }
    Ok(())
}

/// Delete the queue
pub async fn delete_queue(
    client: &dyn QueueClient,
    queue: &QueueHandle,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    writeln!(out, "9. Delete queue '{}'", queue)?;
    client.delete_queue(queue).await?;
    Ok(())
}

/// Run one walkthrough and print how long it took
async fn run_step(
    client: &dyn QueueClient,
    step: Commands,
    input: &QueueHandle,
    output: &QueueHandle,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let started = Instant::now();
    let label = match step {
        Commands::Basic => {
            basic_operations(client, input, output, out).await?;
            "Basic queue operations"
        }
        Commands::UpdateMessage => {
            update_enqueued_message(client, output, out).await?;
            "Message update"
        }
        Commands::ProcessBatch => {
            process_batch_of_messages(client, output, out).await?;
            "Batch processing"
        }
        Commands::DeleteQueue => {
            delete_queue(client, output, out).await?;
            "Queue deletion"
        }
        Commands::All => return Ok(()),
    };
    report_duration(out, label, started)
}

fn report_duration(out: &mut dyn Write, label: &str, started: Instant) -> Result<(), CliError> {
    writeln!(
        out,
        "{} took {:.3} seconds",
        label,
        started.elapsed().as_secs_f64()
    )?;
    Ok(())
}

fn display_body(body: &Bytes) -> String {
    String::from_utf8_lossy(body).into_owned()
}
