//! # Storage Queue CLI
//!
//! Demo driver for the storage-queue client.
//!
//! Without a subcommand it runs the basic walkthrough: create the input and
//! output queues, peek the input queue, then put one message on the output
//! queue. Subcommands run the optional walkthroughs (message update, batch
//! processing, queue deletion).
//!
//! The connection string defaults to the local storage emulator. Pass
//! `--in-memory` to run without any storage service.

use clap::{Parser, Subcommand};
use storage_queue::{
    ConfigurationError, QueueClient, QueueClientFactory, QueueConfig, QueueError, QueueName,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod demo;

pub use demo::{DEMO_INPUT_QUEUE, DEMO_OUTPUT_QUEUE, EMULATOR_HINT};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// CLI Structure
// ============================================================================

/// Storage queue demo - basic queue operations against Azure Queue Storage
#[derive(Parser, Debug)]
#[command(name = "storage-queue")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Walk through basic Azure Queue Storage operations")]
pub struct Cli {
    /// Storage account connection string
    #[arg(
        long,
        env = "STORAGE_CONNECTION_STRING",
        default_value = "UseDevelopmentStorage=true",
        hide_env_values = true
    )]
    pub connection_string: String,

    /// Use the in-memory provider instead of a storage account
    #[arg(long)]
    pub in_memory: bool,

    /// Queue the demo peeks from
    #[arg(long, default_value = DEMO_INPUT_QUEUE)]
    pub input_queue: String,

    /// Queue the demo writes to
    #[arg(long, default_value = DEMO_OUTPUT_QUEUE)]
    pub output_queue: String,

    /// Logging level
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Walkthrough to run (defaults to `basic`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available walkthroughs
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Create both queues, peek the input queue, enqueue onto the output queue
    Basic,

    /// Enqueue a message, lease it, and replace its content
    UpdateMessage,

    /// Enqueue 20 messages, then lease, process and delete them as a batch
    ProcessBatch,

    /// Delete the output queue
    DeleteQueue,

    /// Run every walkthrough in order
    All,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Could not create queue '{queue}': {source}")]
    QueueSetup {
        queue: String,
        #[source]
        source: QueueError,
    },

    #[error("Queue operation failed: {0}")]
    Queue(#[source] QueueError),

    #[error("Logging setup failed: {message}")]
    Logging { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for the error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::InvalidArgument { .. } => 2,
            Self::QueueSetup { .. } => 3,
            Self::Queue(_) => 4,
            Self::Logging { .. } => 5,
            Self::Io(_) => 6,
        }
    }
}

impl From<QueueError> for CliError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::ConfigurationError(e) => Self::Configuration(e),
            other => Self::Queue(other),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Parse arguments from the process and run the selected walkthrough
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;

    let mut stdout = std::io::stdout();
    run(&cli, &mut stdout).await
}

/// Run the walkthrough selected by `cli`, writing progress to `out`
pub async fn run(cli: &Cli, out: &mut dyn std::io::Write) -> Result<(), CliError> {
    let client = build_client(cli)?;
    let input = parse_queue_name("--input-queue", &cli.input_queue)?;
    let output = parse_queue_name("--output-queue", &cli.output_queue)?;
    let command = cli.command.unwrap_or(Commands::Basic);

    info!(
        provider = %client.provider_type(),
        command = ?command,
        "Starting demo"
    );

    demo::run_demo(client.as_ref(), command, &input, &output, out).await
}

/// Build the queue client selected by the command line
pub fn build_client(cli: &Cli) -> Result<Box<dyn QueueClient>, CliError> {
    if cli.in_memory {
        return Ok(QueueClientFactory::create_test_client());
    }

    let config = QueueConfig::azure_storage(cli.connection_string.clone());
    Ok(QueueClientFactory::create_client(config)?)
}

fn parse_queue_name(arg: &str, value: &str) -> Result<QueueName, CliError> {
    QueueName::new(value.to_string()).map_err(|e| CliError::InvalidArgument {
        arg: arg.to_string(),
        message: e.to_string(),
    })
}

/// Initialize logging based on CLI arguments
///
/// Logs go to stderr so the demo output on stdout stays readable.
fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_new(&cli.log_level).map_err(|e| CliError::Logging {
        message: format!("invalid log level '{}': {}", cli.log_level, e),
    })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}
