//! Tests for the storage-queue-cli library module.

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn test_cli_defaults() {
    std::env::remove_var("STORAGE_CONNECTION_STRING");

    let cli = Cli::try_parse_from(["storage-queue"]).unwrap();

    assert_eq!(cli.connection_string, "UseDevelopmentStorage=true");
    assert_eq!(cli.input_queue, DEMO_INPUT_QUEUE);
    assert_eq!(cli.output_queue, DEMO_OUTPUT_QUEUE);
    assert!(!cli.in_memory);
    assert!(cli.command.is_none());
}

#[test]
#[serial]
fn test_connection_string_from_environment() {
    std::env::set_var(
        "STORAGE_CONNECTION_STRING",
        "AccountName=approvals;AccountKey=a2V5",
    );

    let cli = Cli::try_parse_from(["storage-queue"]).unwrap();
    std::env::remove_var("STORAGE_CONNECTION_STRING");

    assert_eq!(cli.connection_string, "AccountName=approvals;AccountKey=a2V5");
}

#[test]
fn test_subcommand_parsing() {
    let cli = Cli::try_parse_from(["storage-queue", "--in-memory", "process-batch"]).unwrap();

    assert!(cli.in_memory);
    assert_eq!(cli.command, Some(Commands::ProcessBatch));
}

#[test]
fn test_unknown_subcommand_rejected() {
    assert!(Cli::try_parse_from(["storage-queue", "orchestrate"]).is_err());
}

#[test]
fn test_exit_codes_are_distinct() {
    let errors = [
        CliError::Configuration(ConfigurationError::Missing {
            key: "AccountName".to_string(),
        }),
        CliError::InvalidArgument {
            arg: "--input-queue".to_string(),
            message: "bad".to_string(),
        },
        CliError::QueueSetup {
            queue: "approvers-input".to_string(),
            source: QueueError::ConnectionFailed {
                message: "refused".to_string(),
            },
        },
        CliError::Queue(QueueError::QueueNotFound {
            queue_name: "approvers-input".to_string(),
        }),
        CliError::Logging {
            message: "twice".to_string(),
        },
    ];

    let mut codes: Vec<i32> = errors.iter().map(CliError::exit_code).collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), errors.len());
    assert!(codes.iter().all(|code| *code != 0));
}

#[test]
fn test_configuration_errors_keep_their_kind() {
    let error: CliError = QueueError::ConfigurationError(ConfigurationError::Invalid {
        message: "bad key".to_string(),
    })
    .into();

    assert!(matches!(error, CliError::Configuration(_)));
    assert_eq!(error.exit_code(), 1);
}

#[test]
fn test_bad_connection_string_is_configuration_error() {
    let cli = Cli::try_parse_from([
        "storage-queue",
        "--connection-string",
        "AccountName=approvals",
    ])
    .unwrap();

    let result = build_client(&cli);
    assert!(matches!(result, Err(CliError::Configuration(_))));
}

#[tokio::test]
async fn test_invalid_queue_name_rejected() {
    let cli = Cli::try_parse_from(["storage-queue", "--in-memory", "--input-queue", "Bad_Name"])
        .unwrap();
    let mut out = Vec::new();

    let result = run(&cli, &mut out).await;

    match result {
        Err(CliError::InvalidArgument { arg, .. }) => assert_eq!(arg, "--input-queue"),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_in_memory_basic_walkthrough() {
    let cli = Cli::try_parse_from(["storage-queue", "--in-memory"]).unwrap();
    let mut out = Vec::new();

    run(&cli, &mut out).await.unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("Create queue 'approvers-input'"));
    assert!(printed.contains("Create queue 'approvers-output'"));
    assert!(printed.contains("Basic queue operations took"));
}
