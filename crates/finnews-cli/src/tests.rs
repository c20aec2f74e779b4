use clap::Parser;

use super::*;
use crate::commands::clip;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["finnews-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
    assert!(!cli.in_memory);
}

#[test]
fn parses_fetch_with_limit() {
    let cli = Cli::try_parse_from(["finnews-cli", "fetch", "--limit", "10"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Fetch { limit: Some(10) })
    ));
}

#[test]
fn parses_run_with_global_in_memory_flag() {
    let cli = Cli::try_parse_from(["finnews-cli", "run", "--in-memory"])
        .expect("expected valid cli args");
    assert!(cli.in_memory);
    assert!(matches!(cli.command, Some(Commands::Run { limit: None })));
}

#[test]
fn query_defaults_top_k_to_five() {
    let cli = Cli::try_parse_from(["finnews-cli", "query", "RBI repo rate"])
        .expect("expected valid cli args");
    match cli.command {
        Some(Commands::Query { text, top_k }) => {
            assert_eq!(text, "RBI repo rate");
            assert_eq!(top_k, 5);
        }
        other => panic!("expected query command, got {other:?}"),
    }
}

#[test]
fn query_requires_text() {
    assert!(Cli::try_parse_from(["finnews-cli", "query"]).is_err());
}

#[test]
fn parses_migrate() {
    let cli = Cli::try_parse_from(["finnews-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn clip_marks_truncated_titles() {
    assert_eq!(clip("short", 10), "short");
    assert_eq!(clip("abcdefghij", 4), "abcd...");
}
