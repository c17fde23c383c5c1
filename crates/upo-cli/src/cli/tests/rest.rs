//! Tests for check, config, completions, man.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::{CommandFactory, Parser};

#[test]
fn cli_parse_check() {
    match parse(&["upo", "check", "one.txt", "two.hwp"]) {
        CliCommand::Check { paths } => assert_eq!(paths.len(), 2),
        _ => panic!("expected Check"),
    }
    assert!(Cli::try_parse_from(["upo", "check"]).is_err());
}

#[test]
fn cli_parse_config() {
    match parse(&["upo", "config"]) {
        CliCommand::Config => {}
        _ => panic!("expected Config"),
    }
}

#[test]
fn cli_parse_completions() {
    match parse(&["upo", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, clap_complete::Shell::Bash),
        _ => panic!("expected Completions"),
    }
    assert!(Cli::try_parse_from(["upo", "completions", "cmd.exe"]).is_err());
}

#[test]
fn cli_parse_man() {
    match parse(&["upo", "man"]) {
        CliCommand::Man => {}
        _ => panic!("expected Man"),
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}
