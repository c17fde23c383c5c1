//! Tests for `upo upload`.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_upload_defaults() {
    match parse(&["upo", "upload", "a.png", "b.pdf"]) {
        CliCommand::Upload {
            paths,
            simulate,
            max_concurrent,
            pool,
            endpoint,
        } => {
            assert_eq!(paths, vec![PathBuf::from("a.png"), PathBuf::from("b.pdf")]);
            assert!(!simulate);
            assert!(max_concurrent.is_none());
            assert!(!pool);
            assert!(endpoint.is_none());
        }
        _ => panic!("expected Upload"),
    }
}

#[test]
fn cli_parse_upload_all_flags() {
    match parse(&[
        "upo",
        "upload",
        "--simulate",
        "--max-concurrent",
        "5",
        "--pool",
        "--endpoint",
        "https://example.com/api/upload",
        "x.jpg",
    ]) {
        CliCommand::Upload {
            paths,
            simulate,
            max_concurrent,
            pool,
            endpoint,
        } => {
            assert_eq!(paths, vec![PathBuf::from("x.jpg")]);
            assert!(simulate);
            assert_eq!(max_concurrent, Some(5));
            assert!(pool);
            assert_eq!(endpoint.as_deref(), Some("https://example.com/api/upload"));
        }
        _ => panic!("expected Upload with flags"),
    }
}

#[test]
fn cli_upload_requires_a_path() {
    assert!(Cli::try_parse_from(["upo", "upload"]).is_err());
    assert!(Cli::try_parse_from(["upo", "upload", "--max-concurrent", "two", "a.png"]).is_err());
}
