//! Grammar fetching and building.
//!
//! Grammars that are not builtin are compiled from tree-sitter style source
//! checkouts (`src/parser.c` plus an optional `src/scanner.c`). This module
//! fetches those sources from git at a pinned revision and compiles them into
//! shared libraries the loader can pick up.

mod compile;
mod config;
mod fetch;

use std::path::PathBuf;

pub use compile::{BuildStatus, build_grammar};
pub use config::{
	ArtifactSource, GrammarConfig, grammar_lib_dir, grammar_sources_dir, grammar_src_dir,
	load_grammar_configs, parse_grammar_configs,
};
pub use fetch::{FetchStatus, fetch_grammar};
use thiserror::Error;

/// Errors that can occur during grammar fetching or building.
#[derive(Debug, Error)]
pub enum GrammarBuildError {
	#[error("git is not available on PATH")]
	GitNotAvailable,
	#[error("failed to read grammars.kdl: {0}")]
	ConfigRead(#[from] std::io::Error),
	#[error("failed to parse grammars.kdl: {0}")]
	ConfigParseKdl(#[from] kdl::KdlError),
	#[error("invalid grammars.kdl configuration: {0}")]
	ConfigParse(String),
	#[error("git command failed: {0}")]
	GitCommand(String),
	#[error("compilation failed: {0}")]
	Compilation(String),
	#[error("no parser.c found in {0}")]
	NoParserSource(PathBuf),
}

/// Result type for grammar build operations.
pub type Result<T> = std::result::Result<T, GrammarBuildError>;
