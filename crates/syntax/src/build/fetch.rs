//! Grammar source fetching from git repositories.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::info;

use super::config::{ArtifactSource, GrammarConfig, grammar_sources_dir};
use super::{GrammarBuildError, Result};

/// Status of a fetch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
	/// Checkout already at the pinned revision.
	UpToDate,
	/// Checkout was created or moved to the pinned revision.
	Updated,
	/// Grammar uses a local path, nothing to fetch.
	Local,
}

/// Fetches a grammar's sources at its pinned revision.
///
/// Checks the current revision first to avoid needless network traffic.
/// Returns [`FetchStatus::Local`] for non-git sources.
pub fn fetch_grammar(grammar: &GrammarConfig) -> Result<FetchStatus> {
	let ArtifactSource::Git { remote, revision } = &grammar.source else {
		return Ok(FetchStatus::Local);
	};

	ensure_git_available()?;

	let checkout = grammar_sources_dir().join(&grammar.grammar_id);

	if checkout.join(".git").join("HEAD").exists() {
		let current = git_output(&checkout, &["rev-parse", "HEAD"])?;
		if current.starts_with(revision) || revision.starts_with(&current) {
			return Ok(FetchStatus::UpToDate);
		}

		info!(grammar = %grammar.grammar_id, %revision, "Updating grammar source");
		run_git(&checkout, &["fetch", "--depth", "1", "origin", revision])?;
		run_git(&checkout, &["checkout", "FETCH_HEAD"])?;
		return Ok(FetchStatus::Updated);
	}

	if checkout.exists() {
		fs::remove_dir_all(&checkout)?;
	}
	fs::create_dir_all(&checkout)?;

	info!(grammar = %grammar.grammar_id, %remote, %revision, "Cloning grammar source");
	run_git(&checkout, &["init", "--quiet"])?;
	run_git(&checkout, &["remote", "add", "origin", remote])?;
	run_git(&checkout, &["fetch", "--depth", "1", "origin", revision])
		.or_else(|_| run_git(&checkout, &["fetch", "origin", revision]))?;
	run_git(&checkout, &["checkout", "FETCH_HEAD"])?;

	Ok(FetchStatus::Updated)
}

/// Check that git exists on PATH before shelling out to it.
fn ensure_git_available() -> Result<()> {
	Command::new("git")
		.arg("--version")
		.output()
		.map_err(|_| GrammarBuildError::GitNotAvailable)?;
	Ok(())
}

fn run_git(dir: &Path, args: &[&str]) -> Result<()> {
	git_output(dir, args).map(|_| ())
}

fn git_output(dir: &Path, args: &[&str]) -> Result<String> {
	let output = Command::new("git")
		.args(args)
		.current_dir(dir)
		.output()
		.map_err(|e| GrammarBuildError::GitCommand(e.to_string()))?;

	if !output.status.success() {
		return Err(GrammarBuildError::GitCommand(format!(
			"git {}: {}",
			args.join(" "),
			String::from_utf8_lossy(&output.stderr).trim()
		)));
	}

	Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	#[test]
	fn local_sources_are_not_fetched() {
		let config = GrammarConfig {
			grammar_id: "scratch".into(),
			source: ArtifactSource::Local {
				path: PathBuf::from("/src/tree-sitter-scratch"),
			},
		};
		assert_eq!(fetch_grammar(&config).unwrap(), FetchStatus::Local);
	}
}
