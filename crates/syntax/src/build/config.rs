//! Grammar source configuration from `grammars.kdl`.
//!
//! The config is a flat list of grammar nodes:
//!
//! ```kdl
//! grammar "zig" remote="https://github.com/tree-sitter-grammars/tree-sitter-zig" revision="b670c8d"
//! grammar "scratch" path="/home/me/src/tree-sitter-scratch"
//! ```
//!
//! Git sources are checked out under the cache directory; local sources are
//! compiled in place.

use std::fs;
use std::path::PathBuf;

use kdl::{KdlDocument, KdlNode};

use super::{GrammarBuildError, Result};
use crate::grammar::{cache_dir, runtime_dir};

/// Where a grammar's sources come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
	/// A git repository pinned to a revision.
	Git { remote: String, revision: String },
	/// A local checkout, used as-is.
	Local { path: PathBuf },
}

/// One entry of `grammars.kdl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
	pub grammar_id: String,
	pub source: ArtifactSource,
}

/// Loads grammar configurations from `grammars.kdl` in the runtime directory.
///
/// A missing file is not an error; it just means no buildable grammars are
/// configured.
pub fn load_grammar_configs() -> Result<Vec<GrammarConfig>> {
	let path = runtime_dir().join("grammars.kdl");
	if !path.exists() {
		return Ok(Vec::new());
	}

	let text = fs::read_to_string(&path)?;
	parse_grammar_configs(&text)
}

/// Parses a `grammars.kdl` document.
pub fn parse_grammar_configs(text: &str) -> Result<Vec<GrammarConfig>> {
	let doc: KdlDocument = text.parse()?;

	doc.nodes()
		.iter()
		.filter(|node| node.name().value() == "grammar")
		.map(parse_grammar_node)
		.collect()
}

fn parse_grammar_node(node: &KdlNode) -> Result<GrammarConfig> {
	let mut grammar_id = None;
	let mut remote = None;
	let mut revision = None;
	let mut path = None;

	for entry in node.entries() {
		let value = entry.value().as_string().map(str::to_owned);
		match entry.name().map(|n| n.value()) {
			None => grammar_id = value,
			Some("remote") => remote = value,
			Some("revision") => revision = value,
			Some("path") => path = value,
			Some(other) => {
				return Err(GrammarBuildError::ConfigParse(format!(
					"unknown grammar attribute: {other}"
				)));
			}
		}
	}

	let grammar_id = grammar_id
		.ok_or_else(|| GrammarBuildError::ConfigParse("grammar node missing a name".into()))?;

	let source = match (remote, revision, path) {
		(Some(remote), Some(revision), None) => ArtifactSource::Git { remote, revision },
		(None, None, Some(path)) => ArtifactSource::Local {
			path: PathBuf::from(path),
		},
		_ => {
			return Err(GrammarBuildError::ConfigParse(format!(
				"grammar {grammar_id} needs either remote+revision or path"
			)));
		}
	};

	Ok(GrammarConfig { grammar_id, source })
}

/// Directory where git grammar sources are checked out.
pub fn grammar_sources_dir() -> PathBuf {
	cache_dir()
		.map(|c| c.join("sources"))
		.unwrap_or_else(|| runtime_dir().join("sources"))
}

/// Directory where compiled grammar libraries are placed.
pub fn grammar_lib_dir() -> PathBuf {
	runtime_dir().join("grammars")
}

/// Directory holding a grammar's generated C sources (`parser.c`).
pub fn grammar_src_dir(grammar: &GrammarConfig) -> PathBuf {
	let checkout = match &grammar.source {
		ArtifactSource::Git { .. } => grammar_sources_dir().join(&grammar.grammar_id),
		ArtifactSource::Local { path } => path.clone(),
	};
	checkout.join("src")
}
