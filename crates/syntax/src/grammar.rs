//! Grammar loading and search path configuration.
//!
//! Grammars come from two places: artifacts linked into the binary (the Tome
//! grammar itself) and shared libraries compiled from grammar sources. This
//! module handles locating and loading both, with fetch-and-build fallback
//! for grammars that are configured but not yet compiled.
//!
//! # Runtime Directory
//!
//! Runtime data (compiled grammars, `grammars.kdl`) lives in
//! `~/.local/share/tome/`. The `TOME_RUNTIME` environment variable overrides
//! the whole chain for development.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use thiserror::Error;
use tracing::{info, warn};
use tome_language::{LanguageFn, RawLanguage};

use crate::build::GrammarBuildError;
use crate::language::{Language, LoadError};

/// Errors that can occur when loading a grammar.
#[derive(Error, Debug)]
pub enum GrammarError {
	/// Grammar is neither builtin nor present in any search path.
	#[error("grammar not found: {0}")]
	NotFound(String),

	/// Failed to load the dynamic library.
	#[error("failed to load grammar library: {0}")]
	Load(String),

	/// Grammar library exists but doesn't export the expected symbol.
	#[error("grammar library missing language function: {0}")]
	MissingSymbol(String),

	/// The library loaded but its descriptor failed validation.
	#[error("incompatible grammar: {0}")]
	Incompatible(#[from] LoadError),

	/// Fetch-and-build fallback failed.
	#[error("failed to build grammar: {0}")]
	Build(#[from] GrammarBuildError),

	/// Filesystem I/O error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Source for loading a grammar.
#[derive(Debug, Clone)]
pub enum GrammarSource {
	/// Grammar built into the binary.
	Builtin(&'static str),
	/// Grammar loaded from a shared library file.
	Library(PathBuf),
}

/// A loaded grammar.
///
/// Keeps the backing shared library (if any) alive for as long as the
/// language handle is in use.
#[derive(Debug)]
pub struct Grammar {
	language: Language,
	_library: Option<Library>,
}

impl Grammar {
	/// The validated language handle.
	pub fn language(&self) -> &Language {
		&self.language
	}
}

/// Descriptor factories for grammars linked into the binary.
fn builtin_factory(name: &str) -> Option<LanguageFn> {
	match name {
		tome_grammar::GRAMMAR_NAME => Some(tome_grammar::language()),
		_ => None,
	}
}

/// Loads a grammar from an explicit source.
pub fn load_grammar_from(source: &GrammarSource) -> Result<Grammar, GrammarError> {
	match source {
		GrammarSource::Builtin(name) => {
			let factory = builtin_factory(name)
				.ok_or_else(|| GrammarError::NotFound((*name).to_string()))?;
			Ok(Grammar {
				language: Language::new(factory)?,
				_library: None,
			})
		}
		GrammarSource::Library(path) => {
			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.map(|s| s.trim_start_matches("lib").to_string())
				.ok_or_else(|| GrammarError::Load(format!("bad library path: {}", path.display())))?;
			load_grammar_from_path(path, &name)
		}
	}
}

/// Loads a grammar by name.
///
/// Builtin grammars win; otherwise all configured grammar directories are
/// searched for a matching shared library. If the grammar is not found,
/// returns [`GrammarError::NotFound`].
///
/// For automatic fetching/building of missing grammars, use
/// [`load_grammar_or_build`].
pub fn load_grammar(name: &str) -> Result<Grammar, GrammarError> {
	if let Some(factory) = builtin_factory(name) {
		return Ok(Grammar {
			language: Language::new(factory)?,
			_library: None,
		});
	}

	let lib_name = grammar_library_name(name);
	for dir in grammar_search_paths() {
		let lib_path = dir.join(&lib_name);
		if lib_path.exists() {
			return load_grammar_from_path(&lib_path, name);
		}
	}

	Err(GrammarError::NotFound(name.to_string()))
}

/// Loads a grammar by name, automatically fetching and building if necessary.
///
/// If the grammar is not found and `grammars.kdl` contains an entry for it,
/// the source is fetched and compiled, then loading is retried. This gives a
/// "just works" path for grammars configured but never built.
pub fn load_grammar_or_build(name: &str) -> Result<Grammar, GrammarError> {
	match load_grammar(name) {
		Ok(grammar) => return Ok(grammar),
		Err(GrammarError::NotFound(_)) => {
			info!(grammar = name, "Grammar not found, attempting to fetch and build");
		}
		Err(e) => return Err(e),
	}

	if let Err(e) = auto_build_grammar(name) {
		warn!(grammar = name, error = %e, "Failed to auto-build grammar");
		return Err(e);
	}

	load_grammar(name)
}

/// Fetches grammar source from git and compiles it to a shared library.
fn auto_build_grammar(name: &str) -> Result<(), GrammarError> {
	use crate::build::{build_grammar, fetch_grammar, load_grammar_configs};

	let configs = load_grammar_configs()?;
	let config = configs
		.into_iter()
		.find(|c| c.grammar_id == name)
		.ok_or_else(|| GrammarError::NotFound(format!("{name} (no entry in grammars.kdl)")))?;

	info!(grammar = name, "Fetching grammar source");
	fetch_grammar(&config)?;

	info!(grammar = name, "Building grammar");
	build_grammar(&config)?;

	info!(grammar = name, "Successfully built grammar");
	Ok(())
}

/// Loads a grammar from a specific library path.
fn load_grammar_from_path(path: &Path, name: &str) -> Result<Grammar, GrammarError> {
	let symbol_name = format!("tree_sitter_{}", name.replace('-', "_"));

	// SAFETY: loading a grammar artifact from a dynamic library; the library
	// is kept alive alongside the language handle.
	unsafe {
		let library = Library::new(path)
			.map_err(|e| GrammarError::Load(format!("{}: {e}", path.display())))?;

		let factory: Symbol<unsafe extern "C-unwind" fn() -> *const RawLanguage> = library
			.get(symbol_name.as_bytes())
			.map_err(|_| GrammarError::MissingSymbol(symbol_name))?;

		let language = Language::from_raw(factory())?;

		Ok(Grammar {
			language,
			_library: Some(library),
		})
	}
}

/// Returns the platform-specific library filename for a grammar.
pub(crate) fn grammar_library_name(name: &str) -> String {
	let safe_name = name.replace('-', "_");
	#[cfg(target_os = "macos")]
	{
		format!("lib{safe_name}.dylib")
	}
	#[cfg(target_os = "windows")]
	{
		format!("{safe_name}.dll")
	}
	#[cfg(not(any(target_os = "macos", target_os = "windows")))]
	{
		format!("lib{safe_name}.so")
	}
}

/// Returns the primary runtime directory: `~/.local/share/tome/`.
pub fn runtime_dir() -> PathBuf {
	if let Ok(runtime) = std::env::var("TOME_RUNTIME") {
		return PathBuf::from(runtime);
	}

	data_local_dir()
		.map(|d| d.join("tome"))
		.unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the cache directory: `~/.cache/tome/`.
pub fn cache_dir() -> Option<PathBuf> {
	#[cfg(unix)]
	{
		std::env::var_os("XDG_CACHE_HOME")
			.map(PathBuf::from)
			.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))
			.map(|p| p.join("tome"))
	}
	#[cfg(windows)]
	{
		std::env::var_os("LOCALAPPDATA").map(|p| PathBuf::from(p).join("tome").join("cache"))
	}
	#[cfg(not(any(unix, windows)))]
	{
		None
	}
}

/// Returns directories to search for compiled grammar libraries.
/// Order: `TOME_RUNTIME` env, cache dir, data dir, bundled next to the
/// executable.
pub fn grammar_search_paths() -> Vec<PathBuf> {
	let mut dirs = Vec::new();

	if let Ok(runtime) = std::env::var("TOME_RUNTIME") {
		dirs.push(PathBuf::from(runtime).join("grammars"));
	}

	if let Some(cache) = cache_dir() {
		dirs.push(cache.join("grammars"));
	}

	if let Some(data) = data_local_dir() {
		dirs.push(data.join("tome").join("grammars"));
	}

	if let Ok(exe_path) = std::env::current_exe()
		&& let Some(exe_dir) = exe_path.parent()
	{
		dirs.push(exe_dir.join("grammars"));
		// Installed packages keep grammars under ../share/tome/.
		dirs.push(exe_dir.join("..").join("share").join("tome").join("grammars"));
	}

	dirs
}

/// Returns the platform-specific local data directory.
fn data_local_dir() -> Option<PathBuf> {
	#[cfg(unix)]
	{
		std::env::var_os("XDG_DATA_HOME")
			.map(PathBuf::from)
			.or_else(|| {
				std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share"))
			})
	}
	#[cfg(windows)]
	{
		std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
	}
	#[cfg(not(any(unix, windows)))]
	{
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_tome_loads_without_filesystem() {
		let grammar = load_grammar("tome").expect("builtin grammar");
		assert_eq!(grammar.language().name(), Some("tome"));
	}

	#[test]
	fn unknown_grammar_is_not_found() {
		let err = load_grammar("no-such-grammar").unwrap_err();
		assert!(matches!(err, GrammarError::NotFound(name) if name == "no-such-grammar"));
	}

	#[test]
	fn missing_library_source_fails_to_load() {
		let err =
			load_grammar_from(&GrammarSource::Library(PathBuf::from("/nonexistent/libx.so")))
				.unwrap_err();
		assert!(matches!(err, GrammarError::Load(_)));
	}

	#[test]
	fn grammar_search_paths_not_empty() {
		assert!(!grammar_search_paths().is_empty());
	}

	#[test]
	fn library_name_is_platform_shaped() {
		let name = grammar_library_name("tome-lang");
		#[cfg(target_os = "linux")]
		assert_eq!(name, "libtome_lang.so");
		#[cfg(target_os = "macos")]
		assert_eq!(name, "libtome_lang.dylib");
		#[cfg(target_os = "windows")]
		assert_eq!(name, "tome_lang.dll");
	}

	#[test]
	fn cache_dir_is_some() {
		#[cfg(unix)]
		assert!(cache_dir().is_some());
	}
}
