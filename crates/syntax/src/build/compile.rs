//! Grammar compilation into dynamic libraries.
//!
//! The `cc` crate resolves a suitable system compiler and its base flags;
//! the link into a shared library is a single direct compiler invocation on
//! the grammar's C sources.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use super::config::{GrammarConfig, grammar_lib_dir, grammar_src_dir};
use super::{GrammarBuildError, Result};
use crate::grammar::grammar_library_name;

/// Status of a build operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
	/// Grammar was already built and up to date.
	AlreadyBuilt,
	/// Grammar was newly built.
	Built,
}

/// Compiles a grammar's C sources into a dynamic library.
///
/// Skips the compile when the existing library is newer than every source
/// file.
///
/// # Errors
///
/// * [`GrammarBuildError::NoParserSource`] if the checkout has no `parser.c`.
/// * [`GrammarBuildError::Compilation`] if no compiler is found or the
///   compile fails.
pub fn build_grammar(grammar: &GrammarConfig) -> Result<BuildStatus> {
	let src_dir = grammar_src_dir(grammar);
	let parser = src_dir.join("parser.c");
	if !parser.exists() {
		return Err(GrammarBuildError::NoParserSource(src_dir));
	}

	let lib_dir = grammar_lib_dir();
	fs::create_dir_all(&lib_dir)?;
	let lib_path = lib_dir.join(grammar_library_name(&grammar.grammar_id));

	if !needs_recompile(&src_dir, &lib_path) {
		debug!(grammar = %grammar.grammar_id, lib = %lib_path.display(), "Grammar already built");
		return Ok(BuildStatus::AlreadyBuilt);
	}

	info!(grammar = %grammar.grammar_id, lib = %lib_path.display(), "Compiling grammar");

	let scanner = src_dir.join("scanner.c");
	let mut command = shared_library_command(&src_dir, &lib_path)?;
	command.arg(&parser);
	if scanner.exists() {
		command.arg(&scanner);
	}

	let output = command
		.output()
		.map_err(|e| GrammarBuildError::Compilation(e.to_string()))?;
	if !output.status.success() {
		return Err(GrammarBuildError::Compilation(
			String::from_utf8_lossy(&output.stderr).into(),
		));
	}

	if !lib_path.exists() {
		return Err(GrammarBuildError::Compilation(format!(
			"compilation succeeded but library not found at {}",
			lib_path.display()
		)));
	}

	Ok(BuildStatus::Built)
}

/// Returns true if any source file is newer than the compiled library.
fn needs_recompile(src_dir: &Path, lib_path: &Path) -> bool {
	let Ok(lib_mtime) = fs::metadata(lib_path).and_then(|m| m.modified()) else {
		return true;
	};

	["parser.c", "scanner.c"].iter().any(|file| {
		fs::metadata(src_dir.join(file))
			.and_then(|m| m.modified())
			.is_ok_and(|src_mtime| src_mtime > lib_mtime)
	})
}

/// Builds the compiler command that produces a shared library at `lib_path`.
///
/// Outside a cargo build script, `cc` needs host/target and codegen options
/// spelled out before it will hand over a compiler.
fn shared_library_command(src_dir: &Path, lib_path: &Path) -> Result<Command> {
	let triple = host_triple();

	let mut build = cc::Build::new();
	build
		.cargo_metadata(false)
		.warnings(false)
		.opt_level(3)
		.debug(false)
		.host(&triple)
		.target(&triple)
		.include(src_dir);

	let compiler = build
		.try_get_compiler()
		.map_err(|e| GrammarBuildError::Compilation(e.to_string()))?;

	let mut command = compiler.to_command();
	if compiler.is_like_msvc() {
		command
			.args(["/nologo", "/LD", "/utf-8"])
			.arg(format!("/Fe:{}", lib_path.display()));
	} else {
		command
			.args(["-shared", "-fPIC", "-fno-exceptions", "-o"])
			.arg(lib_path);
		#[cfg(target_os = "linux")]
		command.arg("-Wl,-z,relro,-z,now");
	}

	Ok(command)
}

/// Target triple of the running binary, for `cc`'s host/target handshake.
fn host_triple() -> String {
	std::env::var("TARGET").unwrap_or_else(|_| {
		let arch = std::env::consts::ARCH;
		if cfg!(target_os = "windows") {
			format!("{arch}-pc-windows-msvc")
		} else if cfg!(target_os = "macos") {
			format!("{arch}-apple-darwin")
		} else {
			format!("{arch}-unknown-linux-gnu")
		}
	})
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::super::config::ArtifactSource;
	use super::*;

	fn local_config(dir: &Path) -> GrammarConfig {
		GrammarConfig {
			grammar_id: "scratch".into(),
			source: ArtifactSource::Local {
				path: dir.to_path_buf(),
			},
		}
	}

	#[test]
	fn missing_parser_source_is_an_error() {
		let checkout = TempDir::new().unwrap();
		fs::create_dir_all(checkout.path().join("src")).unwrap();

		let err = build_grammar(&local_config(checkout.path())).unwrap_err();
		assert!(matches!(err, GrammarBuildError::NoParserSource(_)));
	}

	#[test]
	fn missing_library_needs_recompile() {
		let src = TempDir::new().unwrap();
		fs::write(src.path().join("parser.c"), "int x;").unwrap();

		assert!(needs_recompile(src.path(), &src.path().join("libnope.so")));
	}

	#[test]
	fn fresh_library_does_not_need_recompile() {
		let src = TempDir::new().unwrap();
		fs::write(src.path().join("parser.c"), "int x;").unwrap();
		// Written after the sources, so its mtime is at least as new.
		let lib = src.path().join("libscratch.so");
		fs::write(&lib, "").unwrap();

		assert!(!needs_recompile(src.path(), &lib));
	}

	#[test]
	fn host_triple_is_well_formed() {
		let triple = host_triple();
		assert!(triple.contains('-'));
	}
}
