// Grammar operations must report through tracing, not stderr.
#![deny(clippy::print_stderr)]

//! Grammar loading runtime for the Tome language.
//!
//! A grammar artifact exposes one factory returning an opaque, versioned
//! descriptor; this crate turns that descriptor into a validated language
//! handle and knows where compiled grammar libraries live on disk.
//!
//! # Architecture
//!
//! * [`language`]: descriptor validation and the [`Language`] handle
//! * [`grammar`]: builtin registry and dynamic loading from shared libraries
//! * [`build`]: fetching grammar sources and compiling them on demand
//!
//! The Tome grammar itself is linked in via the `tome-grammar` artifact, so
//! `load_grammar("tome")` needs no filesystem at all; other grammars are
//! loaded from shared libraries found in the runtime directories, built from
//! source when `grammars.kdl` says how.

pub mod build;
pub mod grammar;
pub mod language;

pub use build::{BuildStatus, FetchStatus, GrammarBuildError, build_grammar, fetch_grammar};
pub use grammar::{
	Grammar, GrammarError, GrammarSource, cache_dir, grammar_search_paths, load_grammar,
	load_grammar_from, load_grammar_or_build, runtime_dir,
};
pub use language::{Language, LoadError};
