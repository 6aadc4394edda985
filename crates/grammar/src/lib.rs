//! The Tome grammar artifact.
//!
//! Exposes the language descriptor for the Tome language through the standard
//! factory symbol (`tree_sitter_tome`), so the same crate works both linked
//! into the process and compiled as a `cdylib` loaded by the runtime's
//! dynamic loader.
//!
//! The grammar's only hand-written piece is the [`scanner`]: Tome string
//! literals support `#{ ... }` interpolation, which the generated lexer
//! cannot tokenize on its own.

pub mod scanner;

use std::ffi::c_char;

use tome_language::{ABI_VERSION, LanguageFn, RawLanguage};

use crate::scanner::SCANNER;

/// Name the runtime knows this grammar by.
pub const GRAMMAR_NAME: &str = "tome";

const NAME: &[u8] = b"tome\0";

struct TokenNames([*const c_char; 3]);

// The pointers reference string constants baked into the artifact.
unsafe impl Sync for TokenNames {}

/// External token names, in symbol order (see [`scanner::TokenType`]).
static TOKEN_NAMES: TokenNames = TokenNames([
	b"string_content\0".as_ptr().cast(),
	b"interpolation_start\0".as_ptr().cast(),
	b"interpolation_end\0".as_ptr().cast(),
]);

static TOME: RawLanguage = RawLanguage {
	abi_version: ABI_VERSION,
	name: NAME.as_ptr().cast(),
	external_token_count: 3,
	external_token_names: TOKEN_NAMES.0.as_ptr(),
	scanner: &SCANNER,
};

/// Descriptor factory, exported under the symbol a compiled grammar library
/// carries so `dlopen` + `tree_sitter_tome` resolution finds it.
#[unsafe(no_mangle)]
pub extern "C-unwind" fn tree_sitter_tome() -> *const RawLanguage {
	&TOME
}

/// Returns the descriptor factory for the Tome grammar.
pub fn language() -> LanguageFn {
	LANGUAGE
}

/// The descriptor factory as a constant, for embedding in language tables.
// SAFETY: `tree_sitter_tome` returns a pointer to a static descriptor.
pub const LANGUAGE: LanguageFn = unsafe { LanguageFn::from_raw(tree_sitter_tome) };

#[cfg(test)]
mod tests {
	use std::ffi::CStr;

	use super::*;

	#[test]
	fn descriptor_is_well_formed() {
		let raw = tree_sitter_tome();
		assert!(!raw.is_null());

		let raw = unsafe { &*raw };
		assert_eq!(raw.abi_version, ABI_VERSION);
		assert_eq!(raw.external_token_count, 3);
		assert!(!raw.scanner.is_null());

		let name = unsafe { CStr::from_ptr(raw.name) };
		assert_eq!(name.to_str().unwrap(), GRAMMAR_NAME);
	}

	#[test]
	fn token_names_match_symbol_order() {
		let raw = unsafe { &*tree_sitter_tome() };
		let names: Vec<&str> = (0..raw.external_token_count as usize)
			.map(|i| unsafe { CStr::from_ptr(*raw.external_token_names.add(i)) })
			.map(|c| c.to_str().unwrap())
			.collect();
		assert_eq!(
			names,
			["string_content", "interpolation_start", "interpolation_end"]
		);
	}

	#[test]
	fn factory_is_stable_across_calls() {
		assert_eq!(tree_sitter_tome(), tree_sitter_tome());
	}
}
