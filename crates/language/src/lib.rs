//! Shared ABI types for Tome grammar artifacts.
//!
//! A grammar artifact hands the runtime a single opaque value: a pointer to a
//! [`RawLanguage`] descriptor, obtained from a factory function exported as
//! `tree_sitter_<name>`. The descriptor carries a binary interface version so
//! the runtime can reject artifacts built against an incompatible layout
//! without either side depending on the other's implementation.
//!
//! Everything here is `#[repr(C)]` because the same descriptor must work both
//! for grammars linked into the process and for grammars loaded from shared
//! libraries at runtime.

use std::ffi::{c_char, c_void};

/// Current descriptor layout version. Artifacts built against this crate
/// report this version.
pub const ABI_VERSION: u32 = 15;

/// Oldest descriptor layout the runtime still accepts.
pub const MIN_COMPATIBLE_ABI_VERSION: u32 = 13;

/// Returns true if a descriptor reporting `version` can be used by this
/// runtime.
pub fn version_is_compatible(version: u32) -> bool {
	(MIN_COMPATIBLE_ABI_VERSION..=ABI_VERSION).contains(&version)
}

/// Lexing cursor handed to an external scanner.
///
/// This is the subset of the lexer interface external scanners drive:
/// one character of lookahead, a result slot, and callbacks to consume
/// input, freeze the token end, and test for end of input.
#[repr(C)]
pub struct RawLexer {
	/// Current lookahead character, as a Unicode scalar value.
	pub lookahead: i32,
	/// Symbol the scanner recognized, set before returning true from `scan`.
	pub result_symbol: u16,
	/// Consumes the lookahead character. `skip` excludes it from the token.
	pub advance: unsafe extern "C" fn(lexer: *mut RawLexer, skip: bool),
	/// Freezes the token end at the current position.
	pub mark_end: unsafe extern "C" fn(lexer: *mut RawLexer),
	/// Returns true once the cursor is past the end of input.
	pub eof: unsafe extern "C" fn(lexer: *const RawLexer) -> bool,
}

/// External scanner entry points.
///
/// Mirrors the `external_scanner_*` surface of compiled grammar libraries:
/// payload lifecycle, the scan callback, and state (de)serialization for
/// incremental re-use. A stateless scanner returns null from `create` and
/// zero from `serialize`.
#[repr(C)]
pub struct RawScanner {
	pub create: unsafe extern "C" fn() -> *mut c_void,
	pub destroy: unsafe extern "C" fn(payload: *mut c_void),
	pub scan: unsafe extern "C" fn(
		payload: *mut c_void,
		lexer: *mut RawLexer,
		valid_symbols: *const bool,
	) -> bool,
	pub serialize: unsafe extern "C" fn(payload: *mut c_void, buffer: *mut c_char) -> u32,
	pub deserialize:
		unsafe extern "C" fn(payload: *mut c_void, buffer: *const c_char, length: u32),
}

/// Opaque grammar descriptor.
///
/// Exchanged by pointer across the artifact/runtime boundary. The runtime
/// reads `abi_version` first and refuses the rest of the layout if the
/// version falls outside [`MIN_COMPATIBLE_ABI_VERSION`]..=[`ABI_VERSION`].
#[repr(C)]
pub struct RawLanguage {
	pub abi_version: u32,
	/// NUL-terminated grammar name, or null.
	pub name: *const c_char,
	/// Number of tokens produced by the external scanner.
	pub external_token_count: u32,
	/// NUL-terminated external token names, `external_token_count` entries.
	pub external_token_names: *const *const c_char,
	/// External scanner vtable, or null if the grammar has none.
	pub scanner: *const RawScanner,
}

// Descriptors only ever point at 'static data: the name and token-name
// strings and the scanner vtable live for the life of the artifact.
unsafe impl Send for RawLanguage {}
unsafe impl Sync for RawLanguage {}

/// A grammar descriptor factory, as exported by an artifact.
///
/// The `C-unwind` ABI lets the runtime contain a panicking factory instead
/// of aborting the process.
#[derive(Clone, Copy, Debug)]
pub struct LanguageFn(unsafe extern "C-unwind" fn() -> *const RawLanguage);

impl LanguageFn {
	/// Wraps a raw factory function.
	///
	/// # Safety
	///
	/// The function must return null or a pointer to a [`RawLanguage`] that
	/// stays valid for the rest of the process lifetime.
	pub const unsafe fn from_raw(f: unsafe extern "C-unwind" fn() -> *const RawLanguage) -> Self {
		Self(f)
	}

	/// Unwraps back into the raw factory function.
	pub const fn into_raw(self) -> unsafe extern "C-unwind" fn() -> *const RawLanguage {
		self.0
	}
}
