//! External scanner for Tome string literals.
//!
//! Tome strings allow `#{ expression }` interpolation, so three tokens are
//! scanned by hand: raw string content, and the start and end of an
//! interpolation. Apostrophes are ordinary string content; only `"`, `\` and
//! end of input terminate a content run.
//!
//! The scanner is stateless, so the payload/serialize half of the
//! [`RawScanner`] vtable is inert.

use std::ffi::{c_char, c_void};

use tome_language::{RawLexer, RawScanner};

/// Tokens produced by the external scanner, in symbol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum TokenType {
	StringContent = 0,
	InterpolationStart = 1,
	InterpolationEnd = 2,
}

/// Which external tokens the parser considers valid at the current position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidSymbols {
	pub string_content: bool,
	pub interpolation_start: bool,
	pub interpolation_end: bool,
}

impl ValidSymbols {
	/// All tokens valid, as during error recovery.
	pub const ALL: ValidSymbols = ValidSymbols {
		string_content: true,
		interpolation_start: true,
		interpolation_end: true,
	};
}

/// Lexing cursor the scanner drives.
///
/// The token ends at the last consumed character unless [`mark_end`] froze it
/// earlier; consuming past a frozen mark does not extend the token.
///
/// [`mark_end`]: Lexer::mark_end
pub trait Lexer {
	/// Next unconsumed character, or `None` at end of input.
	fn lookahead(&self) -> Option<char>;
	/// Consumes the lookahead character.
	fn advance(&mut self);
	/// Freezes the token end at the current position.
	fn mark_end(&mut self);
}

/// Runs the scanner at the current position.
///
/// Returns the recognized token, or `None` if no valid token matches. The
/// branches are ordered so interpolation delimiters win over content when the
/// parser allows both.
pub fn scan(lexer: &mut dyn Lexer, valid: ValidSymbols) -> Option<TokenType> {
	// Interpolation start: `#{`
	if valid.interpolation_start && lexer.lookahead() == Some('#') {
		lexer.advance();
		if lexer.lookahead() == Some('{') {
			lexer.advance();
			return Some(TokenType::InterpolationStart);
		}
		return None;
	}

	// Interpolation end: `}`
	if valid.interpolation_end && lexer.lookahead() == Some('}') {
		lexer.advance();
		return Some(TokenType::InterpolationEnd);
	}

	if valid.string_content {
		let mut has_content = false;

		loop {
			match lexer.lookahead() {
				// `"` ends the string, `\` starts an escape. Note no case
				// for `'`: apostrophes stay inside the content run.
				None | Some('"') | Some('\\') => break,
				Some('#') => {
					lexer.mark_end();
					lexer.advance();
					if lexer.lookahead() == Some('{') {
						// Interpolation ahead: emit what was consumed so far.
						return has_content.then_some(TokenType::StringContent);
					}
					// A lone `#` is regular content.
					has_content = true;
				}
				Some(_) => {
					has_content = true;
					lexer.advance();
				}
			}
		}

		lexer.mark_end();
		return has_content.then_some(TokenType::StringContent);
	}

	None
}

struct RawCursor {
	raw: *mut RawLexer,
}

impl Lexer for RawCursor {
	fn lookahead(&self) -> Option<char> {
		unsafe {
			if ((*self.raw).eof)(self.raw) {
				return None;
			}
			char::from_u32((*self.raw).lookahead as u32)
		}
	}

	fn advance(&mut self) {
		unsafe { ((*self.raw).advance)(self.raw, false) }
	}

	fn mark_end(&mut self) {
		unsafe { ((*self.raw).mark_end)(self.raw) }
	}
}

unsafe extern "C" fn create() -> *mut c_void {
	std::ptr::null_mut()
}

unsafe extern "C" fn destroy(_payload: *mut c_void) {}

unsafe extern "C" fn serialize(_payload: *mut c_void, _buffer: *mut c_char) -> u32 {
	0
}

unsafe extern "C" fn deserialize(_payload: *mut c_void, _buffer: *const c_char, _length: u32) {}

unsafe extern "C" fn scan_raw(
	_payload: *mut c_void,
	lexer: *mut RawLexer,
	valid_symbols: *const bool,
) -> bool {
	let valid = unsafe {
		ValidSymbols {
			string_content: *valid_symbols.add(TokenType::StringContent as usize),
			interpolation_start: *valid_symbols.add(TokenType::InterpolationStart as usize),
			interpolation_end: *valid_symbols.add(TokenType::InterpolationEnd as usize),
		}
	};

	let mut cursor = RawCursor { raw: lexer };
	match scan(&mut cursor, valid) {
		Some(token) => {
			unsafe { (*lexer).result_symbol = token as u16 };
			true
		}
		None => false,
	}
}

/// Scanner vtable referenced by the language descriptor.
pub(crate) static SCANNER: RawScanner = RawScanner {
	create,
	destroy,
	scan: scan_raw,
	serialize,
	deserialize,
};

#[cfg(test)]
mod tests {
	use super::*;

	/// In-memory lexer over a str, tracking the frozen token end.
	struct StrLexer {
		chars: Vec<char>,
		pos: usize,
		mark: Option<usize>,
	}

	impl StrLexer {
		fn new(input: &str) -> Self {
			StrLexer {
				chars: input.chars().collect(),
				pos: 0,
				mark: None,
			}
		}

		/// Characters inside the recognized token.
		fn token_end(&self) -> usize {
			self.mark.unwrap_or(self.pos)
		}

		fn token_text(&self) -> String {
			self.chars[..self.token_end()].iter().collect()
		}
	}

	impl Lexer for StrLexer {
		fn lookahead(&self) -> Option<char> {
			self.chars.get(self.pos).copied()
		}

		fn advance(&mut self) {
			if self.pos < self.chars.len() {
				self.pos += 1;
			}
		}

		fn mark_end(&mut self) {
			self.mark = Some(self.pos);
		}
	}

	fn content_only() -> ValidSymbols {
		ValidSymbols {
			string_content: true,
			..ValidSymbols::default()
		}
	}

	#[test]
	fn interpolation_start() {
		let mut lexer = StrLexer::new("#{name}");
		let valid = ValidSymbols {
			interpolation_start: true,
			..ValidSymbols::default()
		};
		assert_eq!(scan(&mut lexer, valid), Some(TokenType::InterpolationStart));
		assert_eq!(lexer.pos, 2);
	}

	#[test]
	fn hash_without_brace_is_not_interpolation() {
		let mut lexer = StrLexer::new("#tag");
		let valid = ValidSymbols {
			interpolation_start: true,
			..ValidSymbols::default()
		};
		assert_eq!(scan(&mut lexer, valid), None);
	}

	#[test]
	fn interpolation_end() {
		let mut lexer = StrLexer::new("} rest");
		let valid = ValidSymbols {
			interpolation_end: true,
			..ValidSymbols::default()
		};
		assert_eq!(scan(&mut lexer, valid), Some(TokenType::InterpolationEnd));
		assert_eq!(lexer.pos, 1);
	}

	#[test]
	fn content_stops_at_quote() {
		let mut lexer = StrLexer::new("hello\" tail");
		assert_eq!(
			scan(&mut lexer, content_only()),
			Some(TokenType::StringContent)
		);
		assert_eq!(lexer.token_text(), "hello");
	}

	#[test]
	fn content_stops_at_escape() {
		let mut lexer = StrLexer::new("ab\\n");
		assert_eq!(
			scan(&mut lexer, content_only()),
			Some(TokenType::StringContent)
		);
		assert_eq!(lexer.token_text(), "ab");
	}

	#[test]
	fn content_stops_at_eof() {
		let mut lexer = StrLexer::new("unterminated");
		assert_eq!(
			scan(&mut lexer, content_only()),
			Some(TokenType::StringContent)
		);
		assert_eq!(lexer.token_text(), "unterminated");
	}

	#[test]
	fn apostrophes_are_content() {
		let mut lexer = StrLexer::new("it's fine\"");
		assert_eq!(
			scan(&mut lexer, content_only()),
			Some(TokenType::StringContent)
		);
		assert_eq!(lexer.token_text(), "it's fine");
	}

	#[test]
	fn content_ends_before_interpolation() {
		let mut lexer = StrLexer::new("hi #{name}\"");
		assert_eq!(
			scan(&mut lexer, content_only()),
			Some(TokenType::StringContent)
		);
		// The `#` was peeked past but the mark keeps it out of the token.
		assert_eq!(lexer.token_text(), "hi ");
	}

	#[test]
	fn lone_hash_is_content() {
		let mut lexer = StrLexer::new("a # b\"");
		assert_eq!(
			scan(&mut lexer, content_only()),
			Some(TokenType::StringContent)
		);
		assert_eq!(lexer.token_text(), "a # b");
	}

	#[test]
	fn empty_content_is_no_token() {
		let mut lexer = StrLexer::new("\"closed\"");
		assert_eq!(scan(&mut lexer, content_only()), None);
	}

	#[test]
	fn immediate_interpolation_is_no_content() {
		let mut lexer = StrLexer::new("#{x}\"");
		assert_eq!(scan(&mut lexer, content_only()), None);
	}

	#[test]
	fn delimiters_win_over_content() {
		let mut lexer = StrLexer::new("#{x}");
		assert_eq!(
			scan(&mut lexer, ValidSymbols::ALL),
			Some(TokenType::InterpolationStart)
		);
	}

	#[test]
	fn nothing_valid_scans_nothing() {
		let mut lexer = StrLexer::new("anything");
		assert_eq!(scan(&mut lexer, ValidSymbols::default()), None);
		assert_eq!(lexer.pos, 0);
	}
}
