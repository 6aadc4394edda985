//! Language handles.
//!
//! A [`Language`] wraps a validated grammar descriptor. Construction is the
//! one place the artifact/runtime boundary is checked: the descriptor must be
//! non-null, report a compatible ABI version, and carry a well-formed name.
//! Every failure mode of the boundary, including a panicking factory, is
//! folded into [`LoadError`] so nothing unwinds out of the check.

use std::ffi::CStr;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr::NonNull;

use thiserror::Error;
use tome_language::{
	ABI_VERSION, LanguageFn, MIN_COMPATIBLE_ABI_VERSION, RawLanguage, version_is_compatible,
};

/// Errors raised while constructing a [`Language`] from a descriptor.
#[derive(Debug, Error)]
pub enum LoadError {
	/// The factory returned a null descriptor.
	#[error("grammar descriptor is null")]
	Null,

	/// The descriptor was built against an unsupported ABI layout.
	#[error(
		"incompatible grammar ABI version {version} (supported {MIN_COMPATIBLE_ABI_VERSION}..={ABI_VERSION})"
	)]
	IncompatibleVersion { version: u32 },

	/// The descriptor's name is not valid UTF-8.
	#[error("grammar name is not valid UTF-8")]
	InvalidName,

	/// The factory panicked before returning a descriptor.
	#[error("grammar descriptor factory panicked")]
	FactoryPanicked,
}

/// A validated grammar descriptor.
///
/// Cheap to pass around; the underlying descriptor is immutable and lives for
/// the rest of the process.
pub struct Language {
	raw: NonNull<RawLanguage>,
	name: Option<String>,
}

// The descriptor is 'static and never written through.
unsafe impl Send for Language {}
unsafe impl Sync for Language {}

impl Language {
	/// Invokes a descriptor factory and validates the result.
	///
	/// The call is guarded: a factory that panics becomes
	/// [`LoadError::FactoryPanicked`] rather than an unwind.
	pub fn new(factory: LanguageFn) -> Result<Language, LoadError> {
		let raw = catch_unwind(AssertUnwindSafe(|| unsafe { (factory.into_raw())() }))
			.map_err(|_| LoadError::FactoryPanicked)?;
		// SAFETY: the factory contract requires the descriptor to outlive
		// the process.
		unsafe { Language::from_raw(raw) }
	}

	/// Validates a raw descriptor pointer, as returned by a factory symbol
	/// resolved from a shared library.
	///
	/// # Safety
	///
	/// `raw` must be null or point to a [`RawLanguage`] that stays valid and
	/// unmodified for the rest of the process lifetime.
	pub unsafe fn from_raw(raw: *const RawLanguage) -> Result<Language, LoadError> {
		let raw = NonNull::new(raw.cast_mut()).ok_or(LoadError::Null)?;
		let descriptor = unsafe { raw.as_ref() };

		if !version_is_compatible(descriptor.abi_version) {
			return Err(LoadError::IncompatibleVersion {
				version: descriptor.abi_version,
			});
		}

		let name = if descriptor.name.is_null() {
			None
		} else {
			let name = unsafe { CStr::from_ptr(descriptor.name) };
			Some(name.to_str().map_err(|_| LoadError::InvalidName)?.to_owned())
		};

		Ok(Language { raw, name })
	}

	/// ABI version the descriptor reports.
	pub fn abi_version(&self) -> u32 {
		unsafe { self.raw.as_ref() }.abi_version
	}

	/// Grammar name, if the artifact declares one.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Number of tokens produced by the grammar's external scanner.
	pub fn external_token_count(&self) -> u32 {
		unsafe { self.raw.as_ref() }.external_token_count
	}

	/// True if the grammar ships an external scanner.
	pub fn has_scanner(&self) -> bool {
		!unsafe { self.raw.as_ref() }.scanner.is_null()
	}
}

impl fmt::Debug for Language {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Language")
			.field("name", &self.name)
			.field("abi_version", &self.abi_version())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_descriptor_loads() {
		let language = Language::new(tome_grammar::language()).expect("tome grammar loads");
		assert_eq!(language.name(), Some("tome"));
		assert_eq!(language.abi_version(), ABI_VERSION);
		assert_eq!(language.external_token_count(), 3);
		assert!(language.has_scanner());
	}

	#[test]
	fn null_descriptor_is_rejected() {
		extern "C-unwind" fn factory() -> *const RawLanguage {
			std::ptr::null()
		}

		let err = Language::new(unsafe { LanguageFn::from_raw(factory) }).unwrap_err();
		assert!(matches!(err, LoadError::Null));
	}

	#[test]
	fn incompatible_version_is_rejected() {
		static STALE: RawLanguage = RawLanguage {
			abi_version: MIN_COMPATIBLE_ABI_VERSION - 1,
			name: std::ptr::null(),
			external_token_count: 0,
			external_token_names: std::ptr::null(),
			scanner: std::ptr::null(),
		};

		extern "C-unwind" fn factory() -> *const RawLanguage {
			&STALE
		}

		let err = Language::new(unsafe { LanguageFn::from_raw(factory) }).unwrap_err();
		assert!(matches!(
			err,
			LoadError::IncompatibleVersion { version } if version == MIN_COMPATIBLE_ABI_VERSION - 1
		));
	}

	#[test]
	fn panicking_factory_is_contained() {
		extern "C-unwind" fn factory() -> *const RawLanguage {
			panic!("factory exploded");
		}

		let err = Language::new(unsafe { LanguageFn::from_raw(factory) }).unwrap_err();
		assert!(matches!(err, LoadError::FactoryPanicked));
	}

	#[test]
	fn invalid_name_is_rejected() {
		static BAD_NAME: &[u8] = b"\xff\xfe\0";
		static BROKEN: RawLanguage = RawLanguage {
			abi_version: ABI_VERSION,
			name: BAD_NAME.as_ptr().cast(),
			external_token_count: 0,
			external_token_names: std::ptr::null(),
			scanner: std::ptr::null(),
		};

		extern "C-unwind" fn factory() -> *const RawLanguage {
			&BROKEN
		}

		let err = Language::new(unsafe { LanguageFn::from_raw(factory) }).unwrap_err();
		assert!(matches!(err, LoadError::InvalidName));
	}

	#[test]
	fn repeated_loads_agree() {
		let first = Language::new(tome_grammar::language()).expect("first load");
		let second = Language::new(tome_grammar::language()).expect("second load");
		assert_eq!(first.name(), second.name());
		assert_eq!(first.abi_version(), second.abi_version());
	}
}
