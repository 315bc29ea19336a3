use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{QualifierError, Result};

static NEXT_ANONYMOUS: AtomicU64 = AtomicU64::new(1);

/// Untyped identity of a metadata slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyId {
	/// Content-addressed key; equal iff names are equal.
	Named(Cow<'static, str>),
	/// Identity-addressed key; unique per [`ExtensionKey::anonymous`] call.
	Anonymous(u64),
}

impl KeyId {
	/// Returns the name of a named key.
	pub fn name(&self) -> Result<&str> {
		match self {
			KeyId::Named(name) => Ok(name),
			KeyId::Anonymous(_) => Err(QualifierError::AnonymousKey),
		}
	}

	/// Returns `true` for anonymous keys.
	pub fn is_anonymous(&self) -> bool {
		matches!(self, KeyId::Anonymous(_))
	}
}

impl fmt::Display for KeyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			KeyId::Named(name) => f.write_str(name),
			KeyId::Anonymous(n) => write!(f, "<anonymous #{n}>"),
		}
	}
}

/// Typed handle to a metadata slot.
///
/// The type parameter is a phantom: it drives the typed accessors of
/// [`MetadataStore`](crate::MetadataStore) but plays no part in equality. Two
/// named keys with the same name address the same slot whatever their `T`;
/// reading a slot through a key of the wrong type is reported as a mismatch.
pub struct ExtensionKey<T> {
	id: KeyId,
	_marker: PhantomData<fn() -> T>,
}

impl<T> ExtensionKey<T> {
	/// Creates a named key usable in `static` and `const` items.
	pub const fn named(name: &'static str) -> Self {
		Self {
			id: KeyId::Named(Cow::Borrowed(name)),
			_marker: PhantomData,
		}
	}

	/// Creates a named key from a runtime string.
	pub fn owned(name: impl Into<String>) -> Self {
		Self {
			id: KeyId::Named(Cow::Owned(name.into())),
			_marker: PhantomData,
		}
	}

	/// Creates a fresh anonymous key, distinct from every other key.
	pub fn anonymous() -> Self {
		Self {
			id: KeyId::Anonymous(NEXT_ANONYMOUS.fetch_add(1, Ordering::Relaxed)),
			_marker: PhantomData,
		}
	}

	/// Returns the key name.
	///
	/// # Errors
	///
	/// [`QualifierError::AnonymousKey`] for anonymous keys.
	pub fn name(&self) -> Result<&str> {
		self.id.name()
	}

	/// Returns the untyped identity.
	pub fn id(&self) -> &KeyId {
		&self.id
	}

	/// Returns `true` for anonymous keys.
	pub fn is_anonymous(&self) -> bool {
		self.id.is_anonymous()
	}

	/// Reinterprets the key with another value type, addressing the same slot.
	pub fn cast<U>(&self) -> ExtensionKey<U> {
		ExtensionKey {
			id: self.id.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> Clone for ExtensionKey<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> PartialEq for ExtensionKey<T> {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl<T> Eq for ExtensionKey<T> {}

impl<T> Hash for ExtensionKey<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl<T> fmt::Debug for ExtensionKey<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ExtensionKey").field(&self.id).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn named_keys_compare_by_name() {
		let a: ExtensionKey<String> = ExtensionKey::named("label");
		let b: ExtensionKey<String> = ExtensionKey::owned("label".to_string());
		assert_eq!(a, b);
		assert_eq!(a.name(), Ok("label"));
	}

	#[test]
	fn anonymous_keys_are_unique_and_unnamed() {
		let a: ExtensionKey<i64> = ExtensionKey::anonymous();
		let b: ExtensionKey<i64> = ExtensionKey::anonymous();
		assert_ne!(a, b);
		assert_eq!(a.clone(), a);
		assert_eq!(a.name(), Err(QualifierError::AnonymousKey));
	}

	#[test]
	fn cast_keeps_identity() {
		let a: ExtensionKey<i64> = ExtensionKey::anonymous();
		let b: ExtensionKey<bool> = a.cast();
		assert_eq!(a.id(), b.id());
	}
}
