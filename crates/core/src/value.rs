use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A metadata value.
///
/// Literal variants can be rendered back into source by the code generator;
/// [`MetaValue::Opaque`] carries arbitrary shared values (comparators,
/// processor state) that never leave the process.
#[derive(Clone)]
pub enum MetaValue {
	/// Boolean value.
	Bool(bool),
	/// Integer value.
	Int(i64),
	/// Floating point value.
	Float(f64),
	/// String value.
	Str(Cow<'static, str>),
	/// Homogeneous or mixed list of values.
	List(Vec<MetaValue>),
	/// Any other shared value.
	Opaque(OpaqueValue),
}

/// Shared, type-erased payload of [`MetaValue::Opaque`].
#[derive(Clone)]
pub struct OpaqueValue {
	type_name: &'static str,
	value: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
	/// Wraps a shared value.
	pub fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Self {
			type_name: type_name::<T>(),
			value,
		}
	}

	/// Returns the Rust type name of the payload.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Returns the payload if it is a `T`.
	pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		Arc::clone(&self.value).downcast::<T>().ok()
	}

	/// Returns `true` if the payload is a `T`.
	pub fn is<T: Any>(&self) -> bool {
		self.value.is::<T>()
	}
}

/// The kind of a [`MetaValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
	/// [`MetaValue::Bool`].
	Bool,
	/// [`MetaValue::Int`].
	Int,
	/// [`MetaValue::Float`].
	Float,
	/// [`MetaValue::Str`].
	Str,
	/// [`MetaValue::List`].
	List,
	/// [`MetaValue::Opaque`].
	Opaque,
}

impl fmt::Display for ValueKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ValueKind::Bool => "bool",
			ValueKind::Int => "int",
			ValueKind::Float => "float",
			ValueKind::Str => "string",
			ValueKind::List => "list",
			ValueKind::Opaque => "opaque",
		})
	}
}

impl MetaValue {
	/// Returns the kind of this value.
	pub fn kind(&self) -> ValueKind {
		match self {
			MetaValue::Bool(_) => ValueKind::Bool,
			MetaValue::Int(_) => ValueKind::Int,
			MetaValue::Float(_) => ValueKind::Float,
			MetaValue::Str(_) => ValueKind::Str,
			MetaValue::List(_) => ValueKind::List,
			MetaValue::Opaque(_) => ValueKind::Opaque,
		}
	}

	/// Returns `true` if the value can be written back as a source literal.
	pub fn is_literal(&self) -> bool {
		match self {
			MetaValue::Opaque(_) => false,
			MetaValue::List(items) => items.iter().all(MetaValue::is_literal),
			_ => true,
		}
	}

	/// Describes the stored value for diagnostics.
	pub fn describe(&self) -> String {
		match self {
			MetaValue::Opaque(v) => format!("opaque {}", v.type_name()),
			other => other.kind().to_string(),
		}
	}

	/// Returns the boolean value if this is a `Bool` variant.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			MetaValue::Bool(v) => Some(*v),
			_ => None,
		}
	}

	/// Returns the integer value if this is an `Int` variant.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			MetaValue::Int(v) => Some(*v),
			_ => None,
		}
	}

	/// Returns the string value if this is a `Str` variant.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			MetaValue::Str(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the opaque payload if this is an `Opaque` variant.
	pub fn as_opaque(&self) -> Option<&OpaqueValue> {
		match self {
			MetaValue::Opaque(v) => Some(v),
			_ => None,
		}
	}
}

impl fmt::Debug for MetaValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MetaValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
			MetaValue::Int(v) => f.debug_tuple("Int").field(v).finish(),
			MetaValue::Float(v) => f.debug_tuple("Float").field(v).finish(),
			MetaValue::Str(v) => f.debug_tuple("Str").field(v).finish(),
			MetaValue::List(v) => f.debug_tuple("List").field(v).finish(),
			MetaValue::Opaque(v) => f.debug_tuple("Opaque").field(&v.type_name).finish(),
		}
	}
}

impl PartialEq for MetaValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(MetaValue::Bool(a), MetaValue::Bool(b)) => a == b,
			(MetaValue::Int(a), MetaValue::Int(b)) => a == b,
			(MetaValue::Float(a), MetaValue::Float(b)) => a == b,
			(MetaValue::Str(a), MetaValue::Str(b)) => a == b,
			(MetaValue::List(a), MetaValue::List(b)) => a == b,
			(MetaValue::Opaque(a), MetaValue::Opaque(b)) => Arc::ptr_eq(&a.value, &b.value),
			_ => false,
		}
	}
}

impl From<bool> for MetaValue {
	fn from(v: bool) -> Self {
		MetaValue::Bool(v)
	}
}

impl From<i64> for MetaValue {
	fn from(v: i64) -> Self {
		MetaValue::Int(v)
	}
}

impl From<f64> for MetaValue {
	fn from(v: f64) -> Self {
		MetaValue::Float(v)
	}
}

impl From<String> for MetaValue {
	fn from(v: String) -> Self {
		MetaValue::Str(Cow::Owned(v))
	}
}

impl From<&'static str> for MetaValue {
	fn from(v: &'static str) -> Self {
		MetaValue::Str(Cow::Borrowed(v))
	}
}

/// Rust types that can live in a metadata store.
///
/// `KIND` is the variant the value is stored as. Conversions are exact: an
/// `i32` key will not read an `Int` outside `i32` range.
pub trait MetaType: Sized + 'static {
	/// Stored variant.
	const KIND: ValueKind;

	/// Extracts the value, returning `None` if the stored value doesn't fit.
	fn from_meta(value: &MetaValue) -> Option<Self>;

	/// Wraps the value for storage.
	fn into_meta(self) -> MetaValue;

	/// Label used in type mismatch errors.
	fn label() -> String {
		Self::KIND.to_string()
	}
}

impl MetaType for bool {
	const KIND: ValueKind = ValueKind::Bool;

	fn from_meta(value: &MetaValue) -> Option<Self> {
		value.as_bool()
	}

	fn into_meta(self) -> MetaValue {
		MetaValue::Bool(self)
	}
}

macro_rules! int_meta_type {
	($($ty:ty),*) => {
		$(
			impl MetaType for $ty {
				const KIND: ValueKind = ValueKind::Int;

				fn from_meta(value: &MetaValue) -> Option<Self> {
					value.as_int().and_then(|v| <$ty>::try_from(v).ok())
				}

				fn into_meta(self) -> MetaValue {
					MetaValue::Int(i64::from(self))
				}
			}
		)*
	};
}

int_meta_type!(i64, i32, i16, u32, u16, u8);

impl MetaType for f64 {
	const KIND: ValueKind = ValueKind::Float;

	fn from_meta(value: &MetaValue) -> Option<Self> {
		match value {
			MetaValue::Float(v) => Some(*v),
			_ => None,
		}
	}

	fn into_meta(self) -> MetaValue {
		MetaValue::Float(self)
	}
}

impl MetaType for String {
	const KIND: ValueKind = ValueKind::Str;

	fn from_meta(value: &MetaValue) -> Option<Self> {
		value.as_str().map(str::to_string)
	}

	fn into_meta(self) -> MetaValue {
		MetaValue::from(self)
	}
}

impl MetaType for Vec<String> {
	const KIND: ValueKind = ValueKind::List;

	fn from_meta(value: &MetaValue) -> Option<Self> {
		let MetaValue::List(items) = value else {
			return None;
		};
		items.iter().map(|v| v.as_str().map(str::to_string)).collect()
	}

	fn into_meta(self) -> MetaValue {
		MetaValue::List(self.into_iter().map(MetaValue::from).collect())
	}
}

/// Shared handle for arbitrary values stored as [`MetaValue::Opaque`].
pub struct Shared<T>(pub Arc<T>);

impl<T> Shared<T> {
	/// Wraps a value.
	pub fn new(value: T) -> Self {
		Self(Arc::new(value))
	}
}

impl<T> Clone for Shared<T> {
	fn clone(&self) -> Self {
		Self(Arc::clone(&self.0))
	}
}

impl<T> std::ops::Deref for Shared<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.0
	}
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Shared").field(&self.0).finish()
	}
}

impl<T: Any + Send + Sync> MetaType for Shared<T> {
	const KIND: ValueKind = ValueKind::Opaque;

	fn from_meta(value: &MetaValue) -> Option<Self> {
		value.as_opaque()?.downcast::<T>().map(Shared)
	}

	fn into_meta(self) -> MetaValue {
		MetaValue::Opaque(OpaqueValue::new(self.0))
	}

	fn label() -> String {
		format!("opaque {}", type_name::<T>())
	}
}
