//! Qualifiers: typed descriptors of model types and their properties.
//!
//! A [`BeanQualifier<T>`] describes a model type. A [`PropertyQualifier<T, V>`]
//! describes one property of `T` holding a `V`, and is at the same time a
//! [`Qualifier<V>`], which is what lets property paths compose.
//!
//! Heterogeneous property lists are exposed as [`DynProperty<T>`] trait
//! objects; [`typed`] recovers the concrete qualifier.

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use crate::comparator::Comparator;
use crate::error::{QualifierError, Result};
use crate::keys;
use crate::store::{MetadataRead, MetadataStore, MutableStore};

mod compose;
mod property;

#[cfg(test)]
mod tests;

pub use property::{PropertyBuilder, PropertyQualifier};

/// Reads a property value; `None` is the null value.
pub type Getter<T, V> = Arc<dyn Fn(&T) -> Option<V> + Send + Sync>;

/// Writes a property value.
pub type Setter<T, V> = Arc<dyn Fn(&mut T, V) -> Result<()> + Send + Sync>;

/// Borrows a property value mutably; `None` is the null value.
pub type Navigator<T, V> = Arc<dyn for<'a> Fn(&'a mut T) -> Option<&'a mut V> + Send + Sync>;

/// Wraps a closure as a [`Getter`].
pub fn getter<T, V>(f: impl Fn(&T) -> Option<V> + Send + Sync + 'static) -> Getter<T, V> {
	Arc::new(f)
}

/// Wraps a closure as a [`Setter`].
pub fn setter<T, V>(f: impl Fn(&mut T, V) -> Result<()> + Send + Sync + 'static) -> Setter<T, V> {
	Arc::new(f)
}

/// Wraps a closure as a [`Navigator`].
pub fn navigator<T, V, F>(f: F) -> Navigator<T, V>
where
	F: for<'a> Fn(&'a mut T) -> Option<&'a mut V> + Send + Sync + 'static,
{
	Arc::new(f)
}

/// Typed descriptor of a type `T`.
pub trait Qualifier<T: 'static> {
	/// Backing metadata store.
	fn metadata(&self) -> &MetadataStore;

	/// Properties of `T`.
	fn properties(&self) -> &[Arc<dyn DynProperty<T>>];

	/// Ordering of `T` values.
	///
	/// An override under [`keys::comparator`] wins; otherwise the natural
	/// ordering captured when the qualifier was built.
	fn comparator(&self) -> Comparator<T>;

	/// Rendered type of `T`.
	///
	/// # Errors
	///
	/// [`QualifierError::MissingMetadata`] if the type was never declared.
	fn type_name(&self) -> Result<String> {
		self.metadata().require(&keys::TYPE)
	}

	/// Resolves a dotted property path.
	///
	/// The first segment is matched by name against [`Qualifier::properties`];
	/// any remainder is resolved against the matched property's value type and
	/// composed onto it. Returns `Ok(None)` when a segment does not match.
	///
	/// # Errors
	///
	/// [`QualifierError::InvalidPath`] for an empty path or an empty segment.
	fn property(&self, path: &str) -> Result<Option<Arc<dyn DynProperty<T>>>> {
		let (head, rest) = match path.split_once('.') {
			Some((head, rest)) => (head, Some(rest)),
			None => (path, None),
		};
		if head.is_empty() || rest.is_some_and(str::is_empty) {
			return Err(QualifierError::InvalidPath(path.to_string()));
		}
		let Some(found) = self.properties().iter().find(|p| p.name() == head) else {
			return Ok(None);
		};
		match rest {
			None => Ok(Some(Arc::clone(found))),
			Some(rest) => found.resolve(rest),
		}
	}
}

/// Object-safe view of a property of `T`.
pub trait DynProperty<T>: Send + Sync {
	/// Property name (last path segment).
	fn name(&self) -> &str;

	/// Dotted path from the root type.
	fn path(&self) -> &str;

	/// Backing metadata store.
	fn metadata(&self) -> &MetadataStore;

	/// `TypeId` of the value type.
	fn value_type(&self) -> TypeId;

	/// Rust name of the value type.
	fn value_type_name(&self) -> &'static str;

	/// Whether a getter is bound.
	fn is_readable(&self) -> bool;

	/// Whether a setter is bound.
	fn is_writable(&self) -> bool;

	/// Reads the value as `Box<dyn Any>`.
	///
	/// # Errors
	///
	/// [`QualifierError::Unsupported`] if not readable.
	fn get_any(&self, obj: &T) -> Result<Option<Box<dyn Any>>>;

	/// Writes a value given as `Box<dyn Any>`.
	///
	/// # Errors
	///
	/// [`QualifierError::Unsupported`] if not writable,
	/// [`QualifierError::TypeMismatch`] if the value has the wrong type,
	/// [`QualifierError::NullIntermediate`] for composed paths.
	fn set_any(&self, obj: &mut T, value: Box<dyn Any>) -> Result<()>;

	/// Orders owners by this property, nulls first.
	///
	/// # Errors
	///
	/// [`QualifierError::Unsupported`] if not readable and not overridden.
	fn comparator(&self) -> Result<Comparator<T>>;

	/// Resolves `rest` against the value type and composes it onto this property.
	///
	/// # Errors
	///
	/// [`QualifierError::InvalidPath`] for malformed paths.
	fn resolve(&self, rest: &str) -> Result<Option<Arc<dyn DynProperty<T>>>>;
}

impl<T: 'static> dyn DynProperty<T> {
	/// Reads the value as `W`.
	///
	/// # Errors
	///
	/// As [`DynProperty::get_any`], plus [`QualifierError::TypeMismatch`] if
	/// the value type is not `W`.
	pub fn get_as<W: 'static>(&self, obj: &T) -> Result<Option<W>> {
		self.check_type::<W>()?;
		Ok(self
			.get_any(obj)?
			.and_then(|value| value.downcast::<W>().ok())
			.map(|value| *value))
	}

	/// Writes a `W` value.
	///
	/// # Errors
	///
	/// As [`DynProperty::set_any`].
	pub fn set_as<W: 'static>(&self, obj: &mut T, value: W) -> Result<()> {
		self.check_type::<W>()?;
		self.set_any(obj, Box::new(value))
	}

	fn check_type<W: 'static>(&self) -> Result<()> {
		if self.value_type() == TypeId::of::<W>() {
			return Ok(());
		}
		Err(QualifierError::TypeMismatch {
			key: self.path().to_string(),
			expected: type_name::<W>().to_string(),
			found: self.value_type_name().to_string(),
		})
	}
}

/// Recovers a typed qualifier from an erased property.
///
/// The result shares the erased property's metadata and accessors. It has no
/// navigator, so compositions through it write back via its setter.
///
/// # Errors
///
/// [`QualifierError::TypeMismatch`] if the value type is not `W`.
pub fn typed<T: 'static, W: 'static>(prop: Arc<dyn DynProperty<T>>) -> Result<PropertyQualifier<T, W>> {
	prop.check_type::<W>()?;
	let mut builder = PropertyQualifier::<T, W>::builder(prop.name())
		.path(prop.path())
		.metadata(prop.metadata().clone())
		.value_comparator(value_comparator_of::<W>(prop.metadata()));
	if prop.is_readable() {
		let p = Arc::clone(&prop);
		builder = builder.getter(move |obj: &T| {
			p.get_any(obj)
				.ok()
				.flatten()
				.and_then(|value| value.downcast::<W>().ok())
				.map(|value| *value)
		});
	}
	if prop.is_writable() {
		let p = Arc::clone(&prop);
		builder = builder.setter(move |obj: &mut T, value: W| p.set_any(obj, Box::new(value)));
	}
	Ok(builder.build())
}

fn value_comparator_of<W: 'static>(meta: &MetadataStore) -> Comparator<W> {
	if let Some(cmp) = meta.get(&keys::comparator::<W>()) {
		return cmp;
	}
	crate::registry::bean::<W>()
		.map(|bean| bean.comparator())
		.unwrap_or_else(Comparator::unordered)
}

/// Joins two property paths; the empty path of the identity property
/// contributes nothing.
pub(crate) fn join_path(outer: &str, inner: &str) -> String {
	match (outer.is_empty(), inner.is_empty()) {
		(true, _) => inner.to_string(),
		(_, true) => outer.to_string(),
		_ => format!("{outer}.{inner}"),
	}
}

/// Typed descriptor of a model type.
pub struct BeanQualifier<T> {
	meta: MetadataStore,
	properties: Arc<[Arc<dyn DynProperty<T>>]>,
	natural: Comparator<T>,
	identity: Option<Getter<T, T>>,
}

impl<T> Clone for BeanQualifier<T> {
	fn clone(&self) -> Self {
		Self {
			meta: self.meta.clone(),
			properties: Arc::clone(&self.properties),
			natural: self.natural.clone(),
			identity: self.identity.clone(),
		}
	}
}

impl<T: 'static> BeanQualifier<T> {
	/// Creates a bean qualifier.
	///
	/// `natural` is the ordering used when no override is stored; `identity`
	/// is the getter of the reflexive `self` property, if `T` can be copied
	/// out.
	pub fn new(
		meta: MetadataStore,
		properties: Vec<Arc<dyn DynProperty<T>>>,
		natural: Comparator<T>,
		identity: Option<Getter<T, T>>,
	) -> Self {
		Self {
			meta,
			properties: properties.into(),
			natural,
			identity,
		}
	}

	/// Returns a qualifier sharing everything but an empty child store.
	pub fn overlay(&self) -> Self {
		self.with_store(self.meta.overlay())
	}

	/// Returns a qualifier whose store is a child populated by `mutator`.
	pub fn with_overrides(&self, mutator: impl FnOnce(&mut MutableStore)) -> Self {
		self.with_store(self.meta.with_overrides(mutator))
	}

	fn with_store(&self, meta: MetadataStore) -> Self {
		Self { meta, ..self.clone() }
	}

	/// Wraps this qualifier as the identity property `self` with an empty path.
	pub fn as_property(&self) -> PropertyQualifier<T, T> {
		let meta = self.meta.with_overrides(|m| {
			m.put(&keys::NAME, "self".to_string());
			m.put(&keys::PATH, String::new());
		});
		let mut builder = PropertyQualifier::<T, T>::builder("self")
			.path("")
			.metadata(meta)
			.value_comparator(self.comparator())
			.setter(|obj: &mut T, value: T| {
				*obj = value;
				Ok(())
			})
			.navigator(|obj: &mut T| Some(obj));
		if let Some(identity) = &self.identity {
			builder = builder.shared_getter(Arc::clone(identity));
		}
		builder.build()
	}
}

impl<T: 'static> Qualifier<T> for BeanQualifier<T> {
	fn metadata(&self) -> &MetadataStore {
		&self.meta
	}

	fn properties(&self) -> &[Arc<dyn DynProperty<T>>] {
		&self.properties
	}

	fn comparator(&self) -> Comparator<T> {
		self.meta
			.get(&keys::comparator::<T>())
			.unwrap_or_else(|| self.natural.clone())
	}
}

impl<T> std::fmt::Debug for BeanQualifier<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BeanQualifier")
			.field("type", &type_name::<T>())
			.field("properties", &self.properties.iter().map(|p| p.name()).collect::<Vec<_>>())
			.finish()
	}
}

/// Model types with a generated bean qualifier.
pub trait Qualified: Sized + 'static {
	/// The process-wide bean qualifier.
	fn qualifier() -> &'static BeanQualifier<Self>;
}
