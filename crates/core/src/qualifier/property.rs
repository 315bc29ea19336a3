use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use super::compose::Chained;
use super::{DynProperty, Getter, Navigator, Qualifier, Setter, getter, navigator, setter};
use crate::comparator::Comparator;
use crate::error::{QualifierError, Result};
use crate::keys;
use crate::store::{MetadataRead, MetadataStore, MutableStore};

/// Typed descriptor of a property of `T` holding a `V`.
///
/// Cloning is cheap. As a [`Qualifier<V>`] it exposes the properties and the
/// natural ordering of the value type.
pub struct PropertyQualifier<T, V> {
	pub(super) inner: Arc<PropertyInner<T, V>>,
}

pub(super) struct PropertyInner<T, V> {
	pub(super) name: String,
	pub(super) path: String,
	pub(super) meta: MetadataStore,
	pub(super) getter: Option<Getter<T, V>>,
	pub(super) setter: Option<Setter<T, V>>,
	pub(super) navigator: Option<Navigator<T, V>>,
	pub(super) value_comparator: Comparator<V>,
}

impl<T, V> Clone for PropertyQualifier<T, V> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: 'static, V: 'static> PropertyQualifier<T, V> {
	/// Starts building a property named `name`; the path defaults to the name.
	pub fn builder(name: impl Into<String>) -> PropertyBuilder<T, V> {
		let name = name.into();
		PropertyBuilder {
			path: name.clone(),
			name,
			meta: None,
			getter: None,
			setter: None,
			navigator: None,
			value_comparator: None,
		}
	}

	/// Property name.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Dotted path from the root type.
	pub fn path(&self) -> &str {
		&self.inner.path
	}

	/// Backing metadata store.
	pub fn metadata(&self) -> &MetadataStore {
		&self.inner.meta
	}

	/// Whether a getter is bound.
	pub fn is_readable(&self) -> bool {
		self.inner.getter.is_some()
	}

	/// Whether a setter is bound.
	pub fn is_writable(&self) -> bool {
		self.inner.setter.is_some()
	}

	/// Whether a mutable accessor is bound.
	pub fn is_navigable(&self) -> bool {
		self.inner.navigator.is_some()
	}

	/// Reads the property.
	///
	/// # Errors
	///
	/// [`QualifierError::Unsupported`] (`not readable`) without a getter.
	pub fn get(&self, obj: &T) -> Result<Option<V>> {
		let getter = self
			.inner
			.getter
			.as_ref()
			.ok_or_else(|| QualifierError::not_readable(self.path()))?;
		Ok(getter(obj))
	}

	/// Writes the property.
	///
	/// # Errors
	///
	/// [`QualifierError::Unsupported`] (`not settable`) without a setter;
	/// composed setters can also fail with [`QualifierError::NullIntermediate`].
	pub fn set(&self, obj: &mut T, value: V) -> Result<()> {
		let setter = self
			.inner
			.setter
			.as_ref()
			.ok_or_else(|| QualifierError::not_settable(self.path()))?;
		setter(obj, value)
	}

	/// Borrows the property mutably.
	///
	/// # Errors
	///
	/// [`QualifierError::Unsupported`] (`not navigable`) without a mutable accessor.
	pub fn get_mut<'a>(&self, obj: &'a mut T) -> Result<Option<&'a mut V>> {
		let navigator = self.inner.navigator.as_ref().ok_or_else(|| QualifierError::Unsupported {
			path: self.path().to_string(),
			capability: "not navigable",
		})?;
		Ok(navigator(obj))
	}

	/// Orders owners by this property, nulls first.
	///
	/// An override under [`keys::property_comparator`] wins; otherwise the
	/// value comparator ([`Qualifier::comparator`]) is applied to [`Self::get`].
	///
	/// # Errors
	///
	/// [`QualifierError::Unsupported`] if not readable and not overridden.
	pub fn comparator(&self) -> Result<Comparator<T>> {
		if let Some(cmp) = self.inner.meta.get(&keys::property_comparator::<T>()) {
			return Ok(cmp);
		}
		let getter = self
			.inner
			.getter
			.clone()
			.ok_or_else(|| QualifierError::not_readable(self.path()))?;
		let values = Qualifier::<V>::comparator(self);
		Ok(Comparator::by_key(move |obj: &T| getter(obj), values))
	}

	/// Returns a property sharing everything but an empty child store.
	pub fn overlay(&self) -> Self {
		self.with_store(self.inner.meta.overlay())
	}

	/// Returns a property whose store is a child populated by `mutator`.
	///
	/// Overriding `qualia.name` or `qualia.path` also renames the property:
	/// [`name`](Self::name), [`path`](Self::path) and later compositions follow
	/// the override.
	pub fn with_overrides(&self, mutator: impl FnOnce(&mut MutableStore)) -> Self {
		self.with_store(self.inner.meta.with_overrides(mutator))
	}

	fn with_store(&self, meta: MetadataStore) -> Self {
		let inner = &self.inner;
		let name = meta.get(&keys::NAME).unwrap_or_else(|| inner.name.clone());
		let path = meta.get(&keys::PATH).unwrap_or_else(|| inner.path.clone());
		Self {
			inner: Arc::new(PropertyInner {
				name,
				path,
				meta,
				getter: inner.getter.clone(),
				setter: inner.setter.clone(),
				navigator: inner.navigator.clone(),
				value_comparator: inner.value_comparator.clone(),
			}),
		}
	}

	/// Erases the value type.
	pub fn as_dyn(&self) -> Arc<dyn DynProperty<T>> {
		Arc::new(self.clone())
	}
}

impl<T: 'static, V: 'static> Qualifier<V> for PropertyQualifier<T, V> {
	fn metadata(&self) -> &MetadataStore {
		&self.inner.meta
	}

	fn properties(&self) -> &[Arc<dyn DynProperty<V>>] {
		match crate::registry::bean::<V>() {
			Some(bean) => bean.properties(),
			None => &[],
		}
	}

	fn comparator(&self) -> Comparator<V> {
		self.inner
			.meta
			.get(&keys::comparator::<V>())
			.unwrap_or_else(|| self.inner.value_comparator.clone())
	}
}

impl<T: 'static, V: 'static> DynProperty<T> for PropertyQualifier<T, V> {
	fn name(&self) -> &str {
		PropertyQualifier::name(self)
	}

	fn path(&self) -> &str {
		PropertyQualifier::path(self)
	}

	fn metadata(&self) -> &MetadataStore {
		&self.inner.meta
	}

	fn value_type(&self) -> TypeId {
		TypeId::of::<V>()
	}

	fn value_type_name(&self) -> &'static str {
		type_name::<V>()
	}

	fn is_readable(&self) -> bool {
		PropertyQualifier::is_readable(self)
	}

	fn is_writable(&self) -> bool {
		PropertyQualifier::is_writable(self)
	}

	fn get_any(&self, obj: &T) -> Result<Option<Box<dyn Any>>> {
		Ok(self.get(obj)?.map(|v| Box::new(v) as Box<dyn Any>))
	}

	fn set_any(&self, obj: &mut T, value: Box<dyn Any>) -> Result<()> {
		let value = value.downcast::<V>().map_err(|_| QualifierError::TypeMismatch {
			key: self.path().to_string(),
			expected: type_name::<V>().to_string(),
			found: "a value of another type".to_string(),
		})?;
		self.set(obj, *value)
	}

	fn comparator(&self) -> Result<Comparator<T>> {
		PropertyQualifier::comparator(self)
	}

	fn resolve(&self, rest: &str) -> Result<Option<Arc<dyn DynProperty<T>>>> {
		let Some(inner) = Qualifier::<V>::property(self, rest)? else {
			return Ok(None);
		};
		Ok(Some(Arc::new(Chained::new(self.clone(), inner))))
	}
}

impl<T, V> std::fmt::Debug for PropertyQualifier<T, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PropertyQualifier")
			.field("path", &self.inner.path)
			.field("type", &type_name::<V>())
			.field("readable", &self.inner.getter.is_some())
			.field("writable", &self.inner.setter.is_some())
			.finish()
	}
}

/// Builder for [`PropertyQualifier`].
pub struct PropertyBuilder<T, V> {
	name: String,
	path: String,
	meta: Option<MetadataStore>,
	getter: Option<Getter<T, V>>,
	setter: Option<Setter<T, V>>,
	navigator: Option<Navigator<T, V>>,
	value_comparator: Option<Comparator<V>>,
}

impl<T: 'static, V: 'static> PropertyBuilder<T, V> {
	/// Sets the dotted path.
	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	/// Sets the backing store.
	///
	/// Without one, a root store holding name, path and type is created.
	pub fn metadata(mut self, meta: MetadataStore) -> Self {
		self.meta = Some(meta);
		self
	}

	/// Binds a getter.
	pub fn getter(mut self, f: impl Fn(&T) -> Option<V> + Send + Sync + 'static) -> Self {
		self.getter = Some(getter(f));
		self
	}

	/// Binds an already shared getter.
	pub fn shared_getter(mut self, f: Getter<T, V>) -> Self {
		self.getter = Some(f);
		self
	}

	/// Binds a setter.
	pub fn setter(mut self, f: impl Fn(&mut T, V) -> Result<()> + Send + Sync + 'static) -> Self {
		self.setter = Some(setter(f));
		self
	}

	/// Binds a mutable accessor.
	pub fn navigator<F>(mut self, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut T) -> Option<&'a mut V> + Send + Sync + 'static,
	{
		self.navigator = Some(navigator(f));
		self
	}

	/// Sets the natural ordering of values.
	pub fn value_comparator(mut self, cmp: Comparator<V>) -> Self {
		self.value_comparator = Some(cmp);
		self
	}

	/// Builds the qualifier.
	pub fn build(self) -> PropertyQualifier<T, V> {
		let meta = self.meta.unwrap_or_else(|| {
			let mut m = MetadataStore::builder();
			m.put(&keys::NAME, self.name.clone());
			m.put(&keys::PATH, self.path.clone());
			m.put(&keys::TYPE, type_name::<V>().to_string());
			m.freeze()
		});
		PropertyQualifier {
			inner: Arc::new(PropertyInner {
				name: self.name,
				path: self.path,
				meta,
				getter: self.getter,
				setter: self.setter,
				navigator: self.navigator,
				value_comparator: self.value_comparator.unwrap_or_else(Comparator::unordered),
			}),
		}
	}
}
