//! Path composition.
//!
//! `f.compose(&g)` spans `f` then `g`: reads short-circuit on a null
//! intermediate without calling `g`, writes fail on one and never create it.
//! Composition is associative for `get`, `set` and `path`.

use std::any::{Any, TypeId};
use std::sync::Arc;

use super::property::PropertyInner;
use super::{DynProperty, Getter, Navigator, PropertyQualifier, Qualifier, Setter, getter, join_path, navigator, setter};
use crate::comparator::Comparator;
use crate::error::{QualifierError, Result};
use crate::keys;
use crate::store::{MetadataRead, MetadataStore};

impl<T: 'static, U: 'static> PropertyQualifier<T, U> {
	/// Composes this property with a property of its value type.
	///
	/// The result is readable iff both sides are. It is writable iff `g` is
	/// writable and this side can yield a mutable intermediate: through its
	/// mutable accessor, or by reading it, writing into the copy and writing
	/// the copy back.
	///
	/// Metadata is a child of `g`'s store with name, path, type, generic
	/// arguments and (when `g` overrides it) the property comparator replaced.
	pub fn compose<V: 'static>(&self, g: &PropertyQualifier<U, V>) -> PropertyQualifier<T, V> {
		let f = &self.inner;
		let gi = &g.inner;
		let path = join_path(&f.path, &gi.path);

		let get: Option<Getter<T, V>> = match (&f.getter, &gi.getter) {
			(Some(fg), Some(gg)) => {
				let (fg, gg) = (Arc::clone(fg), Arc::clone(gg));
				Some(getter(move |obj: &T| fg(obj).and_then(|mid| gg(&mid))))
			}
			_ => None,
		};

		let nav: Option<Navigator<T, V>> = match (&f.navigator, &gi.navigator) {
			(Some(fn_), Some(gn)) => {
				let (fn_, gn) = (Arc::clone(fn_), Arc::clone(gn));
				Some(navigator(move |obj: &mut T| fn_(obj).and_then(|mid| gn(mid))))
			}
			_ => None,
		};

		let set = compose_setter(self, g);

		let property_cmp = match (&f.getter, gi.meta.get(&keys::property_comparator::<U>())) {
			(Some(fg), Some(cmp)) => {
				let fg = Arc::clone(fg);
				Some(Comparator::by_key(move |obj: &T| fg(obj), cmp))
			}
			_ => None,
		};

		let meta = gi.meta.with_overrides(|m| {
			m.put(&keys::NAME, gi.name.clone());
			m.put(&keys::PATH, path.clone());
			if let Some(ty) = gi.meta.get(&keys::TYPE) {
				m.put(&keys::TYPE, ty);
			}
			if let Some(args) = gi.meta.get(&keys::GENERIC_ARGUMENTS) {
				m.put(&keys::GENERIC_ARGUMENTS, args);
			}
			if let Some(cmp) = property_cmp {
				m.put(&keys::property_comparator::<T>(), cmp);
			}
		});

		PropertyQualifier {
			inner: Arc::new(PropertyInner {
				name: gi.name.clone(),
				path,
				meta,
				getter: get,
				setter: set,
				navigator: nav,
				value_comparator: Qualifier::<V>::comparator(g),
			}),
		}
	}
}

fn compose_setter<T: 'static, U: 'static, V: 'static>(
	f: &PropertyQualifier<T, U>,
	g: &PropertyQualifier<U, V>,
) -> Option<Setter<T, V>> {
	let gs = Arc::clone(g.inner.setter.as_ref()?);
	let outer = f.inner.path.clone();
	let path = join_path(&f.inner.path, &g.inner.path);
	let null = move || QualifierError::NullIntermediate { path: path.clone() };

	if let Some(fnav) = &f.inner.navigator {
		let fnav = Arc::clone(fnav);
		return Some(setter(move |obj: &mut T, value: V| match fnav(obj) {
			Some(mid) => gs(mid, value).map_err(|e| e.under(&outer)),
			None => Err(null()),
		}));
	}

	let (fg, fs) = (f.inner.getter.as_ref()?, f.inner.setter.as_ref()?);
	let (fg, fs) = (Arc::clone(fg), Arc::clone(fs));
	Some(setter(move |obj: &mut T, value: V| {
		let mut mid = fg(obj).ok_or_else(&null)?;
		gs(&mut mid, value).map_err(|e| e.under(&outer))?;
		fs(obj, mid)
	}))
}

/// Erased composition produced by dotted path resolution.
pub(super) struct Chained<T, V> {
	outer: PropertyQualifier<T, V>,
	inner: Arc<dyn DynProperty<V>>,
	path: String,
	meta: MetadataStore,
}

impl<T: 'static, V: 'static> Chained<T, V> {
	pub(super) fn new(outer: PropertyQualifier<T, V>, inner: Arc<dyn DynProperty<V>>) -> Self {
		let path = join_path(outer.path(), inner.path());
		let meta = inner.metadata().with_overrides(|m| {
			m.put(&keys::NAME, inner.name().to_string());
			m.put(&keys::PATH, path.clone());
		});
		Self {
			outer,
			inner,
			path,
			meta,
		}
	}

	fn null_intermediate(&self) -> QualifierError {
		QualifierError::NullIntermediate {
			path: self.path.clone(),
		}
	}
}

impl<T: 'static, V: 'static> DynProperty<T> for Chained<T, V> {
	fn name(&self) -> &str {
		self.inner.name()
	}

	fn path(&self) -> &str {
		&self.path
	}

	fn metadata(&self) -> &MetadataStore {
		&self.meta
	}

	fn value_type(&self) -> TypeId {
		self.inner.value_type()
	}

	fn value_type_name(&self) -> &'static str {
		self.inner.value_type_name()
	}

	fn is_readable(&self) -> bool {
		self.outer.is_readable() && self.inner.is_readable()
	}

	fn is_writable(&self) -> bool {
		self.inner.is_writable()
			&& (self.outer.is_navigable() || (self.outer.is_readable() && self.outer.is_writable()))
	}

	fn get_any(&self, obj: &T) -> Result<Option<Box<dyn Any>>> {
		if !self.is_readable() {
			return Err(QualifierError::not_readable(&self.path));
		}
		match self.outer.get(obj)? {
			Some(mid) => self.inner.get_any(&mid),
			None => Ok(None),
		}
	}

	fn set_any(&self, obj: &mut T, value: Box<dyn Any>) -> Result<()> {
		if !self.is_writable() {
			return Err(QualifierError::not_settable(&self.path));
		}
		if self.outer.is_navigable() {
			let mid = self.outer.get_mut(obj)?.ok_or_else(|| self.null_intermediate())?;
			return self.inner.set_any(mid, value).map_err(|e| e.under(self.outer.path()));
		}
		let mut mid = self.outer.get(obj)?.ok_or_else(|| self.null_intermediate())?;
		self.inner.set_any(&mut mid, value).map_err(|e| e.under(self.outer.path()))?;
		self.outer.set(obj, mid)
	}

	fn comparator(&self) -> Result<Comparator<T>> {
		let inner = self.inner.comparator()?;
		let outer = self.outer.clone();
		if !outer.is_readable() {
			return Err(QualifierError::not_readable(&self.path));
		}
		Ok(Comparator::new(move |a: &T, b: &T| {
			let a = outer.get(a).ok().flatten();
			let b = outer.get(b).ok().flatten();
			inner.compare_nullable(a.as_ref(), b.as_ref())
		}))
	}

	fn resolve(&self, rest: &str) -> Result<Option<Arc<dyn DynProperty<T>>>> {
		let Some(deeper) = self.inner.resolve(rest)? else {
			return Ok(None);
		};
		Ok(Some(Arc::new(Chained::new(self.outer.clone(), deeper))))
	}
}
