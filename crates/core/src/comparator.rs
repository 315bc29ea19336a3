//! Shared comparators and the natural-ordering probe.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::value::{MetaType, MetaValue, OpaqueValue, ValueKind};

/// Cheaply clonable, thread-safe comparison function.
pub struct Comparator<T> {
	compare: Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>,
}

impl<T> Clone for Comparator<T> {
	fn clone(&self) -> Self {
		Self {
			compare: Arc::clone(&self.compare),
		}
	}
}

impl<T> fmt::Debug for Comparator<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Comparator(..)")
	}
}

impl<T: 'static> Comparator<T> {
	/// Wraps a comparison function.
	pub fn new(compare: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
		Self {
			compare: Arc::new(compare),
		}
	}

	/// Natural ordering of an `Ord` type.
	pub fn natural() -> Self
	where
		T: Ord,
	{
		Self::new(|a: &T, b: &T| a.cmp(b))
	}

	/// Case-insensitive ordering of a string form; exact order breaks ties.
	pub fn by_string_form(render: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
		Self::new(move |a, b| {
			let (a, b) = (render(a), render(b));
			a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(&b))
		})
	}

	/// Case-insensitive ordering of the `Display` form.
	pub fn display() -> Self
	where
		T: fmt::Display,
	{
		Self::by_string_form(|v: &T| v.to_string())
	}

	/// Case-insensitive ordering of the `Debug` form.
	pub fn debug() -> Self
	where
		T: fmt::Debug,
	{
		Self::by_string_form(|v: &T| format!("{v:?}"))
	}

	/// Treats every pair as equal.
	pub fn unordered() -> Self {
		Self::new(|_, _| Ordering::Equal)
	}

	/// Orders `T` by a derived nullable key, nulls first.
	pub fn by_key<K: 'static>(key: impl Fn(&T) -> Option<K> + Send + Sync + 'static, inner: Comparator<K>) -> Self {
		Self::new(move |a, b| inner.compare_nullable(key(a).as_ref(), key(b).as_ref()))
	}

	/// Compares two values.
	pub fn compare(&self, a: &T, b: &T) -> Ordering {
		(self.compare)(a, b)
	}

	/// Compares two nullable values, nulls first.
	pub fn compare_nullable(&self, a: Option<&T>, b: Option<&T>) -> Ordering {
		match (a, b) {
			(None, None) => Ordering::Equal,
			(None, Some(_)) => Ordering::Less,
			(Some(_), None) => Ordering::Greater,
			(Some(a), Some(b)) => self.compare(a, b),
		}
	}

	/// Returns the reverse ordering.
	pub fn reversed(&self) -> Self {
		let inner = self.clone();
		Self::new(move |a, b| inner.compare(b, a))
	}

	/// Breaks ties of `self` with `next`.
	pub fn then(&self, next: &Comparator<T>) -> Self {
		let (first, next) = (self.clone(), next.clone());
		Self::new(move |a, b| first.compare(a, b).then_with(|| next.compare(a, b)))
	}

	/// Stable sort.
	pub fn sort(&self, items: &mut [T]) {
		items.sort_by(|a, b| self.compare(a, b));
	}

	/// Stable sort of nullable values, nulls first.
	pub fn sort_nullable(&self, items: &mut [Option<T>]) {
		items.sort_by(|a, b| self.compare_nullable(a.as_ref(), b.as_ref()));
	}
}

impl<T: 'static> MetaType for Comparator<T> {
	const KIND: ValueKind = ValueKind::Opaque;

	fn from_meta(value: &MetaValue) -> Option<Self> {
		value
			.as_opaque()?
			.downcast::<Comparator<T>>()
			.map(|c| c.as_ref().clone())
	}

	fn into_meta(self) -> MetaValue {
		MetaValue::Opaque(OpaqueValue::new(Arc::new(self)))
	}

	fn label() -> String {
		format!("opaque {}", std::any::type_name::<Comparator<T>>())
	}
}

/// Expansion-time capability probe.
///
/// Generated code knows concrete types but cannot name trait bounds it has not
/// seen, so it asks a [`Probe`] through autoref-based method resolution:
/// `(&&&Probe::<V>::new()).natural_comparator()` picks the first tier `V`
/// satisfies (`Ord`, then `Display`, then `Debug`, then unordered), and
/// `(&Probe::<V>::new()).identity_getter()` is `Some` only for `Clone` types.
pub mod probe {
	use std::fmt;
	use std::marker::PhantomData;

	use super::Comparator;
	use crate::qualifier::Getter;

	/// Zero-sized probe for `T`.
	pub struct Probe<T>(PhantomData<fn() -> T>);

	impl<T> Probe<T> {
		/// Creates the probe.
		pub const fn new() -> Self {
			Self(PhantomData)
		}
	}

	impl<T> Default for Probe<T> {
		fn default() -> Self {
			Self::new()
		}
	}

	// Fallback tiers take the probe by value through a reference.
	impl<T> Clone for Probe<T> {
		fn clone(&self) -> Self {
			*self
		}
	}

	impl<T> Copy for Probe<T> {}

	/// `Ord` tier.
	pub trait ViaOrd {
		/// Probed type.
		type Value;
		/// Natural comparator of the probed type.
		fn natural_comparator(self) -> Comparator<Self::Value>;
	}

	impl<T: Ord + 'static> ViaOrd for &&&Probe<T> {
		type Value = T;
		fn natural_comparator(self) -> Comparator<T> {
			Comparator::natural()
		}
	}

	/// `Display` tier.
	pub trait ViaDisplay {
		/// Probed type.
		type Value;
		/// Natural comparator of the probed type.
		fn natural_comparator(self) -> Comparator<Self::Value>;
	}

	impl<T: fmt::Display + 'static> ViaDisplay for &&Probe<T> {
		type Value = T;
		fn natural_comparator(self) -> Comparator<T> {
			Comparator::display()
		}
	}

	/// `Debug` tier.
	pub trait ViaDebug {
		/// Probed type.
		type Value;
		/// Natural comparator of the probed type.
		fn natural_comparator(self) -> Comparator<Self::Value>;
	}

	impl<T: fmt::Debug + 'static> ViaDebug for &Probe<T> {
		type Value = T;
		fn natural_comparator(self) -> Comparator<T> {
			Comparator::debug()
		}
	}

	/// Fallback tier.
	pub trait ViaNothing {
		/// Probed type.
		type Value;
		/// Natural comparator of the probed type.
		fn natural_comparator(self) -> Comparator<Self::Value>;
	}

	impl<T: 'static> ViaNothing for Probe<T> {
		type Value = T;
		fn natural_comparator(self) -> Comparator<T> {
			Comparator::unordered()
		}
	}

	/// `Clone` tier of the identity probe.
	pub trait ViaClone {
		/// Probed type.
		type Value;
		/// Identity getter cloning the value.
		fn identity_getter(self) -> Option<Getter<Self::Value, Self::Value>>;
	}

	impl<T: Clone + 'static> ViaClone for &Probe<T> {
		type Value = T;
		fn identity_getter(self) -> Option<Getter<T, T>> {
			Some(crate::qualifier::getter(|v: &T| Some(v.clone())))
		}
	}

	/// Fallback tier of the identity probe.
	pub trait ViaNoClone {
		/// Probed type.
		type Value;
		/// No identity getter.
		fn identity_getter(self) -> Option<Getter<Self::Value, Self::Value>>;
	}

	impl<T: 'static> ViaNoClone for Probe<T> {
		type Value = T;
		fn identity_getter(self) -> Option<Getter<T, T>> {
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::probe::*;
	use super::*;

	#[derive(Debug, PartialEq)]
	struct Label(&'static str);

	impl fmt::Display for Label {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			f.write_str(self.0)
		}
	}

	struct Opaque;

	#[test]
	fn non_ordered_values_sort_case_insensitively_nulls_first() {
		let cmp = (&&&Probe::<Label>::new()).natural_comparator();
		let mut items = vec![None, Some(Label("b")), Some(Label("A"))];
		cmp.sort_nullable(&mut items);
		assert_eq!(items, vec![None, Some(Label("A")), Some(Label("b"))]);
	}

	#[test]
	fn ordered_values_use_natural_order() {
		let cmp = (&&&Probe::<i32>::new()).natural_comparator();
		let mut items = vec![3, -1, 2];
		cmp.sort(&mut items);
		assert_eq!(items, vec![-1, 2, 3]);
	}

	#[test]
	fn debug_tier_and_fallback() {
		#[derive(Debug)]
		struct Dbg(u8);
		let cmp = (&&&Probe::<Dbg>::new()).natural_comparator();
		assert_eq!(cmp.compare(&Dbg(1), &Dbg(2)), Ordering::Less);

		let cmp = (&&&Probe::<Opaque>::new()).natural_comparator();
		assert_eq!(cmp.compare(&Opaque, &Opaque), Ordering::Equal);
	}

	#[test]
	fn identity_probe_requires_clone() {
		assert!((&Probe::<String>::new()).identity_getter().is_some());
		assert!((&Probe::<Opaque>::new()).identity_getter().is_none());
	}

	#[test]
	fn by_key_orders_null_keys_first() {
		let cmp = Comparator::by_key(|v: &(Option<i32>, u8)| v.0, Comparator::natural());
		let mut items = vec![(Some(2), 0), (None, 1), (Some(1), 2)];
		cmp.sort(&mut items);
		assert_eq!(items, vec![(None, 1), (Some(1), 2), (Some(2), 0)]);
	}

	#[test]
	fn reversed_and_then_compose() {
		let by_len = Comparator::new(|a: &&str, b: &&str| a.len().cmp(&b.len()));
		let cmp = by_len.then(&Comparator::natural()).reversed();
		let mut items = vec!["bb", "a", "ab", "c"];
		cmp.sort(&mut items);
		assert_eq!(items, vec!["bb", "ab", "c", "a"]);
	}
}
