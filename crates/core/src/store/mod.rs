//! Override-chained metadata storage.
//!
//! A [`MetadataStore`] is an immutable node holding local entries and an
//! optional parent. Lookups walk from the node toward the root and stop at the
//! first hit. New nodes are only created by [`MetadataStore::mutable_view`]
//! (and the helpers built on it), which always point at an already existing
//! node, so chains cannot form cycles.
//!
//! Writes go through a [`MutableStore`], a private builder that is published
//! with [`MutableStore::freeze`].

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{QualifierError, Result};
use crate::key::{ExtensionKey, KeyId};
use crate::value::{MetaType, MetaValue};


/// Static per-key lookup used by generated code.
///
/// Returns `None` for keys it does not define, which falls through to the
/// store's parent.
pub type DispatchFn = fn(&str) -> Option<MetaValue>;

enum Local {
	Table(FxHashMap<KeyId, MetaValue>),
	Dispatch(DispatchFn),
}

struct Node {
	local: Local,
	parent: Option<MetadataStore>,
}

/// Read access shared by published stores and builders.
pub trait MetadataRead {
	/// Looks up a raw value through the override chain.
	fn lookup(&self, id: &KeyId) -> Option<MetaValue>;

	/// Looks up a typed value, reporting a kind mismatch as an error.
	///
	/// # Errors
	///
	/// [`QualifierError::TypeMismatch`] if the stored value does not convert to `T`.
	fn try_get<T: MetaType>(&self, key: &ExtensionKey<T>) -> Result<Option<T>> {
		let Some(value) = self.lookup(key.id()) else {
			return Ok(None);
		};
		match T::from_meta(&value) {
			Some(v) => Ok(Some(v)),
			None => Err(QualifierError::TypeMismatch {
				key: key.id().to_string(),
				expected: T::label(),
				found: value.describe(),
			}),
		}
	}

	/// Looks up a typed value.
	///
	/// A value of the wrong kind is logged and treated as absent.
	fn get<T: MetaType>(&self, key: &ExtensionKey<T>) -> Option<T> {
		match self.try_get(key) {
			Ok(v) => v,
			Err(err) => {
				tracing::warn!(
					domain = "metadata",
					key = %key.id(),
					error = %err,
					"metadata type mismatch; treating as absent",
				);
				None
			}
		}
	}

	/// Looks up a typed value, substituting `default` when absent.
	fn get_or<T: MetaType>(&self, key: &ExtensionKey<T>, default: T) -> T {
		self.get(key).unwrap_or(default)
	}

	/// Looks up a typed value, computing a default when absent.
	fn get_or_else<T: MetaType>(&self, key: &ExtensionKey<T>, default: impl FnOnce() -> T) -> T {
		self.get(key).unwrap_or_else(default)
	}

	/// Looks up a value that must be present.
	///
	/// # Errors
	///
	/// [`QualifierError::MissingMetadata`] when absent from the whole chain,
	/// [`QualifierError::TypeMismatch`] when present with the wrong kind.
	fn require<T: MetaType>(&self, key: &ExtensionKey<T>) -> Result<T> {
		self.try_get(key)?.ok_or_else(|| QualifierError::MissingMetadata {
			key: key.id().to_string(),
		})
	}

	/// Returns `true` if any store in the chain holds the key.
	fn contains<T>(&self, key: &ExtensionKey<T>) -> bool {
		self.lookup(key.id()).is_some()
	}
}

/// Published, immutable metadata store.
///
/// Cloning is cheap and shares the node.
#[derive(Clone)]
pub struct MetadataStore {
	node: Arc<Node>,
}

impl MetadataStore {
	/// Creates an empty root store.
	pub fn empty() -> Self {
		Self::from_parts(Local::Table(FxHashMap::default()), None)
	}

	/// Creates a builder for a root store.
	pub fn builder() -> MutableStore {
		MutableStore {
			entries: FxHashMap::default(),
			parent: None,
		}
	}

	/// Creates a store whose local entries are answered by `dispatch`.
	pub fn from_dispatch(dispatch: DispatchFn, parent: Option<MetadataStore>) -> Self {
		Self::from_parts(Local::Dispatch(dispatch), parent)
	}

	fn from_parts(local: Local, parent: Option<MetadataStore>) -> Self {
		Self {
			node: Arc::new(Node { local, parent }),
		}
	}

	/// Returns a builder whose parent is this store.
	///
	/// Writes to the builder never affect `self` or any other view.
	pub fn mutable_view(&self) -> MutableStore {
		MutableStore {
			entries: FxHashMap::default(),
			parent: Some(self.clone()),
		}
	}

	/// Returns an empty child of this store.
	pub fn overlay(&self) -> MetadataStore {
		self.mutable_view().freeze()
	}

	/// Returns a child of this store populated by `mutator`.
	pub fn with_overrides(&self, mutator: impl FnOnce(&mut MutableStore)) -> MetadataStore {
		let mut view = self.mutable_view();
		mutator(&mut view);
		view.freeze()
	}

	/// Returns the parent store.
	pub fn parent(&self) -> Option<&MetadataStore> {
		self.node.parent.as_ref()
	}

	/// Returns the number of ancestors.
	pub fn depth(&self) -> usize {
		let mut depth = 0;
		let mut cur = self.parent();
		while let Some(store) = cur {
			depth += 1;
			cur = store.parent();
		}
		depth
	}

	/// Returns the local entries sorted by key.
	///
	/// Dispatch-backed stores cannot enumerate their keys and report none.
	pub fn local_entries(&self) -> Vec<(KeyId, MetaValue)> {
		match &self.node.local {
			Local::Table(map) => sorted_entries(map),
			Local::Dispatch(_) => Vec::new(),
		}
	}

	/// Returns `true` if both handles share the same node.
	pub fn ptr_eq(&self, other: &MetadataStore) -> bool {
		Arc::ptr_eq(&self.node, &other.node)
	}

	fn lookup_local(&self, id: &KeyId) -> Option<MetaValue> {
		match &self.node.local {
			Local::Table(map) => map.get(id).cloned(),
			Local::Dispatch(dispatch) => match id {
				KeyId::Named(name) => dispatch(name),
				KeyId::Anonymous(_) => None,
			},
		}
	}
}

impl MetadataRead for MetadataStore {
	fn lookup(&self, id: &KeyId) -> Option<MetaValue> {
		let mut cur = Some(self);
		while let Some(store) = cur {
			if let Some(v) = store.lookup_local(id) {
				return Some(v);
			}
			cur = store.parent();
		}
		None
	}
}

impl Default for MetadataStore {
	fn default() -> Self {
		Self::empty()
	}
}

impl std::fmt::Debug for MetadataStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut s = f.debug_struct("MetadataStore");
		match &self.node.local {
			Local::Table(map) => s.field("entries", &sorted_entries(map)),
			Local::Dispatch(_) => s.field("entries", &"<dispatch>"),
		};
		s.field("depth", &self.depth()).finish()
	}
}

/// Private builder view over a store.
///
/// `put` and `remove` only touch local entries. Removing a key that a parent
/// also holds uncovers the parent's value.
pub struct MutableStore {
	entries: FxHashMap<KeyId, MetaValue>,
	parent: Option<MetadataStore>,
}

impl MutableStore {
	/// Stores a typed value, returning the previous local value.
	pub fn put<T: MetaType>(&mut self, key: &ExtensionKey<T>, value: T) -> Option<MetaValue> {
		self.entries.insert(key.id().clone(), value.into_meta())
	}

	/// Stores a raw value, returning the previous local value.
	pub fn put_raw(&mut self, id: KeyId, value: MetaValue) -> Option<MetaValue> {
		self.entries.insert(id, value)
	}

	/// Removes a local value.
	pub fn remove<T>(&mut self, key: &ExtensionKey<T>) -> Option<MetaValue> {
		self.entries.remove(key.id())
	}

	/// Returns the local entries sorted by key.
	pub fn entries(&self) -> Vec<(KeyId, MetaValue)> {
		sorted_entries(&self.entries)
	}

	/// Returns the number of local entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` if no local entries are set.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Returns the parent store.
	pub fn parent(&self) -> Option<&MetadataStore> {
		self.parent.as_ref()
	}

	/// Publishes the builder as an immutable store.
	pub fn freeze(self) -> MetadataStore {
		MetadataStore::from_parts(Local::Table(self.entries), self.parent)
	}
}

impl MetadataRead for MutableStore {
	fn lookup(&self, id: &KeyId) -> Option<MetaValue> {
		if let Some(v) = self.entries.get(id) {
			return Some(v.clone());
		}
		self.parent.as_ref()?.lookup(id)
	}
}

impl std::fmt::Debug for MutableStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MutableStore")
			.field("entries", &sorted_entries(&self.entries))
			.field("parent", &self.parent)
			.finish()
	}
}

fn sorted_entries(map: &FxHashMap<KeyId, MetaValue>) -> Vec<(KeyId, MetaValue)> {
	let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
	entries.sort_by(|a, b| a.0.cmp(&b.0));
	entries
}
