//! Process-wide index of generated bean qualifiers.
//!
//! Generated code submits one [`BeanRegistration`] per model through
//! `inventory`. The index is built on first use and maps each model's
//! `TypeId` to its registration.

use std::any::{Any, TypeId, type_name};
use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use crate::qualifier::BeanQualifier;

/// Registration of a generated bean qualifier.
pub struct BeanRegistration {
	type_id: fn() -> TypeId,
	type_name: fn() -> &'static str,
	bean: fn() -> &'static (dyn Any + Send + Sync),
}

inventory::collect!(BeanRegistration);

fn type_id_of<M: 'static>() -> TypeId {
	TypeId::of::<M>()
}

fn type_name_of<M: 'static>() -> &'static str {
	type_name::<M>()
}

impl BeanRegistration {
	/// Creates a registration for model `M`.
	///
	/// `bean` must return a `&'static BeanQualifier<M>`.
	pub const fn new<M: 'static>(bean: fn() -> &'static (dyn Any + Send + Sync)) -> Self {
		Self {
			type_id: type_id_of::<M>,
			type_name: type_name_of::<M>,
			bean,
		}
	}

	/// Rust name of the registered model type.
	pub fn type_name(&self) -> &'static str {
		(self.type_name)()
	}
}

static INDEX: LazyLock<FxHashMap<TypeId, &'static BeanRegistration>> = LazyLock::new(build_index);

fn build_index() -> FxHashMap<TypeId, &'static BeanRegistration> {
	let mut regs: Vec<&'static BeanRegistration> = inventory::iter::<BeanRegistration>.into_iter().collect();
	regs.sort_by_key(|r| r.type_name());

	let mut index = FxHashMap::default();
	for reg in regs {
		if index.insert((reg.type_id)(), reg).is_some() {
			tracing::warn!(
				domain = "registry",
				model = reg.type_name(),
				"duplicate bean registration; keeping the last one",
			);
		}
	}
	tracing::debug!(domain = "registry", models = index.len(), "bean index built");
	index
}

/// Returns the generated bean qualifier of `M`, if any.
pub fn bean<M: 'static>() -> Option<&'static BeanQualifier<M>> {
	let reg = INDEX.get(&TypeId::of::<M>())?;
	(reg.bean)().downcast_ref::<BeanQualifier<M>>()
}

/// Returns the names of all registered model types, sorted.
pub fn registered_types() -> Vec<&'static str> {
	let mut names: Vec<_> = INDEX.values().map(|r| r.type_name()).collect();
	names.sort_unstable();
	names
}
