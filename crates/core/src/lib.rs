//! Typed metadata stores and the qualifier property-access algebra.
//!
//! * [`ExtensionKey`] / [`MetadataStore`]: typed, override-chained metadata.
//! * [`BeanQualifier`] / [`PropertyQualifier`]: typed descriptors of model
//!   types and their properties, with path, accessor and comparator
//!   composition.
//! * [`registry`]: process-wide index of generated bean qualifiers.

pub mod comparator;
pub mod error;
pub mod key;
pub mod keys;
pub mod qualifier;
pub mod registry;
pub mod store;
pub mod value;

pub use comparator::Comparator;
pub use error::{QualifierError, Result};
pub use key::{ExtensionKey, KeyId};
pub use qualifier::{
	BeanQualifier, DynProperty, Getter, Navigator, PropertyBuilder, PropertyQualifier, Qualified, Qualifier, Setter,
	typed,
};
pub use registry::{BeanRegistration, bean, registered_types};
pub use store::{DispatchFn, MetadataRead, MetadataStore, MutableStore};
pub use value::{MetaType, MetaValue, OpaqueValue, Shared, ValueKind};
