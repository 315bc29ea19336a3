//! Typed property metadata for Rust models.
//!
//! Annotate a model with [`qualify`] to get a catalog of qualifiers: a
//! [`BeanQualifier`] for the type and a [`PropertyQualifier`] per accessor,
//! each carrying an overridable [`MetadataStore`].
//!
//! ```ignore
//! use qualia::{Qualified, Qualifier, qualify};
//!
//! #[qualify]
//! impl Person {
//!     pub fn name(&self) -> &str { &self.name }
//!     pub fn address(&self) -> Option<&Address> { self.address.as_ref() }
//! }
//!
//! let city = person_qualifier::ADDRESS.compose(&address_qualifier::CITY);
//! assert_eq!(city.path(), "address.city");
//! let by_city = Person::qualifier().property("address.city")?;
//! ```

pub use qualia_core::*;
pub use qualia_macros::qualify;

/// Paths used by generated code. Not public API.
#[doc(hidden)]
pub mod __private {
	pub use inventory;
	pub use qualia_core::comparator::probe::{Probe, ViaClone, ViaDebug, ViaDisplay, ViaNoClone, ViaNothing, ViaOrd};
}
