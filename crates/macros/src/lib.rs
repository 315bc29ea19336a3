//! Procedural macros for qualia.
//!
//! * `#[qualify]` - generates bean and property qualifiers for a model

use proc_macro::TokenStream;

/// `#[qualify]` implementation.
mod qualify;

/// Generates qualifiers for a model.
///
/// On an inherent impl block, every `pub` accessor becomes a property:
///
/// ```ignore
/// #[qualify(meta(table = "persons"))]
/// impl Person {
///     /// Given name.
///     pub fn name(&self) -> &str { &self.name }
///     pub fn set_name(&mut self, name: String) { self.name = name }
///     #[qualify(meta(max = 150))]
///     pub fn age(&self) -> u32 { self.age }
///     pub fn address_mut(&mut self) -> Option<&mut Address> { self.address.as_mut() }
/// }
/// ```
///
/// Models from other crates are declared through a category module whose
/// free functions take the model as first argument:
///
/// ```ignore
/// #[qualify(category = Path)]
/// pub mod path_ext {
///     pub fn get_extension(p: &Path) -> Option<String> { .. }
/// }
/// ```
///
/// Arguments:
/// * `module = name` - generated module name (default `person_qualifier`)
/// * `crate = "path"` - runtime crate path (default `::qualia`)
/// * `category = Type` - model type of a category module
/// * `meta(key = literal, ..)` - model metadata
/// * `comparator = expr` - natural comparator override
///
/// Accessor tags: `skip`, `rename = ".."`, `meta(..)` and `comparator = expr`.
#[proc_macro_attribute]
pub fn qualify(attr: TokenStream, item: TokenStream) -> TokenStream {
	qualify::qualify(attr.into(), item.into()).into()
}
