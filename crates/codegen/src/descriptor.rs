//! Property descriptors: accessors merged by property name.

use indexmap::IndexMap;
use syn::Type;

use crate::config::PipelineConfig;
use crate::discovery::{self, Accessor, AccessorKind};
use crate::error::{Diagnostic, GenError};
use crate::model::ModelDecl;
use crate::processor::{lookup_ident, static_ident};

/// Items every generated module defines besides the per-property ones.
const FIXED_ITEMS: &[&str] = &["SELF", "PROPERTY_NAMES", "properties", "registered_bean", "lookup_self"];

/// One property of a model.
#[derive(Clone)]
pub struct PropertyDescriptor {
	/// Property name.
	pub name: String,
	/// Normalized value type.
	pub ty: Type,
	/// Rendered value type.
	pub type_name: String,
	/// Rendered generic arguments of the value type.
	pub generic_arguments: Vec<String>,
	/// Getter, if any.
	pub getter: Option<Accessor>,
	/// Setter, if any.
	pub setter: Option<Accessor>,
	/// Mutable accessor, if any.
	pub navigator: Option<Accessor>,
}

impl PropertyDescriptor {
	fn new(first: Accessor) -> Self {
		let mut descriptor = Self {
			name: first.property.clone(),
			type_name: discovery::render_type(&first.ty),
			generic_arguments: discovery::generic_arguments(&first.ty),
			ty: first.ty.clone(),
			getter: None,
			setter: None,
			navigator: None,
		};
		let kind = first.kind;
		*descriptor.slot(kind) = Some(first);
		descriptor
	}

	fn slot(&mut self, kind: AccessorKind) -> &mut Option<Accessor> {
		match kind {
			AccessorKind::Getter => &mut self.getter,
			AccessorKind::Setter => &mut self.setter,
			AccessorKind::Navigator => &mut self.navigator,
		}
	}

	/// Bound accessors in getter, setter, navigator order.
	pub fn accessors(&self) -> impl Iterator<Item = &Accessor> {
		[&self.getter, &self.setter, &self.navigator].into_iter().flatten()
	}
}

/// Discovers and merges the properties of a declaration.
///
/// Reserved names are reported as warnings and skipped. Duplicate accessors,
/// type mismatches and generated identifiers that would collide are returned
/// as errors; every error of the declaration is collected.
pub fn collect(decl: &ModelDecl, config: &PipelineConfig) -> (Vec<PropertyDescriptor>, Vec<Diagnostic>) {
	let mut merged: IndexMap<String, PropertyDescriptor> = IndexMap::new();
	let mut diagnostics = Vec::new();
	let model = &decl.model_name;

	for method in &decl.methods {
		let Some(accessor) = discovery::classify(method, &decl.form, &decl.model, &config.conventions) else {
			continue;
		};
		if discovery::is_reserved(&accessor.property, &config.reserved_words) {
			tracing::warn!(
				domain = "discovery",
				model = %model,
				property = %accessor.property,
				"reserved property name; skipped",
			);
			diagnostics.push(Diagnostic::warning(
				accessor.span,
				GenError::ReservedName {
					model: model.clone(),
					property: accessor.property.clone(),
					method: accessor.method.to_string(),
				},
			));
			continue;
		}

		let Some(descriptor) = merged.get_mut(&accessor.property) else {
			merged.insert(accessor.property.clone(), PropertyDescriptor::new(accessor));
			continue;
		};

		let kind = accessor.kind;
		if let Some(first) = &*descriptor.slot(kind) {
			diagnostics.push(Diagnostic::error(
				accessor.span,
				GenError::DuplicateAccessor {
					model: model.clone(),
					property: accessor.property.clone(),
					kind: kind.label(),
					first: first.method.to_string(),
					second: accessor.method.to_string(),
				},
			));
			continue;
		}

		let found = discovery::render_type(&accessor.ty);
		if found != descriptor.type_name {
			diagnostics.push(Diagnostic::error(
				accessor.span,
				GenError::AccessorTypeMismatch {
					model: model.clone(),
					property: accessor.property.clone(),
					method: accessor.method.to_string(),
					expected: descriptor.type_name.clone(),
					found,
				},
			));
			continue;
		}

		*descriptor.slot(kind) = Some(accessor);
	}

	let properties: Vec<PropertyDescriptor> = merged.into_values().collect();
	check_identifiers(model, &properties, &mut diagnostics);
	(properties, diagnostics)
}

fn check_identifiers(model: &str, properties: &[PropertyDescriptor], diagnostics: &mut Vec<Diagnostic>) {
	let mut owners: IndexMap<String, String> = FIXED_ITEMS
		.iter()
		.map(|item| (item.to_string(), "a generated item".to_string()))
		.collect();
	for property in properties {
		let span = property.accessors().next().map_or_else(proc_macro2::Span::call_site, |a| a.span);
		for ident in [static_ident(&property.name), lookup_ident(&property.name)] {
			let ident = ident.to_string();
			match owners.get(&ident) {
				Some(other) => diagnostics.push(Diagnostic::error(
					span,
					GenError::IdentifierCollision {
						model: model.to_string(),
						property: property.name.clone(),
						ident,
						other: other.clone(),
					},
				)),
				None => {
					owners.insert(ident, format!("property `{}`", property.name));
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use quote::quote;

	use super::*;
	use crate::error::Level;
	use crate::model::MacroArgs;

	fn collect_from(item: proc_macro2::TokenStream) -> (Vec<PropertyDescriptor>, Vec<Diagnostic>) {
		let (decl, _) = ModelDecl::parse(MacroArgs::default(), syn::parse2(item).unwrap()).unwrap();
		collect(&decl, &PipelineConfig::default())
	}

	#[test]
	fn accessors_merge_in_declaration_order() {
		let (props, diags) = collect_from(quote! {
			impl Person {
				pub fn set_name(&mut self, v: String) {}
				pub fn address(&self) -> Option<&Address> { None }
				pub fn name(&self) -> &str { "" }
				pub fn address_mut(&mut self) -> Option<&mut Address> { None }
			}
		});
		assert!(diags.is_empty());
		let summary: Vec<_> = props
			.iter()
			.map(|p| {
				(
					p.name.as_str(),
					p.type_name.as_str(),
					p.getter.is_some(),
					p.setter.is_some(),
					p.navigator.is_some(),
				)
			})
			.collect();
		assert_eq!(
			summary,
			vec![("name", "String", true, true, false), ("address", "Address", true, false, true)]
		);
	}

	#[test]
	fn two_getters_for_one_name_are_duplicates() {
		let (_, diags) = collect_from(quote! {
			impl Person {
				pub fn name(&self) -> String { todo!() }
				pub fn get_name(&self) -> String { todo!() }
			}
		});
		assert_eq!(diags.len(), 1);
		assert_eq!(diags[0].level, Level::Error);
		assert!(
			matches!(&diags[0].error, GenError::DuplicateAccessor { property, first, second, .. }
				if property == "name" && first == "name" && second == "get_name")
		);
	}

	#[test]
	fn differently_typed_getters_are_still_duplicates() {
		let (_, diags) = collect_from(quote! {
			impl Person {
				pub fn age(&self) -> u32 { 0 }
				pub fn get_age(&self) -> i64 { 0 }
			}
		});
		assert!(matches!(&diags[..], [d] if matches!(&d.error, GenError::DuplicateAccessor { first, second, .. }
			if first == "age" && second == "get_age")));
	}

	#[test]
	fn mismatched_accessor_types_are_errors() {
		let (_, diags) = collect_from(quote! {
			impl Person {
				pub fn age(&self) -> u32 { 0 }
				pub fn set_age(&mut self, v: i64) {}
			}
		});
		assert!(matches!(&diags[..], [d] if matches!(&d.error, GenError::AccessorTypeMismatch { expected, found, .. }
			if expected == "u32" && found == "i64")));
	}

	#[test]
	fn colliding_generated_identifiers_are_errors() {
		let (_, diags) = collect_from(quote! {
			impl Person {
				pub fn property_names(&self) -> Vec<String> { todo!() }
				pub fn foo_bar(&self) -> u8 { 0 }
				#[qualify(rename = "fooBar")]
				pub fn other(&self) -> u8 { 0 }
			}
		});
		let collisions: Vec<(&str, &str, &str)> = diags
			.iter()
			.filter_map(|d| match &d.error {
				GenError::IdentifierCollision {
					property, ident, other, ..
				} => Some((property.as_str(), ident.as_str(), other.as_str())),
				_ => None,
			})
			.collect();
		assert_eq!(
			collisions,
			vec![
				("property_names", "PROPERTY_NAMES", "a generated item"),
				("fooBar", "FOO_BAR", "property `foo_bar`"),
			]
		);
		assert!(diags.iter().all(|d| d.level == Level::Error));
	}

	#[test]
	fn reserved_names_are_skipped_with_a_warning() {
		let (props, diags) = collect_from(quote! {
			impl Item {
				pub fn get_type(&self) -> String { todo!() }
				#[qualify(rename = "kind")]
				pub fn set_type(&mut self, v: String) {}
			}
		});
		assert_eq!(props.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["kind"]);
		assert!(matches!(&diags[..], [d] if d.level == Level::Warning
			&& matches!(&d.error, GenError::ReservedName { property, .. } if property == "type")));
	}

	#[test]
	fn generic_arguments_are_recorded() {
		let (props, _) = collect_from(quote! {
			impl Inventory {
				pub fn stock(&self) -> &std::collections::BTreeMap<String, u32> { todo!() }
			}
		});
		assert_eq!(props[0].generic_arguments, vec!["String".to_string(), "u32".to_string()]);
	}
}
