use pretty_assertions::assert_eq;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{File, Item};

use super::*;

fn run(attr: TokenStream, item: TokenStream) -> TokenStream {
	expand(attr, item, &Pipeline::new(PipelineConfig::default()))
}

fn items(tokens: TokenStream) -> Vec<Item> {
	syn::parse2::<File>(tokens).expect("expansion parses as items").items
}

fn module<'a>(items: &'a [Item], name: &str) -> Option<&'a syn::ItemMod> {
	items.iter().find_map(|it| match it {
		Item::Mod(m) if m.ident == name => Some(m),
		_ => None,
	})
}

fn statics(module: &syn::ItemMod) -> Vec<String> {
	let Some((_, items)) = &module.content else {
		return Vec::new();
	};
	items
		.iter()
		.filter_map(|it| match it {
			Item::Static(s) => Some(s.ident.to_string()),
			_ => None,
		})
		.collect()
}

fn person() -> TokenStream {
	quote! {
		/// A person.
		impl Person {
			/// Given name.
			pub fn name(&self) -> &str { &self.name }
			pub fn set_name(&mut self, name: String) { self.name = name }
			#[qualify(meta(min = 0))]
			pub fn age(&self) -> u32 { self.age }
			pub fn address_mut(&mut self) -> Option<&mut Address> { self.address.as_mut() }
			fn secret(&self) -> u8 { 0 }
		}
	}
}

#[test]
fn inherent_model_expands_to_module_and_qualified_impl() {
	let out = items(run(quote!(), person()));

	let generated = module(&out, "person_qualifier").expect("generated module");
	assert_eq!(statics(generated), vec!["SELF", "NAME", "AGE", "ADDRESS"]);

	let qualified = out.iter().any(|it| {
		matches!(it, Item::Impl(imp) if imp.trait_.as_ref().is_some_and(|(_, path, _)| {
			path.segments.last().is_some_and(|s| s.ident == "Qualified")
		}))
	});
	assert!(qualified);
}

#[test]
fn annotated_item_is_reemitted_without_tags() {
	let out = items(run(quote!(), person()));
	let Some(Item::Impl(imp)) = out.first() else {
		panic!("first item is the model impl");
	};
	let tagged = imp.items.iter().any(|it| match it {
		syn::ImplItem::Fn(f) => f.attrs.iter().any(|a| a.path().is_ident("qualify")),
		_ => false,
	});
	assert!(!tagged);
	assert_eq!(imp.items.len(), 5);
}

#[test]
fn expansion_is_deterministic() {
	let first = run(quote!(meta(table = "persons")), person()).to_string();
	let second = run(quote!(meta(table = "persons")), person()).to_string();
	assert_eq!(first, second);
}

#[test]
fn module_argument_renames_generated_module() {
	let out = items(run(quote!(module = people), person()));
	assert!(module(&out, "people").is_some());
	assert!(module(&out, "person_qualifier").is_none());
}

#[test]
fn custom_crate_path_is_used() {
	let out = run(quote!(crate = "crate::rt"), person()).to_string();
	assert!(out.contains("crate :: rt :: BeanQualifier"), "{out}");
	assert!(!out.contains(":: qualia ::"), "{out}");
}

#[test]
fn duplicate_accessors_fail_the_model_but_keep_the_item() {
	let out = run(
		quote!(),
		quote! {
			impl Person {
				pub fn name(&self) -> String { String::new() }
				pub fn get_name(&self) -> String { String::new() }
			}
		},
	);
	let text = out.to_string();
	assert!(text.contains("compile_error"), "{text}");
	assert!(text.contains("duplicate getter"), "{text}");

	let out = items(out);
	assert!(matches!(out.first(), Some(Item::Impl(_))));
	assert!(module(&out, "person_qualifier").is_none());
}

#[test]
fn reserved_names_warn_and_are_skipped() {
	let out = run(
		quote!(),
		quote! {
			impl Part {
				pub fn get_type(&self) -> String { String::new() }
				pub fn label(&self) -> String { String::new() }
			}
		},
	);
	let text = out.to_string();
	assert!(text.contains("deprecated"), "{text}");
	assert!(!text.contains("compile_error"), "{text}");

	let out = items(out);
	let generated = module(&out, "part_qualifier").expect("generated module");
	assert_eq!(statics(generated), vec!["SELF", "LABEL"]);
}

#[test]
fn unknown_arguments_are_reported_next_to_the_item() {
	let text = run(quote!(bogus = 1), person()).to_string();
	assert!(text.contains("compile_error"), "{text}");
	assert!(text.contains("impl Person"), "{text}");
}

#[test]
fn trait_impls_are_rejected() {
	let text = run(quote!(), quote!(impl Clone for Person { fn clone(&self) -> Self { todo!() } })).to_string();
	assert!(text.contains("trait impls cannot be qualified"), "{text}");
}

#[test]
fn category_module_calls_sibling_functions() {
	let out = run(
		quote!(category = Person),
		quote! {
			pub mod person_ext {
				pub fn get_initial(p: &Person) -> char { 'x' }
			}
		},
	);
	let text = out.to_string();
	assert!(text.contains("super :: person_ext :: get_initial"), "{text}");

	let out = items(out);
	let generated = module(&out, "person_qualifier").expect("generated module");
	assert_eq!(statics(generated), vec!["SELF", "INITIAL"]);
	assert!(!out.iter().any(|it| matches!(it, Item::Impl(_))));
}

#[test]
fn comparator_tag_is_emitted_as_metadata_expression() {
	let text = run(
		quote!(),
		quote! {
			impl Person {
				#[qualify(comparator = ::qualia::Comparator::natural().reversed())]
				pub fn age(&self) -> u32 { self.age }
			}
		},
	)
	.to_string();
	assert!(text.contains("\"qualia.comparator\""), "{text}");
	assert!(text.contains("reversed"), "{text}");
}
