//! Accessor discovery.
//!
//! Classifies candidate functions as getters, setters or mutable accessors
//! (navigators) following [`Conventions`], derives property names and
//! normalizes accessor types to the owned property type.

use std::fmt;

use proc_macro2::Span;
use quote::ToTokens;
use syn::spanned::Spanned;
use syn::{FnArg, GenericArgument, Ident, PathArguments, ReturnType, Signature, Type, TypeReference};

use crate::config::Conventions;
use crate::model::{DeclForm, MethodDecl, Tags};

/// Kind of a discovered accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
	/// `&self` → value.
	Getter,
	/// `&mut self, value`.
	Setter,
	/// `&mut self` → `&mut value`.
	Navigator,
}

impl AccessorKind {
	/// Lower-case label.
	pub fn label(self) -> &'static str {
		match self {
			Self::Getter => "getter",
			Self::Setter => "setter",
			Self::Navigator => "navigator",
		}
	}
}

impl fmt::Display for AccessorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// How an accessor's declared type relates to the property type `X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
	/// `X`.
	Owned,
	/// `&X`, `&str` for `String`, `&[T]` for `Vec<T>`.
	Borrowed,
	/// `Option<X>`.
	Optional,
	/// `Option<&X>`.
	OptionalBorrowed,
}

/// A classified accessor.
#[derive(Clone)]
pub struct Accessor {
	/// Kind.
	pub kind: AccessorKind,
	/// Function name.
	pub method: Ident,
	/// Derived property name.
	pub property: String,
	/// Normalized property type.
	pub ty: Type,
	/// Declared shape relative to `ty`.
	pub shape: Shape,
	/// Tags and docs of the function.
	pub tags: Tags,
	/// Span of the signature.
	pub span: Span,
}

/// Receiver of a candidate, after the declaration form is accounted for.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Receiver {
	Shared,
	Exclusive,
}

/// Classifies `method`, or returns `None` if it is not an accessor.
pub fn classify(method: &MethodDecl, form: &DeclForm, model: &Type, conv: &Conventions) -> Option<Accessor> {
	if method.tags.skip || (conv.public_only && !method.public) {
		return None;
	}
	let sig = &method.sig;
	if sig.constness.is_some() || sig.asyncness.is_some() || sig.unsafety.is_some() || sig.variadic.is_some() {
		return None;
	}
	if sig.generics.type_params().next().is_some() || sig.generics.const_params().next().is_some() {
		return None;
	}
	let (receiver, rest) = receiver(sig, form, model)?;
	let name = sig.ident.to_string();
	let output = match &sig.output {
		ReturnType::Default => None,
		ReturnType::Type(_, ty) if is_unit(ty) => None,
		ReturnType::Type(_, ty) => Some(ty.as_ref()),
	};
	if output.is_some_and(|ty| returns_self(ty, model)) && receiver == Receiver::Shared {
		return None;
	}

	let (kind, property, ty, shape) = match (receiver, rest.as_slice()) {
		(Receiver::Shared, []) => {
			let ty = output?;
			let stem = getter_stem(&name, ty, conv)?;
			let (ty, shape) = normalize(ty)?;
			(AccessorKind::Getter, stem, ty, shape)
		}
		(Receiver::Exclusive, [param]) => {
			if output.is_some_and(|ty| !is_mut_self(ty, model)) {
				return None;
			}
			let stem = strip_prefix(&name, &conv.setter_prefixes)?;
			let (ty, shape) = normalize(param)?;
			(AccessorKind::Setter, stem, ty, shape)
		}
		(Receiver::Exclusive, []) => {
			let stem = name.strip_suffix(conv.navigator_suffix.as_str()).filter(|s| !s.is_empty())?;
			let (ty, shape) = normalize_navigator(output?)?;
			(AccessorKind::Navigator, stem.to_string(), ty, shape)
		}
		_ => return None,
	};

	if render_type(&ty) == "Self" {
		return None;
	}

	let property = match &method.tags.rename {
		Some(name) => name.clone(),
		None => lower_first(&property),
	};
	tracing::debug!(
		domain = "discovery",
		method = %sig.ident,
		property = %property,
		kind = %kind,
		"accessor discovered",
	);
	Some(Accessor {
		kind,
		method: sig.ident.clone(),
		property,
		ty,
		shape,
		tags: method.tags.clone(),
		span: sig.span(),
	})
}

/// Splits off the receiver; the remaining parameter types are returned.
fn receiver<'a>(sig: &'a Signature, form: &DeclForm, model: &Type) -> Option<(Receiver, Vec<&'a Type>)> {
	let mut inputs = sig.inputs.iter();
	let first = inputs.next()?;
	let receiver = match (form, first) {
		(DeclForm::Inherent, FnArg::Receiver(r)) => {
			r.reference.as_ref()?;
			if r.mutability.is_some() {
				Receiver::Exclusive
			} else {
				Receiver::Shared
			}
		}
		(DeclForm::Category { .. }, FnArg::Typed(pat)) => {
			let Type::Reference(TypeReference { mutability, elem, .. }) = pat.ty.as_ref() else {
				return None;
			};
			if render_type(elem) != render_type(model) {
				return None;
			}
			if mutability.is_some() {
				Receiver::Exclusive
			} else {
				Receiver::Shared
			}
		}
		_ => return None,
	};
	let rest = inputs
		.map(|arg| match arg {
			FnArg::Typed(pat) => Some(pat.ty.as_ref()),
			FnArg::Receiver(_) => None,
		})
		.collect::<Option<Vec<_>>>()?;
	Some((receiver, rest))
}

fn getter_stem(name: &str, ty: &Type, conv: &Conventions) -> Option<String> {
	if let Some(stem) = strip_prefix(name, &conv.getter_prefixes) {
		return Some(stem);
	}
	if is_bool(ty)
		&& let Some(stem) = strip_prefix(name, &conv.boolean_prefixes)
	{
		return Some(stem);
	}
	conv.bare_getters.then(|| name.to_string())
}

fn strip_prefix(name: &str, prefixes: &[String]) -> Option<String> {
	prefixes
		.iter()
		.filter_map(|p| name.strip_prefix(p.as_str()))
		.find(|stem| !stem.is_empty())
		.map(str::to_string)
}

fn lower_first(name: &str) -> String {
	let mut chars = name.chars();
	match chars.next() {
		Some(first) => first.to_lowercase().chain(chars).collect(),
		None => String::new(),
	}
}

fn is_unit(ty: &Type) -> bool {
	matches!(ty, Type::Tuple(t) if t.elems.is_empty())
}

fn is_bool(ty: &Type) -> bool {
	matches!(ty, Type::Path(p) if p.qself.is_none() && p.path.is_ident("bool"))
}

fn returns_self(ty: &Type, model: &Type) -> bool {
	let rendered = render_type(ty);
	rendered == "Self" || rendered == render_type(model)
}

fn is_mut_self(ty: &Type, model: &Type) -> bool {
	matches!(ty, Type::Reference(r) if r.mutability.is_some() && returns_self(&r.elem, model))
}

/// Normalizes a getter return or setter parameter type to its owned form.
///
/// `Option<X>` → `X`, `&X` → `X`, `&str` → `String`, `&[T]` → `Vec<T>`;
/// `&mut` references, trait objects and `impl Trait` are rejected.
pub fn normalize(ty: &Type) -> Option<(Type, Shape)> {
	let ty = ungroup(ty);
	if let Some(inner) = option_inner(ty) {
		let (inner, shape) = normalize_plain(inner)?;
		let shape = match shape {
			Shape::Borrowed => Shape::OptionalBorrowed,
			_ => Shape::Optional,
		};
		return Some((inner, shape));
	}
	normalize_plain(ty)
}

fn normalize_plain(ty: &Type) -> Option<(Type, Shape)> {
	match ungroup(ty) {
		Type::Reference(r) if r.mutability.is_none() => Some((owned(&r.elem)?, Shape::Borrowed)),
		Type::Reference(_) | Type::ImplTrait(_) | Type::TraitObject(_) | Type::Infer(_) | Type::Never(_) => None,
		other => Some((other.clone(), Shape::Owned)),
	}
}

fn owned(elem: &Type) -> Option<Type> {
	match ungroup(elem) {
		Type::Path(p) if p.qself.is_none() && p.path.is_ident("str") => Some(syn::parse_quote!(String)),
		Type::Slice(s) => {
			let item = &s.elem;
			Some(syn::parse_quote!(Vec<#item>))
		}
		Type::ImplTrait(_) | Type::TraitObject(_) | Type::Reference(_) => None,
		other => Some(other.clone()),
	}
}

/// Normalizes a navigator return type: `&mut X` or `Option<&mut X>`.
fn normalize_navigator(ty: &Type) -> Option<(Type, Shape)> {
	let ty = ungroup(ty);
	let (inner, shape) = match option_inner(ty) {
		Some(inner) => (ungroup(inner), Shape::Optional),
		None => (ty, Shape::Owned),
	};
	match inner {
		Type::Reference(r) if r.mutability.is_some() => match ungroup(&r.elem) {
			Type::ImplTrait(_) | Type::TraitObject(_) | Type::Slice(_) => None,
			Type::Path(p) if p.path.is_ident("str") => None,
			elem => Some((elem.clone(), shape)),
		},
		_ => None,
	}
}

fn ungroup(ty: &Type) -> &Type {
	match ty {
		Type::Group(g) => ungroup(&g.elem),
		Type::Paren(p) => ungroup(&p.elem),
		other => other,
	}
}

fn option_inner(ty: &Type) -> Option<&Type> {
	let Type::Path(p) = ty else {
		return None;
	};
	if p.qself.is_some() {
		return None;
	}
	let segment = p.path.segments.last()?;
	if segment.ident != "Option" {
		return None;
	}
	let PathArguments::AngleBracketed(args) = &segment.arguments else {
		return None;
	};
	match args.args.first() {
		Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
		_ => None,
	}
}

/// Renders a type compactly (`Vec<String>`, `&str`, `std::path::PathBuf`).
pub fn render_type(ty: &Type) -> String {
	let raw = ty.to_token_stream().to_string();
	let mut out = String::with_capacity(raw.len());
	let mut chars = raw.chars().peekable();
	while let Some(c) = chars.next() {
		if c != ' ' {
			out.push(c);
			continue;
		}
		let prev = out.chars().last();
		let next = chars.peek().copied();
		let glue_prev = matches!(prev, Some('<' | '&' | ':' | '(' | '['));
		let glue_next = matches!(next, Some('<' | '>' | ',' | ':' | ')' | ']' | ';'));
		if !glue_prev && !glue_next {
			out.push(' ');
		}
	}
	out
}

/// Renders the generic arguments of the outermost path segment.
pub fn generic_arguments(ty: &Type) -> Vec<String> {
	let Type::Path(p) = ungroup(ty) else {
		return Vec::new();
	};
	let Some(segment) = p.path.segments.last() else {
		return Vec::new();
	};
	let PathArguments::AngleBracketed(args) = &segment.arguments else {
		return Vec::new();
	};
	args.args
		.iter()
		.filter_map(|arg| match arg {
			GenericArgument::Type(ty) => Some(render_type(ty)),
			_ => None,
		})
		.collect()
}

/// Strict and reserved keywords of the 2024 edition.
const KEYWORDS: &[&str] = &[
	"abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate", "do", "dyn", "else",
	"enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro", "match", "mod",
	"move", "mut", "override", "priv", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
	"try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield", "Self",
];

/// Returns `true` if `name` cannot be a property name.
pub fn is_reserved(name: &str, extra: &[String]) -> bool {
	KEYWORDS.contains(&name)
		|| name.starts_with("r#")
		|| extra.iter().any(|w| w == name)
		|| syn::parse_str::<Ident>(name).is_err()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	fn method(tokens: &str) -> MethodDecl {
		let f: syn::ImplItemFn = syn::parse_str(tokens).unwrap();
		MethodDecl {
			public: matches!(f.vis, syn::Visibility::Public(_)),
			sig: f.sig,
			tags: Tags::from_attrs(&f.attrs).unwrap(),
		}
	}

	fn person() -> Type {
		syn::parse_quote!(Person)
	}

	fn classify_inherent(tokens: &str) -> Option<(AccessorKind, String, String, Shape)> {
		let m = method(tokens);
		classify(&m, &DeclForm::Inherent, &person(), &Conventions::default())
			.map(|a| (a.kind, a.property, render_type(&a.ty), a.shape))
	}

	#[rstest]
	#[case("pub fn name(&self) -> &str { todo!() }", AccessorKind::Getter, "name", "String", Shape::Borrowed)]
	#[case("pub fn get_age(&self) -> u32 { 0 }", AccessorKind::Getter, "age", "u32", Shape::Owned)]
	#[case("pub fn is_active(&self) -> bool { true }", AccessorKind::Getter, "active", "bool", Shape::Owned)]
	#[case("pub fn has_pets(&self) -> bool { true }", AccessorKind::Getter, "pets", "bool", Shape::Owned)]
	#[case("pub fn is_ready(&self) -> u8 { 0 }", AccessorKind::Getter, "is_ready", "u8", Shape::Owned)]
	#[case("pub fn tags(&self) -> &[String] { todo!() }", AccessorKind::Getter, "tags", "Vec<String>", Shape::Borrowed)]
	#[case("pub fn address(&self) -> Option<&Address> { None }", AccessorKind::Getter, "address", "Address", Shape::OptionalBorrowed)]
	#[case("pub fn nick(&self) -> Option<String> { None }", AccessorKind::Getter, "nick", "String", Shape::Optional)]
	#[case("pub fn set_name(&mut self, v: String) {}", AccessorKind::Setter, "name", "String", Shape::Owned)]
	#[case("pub fn set_nick(&mut self, v: Option<&str>) -> &mut Self { self }", AccessorKind::Setter, "nick", "String", Shape::OptionalBorrowed)]
	#[case("pub fn address_mut(&mut self) -> Option<&mut Address> { None }", AccessorKind::Navigator, "address", "Address", Shape::Optional)]
	#[case("pub fn name_mut(&mut self) -> &mut String { todo!() }", AccessorKind::Navigator, "name", "String", Shape::Owned)]
	#[case("#[qualify(rename = \"label\")] pub fn title(&self) -> String { todo!() }", AccessorKind::Getter, "label", "String", Shape::Owned)]
	fn accessors_are_classified(
		#[case] tokens: &str,
		#[case] kind: AccessorKind,
		#[case] property: &str,
		#[case] ty: &str,
		#[case] shape: Shape,
	) {
		assert_eq!(
			classify_inherent(tokens),
			Some((kind, property.to_string(), ty.to_string(), shape))
		);
	}

	#[rstest]
	#[case::private("fn name(&self) -> String { todo!() }")]
	#[case::skipped("#[qualify(skip)] pub fn name(&self) -> String { todo!() }")]
	#[case::unit("pub fn touch(&self) {}")]
	#[case::by_value("pub fn into_name(self) -> String { todo!() }")]
	#[case::extra_arg("pub fn name_in(&self, lang: u8) -> String { todo!() }")]
	#[case::generic("pub fn get_as<T>(&self) -> T { todo!() }")]
	#[case::asynchronous("pub async fn name(&self) -> String { todo!() }")]
	#[case::constant("pub const fn id(&self) -> u8 { 0 }")]
	#[case::returns_self("pub fn copy(&self) -> Self { todo!() }")]
	#[case::returns_model("pub fn twin(&self) -> Person { todo!() }")]
	#[case::impl_trait("pub fn chars(&self) -> impl Iterator<Item = char> { todo!() }")]
	#[case::mutating_without_prefix("pub fn clear(&mut self) {}")]
	#[case::setter_with_result("pub fn set_age(&mut self, v: u32) -> bool { true }")]
	#[case::suffix_only("pub fn _mut(&mut self) -> &mut u8 { todo!() }")]
	#[case::navigator_by_value("pub fn age_mut(&mut self) -> u32 { 0 }")]
	#[case::borrowed_self("pub fn me(&self) -> &Self { self }")]
	fn non_accessors_are_ignored(#[case] tokens: &str) {
		assert_eq!(classify_inherent(tokens), None);
	}

	#[test]
	fn bare_getters_can_be_disabled() {
		let conv = Conventions {
			bare_getters: false,
			..Conventions::default()
		};
		let plain = method("pub fn name(&self) -> String { todo!() }");
		let prefixed = method("pub fn get_name(&self) -> String { todo!() }");
		assert!(classify(&plain, &DeclForm::Inherent, &person(), &conv).is_none());
		assert!(classify(&prefixed, &DeclForm::Inherent, &person(), &conv).is_some());
	}

	#[test]
	fn category_functions_take_the_model_first() {
		let form = DeclForm::Category {
			module: syn::parse_quote!(person_ext),
		};
		let getter: syn::ItemFn = syn::parse_quote!(pub fn get_initials(p: &Person) -> String { todo!() });
		let setter: syn::ItemFn = syn::parse_quote!(pub fn set_initials(p: &mut Person, v: &str) {});
		let other: syn::ItemFn = syn::parse_quote!(pub fn get_code(a: &Address) -> String { todo!() });
		let decl = |f: syn::ItemFn| MethodDecl {
			public: true,
			sig: f.sig,
			tags: Tags::default(),
		};
		let conv = Conventions::default();

		let g = classify(&decl(getter), &form, &person(), &conv).unwrap();
		assert_eq!((g.kind, g.property.as_str()), (AccessorKind::Getter, "initials"));
		let s = classify(&decl(setter), &form, &person(), &conv).unwrap();
		assert_eq!((s.kind, s.shape), (AccessorKind::Setter, Shape::Borrowed));
		assert!(classify(&decl(other), &form, &person(), &conv).is_none());
	}

	#[rstest]
	#[case("Vec<String>", "Vec<String>", &["String"])]
	#[case("std::collections::HashMap<String, u32>", "std::collections::HashMap<String, u32>", &["String", "u32"])]
	#[case("Option<Vec<u8>>", "Option<Vec<u8>>", &["Vec<u8>"])]
	#[case("&'static str", "&'static str", &[])]
	#[case("[u8; 4]", "[u8; 4]", &[])]
	fn types_render_compactly(#[case] src: &str, #[case] rendered: &str, #[case] args: &[&str]) {
		let ty: Type = syn::parse_str(src).unwrap();
		assert_eq!(render_type(&ty), rendered);
		assert_eq!(generic_arguments(&ty), args.iter().map(|a| a.to_string()).collect::<Vec<_>>());
	}

	#[rstest]
	#[case("type", true)]
	#[case("self", true)]
	#[case("r#type", true)]
	#[case("id", true)]
	#[case("name", false)]
	fn reserved_names(#[case] name: &str, #[case] reserved: bool) {
		assert_eq!(is_reserved(name, &["id".to_string()]), reserved);
	}
}
