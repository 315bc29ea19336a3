//! Model declarations and `#[qualify(...)]` tags.
//!
//! A model is declared either by an inherent `impl` block or by a category
//! module of free functions taking the model as first argument:
//!
//! ```ignore
//! #[qualify]
//! impl Person {
//!     pub fn name(&self) -> &str { &self.name }
//!     #[qualify(rename = "nick", meta(max_len = 16))]
//!     pub fn set_nickname(&mut self, v: String) { self.nickname = v }
//! }
//!
//! #[qualify(category = Person)]
//! mod person_ext {
//!     pub fn get_initials(p: &Person) -> String { p.initials() }
//! }
//! ```

use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use syn::meta::ParseNestedMeta;
use syn::parse::Parser;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, ExprUnary, Ident, Item, Lit, Meta, Signature, Type, UnOp, Visibility};

use qualia_core::MetaValue;

use crate::error::{Diagnostic, GenError};

/// Attribute name of both the macro and element tags.
pub const TAG: &str = "qualify";

/// Tags attached to a model or an accessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags {
	/// `skip`: not a candidate.
	pub skip: bool,
	/// `rename = ".."`: explicit property name.
	pub rename: Option<String>,
	/// `meta(key = literal, ..)`: literal metadata entries, in tag order.
	pub meta: Vec<(String, MetaValue)>,
	/// `comparator = expr`: source of a comparator expression.
	pub comparator: Option<String>,
	/// Doc comment lines.
	pub docs: Vec<String>,
}

impl Tags {
	/// Parses one tag; returns `Ok(false)` when `meta` is not a tag.
	fn parse_one(&mut self, meta: &ParseNestedMeta<'_>) -> syn::Result<bool> {
		if meta.path.is_ident("skip") {
			self.skip = true;
		} else if meta.path.is_ident("rename") {
			let name: syn::LitStr = meta.value()?.parse()?;
			if name.value().is_empty() {
				return Err(syn::Error::new_spanned(name, "`rename` needs a non-empty name"));
			}
			self.rename = Some(name.value());
		} else if meta.path.is_ident("comparator") {
			let expr: Expr = meta.value()?.parse()?;
			self.comparator = Some(expr.to_token_stream().to_string());
		} else if meta.path.is_ident("meta") {
			meta.parse_nested_meta(|entry| {
				let Some(key) = entry.path.get_ident() else {
					return Err(entry.error("metadata keys are plain identifiers"));
				};
				let key = key.to_string();
				let expr: Expr = entry.value()?.parse()?;
				let value = literal_value(&expr)?;
				self.meta.push((key, value));
				Ok(())
			})?;
		} else {
			return Ok(false);
		}
		Ok(true)
	}

	/// Collects tags and doc comments from `attrs`.
	///
	/// # Errors
	///
	/// Malformed `#[qualify(..)]` attributes.
	pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
		let mut tags = Self {
			docs: doc_lines(attrs),
			..Self::default()
		};
		for attr in attrs.iter().filter(|a| a.path().is_ident(TAG)) {
			if matches!(attr.meta, Meta::Path(_)) {
				continue;
			}
			attr.parse_nested_meta(|meta| {
				if tags.parse_one(&meta)? {
					Ok(())
				} else {
					Err(meta.error("unknown qualify tag; expected `skip`, `rename`, `meta` or `comparator`"))
				}
			})?;
		}
		Ok(tags)
	}
}

fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
	attrs
		.iter()
		.filter_map(|attr| {
			if !attr.path().is_ident("doc") {
				return None;
			}
			let Meta::NameValue(meta) = &attr.meta else {
				return None;
			};
			let Expr::Lit(ExprLit { lit: Lit::Str(lit), .. }) = &meta.value else {
				return None;
			};
			Some(lit.value().trim().to_string())
		})
		.collect()
}

/// Converts a literal expression (or array of literals) into a [`MetaValue`].
fn literal_value(expr: &Expr) -> syn::Result<MetaValue> {
	match expr {
		Expr::Lit(ExprLit { lit, .. }) => match lit {
			Lit::Bool(b) => Ok(MetaValue::Bool(b.value)),
			Lit::Int(i) => Ok(MetaValue::Int(i.base10_parse()?)),
			Lit::Float(f) => Ok(MetaValue::Float(f.base10_parse()?)),
			Lit::Str(s) => Ok(MetaValue::Str(s.value().into())),
			other => Err(syn::Error::new_spanned(other, "unsupported metadata literal")),
		},
		Expr::Unary(ExprUnary {
			op: UnOp::Neg(_), expr, ..
		}) => match literal_value(expr)? {
			MetaValue::Int(i) => Ok(MetaValue::Int(-i)),
			MetaValue::Float(f) => Ok(MetaValue::Float(-f)),
			_ => Err(syn::Error::new_spanned(expr, "only numbers can be negated")),
		},
		Expr::Array(array) => array.elems.iter().map(literal_value).collect::<syn::Result<_>>().map(MetaValue::List),
		Expr::Group(group) => literal_value(&group.expr),
		other => Err(syn::Error::new_spanned(other, "metadata values must be literals or arrays of literals")),
	}
}

/// Arguments of the `#[qualify(..)]` attribute on a model.
#[derive(Clone, Default)]
pub struct MacroArgs {
	/// `module = name`: generated module name.
	pub module: Option<Ident>,
	/// `crate = "path"`: runtime crate path.
	pub crate_path: Option<syn::Path>,
	/// `category = Type`: model type of a category module.
	pub category: Option<Type>,
	/// Model-level tags.
	pub tags: Tags,
}

impl MacroArgs {
	/// Parses the attribute arguments.
	///
	/// # Errors
	///
	/// Unknown or malformed arguments.
	pub fn parse(attr: TokenStream) -> syn::Result<Self> {
		let mut args = Self::default();
		let parser = syn::meta::parser(|meta| {
			if meta.path.is_ident("module") {
				args.module = Some(meta.value()?.parse()?);
			} else if meta.path.is_ident("crate") {
				let path: syn::LitStr = meta.value()?.parse()?;
				args.crate_path = Some(path.parse()?);
			} else if meta.path.is_ident("category") {
				args.category = Some(meta.value()?.parse()?);
			} else if !args.tags.parse_one(&meta)? {
				return Err(meta.error("unknown qualify argument"));
			}
			Ok(())
		});
		parser.parse2(attr)?;
		if args.tags.skip || args.tags.rename.is_some() {
			return Err(syn::Error::new(Span::call_site(), "`skip` and `rename` apply to accessors"));
		}
		Ok(args)
	}
}

/// How the model was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclForm {
	/// `impl Model { .. }`.
	Inherent,
	/// `mod name { fn f(m: &Model) .. }`.
	Category {
		/// Module holding the functions.
		module: Ident,
	},
}

/// A candidate function of a declaration, before classification.
#[derive(Clone)]
pub struct MethodDecl {
	/// Whether the item is `pub` (any restriction counts as not public).
	pub public: bool,
	/// Signature.
	pub sig: Signature,
	/// Tags and docs.
	pub tags: Tags,
}

/// A parsed model declaration.
#[derive(Clone)]
pub struct ModelDecl {
	/// Model type.
	pub model: Type,
	/// Rendered model type.
	pub model_name: String,
	/// Declaration form.
	pub form: DeclForm,
	/// Model-level tags (arguments and docs of the annotated item).
	pub tags: Tags,
	/// Candidate functions in declaration order.
	pub methods: Vec<MethodDecl>,
	/// Explicit module name.
	pub module: Option<Ident>,
	/// Explicit runtime crate path.
	pub crate_path: Option<syn::Path>,
	/// Span of the annotated item.
	pub span: Span,
}

impl ModelDecl {
	/// Parses an annotated item.
	///
	/// Returns the declaration and the item with every `qualify` attribute
	/// removed, ready to be re-emitted.
	///
	/// # Errors
	///
	/// [`GenError::InvalidDeclaration`] for anything but a plain inherent impl
	/// or an inline module with `category`, and for malformed tags.
	pub fn parse(args: MacroArgs, mut item: Item) -> Result<(Self, Item), Diagnostic> {
		let span = item.span();
		let decl = match &item {
			Item::Impl(imp) => {
				let model_name = crate::discovery::render_type(&imp.self_ty);
				let invalid = |span: Span, message: &str| {
					Diagnostic::error(
						span,
						GenError::InvalidDeclaration {
							model: model_name.clone(),
							message: message.into(),
						},
					)
				};
				if let Some((_, path, _)) = &imp.trait_ {
					return Err(invalid(path.span(), "trait impls cannot be qualified; annotate an inherent impl"));
				}
				if !imp.generics.params.is_empty() {
					return Err(invalid(imp.generics.span(), "generic impls cannot be qualified"));
				}
				if args.category.is_some() {
					return Err(invalid(span, "`category` applies to modules only"));
				}
				let methods = imp
					.items
					.iter()
					.filter_map(|it| match it {
						syn::ImplItem::Fn(f) => Some((&f.vis, &f.sig, &f.attrs)),
						_ => None,
					})
					.map(|(vis, sig, attrs)| method_decl(vis, sig, attrs))
					.collect::<syn::Result<Vec<_>>>()
					.map_err(|e| invalid(e.span(), &e.to_string()))?;
				ModelDecl {
					model: (*imp.self_ty).clone(),
					model_name,
					form: DeclForm::Inherent,
					tags: merge_item_docs(args.tags, &imp.attrs),
					methods,
					module: args.module,
					crate_path: args.crate_path,
					span,
				}
			}
			Item::Mod(m) => {
				let label = m.ident.to_string();
				let invalid = |span: Span, message: &str| {
					Diagnostic::error(
						span,
						GenError::InvalidDeclaration {
							model: label.clone(),
							message: message.into(),
						},
					)
				};
				let Some(model) = args.category else {
					return Err(invalid(span, "category modules need `category = Type`"));
				};
				let Some((_, items)) = &m.content else {
					return Err(invalid(span, "category modules must be inline"));
				};
				let methods = items
					.iter()
					.filter_map(|it| match it {
						Item::Fn(f) => Some((&f.vis, &f.sig, &f.attrs)),
						_ => None,
					})
					.map(|(vis, sig, attrs)| method_decl(vis, sig, attrs))
					.collect::<syn::Result<Vec<_>>>()
					.map_err(|e| invalid(e.span(), &e.to_string()))?;
				ModelDecl {
					model_name: crate::discovery::render_type(&model),
					model,
					form: DeclForm::Category { module: m.ident.clone() },
					tags: merge_item_docs(args.tags, &m.attrs),
					methods,
					module: args.module,
					crate_path: args.crate_path,
					span,
				}
			}
			other => {
				return Err(Diagnostic::error(
					other.span(),
					GenError::InvalidDeclaration {
						model: "<item>".into(),
						message: "#[qualify] applies to inherent impl blocks and category modules".into(),
					},
				));
			}
		};
		strip_tags(&mut item);
		Ok((decl, item))
	}
}

fn method_decl(vis: &Visibility, sig: &Signature, attrs: &[Attribute]) -> syn::Result<MethodDecl> {
	Ok(MethodDecl {
		public: matches!(vis, Visibility::Public(_)),
		sig: sig.clone(),
		tags: Tags::from_attrs(attrs)?,
	})
}

fn merge_item_docs(mut tags: Tags, attrs: &[Attribute]) -> Tags {
	tags.docs = doc_lines(attrs);
	tags
}

/// Removes every `qualify` attribute from the item and its functions.
pub fn strip_tags(item: &mut Item) {
	let keep = |attrs: &mut Vec<Attribute>| attrs.retain(|a| !a.path().is_ident(TAG));
	match item {
		Item::Impl(imp) => {
			keep(&mut imp.attrs);
			for it in &mut imp.items {
				if let syn::ImplItem::Fn(f) = it {
					keep(&mut f.attrs);
				}
			}
		}
		Item::Mod(m) => {
			keep(&mut m.attrs);
			if let Some((_, items)) = &mut m.content {
				for it in items {
					if let Item::Fn(f) = it {
						keep(&mut f.attrs);
					}
				}
			}
		}
		_ => {}
	}
}
