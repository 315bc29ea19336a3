//! Tag processors.
//!
//! Processors populate the metadata of each element (the model itself and
//! every accessor) and may contribute items to the generated module. The
//! built-in `path`, `type` and `accessor` processors always run first; the
//! others run by ascending [`Processor::priority`], ties broken by
//! registration order.

use std::sync::{Arc, LazyLock};

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use qualia_core::{ExtensionKey, KeyId, MetaValue, MetadataRead, MutableStore, OpaqueValue, keys};

use crate::descriptor::PropertyDescriptor;
use crate::discovery::AccessorKind;
use crate::error::ProcessError;
use crate::model::{DeclForm, Tags};

/// Result of a processor callback.
pub type ProcessResult = std::result::Result<(), ProcessError>;

/// What a pipeline run is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// Expanding `#[qualify]`: tokens are emitted.
	Expand,
	/// Building a catalog from a build script: nothing is emitted.
	Catalog,
}

/// Context a processor can inspect before running on a model.
#[derive(Debug, Clone)]
pub struct Environment {
	/// Rendered model type.
	pub model: String,
	/// Declaration form.
	pub form: DeclForm,
	/// Rendered runtime crate path.
	pub crate_path: String,
	/// Pipeline mode.
	pub mode: Mode,
}

/// Kind of a processed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
	/// The model type itself (the `self` property).
	Type,
	/// An accessor.
	Accessor(AccessorKind),
}

/// One element handed to [`Processor::process_annotated`].
#[derive(Debug)]
pub struct Element<'a> {
	/// Element kind.
	pub kind: ElementKind,
	/// Property name (`self` for the model).
	pub property: &'a str,
	/// Dotted property path (empty for the model).
	pub path: &'a str,
	/// Function name, for accessors.
	pub method: Option<String>,
	/// Rendered value type.
	pub type_name: &'a str,
	/// Rendered generic arguments of the value type.
	pub generic_arguments: &'a [String],
	/// Tags and docs.
	pub tags: &'a Tags,
	/// Rendered runtime crate path.
	pub crate_path: &'a str,
	/// Span of the element.
	pub span: Span,
}

/// A metadata value emitted as a Rust expression.
///
/// Stored in a [`MetaValue::Opaque`]; emission renders it as
/// `<ty as MetaType>::into_meta(expr)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralExpr {
	/// Rendered value type, a [`qualia_core::MetaType`].
	pub ty: String,
	/// Expression source.
	pub expr: String,
}

impl LiteralExpr {
	/// Wraps the expression as a metadata value.
	pub fn into_meta(self) -> MetaValue {
		MetaValue::Opaque(OpaqueValue::new(Arc::new(self)))
	}

	/// Returns the expression stored in `value`, if any.
	pub fn from_meta(value: &MetaValue) -> Option<Arc<LiteralExpr>> {
		value.as_opaque()?.downcast::<LiteralExpr>()
	}

	/// Parses the type and the expression.
	///
	/// # Errors
	///
	/// A [`ProcessError`] naming the part that is not valid Rust.
	pub fn parse(&self) -> Result<(syn::Type, syn::Expr), ProcessError> {
		let ty = syn::parse_str(&self.ty).map_err(|e| ProcessError::new(format!("invalid type `{}`: {e}", self.ty)))?;
		let expr =
			syn::parse_str(&self.expr).map_err(|e| ProcessError::new(format!("invalid expression `{}`: {e}", self.expr)))?;
		Ok((ty, expr))
	}
}

/// Accumulates items contributed to a model's generated module.
pub struct TypeBuilder {
	crate_path: syn::Path,
	model: syn::Type,
	items: Vec<TokenStream>,
}

impl TypeBuilder {
	/// Creates an empty builder.
	pub fn new(crate_path: syn::Path, model: syn::Type) -> Self {
		Self {
			crate_path,
			model,
			items: Vec::new(),
		}
	}

	/// Runtime crate path.
	pub fn crate_path(&self) -> &syn::Path {
		&self.crate_path
	}

	/// Model type.
	pub fn model(&self) -> &syn::Type {
		&self.model
	}

	/// Adds an item to the generated module.
	pub fn push(&mut self, item: TokenStream) {
		self.items.push(item);
	}

	/// Contributed items, in contribution order.
	pub fn items(&self) -> &[TokenStream] {
		&self.items
	}

	pub(crate) fn len(&self) -> usize {
		self.items.len()
	}

	pub(crate) fn truncate(&mut self, len: usize) {
		self.items.truncate(len);
	}

	pub(crate) fn into_items(self) -> Vec<TokenStream> {
		self.items
	}
}

/// A pluggable metadata processor.
pub trait Processor {
	/// Stable identifier, used in diagnostics.
	fn id(&self) -> &str;

	/// Ordering among non built-in processors; lower runs first.
	fn priority(&self) -> i32 {
		0
	}

	/// Whether the processor runs on the model described by `env`.
	fn processable(&self, _env: &Environment) -> bool {
		true
	}

	/// Populates the metadata of one element.
	fn process_annotated(&self, element: &Element<'_>, store: &mut MutableStore) -> ProcessResult;

	/// Contributes items for one property; runs after every element was processed.
	fn process_property(&self, _builder: &mut TypeBuilder, _property: &PropertyDescriptor) -> ProcessResult {
		Ok(())
	}

	/// Contributes items for the whole model.
	fn process_bean(&self, _builder: &mut TypeBuilder, _name: &str, _properties: &[PropertyDescriptor]) -> ProcessResult {
		Ok(())
	}
}

/// Ordered processor set.
pub struct Processors {
	builtins: Vec<Box<dyn Processor>>,
	external: Vec<Box<dyn Processor>>,
}

impl Default for Processors {
	fn default() -> Self {
		let mut set = Self::builtins_only();
		set.register(DocProcessor);
		set.register(MetaProcessor);
		set.register(ComparatorProcessor);
		set
	}
}

impl Processors {
	/// Only the built-in `path`, `type` and `accessor` processors.
	pub fn builtins_only() -> Self {
		Self {
			builtins: vec![Box::new(PathProcessor), Box::new(TypeProcessor), Box::new(AccessorProcessor)],
			external: Vec::new(),
		}
	}

	/// Registers a processor after those already registered.
	pub fn register(&mut self, processor: impl Processor + 'static) -> &mut Self {
		self.external.push(Box::new(processor));
		self
	}

	/// Processors in execution order.
	pub fn ordered(&self) -> Vec<&dyn Processor> {
		let mut external: Vec<&dyn Processor> = self.external.iter().map(AsRef::as_ref).collect();
		external.sort_by_key(|p| p.priority());
		self.builtins.iter().map(AsRef::as_ref).chain(external).collect()
	}
}

/// `qualia.name` and `qualia.path`.
pub struct PathProcessor;

impl Processor for PathProcessor {
	fn id(&self) -> &str {
		"path"
	}

	fn process_annotated(&self, element: &Element<'_>, store: &mut MutableStore) -> ProcessResult {
		store.put(&keys::NAME, element.property.to_string());
		store.put(&keys::PATH, element.path.to_string());
		Ok(())
	}

	fn process_bean(&self, builder: &mut TypeBuilder, _name: &str, properties: &[PropertyDescriptor]) -> ProcessResult {
		let names = properties.iter().map(|p| p.name.as_str());
		builder.push(quote! {
			/// Property names in declaration order.
			pub const PROPERTY_NAMES: &[&str] = &[#(#names),*];
		});
		Ok(())
	}
}

/// `qualia.type` and `qualia.generic_arguments`.
pub struct TypeProcessor;

impl Processor for TypeProcessor {
	fn id(&self) -> &str {
		"type"
	}

	fn process_annotated(&self, element: &Element<'_>, store: &mut MutableStore) -> ProcessResult {
		store.put(&keys::TYPE, element.type_name.to_string());
		if !element.generic_arguments.is_empty() {
			store.put(&keys::GENERIC_ARGUMENTS, element.generic_arguments.to_vec());
		}
		Ok(())
	}
}

/// Elements seen per property; processor-internal, never emitted.
static ELEMENTS_SEEN: LazyLock<ExtensionKey<i64>> = LazyLock::new(ExtensionKey::anonymous);

/// Accessor method names.
pub struct AccessorProcessor;

impl Processor for AccessorProcessor {
	fn id(&self) -> &str {
		"accessor"
	}

	fn process_annotated(&self, element: &Element<'_>, store: &mut MutableStore) -> ProcessResult {
		let seen = store.get_or(&ELEMENTS_SEEN, 0);
		store.put(&ELEMENTS_SEEN, seen + 1);

		let (ElementKind::Accessor(kind), Some(method)) = (element.kind, &element.method) else {
			return Ok(());
		};
		let key = match kind {
			AccessorKind::Getter => &keys::GETTER,
			AccessorKind::Setter => &keys::SETTER,
			AccessorKind::Navigator => &keys::NAVIGATOR,
		};
		store.put(key, method.clone());
		Ok(())
	}
}

/// Doc comments → `qualia.description`; the first documented element wins.
pub struct DocProcessor;

impl Processor for DocProcessor {
	fn id(&self) -> &str {
		"doc"
	}

	fn process_annotated(&self, element: &Element<'_>, store: &mut MutableStore) -> ProcessResult {
		if store.contains(&keys::DESCRIPTION) {
			return Ok(());
		}
		let text = element
			.tags
			.docs
			.iter()
			.map(|l| l.trim())
			.filter(|l| !l.is_empty())
			.collect::<Vec<_>>()
			.join(" ");
		if !text.is_empty() {
			store.put(&keys::DESCRIPTION, text);
		}
		Ok(())
	}
}

/// `#[qualify(meta(..))]` → literal entries.
pub struct MetaProcessor;

impl Processor for MetaProcessor {
	fn id(&self) -> &str {
		"meta"
	}

	fn priority(&self) -> i32 {
		10
	}

	fn process_annotated(&self, element: &Element<'_>, store: &mut MutableStore) -> ProcessResult {
		for (key, value) in &element.tags.meta {
			if key.starts_with("qualia") {
				return Err(ProcessError::new(format!("metadata key `{key}` is reserved")));
			}
			if let Some(previous) = store.put_raw(KeyId::Named(key.clone().into()), value.clone())
				&& previous != *value
			{
				return Err(ProcessError::new(format!(
					"conflicting values for `{key}`: {} and {}",
					previous.describe(),
					value.describe()
				)));
			}
		}
		Ok(())
	}
}

/// `#[qualify(comparator = expr)]` → comparator override.
///
/// On the model the expression orders model values; on an accessor it orders
/// the property's values.
pub struct ComparatorProcessor;

impl Processor for ComparatorProcessor {
	fn id(&self) -> &str {
		"comparator"
	}

	fn priority(&self) -> i32 {
		20
	}

	fn process_annotated(&self, element: &Element<'_>, store: &mut MutableStore) -> ProcessResult {
		let Some(expr) = &element.tags.comparator else {
			return Ok(());
		};
		let key = KeyId::Named(keys::COMPARATOR_NAME.into());
		let krate = element.crate_path;
		let value = LiteralExpr {
			ty: format!("{krate}::Comparator<{}>", element.type_name),
			expr: expr.clone(),
		};
		if let Some(previous) = store.put_raw(key, value.clone().into_meta())
			&& LiteralExpr::from_meta(&previous).is_none_or(|p| *p != value)
		{
			return Err(ProcessError::new("conflicting comparators"));
		}
		Ok(())
	}
}

/// Identifier of a property's static (`address` → `ADDRESS`).
pub fn static_ident(property: &str) -> syn::Ident {
	use heck::ToShoutySnakeCase;
	format_ident!("{}", property.to_shouty_snake_case())
}

/// Identifier of a property's key-dispatch function.
pub fn lookup_ident(property: &str) -> syn::Ident {
	format_ident!("lookup_{}", property)
}
