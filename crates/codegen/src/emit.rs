//! Token emission.
//!
//! For a model `Person` the generated module looks like:
//!
//! ```ignore
//! pub mod person_qualifier {
//!     pub static SELF: LazyLock<BeanQualifier<Person>> = ..;
//!     pub static NAME: LazyLock<PropertyQualifier<Person, String>> = ..;
//!     pub fn properties() -> Vec<Arc<dyn DynProperty<Person>>> { .. }
//!     pub fn lookup_self(key: &str) -> Option<MetaValue> { .. }
//!     pub fn lookup_name(key: &str) -> Option<MetaValue> { .. }
//!     // processor contributions, inventory registration
//! }
//! impl Qualified for Person { .. }
//! ```
//!
//! Output depends only on the pipeline output, so identical declarations
//! produce identical token streams.

use proc_macro2::{Literal, Span, TokenStream};
use quote::{format_ident, quote, quote_spanned};
use qualia_core::{KeyId, MetaValue, MutableStore};
use syn::Type;

use crate::discovery::{Accessor, Shape};
use crate::error::{Diagnostic, Level};
use crate::model::DeclForm;
use crate::pipeline::{GeneratedProperty, ModelOutput};
use crate::processor::{LiteralExpr, lookup_ident, static_ident};

/// Emits the generated module and, for inherent declarations, the
/// `Qualified` impl.
pub fn emit(out: &ModelOutput) -> TokenStream {
	let krate = &out.crate_path;
	let model = &out.model;
	let module = &out.module;
	let doc = format!("Generated qualifiers of `{}`.", out.model_name);

	let natural = natural_comparator(krate, model);
	let identity = quote! {{
		#[allow(unused_imports)]
		use #krate::__private::{ViaClone as _, ViaNoClone as _};
		(&#krate::__private::Probe::<#model>::new()).identity_getter()
	}};

	let statics = out.properties.iter().map(|p| property_static(out, p));
	let handles = out.properties.iter().map(|p| static_ident(&p.descriptor.name));
	let self_lookup = lookup_fn(krate, &format_ident!("lookup_self"), &out.bean);
	let lookups = out
		.properties
		.iter()
		.map(|p| lookup_fn(krate, &lookup_ident(&p.descriptor.name), &p.metadata));
	let contributions = &out.contributions;

	let qualified = (out.form == DeclForm::Inherent).then(|| {
		quote! {
			impl #krate::Qualified for #model {
				fn qualifier() -> &'static #krate::BeanQualifier<Self> {
					&#module::SELF
				}
			}
		}
	});

	quote! {
		#[doc = #doc]
		#[allow(dead_code, non_snake_case, private_interfaces, clippy::all)]
		pub mod #module {
			#[allow(unused_imports)]
			use super::*;

			/// Qualifier of the model itself.
			pub static SELF: ::std::sync::LazyLock<#krate::BeanQualifier<#model>> = ::std::sync::LazyLock::new(|| {
				#krate::BeanQualifier::new(
					#krate::MetadataStore::from_dispatch(lookup_self, ::core::option::Option::None),
					properties(),
					#natural,
					#identity,
				)
			});

			#(#statics)*

			/// Property qualifiers in declaration order.
			pub fn properties() -> ::std::vec::Vec<::std::sync::Arc<dyn #krate::DynProperty<#model>>> {
				::std::vec![#(#handles.as_dyn()),*]
			}

			#self_lookup
			#(#lookups)*

			fn registered_bean() -> &'static (dyn ::core::any::Any + ::core::marker::Send + ::core::marker::Sync) {
				&*SELF
			}

			#krate::__private::inventory::submit! {
				#krate::BeanRegistration::new::<#model>(registered_bean)
			}

			#(#contributions)*
		}

		#qualified
	}
}

fn natural_comparator(krate: &syn::Path, ty: &Type) -> TokenStream {
	quote! {{
		#[allow(unused_imports)]
		use #krate::__private::{ViaDebug as _, ViaDisplay as _, ViaNothing as _, ViaOrd as _};
		(&&&#krate::__private::Probe::<#ty>::new()).natural_comparator()
	}}
}

fn property_static(out: &ModelOutput, property: &GeneratedProperty) -> TokenStream {
	let krate = &out.crate_path;
	let model = &out.model;
	let d = &property.descriptor;
	let name = &d.name;
	let ident = static_ident(name);
	let lookup = lookup_ident(name);
	let ty = &d.ty;
	let doc = format!("Property `{name}` of `{}`.", out.model_name);
	let natural = natural_comparator(krate, ty);

	let getter = d.getter.as_ref().map(|a| {
		let call = call(out, a, None);
		let body = match a.shape {
			Shape::Owned => quote!(::core::option::Option::Some(#call)),
			Shape::Borrowed => quote!(::core::option::Option::Some(::std::borrow::ToOwned::to_owned(#call))),
			Shape::Optional => call,
			Shape::OptionalBorrowed => quote!(#call.map(::std::borrow::ToOwned::to_owned)),
		};
		quote!(.getter(|obj: &#model| #body))
	});

	let setter = d.setter.as_ref().map(|a| {
		let arg = match a.shape {
			Shape::Owned => quote!(value),
			Shape::Borrowed => quote!(::std::borrow::Borrow::borrow(&value)),
			Shape::Optional => quote!(::core::option::Option::Some(value)),
			Shape::OptionalBorrowed => quote!(::core::option::Option::Some(::std::borrow::Borrow::borrow(&value))),
		};
		let call = call(out, a, Some(arg));
		quote! {
			.setter(|obj: &mut #model, value: #ty| {
				#call;
				::core::result::Result::Ok(())
			})
		}
	});

	let navigator = d.navigator.as_ref().map(|a| {
		let call = call(out, a, None);
		let body = match a.shape {
			Shape::Optional | Shape::OptionalBorrowed => call,
			Shape::Owned | Shape::Borrowed => quote!(::core::option::Option::Some(#call)),
		};
		quote!(.navigator(|obj: &mut #model| #body))
	});

	quote! {
		#[doc = #doc]
		pub static #ident: ::std::sync::LazyLock<#krate::PropertyQualifier<#model, #ty>> = ::std::sync::LazyLock::new(|| {
			#krate::PropertyQualifier::builder(#name)
				.metadata(#krate::MetadataStore::from_dispatch(#lookup, ::core::option::Option::None))
				.value_comparator(#natural)
				#getter
				#setter
				#navigator
				.build()
		});
	}
}

/// Calls an accessor on `obj`, with an extra argument for setters.
fn call(out: &ModelOutput, accessor: &Accessor, arg: Option<TokenStream>) -> TokenStream {
	let method = &accessor.method;
	let model = &out.model;
	let callee = match &out.form {
		DeclForm::Inherent => quote!(<#model>::#method),
		DeclForm::Category { module } => quote!(super::#module::#method),
	};
	match arg {
		Some(arg) => quote!(#callee(obj, #arg)),
		None => quote!(#callee(obj)),
	}
}

/// Emits a key-dispatch function over the named, renderable entries of `store`.
fn lookup_fn(krate: &syn::Path, ident: &syn::Ident, store: &MutableStore) -> TokenStream {
	let arms = store.entries().into_iter().filter_map(|(id, value)| {
		let KeyId::Named(name) = &id else {
			return None;
		};
		let name = name.as_ref();
		let value = value_tokens(krate, &value)?;
		Some(quote!(#name => ::core::option::Option::Some(#value),))
	});
	quote! {
		/// Metadata entries resolved at expansion time.
		pub fn #ident(key: &str) -> ::core::option::Option<#krate::MetaValue> {
			match key {
				#(#arms)*
				_ => ::core::option::Option::None,
			}
		}
	}
}

/// Renders a literal or literal-expression value; other opaque values have
/// no source form. The pipeline has already rejected expressions that do not
/// parse.
fn value_tokens(krate: &syn::Path, value: &MetaValue) -> Option<TokenStream> {
	Some(match value {
		MetaValue::Bool(b) => quote!(#krate::MetaValue::Bool(#b)),
		MetaValue::Int(i) => {
			let lit = Literal::i64_suffixed(*i);
			quote!(#krate::MetaValue::Int(#lit))
		}
		MetaValue::Float(f) if f.is_finite() => {
			let lit = Literal::f64_suffixed(*f);
			quote!(#krate::MetaValue::Float(#lit))
		}
		MetaValue::Float(f) => {
			let bits = f.to_bits();
			quote!(#krate::MetaValue::Float(f64::from_bits(#bits)))
		}
		MetaValue::Str(s) => {
			let s = s.as_ref();
			quote!(#krate::MetaValue::Str(::std::borrow::Cow::Borrowed(#s)))
		}
		MetaValue::List(items) => {
			let items = items
				.iter()
				.map(|v| value_tokens(krate, v))
				.collect::<Option<Vec<_>>>()?;
			quote!(#krate::MetaValue::List(::std::vec![#(#items),*]))
		}
		MetaValue::Opaque(_) => {
			let (ty, expr) = LiteralExpr::from_meta(value)?.parse().ok()?;
			quote!(<#ty as #krate::MetaType>::into_meta(#expr))
		}
	})
}

/// Renders diagnostics: errors as `compile_error!`, warnings as uses of a
/// deprecated constant so they surface as compiler warnings.
pub fn diagnostics(diagnostics: &[Diagnostic]) -> TokenStream {
	diagnostics
		.iter()
		.map(|d| match d.level {
			Level::Error => syn::Error::new(d.span, d.error.to_string()).to_compile_error(),
			Level::Warning => warning(d.span, &d.error.to_string()),
		})
		.collect()
}

fn warning(span: Span, message: &str) -> TokenStream {
	let ident = format_ident!("qualia_warning", span = span);
	quote_spanned! {span=>
		const _: () = {
			#[deprecated(note = #message)]
			#[allow(non_upper_case_globals)]
			const #ident: () = ();
			#ident
		};
	}
}
