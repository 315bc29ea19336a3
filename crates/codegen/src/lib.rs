//! Accessor discovery, tag processors and code emission for qualia models.
//!
//! The `#[qualify]` macro is a thin wrapper over [`expand`]. Build scripts can
//! run the same pipeline without emitting code through `compile::BuildCtx`
//! (feature `compile`).

use proc_macro2::TokenStream;
use quote::quote;

pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod emit;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod processor;

#[cfg(feature = "compile")]
pub mod compile;

pub use config::{CONFIG_FILE, Conventions, PipelineConfig};
pub use descriptor::PropertyDescriptor;
pub use discovery::{Accessor, AccessorKind, Shape};
pub use error::{Diagnostic, Failure, GenError, Level, ProcessError, Result};
pub use model::{DeclForm, MacroArgs, ModelDecl, Tags};
pub use pipeline::{GeneratedProperty, ModelOutput, Pipeline};
pub use processor::{Element, ElementKind, Environment, LiteralExpr, Mode, ProcessResult, Processor, Processors, TypeBuilder};

/// Expands a `#[qualify(attr)]` item.
///
/// The item is always re-emitted with its `qualify` tags stripped, so a
/// failing declaration still leaves the model usable; failures and warnings
/// are rendered next to it.
pub fn expand(attr: TokenStream, item: TokenStream, pipeline: &Pipeline) -> TokenStream {
	let item: syn::Item = match syn::parse2(item) {
		Ok(item) => item,
		Err(e) => return e.to_compile_error(),
	};
	let args = match MacroArgs::parse(attr) {
		Ok(args) => args,
		Err(e) => {
			let mut item = item;
			model::strip_tags(&mut item);
			let error = e.to_compile_error();
			return quote!(#item #error);
		}
	};

	let (decl, stripped) = match ModelDecl::parse(args, item.clone()) {
		Ok(parsed) => parsed,
		Err(diagnostic) => {
			let mut item = item;
			model::strip_tags(&mut item);
			let error = emit::diagnostics(&[diagnostic]);
			return quote!(#item #error);
		}
	};

	match pipeline.run(&decl, Mode::Expand) {
		Ok(output) => {
			let generated = emit::emit(&output);
			let reports = emit::diagnostics(&output.diagnostics);
			quote!(#stripped #generated #reports)
		}
		Err(failure) => {
			let errors = emit::diagnostics(&failure.causes);
			quote!(#stripped #errors)
		}
	}
}

#[cfg(test)]
mod tests;
