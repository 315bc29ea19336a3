use std::path::PathBuf;

use proc_macro2::{Span, TokenStream};
use qualia_codegen::{GenError, Pipeline, PipelineConfig};
use quote::quote;

pub fn qualify(attr: TokenStream, item: TokenStream) -> TokenStream {
	match load_config() {
		Ok(config) => qualia_codegen::expand(attr, item, &Pipeline::new(config)),
		Err(e) => {
			let error = syn::Error::new(Span::call_site(), e.to_string()).to_compile_error();
			quote!(#item #error)
		}
	}
}

/// Reads `qualia.toml` from the crate being compiled.
fn load_config() -> Result<PipelineConfig, GenError> {
	match std::env::var_os("CARGO_MANIFEST_DIR") {
		Some(dir) => PipelineConfig::load(&PathBuf::from(dir)),
		None => Ok(PipelineConfig::default()),
	}
}
