//! Build-script support.
//!
//! Gated behind the `compile` feature. Scans a source tree for `#[qualify]`
//! declarations, runs the pipeline over them without emitting code and writes
//! a JSON catalog of models, properties and their literal metadata into
//! `OUT_DIR`:
//!
//! ```ignore
//! // build.rs
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = qualia_codegen::compile::BuildCtx::new()?;
//!     let catalog = ctx.scan(&ctx.manifest_dir.join("src"))?;
//!     ctx.write_catalog("qualia_catalog.json", &catalog)?;
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use qualia_core::{KeyId, MetaValue, MutableStore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::{GenError, Result};
use crate::model::{DeclForm, MacroArgs, ModelDecl, TAG};
use crate::pipeline::{ModelOutput, Pipeline};
use crate::processor::{LiteralExpr, Mode};

/// Language-neutral description of every qualified model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
	/// Models in file, then declaration order.
	pub models: Vec<CatalogModel>,
	/// Rendered warnings and failures.
	pub diagnostics: Vec<String>,
}

/// One model of a [`Catalog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogModel {
	/// Rendered model type.
	pub name: String,
	/// Generated module name.
	pub module: String,
	/// `inherent` or `category`.
	pub form: String,
	/// Source file, relative to the scanned root.
	pub source: String,
	/// Metadata of the model itself.
	pub metadata: BTreeMap<String, Value>,
	/// Properties in declaration order.
	pub properties: Vec<CatalogProperty>,
}

/// One property of a [`CatalogModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProperty {
	/// Property name.
	pub name: String,
	/// Rendered value type.
	pub type_name: String,
	/// Getter name.
	pub getter: Option<String>,
	/// Setter name.
	pub setter: Option<String>,
	/// Mutable accessor name.
	pub navigator: Option<String>,
	/// Renderable metadata entries.
	pub metadata: BTreeMap<String, Value>,
}

/// Paths and pipeline of a build script.
pub struct BuildCtx {
	/// Crate root.
	pub manifest_dir: PathBuf,
	/// Cargo output directory.
	pub out_dir: PathBuf,
	pipeline: Pipeline,
}

impl BuildCtx {
	/// Reads `CARGO_MANIFEST_DIR` and `OUT_DIR` and loads `qualia.toml`.
	///
	/// # Errors
	///
	/// [`GenError::Config`] if a variable is missing or the configuration is
	/// malformed.
	pub fn new() -> Result<Self> {
		let var = |name: &str| {
			std::env::var_os(name).map(PathBuf::from).ok_or_else(|| GenError::Config {
				path: PathBuf::from(name),
				message: "environment variable not set; run from a build script".into(),
			})
		};
		let manifest_dir = var("CARGO_MANIFEST_DIR")?;
		let out_dir = var("OUT_DIR")?;
		let config = PipelineConfig::load(&manifest_dir)?;
		Ok(Self::with_pipeline(manifest_dir, out_dir, Pipeline::new(config)))
	}

	/// Creates a context with explicit paths and pipeline.
	pub fn with_pipeline(manifest_dir: PathBuf, out_dir: PathBuf, pipeline: Pipeline) -> Self {
		Self {
			manifest_dir,
			out_dir,
			pipeline,
		}
	}

	/// Asks Cargo to rerun the build script when `path` changes.
	pub fn rerun_if_changed(&self, path: &Path) {
		println!("cargo:rerun-if-changed={}", path.display());
	}

	/// Catalogs every `#[qualify]` declaration under `root`.
	///
	/// Files are visited in path order. Failing models are reported in
	/// [`Catalog::diagnostics`] and as `cargo:warning=` lines; the scan goes
	/// on with the next declaration.
	///
	/// # Errors
	///
	/// [`GenError::Io`] if a file cannot be read.
	pub fn scan(&self, root: &Path) -> Result<Catalog> {
		self.rerun_if_changed(&self.manifest_dir.join(crate::config::CONFIG_FILE));
		let mut catalog = Catalog::default();
		for path in collect_files_sorted(root, "rs") {
			self.rerun_if_changed(&path);
			let source = fs::read_to_string(&path).map_err(|error| GenError::Io {
				path: path.clone(),
				error,
			})?;
			let label = path.strip_prefix(root).unwrap_or(&path).display().to_string();
			catalog_source(&self.pipeline, &label, &source, &mut catalog);
		}
		for line in &catalog.diagnostics {
			println!("cargo:warning={line}");
		}
		tracing::debug!(
			domain = "compile",
			root = %root.display(),
			models = catalog.models.len(),
			"catalog built",
		);
		Ok(catalog)
	}

	/// Writes `catalog` as pretty JSON into `OUT_DIR`.
	///
	/// # Errors
	///
	/// [`GenError::Io`] if the file cannot be written.
	pub fn write_catalog(&self, filename: &str, catalog: &Catalog) -> Result<PathBuf> {
		let path = self.out_dir.join(filename);
		let io = |error| GenError::Io {
			path: path.clone(),
			error,
		};
		let json = serde_json::to_string_pretty(catalog).map_err(|e| io(e.into()))?;
		fs::write(&path, json).map_err(io)?;
		Ok(path)
	}
}

/// Collects files with extension `ext` under `root`, sorted by path.
pub fn collect_files_sorted(root: &Path, ext: &str) -> Vec<PathBuf> {
	let mut paths: Vec<PathBuf> = WalkDir::new(root)
		.into_iter()
		.filter_map(|e| e.ok())
		.filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == ext))
		.map(|e| e.into_path())
		.collect();
	paths.sort();
	paths
}

/// Catalogs the declarations of one source file.
pub fn catalog_source(pipeline: &Pipeline, label: &str, source: &str, catalog: &mut Catalog) {
	let file = match syn::parse_file(source) {
		Ok(file) => file,
		Err(e) => {
			catalog.diagnostics.push(format!("{label}: cannot parse: {e}"));
			return;
		}
	};
	visit_items(pipeline, label, &file.items, catalog);
}

fn visit_items(pipeline: &Pipeline, label: &str, items: &[syn::Item], catalog: &mut Catalog) {
	for item in items {
		let attrs = match item {
			syn::Item::Impl(imp) => &imp.attrs,
			syn::Item::Mod(m) => &m.attrs,
			_ => continue,
		};
		match attrs.iter().find(|a| is_qualify(a)) {
			Some(attr) => catalog_item(pipeline, label, attr, item, catalog),
			None => {
				if let syn::Item::Mod(syn::ItemMod {
					content: Some((_, inner)), ..
				}) = item
				{
					visit_items(pipeline, label, inner, catalog);
				}
			}
		}
	}
}

fn is_qualify(attr: &syn::Attribute) -> bool {
	attr.path().segments.last().is_some_and(|s| s.ident == TAG)
}

fn catalog_item(pipeline: &Pipeline, label: &str, attr: &syn::Attribute, item: &syn::Item, catalog: &mut Catalog) {
	let tokens = match &attr.meta {
		syn::Meta::List(list) => list.tokens.clone(),
		_ => proc_macro2::TokenStream::new(),
	};
	let args = match MacroArgs::parse(tokens) {
		Ok(args) => args,
		Err(e) => {
			catalog.diagnostics.push(format!("{label}: {e}"));
			return;
		}
	};
	let decl = match ModelDecl::parse(args, item.clone()) {
		Ok((decl, _)) => decl,
		Err(d) => {
			catalog.diagnostics.push(format!("{label}: {}", d.error));
			return;
		}
	};
	match pipeline.run(&decl, Mode::Catalog) {
		Ok(output) => {
			catalog
				.diagnostics
				.extend(output.diagnostics.iter().map(|d| format!("{label}: {}", d.error)));
			catalog.models.push(catalog_model(label, &output));
		}
		Err(failure) => catalog.diagnostics.push(format!("{label}: {}", failure.into_error())),
	}
}

fn catalog_model(label: &str, output: &ModelOutput) -> CatalogModel {
	CatalogModel {
		name: output.model_name.clone(),
		module: output.module.to_string(),
		form: match output.form {
			DeclForm::Inherent => "inherent".into(),
			DeclForm::Category { .. } => "category".into(),
		},
		source: label.to_string(),
		metadata: metadata_json(&output.bean),
		properties: output
			.properties
			.iter()
			.map(|p| {
				let d = &p.descriptor;
				CatalogProperty {
					name: d.name.clone(),
					type_name: d.type_name.clone(),
					getter: d.getter.as_ref().map(|a| a.method.to_string()),
					setter: d.setter.as_ref().map(|a| a.method.to_string()),
					navigator: d.navigator.as_ref().map(|a| a.method.to_string()),
					metadata: metadata_json(&p.metadata),
				}
			})
			.collect(),
	}
}

fn metadata_json(store: &MutableStore) -> BTreeMap<String, Value> {
	store
		.entries()
		.into_iter()
		.filter_map(|(id, value)| match id {
			KeyId::Named(name) => Some((name.into_owned(), value_json(&value)?)),
			KeyId::Anonymous(_) => None,
		})
		.collect()
}

fn value_json(value: &MetaValue) -> Option<Value> {
	Some(match value {
		MetaValue::Bool(b) => json!(b),
		MetaValue::Int(i) => json!(i),
		MetaValue::Float(f) => json!(f),
		MetaValue::Str(s) => json!(s),
		MetaValue::List(items) => Value::Array(items.iter().map(value_json).collect::<Option<_>>()?),
		MetaValue::Opaque(_) => {
			let lit = LiteralExpr::from_meta(value)?;
			json!({ "type": lit.ty, "expr": lit.expr })
		}
	})
}
