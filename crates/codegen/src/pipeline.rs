//! The discovery and processing pipeline.
//!
//! One run handles one model declaration: the `self` element is processed
//! first, then the discovered properties. Processor failures on a property
//! drop that property and are reported; failures that concern the model as a
//! whole abort it with every cause attached.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use heck::ToSnakeCase;
use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, format_ident};
use qualia_core::{MetadataStore, MutableStore};
use syn::{Ident, Type};

use crate::config::PipelineConfig;
use crate::descriptor::{self, PropertyDescriptor};
use crate::discovery;
use crate::error::{Diagnostic, Failure, GenError, Level};
use crate::model::{DeclForm, ModelDecl};
use crate::processor::{
	Element, ElementKind, Environment, LiteralExpr, Mode, ProcessResult, Processor, Processors, TypeBuilder,
};

/// A property that survived processing.
pub struct GeneratedProperty {
	/// Descriptor.
	pub descriptor: PropertyDescriptor,
	/// Metadata written by the processors.
	pub metadata: MutableStore,
}

/// Everything emission needs for one model.
pub struct ModelOutput {
	/// Model type.
	pub model: Type,
	/// Rendered model type.
	pub model_name: String,
	/// Declaration form.
	pub form: DeclForm,
	/// Generated module name.
	pub module: Ident,
	/// Runtime crate path.
	pub crate_path: syn::Path,
	/// Metadata of the `self` element.
	pub bean: MutableStore,
	/// Surviving properties, in declaration order.
	pub properties: Vec<GeneratedProperty>,
	/// Items contributed by processors.
	pub contributions: Vec<TokenStream>,
	/// Warnings and dropped-property reports.
	pub diagnostics: Vec<Diagnostic>,
}

/// Discovery and processing pipeline.
pub struct Pipeline {
	config: PipelineConfig,
	processors: Processors,
}

impl Pipeline {
	/// Creates a pipeline with the shipped processors.
	pub fn new(config: PipelineConfig) -> Self {
		Self::with_processors(config, Processors::default())
	}

	/// Creates a pipeline with an explicit processor set.
	pub fn with_processors(config: PipelineConfig, processors: Processors) -> Self {
		Self { config, processors }
	}

	/// Configuration in use.
	pub fn config(&self) -> &PipelineConfig {
		&self.config
	}

	/// Runs discovery and every processor over `decl`.
	///
	/// # Errors
	///
	/// A [`Failure`] when the model cannot be generated: duplicate accessors,
	/// accessor type mismatches, an invalid crate path, or a processor failing
	/// on the `self` element or in [`Processor::process_bean`].
	pub fn run(&self, decl: &ModelDecl, mode: Mode) -> Result<ModelOutput, Failure> {
		let model = decl.model_name.clone();
		let fail = |causes: Vec<Diagnostic>| Failure {
			model: model.clone(),
			causes,
		};

		let crate_path = match &decl.crate_path {
			Some(path) => path.clone(),
			None => syn::parse_str::<syn::Path>(&self.config.crate_path).map_err(|e| {
				fail(vec![Diagnostic::error(
					decl.span,
					GenError::InvalidDeclaration {
						model: model.clone(),
						message: format!("invalid crate path `{}`: {e}", self.config.crate_path),
					},
				)])
			})?,
		};
		let krate = crate_path.to_token_stream().to_string().replace(' ', "");
		let env = Environment {
			model: model.clone(),
			form: decl.form.clone(),
			crate_path: krate.clone(),
			mode,
		};
		let processors: Vec<&dyn Processor> =
			self.processors.ordered().into_iter().filter(|p| p.processable(&env)).collect();

		let generic_arguments = discovery::generic_arguments(&decl.model);
		let self_element = Element {
			kind: ElementKind::Type,
			property: "self",
			path: "",
			method: None,
			type_name: &decl.model_name,
			generic_arguments: &generic_arguments,
			tags: &decl.tags,
			crate_path: &krate,
			span: decl.span,
		};
		let mut bean = MetadataStore::builder();
		for p in &processors {
			if let Err(message) = guarded(|| annotate(*p, &self_element, &mut bean)) {
				return Err(fail(vec![processor_failure(&model, "self", p.id(), message, decl.span, Level::Error)]));
			}
		}

		let (descriptors, discovered) = descriptor::collect(decl, &self.config);
		let (errors, mut diagnostics): (Vec<_>, Vec<_>) =
			discovered.into_iter().partition(|d| d.level == Level::Error);
		if !errors.is_empty() {
			return Err(fail(errors));
		}

		let mut annotated = Vec::with_capacity(descriptors.len());
		'properties: for descriptor in descriptors {
			let mut metadata = MetadataStore::builder();
			for accessor in descriptor.accessors() {
				let element = Element {
					kind: ElementKind::Accessor(accessor.kind),
					property: &descriptor.name,
					path: &descriptor.name,
					method: Some(accessor.method.to_string()),
					type_name: &descriptor.type_name,
					generic_arguments: &descriptor.generic_arguments,
					tags: &accessor.tags,
					crate_path: &krate,
					span: accessor.span,
				};
				for p in &processors {
					tracing::debug!(
						domain = "pipeline",
						model = %model,
						property = %descriptor.name,
						processor = p.id(),
						"processing element",
					);
					if let Err(message) = guarded(|| annotate(*p, &element, &mut metadata)) {
						diagnostics.push(processor_failure(
							&model,
							&descriptor.name,
							p.id(),
							message,
							accessor.span,
							Level::Warning,
						));
						continue 'properties;
					}
				}
			}
			annotated.push(GeneratedProperty { descriptor, metadata });
		}

		let mut builder = TypeBuilder::new(crate_path.clone(), decl.model.clone());
		let mut properties = Vec::with_capacity(annotated.len());
		'contributions: for property in annotated {
			let mark = builder.len();
			for p in &processors {
				if let Err(message) = guarded(|| p.process_property(&mut builder, &property.descriptor)) {
					builder.truncate(mark);
					let span = property.descriptor.accessors().next().map_or(decl.span, |a| a.span);
					diagnostics.push(processor_failure(
						&model,
						&property.descriptor.name,
						p.id(),
						message,
						span,
						Level::Warning,
					));
					continue 'contributions;
				}
			}
			properties.push(property);
		}

		let descriptors: Vec<PropertyDescriptor> = properties.iter().map(|p| p.descriptor.clone()).collect();
		for p in &processors {
			if let Err(message) = guarded(|| p.process_bean(&mut builder, &model, &descriptors)) {
				return Err(fail(vec![processor_failure(&model, "self", p.id(), message, decl.span, Level::Error)]));
			}
		}

		for d in &diagnostics {
			tracing::warn!(domain = "pipeline", model = %model, "{}", d.error);
		}
		tracing::debug!(
			domain = "pipeline",
			model = %model,
			properties = properties.len(),
			dropped = diagnostics.len(),
			"model processed",
		);

		Ok(ModelOutput {
			module: decl.module.clone().unwrap_or_else(|| module_ident(&decl.model, &self.config.module_suffix)),
			model: decl.model.clone(),
			model_name: model.clone(),
			form: decl.form.clone(),
			crate_path,
			bean,
			properties,
			contributions: builder.into_items(),
			diagnostics,
		})
	}
}

/// Default generated module name: `PersonRecord` → `person_record_qualifier`.
fn module_ident(model: &Type, suffix: &str) -> Ident {
	let stem = match model {
		Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
		_ => None,
	}
	.unwrap_or_else(|| discovery::render_type(model));
	format_ident!("{}{}", stem.to_snake_case(), suffix)
}

fn processor_failure(model: &str, property: &str, processor: &str, message: String, span: Span, level: Level) -> Diagnostic {
	Diagnostic {
		level,
		span,
		error: GenError::ProcessorFailure {
			model: model.to_string(),
			property: property.to_string(),
			processor: processor.to_string(),
			message,
		},
	}
}

/// Runs `process_annotated` and rejects literal expressions that emission
/// could not render.
fn annotate(processor: &dyn Processor, element: &Element<'_>, store: &mut MutableStore) -> ProcessResult {
	processor.process_annotated(element, store)?;
	for (_, value) in store.entries() {
		if let Some(literal) = LiteralExpr::from_meta(&value) {
			literal.parse()?;
		}
	}
	Ok(())
}

/// Runs a processor callback, turning errors and panics into messages.
fn guarded(f: impl FnOnce() -> ProcessResult) -> Result<(), String> {
	match panic::catch_unwind(AssertUnwindSafe(f)) {
		Ok(Ok(())) => Ok(()),
		Ok(Err(e)) => Err(e.to_string()),
		Err(payload) => Err(panic_message(payload.as_ref())),
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		format!("panicked: {s}")
	} else if let Some(s) = payload.downcast_ref::<String>() {
		format!("panicked: {s}")
	} else {
		"panicked".to_string()
	}
}
