//! Error types for discovery and code generation.

use std::fmt;
use std::path::PathBuf;

use proc_macro2::Span;
use thiserror::Error;

/// Errors raised while generating qualifiers.
#[derive(Debug, Error)]
pub enum GenError {
	/// Two accessors of the same kind derive the same property name.
	#[error("`{model}.{property}`: duplicate {kind} `{second}` (already bound to `{first}`)")]
	DuplicateAccessor {
		/// Model type.
		model: String,
		/// Derived property name.
		property: String,
		/// Accessor kind (`getter`, `setter`, `navigator`).
		kind: &'static str,
		/// Method bound first.
		first: String,
		/// Offending method.
		second: String,
	},

	/// A derived property name is a keyword or configured reserved word.
	#[error("`{model}`: property name `{property}` derived from `{method}` is reserved; skipped")]
	ReservedName {
		/// Model type.
		model: String,
		/// Derived property name.
		property: String,
		/// Method the name was derived from.
		method: String,
	},

	/// A processor failed or panicked on one property.
	#[error("`{model}.{property}`: processor `{processor}` failed: {message}")]
	ProcessorFailure {
		/// Model type.
		model: String,
		/// Property the processor ran on.
		property: String,
		/// Processor id.
		processor: String,
		/// Failure message or panic payload.
		message: String,
	},

	/// Structural failure of a whole model type.
	#[error("cannot generate qualifiers for `{model}`: {}", Causes(.causes))]
	TypeGenerationFailure {
		/// Model type.
		model: String,
		/// Every cause, in discovery order.
		causes: Vec<GenError>,
	},

	/// Getter, setter and navigator of one property disagree on its type.
	#[error("`{model}.{property}`: `{method}` uses `{found}`, expected `{expected}`")]
	AccessorTypeMismatch {
		/// Model type.
		model: String,
		/// Property name.
		property: String,
		/// Offending method.
		method: String,
		/// Type established by the first accessor.
		expected: String,
		/// Type of the offending accessor.
		found: String,
	},

	/// Two properties, or a property and a fixed generated item, map to the
	/// same identifier in the generated module.
	#[error("`{model}.{property}`: generated item `{ident}` collides with {other}")]
	IdentifierCollision {
		/// Model type.
		model: String,
		/// Property whose item collides.
		property: String,
		/// Colliding identifier.
		ident: String,
		/// What already owns the identifier.
		other: String,
	},

	/// The annotated item or its arguments cannot describe a model.
	#[error("`{model}`: {message}")]
	InvalidDeclaration {
		/// Model type, or the item being parsed.
		model: String,
		/// What is wrong.
		message: String,
	},

	/// Malformed pipeline configuration.
	#[error("invalid configuration {}: {message}", .path.display())]
	Config {
		/// Configuration file.
		path: PathBuf,
		/// Parser message.
		message: String,
	},

	/// I/O failure while reading sources or writing outputs.
	#[error("I/O error on {}: {error}", .path.display())]
	Io {
		/// File involved.
		path: PathBuf,
		/// Underlying error.
		#[source]
		error: std::io::Error,
	},
}

struct Causes<'a>(&'a [GenError]);

impl fmt::Display for Causes<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, cause) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str("; ")?;
			}
			write!(f, "{cause}")?;
		}
		Ok(())
	}
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, GenError>;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
	/// Reported, generation continues.
	Warning,
	/// Fails the model.
	Error,
}

/// A [`GenError`] located in the source.
#[derive(Debug)]
pub struct Diagnostic {
	/// Severity.
	pub level: Level,
	/// Offending tokens.
	pub span: Span,
	/// What went wrong.
	pub error: GenError,
}

impl Diagnostic {
	/// Creates a warning.
	pub fn warning(span: Span, error: GenError) -> Self {
		Self {
			level: Level::Warning,
			span,
			error,
		}
	}

	/// Creates an error.
	pub fn error(span: Span, error: GenError) -> Self {
		Self {
			level: Level::Error,
			span,
			error,
		}
	}
}

/// Structural failure of one model, with every located cause.
#[derive(Debug)]
pub struct Failure {
	/// Model type.
	pub model: String,
	/// Located causes.
	pub causes: Vec<Diagnostic>,
}

impl Failure {
	/// Collapses the causes into [`GenError::TypeGenerationFailure`].
	pub fn into_error(self) -> GenError {
		GenError::TypeGenerationFailure {
			model: self.model,
			causes: self.causes.into_iter().map(|d| d.error).collect(),
		}
	}
}

/// Error returned by a [`Processor`](crate::Processor) callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProcessError(pub String);

impl ProcessError {
	/// Creates an error from a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}
