//! Runtime error types.

use thiserror::Error;

/// Errors raised by metadata lookups and qualifier operations.
///
/// These are programmer-error signals: nothing in this crate recovers from
/// them, they are handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualifierError {
	/// A required metadata key is absent from the whole override chain.
	#[error("missing required metadata `{key}`")]
	MissingMetadata {
		/// Name of the missing key (`<anonymous>` for anonymous keys).
		key: String,
	},

	/// A read or write was attempted on a property lacking that capability.
	#[error("property `{path}` is {capability}")]
	Unsupported {
		/// Path of the property.
		path: String,
		/// The missing capability, e.g. `not readable`.
		capability: &'static str,
	},

	/// A name was requested from an anonymous key.
	#[error("anonymous extension key has no name")]
	AnonymousKey,

	/// A composed write reached a null intermediate value.
	///
	/// `path` is the full path of the outermost composition, so every grouping
	/// of the same chain reports the same error.
	#[error("cannot write `{path}` through a null intermediate")]
	NullIntermediate {
		/// Full path of the composed property being written.
		path: String,
	},

	/// A stored value does not have the kind the typed key expects.
	#[error("metadata `{key}` holds {found}, expected {expected}")]
	TypeMismatch {
		/// Name of the key.
		key: String,
		/// Label of the type the key expects.
		expected: String,
		/// Label of the value actually stored.
		found: String,
	},

	/// A property path was empty or had an empty segment.
	#[error("invalid property path `{0}`")]
	InvalidPath(String),
}

impl QualifierError {
	pub(crate) fn not_readable(path: &str) -> Self {
		Self::Unsupported {
			path: path.to_string(),
			capability: "not readable",
		}
	}

	/// Re-roots a null-intermediate error raised by an inner composition
	/// under `outer`. Other errors pass through.
	pub(crate) fn under(self, outer: &str) -> Self {
		match self {
			Self::NullIntermediate { path } => Self::NullIntermediate {
				path: crate::qualifier::join_path(outer, &path),
			},
			other => other,
		}
	}

	pub(crate) fn not_settable(path: &str) -> Self {
		Self::Unsupported {
			path: path.to_string(),
			capability: "not settable",
		}
	}
}

/// Result alias for qualifier operations.
pub type Result<T> = std::result::Result<T, QualifierError>;
