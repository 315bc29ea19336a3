//! Pipeline configuration.
//!
//! Read from `qualia.toml` in the crate root when present:
//!
//! ```toml
//! module_suffix = "_meta"
//! reserved_words = ["id"]
//!
//! [conventions]
//! getter_prefixes = ["get_"]
//! bare_getters = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// File name looked up in the crate root.
pub const CONFIG_FILE: &str = "qualia.toml";

/// Accessor naming conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Conventions {
	/// Prefixes stripped from getter names.
	pub getter_prefixes: Vec<String>,
	/// Prefixes stripped from getters returning `bool`.
	pub boolean_prefixes: Vec<String>,
	/// Prefixes marking setters.
	pub setter_prefixes: Vec<String>,
	/// Suffix marking mutable accessors.
	pub navigator_suffix: String,
	/// Whether unprefixed `&self` methods are getters.
	pub bare_getters: bool,
	/// Whether only `pub` methods are candidates.
	pub public_only: bool,
}

impl Default for Conventions {
	fn default() -> Self {
		Self {
			getter_prefixes: vec!["get_".into()],
			boolean_prefixes: vec!["is_".into(), "has_".into()],
			setter_prefixes: vec!["set_".into()],
			navigator_suffix: "_mut".into(),
			bare_getters: true,
			public_only: true,
		}
	}
}

/// Configuration of the discovery and emission pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
	/// Accessor naming conventions.
	pub conventions: Conventions,
	/// Extra property names that are skipped like keywords.
	pub reserved_words: Vec<String>,
	/// Suffix of the generated module (`person` + suffix).
	pub module_suffix: String,
	/// Path of the runtime crate as seen from generated code.
	pub crate_path: String,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			conventions: Conventions::default(),
			reserved_words: Vec::new(),
			module_suffix: "_qualifier".into(),
			crate_path: "::qualia".into(),
		}
	}
}

impl PipelineConfig {
	/// Parses a TOML document; `origin` only labels errors.
	///
	/// # Errors
	///
	/// [`GenError::Config`] on malformed TOML or unknown fields.
	pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
		let config: Self = toml::from_str(content).map_err(|e| GenError::Config {
			path: origin.to_path_buf(),
			message: e.to_string(),
		})?;
		config.validate(origin)?;
		Ok(config)
	}

	/// Loads [`CONFIG_FILE`] from `dir`, or the defaults when it does not exist.
	///
	/// # Errors
	///
	/// [`GenError::Io`] if the file exists but cannot be read,
	/// [`GenError::Config`] if it is malformed.
	pub fn load(dir: &Path) -> Result<Self> {
		let path = dir.join(CONFIG_FILE);
		if !path.is_file() {
			return Ok(Self::default());
		}
		let content = std::fs::read_to_string(&path).map_err(|error| GenError::Io {
			path: path.clone(),
			error,
		})?;
		let config = Self::from_toml_str(&content, &path)?;
		tracing::debug!(domain = "config", path = %path.display(), "pipeline configuration loaded");
		Ok(config)
	}

	fn validate(&self, origin: &Path) -> Result<()> {
		let invalid = |message: String| GenError::Config {
			path: origin.to_path_buf(),
			message,
		};
		if self.conventions.navigator_suffix.is_empty() {
			return Err(invalid("`conventions.navigator_suffix` must not be empty".into()));
		}
		if self.module_suffix.is_empty() {
			return Err(invalid("`module_suffix` must not be empty".into()));
		}
		if syn::parse_str::<syn::Path>(&self.crate_path).is_err() {
			return Err(invalid(format!("`crate_path` is not a path: `{}`", self.crate_path)));
		}
		let c = &self.conventions;
		if let Some(empty) = [&c.getter_prefixes, &c.boolean_prefixes, &c.setter_prefixes]
			.into_iter()
			.flatten()
			.find(|p| p.is_empty())
		{
			return Err(invalid(format!("empty accessor prefix `{empty}`")));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn missing_file_yields_defaults() {
		let dir = tempfile::tempdir().unwrap();
		assert_eq!(PipelineConfig::load(dir.path()).unwrap(), PipelineConfig::default());
	}

	#[test]
	fn partial_file_keeps_other_defaults() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join(CONFIG_FILE),
			"module_suffix = \"_meta\"\n[conventions]\nbare_getters = false\n",
		)
		.unwrap();

		let config = PipelineConfig::load(dir.path()).unwrap();
		assert_eq!(config.module_suffix, "_meta");
		assert!(!config.conventions.bare_getters);
		assert_eq!(config.conventions.getter_prefixes, vec!["get_".to_string()]);
		assert_eq!(config.crate_path, "::qualia");
	}

	#[test]
	fn unknown_fields_are_rejected() {
		let err = PipelineConfig::from_toml_str("[conventions]\nprefix = 1\n", &PathBuf::from("q.toml")).unwrap_err();
		assert!(matches!(err, GenError::Config { .. }), "{err}");
	}

	#[test]
	fn invalid_values_are_rejected() {
		let origin = PathBuf::from("q.toml");
		for doc in [
			"crate_path = \"not a path\"",
			"module_suffix = \"\"",
			"[conventions]\nsetter_prefixes = [\"\"]",
		] {
			let err = PipelineConfig::from_toml_str(doc, &origin).unwrap_err();
			assert!(matches!(err, GenError::Config { .. }), "{doc}: {err}");
		}
	}
}
