//! Engine configuration.
//!
//! [`EngineConfig`] holds everything the engine needs before it serves
//! traffic: where templates live, which extension marks a template file, the
//! variable delimiters, the default layout and whether templates are
//! recompiled on every render.
//!
//! Configuration is plain data. Nothing here touches the filesystem; the
//! root directory is only checked when an [`Engine`](crate::Engine) is built.
//!
//! # YAML
//!
//! ```rust
//! use trellis_render::EngineConfig;
//!
//! let config = EngineConfig::from_yaml(r#"
//! directory: ./views
//! extension: .html
//! default_layout: layouts/base.html
//! reload: true
//! delimiters:
//!   left: "[["
//!   right: "]]"
//! "#).unwrap();
//!
//! assert!(config.reload);
//! assert_eq!(config.delimiters.left, "[[");
//! ```

use std::path::PathBuf;

use minijinja::syntax::SyntaxConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default left variable delimiter.
pub const DEFAULT_LEFT_DELIMITER: &str = "{{";

/// Default right variable delimiter.
pub const DEFAULT_RIGHT_DELIMITER: &str = "}}";

/// Variable delimiters used when parsing templates.
///
/// These wrap expressions (`{{ title }}`). Block tags (`{% if %}`) and
/// comments (`{# #}`) keep the engine defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Delimiters {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Builds the MiniJinja syntax configuration for these delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Delimiters`] when a delimiter is empty or the
    /// combination clashes with the block or comment delimiters.
    pub fn syntax(&self) -> Result<SyntaxConfig, ConfigError> {
        let invalid = |message: String| ConfigError::Delimiters {
            left: self.left.clone(),
            right: self.right.clone(),
            message,
        };

        if self.left.is_empty() || self.right.is_empty() {
            return Err(invalid("delimiters must not be empty".into()));
        }

        SyntaxConfig::builder()
            .variable_delimiters(self.left.clone(), self.right.clone())
            .build()
            .map_err(|e| invalid(e.to_string()))
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER)
    }
}

/// Setup-time configuration for an [`Engine`](crate::Engine).
///
/// Defaults: no reload, `{{`/`}}` delimiters, no default layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory walked for template files.
    pub directory: PathBuf,

    /// Extension marking template files, with or without the leading dot.
    pub extension: String,

    #[serde(default)]
    pub delimiters: Delimiters,

    /// Layout applied when a request does not choose one. Empty means none.
    #[serde(default)]
    pub default_layout: String,

    /// Recompile the whole namespace on every render.
    #[serde(default)]
    pub reload: bool,
}

impl EngineConfig {
    /// Creates a configuration with defaults for everything but the
    /// directory and extension.
    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
            delimiters: Delimiters::default(),
            default_layout: String::new(),
            reload: false,
        }
    }

    /// Parses a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Sets the variable delimiters.
    pub fn delimiters(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.delimiters = Delimiters::new(left, right);
        self
    }

    /// Sets the layout used when a request does not pick one.
    pub fn default_layout(mut self, name: impl Into<String>) -> Self {
        self.default_layout = name.into();
        self
    }

    /// Enables or disables recompiling on every render.
    pub fn reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    /// The extension with a guaranteed leading dot (`"html"` becomes `".html"`).
    pub fn normalized_extension(&self) -> String {
        normalize_extension(&self.extension)
    }

    /// Checks everything that can be checked without compiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        if !self.directory.exists() {
            return Err(ConfigError::MissingDirectory(self.directory.clone()));
        }
        if !self.directory.is_dir() {
            return Err(ConfigError::NotADirectory(self.directory.clone()));
        }
        self.delimiters.syntax()?;
        Ok(())
    }
}

pub(crate) fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    }
}
