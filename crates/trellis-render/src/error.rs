//! Error types for template compilation, configuration and rendering.
//!
//! [`RenderError`] is what request-time rendering returns. Compile passes fail
//! with [`CompileError`], setup fails with [`ConfigError`], and function
//! registration fails with [`FunctionError`]. MiniJinja errors are mapped into
//! [`RenderError`] by kind so callers never have to match on engine internals.

use std::path::PathBuf;

use thiserror::Error;

/// A compile pass over the template directory failed.
///
/// The whole pass is discarded when this is returned; a previously compiled
/// namespace stays in place.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The root directory (or something below it) could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template file could not be parsed.
    #[error("failed to parse template \"{name}\": {message}")]
    Syntax { name: String, message: String },
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("template directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("template extension must not be empty")]
    EmptyExtension,

    #[error("invalid delimiters {left:?} / {right:?}: {message}")]
    Delimiters {
        left: String,
        right: String,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Function(#[from] FunctionError),
}

/// A user function could not be registered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FunctionError {
    #[error("\"{0}\" is a reserved placeholder function")]
    Reserved(String),

    #[error("\"{0}\" is not a valid template identifier")]
    InvalidName(String),

    #[error("function \"{name}\": parameter {index} cannot have type none")]
    NoneParameter { name: String, index: usize },
}

/// Error type for rendering a view or layout.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A view or layout name is absent from the compiled namespace.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Nothing has ever compiled successfully, so there is nothing to render.
    #[error("no compiled templates available: {0}")]
    Compile(#[from] CompileError),

    /// Template execution failed (undefined function, type error, ...).
    #[error("template error: {0}")]
    TemplateError(String),

    /// The render data could not be converted into template values.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Other operational error raised by the engine.
    #[error("{0}")]
    OperationError(String),
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::SerializationError(err.to_string())
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        match err.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(err.to_string()),
            ErrorKind::SyntaxError
            | ErrorKind::BadEscape
            | ErrorKind::UndefinedError
            | ErrorKind::UnknownTest
            | ErrorKind::UnknownFunction
            | ErrorKind::UnknownFilter
            | ErrorKind::UnknownMethod
            | ErrorKind::InvalidOperation
            | ErrorKind::MissingArgument
            | ErrorKind::TooManyArguments => RenderError::TemplateError(format_chain(&err)),
            ErrorKind::BadSerialization => RenderError::SerializationError(err.to_string()),
            _ => RenderError::OperationError(format_chain(&err)),
        }
    }
}

/// Flattens a MiniJinja error and its causes into one line.
///
/// Errors raised inside `content()` or `section()` arrive wrapped in the
/// outer layout's error, and the interesting part is usually the innermost.
fn format_chain(err: &minijinja::Error) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
