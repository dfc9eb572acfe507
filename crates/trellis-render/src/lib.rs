//! # Trellis Render - Layouts, Views and Sections for HTML Templates
//!
//! `trellis-render` compiles a directory of HTML templates into one namespace
//! and renders a view either on its own or wrapped in a layout.
//!
//! ## Core Concepts
//!
//! - [`Engine`]: the instance a host creates once at setup and shares
//! - [`TemplateStore`]: walks the directory and compiles every template file,
//!   once (cached) or on every render (reload mode)
//! - [`FunctionRegistry`]: typed user functions plus the reserved
//!   `content`/`section`/`render` placeholders
//! - [`LayoutRenderer`]: binds the placeholders to the requested view for one
//!   render and executes the layout
//!
//! Templates are named by their slash-separated path relative to the root,
//! extension included: `views/user/list.html` is `"user/list.html"`.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use trellis_render::Engine;
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::create_dir_all(dir.path().join("layouts")).unwrap();
//! std::fs::write(dir.path().join("index.html"), "<p>{{ title }}</p>").unwrap();
//! std::fs::write(
//!     dir.path().join("layouts/base.html"),
//!     "<html>{{ content() }}</html>",
//! ).unwrap();
//!
//! let engine = Engine::builder(dir.path(), ".html").build().unwrap();
//!
//! let page = engine
//!     .render("index.html", &json!({ "title": "Hi" }), "layouts/base.html")
//!     .unwrap();
//! assert_eq!(page, "<html><p>Hi</p></html>");
//!
//! // An empty layout renders the view alone.
//! let bare = engine.render("index.html", &json!({ "title": "Hi" }), "").unwrap();
//! assert_eq!(bare, "<p>Hi</p>");
//! ```
//!
//! ## Sections
//!
//! `section("footer")` called from the layout (or the view) of `index.html`
//! renders `index-footer.html` if it exists and nothing otherwise.
//!
//! ## Reload
//!
//! With reload on, every render recompiles the directory so edits show up
//! immediately. With reload off, the first render compiles and the result is
//! cached until [`Engine::refresh`]. A failed compile never replaces a good
//! namespace.

mod config;
mod engine;
mod error;
pub mod functions;
pub mod template;

pub use config::{Delimiters, EngineConfig, DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER};
pub use engine::{Engine, EngineBuilder};
pub use error::{CompileError, ConfigError, FunctionError, RenderError};
pub use functions::{
    is_reserved, FunctionRegistry, RegisteredFunction, Signature, ValueType, RESERVED_FUNCTIONS,
};
pub use template::{
    normalize_name, walk_template_dir, LayoutRenderer, Namespace, TemplateFile, TemplateStore,
    SECTION_SEPARATOR,
};

// Re-exported so hosts can write template functions without a direct dependency.
pub use minijinja::{Error as TemplateError, Value};
