//! The engine instance a host creates once at setup.
//!
//! [`Engine`] ties together the [`TemplateStore`], the function table and the
//! [`LayoutRenderer`]. It is `Send + Sync`; share it behind an `Arc` or a
//! `&'static` and call it from any number of request threads.

use std::sync::Arc;

use minijinja::{Error, Value};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{CompileError, ConfigError, FunctionError, RenderError};
use crate::functions::{FunctionRegistry, Signature};
use crate::template::{LayoutRenderer, Namespace, TemplateStore};

/// Layout-aware template engine.
///
/// # Example
///
/// ```rust,ignore
/// use trellis_render::Engine;
///
/// let engine = Engine::builder("./views", ".html")
///     .default_layout("layouts/base.html")
///     .reload(cfg!(debug_assertions))
///     .build()?;
///
/// let page = engine.render("index.html", &data, "layouts/base.html")?;
/// ```
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: TemplateStore,
    layouts: LayoutRenderer,
}

impl Engine {
    /// Creates an engine from a complete configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the directory is missing, the extension is
    /// empty or the delimiters are unusable.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_functions(config, FunctionRegistry::new())
    }

    /// Creates an engine with a prepared function table.
    pub fn with_functions(
        config: EngineConfig,
        functions: FunctionRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = TemplateStore::new(&config, functions)?;
        let layouts = LayoutRenderer::new(store.extension());
        Ok(Self {
            config,
            store,
            layouts,
        })
    }

    /// Starts a builder for templates under `directory` ending in `extension`.
    pub fn builder(directory: impl Into<std::path::PathBuf>, extension: &str) -> EngineBuilder {
        EngineBuilder {
            config: EngineConfig::new(directory, extension),
            functions: FunctionRegistry::new(),
            error: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Layout used when a request doesn't choose one. Empty means none.
    pub fn default_layout(&self) -> &str {
        &self.config.default_layout
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Registers a typed function for templates.
    ///
    /// Only compiles that run after this call see the function: with reload
    /// off and a namespace already cached, call [`refresh`](Self::refresh).
    pub fn register_function<F>(
        &self,
        name: impl Into<String>,
        signature: Signature,
        func: F,
    ) -> Result<(), FunctionError>
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.store
            .with_functions(|functions| functions.register(name, signature, func))
    }

    /// The current namespace, compiling according to the reload mode.
    pub fn namespace(&self) -> Result<Arc<Namespace>, RenderError> {
        Ok(self.store.get_or_compile()?)
    }

    /// Recompiles now, regardless of the reload mode.
    pub fn refresh(&self) -> Result<Arc<Namespace>, CompileError> {
        self.store.refresh()
    }

    /// Renders `view` inside `layout`. An empty layout renders the view alone.
    pub fn render<T: Serialize + ?Sized>(
        &self,
        view: &str,
        data: &T,
        layout: &str,
    ) -> Result<String, RenderError> {
        let data = serde_json::to_value(data)?;
        let namespace = self.namespace()?;
        self.layouts.render(&namespace, view, &data, layout)
    }

    /// Renders `name` with the default layout.
    pub fn instance<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        self.render(name, data, self.default_layout())
    }
}

/// Fluent setup for an [`Engine`].
///
/// Function registration errors are held until [`build`](Self::build) so the
/// chain stays unbroken.
pub struct EngineBuilder {
    config: EngineConfig,
    functions: FunctionRegistry,
    error: Option<FunctionError>,
}

impl EngineBuilder {
    pub fn delimiters(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.config = self.config.delimiters(left, right);
        self
    }

    pub fn default_layout(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.default_layout(name);
        self
    }

    pub fn reload(mut self, reload: bool) -> Self {
        self.config = self.config.reload(reload);
        self
    }

    pub fn function<F>(mut self, name: impl Into<String>, signature: Signature, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        if self.error.is_none() {
            if let Err(err) = self.functions.register(name, signature, func) {
                self.error = Some(err);
            }
        }
        self
    }

    pub fn build(self) -> Result<Engine, ConfigError> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        Engine::with_functions(self.config, self.functions)
    }
}
