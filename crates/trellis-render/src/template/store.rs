//! Compiled template namespace and its cache.
//!
//! [`TemplateStore`] walks the root directory, parses every template file into
//! one MiniJinja environment and publishes it as an immutable [`Namespace`].
//!
//! # Compile passes are all-or-nothing
//!
//! A pass builds a fresh environment off to the side. Only when every file has
//! been read and parsed is the new namespace swapped in. The first unreadable
//! file or syntax error discards the pass and the previous namespace (if any)
//! keeps serving.
//!
//! # Cached vs. reload mode
//!
//! | Mode | `get_or_compile` |
//! |------|------------------|
//! | reload off | compiles on first use, then returns the cached namespace forever |
//! | reload on | compiles on every call |
//!
//! # Locking
//!
//! The namespace pointer sits behind an `RwLock`; readers hold it only long
//! enough to clone the `Arc`. Compile passes serialize on a separate mutex and
//! run without holding the namespace lock, so renders keep using the previous
//! namespace while a rebuild reads the disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, Value};

use super::loader::walk_template_dir;
use crate::config::EngineConfig;
use crate::error::{CompileError, ConfigError, RenderError};
use crate::functions::FunctionRegistry;

/// One successfully compiled set of templates.
pub struct Namespace {
    env: Environment<'static>,
    names: BTreeSet<String>,
    generation: u64,
}

impl Namespace {
    /// Position of this namespace in the sequence of published compiles,
    /// starting at 1. Zero for a pass from [`TemplateStore::compile`] that was
    /// never published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The underlying MiniJinja environment.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Executes a template by name against a prepared context.
    pub fn render(&self, name: &str, ctx: &Value) -> Result<String, RenderError> {
        if !self.contains(name) {
            return Err(RenderError::TemplateNotFound(name.to_string()));
        }
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(ctx)?)
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("generation", &self.generation)
            .field("names", &self.names)
            .finish()
    }
}

/// Loads, compiles and caches the template namespace.
pub struct TemplateStore {
    root: PathBuf,
    extension: String,
    syntax: SyntaxConfig,
    reload: bool,
    functions: RwLock<FunctionRegistry>,
    namespace: RwLock<Option<Arc<Namespace>>>,
    compile_lock: Mutex<()>,
    generation: AtomicU64,
}

impl TemplateStore {
    /// Configures a store. Pure: the directory is not touched until the
    /// first compile.
    pub fn new(config: &EngineConfig, functions: FunctionRegistry) -> Result<Self, ConfigError> {
        Ok(Self {
            root: config.directory.clone(),
            extension: config.normalized_extension(),
            syntax: config.delimiters.syntax()?,
            reload: config.reload,
            functions: RwLock::new(functions),
            namespace: RwLock::new(None),
            compile_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The template extension, with its leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn reload(&self) -> bool {
        self.reload
    }

    /// Mutable access to the function table. Changes apply to later compiles.
    pub fn with_functions<R>(&self, f: impl FnOnce(&mut FunctionRegistry) -> R) -> R {
        let mut functions = self
            .functions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut functions)
    }

    /// The currently published namespace, if any compile has succeeded.
    pub fn current(&self) -> Option<Arc<Namespace>> {
        self.namespace
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs one compile pass without publishing it.
    ///
    /// Every template is HTML-escaped, whatever its extension.
    pub fn compile(&self) -> Result<Namespace, CompileError> {
        let files = walk_template_dir(&self.root, &self.extension)?;

        let mut env = Environment::new();
        env.set_syntax(self.syntax.clone());
        env.set_auto_escape_callback(|_name: &str| AutoEscape::Html);
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .install(&mut env);

        let mut names = BTreeSet::new();
        for file in files {
            let source = file.read()?;
            env.add_template_owned(file.name.clone(), source)
                .map_err(|e| CompileError::Syntax {
                    name: file.name.clone(),
                    message: e.to_string(),
                })?;
            names.insert(file.name);
        }

        Ok(Namespace {
            env,
            names,
            generation: 0,
        })
    }

    /// Returns the namespace, compiling according to the reload mode.
    ///
    /// A failed pass is logged and the previous namespace returned. The error
    /// only reaches the caller when nothing has ever compiled.
    pub fn get_or_compile(&self) -> Result<Arc<Namespace>, CompileError> {
        if !self.reload {
            if let Some(namespace) = self.current() {
                return Ok(namespace);
            }
        }

        let _guard = self
            .compile_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another thread may have finished the first compile while we waited.
        if !self.reload {
            if let Some(namespace) = self.current() {
                return Ok(namespace);
            }
        }

        match self.compile_and_publish() {
            Ok(namespace) => Ok(namespace),
            Err(err) => match self.current() {
                Some(previous) => {
                    tracing::error!(
                        root = %self.root.display(),
                        generation = previous.generation(),
                        error = %err,
                        "template compile failed, keeping previous namespace"
                    );
                    Ok(previous)
                }
                None => {
                    tracing::error!(
                        root = %self.root.display(),
                        error = %err,
                        "template compile failed"
                    );
                    Err(err)
                }
            },
        }
    }

    /// Forces a compile pass regardless of the reload mode.
    ///
    /// On failure the previous namespace stays published and the error is
    /// returned.
    pub fn refresh(&self) -> Result<Arc<Namespace>, CompileError> {
        let _guard = self
            .compile_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.compile_and_publish()
    }

    /// Callers must hold `compile_lock`.
    fn compile_and_publish(&self) -> Result<Arc<Namespace>, CompileError> {
        let mut namespace = self.compile()?;
        namespace.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let namespace = Arc::new(namespace);
        tracing::debug!(
            root = %self.root.display(),
            templates = namespace.len(),
            generation = namespace.generation(),
            "compiled templates"
        );
        *self
            .namespace
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&namespace));
        Ok(namespace)
    }
}

impl std::fmt::Debug for TemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateStore")
            .field("root", &self.root)
            .field("extension", &self.extension)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}
