//! Template function registry.
//!
//! Two layers of functions are visible to templates:
//!
//! 1. Reserved placeholders ([`RESERVED_FUNCTIONS`]): `content`, `section` and
//!    `render`. They always exist and produce empty output, so a view that
//!    calls them still renders when no layout is active. During a layout
//!    render they are shadowed per render by
//!    [`LayoutRenderer`](crate::template::LayoutRenderer), never globally.
//! 2. User functions, registered with a declared [`Signature`]. Every call is
//!    checked against the declared parameter types and the result against the
//!    declared return type.
//!
//! The registry is copied into the template environment when a compile pass
//! runs, so a function registered after the namespace was cached stays
//! invisible until the next compile.
//!
//! # Example
//!
//! ```rust
//! use minijinja::Value;
//! use trellis_render::{FunctionRegistry, Signature, ValueType};
//!
//! let mut registry = FunctionRegistry::new();
//! registry
//!     .register(
//!         "shout",
//!         Signature::new([ValueType::String], ValueType::String),
//!         |args: &[Value]| Ok(Value::from(args[0].to_string().to_uppercase())),
//!     )
//!     .unwrap();
//!
//! assert!(registry.contains("shout"));
//! assert!(registry.register("content", Signature::new([], ValueType::String), |_: &[Value]| Ok(Value::from(""))).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use minijinja::value::{Rest, Value, ValueKind};
use minijinja::{Environment, Error, ErrorKind};
use serde::{Deserialize, Serialize};

use crate::error::FunctionError;

/// Placeholder names a layout uses to pull in view output.
pub const RESERVED_FUNCTIONS: &[&str] = &["content", "section", "render"];

/// The callable behind a user function.
pub type TemplateFn = dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync;

/// Value types a function signature can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Accepts anything.
    Any,
    String,
    Number,
    Bool,
    Seq,
    Map,
    /// No value. Only valid as a return type.
    None,
}

impl ValueType {
    /// Whether `value` satisfies this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ValueType::Any => true,
            ValueType::String => value.kind() == ValueKind::String,
            ValueType::Number => value.kind() == ValueKind::Number,
            ValueType::Bool => value.kind() == ValueKind::Bool,
            ValueType::Seq => value.kind() == ValueKind::Seq,
            ValueType::Map => value.kind() == ValueKind::Map,
            ValueType::None => value.is_none() || value.is_undefined(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Bool => "bool",
            ValueType::Seq => "seq",
            ValueType::Map => "map",
            ValueType::None => "none",
        };
        f.write_str(name)
    }
}

/// Declared parameter and return types of a user function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<ValueType>,
    pub returns: ValueType,
}

impl Signature {
    pub fn new(params: impl IntoIterator<Item = ValueType>, returns: ValueType) -> Self {
        Self {
            params: params.into_iter().collect(),
            returns,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        write!(f, "({}) -> {}", params.join(", "), self.returns)
    }
}

/// A validated, typed user function.
#[derive(Clone)]
pub struct RegisteredFunction {
    name: String,
    signature: Signature,
    func: Arc<TemplateFn>,
}

impl RegisteredFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Calls the function, checking arguments and result against the signature.
    pub fn call(&self, args: &[Value]) -> Result<Value, Error> {
        let expected = self.signature.params.len();
        if args.len() > expected {
            return Err(Error::new(
                ErrorKind::TooManyArguments,
                format!(
                    "{}{} takes {} argument(s), got {}",
                    self.name,
                    self.signature,
                    expected,
                    args.len()
                ),
            ));
        }
        if args.len() < expected {
            return Err(Error::new(
                ErrorKind::MissingArgument,
                format!(
                    "{}{} takes {} argument(s), got {}",
                    self.name,
                    self.signature,
                    expected,
                    args.len()
                ),
            ));
        }

        for (index, (ty, arg)) in self.signature.params.iter().zip(args).enumerate() {
            if !ty.accepts(arg) {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!(
                        "{}: argument {} must be {}, got {}",
                        self.name,
                        index + 1,
                        ty,
                        arg.kind()
                    ),
                ));
            }
        }

        let result = (self.func)(args)?;
        if !self.signature.returns.accepts(&result) {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!(
                    "{}: declared to return {}, returned {}",
                    self.name,
                    self.signature.returns,
                    result.kind()
                ),
            ));
        }
        Ok(result)
    }
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// User-registered template functions.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, RegisteredFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user function.
    ///
    /// # Errors
    ///
    /// - [`FunctionError::Reserved`] for `content`, `section` and `render`
    /// - [`FunctionError::InvalidName`] if the name is not an identifier
    /// - [`FunctionError::NoneParameter`] if a parameter is declared as `none`
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
        func: F,
    ) -> Result<(), FunctionError>
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        let name = name.into();
        validate_name(&name)?;
        if let Some(index) = signature
            .params
            .iter()
            .position(|ty| *ty == ValueType::None)
        {
            return Err(FunctionError::NoneParameter { name, index });
        }

        self.functions.insert(
            name.clone(),
            RegisteredFunction {
                name,
                signature,
                func: Arc::new(func),
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }

    /// Installs the placeholders and every user function into `env`.
    pub fn install(&self, env: &mut Environment<'static>) {
        for name in RESERVED_FUNCTIONS {
            env.add_function(*name, placeholder);
        }
        for (name, entry) in &self.functions {
            let entry = entry.clone();
            env.add_function(name.clone(), move |args: Rest<Value>| entry.call(&args));
        }
    }
}

/// Whether `name` is one of the reserved placeholder functions.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_FUNCTIONS.contains(&name)
}

/// Default body of the reserved functions: accepts anything, renders nothing.
pub(crate) fn placeholder(_args: Rest<Value>) -> Value {
    Value::from_safe_string(String::new())
}

fn validate_name(name: &str) -> Result<(), FunctionError> {
    if is_reserved(name) {
        return Err(FunctionError::Reserved(name.to_string()));
    }

    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FunctionError::InvalidName(name.to_string()))
    }
}
