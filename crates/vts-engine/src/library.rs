//! Function library - explicit registry for cell evaluation functions.
//!
//! Callers register functions directly (no implicit side effects at load
//! time) and look them up by name and optional namespace. A handle bundles
//! the callable with the metadata a front-end needs to render it: label,
//! help text, arity and declared parameters.

use crate::error::{EngineError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use vts_core::value::Value;

/// A cell evaluation function: one output value per row from the selected
/// input values.
pub type EvalFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Declared parameter of a registered function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", rename_all = "lowercase")]
pub enum Parameter {
    Bool {
        name: String,
        default: Option<bool>,
    },
    Int {
        name: String,
        default: Option<i64>,
    },
    Float {
        name: String,
        default: Option<f64>,
    },
    Text {
        name: String,
        default: Option<String>,
    },
}

impl Parameter {
    pub fn name(&self) -> &str {
        match self {
            Parameter::Bool { name, .. }
            | Parameter::Int { name, .. }
            | Parameter::Float { name, .. }
            | Parameter::Text { name, .. } => name,
        }
    }
}

/// A registered function together with its display metadata.
#[derive(Clone)]
pub struct FunctionHandle {
    pub name: String,
    pub namespace: Option<String>,
    /// Human-readable name for display purposes.
    pub label: Option<String>,
    /// Descriptive text, e.g. for tooltips.
    pub help: Option<String>,
    /// Number of input columns the function consumes.
    pub columns: usize,
    /// Number of scalar output values.
    pub outputs: usize,
    pub parameters: Vec<Parameter>,
    pub func: EvalFn,
}

impl FunctionHandle {
    /// A single-column, single-output function with no extra parameters.
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            label: None,
            help: None,
            columns: 1,
            outputs: 1,
            parameters: Vec::new(),
            func: Arc::new(func),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    pub fn parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    /// JSON descriptor for front-ends.
    pub fn to_descriptor(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "namespace": self.namespace,
            "label": self.label,
            "help": self.help,
            "columns": self.columns,
            "outputs": self.outputs,
            "parameters": self.parameters,
        })
    }
}

impl fmt::Debug for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionHandle")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("columns", &self.columns)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Registry of evaluation functions, keyed by namespace and name.
///
/// Registering under an existing key replaces the previous handle.
pub struct FunctionLibrary {
    functions: RwLock<HashMap<(String, String), FunctionHandle>>,
}

impl FunctionLibrary {
    /// An empty library.
    pub fn empty() -> Self {
        Self {
            functions: RwLock::new(HashMap::new()),
        }
    }

    /// A library seeded with the built-in string functions.
    pub fn new() -> Self {
        let library = Self::empty();
        library.register(
            FunctionHandle::new("lower", text_fn(|s| s.to_lowercase())).namespace("string"),
        );
        library.register(
            FunctionHandle::new("upper", text_fn(|s| s.to_uppercase())).namespace("string"),
        );
        library.register(
            FunctionHandle::new("capitalize", text_fn(capitalize)).namespace("string"),
        );
        library
    }

    pub fn register(&self, handle: FunctionHandle) {
        let key = key_of(&handle.name, handle.namespace.as_deref());
        self.functions.write().insert(key, handle);
    }

    pub fn lookup(&self, name: &str, namespace: Option<&str>) -> Result<FunctionHandle> {
        self.functions
            .read()
            .get(&key_of(name, namespace))
            .cloned()
            .ok_or_else(|| EngineError::UnknownFunction {
                name: name.to_string(),
                namespace: namespace.map(str::to_string),
            })
    }

    /// Descriptors of every registered function, in (namespace, name) order.
    pub fn serialize(&self) -> Vec<serde_json::Value> {
        let functions = self.functions.read();
        let mut keys: Vec<_> = functions.keys().cloned().collect();
        keys.sort();
        keys.iter()
            .map(|k| functions[k].to_descriptor())
            .collect()
    }
}

impl Default for FunctionLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn key_of(name: &str, namespace: Option<&str>) -> (String, String) {
    (
        namespace.unwrap_or_default().to_string(),
        name.to_string(),
    )
}

/// Lift a string transform to a cell function; non-text values pass through.
fn text_fn(
    f: impl Fn(&str) -> String + Send + Sync + 'static,
) -> impl Fn(&[Value]) -> Value + Send + Sync + 'static {
    move |values: &[Value]| match values.first() {
        Some(Value::Text(s)) => Value::Text(f(s)),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}
