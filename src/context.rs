use std::sync::Mutex;

use crate::functions::{FunctionDef, FunctionRegistry};
use crate::operators::{OperatorDef, OperatorRegistry};

/// Errors raised synchronously by registry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A function with this name is already registered and `force` was not set
    FunctionAlreadyRegistered(String),
    /// An operator with this tag is already registered and `force` was not set
    OperatorAlreadyRegistered(String),
}

impl std::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationError::FunctionAlreadyRegistered(name) => {
                write!(f, "A function called '{}' is already registered", name)
            }
            RegistrationError::OperatorAlreadyRegistered(tag) => {
                write!(f, "An operator for the tag '{}' is already registered", tag)
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Construction options for a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Case-insensitive parsing: operator tags, function names, constants,
    /// and variable lookup all ignore case
    pub ignore_case: bool,

    /// Case-insensitive string comparison for equality and relational
    /// operators (independent of parsing case rules)
    pub ignore_case_for_equality: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            ignore_case: true,
            ignore_case_for_equality: false,
        }
    }
}

/// Culture settings for literal parsing and value formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Culture {
    /// The character accepted as the decimal separator in numeric literals
    pub decimal_separator: char,
}

impl Default for Culture {
    fn default() -> Self {
        Culture {
            decimal_separator: '.',
        }
    }
}

/// Context for compiling and evaluating expressions: culture, case rules,
/// and the operator/function registries the expression was compiled
/// against.
///
/// A context is constructed once from host-supplied options and is not
/// mutated during evaluation; registration is a pre-compilation act. Each
/// context owns an independent registry snapshot (built-ins plus any
/// process-wide default extensions registered before construction), so
/// there is no hidden cross-context coupling.
#[derive(Clone)]
pub struct Context {
    options: Options,
    culture: Culture,
    functions: FunctionRegistry,
    operators: OperatorRegistry,
    current_index: i64,
}

impl Context {
    pub fn new(options: Options) -> Self {
        Self::with_culture(options, Culture::default())
    }

    pub fn with_culture(options: Options, culture: Culture) -> Self {
        let mut functions = FunctionRegistry::standard(options.ignore_case);
        let mut operators = OperatorRegistry::standard(options.ignore_case);

        // Default extensions registered by the host become visible to every
        // context created after the registration.
        for def in default_functions().lock().expect("default function list poisoned").iter() {
            let _ = functions.register(def.clone(), true);
        }
        for def in default_operators().lock().expect("default operator list poisoned").iter() {
            let _ = operators.register(def.clone(), true);
        }

        Context {
            options,
            culture,
            functions,
            operators,
            current_index: -1,
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn culture(&self) -> Culture {
        self.culture
    }

    /// Case rule for operator-tag, function-name, and variable lookup
    pub fn parsing_ignore_case(&self) -> bool {
        self.options.ignore_case
    }

    /// Case rule for string equality and ordering
    pub fn equality_ignore_case(&self) -> bool {
        self.options.ignore_case_for_equality
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    /// Register a function on this context only
    pub fn register_function(
        &mut self,
        def: FunctionDef,
        force: bool,
    ) -> Result<(), RegistrationError> {
        self.functions.register(def, force)
    }

    /// Remove a function from this context
    pub fn unregister_function(&mut self, name: &str) {
        self.functions.unregister(name);
    }

    /// Register an operator on this context only
    pub fn register_operator(
        &mut self,
        def: OperatorDef,
        force: bool,
    ) -> Result<(), RegistrationError> {
        self.operators.register(def, force)
    }

    /// Remove an operator tag from this context
    pub fn unregister_operator(&mut self, tag: &str) {
        self.operators.unregister(tag);
    }

    /// The position of the current data item within its parent collection,
    /// as supplied by the host (`Index()` builtin). Negative when unset.
    pub fn current_index(&self) -> i64 {
        self.current_index
    }

    pub fn set_current_index(&mut self, index: i64) {
        self.current_index = index;
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Options::default())
    }
}

fn default_functions() -> &'static Mutex<Vec<FunctionDef>> {
    static LIST: Mutex<Vec<FunctionDef>> = Mutex::new(Vec::new());
    &LIST
}

fn default_operators() -> &'static Mutex<Vec<OperatorDef>> {
    static LIST: Mutex<Vec<OperatorDef>> = Mutex::new(Vec::new());
    &LIST
}

/// Register a function that every subsequently created [`Context`] will
/// include. Writers are serialized; registration must happen-before any
/// compilation that needs the entry.
pub fn register_default_function(def: FunctionDef) {
    default_functions()
        .lock()
        .expect("default function list poisoned")
        .push(def);
}

/// Register an operator that every subsequently created [`Context`] will
/// include.
pub fn register_default_operator(def: OperatorDef) {
    default_operators()
        .lock()
        .expect("default operator list poisoned")
        .push(def);
}
