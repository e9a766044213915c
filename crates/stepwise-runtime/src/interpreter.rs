//! The interpreter façade: the host-facing entry point that owns the
//! built-in and global-function tables and ties compilation to stepping.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Weak};

use stepwise_ast::{Block, Scope, Value};
use stepwise_compiler::{BuiltIn, BuiltInResolver, Executable, GlobalResolver};

use crate::block_on::block_on;
use crate::errors::RuntimeError;
use crate::stepper::{ExecOutcome, ExecutionContext};

/// Tunables for every execution the interpreter drives.
#[derive(Debug, Clone, Copy)]
pub struct InterpreterConfig {
    /// Upper bound on call-stack depth, checked on every `Call` opcode.
    pub max_call_depth: usize,
    /// Logs each step's opcode at trace level when set.
    pub trace_steps: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self { max_call_depth: 1024, trace_steps: false }
    }
}

/// Owns the built-in and named-global tables and compiles/executes
/// programs against them.
///
/// Built via [`Interpreter::new`], which uses `Arc::new_cyclic` so the
/// interpreter can hand every [`Executable`] it compiles a [`Weak`]
/// handle back to itself (see [`Executable`]'s own documentation for why
/// that back-reference must not be a strong one).
pub struct Interpreter {
    builtins: RefCell<HashMap<String, BuiltIn>>,
    globals: RefCell<HashMap<String, Arc<Executable>>>,
    config: InterpreterConfig,
    self_weak: Weak<Interpreter>,
}

impl Interpreter {
    #[must_use]
    pub fn new(config: InterpreterConfig) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            builtins: RefCell::new(HashMap::new()),
            globals: RefCell::new(HashMap::new()),
            config,
            self_weak: self_weak.clone(),
        })
    }

    /// An interpreter with the standard built-ins already registered.
    #[must_use]
    pub fn with_stdlib(config: InterpreterConfig) -> Arc<Self> {
        let interpreter = Self::new(config);
        for (name, builtin) in stepwise_stdlib::builtins() {
            interpreter.register_builtin(name, builtin);
        }
        interpreter
    }

    pub fn register_builtin(&self, name: impl Into<String>, builtin: BuiltIn) {
        let _ = self.builtins.borrow_mut().insert(name.into(), builtin);
    }

    /// Compiles `program` and registers it as a named global callable
    /// from any other program compiled against this same interpreter.
    pub fn register_global(&self, name: impl Into<String>, program: &Block) -> Result<(), RuntimeError> {
        let name = name.into();
        let executable = self.compile(program)?;
        let _ = self.globals.borrow_mut().insert(name, Arc::new(executable));
        Ok(())
    }

    pub fn compile(&self, program: &Block) -> Result<Executable, RuntimeError> {
        let globals: Weak<dyn GlobalResolver> = self.self_weak.clone();
        stepwise_compiler::compile(program, self, globals).map_err(RuntimeError::from)
    }

    /// Compiles and runs `program` to completion, synchronously, against a
    /// top-level scope seeded with `params` (the frame's fixed arguments)
    /// and `env` (the ambient mapping shared by every frame this call
    /// stack ever pushes). Built on [`Interpreter::exec`]; use that
    /// directly when the host already drives its own async runtime.
    pub fn run(
        &self,
        program: &Block,
        params: HashMap<String, Value>,
        env: HashMap<String, Value>,
    ) -> Result<ExecOutcome, RuntimeError> {
        block_on(self.exec(program, params, env))
    }

    /// Compiles and runs `program` to completion against a top-level
    /// scope seeded with `params` and `env`.
    pub async fn exec(
        &self,
        program: &Block,
        params: HashMap<String, Value>,
        env: HashMap<String, Value>,
    ) -> Result<ExecOutcome, RuntimeError> {
        let executable = Arc::new(self.compile(program)?);
        let scope = Scope::new(params, HashMap::new(), Rc::new(RefCell::new(env)));
        let mut context =
            ExecutionContext::new(executable, scope, self.config.max_call_depth, self.config.trace_steps);
        context.run().await
    }

    /// Runs an already-compiled global by name, against a fresh top-level
    /// scope seeded with `args` and `env`. Used by a host that wants to
    /// invoke a registered global directly rather than through a `Call`
    /// statement.
    pub async fn exec_global(
        &self,
        name: &str,
        args: HashMap<String, Value>,
        env: HashMap<String, Value>,
    ) -> Result<ExecOutcome, RuntimeError> {
        let executable = self
            .globals
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::unknown_global(name))?;
        let scope = Scope::new(args, HashMap::new(), Rc::new(RefCell::new(env)));
        let mut context =
            ExecutionContext::new(executable, scope, self.config.max_call_depth, self.config.trace_steps);
        context.run().await
    }
}

impl BuiltInResolver for Interpreter {
    fn resolve_builtin(&self, name: &str) -> Option<BuiltIn> {
        self.builtins.borrow().get(name).cloned()
    }
}

impl GlobalResolver for Interpreter {
    fn resolve_global(&self, name: &str) -> Option<Arc<Executable>> {
        self.globals.borrow().get(name).cloned()
    }
}
