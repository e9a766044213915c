use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::Value;

/// The run-time environment of a single invocation.
///
/// `args` are fixed at frame entry and never mutated. `local` is
/// loop/expression scratch, mutated by expression side effects even though
/// expressions only ever see a shared reference to the scope — hence the
/// interior mutability. `env` is shared by every frame in one call stack;
/// distinct top-level invocations do not share it.
#[derive(Debug, Clone)]
pub struct Scope {
    args: Rc<HashMap<String, Value>>,
    local: Rc<RefCell<HashMap<String, Value>>>,
    env: Rc<RefCell<HashMap<String, Value>>>,
}

impl Scope {
    #[must_use]
    pub fn new(
        args: HashMap<String, Value>,
        local: HashMap<String, Value>,
        env: Rc<RefCell<HashMap<String, Value>>>,
    ) -> Self {
        Self {
            args: Rc::new(args),
            local: Rc::new(RefCell::new(local)),
            env,
        }
    }

    #[must_use]
    pub fn args(&self) -> &HashMap<String, Value> {
        &self.args
    }

    #[must_use]
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.local.borrow().get(name).cloned()
    }

    pub fn set_local(&self, name: impl Into<String>, value: Value) {
        let _ = self.local.borrow_mut().insert(name.into(), value);
    }

    /// A point-in-time copy of `local`, used when capturing a snapshot frame.
    #[must_use]
    pub fn local_snapshot(&self) -> HashMap<String, Value> {
        self.local.borrow().clone()
    }

    #[must_use]
    pub fn get_env(&self, name: &str) -> Option<Value> {
        self.env.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn env_snapshot(&self) -> HashMap<String, Value> {
        self.env.borrow().clone()
    }

    /// Hands out the shared `env` handle so a child frame can be built
    /// against the same ambient mapping.
    #[must_use]
    pub fn env_handle(&self) -> Rc<RefCell<HashMap<String, Value>>> {
        Rc::clone(&self.env)
    }
}
