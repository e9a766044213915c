//! The stepping engine: drives an [`Executable`] call stack one opcode at
//! a time.
//!
//! A frame's program counter is either sitting on a live node (`Running`),
//! about to unwind with a return value (`Returning`), or the process has
//! exited (`Exited`) — three named states standing in for the PC
//! sentinels of the source material this crate's design is based on
//! (conventionally `-1` for "returning" and `-2` for "exited"). Named
//! variants catch a stray PC comparison at compile time instead of at
//! the wrong runtime moment.

use std::collections::HashMap;
use std::sync::Arc;

use stepwise_ast::{NodeId, Opcode, Scope, Value};
use stepwise_compiler::Executable;

use crate::errors::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Running(NodeId),
    Returning(Option<Value>),
    Exited,
}

pub(crate) struct Frame {
    pub(crate) executable: Arc<Executable>,
    pub(crate) scope: Scope,
    pub(crate) state: FrameState,
}

impl Frame {
    fn new(executable: Arc<Executable>, scope: Scope) -> Self {
        let entry = executable.entry();
        Self { executable, scope, state: FrameState::Running(entry) }
    }
}

/// What an exhausted call stack produced.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    Returned(Value),
    Exited,
}

/// One action to take against the call stack, decided from a read-only
/// look at its top frame. Kept as a separate value (rather than acting
/// inline on the match) so the borrow that reads `self.stack.last()` ends
/// before the mutation that follows needs `&mut self.stack` — matching
/// them in the same scope would make the borrow checker see a live
/// shared and mutable borrow at once.
enum Action {
    Step(Opcode),
    PopReturn(Option<Value>),
    PopExit,
}

pub struct ExecutionContext {
    pub(crate) stack: Vec<Frame>,
    max_call_depth: usize,
    trace_steps: bool,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(executable: Arc<Executable>, scope: Scope, max_call_depth: usize, trace_steps: bool) -> Self {
        Self { stack: vec![Frame::new(executable, scope)], max_call_depth, trace_steps }
    }

    /// Rebuilds a context directly from an already-assembled stack of
    /// frames, used by [`crate::snapshot::restore`].
    #[must_use]
    pub(crate) fn from_stack(stack: Vec<Frame>, max_call_depth: usize, trace_steps: bool) -> Self {
        Self { stack, max_call_depth, trace_steps }
    }

    /// Runs the call stack to completion: either the root frame returns,
    /// or any frame runs an `Exit` opcode, which unwinds every ancestor.
    pub async fn run(&mut self) -> Result<ExecOutcome, RuntimeError> {
        loop {
            if let Some(outcome) = self.advance().await? {
                return Ok(outcome);
            }
        }
    }

    /// Runs one opcode's worth of work. Returns `Some` once the whole
    /// stack is done (root return or exit), `None` if there is more to do.
    async fn advance(&mut self) -> Result<Option<ExecOutcome>, RuntimeError> {
        let action = {
            let top = self.stack.last().ok_or_else(|| {
                RuntimeError::step_out_of_range(NodeId::new(0))
            })?;
            match top.state {
                FrameState::Running(pc) => Action::Step(self.step_at(top, pc).await?),
                FrameState::Returning(ref value) => Action::PopReturn(value.clone()),
                FrameState::Exited => Action::PopExit,
            }
        };

        match action {
            Action::Step(opcode) => {
                self.apply(opcode)?;
                Ok(None)
            }
            Action::PopReturn(value) => self.pop_returning(value),
            Action::PopExit => self.pop_exited(),
        }
    }

    async fn step_at(&self, frame: &Frame, pc: NodeId) -> Result<Opcode, RuntimeError> {
        if !frame.executable.is_live(pc) {
            return Err(RuntimeError::step_out_of_range(pc));
        }
        if frame.executable.is_fused(pc) {
            return frame.executable.step_fused(pc, &frame.scope).await.map_err(RuntimeError::ExpressionFailed);
        }
        frame.executable.step_node_async(pc, &frame.scope).await.map_err(RuntimeError::ExpressionFailed)
    }

    /// Applies a freshly computed opcode to the top frame: advances its
    /// PC, dispatches a call, or marks it returning/exited.
    fn apply(&mut self, opcode: Opcode) -> Result<(), RuntimeError> {
        match opcode {
            Opcode::Move(target) => {
                let top = self.stack.last_mut().unwrap_or_else(|| unreachable!("advance only runs with a non-empty stack"));
                top.state = FrameState::Running(target);
                Ok(())
            }
            Opcode::Call(name, params, resume) => self.dispatch(&name, params, resume),
            Opcode::Return(value) => {
                let top = self.stack.last_mut().unwrap_or_else(|| unreachable!("advance only runs with a non-empty stack"));
                top.state = FrameState::Returning(value);
                Ok(())
            }
            Opcode::Exit => {
                let top = self.stack.last_mut().unwrap_or_else(|| unreachable!("advance only runs with a non-empty stack"));
                top.state = FrameState::Exited;
                Ok(())
            }
        }
    }

    /// Resolves `name` against the caller's executable and pushes a new
    /// frame for it, after advancing the caller's own PC to `resume` —
    /// done first so that if the callee frame is ever snapshotted and
    /// resumed independently, the caller's own resumption point is
    /// already correct without needing special-casing at unwind time.
    fn dispatch(&mut self, name: &str, params: HashMap<String, Value>, resume: NodeId) -> Result<(), RuntimeError> {
        let top = self.stack.last_mut().unwrap_or_else(|| unreachable!("advance only runs with a non-empty stack"));
        let callee_executable = top.executable.resolve_global(name).ok_or_else(|| RuntimeError::unknown_global(name))?;
        top.state = FrameState::Running(resume);

        if self.stack.len() >= self.max_call_depth {
            return Err(RuntimeError::max_call_depth_exceeded(self.max_call_depth));
        }

        let env = self.stack.last().unwrap_or_else(|| unreachable!("just pushed to")).scope.env_handle();
        let callee_scope = Scope::new(params, HashMap::new(), env);
        if self.trace_steps {
            log::trace!("call -> '{name}' at depth {}", self.stack.len());
        }
        self.stack.push(Frame::new(callee_executable, callee_scope));
        Ok(())
    }

    /// Pops a frame that finished with `Opcode::Return`. At depth zero
    /// this is the outcome of the whole call; otherwise the caller simply
    /// resumes at the PC `dispatch` already set for it — the callee's
    /// return value is not observable by the caller (calls are
    /// fire-and-forget; see `SingleStep::ExternCall`).
    fn pop_returning(&mut self, value: Option<Value>) -> Result<Option<ExecOutcome>, RuntimeError> {
        let _ = self.stack.pop();
        if self.stack.is_empty() {
            return Ok(Some(ExecOutcome::Returned(value.unwrap_or(Value::Null))));
        }
        Ok(None)
    }

    /// Pops a frame that ran `Opcode::Exit`. Exit unwinds every ancestor
    /// frame too, not just the one that raised it.
    fn pop_exited(&mut self) -> Result<Option<ExecOutcome>, RuntimeError> {
        let _ = self.stack.pop();
        if self.stack.is_empty() {
            return Ok(Some(ExecOutcome::Exited));
        }
        let top = self.stack.last_mut().unwrap_or_else(|| unreachable!("non-empty after pop"));
        top.state = FrameState::Exited;
        Ok(None)
    }
}
