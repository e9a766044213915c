//! Persisted-state capture and restore.
//!
//! A snapshot is only ever taken between steps, never mid-fused-run: a
//! fused run has no externally addressable suspend point at its
//! interior, so a PC sitting there could never be resumed correctly.

use std::collections::HashMap;
use std::sync::Arc;

use stepwise_ast::{NodeId, Scope, Value};
use stepwise_compiler::Executable;

use crate::errors::RuntimeError;
use crate::stepper::{ExecutionContext, Frame, FrameState};

/// One call-stack frame's persisted state.
#[derive(Debug, Clone)]
pub struct SnapshotFrame {
    /// Identifies which compiled executable this frame belongs to, so a
    /// restore can look it up again by identity. Derived from the
    /// `Executable`'s address, not a name — globals are resolved by name
    /// only at compile time.
    pub executable_id: usize,
    pub pc: NodeId,
    pub local: HashMap<String, Value>,
}

/// A point-in-time capture of an [`ExecutionContext`]'s call stack.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub frames: Vec<SnapshotFrame>,
}

impl Snapshot {
    /// Captures every frame of `context`. Fails if any frame is not
    /// sitting at a step boundary (`FrameState::Running`, pointing at a
    /// live, non-fused-interior node).
    pub fn capture(context: &ExecutionContext) -> Result<Snapshot, RuntimeError> {
        let frames = context
            .stack
            .iter()
            .map(Self::capture_frame)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Snapshot { frames })
    }

    fn capture_frame(frame: &Frame) -> Result<SnapshotFrame, RuntimeError> {
        let FrameState::Running(pc) = frame.state else {
            return Err(RuntimeError::snapshot_not_at_boundary());
        };
        if !frame.executable.is_live(pc) {
            return Err(RuntimeError::snapshot_inside_fused_run(pc));
        }
        Ok(SnapshotFrame {
            executable_id: Arc::as_ptr(&frame.executable) as *const () as usize,
            pc,
            local: frame.scope.local_snapshot(),
        })
    }
}

/// Rebuilds an [`ExecutionContext`] from a snapshot. The caller supplies
/// the executable for each frame (looked up however it knows how to map
/// `executable_id` back to a compiled program) paired with the `local`
/// scratch space the snapshot captured, plus the `env` the original call
/// stack was seeded with (not itself captured by `Snapshot` — see
/// "Snapshot granularity" in the design notes, the same reasoning that
/// keeps `args` out of a snapshot applies to `env`). `env` is shared
/// across every rebuilt frame, matching the invariant that one call
/// stack shares one `env` handle.
pub fn restore(
    frames: Vec<(Arc<Executable>, SnapshotFrame)>,
    env: HashMap<String, Value>,
    max_call_depth: usize,
    trace_steps: bool,
) -> Result<ExecutionContext, RuntimeError> {
    let env = std::rc::Rc::new(std::cell::RefCell::new(env));
    let mut stack = Vec::with_capacity(frames.len());
    for (executable, snapshot) in frames {
        if !executable.is_live(snapshot.pc) {
            return Err(RuntimeError::snapshot_inside_fused_run(snapshot.pc));
        }
        let scope = Scope::new(HashMap::new(), snapshot.local, std::rc::Rc::clone(&env));
        stack.push(Frame { executable, scope, state: FrameState::Running(snapshot.pc) });
    }
    Ok(ExecutionContext::from_stack(stack, max_call_depth, trace_steps))
}
