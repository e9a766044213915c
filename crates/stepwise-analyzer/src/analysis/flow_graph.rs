//! The labelled control-flow graph produced by Pass 1.
//!
//! Every reachable node is stored at the index matching its own `id`, a
//! dense arena indexed by [`NodeId`] rather than a pointer graph — loops
//! back-edge to their own head, which a pointer/`Rc` graph would make
//! awkward; an index into this array has no such concern.

use std::collections::HashMap;

use stepwise_ast::{CallableExpr, NodeId, ParamValue};

/// The two call-statement shapes a `Normal` node may wrap.
#[derive(Debug, Clone)]
pub enum NormalKind {
    /// A bare expression statement, carrying its own sync/async-ness.
    Expression(CallableExpr),
    /// A call to a built-in function (`Call` with `built_in = true`).
    BuiltInCall {
        name: String,
        params: HashMap<String, ParamValue>,
        is_async: bool,
    },
}

/// One vertex of the flow graph. `Block` nodes from the source spec are not
/// materialised here: a block's entry node simply *is* the id of its first
/// statement's node (invariant 2), so the lowering pass never allocates a
/// separate node for one.
#[derive(Debug, Clone)]
pub enum FlowNodeKind {
    Normal {
        kind: NormalKind,
        next: NodeId,
    },
    /// A call to a named global function. Never mergeable: this is a step
    /// boundary.
    ExternCall {
        name: String,
        params: HashMap<String, ParamValue>,
        is_async: bool,
        next: NodeId,
    },
    If {
        branches: Vec<(ParamValue, NodeId)>,
        otherwise: Option<NodeId>,
        next: NodeId,
    },
    Switch {
        pattern: ParamValue,
        branches: Vec<(ParamValue, NodeId)>,
        otherwise: Option<NodeId>,
        next: NodeId,
    },
    /// The loop head: serves as both the initial check and the
    /// per-iteration check.
    Loop {
        iterator: Option<ParamValue>,
        condition: Option<ParamValue>,
        body: NodeId,
        next: NodeId,
    },
    /// Wraps a loop that has an initialiser; runs the initialiser once,
    /// then falls into the loop head.
    LoopInitializer {
        initializer: ParamValue,
        main: NodeId,
    },
    /// A break or continue, resolved to its structural target.
    Jump {
        next: NodeId,
    },
    Return {
        value: Option<ParamValue>,
    },
    Exit,
}

/// A node in the flow graph: an id, a mergeability flag, and the variant
/// payload.
#[derive(Debug, Clone)]
pub struct FlowNode {
    pub id: NodeId,
    /// False only for `ExternCall`; everything else may be fused into a
    /// larger run (invariant 6). Composite nodes (`If`/`Switch`/`Loop`) are
    /// mergeable only when every branch/body they own is mergeable
    /// (invariant 5: mergeability propagates upward).
    pub mergeable: bool,
    pub kind: FlowNodeKind,
}

/// The labelled output of Pass 1: a dense array of [`FlowNode`], addressable
/// by [`NodeId`], with a designated entry.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    entry: NodeId,
}

impl FlowGraph {
    pub(crate) fn new(nodes: Vec<FlowNode>, entry: NodeId) -> Self {
        Self { nodes, entry }
    }

    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&FlowNode> {
        self.nodes.get(id.as_usize())
    }

    #[must_use]
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
