//! Pass 1: lowers a statement tree into a labelled control-flow graph.

mod flow_graph;
mod lower;

pub use flow_graph::{FlowGraph, FlowNode, FlowNodeKind, NormalKind};
pub use lower::lower;
