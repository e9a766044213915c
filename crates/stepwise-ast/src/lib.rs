//! Statement-tree and host-collaborator data model for the stepwise event
//! interpreter.
//!
//! This crate defines the input language (`Statement`, `Block`), the
//! literal value model (`Value`), the run-time environment (`Scope`), the
//! opcode vocabulary returned by a compiled step (`Opcode`), and the traits
//! a host implements to supply expressions and built-in functions. It has
//! no knowledge of control-flow graphs, compilation, or stepping — those
//! live in the analyzer, compiler, and runtime crates built on top of it.

mod block;
mod expr;
mod node_id;
mod opcode;
mod scope;
mod statement;
mod value;

pub use block::Block;
pub use expr::{AsyncBuiltInFn, AsyncExpr, BuiltInFn, Expr, HostError};
pub use node_id::NodeId;
pub use opcode::Opcode;
pub use scope::Scope;
pub use statement::{
    CallStmt, CallableExpr, IfStmt, LoopStmt, ParamValue, Statement, SwitchStmt,
};
pub use value::Value;
