//! Flow analysis for the stepwise event interpreter.
//!
//! This crate is Pass 1 of the two-pass compiler: it lowers a root
//! [`Block`](stepwise_ast::Block) into a labelled [`FlowGraph`], resolving
//! labels, wiring `break`/`continue` to their structural targets, and
//! appending the implicit return that every program falls off the end
//! into.
//!
//! ## Architecture
//!
//! - [`analysis`]: the [`FlowGraph`]/[`FlowNode`] arena and the [`lower`]
//!   entry point.
//! - [`error`]: [`FlowError`], the four compile-time failures this pass can
//!   raise.

pub mod analysis;
pub mod error;

pub use analysis::{lower, FlowGraph, FlowNode, FlowNodeKind, NormalKind};
pub use error::FlowError;
