//! Example built-in functions for the stepwise event interpreter.
//!
//! Not part of the core language — a handful of built-ins
//! (`print`, `len`, `type_of`, and the `to_*` conversions) demonstrating
//! the [`stepwise_ast::BuiltInFn`] signature for a host to follow when it
//! registers its own.

mod builtins;
mod errors;

pub use builtins::builtins;
pub use errors::StdlibError;
