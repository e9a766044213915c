//! Argument-shape errors raised by the example built-ins.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StdlibError {
    #[error("'{builtin}' requires a '{name}' argument")]
    MissingArgument { builtin: &'static str, name: &'static str },
    #[error("'{builtin}' could not parse '{name}' ({value}) as a number")]
    NotANumber { builtin: &'static str, name: &'static str, value: String },
}
