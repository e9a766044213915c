//! Example built-in functions, each implementing [`BuiltInFn`] over the
//! named-parameter/env map signature a host's `Call` statements produce.

use std::collections::HashMap;

use stepwise_ast::{BuiltInFn, HostError, Value};
use stepwise_compiler::BuiltIn;

use crate::errors::StdlibError;

fn require<'a>(
    builtin: &'static str,
    name: &'static str,
    parameters: &'a HashMap<String, Value>,
) -> Result<&'a Value, HostError> {
    parameters
        .get(name)
        .ok_or_else(|| Box::new(StdlibError::MissingArgument { builtin, name }) as HostError)
}

fn as_number(builtin: &'static str, name: &'static str, value: &Value) -> Result<f64, HostError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            Box::new(StdlibError::NotANumber { builtin, name, value: s.clone() }) as HostError
        }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Ok(0.0),
    }
}

#[derive(Debug)]
struct Print;

impl BuiltInFn for Print {
    fn call(&self, parameters: &HashMap<String, Value>, _env: &HashMap<String, Value>) -> Result<Value, HostError> {
        let value = require("print", "value", parameters)?;
        println!("{value}");
        Ok(Value::Null)
    }
}

#[derive(Debug)]
struct Len;

impl BuiltInFn for Len {
    fn call(&self, parameters: &HashMap<String, Value>, _env: &HashMap<String, Value>) -> Result<Value, HostError> {
        let value = require("len", "value", parameters)?;
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Number(_) | Value::Bool(_) | Value::Null => 1,
        };
        Ok(Value::Number(len as f64))
    }
}

#[derive(Debug)]
struct TypeOf;

impl BuiltInFn for TypeOf {
    fn call(&self, parameters: &HashMap<String, Value>, _env: &HashMap<String, Value>) -> Result<Value, HostError> {
        let value = require("type_of", "value", parameters)?;
        let name = match value {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Null => "null",
        };
        Ok(Value::String(name.to_owned()))
    }
}

#[derive(Debug)]
struct ToString;

impl BuiltInFn for ToString {
    fn call(&self, parameters: &HashMap<String, Value>, _env: &HashMap<String, Value>) -> Result<Value, HostError> {
        let value = require("to_string", "value", parameters)?;
        Ok(Value::String(value.to_string()))
    }
}

#[derive(Debug)]
struct ToInt;

impl BuiltInFn for ToInt {
    fn call(&self, parameters: &HashMap<String, Value>, _env: &HashMap<String, Value>) -> Result<Value, HostError> {
        let value = require("to_int", "value", parameters)?;
        let n = as_number("to_int", "value", value)?;
        Ok(Value::Number(n.trunc()))
    }
}

#[derive(Debug)]
struct ToFloat;

impl BuiltInFn for ToFloat {
    fn call(&self, parameters: &HashMap<String, Value>, _env: &HashMap<String, Value>) -> Result<Value, HostError> {
        let value = require("to_float", "value", parameters)?;
        Ok(Value::Number(as_number("to_float", "value", value)?))
    }
}

#[derive(Debug)]
struct ToBool;

impl BuiltInFn for ToBool {
    fn call(&self, parameters: &HashMap<String, Value>, _env: &HashMap<String, Value>) -> Result<Value, HostError> {
        let value = require("to_bool", "value", parameters)?;
        Ok(Value::Bool(value.is_truthy()))
    }
}

/// Every example built-in, paired with the name a `Call` statement would
/// use to reach it. Intended to be fed straight to
/// `Interpreter::register_builtin` in a loop, as [`builtins`] itself does
/// at the call sites that use `Interpreter::with_stdlib`.
#[must_use]
pub fn builtins() -> Vec<(&'static str, BuiltIn)> {
    use std::sync::Arc;

    vec![
        ("print", BuiltIn::Sync(Arc::new(Print))),
        ("len", BuiltIn::Sync(Arc::new(Len))),
        ("type_of", BuiltIn::Sync(Arc::new(TypeOf))),
        ("to_string", BuiltIn::Sync(Arc::new(ToString))),
        ("to_int", BuiltIn::Sync(Arc::new(ToInt))),
        ("to_float", BuiltIn::Sync(Arc::new(ToFloat))),
        ("to_bool", BuiltIn::Sync(Arc::new(ToBool))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn len_counts_chars_not_bytes() {
        let len = Len;
        let out = len.call(&params(&[("value", Value::String("héllo".into()))]), &HashMap::new()).unwrap();
        assert_eq!(out, Value::Number(5.0));
    }

    #[test]
    fn to_int_truncates_towards_zero() {
        let to_int = ToInt;
        let out = to_int.call(&params(&[("value", Value::Number(-3.7))]), &HashMap::new()).unwrap();
        assert_eq!(out, Value::Number(-3.0));
    }

    #[test]
    fn to_float_parses_numeric_strings() {
        let to_float = ToFloat;
        let out = to_float.call(&params(&[("value", Value::String("3.5".into()))]), &HashMap::new()).unwrap();
        assert_eq!(out, Value::Number(3.5));
    }

    #[test]
    fn to_float_rejects_non_numeric_strings() {
        let to_float = ToFloat;
        let err = to_float.call(&params(&[("value", Value::String("nope".into()))]), &HashMap::new());
        assert!(err.is_err());
    }

    #[test]
    fn type_of_names_every_value_kind() {
        let type_of = TypeOf;
        assert_eq!(
            type_of.call(&params(&[("value", Value::Null)]), &HashMap::new()).unwrap(),
            Value::String("null".into())
        );
        assert_eq!(
            type_of.call(&params(&[("value", Value::Bool(true))]), &HashMap::new()).unwrap(),
            Value::String("bool".into())
        );
    }
}
