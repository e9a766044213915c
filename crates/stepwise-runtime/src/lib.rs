//! The stepping engine and interpreter façade for the event interpreter.
//!
//! Takes the [`stepwise_compiler::Executable`] produced by the compiler
//! crate and drives it: a call stack of frames, each parked on a program
//! counter between steps, advanced one opcode at a time by
//! [`ExecutionContext::run`]. [`Interpreter`] is the host-facing entry
//! point that owns the built-in and named-global tables both passes need
//! resolved.

mod block_on;
mod errors;
mod interpreter;
mod snapshot;
mod stepper;

pub use block_on::block_on;
pub use errors::RuntimeError;
pub use interpreter::{Interpreter, InterpreterConfig};
pub use snapshot::{restore, Snapshot, SnapshotFrame};
pub use stepper::{ExecOutcome, ExecutionContext, FrameState};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use stepwise_ast::{
        Block, BuiltInFn, CallStmt, CallableExpr, Expr, HostError, IfStmt, LoopStmt, ParamValue,
        Scope, Statement, SwitchStmt, Value,
    };
    use stepwise_compiler::BuiltIn;

    use super::*;

    #[derive(Debug)]
    struct Echo(Value);

    impl Expr for Echo {
        fn eval(&self, _scope: &Scope) -> Result<Value, HostError> {
            Ok(self.0.clone())
        }
    }

    fn literal(v: Value) -> ParamValue {
        ParamValue::Literal(v)
    }

    fn block(statements: Vec<Statement>) -> Block {
        Block::new(statements)
    }

    fn as_number(value: Option<Value>) -> f64 {
        match value {
            Some(Value::Number(n)) => n,
            _ => 0.0,
        }
    }

    /// Records every `(parameters, env)` pair it is invoked with, in order.
    #[derive(Debug, Clone)]
    struct Recorder(Arc<Mutex<Vec<(HashMap<String, Value>, HashMap<String, Value>)>>>);

    impl BuiltInFn for Recorder {
        fn call(
            &self,
            parameters: &HashMap<String, Value>,
            env: &HashMap<String, Value>,
        ) -> Result<Value, HostError> {
            self.0.lock().unwrap().push((parameters.clone(), env.clone()));
            Ok(Value::Null)
        }
    }

    /// A built-in that logs the display form of its `text` parameter, used
    /// to observe call ordering across frames.
    #[derive(Debug, Clone)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl BuiltInFn for Log {
        fn call(&self, parameters: &HashMap<String, Value>, _env: &HashMap<String, Value>) -> Result<Value, HostError> {
            let text = parameters.get("text").map(Value::to_string).unwrap_or_default();
            self.0.lock().unwrap().push(text);
            Ok(Value::Null)
        }
    }

    fn log_call(text: ParamValue) -> Statement {
        Statement::Call(CallStmt {
            name: "log".into(),
            params: HashMap::from([("text".to_owned(), text)]),
            built_in: true,
            is_async: false,
        })
    }

    #[test]
    fn hello_world_returns_unspecified_value() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let program = block(vec![Statement::Expression(CallableExpr::Sync(Arc::new(Echo(
            Value::String("hello".into()),
        ))))]);
        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        match outcome {
            ExecOutcome::Returned(Value::Null) => {}
            other => panic!("expected an implicit Null return, got {other:?}"),
        }
    }

    #[test]
    fn explicit_return_value_propagates_to_the_top() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let program = block(vec![Statement::Return(Some(literal(Value::Number(42.0))))]);
        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        match outcome {
            ExecOutcome::Returned(Value::Number(n)) => assert_eq!(n, 42.0),
            other => panic!("expected Returned(42), got {other:?}"),
        }
    }

    #[test]
    fn exit_unwinds_every_frame() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let program = block(vec![Statement::Exit]);
        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        assert!(matches!(outcome, ExecOutcome::Exited));
    }

    #[test]
    fn switch_has_no_fallthrough() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let switch = SwitchStmt {
            pattern: literal(Value::Number(2.0)),
            branches: vec![
                (literal(Value::Number(1.0)), block(vec![Statement::Return(Some(literal(Value::String("one".into()))))])),
                (literal(Value::Number(2.0)), block(vec![Statement::Return(Some(literal(Value::String("two".into()))))])),
            ],
            otherwise: Some(block(vec![Statement::Return(Some(literal(Value::String("other".into()))))])),
        };
        let program = block(vec![Statement::Switch(switch)]);
        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        match outcome {
            ExecOutcome::Returned(Value::String(s)) => assert_eq!(s, "two"),
            other => panic!("expected Returned(\"two\"), got {other:?}"),
        }
    }

    #[test]
    fn labelled_break_exits_the_outer_loop_only() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let inner = LoopStmt {
            initializer: None,
            condition: Some(literal(Value::Bool(true))),
            iterator: None,
            label: None,
            body: block(vec![Statement::Break(Some("outer".into()))]),
            skip_initial_check: false,
        };
        let outer = LoopStmt {
            initializer: None,
            condition: Some(literal(Value::Bool(true))),
            iterator: None,
            label: Some("outer".into()),
            body: block(vec![Statement::Loop(inner)]),
            skip_initial_check: false,
        };
        let program = block(vec![Statement::Loop(outer), Statement::Return(Some(literal(Value::String("done".into()))))]);
        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        match outcome {
            ExecOutcome::Returned(Value::String(s)) => assert_eq!(s, "done"),
            other => panic!("expected Returned(\"done\"), got {other:?}"),
        }
    }

    #[test]
    fn a_call_to_an_unregistered_global_is_an_error() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let call = CallStmt { name: "missing".into(), params: HashMap::new(), built_in: false, is_async: false };
        let program = block(vec![Statement::Call(call)]);
        let err = interpreter.run(&program, HashMap::new(), HashMap::new()).expect_err("unregistered global call fails");
        assert!(matches!(err, RuntimeError::UnknownGlobal { .. }));
    }

    #[test]
    fn if_with_no_matching_branch_falls_through_to_next() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let iff = IfStmt {
            branches: vec![(literal(Value::Bool(false)), block(vec![Statement::Exit]))],
            otherwise: None,
        };
        let program = block(vec![Statement::If(iff), Statement::Return(Some(literal(Value::Bool(true))))]);
        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        match outcome {
            ExecOutcome::Returned(Value::Bool(b)) => assert!(b),
            other => panic!("expected Returned(true), got {other:?}"),
        }
    }

    #[test]
    fn hello_world_invokes_the_builtin_with_resolved_params_and_env() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let calls = Arc::new(Mutex::new(Vec::new()));
        interpreter.register_builtin("echo", BuiltIn::Sync(Arc::new(Recorder(Arc::clone(&calls)))));

        #[derive(Debug)]
        struct ArgsText;
        impl Expr for ArgsText {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                Ok(scope.args().get("test").cloned().unwrap_or(Value::Null))
            }
        }

        let call = CallStmt {
            name: "echo".into(),
            params: HashMap::from([("text".to_owned(), ParamValue::Expr(Arc::new(ArgsText)))]),
            built_in: true,
            is_async: false,
        };
        let program = block(vec![Statement::Call(call)]);
        let params = HashMap::from([("test".to_owned(), Value::String("hello".into()))]);
        let env = HashMap::from([("prefix".to_owned(), Value::String("test".into()))]);

        let outcome = interpreter.run(&program, params, env).expect("run succeeds");
        assert!(matches!(outcome, ExecOutcome::Returned(Value::Null)));

        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 1, "echo must be invoked exactly once");
        assert_eq!(recorded[0].0.get("text"), Some(&Value::String("hello".into())));
        assert_eq!(recorded[0].1.get("prefix"), Some(&Value::String("test".into())));
    }

    #[test]
    fn counting_loop_runs_its_body_exactly_n_times() {
        let interpreter = Interpreter::new(InterpreterConfig::default());

        // This compiler's loop head always runs the iterator before
        // checking the condition, on every visit including the first
        // (see `SingleStep::Loop`) — so the initializer seeds `i` one
        // step behind the intended first value.
        #[derive(Debug)]
        struct InitCounter;
        impl Expr for InitCounter {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                scope.set_local("i", Value::Number(-1.0));
                scope.set_local("k", Value::Number(0.0));
                Ok(Value::Null)
            }
        }
        #[derive(Debug)]
        struct IncrementI;
        impl Expr for IncrementI {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                let i = as_number(scope.get_local("i"));
                scope.set_local("i", Value::Number(i + 1.0));
                Ok(Value::Null)
            }
        }
        #[derive(Debug)]
        struct LessThanTen;
        impl Expr for LessThanTen {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                Ok(Value::Bool(as_number(scope.get_local("i")) < 10.0))
            }
        }
        #[derive(Debug)]
        struct AddK;
        impl Expr for AddK {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                let k = as_number(scope.get_local("k"));
                let i = as_number(scope.get_local("i"));
                scope.set_local("k", Value::Number(k + i));
                Ok(Value::Null)
            }
        }
        #[derive(Debug)]
        struct ReadK;
        impl Expr for ReadK {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                Ok(Value::Number(as_number(scope.get_local("k"))))
            }
        }

        let loop_stmt = LoopStmt {
            initializer: Some(ParamValue::Expr(Arc::new(InitCounter))),
            condition: Some(ParamValue::Expr(Arc::new(LessThanTen))),
            iterator: Some(ParamValue::Expr(Arc::new(IncrementI))),
            label: None,
            body: block(vec![Statement::Expression(CallableExpr::Sync(Arc::new(AddK)))]),
            skip_initial_check: false,
        };
        let program = block(vec![
            Statement::Loop(loop_stmt),
            Statement::Return(Some(ParamValue::Expr(Arc::new(ReadK)))),
        ]);

        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        match outcome {
            ExecOutcome::Returned(Value::Number(k)) => assert_eq!(k, 45.0),
            other => panic!("expected Returned(45), got {other:?}"),
        }
    }

    #[test]
    fn skip_initial_check_runs_the_body_exactly_once_when_the_condition_is_false() {
        let interpreter = Interpreter::new(InterpreterConfig::default());

        #[derive(Debug)]
        struct IncrementCount;
        impl Expr for IncrementCount {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                let count = as_number(scope.get_local("count"));
                scope.set_local("count", Value::Number(count + 1.0));
                Ok(Value::Null)
            }
        }
        #[derive(Debug)]
        struct ReadCount;
        impl Expr for ReadCount {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                Ok(Value::Number(as_number(scope.get_local("count"))))
            }
        }

        let loop_stmt = LoopStmt {
            initializer: None,
            condition: Some(literal(Value::Bool(false))),
            iterator: None,
            label: None,
            body: block(vec![Statement::Expression(CallableExpr::Sync(Arc::new(IncrementCount)))]),
            skip_initial_check: true,
        };
        let program = block(vec![
            Statement::Loop(loop_stmt),
            Statement::Return(Some(ParamValue::Expr(Arc::new(ReadCount)))),
        ]);

        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        match outcome {
            ExecOutcome::Returned(Value::Number(count)) => assert_eq!(count, 1.0),
            other => panic!("expected Returned(1), got {other:?}"),
        }
    }

    #[test]
    fn global_call_chain_resumes_the_caller_in_declared_order() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let calls = Arc::new(Mutex::new(Vec::new()));
        interpreter.register_builtin("log", BuiltIn::Sync(Arc::new(Log(Arc::clone(&calls)))));

        #[derive(Debug)]
        struct DoubleX;
        impl Expr for DoubleX {
            fn eval(&self, scope: &Scope) -> Result<Value, HostError> {
                let x = match scope.args().get("x") {
                    Some(Value::Number(n)) => *n,
                    _ => 0.0,
                };
                Ok(Value::Number(x * 2.0))
            }
        }

        let double = block(vec![log_call(ParamValue::Expr(Arc::new(DoubleX)))]);
        interpreter.register_global("double", &double).expect("global registers");

        let call_double = Statement::Call(CallStmt {
            name: "double".into(),
            params: HashMap::from([("x".to_owned(), literal(Value::Number(3.0)))]),
            built_in: false,
            is_async: false,
        });
        let program = block(vec![log_call(literal(Value::String("before".into()))), call_double, log_call(literal(Value::String("after".into())))]);

        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        assert!(matches!(outcome, ExecOutcome::Returned(Value::Null)));
        let recorded = calls.lock().unwrap();
        assert_eq!(*recorded, vec!["before".to_owned(), "6".to_owned(), "after".to_owned()]);
    }

    #[test]
    fn exit_propagates_through_every_call_frame_in_a_chain() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        let calls = Arc::new(Mutex::new(Vec::new()));
        interpreter.register_builtin("log", BuiltIn::Sync(Arc::new(Log(Arc::clone(&calls)))));

        let h = block(vec![Statement::Exit]);
        interpreter.register_global("h", &h).expect("global registers");

        let call_h = Statement::Call(CallStmt { name: "h".into(), params: HashMap::new(), built_in: false, is_async: false });
        let g = block(vec![call_h, log_call(literal(Value::String("g resumed".into())))]);
        interpreter.register_global("g", &g).expect("global registers");

        let call_g = Statement::Call(CallStmt { name: "g".into(), params: HashMap::new(), built_in: false, is_async: false });
        let program = block(vec![call_g, log_call(literal(Value::String("main resumed".into())))]);

        let outcome = interpreter.run(&program, HashMap::new(), HashMap::new()).expect("run succeeds");
        assert!(matches!(outcome, ExecOutcome::Exited));
        let recorded = calls.lock().unwrap();
        assert!(recorded.is_empty(), "neither g nor main should resume past the call that exits: {recorded:?}");
    }
}
