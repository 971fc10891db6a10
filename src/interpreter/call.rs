use std::rc::Rc;

use crate::ast::FunctionExpression;
use crate::token::Location;
use crate::value::{BrsType, Callable, Implementation, RoAssociativeArray, ValueKind, try_coerce};

use super::{At, EvalResult, Halt, Interpreter, Outcome, RuntimeError, RuntimeErrorKind, Scope};

// A call with less than the red zone of stack left continues on a new
// segment of `STACK_GROWTH` bytes.
const STACK_RED_ZONE: usize = 256 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

impl Interpreter {
    /// Dispatch a call: pick the first matching overload, then run it in
    /// a fresh function scope with `m` bound to `receiver`.
    pub(crate) fn call_callable(
        &mut self,
        callable: &Callable,
        args: Vec<BrsType>,
        receiver: Option<RoAssociativeArray>,
        location: &Location,
    ) -> EvalResult {
        if self.depth >= self.options.max_call_depth {
            return Err(Halt::Error(RuntimeError::new(
                RuntimeErrorKind::StackOverflow(self.options.max_call_depth),
                location.clone(),
            )));
        }

        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.enter_callable(callable, args, receiver, location)
        })
    }

    fn enter_callable(
        &mut self,
        callable: &Callable,
        args: Vec<BrsType>,
        receiver: Option<RoAssociativeArray>,
        location: &Location,
    ) -> EvalResult {
        let resolved = callable.resolve(&args).at(location)?;
        let implementation = resolved.implementation.clone();
        let args = resolved.args;
        tracing::trace!(
            function = callable.display_name(),
            depth = self.depth,
            "call"
        );

        let sub_environment = self.environment.create_sub_environment(receiver);
        let saved = std::mem::replace(&mut self.environment, sub_environment);
        self.depth += 1;

        let result = match implementation {
            Implementation::Native(native) => native(self, &args).at(location),
            Implementation::User(function) => self.run_user_function(&function, &args, location),
        };

        self.depth -= 1;
        self.environment = saved;
        tracing::trace!(function = callable.display_name(), "return");
        result
    }

    fn run_user_function(
        &mut self,
        function: &Rc<FunctionExpression>,
        args: &[BrsType],
        location: &Location,
    ) -> EvalResult {
        let name = function.name.as_deref().unwrap_or("anonymous");

        for (index, parameter) in function.parameters.iter().enumerate() {
            let value = match (args.get(index), &parameter.default) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => {
                    let value = self.evaluate(default)?;
                    try_coerce(&value, parameter.kind)
                        .ok_or_else(|| RuntimeErrorKind::ArgumentMismatch {
                            function: name.to_string(),
                            detail: format!(
                                "default for '{}' is {}, expected {}",
                                parameter.name,
                                value.kind(),
                                parameter.kind
                            ),
                        })
                        .at(default.location())?
                }
                (None, None) => BrsType::Invalid,
            };
            self.environment
                .define(Scope::Function, &parameter.name, value);
        }

        let value = match self.execute_block(&function.body.statements)? {
            Outcome::Completed => return Ok(BrsType::Invalid),
            Outcome::Return(value) => value,
            Outcome::ExitFor(at) => {
                return Err(RuntimeErrorKind::ExitOutsideLoop("exit for".to_string()))
                    .at(&at);
            }
            Outcome::ExitWhile(at) => {
                return Err(RuntimeErrorKind::ExitOutsideLoop("exit while".to_string()))
                    .at(&at);
            }
            Outcome::Goto(label, at) => {
                return Err(RuntimeErrorKind::LabelNotFound(label)).at(&at);
            }
        };

        if function.is_sub || function.return_type == ValueKind::Void {
            return Ok(BrsType::Invalid);
        }
        try_coerce(&value, function.return_type)
            .ok_or_else(|| RuntimeErrorKind::ReturnTypeMismatch {
                function: name.to_string(),
                expected: function.return_type,
                found: value.kind(),
            })
            .at(location)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::config::ExecutionOptions;
    use crate::interpreter::OutputBuffer;
    use crate::lexer::scan;
    use crate::parser::parse;

    fn interpreter(options: ExecutionOptions) -> (Interpreter, OutputBuffer) {
        let stdout = OutputBuffer::new();
        let interpreter =
            Interpreter::with_output(options, Box::new(stdout.clone()), Box::new(io::sink()));
        (interpreter, stdout)
    }

    fn exec(interpreter: &mut Interpreter, source: &str) -> Result<BrsType, RuntimeError> {
        let parsed = parse(&scan(source, "call.brs").tokens);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        interpreter.exec(&parsed.statements)
    }

    #[test]
    fn defaults_see_earlier_parameters() {
        let (mut interpreter, stdout) = interpreter(ExecutionOptions::default());
        exec(
            &mut interpreter,
            "function f(a, b = a * 10)\nreturn a + b\nend function\nprint f(2)\nprint f(2, 1)",
        )
        .unwrap();
        assert_eq!(stdout.contents(), "22\n3\n");
    }

    #[test]
    fn subs_return_invalid() {
        let (mut interpreter, _) = interpreter(ExecutionOptions::default());
        exec(&mut interpreter, "sub s()\nreturn\nend sub").unwrap();
        assert_eq!(interpreter.call_function("s", vec![]), Ok(BrsType::Invalid));
    }

    #[test]
    fn return_value_is_coerced_to_declared_type() {
        let (mut interpreter, _) = interpreter(ExecutionOptions::default());
        exec(&mut interpreter, "function f() as integer\nreturn 2.7\nend function").unwrap();
        assert_eq!(interpreter.call_function("f", vec![]), Ok(BrsType::Int32(2)));

        exec(&mut interpreter, "function g() as integer\nreturn \"x\"\nend function").unwrap();
        let error = interpreter.call_function("g", vec![]).unwrap_err();
        assert!(matches!(error.kind, RuntimeErrorKind::ReturnTypeMismatch { .. }));
    }

    #[test]
    fn recursion_depth_is_capped() {
        let options = ExecutionOptions {
            max_call_depth: 16,
            ..ExecutionOptions::default()
        };
        let (mut interpreter, _) = interpreter(options);
        let error = exec(
            &mut interpreter,
            "function forever(n)\nreturn forever(n + 1)\nend function\nforever(0)",
        )
        .unwrap_err();
        assert_eq!(error.kind, RuntimeErrorKind::StackOverflow(16));
    }

    #[test]
    fn wrong_arity_is_reported() {
        let (mut interpreter, _) = interpreter(ExecutionOptions::default());
        let error = exec(&mut interpreter, "function f(a)\nend function\nf(1, 2)").unwrap_err();
        assert!(matches!(error.kind, RuntimeErrorKind::ArgumentMismatch { .. }));
        assert_eq!(error.code(), 0xF1);
    }
}
