//! Tree-walking evaluator.
//!
//! Statements report how they finished through [`Outcome`]: `return`,
//! `exit for`, `exit while` and `goto` travel upward as values until the
//! construct that handles them. Errors and `end` travel on the `Err` side
//! as [`Halt`], so `?` unwinds them through nested calls.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use crate::ast::Statement;
use crate::config::ExecutionOptions;
use crate::stdlib;
use crate::token::Location;
use crate::value::{BrsObject, BrsType, Callable};

mod call;
pub mod environment;
pub mod error;
mod expression;
pub mod output;
mod statement;

pub use environment::{Environment, Scope};
pub use error::{RuntimeError, RuntimeErrorKind, USER_ERROR_NUMBER};
pub use output::OutputBuffer;

use output::Printer;

/// Builds a fresh instance of a registered component for `CreateObject`.
pub type ComponentFactory = dyn Fn() -> BrsObject;

/// How a statement or block finished.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Completed,
    Return(BrsType),
    ExitFor(Location),
    ExitWhile(Location),
    Goto(String, Location),
}

/// Reasons evaluation stops early.
#[derive(Debug)]
pub(crate) enum Halt {
    Error(RuntimeError),
    /// `end` statement: stop the whole program quietly.
    End,
}

impl From<RuntimeError> for Halt {
    fn from(error: RuntimeError) -> Self {
        Self::Error(error)
    }
}

pub(crate) type EvalResult = Result<BrsType, Halt>;
pub(crate) type ExecResult = Result<Outcome, Halt>;

/// Attach a source location to a location-less error.
pub(crate) trait At<T> {
    fn at(self, location: &Location) -> Result<T, Halt>;
}

impl<T> At<T> for Result<T, RuntimeErrorKind> {
    fn at(self, location: &Location) -> Result<T, Halt> {
        self.map_err(|kind| Halt::Error(RuntimeError::new(kind, location.clone())))
    }
}

pub struct Interpreter {
    environment: Environment,
    options: ExecutionOptions,
    stdout: Printer,
    stderr: Box<dyn Write>,
    components: HashMap<String, Rc<ComponentFactory>>,
    depth: usize,
}

impl Interpreter {
    /// Interpreter writing to the process's stdout and stderr.
    #[must_use]
    pub fn new(options: ExecutionOptions) -> Self {
        Self::with_output(options, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Interpreter writing `print` output to `stdout` and uncaught runtime
    /// errors to `stderr`.
    #[must_use]
    pub fn with_output(
        options: ExecutionOptions,
        stdout: Box<dyn Write>,
        stderr: Box<dyn Write>,
    ) -> Self {
        let mut environment = Environment::new();
        stdlib::register(&mut environment);
        Self {
            environment,
            options,
            stdout: Printer::new(stdout),
            stderr,
            components: HashMap::new(),
            depth: 0,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    pub const fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    /// Make `CreateObject(name)` produce objects from `factory`.
    pub fn register_component<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> BrsObject + 'static,
    {
        self.components
            .insert(name.to_ascii_lowercase(), Rc::new(factory));
    }

    pub(crate) fn create_component(&self, name: &str) -> Option<BrsObject> {
        self.components
            .get(&name.to_ascii_lowercase())
            .map(|factory| factory())
    }

    /// Substitute `callable` for every lookup of `name`, shadowing both
    /// user and standard-library definitions.
    pub fn mock_function(&mut self, name: &str, callable: Callable) {
        self.environment
            .set_mock(name, BrsType::Callable(Rc::new(callable)));
    }

    /// Execute a module: declare every top-level function first, then run
    /// the remaining statements in order.
    ///
    /// Uncaught errors are also written to the error sink.
    pub fn exec(&mut self, statements: &[Statement]) -> Result<BrsType, RuntimeError> {
        for statement in statements {
            if let Statement::Function { name, function, .. } = statement {
                self.environment.define(
                    Scope::Module,
                    name,
                    BrsType::Callable(Rc::new(Callable::user(Rc::clone(function)))),
                );
            }
        }

        let result = match self.execute_block(statements) {
            Ok(outcome) => Self::finish(outcome),
            Err(Halt::End) => Ok(BrsType::Invalid),
            Err(Halt::Error(error)) => Err(error),
        };
        self.report(result)
    }

    /// Call a function visible from module scope, such as `main`.
    pub fn call_function(
        &mut self,
        name: &str,
        args: Vec<BrsType>,
    ) -> Result<BrsType, RuntimeError> {
        let location = Location::internal();
        let result = match self.environment.get(name) {
            Some(BrsType::Callable(callable)) => {
                match self.call_callable(&callable, args, None, &location) {
                    Ok(value) => Ok(value),
                    Err(Halt::End) => Ok(BrsType::Invalid),
                    Err(Halt::Error(error)) => Err(error),
                }
            }
            Some(other) => Err(RuntimeError::new(
                RuntimeErrorKind::NotCallable(other.kind()),
                location,
            )),
            None => Err(RuntimeError::new(
                RuntimeErrorKind::UndefinedFunction(name.to_string()),
                location,
            )),
        };
        self.report(result)
    }

    /// Result of a module-level outcome. Signals nobody handled are errors;
    /// a top-level `return` ends the module with its value.
    fn finish(outcome: Outcome) -> Result<BrsType, RuntimeError> {
        match outcome {
            Outcome::Completed => Ok(BrsType::Invalid),
            Outcome::Return(value) => Ok(value),
            Outcome::ExitFor(location) => Err(RuntimeError::new(
                RuntimeErrorKind::ExitOutsideLoop("exit for".to_string()),
                location,
            )),
            Outcome::ExitWhile(location) => Err(RuntimeError::new(
                RuntimeErrorKind::ExitOutsideLoop("exit while".to_string()),
                location,
            )),
            Outcome::Goto(label, location) => Err(RuntimeError::new(
                RuntimeErrorKind::LabelNotFound(label),
                location,
            )),
        }
    }

    fn report(&mut self, result: Result<BrsType, RuntimeError>) -> Result<BrsType, RuntimeError> {
        if let Err(error) = self.stdout.flush() {
            tracing::warn!(%error, "failed to flush program output");
        }
        if let Err(error) = &result {
            tracing::debug!(code = error.code(), %error, "uncaught runtime error");
            if let Err(write_error) = writeln!(self.stderr, "{error}") {
                tracing::warn!(error = %write_error, "failed to report runtime error");
            }
        }
        result
    }
}
