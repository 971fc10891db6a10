#![allow(dead_code)]

use std::collections::HashMap;

use brightscript_rs::{
    BrsType, Error, ExecutionOptions, Interpreter, Lexeme, OutputBuffer, RuntimeError, Statement,
    execute_source, parse_source, scan,
};

/// Token kinds of `source`, including the trailing `Eof`.
pub fn kinds(source: &str) -> Vec<Lexeme> {
    scan(source, "test.brs").tokens.iter().map(|t| t.kind).collect()
}

/// Parse with no preprocessor constants, panicking on any error.
pub fn parse_ok(source: &str) -> Vec<Statement> {
    parse_source(source, "test.brs", &HashMap::new())
        .unwrap_or_else(|e| panic!("failed to parse:\n{source}\n--- error ---\n{e}"))
}

/// An interpreter whose `print` output and error report are captured.
pub struct Harness {
    pub interpreter: Interpreter,
    pub stdout: OutputBuffer,
    pub stderr: OutputBuffer,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(ExecutionOptions::default())
    }

    pub fn with_options(options: ExecutionOptions) -> Self {
        let stdout = OutputBuffer::new();
        let stderr = OutputBuffer::new();
        let interpreter = Interpreter::with_output(
            options,
            Box::new(stdout.clone()),
            Box::new(stderr.clone()),
        );
        Self {
            interpreter,
            stdout,
            stderr,
        }
    }

    pub fn run(&mut self, source: &str) -> Result<BrsType, Error> {
        execute_source(&mut self.interpreter, source)
    }
}

/// Run `source` and return what it printed, panicking on any error.
pub fn output_of(source: &str) -> String {
    let mut harness = Harness::new();
    if let Err(e) = harness.run(source) {
        panic!("program failed:\n{source}\n--- error ---\n{e}");
    }
    harness.stdout.contents()
}

/// Run `source` and return its uncaught runtime error.
pub fn runtime_error(source: &str) -> RuntimeError {
    match Harness::new().run(source) {
        Err(Error::Runtime(e)) => e,
        Err(other) => panic!("expected a runtime error, got {other}"),
        Ok(value) => panic!("expected a runtime error, program returned {value}"),
    }
}
