//! BrightScript lexer, preprocessor, parser, and interpreter.
//!
//! Source text flows through four stages: [`lexer::scan`] turns it into
//! tokens, [`preprocessor::preprocess`] resolves `#if`/`#const` blocks,
//! [`parser::parse`] builds the AST, and an [`Interpreter`] walks it.
//! Each stage collects every error it can recover from before giving up.
//!
//! # Quick start
//!
//! ```
//! use brightscript_rs::{ExecutionOptions, Interpreter, OutputBuffer, execute_source};
//!
//! let stdout = OutputBuffer::new();
//! let mut interpreter = Interpreter::with_output(
//!     ExecutionOptions::default(),
//!     Box::new(stdout.clone()),
//!     Box::new(std::io::sink()),
//! );
//! execute_source(&mut interpreter, "print \"sum:\"; 1 + 2").unwrap();
//! assert_eq!(stdout.contents(), "sum:3\n");
//! ```
//!
//! ## Parse only
//!
//! ```
//! use std::collections::HashMap;
//! use brightscript_rs::{Statement, parse_source};
//!
//! let statements = parse_source("x = 1\nprint x", "demo.brs", &HashMap::new()).unwrap();
//! assert!(matches!(statements[0], Statement::Assignment { .. }));
//! ```

// Allow noisy pedantic lints that don't add value for
// an interpreter crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

use std::collections::HashMap;
use std::fmt;

pub mod ast;
pub mod config;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod stdlib;
pub mod token;
pub mod value;

pub use ast::{Expression, Statement};
pub use config::{ExecutionOptions, Manifest, ManifestError};
pub use interpreter::{Interpreter, OutputBuffer, RuntimeError, RuntimeErrorKind};
pub use lexer::{LexError, LexErrorKind, scan};
pub use parser::{ParseError, ParseErrorKind, parse};
pub use preprocessor::{PreprocessError, PreprocessErrorKind, preprocess};
pub use token::{Lexeme, Location, Token};
pub use value::{BrsType, ValueKind};

/// Unified error type covering every pipeline stage.
///
/// The first three stages recover and keep going, so they carry the full
/// list; display shows the first error and how many followed it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{}", summarize(.0))]
    Lex(Vec<LexError>),
    #[error("{}", summarize(.0))]
    Preprocess(Vec<PreprocessError>),
    #[error("{}", summarize(.0))]
    Parse(Vec<ParseError>),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

impl From<Vec<LexError>> for Error {
    fn from(errors: Vec<LexError>) -> Self {
        Self::Lex(errors)
    }
}

impl From<Vec<PreprocessError>> for Error {
    fn from(errors: Vec<PreprocessError>) -> Self {
        Self::Preprocess(errors)
    }
}

impl From<Vec<ParseError>> for Error {
    fn from(errors: Vec<ParseError>) -> Self {
        Self::Parse(errors)
    }
}

fn summarize<E: fmt::Display>(errors: &[E]) -> String {
    match errors {
        [] => "no errors".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

fn check<E>(errors: Vec<E>) -> Result<(), Error>
where
    Error: From<Vec<E>>,
{
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::from(errors))
    }
}

/// Scan, preprocess, and parse `source` in one step. `file` names the
/// source in error locations.
pub fn parse_source(
    source: &str,
    file: &str,
    bs_const: &HashMap<String, bool>,
) -> Result<Vec<Statement>, Error> {
    let scanned = scan(source, file);
    check(scanned.errors)?;

    let filtered = preprocess(&scanned.tokens, bs_const);
    check(filtered.errors)?;

    let parsed = parse(&filtered.processed_tokens);
    check(parsed.errors)?;
    Ok(parsed.statements)
}

/// Parse `source` with the interpreter's own file name and constants, then
/// execute it.
pub fn execute_source(interpreter: &mut Interpreter, source: &str) -> Result<BrsType, Error> {
    let options = interpreter.options();
    let statements = parse_source(source, &options.file, &options.bs_const)?;
    Ok(interpreter.exec(&statements)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_the_rest() {
        assert_eq!(summarize::<String>(&[]), "no errors");
        assert_eq!(summarize(&["a".to_string()]), "a");
        assert_eq!(summarize(&["a", "b", "c"]), "a (and 2 more)");
    }

    #[test]
    fn stages_stop_at_the_first_failing_one() {
        let error = parse_source("x = \"open", "bad.brs", &HashMap::new()).unwrap_err();
        assert!(matches!(error, Error::Lex(_)));

        let error = parse_source("#if nope\n#end if", "bad.brs", &HashMap::new()).unwrap_err();
        assert!(matches!(error, Error::Preprocess(_)));

        let error = parse_source("x = ", "bad.brs", &HashMap::new()).unwrap_err();
        assert!(matches!(error, Error::Parse(_)));
    }
}
