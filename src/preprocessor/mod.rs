//! Conditional compilation: `#const`, `#if`/`#else if`/`#else`/`#end if`
//! and `#error`, evaluated before parsing.

use std::collections::HashMap;
use std::fmt;

use crate::token::{Location, Token};

pub mod chunk;
pub mod filter;
pub mod parser;

pub use chunk::{Chunk, ElseIfChunk, IfChunk};
pub use filter::{FilterResults, filter};
pub use parser::{ChunkResults, parse};

/// Classifies a preprocessor error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessErrorKind {
    /// A condition or `#const` value names a constant that was never defined.
    UndefinedConst(String),
    /// `#const` for a name that already exists.
    ConstRedeclared(String),
    /// Directive with missing or unexpected parts.
    MalformedDirective(String),
    /// `#if` without a closing `#end if`.
    UnterminatedIf,
    /// A `#error` directive in a taken branch.
    UserError(String),
}

impl fmt::Display for PreprocessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedConst(name) => {
                write!(f, "attempting to reference undefined #const '{name}'")
            }
            Self::ConstRedeclared(name) => {
                write!(f, "attempting to re-declare #const '{name}'")
            }
            Self::MalformedDirective(detail) => write!(f, "malformed directive: {detail}"),
            Self::UnterminatedIf => write!(f, "'#if' without a matching '#end if'"),
            Self::UserError(message) => write!(f, "#error {message}"),
        }
    }
}

/// Error produced while building or evaluating preprocessor chunks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {location}")]
pub struct PreprocessError {
    pub kind: PreprocessErrorKind,
    pub location: Location,
}

/// Run both preprocessor passes over a raw token stream.
#[must_use]
pub fn preprocess(tokens: &[Token], bs_const: &HashMap<String, bool>) -> FilterResults {
    let ChunkResults { chunks, errors } = parse(tokens);
    if !errors.is_empty() {
        return FilterResults {
            processed_tokens: filter(&[], bs_const).processed_tokens,
            errors,
        };
    }

    let results = filter(&chunks, bs_const);
    tracing::debug!(
        input = tokens.len(),
        output = results.processed_tokens.len(),
        errors = results.errors.len(),
        "preprocessed tokens"
    );
    results
}
