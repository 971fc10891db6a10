//! Recursive-descent parser turning a preprocessed token stream into
//! statements.
//!
//! Errors are collected rather than returned on first sight: a broken
//! statement is reported, the parser skips to the next statement
//! boundary (newline or `:`), and parsing carries on.

use std::fmt;

use crate::ast::Statement;
use crate::token::{Lexeme, Location, Token};

mod expression;
mod statement;

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific construct was required but something else was found.
    Expected { expected: String, found: String },
    /// Token that cannot start or continue a statement here.
    UnexpectedToken(String),
    /// `x++++` or `x++--`.
    ConsecutiveIncrement,
    /// `f()++`.
    IncrementOnCall,
    /// `++`/`--` on anything other than a variable, dotted or indexed get.
    IncrementOnNonAssignable,
    /// `library` after other statements.
    LibraryNotAtTop,
    /// Expression used as a statement without being a call.
    ExpressionNotStatement,
    /// `catch` without a bound variable name.
    MissingCatchVariable,
    /// Left side of `=` that cannot be assigned to.
    InvalidAssignmentTarget,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::UnexpectedToken(found) => write!(f, "unexpected {found}"),
            Self::ConsecutiveIncrement => {
                write!(f, "consecutive increment/decrement operators are not allowed")
            }
            Self::IncrementOnCall => write!(
                f,
                "increment/decrement operators are not allowed on the result of a function call"
            ),
            Self::IncrementOnNonAssignable => write!(
                f,
                "increment/decrement operators require a variable, property, or index target"
            ),
            Self::LibraryNotAtTop => {
                write!(f, "library statements must appear at the top of a file")
            }
            Self::ExpressionNotStatement => {
                write!(f, "expected statement or function call, found an expression")
            }
            Self::MissingCatchVariable => {
                write!(f, "expected a variable name after 'catch'")
            }
            Self::InvalidAssignmentTarget => write!(f, "invalid assignment target"),
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {location}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: Location,
}

/// Output of a parse: every statement that parsed cleanly plus every
/// error encountered along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResults {
    pub statements: Vec<Statement>,
    pub errors: Vec<ParseError>,
}

type ParseResult<T> = Result<T, ParseError>;

/// Parse a token stream (normally the preprocessor's output) into a
/// statement list.
#[must_use]
pub fn parse(tokens: &[Token]) -> ParseResults {
    let results = Parser::new(tokens).parse();
    tracing::debug!(
        statements = results.statements.len(),
        errors = results.errors.len(),
        "parsed tokens"
    );
    results
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<ParseError>,
    eof: Token,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let eof_location = tokens
            .last()
            .map_or_else(Location::internal, |t| t.location.clone());
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            eof: Token {
                kind: Lexeme::Eof,
                text: String::new(),
                literal: None,
                location: eof_location,
            },
        }
    }

    fn parse(mut self) -> ParseResults {
        let mut statements = Vec::new();
        let mut library_allowed = true;

        loop {
            self.skip_separators();
            if self.is_at_end() {
                break;
            }

            let result = if self.check(Lexeme::Library) {
                if library_allowed {
                    self.library_statement()
                } else {
                    Err(self.error_at_current(ParseErrorKind::LibraryNotAtTop))
                }
            } else {
                library_allowed = false;
                self.declaration()
            };

            match result.and_then(|statement| {
                self.statement_separator()?;
                Ok(statement)
            }) {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }

        ParseResults {
            statements,
            errors: self.errors,
        }
    }

    // -- cursor helpers --

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    fn previous(&self) -> &Token {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .unwrap_or(&self.eof)
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == Lexeme::Eof
    }

    fn check(&self, kind: Lexeme) -> bool {
        self.peek().kind == kind
    }

    fn check_any(&self, kinds: &[Lexeme]) -> bool {
        kinds.contains(&self.peek().kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn match_any(&mut self, kinds: &[Lexeme]) -> bool {
        if self.check_any(kinds) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: Lexeme, expected: &str) -> ParseResult<Token> {
        self.consume_any(&[kind], expected)
    }

    fn consume_any(&mut self, kinds: &[Lexeme], expected: &str) -> ParseResult<Token> {
        if self.check_any(kinds) {
            Ok(self.advance().clone())
        } else {
            Err(self.expected(expected))
        }
    }

    /// Location from `start` through the most recently consumed token.
    fn span_from(&self, start: &Location) -> Location {
        start.to(&self.previous().location)
    }

    // -- error helpers --

    fn describe(token: &Token) -> String {
        match token.kind {
            Lexeme::Eof => "end of file".to_string(),
            Lexeme::Newline => "end of line".to_string(),
            _ => format!("'{}'", token.text),
        }
    }

    fn expected(&self, expected: &str) -> ParseError {
        self.error_at_current(ParseErrorKind::Expected {
            expected: expected.to_string(),
            found: Self::describe(self.peek()),
        })
    }

    fn error_at_current(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            location: self.peek().location.clone(),
        }
    }

    // -- statement boundaries --

    fn skip_separators(&mut self) {
        while self.match_any(&[Lexeme::Newline, Lexeme::Colon]) {}
    }

    fn skip_newlines(&mut self) {
        while self.match_any(&[Lexeme::Newline]) {}
    }

    /// A statement must be followed by a newline, `:`, or end of input.
    fn statement_separator(&mut self) -> ParseResult<()> {
        if self.match_any(&[Lexeme::Newline, Lexeme::Colon]) || self.is_at_end() {
            Ok(())
        } else {
            Err(self.expected("newline or ':' after statement"))
        }
    }

    fn consume_newline(&mut self) -> ParseResult<()> {
        if self.match_any(&[Lexeme::Newline]) || self.is_at_end() {
            Ok(())
        } else {
            Err(self.expected("newline"))
        }
    }

    /// Skip to the start of the next statement.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.match_any(&[Lexeme::Newline, Lexeme::Colon]) {
                return;
            }
            self.advance();
        }
    }
}
