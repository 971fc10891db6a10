use std::collections::HashMap;

use crate::token::{Lexeme, Location, Token};

use super::chunk::{Chunk, IfChunk};
use super::{PreprocessError, PreprocessErrorKind};

/// Output of the filtering pass. `processed_tokens` ends with one `Eof`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResults {
    pub processed_tokens: Vec<Token>,
    pub errors: Vec<PreprocessError>,
}

/// Evaluate conditional-compilation chunks against `bs_const` and keep
/// only the tokens of taken branches.
///
/// The first error aborts the pass: the returned token stream is then
/// just `Eof`, since nothing after the failure can be trusted.
#[must_use]
pub fn filter(chunks: &[Chunk], bs_const: &HashMap<String, bool>) -> FilterResults {
    let mut filter = Filter {
        constants: bs_const
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), *value))
            .collect(),
        tokens: Vec::new(),
    };

    let result = chunks.iter().try_for_each(|chunk| filter.visit(chunk));
    let (mut processed_tokens, errors) = match result {
        Ok(()) => (filter.tokens, Vec::new()),
        Err(error) => (Vec::new(), vec![error]),
    };

    let eof_location = processed_tokens.last().map_or_else(Location::internal, |t| {
        Location::new(t.location.file.clone(), t.location.end, t.location.end)
    });
    processed_tokens.push(Token {
        kind: Lexeme::Eof,
        text: String::new(),
        literal: None,
        location: eof_location,
    });

    FilterResults {
        processed_tokens,
        errors,
    }
}

struct Filter {
    constants: HashMap<String, bool>,
    tokens: Vec<Token>,
}

impl Filter {
    fn visit(&mut self, chunk: &Chunk) -> Result<(), PreprocessError> {
        match chunk {
            Chunk::BrightScript(tokens) => {
                self.tokens.extend(tokens.iter().cloned());
                Ok(())
            }
            Chunk::Declaration { name, value } => self.declare(name, value),
            Chunk::If(chunk) => self.visit_if(chunk),
            Chunk::Error { message, location } => Err(PreprocessError {
                kind: PreprocessErrorKind::UserError(message.clone()),
                location: location.clone(),
            }),
        }
    }

    fn declare(&mut self, name: &Token, value: &Token) -> Result<(), PreprocessError> {
        let key = name.lower();
        if self.constants.contains_key(&key) {
            return Err(PreprocessError {
                kind: PreprocessErrorKind::ConstRedeclared(name.text.clone()),
                location: name.location.clone(),
            });
        }
        let value = self.evaluate(value)?;
        tracing::trace!(name = %key, value, "declared #const");
        self.constants.insert(key, value);
        Ok(())
    }

    fn evaluate(&self, condition: &Token) -> Result<bool, PreprocessError> {
        match condition.kind {
            Lexeme::True => Ok(true),
            Lexeme::False => Ok(false),
            _ => self
                .constants
                .get(&condition.lower())
                .copied()
                .ok_or_else(|| PreprocessError {
                    kind: PreprocessErrorKind::UndefinedConst(condition.text.clone()),
                    location: condition.location.clone(),
                }),
        }
    }

    fn visit_if(&mut self, chunk: &IfChunk) -> Result<(), PreprocessError> {
        if self.evaluate(&chunk.condition)? {
            return self.visit_all(&chunk.then_chunks);
        }

        for else_if in &chunk.else_ifs {
            if self.evaluate(&else_if.condition)? {
                return self.visit_all(&else_if.then_chunks);
            }
        }

        match &chunk.else_chunks {
            Some(chunks) => self.visit_all(chunks),
            None => Ok(()),
        }
    }

    fn visit_all(&mut self, chunks: &[Chunk]) -> Result<(), PreprocessError> {
        chunks.iter().try_for_each(|chunk| self.visit(chunk))
    }
}
