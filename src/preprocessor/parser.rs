use crate::token::{Lexeme, Literal, Token};

use super::chunk::{Chunk, ElseIfChunk, IfChunk};
use super::{PreprocessError, PreprocessErrorKind};

/// Output of the chunk-building pass. On failure `chunks` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkResults {
    pub chunks: Vec<Chunk>,
    pub errors: Vec<PreprocessError>,
}

/// Group a raw token stream into a tree of chunks.
///
/// A malformed directive degrades to "no chunks" plus the error rather
/// than a partial tree.
#[must_use]
pub fn parse(tokens: &[Token]) -> ChunkResults {
    let mut parser = ChunkParser { tokens, pos: 0 };
    match parser.chunks(false) {
        Ok(chunks) => {
            tracing::trace!(chunks = chunks.len(), "built preprocessor chunks");
            ChunkResults {
                chunks,
                errors: Vec::new(),
            }
        }
        Err(error) => ChunkResults {
            chunks: Vec::new(),
            errors: vec![error],
        },
    }
}

struct ChunkParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl ChunkParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Lexeme {
        self.peek().map_or(Lexeme::Eof, |t| t.kind)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, kind: PreprocessErrorKind) -> PreprocessError {
        let location = self
            .peek()
            .or_else(|| self.tokens.last())
            .map_or_else(crate::token::Location::internal, |t| t.location.clone());
        PreprocessError { kind, location }
    }

    /// Parse chunks until end of input, or until a branch-closing
    /// directive when `nested` is set.
    fn chunks(&mut self, nested: bool) -> Result<Vec<Chunk>, PreprocessError> {
        let mut chunks = Vec::new();
        loop {
            match self.peek_kind() {
                Lexeme::Eof => {
                    if nested {
                        return Err(self.error_here(PreprocessErrorKind::UnterminatedIf));
                    }
                    break;
                }
                Lexeme::HashConst => chunks.push(self.declaration()?),
                Lexeme::HashIf => chunks.push(self.if_chunk()?),
                Lexeme::HashError => chunks.push(self.error_chunk()?),
                Lexeme::HashElseIf | Lexeme::HashElse | Lexeme::HashEndIf => {
                    if nested {
                        break;
                    }
                    let text = self.peek().map(|t| t.text.clone()).unwrap_or_default();
                    return Err(self.error_here(PreprocessErrorKind::MalformedDirective(
                        format!("'{text}' without a matching '#if'"),
                    )));
                }
                _ => chunks.push(self.brightscript()),
            }
        }
        Ok(chunks)
    }

    fn brightscript(&mut self) -> Chunk {
        let mut tokens = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind == Lexeme::Eof || token.kind.is_preprocessor_directive() {
                break;
            }
            tokens.push(token.clone());
            self.pos += 1;
        }
        Chunk::BrightScript(tokens)
    }

    fn expect(&mut self, accepted: &[Lexeme], what: &str) -> Result<Token, PreprocessError> {
        match self.peek() {
            Some(token) if accepted.contains(&token.kind) => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            Some(token) => {
                let found = token.text.clone();
                Err(self.error_here(PreprocessErrorKind::MalformedDirective(format!(
                    "expected {what}, found '{}'",
                    found.escape_default()
                ))))
            }
            None => Err(self.error_here(PreprocessErrorKind::MalformedDirective(format!(
                "expected {what}"
            )))),
        }
    }

    /// Directives own their whole line, terminator included.
    fn end_of_directive(&mut self) -> Result<(), PreprocessError> {
        match self.peek_kind() {
            Lexeme::Newline => {
                self.advance();
                Ok(())
            }
            Lexeme::Eof => Ok(()),
            _ => self
                .expect(&[Lexeme::Newline], "end of line after directive")
                .map(|_| ()),
        }
    }

    fn condition(&mut self) -> Result<Token, PreprocessError> {
        self.expect(
            &[Lexeme::True, Lexeme::False, Lexeme::Identifier],
            "'true', 'false', or a #const name",
        )
    }

    fn declaration(&mut self) -> Result<Chunk, PreprocessError> {
        self.advance();
        let name = self.expect(&[Lexeme::Identifier], "a #const name")?;
        self.expect(&[Lexeme::Equal], "'='")?;
        let value = self.condition()?;
        self.end_of_directive()?;
        Ok(Chunk::Declaration { name, value })
    }

    fn if_chunk(&mut self) -> Result<Chunk, PreprocessError> {
        let start = self
            .advance()
            .map(|t| t.location.clone())
            .unwrap_or_else(crate::token::Location::internal);
        let condition = self.condition()?;
        self.end_of_directive()?;
        let then_chunks = self.chunks(true)?;

        let mut else_ifs = Vec::new();
        while self.peek_kind() == Lexeme::HashElseIf {
            self.advance();
            let condition = self.condition()?;
            self.end_of_directive()?;
            let then_chunks = self.chunks(true)?;
            else_ifs.push(ElseIfChunk {
                condition,
                then_chunks,
            });
        }

        let else_chunks = if self.peek_kind() == Lexeme::HashElse {
            self.advance();
            self.end_of_directive()?;
            Some(self.chunks(true)?)
        } else {
            None
        };

        let end = self.expect(&[Lexeme::HashEndIf], "'#end if'")?;
        self.end_of_directive()?;

        Ok(Chunk::If(IfChunk {
            condition,
            then_chunks,
            else_ifs,
            else_chunks,
            location: start.to(&end.location),
        }))
    }

    fn error_chunk(&mut self) -> Result<Chunk, PreprocessError> {
        let location = self
            .advance()
            .map(|t| t.location.clone())
            .unwrap_or_else(crate::token::Location::internal);
        let message = if self.peek_kind() == Lexeme::HashErrorMessage {
            match self.advance().and_then(|t| t.literal.clone()) {
                Some(Literal::String(message)) => message,
                _ => String::new(),
            }
        } else {
            String::new()
        };
        self.end_of_directive()?;
        Ok(Chunk::Error { message, location })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::scan;

    fn chunks_of(source: &str) -> ChunkResults {
        parse(&scan(source, "test.brs").tokens)
    }

    #[test]
    fn plain_tokens_form_one_chunk() {
        let results = chunks_of("x = 1\nprint x\n");
        assert!(results.errors.is_empty());
        assert_eq!(results.chunks.len(), 1);
        assert!(matches!(results.chunks[0], Chunk::BrightScript(_)));
    }

    #[test]
    fn nested_if_tree() {
        let results =
            chunks_of("#if a\n#if b\nx = 1\n#end if\n#else if c\ny = 2\n#else\nz = 3\n#end if\n");
        assert!(results.errors.is_empty());
        let Chunk::If(chunk) = &results.chunks[0] else {
            panic!("expected an #if chunk");
        };
        assert!(matches!(chunk.then_chunks[0], Chunk::If(_)));
        assert_eq!(chunk.else_ifs.len(), 1);
        assert!(chunk.else_chunks.is_some());
    }

    #[test]
    fn missing_end_if_degrades_to_no_chunks() {
        let results = chunks_of("#if a\nx = 1\n");
        assert!(results.chunks.is_empty());
        assert_eq!(results.errors[0].kind, PreprocessErrorKind::UnterminatedIf);
    }

    #[test]
    fn stray_else_is_malformed() {
        let results = chunks_of("#else\n");
        assert!(matches!(
            results.errors[0].kind,
            PreprocessErrorKind::MalformedDirective(_)
        ));
    }
}
