use std::fmt;
use std::sync::Arc;

use crate::token::{Lexeme, Literal, Location, Position, Token, keyword};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Character that cannot start any token.
    UnexpectedCharacter(char),
    /// Newline or end of input reached before the closing quote.
    UnterminatedString,
    /// `#` followed by something other than a known directive.
    UnknownDirective(String),
    /// Numeric literal that could not be converted to its value.
    MalformedNumber(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(ch) => write!(f, "unexpected character '{ch}'"),
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::UnknownDirective(name) => {
                write!(f, "unknown preprocessor directive '#{name}'")
            }
            Self::MalformedNumber(text) => write!(f, "malformed numeric literal '{text}'"),
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {location}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub location: Location,
}

/// Output of a scan. `tokens` always ends with exactly one `Eof`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResults {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Scan BrightScript source into a flat token stream.
///
/// Scanning never stops at the first problem: errors are collected
/// alongside whatever tokens could still be produced.
#[must_use]
pub fn scan(source: &str, file: &str) -> ScanResults {
    let results = Lexer::new(source, file).scan();
    tracing::debug!(
        file,
        tokens = results.tokens.len(),
        errors = results.errors.len(),
        "scanned source"
    );
    results
}

struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    file: Arc<str>,
    start: usize,
    start_position: Position,
    pos: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file: &str) -> Self {
        let bytes = source.as_bytes();
        let start = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            3
        } else {
            0
        };
        Self {
            source,
            input: bytes,
            file: Arc::from(file),
            start,
            start_position: Position::new(1, 1),
            pos: start,
            line: 1,
            col: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn scan(mut self) -> ScanResults {
        while !self.at_end() {
            self.start = self.pos;
            self.start_position = self.position();
            self.scan_token();
        }

        self.start = self.pos;
        self.start_position = self.position();
        self.add_token(Lexeme::Eof);

        ScanResults {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn scan_token(&mut self) {
        let Some(ch) = self.advance() else {
            return;
        };

        match ch {
            b'(' => self.add_token(Lexeme::LeftParen),
            b')' => self.add_token(Lexeme::RightParen),
            b'[' => self.add_token(Lexeme::LeftSquare),
            b']' => self.add_token(Lexeme::RightSquare),
            b'{' => self.add_token(Lexeme::LeftBrace),
            b'}' => self.add_token(Lexeme::RightBrace),
            b',' => self.add_token(Lexeme::Comma),
            b':' => self.add_token(Lexeme::Colon),
            b';' => self.add_token(Lexeme::Semicolon),
            b'?' => self.add_token(Lexeme::Print),
            b'^' => self.add_token(Lexeme::Caret),
            b'=' => self.add_token(Lexeme::Equal),
            b'-' => {
                let kind = if self.match_byte(b'=') {
                    Lexeme::MinusEqual
                } else if self.match_byte(b'-') {
                    Lexeme::MinusMinus
                } else {
                    Lexeme::Minus
                };
                self.add_token(kind);
            }
            b'+' => {
                let kind = if self.match_byte(b'=') {
                    Lexeme::PlusEqual
                } else if self.match_byte(b'+') {
                    Lexeme::PlusPlus
                } else {
                    Lexeme::Plus
                };
                self.add_token(kind);
            }
            b'*' => {
                let kind = if self.match_byte(b'=') {
                    Lexeme::StarEqual
                } else {
                    Lexeme::Star
                };
                self.add_token(kind);
            }
            b'/' => {
                let kind = if self.match_byte(b'=') {
                    Lexeme::SlashEqual
                } else {
                    Lexeme::Slash
                };
                self.add_token(kind);
            }
            b'\\' => {
                let kind = if self.match_byte(b'=') {
                    Lexeme::BackslashEqual
                } else {
                    Lexeme::Backslash
                };
                self.add_token(kind);
            }
            b'<' => {
                let kind = if self.match_byte(b'=') {
                    Lexeme::LessEqual
                } else if self.match_byte(b'>') {
                    Lexeme::LessGreater
                } else if self.match_byte(b'<') {
                    if self.match_byte(b'=') {
                        Lexeme::LeftShiftEqual
                    } else {
                        Lexeme::LeftShift
                    }
                } else {
                    Lexeme::Less
                };
                self.add_token(kind);
            }
            b'>' => {
                let kind = if self.match_byte(b'=') {
                    Lexeme::GreaterEqual
                } else if self.match_byte(b'>') {
                    if self.match_byte(b'=') {
                        Lexeme::RightShiftEqual
                    } else {
                        Lexeme::RightShift
                    }
                } else {
                    Lexeme::Greater
                };
                self.add_token(kind);
            }
            b'.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.number(true);
                } else {
                    self.add_token(Lexeme::Dot);
                }
            }
            b' ' | b'\t' | b'\r' => {}
            b'\n' => self.add_token(Lexeme::Newline),
            b'\'' => self.skip_comment(),
            b'"' => self.string(),
            b'#' => self.directive(),
            b'&' => {
                if matches!(self.peek(), Some(b'h' | b'H')) {
                    self.advance();
                    self.hex_number();
                } else {
                    self.error(LexErrorKind::UnexpectedCharacter('&'));
                }
            }
            c if c.is_ascii_digit() => self.number(false),
            c if c.is_ascii_alphabetic() || c == b'_' => self.identifier(),
            _ => {
                // Report the full character rather than a UTF-8 fragment.
                let rest = &self.source[self.start..];
                let unexpected = rest.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                while self.pos < self.input.len() && is_continuation(self.input[self.pos]) {
                    self.pos += 1;
                }
                self.error(LexErrorKind::UnexpectedCharacter(unexpected));
            }
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    const fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.input.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if !is_continuation(ch) {
            self.col += 1;
        }
        Some(ch)
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn lexeme_text(&self) -> &'a str {
        &self.source[self.start..self.pos]
    }

    fn location(&self) -> Location {
        Location::new(
            Arc::clone(&self.file),
            self.start_position,
            self.position(),
        )
    }

    fn add_token(&mut self, kind: Lexeme) {
        self.push_token(kind, None);
    }

    fn push_token(&mut self, kind: Lexeme, literal: Option<Literal>) {
        let text = self.lexeme_text().to_string();
        let location = self.location();
        self.tokens.push(Token {
            kind,
            text,
            literal,
            location,
        });
    }

    fn error(&mut self, kind: LexErrorKind) {
        let location = self.location();
        self.errors.push(LexError { kind, location });
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != b'\n') {
            self.advance();
        }
    }

    fn string(&mut self) {
        let mut value: Vec<u8> = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.error(LexErrorKind::UnterminatedString);
                    return;
                }
                Some(b'"') => {
                    self.advance();
                    // `""` inside a string is an escaped quote
                    if self.peek() == Some(b'"') {
                        self.advance();
                        value.push(b'"');
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        let value = String::from_utf8_lossy(&value).into_owned();
        self.push_token(Lexeme::String, Some(Literal::String(value)));
    }

    #[allow(clippy::cast_possible_truncation)]
    fn number(&mut self, leading_decimal: bool) {
        let mut contains_decimal = leading_decimal;
        let mut digits = usize::from(!leading_decimal);

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            digits += 1;
        }

        if !contains_decimal && self.peek() == Some(b'.') {
            contains_decimal = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                digits += 1;
            }
        }

        let mut exponent = None;
        if let Some(marker @ (b'e' | b'E' | b'd' | b'D')) = self.peek() {
            let signed = matches!(self.peek_next(), Some(b'+' | b'-'));
            let digit_at = if signed { 2 } else { 1 };
            if self
                .input
                .get(self.pos + digit_at)
                .is_some_and(u8::is_ascii_digit)
            {
                exponent = Some(marker.to_ascii_lowercase());
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        // Rust's float parser only knows `e` exponents.
        let numeric_text = self.lexeme_text().replace(['d', 'D'], "e");
        let is_fractional = contains_decimal || exponent.is_some();

        match self.peek() {
            Some(b'#') => {
                self.advance();
                self.double_literal(&numeric_text);
            }
            Some(b'!') => {
                self.advance();
                self.float_literal(&numeric_text);
            }
            Some(b'&') => {
                self.advance();
                let value = if is_fractional {
                    numeric_text.parse::<f64>().ok().map(|v| v.trunc() as i64)
                } else {
                    numeric_text.parse::<i128>().ok().map(|v| v as i64)
                };
                self.numeric_token(Lexeme::LongInteger, value.map(Literal::LongInteger));
            }
            Some(b'%') => {
                self.advance();
                let value = if is_fractional {
                    numeric_text.parse::<f64>().ok().map(|v| v.trunc() as i32)
                } else {
                    numeric_text.parse::<i128>().ok().map(|v| v as i32)
                };
                self.numeric_token(Lexeme::Integer, value.map(Literal::Integer));
            }
            _ if exponent == Some(b'd') || digits >= 10 => self.double_literal(&numeric_text),
            _ if is_fractional => self.float_literal(&numeric_text),
            _ => {
                let value = numeric_text.parse::<i32>().ok().map(Literal::Integer);
                self.numeric_token(Lexeme::Integer, value);
            }
        }
    }

    fn float_literal(&mut self, text: &str) {
        // Round through the double first; the literal's value is the
        // single-precision rounding of its exact decimal reading.
        #[allow(clippy::cast_possible_truncation)]
        let value = text.parse::<f64>().ok().map(|v| Literal::Float(v as f32));
        self.numeric_token(Lexeme::Float, value);
    }

    fn double_literal(&mut self, text: &str) {
        let value = text.parse::<f64>().ok().map(Literal::Double);
        self.numeric_token(Lexeme::Double, value);
    }

    fn numeric_token(&mut self, kind: Lexeme, literal: Option<Literal>) {
        match literal {
            Some(literal) => self.push_token(kind, Some(literal)),
            None => {
                let text = self.lexeme_text().to_string();
                self.error(LexErrorKind::MalformedNumber(text));
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn hex_number(&mut self) {
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.advance();
        }
        let digits = &self.source[digits_start..self.pos];
        let value = u64::from_str_radix(digits, 16).ok();

        if self.match_byte(b'&') {
            let literal = value.map(|v| Literal::LongInteger(v as i64));
            self.numeric_token(Lexeme::LongInteger, literal);
        } else {
            let literal = value.map(|v| Literal::Integer(v as u32 as i32));
            self.numeric_token(Lexeme::Integer, literal);
        }
    }

    fn read_word(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
    }

    fn identifier(&mut self) {
        self.read_word();
        let word = self.lexeme_text();

        let after_dot = self.tokens.last().is_some_and(|t| t.kind == Lexeme::Dot);
        if word.eq_ignore_ascii_case("rem") && !after_dot {
            self.skip_comment();
            return;
        }

        if let Some(kind) = keyword(word) {
            let kind = self.compound_keyword(kind);
            let literal = match kind {
                Lexeme::True => Some(Literal::Boolean(true)),
                Lexeme::False => Some(Literal::Boolean(false)),
                Lexeme::Invalid => Some(Literal::Invalid),
                _ => None,
            };
            self.push_token(kind, literal);
            return;
        }

        if matches!(self.peek(), Some(b'$' | b'%' | b'!' | b'#' | b'&')) {
            self.advance();
        }
        self.add_token(Lexeme::Identifier);
    }

    /// Joins `end if`, `exit for`, `else if`, `for each` and friends into
    /// a single token. Restores the cursor when no second word matches.
    fn compound_keyword(&mut self, first: Lexeme) -> Lexeme {
        if !matches!(
            first,
            Lexeme::End | Lexeme::Exit | Lexeme::Else | Lexeme::For
        ) {
            return first;
        }

        let saved = (self.pos, self.line, self.col);
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.advance();
        }
        let word_start = self.pos;
        self.read_word();
        let second = self.source[word_start..self.pos].to_ascii_lowercase();

        let combined = match (first, second.as_str()) {
            (Lexeme::End, "if") => Some(Lexeme::EndIf),
            (Lexeme::End, "function") => Some(Lexeme::EndFunction),
            (Lexeme::End, "sub") => Some(Lexeme::EndSub),
            (Lexeme::End, "for") => Some(Lexeme::EndFor),
            (Lexeme::End, "while") => Some(Lexeme::EndWhile),
            (Lexeme::End, "try") => Some(Lexeme::EndTry),
            (Lexeme::Exit, "for") => Some(Lexeme::ExitFor),
            (Lexeme::Exit, "while") => Some(Lexeme::ExitWhile),
            (Lexeme::Else, "if") => Some(Lexeme::ElseIf),
            (Lexeme::For, "each") => Some(Lexeme::ForEach),
            _ => None,
        };

        combined.unwrap_or_else(|| {
            (self.pos, self.line, self.col) = saved;
            first
        })
    }

    fn directive(&mut self) {
        let word_start = self.pos;
        self.read_word();
        let name = self.source[word_start..self.pos].to_ascii_lowercase();

        let kind = match name.as_str() {
            "const" => Lexeme::HashConst,
            "if" => Lexeme::HashIf,
            "elseif" => Lexeme::HashElseIf,
            "endif" => Lexeme::HashEndIf,
            "error" => Lexeme::HashError,
            "else" => {
                if self.match_following_word("if") {
                    Lexeme::HashElseIf
                } else {
                    Lexeme::HashElse
                }
            }
            "end" if self.match_following_word("if") => Lexeme::HashEndIf,
            _ => {
                self.error(LexErrorKind::UnknownDirective(name));
                return;
            }
        };
        self.add_token(kind);

        if kind == Lexeme::HashError {
            self.error_message();
        }
    }

    /// Consumes ` <word>` when the next word equals `expected`.
    fn match_following_word(&mut self, expected: &str) -> bool {
        let saved = (self.pos, self.line, self.col);
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.advance();
        }
        let word_start = self.pos;
        self.read_word();
        if self.source[word_start..self.pos].eq_ignore_ascii_case(expected) {
            true
        } else {
            (self.pos, self.line, self.col) = saved;
            false
        }
    }

    fn error_message(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.advance();
        }
        self.start = self.pos;
        self.start_position = self.position();
        self.skip_comment();

        let message = self.lexeme_text().trim_end().to_string();
        self.push_token(Lexeme::HashErrorMessage, Some(Literal::String(message)));
    }
}

const fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Lexeme> {
        scan(source, "test.brs")
            .tokens
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![Lexeme::Eof]);
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("<= >= <> << >> < >"),
            vec![
                Lexeme::LessEqual,
                Lexeme::GreaterEqual,
                Lexeme::LessGreater,
                Lexeme::LeftShift,
                Lexeme::RightShift,
                Lexeme::Less,
                Lexeme::Greater,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn compound_keywords_join() {
        assert_eq!(
            kinds("end if\nelse if\nexit while\nfor each\nendfunction"),
            vec![
                Lexeme::EndIf,
                Lexeme::Newline,
                Lexeme::ElseIf,
                Lexeme::Newline,
                Lexeme::ExitWhile,
                Lexeme::Newline,
                Lexeme::ForEach,
                Lexeme::Newline,
                Lexeme::EndFunction,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn end_alone_stays_end() {
        assert_eq!(
            kinds("end\nfoo"),
            vec![Lexeme::End, Lexeme::Newline, Lexeme::Identifier, Lexeme::Eof]
        );
    }

    #[test]
    fn rem_is_a_comment_but_remove_is_not() {
        assert_eq!(kinds("REM hello there"), vec![Lexeme::Eof]);
        assert_eq!(kinds("remove"), vec![Lexeme::Identifier, Lexeme::Eof]);
    }

    #[test]
    fn rem_after_dot_is_a_member_name() {
        assert_eq!(
            kinds("m.rem = 1 ' note"),
            vec![
                Lexeme::Identifier,
                Lexeme::Dot,
                Lexeme::Identifier,
                Lexeme::Equal,
                Lexeme::Integer,
                Lexeme::Eof
            ]
        );
    }

    #[test]
    fn type_designators_stay_on_identifiers() {
        let tokens = scan("name$ = count%", "test.brs").tokens;
        assert_eq!(tokens[0].text, "name$");
        assert_eq!(tokens[2].text, "count%");
    }

    #[test]
    fn hex_literals() {
        let tokens = scan("&hFF &h1F&", "test.brs").tokens;
        assert_eq!(tokens[0].literal, Some(Literal::Integer(255)));
        assert_eq!(tokens[1].kind, Lexeme::LongInteger);
        assert_eq!(tokens[1].literal, Some(Literal::LongInteger(31)));
    }

    #[test]
    fn hash_error_captures_message() {
        let tokens = scan("#error  nope, not here \n", "test.brs").tokens;
        assert_eq!(tokens[0].kind, Lexeme::HashError);
        assert_eq!(tokens[1].kind, Lexeme::HashErrorMessage);
        assert_eq!(
            tokens[1].literal,
            Some(Literal::String("nope, not here".to_string()))
        );
        assert_eq!(tokens[2].kind, Lexeme::Newline);
    }

    #[test]
    fn unterminated_string_reports_and_continues() {
        let results = scan("x = \"abc\ny = 1", "test.brs");
        assert_eq!(results.errors.len(), 1);
        assert_eq!(results.errors[0].kind, LexErrorKind::UnterminatedString);
        assert_eq!(results.errors[0].location.start.line, 1);
        assert!(results.tokens.iter().any(|t| t.text == "y"));
    }

    #[test]
    fn locations_span_tokens() {
        let tokens = scan("foo = 12", "test.brs").tokens;
        assert_eq!(tokens[0].location.start, Position::new(1, 1));
        assert_eq!(tokens[0].location.end, Position::new(1, 4));
        assert_eq!(tokens[2].location.start, Position::new(1, 7));
        assert_eq!(tokens[2].location.end, Position::new(1, 9));
    }
}
