use std::fmt;
use std::sync::Arc;

/// A line/column pair. Lines and columns are both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Source range for error reporting and tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: Arc<str>,
    pub start: Position,
    pub end: Position,
}

impl Location {
    #[must_use]
    pub const fn new(file: Arc<str>, start: Position, end: Position) -> Self {
        Self { file, start, end }
    }

    /// Location covering `self` through `other`.
    #[must_use]
    pub fn to(&self, other: &Self) -> Self {
        Self {
            file: Arc::clone(&self.file),
            start: self.start,
            end: other.end,
        }
    }

    /// Placeholder location for values created outside any source file.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            file: Arc::from("(internal)"),
            start: Position::new(0, 0),
            end: Position::new(0, 0),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start.line, self.start.column)
    }
}

/// Typed value carried by literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Invalid,
    Boolean(bool),
    String(String),
    Integer(i32),
    LongInteger(i64),
    Float(f32),
    Double(f64),
}

/// Lexical categories produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lexeme {
    // punctuation
    LeftParen,
    RightParen,
    LeftSquare,
    RightSquare,
    LeftBrace,
    RightBrace,
    Dot,
    Comma,
    Colon,
    Semicolon,

    // operators
    Caret,
    Minus,
    MinusEqual,
    MinusMinus,
    Plus,
    PlusEqual,
    PlusPlus,
    Star,
    StarEqual,
    Slash,
    SlashEqual,
    Backslash,
    BackslashEqual,
    LeftShift,
    LeftShiftEqual,
    RightShift,
    RightShiftEqual,

    // comparators
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    LessGreater,

    // literals
    Identifier,
    String,
    Integer,
    LongInteger,
    Float,
    Double,

    // preprocessor
    HashConst,
    HashIf,
    HashElseIf,
    HashElse,
    HashEndIf,
    HashError,
    HashErrorMessage,

    // keywords
    And,
    Catch,
    Dim,
    Each,
    Else,
    ElseIf,
    End,
    EndFor,
    EndFunction,
    EndIf,
    EndSub,
    EndTry,
    EndWhile,
    Exit,
    ExitFor,
    ExitWhile,
    False,
    For,
    ForEach,
    Function,
    Goto,
    If,
    In,
    Invalid,
    Library,
    Mod,
    Next,
    Not,
    Or,
    Print,
    Return,
    Step,
    Stop,
    Sub,
    Then,
    Throw,
    To,
    True,
    Try,
    While,

    // structural
    Newline,
    Eof,
}

impl Lexeme {
    /// Whether this lexeme is a reserved word that can still appear as
    /// a property name after `.` or as an associative-array key.
    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Catch
                | Self::Dim
                | Self::Each
                | Self::Else
                | Self::ElseIf
                | Self::End
                | Self::EndFor
                | Self::EndFunction
                | Self::EndIf
                | Self::EndSub
                | Self::EndTry
                | Self::EndWhile
                | Self::Exit
                | Self::ExitFor
                | Self::ExitWhile
                | Self::False
                | Self::For
                | Self::ForEach
                | Self::Function
                | Self::Goto
                | Self::If
                | Self::In
                | Self::Invalid
                | Self::Library
                | Self::Mod
                | Self::Next
                | Self::Not
                | Self::Or
                | Self::Print
                | Self::Return
                | Self::Step
                | Self::Stop
                | Self::Sub
                | Self::Then
                | Self::Throw
                | Self::To
                | Self::True
                | Self::Try
                | Self::While
        )
    }

    #[must_use]
    pub const fn is_preprocessor_directive(self) -> bool {
        matches!(
            self,
            Self::HashConst
                | Self::HashIf
                | Self::HashElseIf
                | Self::HashElse
                | Self::HashEndIf
                | Self::HashError
        )
    }
}

/// Reserved-word lookup, case-insensitive. Single-word spellings of
/// compound keywords (`endif`, `exitfor`, ...) are included; the
/// two-word spellings are assembled by the lexer.
#[must_use]
pub fn keyword(word: &str) -> Option<Lexeme> {
    let lexeme = match word.to_ascii_lowercase().as_str() {
        "and" => Lexeme::And,
        "catch" => Lexeme::Catch,
        "dim" => Lexeme::Dim,
        "each" => Lexeme::Each,
        "else" => Lexeme::Else,
        "elseif" => Lexeme::ElseIf,
        "end" => Lexeme::End,
        "endfor" => Lexeme::EndFor,
        "endfunction" => Lexeme::EndFunction,
        "endif" => Lexeme::EndIf,
        "endsub" => Lexeme::EndSub,
        "endtry" => Lexeme::EndTry,
        "endwhile" => Lexeme::EndWhile,
        "exit" => Lexeme::Exit,
        "exitfor" => Lexeme::ExitFor,
        "exitwhile" => Lexeme::ExitWhile,
        "false" => Lexeme::False,
        "for" => Lexeme::For,
        "foreach" => Lexeme::ForEach,
        "function" => Lexeme::Function,
        "goto" => Lexeme::Goto,
        "if" => Lexeme::If,
        "in" => Lexeme::In,
        "invalid" => Lexeme::Invalid,
        "library" => Lexeme::Library,
        "mod" => Lexeme::Mod,
        "next" => Lexeme::Next,
        "not" => Lexeme::Not,
        "or" => Lexeme::Or,
        "print" => Lexeme::Print,
        "return" => Lexeme::Return,
        "step" => Lexeme::Step,
        "stop" => Lexeme::Stop,
        "sub" => Lexeme::Sub,
        "then" => Lexeme::Then,
        "throw" => Lexeme::Throw,
        "to" => Lexeme::To,
        "true" => Lexeme::True,
        "try" => Lexeme::Try,
        "while" => Lexeme::While,
        _ => return None,
    };
    Some(lexeme)
}

/// A single token with its kind, source text, literal value, and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: Lexeme,
    pub text: String,
    pub literal: Option<Literal>,
    pub location: Location,
}

impl Token {
    /// Lowercased text, used for case-insensitive name comparisons.
    #[must_use]
    pub fn lower(&self) -> String {
        self.text.to_ascii_lowercase()
    }
}
