use crate::token::{Location, Token};

/// A preprocessor-level grouping of tokens or a conditional-compilation
/// directive. Chunks only live for the duration of one preprocessing
/// pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// A run of ordinary tokens, newlines included.
    BrightScript(Vec<Token>),
    /// `#const name = value`.
    Declaration { name: Token, value: Token },
    /// `#if` / `#else if` / `#else` / `#end if`.
    If(IfChunk),
    /// `#error message`.
    Error { message: String, location: Location },
}

/// A full `#if` construct with every branch it declares.
#[derive(Debug, Clone, PartialEq)]
pub struct IfChunk {
    pub condition: Token,
    pub then_chunks: Vec<Chunk>,
    pub else_ifs: Vec<ElseIfChunk>,
    pub else_chunks: Option<Vec<Chunk>>,
    pub location: Location,
}

/// One `#else if condition` branch.
#[derive(Debug, Clone, PartialEq)]
pub struct ElseIfChunk {
    pub condition: Token,
    pub then_chunks: Vec<Chunk>,
}
