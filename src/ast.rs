use std::fmt;
use std::rc::Rc;

use crate::token::{Literal, Location};
use crate::value::ValueKind;

/// Binary operators, in no particular precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntegerDivide,
    Modulo,
    Power,
    LeftShift,
    RightShift,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::IntegerDivide => "\\",
            Self::Modulo => "mod",
            Self::Power => "^",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

/// Postfix `++` / `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOperator {
    Increment,
    Decrement,
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal {
        value: Literal,
        location: Location,
    },
    Binary {
        left: Box<Self>,
        operator: BinaryOperator,
        right: Box<Self>,
        location: Location,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Self>,
        location: Location,
    },
    Grouping {
        expression: Box<Self>,
        location: Location,
    },
    Variable {
        name: String,
        location: Location,
    },
    Call {
        callee: Box<Self>,
        args: Vec<Self>,
        location: Location,
    },
    DottedGet {
        object: Box<Self>,
        name: String,
        location: Location,
    },
    IndexedGet {
        object: Box<Self>,
        index: Box<Self>,
        location: Location,
    },
    ArrayLiteral {
        elements: Vec<Self>,
        location: Location,
    },
    AssociativeArrayLiteral {
        members: Vec<Member>,
        location: Location,
    },
    AnonymousFunction(Rc<FunctionExpression>),
}

impl Expression {
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::Literal { location, .. }
            | Self::Binary { location, .. }
            | Self::Unary { location, .. }
            | Self::Grouping { location, .. }
            | Self::Variable { location, .. }
            | Self::Call { location, .. }
            | Self::DottedGet { location, .. }
            | Self::IndexedGet { location, .. }
            | Self::ArrayLiteral { location, .. }
            | Self::AssociativeArrayLiteral { location, .. } => location,
            Self::AnonymousFunction(function) => &function.location,
        }
    }

    /// Whether the expression can appear on the left of `=`, `++` or `--`.
    #[must_use]
    pub const fn is_assignable(&self) -> bool {
        matches!(
            self,
            Self::Variable { .. } | Self::DottedGet { .. } | Self::IndexedGet { .. }
        )
    }
}

/// `key: value` inside an associative-array literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub value: Expression,
    pub location: Location,
}

/// A function parameter: `name [= default] [as type]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ValueKind,
    pub default: Option<Expression>,
    pub location: Location,
}

/// A `function` or `sub` body, named or anonymous.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub name: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: ValueKind,
    pub body: Block,
    pub is_sub: bool,
    pub location: Location,
}

/// Ordered statements sharing one location span.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub location: Location,
}

/// One `else if` branch.
#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub condition: Expression,
    pub then_branch: Block,
}

/// Item in a `print` list.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintItem {
    Expression(Expression),
    /// `,` advances to the next print zone.
    Tab,
    /// `;` joins adjacent items.
    Space,
}

/// Statement tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression {
        expression: Expression,
        location: Location,
    },
    Print {
        items: Vec<PrintItem>,
        location: Location,
    },
    Assignment {
        name: String,
        value: Expression,
        location: Location,
    },
    Dim {
        name: String,
        dimensions: Vec<Expression>,
        location: Location,
    },
    If {
        condition: Expression,
        then_branch: Block,
        else_ifs: Vec<ElseIf>,
        else_branch: Option<Block>,
        location: Location,
    },
    For {
        counter: String,
        start: Expression,
        end: Expression,
        step: Expression,
        body: Block,
        location: Location,
    },
    ForEach {
        item: String,
        target: Expression,
        body: Block,
        location: Location,
    },
    While {
        condition: Expression,
        body: Block,
        location: Location,
    },
    Function {
        name: String,
        function: Rc<FunctionExpression>,
        location: Location,
    },
    Return {
        value: Option<Expression>,
        location: Location,
    },
    DottedSet {
        object: Expression,
        name: String,
        value: Expression,
        location: Location,
    },
    IndexedSet {
        object: Expression,
        index: Expression,
        value: Expression,
        location: Location,
    },
    Increment {
        target: Expression,
        operator: IncrementOperator,
        location: Location,
    },
    Library {
        path: String,
        location: Location,
    },
    Goto {
        label: String,
        location: Location,
    },
    Label {
        name: String,
        location: Location,
    },
    ExitFor {
        location: Location,
    },
    ExitWhile {
        location: Location,
    },
    TryCatch {
        try_block: Block,
        catch_variable: String,
        catch_block: Block,
        location: Location,
    },
    Throw {
        value: Expression,
        location: Location,
    },
    End {
        location: Location,
    },
    Stop {
        location: Location,
    },
    Block(Block),
}

impl Statement {
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::Expression { location, .. }
            | Self::Print { location, .. }
            | Self::Assignment { location, .. }
            | Self::Dim { location, .. }
            | Self::If { location, .. }
            | Self::For { location, .. }
            | Self::ForEach { location, .. }
            | Self::While { location, .. }
            | Self::Function { location, .. }
            | Self::Return { location, .. }
            | Self::DottedSet { location, .. }
            | Self::IndexedSet { location, .. }
            | Self::Increment { location, .. }
            | Self::Library { location, .. }
            | Self::Goto { location, .. }
            | Self::Label { location, .. }
            | Self::ExitFor { location }
            | Self::ExitWhile { location }
            | Self::TryCatch { location, .. }
            | Self::Throw { location, .. }
            | Self::End { location }
            | Self::Stop { location } => location,
            Self::Block(block) => &block.location,
        }
    }
}
