use std::fmt;

use crate::token::Location;
use crate::value::ValueKind;

/// Number reported for errors raised by `throw` without an explicit
/// `number` field.
pub const USER_ERROR_NUMBER: i32 = 0xFF;

/// Classifies a runtime error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Operator applied to values of unsupported kinds.
    TypeMismatch {
        operator: String,
        left: ValueKind,
        right: Option<ValueKind>,
    },
    DivideByZero,
    /// Call of a value that is not a function.
    NotCallable(ValueKind),
    /// Call of a name with no function bound to it.
    UndefinedFunction(String),
    /// No field or member function with this name on the component.
    MemberNotFound { component: String, name: String },
    /// `.` on a value that has no members.
    InvalidDottedAccess(ValueKind),
    /// `[]` on a value that cannot be indexed.
    InvalidIndexedAccess(ValueKind),
    IndexOutOfRange(i64),
    /// No overload of the function accepts the supplied arguments.
    ArgumentMismatch { function: String, detail: String },
    ReturnTypeMismatch {
        function: String,
        expected: ValueKind,
        found: ValueKind,
    },
    /// Value assigned to a name whose type designator forbids it.
    AssignmentMismatch { name: String, found: ValueKind },
    /// `if`/`while` condition that is neither boolean nor numeric.
    InvalidCondition(ValueKind),
    /// `for each` over something that is not iterable.
    NotIterable(ValueKind),
    StackOverflow(usize),
    LabelNotFound(String),
    /// `exit for`/`exit while` with no enclosing loop of that kind.
    ExitOutsideLoop(String),
    /// Raised by a `throw` statement.
    Thrown { message: String, number: i32 },
    /// Writing to the output sink failed.
    Output(String),
}

impl RuntimeErrorKind {
    /// Numeric error code, exposed to `catch` blocks as `number`.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::TypeMismatch { .. }
            | Self::ReturnTypeMismatch { .. }
            | Self::AssignmentMismatch { .. }
            | Self::InvalidCondition(_) => 0x18,
            Self::DivideByZero => 0x14,
            Self::NotCallable(_) | Self::UndefinedFunction(_) => 0xE0,
            Self::MemberNotFound { .. } => 0xF4,
            Self::InvalidDottedAccess(_) => 0xEC,
            Self::InvalidIndexedAccess(_) | Self::NotIterable(_) => 0xDC,
            Self::IndexOutOfRange(_) => 0x09,
            Self::ArgumentMismatch { .. } => 0xF1,
            Self::StackOverflow(_) => 0xDF,
            Self::LabelNotFound(_) => 0x0E,
            Self::ExitOutsideLoop(_) => 0x02,
            Self::Thrown { number, .. } => *number,
            Self::Output(_) => 0xFE,
        }
    }
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                operator,
                left,
                right: Some(right),
            } => write!(
                f,
                "Type Mismatch. Operator \"{operator}\" can't be applied to \"{left}\" and \"{right}\""
            ),
            Self::TypeMismatch {
                operator,
                left,
                right: None,
            } => write!(
                f,
                "Type Mismatch. Operator \"{operator}\" can't be applied to \"{left}\""
            ),
            Self::DivideByZero => write!(f, "Divide by Zero"),
            Self::NotCallable(kind) => write!(
                f,
                "Function Call Operator ( ) attempted on non-function of type \"{kind}\""
            ),
            Self::UndefinedFunction(name) => {
                write!(f, "Function Call Operator ( ) attempted on undefined function \"{name}\"")
            }
            Self::MemberNotFound { component, name } => write!(
                f,
                "Member function \"{name}\" not found in BrightScript Component \"{component}\""
            ),
            Self::InvalidDottedAccess(kind) => write!(
                f,
                "'Dot' Operator attempted with invalid BrightScript Component or interface reference of type \"{kind}\""
            ),
            Self::InvalidIndexedAccess(kind) => {
                write!(f, "Indexed access attempted on a value of type \"{kind}\"")
            }
            Self::IndexOutOfRange(index) => write!(f, "Subscript {index} out of range"),
            Self::ArgumentMismatch { function, detail } => {
                write!(f, "Argument mismatch calling \"{function}\": {detail}")
            }
            Self::ReturnTypeMismatch {
                function,
                expected,
                found,
            } => write!(
                f,
                "Return type mismatch in \"{function}\": declared \"{expected}\", returned \"{found}\""
            ),
            Self::AssignmentMismatch { name, found } => write!(
                f,
                "Type Mismatch. Cannot assign a value of type \"{found}\" to \"{name}\""
            ),
            Self::InvalidCondition(kind) => {
                write!(f, "Type Mismatch. Condition must be Boolean, got \"{kind}\"")
            }
            Self::NotIterable(kind) => write!(f, "For Each attempted on non-iterable \"{kind}\""),
            Self::StackOverflow(depth) => {
                write!(f, "Stack overflow: call depth exceeded {depth}")
            }
            Self::LabelNotFound(label) => write!(f, "Label \"{label}\" not found"),
            Self::ExitOutsideLoop(statement) => {
                write!(f, "\"{statement}\" used outside of a matching loop")
            }
            Self::Thrown { message, .. } => f.write_str(message),
            Self::Output(message) => write!(f, "Output error: {message}"),
        }
    }
}

/// Error raised while executing a program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {location}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub location: Location,
}

impl RuntimeError {
    #[must_use]
    pub const fn new(kind: RuntimeErrorKind, location: Location) -> Self {
        Self { kind, location }
    }

    #[must_use]
    pub const fn code(&self) -> i32 {
        self.kind.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(RuntimeErrorKind::DivideByZero.code(), 0x14);
        assert_eq!(
            RuntimeErrorKind::Thrown {
                message: "x".into(),
                number: 7
            }
            .code(),
            7
        );
    }

    #[test]
    fn display_includes_location() {
        let error = RuntimeError::new(RuntimeErrorKind::DivideByZero, Location::internal());
        let text = error.to_string();
        assert!(text.starts_with("Divide by Zero at "), "{text}");
    }
}
