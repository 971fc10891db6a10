//! Runtime values: the closed set of kinds every stage agrees on.
//!
//! Primitives are immutable and cheap to clone. Objects are shared
//! handles, so two variables holding the same array observe each
//! other's writes.

use std::fmt;
use std::rc::Rc;

use crate::token::Literal;

pub mod callable;
pub mod number;
pub mod object;

pub use callable::{Argument, Callable, Implementation, NativeFn, Signature};
pub use object::{
    BrsComponent, BrsObject, Interface, MAX_ARRAY_LENGTH, RoArray, RoAssociativeArray,
};

/// Kind tag for a runtime value, also used for declared parameter and
/// return types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Invalid,
    Boolean,
    String,
    Int32,
    Int64,
    Float,
    Double,
    Callable,
    Interface,
    Object,
    /// Accepts any value.
    Dynamic,
    /// Return type of a `sub`.
    Void,
    Uninitialized,
}

impl ValueKind {
    /// Kind named by an `as <type>` clause.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "invalid" => Self::Invalid,
            "boolean" => Self::Boolean,
            "string" => Self::String,
            "integer" => Self::Int32,
            "longinteger" => Self::Int64,
            "float" => Self::Float,
            "double" => Self::Double,
            "function" => Self::Callable,
            "interface" => Self::Interface,
            "object" => Self::Object,
            "dynamic" => Self::Dynamic,
            "void" => Self::Void,
            _ => return None,
        };
        Some(kind)
    }

    /// Kind implied by an identifier's trailing type designator
    /// (`name$`, `count%`, `ratio!`, `total#`, `big&`).
    #[must_use]
    pub fn from_designator(name: &str) -> Option<Self> {
        match name.chars().last()? {
            '$' => Some(Self::String),
            '%' => Some(Self::Int32),
            '!' => Some(Self::Float),
            '#' => Some(Self::Double),
            '&' => Some(Self::Int64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Float | Self::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "Invalid",
            Self::Boolean => "Boolean",
            Self::String => "String",
            Self::Int32 => "Integer",
            Self::Int64 => "LongInteger",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::Callable => "Function",
            Self::Interface => "Interface",
            Self::Object => "Object",
            Self::Dynamic => "Dynamic",
            Self::Void => "Void",
            Self::Uninitialized => "<uninitialized>",
        };
        f.write_str(name)
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum BrsType {
    Invalid,
    Boolean(bool),
    String(String),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Callable(Rc<Callable>),
    Interface(Interface),
    Uninitialized,
    Object(BrsObject),
}

impl BrsType {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Invalid => ValueKind::Invalid,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::String(_) => ValueKind::String,
            Self::Int32(_) => ValueKind::Int32,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Callable(_) => ValueKind::Callable,
            Self::Interface(_) => ValueKind::Interface,
            Self::Uninitialized => ValueKind::Uninitialized,
            Self::Object(_) => ValueKind::Object,
        }
    }

    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Name reported by `Type()`: the kind name for primitives and the
    /// component name for objects.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Object(object) => object.component_name(),
            other => other.kind().to_string(),
        }
    }

    /// Primitive inside a boxed value, or the value itself.
    #[must_use]
    pub fn unboxed(&self) -> Self {
        match self {
            Self::Object(BrsObject::Boxed(inner)) => inner.as_ref().clone(),
            other => other.clone(),
        }
    }

    /// Rendering used inside array and associative-array listings: strings
    /// are quoted and nested objects collapse to their component name.
    #[must_use]
    pub fn to_nested_string(&self) -> String {
        match self {
            Self::String(value) => format!("\"{value}\""),
            Self::Object(BrsObject::Boxed(inner)) => inner.to_nested_string(),
            Self::Object(object) => format!("<Component: {}>", object.component_name()),
            other => other.to_string(),
        }
    }
}

impl From<&Literal> for BrsType {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Invalid => Self::Invalid,
            Literal::Boolean(value) => Self::Boolean(*value),
            Literal::String(value) => Self::String(value.clone()),
            Literal::Integer(value) => Self::Int32(*value),
            Literal::LongInteger(value) => Self::Int64(*value),
            Literal::Float(value) => Self::Float(*value),
            Literal::Double(value) => Self::Double(*value),
        }
    }
}

impl From<bool> for BrsType {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for BrsType {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<&str> for BrsType {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Identity for objects and callables, value equality for primitives.
impl PartialEq for BrsType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Invalid, Self::Invalid) | (Self::Uninitialized, Self::Uninitialized) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Callable(a), Self::Callable(b)) => Rc::ptr_eq(a, b),
            (Self::Interface(a), Self::Interface(b)) => {
                a.name.eq_ignore_ascii_case(&b.name) && a.object.same_object(&b.object)
            }
            (Self::Object(a), Self::Object(b)) => a.same_object(b),
            _ => false,
        }
    }
}

impl fmt::Display for BrsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("invalid"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
            Self::Int32(value) => write!(f, "{value}"),
            Self::Int64(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&number::format_float(f64::from(*value), 7)),
            Self::Double(value) => f.write_str(&number::format_float(*value, 15)),
            Self::Callable(callable) => write!(f, "<Function: {}>", callable.display_name()),
            Self::Interface(interface) => write!(f, "<Interface: {}>", interface.name),
            Self::Uninitialized => f.write_str("<UNINITIALIZED>"),
            Self::Object(object) => write!(f, "{object}"),
        }
    }
}

/// Convert `value` to `kind` for parameter binding, typed assignment and
/// return values. `None` means no conversion exists; this never fails
/// loudly.
#[must_use]
pub fn try_coerce(value: &BrsType, kind: ValueKind) -> Option<BrsType> {
    use number::{f64_to_f32, f64_to_i32, f64_to_i64, i64_to_f32, i64_to_f64, truncate_i32};

    if kind == ValueKind::Dynamic || value.kind() == kind {
        return Some(value.clone());
    }

    match (value, kind) {
        (BrsType::Int32(v), ValueKind::Int64) => Some(BrsType::Int64(i64::from(*v))),
        (BrsType::Int32(v), ValueKind::Float) => Some(BrsType::Float(i64_to_f32(i64::from(*v)))),
        (BrsType::Int32(v), ValueKind::Double) => Some(BrsType::Double(f64::from(*v))),
        (BrsType::Int64(v), ValueKind::Int32) => Some(BrsType::Int32(truncate_i32(*v))),
        (BrsType::Int64(v), ValueKind::Float) => Some(BrsType::Float(i64_to_f32(*v))),
        (BrsType::Int64(v), ValueKind::Double) => Some(BrsType::Double(i64_to_f64(*v))),
        (BrsType::Float(v), ValueKind::Int32) => Some(BrsType::Int32(f64_to_i32(f64::from(*v)))),
        (BrsType::Float(v), ValueKind::Int64) => Some(BrsType::Int64(f64_to_i64(f64::from(*v)))),
        (BrsType::Float(v), ValueKind::Double) => Some(BrsType::Double(f64::from(*v))),
        (BrsType::Double(v), ValueKind::Int32) => Some(BrsType::Int32(f64_to_i32(*v))),
        (BrsType::Double(v), ValueKind::Int64) => Some(BrsType::Int64(f64_to_i64(*v))),
        (BrsType::Double(v), ValueKind::Float) => Some(BrsType::Float(f64_to_f32(*v))),
        (BrsType::Invalid, ValueKind::Object) => Some(BrsType::Invalid),
        (BrsType::Object(BrsObject::Boxed(inner)), target) => try_coerce(inner, target),
        (primitive, ValueKind::Object) => BrsObject::boxed(primitive).map(BrsType::Object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_are_case_insensitive() {
        assert_eq!(ValueKind::from_type_name("Integer"), Some(ValueKind::Int32));
        assert_eq!(ValueKind::from_type_name("OBJECT"), Some(ValueKind::Object));
        assert_eq!(ValueKind::from_type_name("number"), None);
    }

    #[test]
    fn designators() {
        assert_eq!(ValueKind::from_designator("name$"), Some(ValueKind::String));
        assert_eq!(ValueKind::from_designator("big&"), Some(ValueKind::Int64));
        assert_eq!(ValueKind::from_designator("plain"), None);
    }

    #[test]
    fn coercion_between_numbers() {
        assert_eq!(
            try_coerce(&BrsType::Int32(3), ValueKind::Double),
            Some(BrsType::Double(3.0))
        );
        assert_eq!(
            try_coerce(&BrsType::Double(3.9), ValueKind::Int32),
            Some(BrsType::Int32(3))
        );
        assert_eq!(try_coerce(&BrsType::string("3"), ValueKind::Int32), None);
    }

    #[test]
    fn boxing_and_unboxing() {
        let boxed = try_coerce(&BrsType::Int32(7), ValueKind::Object);
        let Some(boxed @ BrsType::Object(_)) = boxed else {
            panic!("expected boxed object");
        };
        assert_eq!(boxed.type_name(), "roInt");
        assert_eq!(try_coerce(&boxed, ValueKind::Int32), Some(BrsType::Int32(7)));
    }

    #[test]
    fn invalid_passes_as_object() {
        assert_eq!(
            try_coerce(&BrsType::Invalid, ValueKind::Object),
            Some(BrsType::Invalid)
        );
        assert_eq!(try_coerce(&BrsType::Invalid, ValueKind::String), None);
    }
}
