//! Callables: named, possibly overloaded functions with typed signatures.

use std::fmt;
use std::rc::Rc;

use crate::ast::{Expression, FunctionExpression};
use crate::interpreter::{Interpreter, RuntimeErrorKind};
use crate::token::{Literal, Location};

use super::{BrsType, ValueKind, try_coerce};

/// Native implementation: receives the interpreter and already-coerced
/// arguments. Omitted optional arguments are simply absent.
pub type NativeFn = dyn Fn(&mut Interpreter, &[BrsType]) -> Result<BrsType, RuntimeErrorKind>;

/// One declared argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub kind: ValueKind,
    /// Present for optional arguments; evaluated in the callee's scope
    /// when the caller omits the argument.
    pub default: Option<Expression>,
}

impl Argument {
    #[must_use]
    pub fn required(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: None,
        }
    }

    /// Optional argument defaulting to `invalid`.
    #[must_use]
    pub fn optional(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: Some(Expression::Literal {
                value: Literal::Invalid,
                location: Location::internal(),
            }),
        }
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Argument list and return kind of one overload.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub args: Vec<Argument>,
    pub returns: ValueKind,
}

impl Signature {
    #[must_use]
    pub const fn new(args: Vec<Argument>, returns: ValueKind) -> Self {
        Self { args, returns }
    }

    #[must_use]
    pub fn required_count(&self) -> usize {
        self.args.iter().filter(|arg| !arg.is_optional()).count()
    }

    /// Coerced arguments when `args` satisfies this signature.
    #[must_use]
    pub fn accepts(&self, args: &[BrsType]) -> Option<Vec<BrsType>> {
        if args.len() < self.required_count() || args.len() > self.args.len() {
            return None;
        }
        args.iter()
            .zip(&self.args)
            .map(|(value, arg)| try_coerce(value, arg.kind))
            .collect()
    }

    /// Why `args` does not fit, for error messages.
    fn mismatch(&self, args: &[BrsType]) -> String {
        let required = self.required_count();
        if args.len() < required || args.len() > self.args.len() {
            return if required == self.args.len() {
                format!("expected {required} arguments, got {}", args.len())
            } else {
                format!(
                    "expected {required} to {} arguments, got {}",
                    self.args.len(),
                    args.len()
                )
            };
        }
        args.iter()
            .zip(&self.args)
            .find(|(value, arg)| try_coerce(value, arg.kind).is_none())
            .map_or_else(String::new, |(value, arg)| {
                format!(
                    "argument '{}' expects {}, got {}",
                    arg.name,
                    arg.kind,
                    value.kind()
                )
            })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.is_optional() {
                    format!("[{} as {}]", arg.name, arg.kind)
                } else {
                    format!("{} as {}", arg.name, arg.kind)
                }
            })
            .collect();
        write!(f, "({}) as {}", args.join(", "), self.returns)
    }
}

#[derive(Clone)]
pub enum Implementation {
    Native(Rc<NativeFn>),
    User(Rc<FunctionExpression>),
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native"),
            Self::User(function) => write!(f, "User({})", function.location),
        }
    }
}

/// A function value. Overloads are tried in declaration order and the
/// first one whose arity and argument kinds fit wins.
#[derive(Debug, Clone)]
pub struct Callable {
    pub name: Option<String>,
    pub signatures: Vec<(Signature, Implementation)>,
}

/// The overload picked for a call, with its arguments coerced.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub signature: &'a Signature,
    pub implementation: &'a Implementation,
    pub args: Vec<BrsType>,
}

impl Callable {
    /// A native function with one signature.
    pub fn native<F>(name: &str, signature: Signature, implementation: F) -> Self
    where
        F: Fn(&mut Interpreter, &[BrsType]) -> Result<BrsType, RuntimeErrorKind> + 'static,
    {
        Self {
            name: Some(name.to_string()),
            signatures: vec![(signature, Implementation::Native(Rc::new(implementation)))],
        }
    }

    /// Add another overload, tried after the existing ones.
    #[must_use]
    pub fn overload<F>(mut self, signature: Signature, implementation: F) -> Self
    where
        F: Fn(&mut Interpreter, &[BrsType]) -> Result<BrsType, RuntimeErrorKind> + 'static,
    {
        self.signatures
            .push((signature, Implementation::Native(Rc::new(implementation))));
        self
    }

    /// A user-defined `function`/`sub`.
    #[must_use]
    pub fn user(function: Rc<FunctionExpression>) -> Self {
        let args = function
            .parameters
            .iter()
            .map(|parameter| Argument {
                name: parameter.name.clone(),
                kind: parameter.kind,
                default: parameter.default.clone(),
            })
            .collect();
        let signature = Signature::new(args, function.return_type);
        Self {
            name: function.name.clone(),
            signatures: vec![(signature, Implementation::User(function))],
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }

    /// First overload accepting `args`.
    pub fn resolve(&self, args: &[BrsType]) -> Result<Resolved<'_>, RuntimeErrorKind> {
        for (signature, implementation) in &self.signatures {
            if let Some(args) = signature.accepts(args) {
                return Ok(Resolved {
                    signature,
                    implementation,
                    args,
                });
            }
        }

        let detail = match self.signatures.as_slice() {
            [(signature, _)] => signature.mismatch(args),
            signatures => {
                let candidates: Vec<String> =
                    signatures.iter().map(|(s, _)| s.to_string()).collect();
                format!(
                    "no overload accepts these arguments; candidates: {}",
                    candidates.join(" | ")
                )
            }
        };
        Err(RuntimeErrorKind::ArgumentMismatch {
            function: self.display_name().to_string(),
            detail,
        })
    }
}
