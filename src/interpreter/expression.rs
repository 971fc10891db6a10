use std::rc::Rc;

use crate::ast::{BinaryOperator, Expression};
use crate::token::Location;
use crate::value::number;
use crate::value::{BrsObject, BrsType, Callable, RoArray, RoAssociativeArray};

use super::{At, EvalResult, Halt, Interpreter, RuntimeErrorKind};

impl Interpreter {
    pub(crate) fn evaluate(&mut self, expression: &Expression) -> EvalResult {
        match expression {
            Expression::Literal { value, .. } => Ok(BrsType::from(value)),
            Expression::Binary {
                left,
                operator,
                right,
                location,
            } => self.binary(left, *operator, right, location),
            Expression::Unary {
                operator,
                operand,
                location,
            } => {
                let value = self.evaluate(operand)?;
                number::unary(*operator, &value).at(location)
            }
            Expression::Grouping { expression, .. } => self.evaluate(expression),
            Expression::Variable { name, .. } => {
                Ok(self.environment.get(name).unwrap_or(BrsType::Uninitialized))
            }
            Expression::Call {
                callee,
                args,
                location,
            } => self.call_expression(callee, args, location),
            Expression::DottedGet {
                object,
                name,
                location,
            } => {
                let target = self.evaluate(object)?;
                Self::property_of(&target, name).at(location)
            }
            Expression::IndexedGet {
                object,
                index,
                location,
            } => {
                let target = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                Self::index_of(&target, &index).at(location)
            }
            Expression::ArrayLiteral { elements, .. } => {
                let values = elements
                    .iter()
                    .map(|element| self.evaluate(element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BrsType::Object(BrsObject::Array(RoArray::new(values))))
            }
            Expression::AssociativeArrayLiteral { members, .. } => {
                let aa = RoAssociativeArray::new();
                for member in members {
                    let value = self.evaluate(&member.value)?;
                    aa.set(&member.name, value);
                }
                Ok(BrsType::Object(BrsObject::AssociativeArray(aa)))
            }
            Expression::AnonymousFunction(function) => Ok(BrsType::Callable(Rc::new(
                Callable::user(Rc::clone(function)),
            ))),
        }
    }

    /// `and`/`or` skip the right operand when a boolean left operand
    /// already decides the result. Numeric operands combine bitwise, so
    /// both sides are evaluated.
    fn binary(
        &mut self,
        left: &Expression,
        operator: BinaryOperator,
        right: &Expression,
        location: &Location,
    ) -> EvalResult {
        let left = self.evaluate(left)?;

        if let BrsType::Boolean(value) = left.unboxed() {
            match operator {
                BinaryOperator::And if !value => return Ok(BrsType::Boolean(false)),
                BinaryOperator::Or if value => return Ok(BrsType::Boolean(true)),
                _ => {}
            }
        }

        let right = self.evaluate(right)?;
        number::binary(operator, &left, &right).at(location)
    }

    /// `target.name`. Primitives are boxed on the fly so `"abc".len()`
    /// works.
    pub(crate) fn property_of(target: &BrsType, name: &str) -> Result<BrsType, RuntimeErrorKind> {
        match target {
            BrsType::Object(object) => object.get_property(name),
            BrsType::Interface(interface) => interface
                .object
                .method(name)
                .map(|callable| BrsType::Callable(Rc::new(callable)))
                .ok_or_else(|| RuntimeErrorKind::MemberNotFound {
                    component: interface.name.clone(),
                    name: name.to_string(),
                }),
            BrsType::Boolean(_)
            | BrsType::String(_)
            | BrsType::Int32(_)
            | BrsType::Int64(_)
            | BrsType::Float(_)
            | BrsType::Double(_) => BrsObject::boxed(target)
                .ok_or(RuntimeErrorKind::InvalidDottedAccess(target.kind()))?
                .get_property(name),
            BrsType::Invalid | BrsType::Uninitialized | BrsType::Callable(_) => {
                Err(RuntimeErrorKind::InvalidDottedAccess(target.kind()))
            }
        }
    }

    pub(crate) fn index_of(target: &BrsType, index: &BrsType) -> Result<BrsType, RuntimeErrorKind> {
        match target {
            BrsType::Object(object) => object.get_index(index),
            BrsType::Interface(interface) => interface.object.get_index(index),
            other => Err(RuntimeErrorKind::InvalidIndexedAccess(other.kind())),
        }
    }

    /// Calls through `obj.method(...)` bind `m` to `obj` when it is an
    /// associative array.
    fn call_expression(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        location: &Location,
    ) -> EvalResult {
        let (function, receiver) = match callee {
            Expression::DottedGet {
                object,
                name,
                location: get_location,
            } => {
                let target = self.evaluate(object)?;
                let receiver = match &target {
                    BrsType::Object(BrsObject::AssociativeArray(aa)) => Some(aa.clone()),
                    _ => None,
                };
                (Self::property_of(&target, name).at(get_location)?, receiver)
            }
            _ => (self.evaluate(callee)?, None),
        };

        let args = args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<Result<Vec<_>, Halt>>()?;

        match function {
            BrsType::Callable(callable) => self.call_callable(&callable, args, receiver, location),
            BrsType::Uninitialized => {
                let name = match callee {
                    Expression::Variable { name, .. } | Expression::DottedGet { name, .. } => {
                        name.clone()
                    }
                    _ => "<expression>".to_string(),
                };
                Err(RuntimeErrorKind::UndefinedFunction(name)).at(location)
            }
            other => Err(RuntimeErrorKind::NotCallable(other.kind())).at(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io;

    use super::*;
    use crate::config::ExecutionOptions;
    use crate::interpreter::OutputBuffer;
    use crate::lexer::scan;
    use crate::parser::parse;
    use crate::value::{Signature, ValueKind};

    fn run(interpreter: &mut Interpreter, source: &str) {
        let parsed = parse(&scan(source, "expr.brs").tokens);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        interpreter.exec(&parsed.statements).unwrap();
    }

    #[test]
    fn and_short_circuits_on_false() {
        let stdout = OutputBuffer::new();
        let mut interpreter = Interpreter::with_output(
            ExecutionOptions::default(),
            Box::new(stdout.clone()),
            Box::new(io::sink()),
        );
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        interpreter.mock_function(
            "touch",
            Callable::native("touch", Signature::new(vec![], ValueKind::Boolean), move |_, _| {
                counter.set(counter.get() + 1);
                Ok(BrsType::Boolean(true))
            }),
        );

        run(&mut interpreter, "x = false and touch()\ny = true or touch()\nz = true and touch()");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn primitives_box_for_member_calls() {
        let stdout = OutputBuffer::new();
        let mut interpreter = Interpreter::with_output(
            ExecutionOptions::default(),
            Box::new(stdout.clone()),
            Box::new(io::sink()),
        );
        run(&mut interpreter, "print \"hello\".len()");
        assert_eq!(stdout.contents(), "5\n");
    }

    #[test]
    fn dotted_access_on_invalid_fails() {
        assert_eq!(
            Interpreter::property_of(&BrsType::Invalid, "x"),
            Err(RuntimeErrorKind::InvalidDottedAccess(ValueKind::Invalid))
        );
    }
}
