use std::rc::Rc;

use crate::ast::{BinaryOperator, Expression, FunctionExpression, Member, Parameter, UnaryOperator};
use crate::token::{Lexeme, Literal};
use crate::value::ValueKind;

use super::{ParseErrorKind, ParseResult, Parser};

impl Parser<'_> {
    pub(super) fn expression(&mut self) -> ParseResult<Expression> {
        self.or_expression()
    }

    fn binary(left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
        let location = left.location().to(right.location());
        Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            location,
        }
    }

    fn or_expression(&mut self) -> ParseResult<Expression> {
        let mut expr = self.and_expression()?;
        while self.match_any(&[Lexeme::Or]) {
            let right = self.and_expression()?;
            expr = Self::binary(expr, BinaryOperator::Or, right);
        }
        Ok(expr)
    }

    fn and_expression(&mut self) -> ParseResult<Expression> {
        let mut expr = self.relational()?;
        while self.match_any(&[Lexeme::And]) {
            let right = self.relational()?;
            expr = Self::binary(expr, BinaryOperator::And, right);
        }
        Ok(expr)
    }

    fn relational(&mut self) -> ParseResult<Expression> {
        let mut expr = self.shift()?;
        loop {
            let operator = match self.peek().kind {
                Lexeme::Equal => BinaryOperator::Equal,
                Lexeme::LessGreater => BinaryOperator::NotEqual,
                Lexeme::Less => BinaryOperator::Less,
                Lexeme::LessEqual => BinaryOperator::LessEqual,
                Lexeme::Greater => BinaryOperator::Greater,
                Lexeme::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.shift()?;
            expr = Self::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn shift(&mut self) -> ParseResult<Expression> {
        let mut expr = self.additive()?;
        loop {
            let operator = match self.peek().kind {
                Lexeme::LeftShift => BinaryOperator::LeftShift,
                Lexeme::RightShift => BinaryOperator::RightShift,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            expr = Self::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn additive(&mut self) -> ParseResult<Expression> {
        let mut expr = self.multiplicative()?;
        loop {
            let operator = match self.peek().kind {
                Lexeme::Plus => BinaryOperator::Add,
                Lexeme::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            expr = Self::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn multiplicative(&mut self) -> ParseResult<Expression> {
        let mut expr = self.exponential()?;
        loop {
            let operator = match self.peek().kind {
                Lexeme::Star => BinaryOperator::Multiply,
                Lexeme::Slash => BinaryOperator::Divide,
                Lexeme::Backslash => BinaryOperator::IntegerDivide,
                Lexeme::Mod => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.exponential()?;
            expr = Self::binary(expr, operator, right);
        }
        Ok(expr)
    }

    /// Repeated `^` groups to the left: `2 ^ 3 ^ 4` is `(2 ^ 3) ^ 4`.
    fn exponential(&mut self) -> ParseResult<Expression> {
        let mut expr = self.prefix_unary()?;
        while self.match_any(&[Lexeme::Caret]) {
            let right = self.prefix_unary()?;
            expr = Self::binary(expr, BinaryOperator::Power, right);
        }
        Ok(expr)
    }

    fn prefix_unary(&mut self) -> ParseResult<Expression> {
        let operator = match self.peek().kind {
            Lexeme::Not => UnaryOperator::Not,
            Lexeme::Minus => UnaryOperator::Negate,
            Lexeme::Plus => {
                self.advance();
                return self.prefix_unary();
            }
            _ => return self.call(),
        };
        let start = self.advance().location.clone();
        let operand = self.prefix_unary()?;
        let location = start.to(operand.location());
        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
            location,
        })
    }

    /// Primary expression followed by any chain of calls, `.name` and
    /// `[index]` accessors.
    pub(super) fn call(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        loop {
            if self.match_any(&[Lexeme::LeftParen]) {
                let args = self.arguments()?;
                let location = self.span_from(expr.location());
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                    location,
                };
            } else if self.match_any(&[Lexeme::Dot]) {
                let name = self.property_name()?;
                let location = self.span_from(expr.location());
                expr = Expression::DottedGet {
                    object: Box::new(expr),
                    name,
                    location,
                };
            } else if self.match_any(&[Lexeme::LeftSquare]) {
                loop {
                    let index = self.expression()?;
                    let location = self.span_from(expr.location());
                    expr = Expression::IndexedGet {
                        object: Box::new(expr),
                        index: Box::new(index),
                        location,
                    };
                    if !self.match_any(&[Lexeme::Comma]) {
                        break;
                    }
                }
                self.consume(Lexeme::RightSquare, "']' after index")?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();
        if !self.check(Lexeme::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_any(&[Lexeme::Comma]) {
                    break;
                }
            }
        }
        self.consume(Lexeme::RightParen, "')' after arguments")?;
        Ok(args)
    }

    /// Property names after `.` may be any identifier or reserved word.
    fn property_name(&mut self) -> ParseResult<String> {
        let token = self.peek();
        if token.kind == Lexeme::Identifier || token.kind.is_keyword() {
            Ok(self.advance().text.clone())
        } else {
            Err(self.expected("property name after '.'"))
        }
    }

    fn primary(&mut self) -> ParseResult<Expression> {
        let token = self.peek().clone();
        match token.kind {
            Lexeme::True
            | Lexeme::False
            | Lexeme::Invalid
            | Lexeme::Integer
            | Lexeme::LongInteger
            | Lexeme::Float
            | Lexeme::Double
            | Lexeme::String => {
                self.advance();
                Ok(Expression::Literal {
                    value: token.literal.unwrap_or(Literal::Invalid),
                    location: token.location,
                })
            }
            Lexeme::Identifier => {
                self.advance();
                Ok(Expression::Variable {
                    name: token.text,
                    location: token.location,
                })
            }
            Lexeme::LeftParen => {
                self.advance();
                let expression = self.expression()?;
                self.consume(Lexeme::RightParen, "')' after expression")?;
                Ok(Expression::Grouping {
                    expression: Box::new(expression),
                    location: self.span_from(&token.location),
                })
            }
            Lexeme::LeftSquare => {
                self.advance();
                self.array_literal(&token)
            }
            Lexeme::LeftBrace => {
                self.advance();
                self.associative_array_literal(&token)
            }
            Lexeme::Function | Lexeme::Sub => {
                let function = self.function_expression(false)?;
                Ok(Expression::AnonymousFunction(Rc::new(function)))
            }
            _ => Err(self.expected("expression")),
        }
    }

    fn array_literal(&mut self, open: &crate::token::Token) -> ParseResult<Expression> {
        let mut elements = Vec::new();
        self.skip_newlines();
        while !self.check(Lexeme::RightSquare) {
            elements.push(self.expression()?);
            let separated = self.match_any(&[Lexeme::Comma]);
            self.skip_newlines();
            if !separated && self.previous().kind != Lexeme::Newline {
                break;
            }
        }
        self.consume(Lexeme::RightSquare, "']' to close array literal")?;
        Ok(Expression::ArrayLiteral {
            elements,
            location: self.span_from(&open.location),
        })
    }

    fn associative_array_literal(
        &mut self,
        open: &crate::token::Token,
    ) -> ParseResult<Expression> {
        let mut members = Vec::new();
        self.skip_newlines();
        while !self.check(Lexeme::RightBrace) {
            let key = self.peek().clone();
            let name = match (&key.kind, &key.literal) {
                (Lexeme::String, Some(Literal::String(value))) => value.clone(),
                (Lexeme::Identifier, _) => key.text.clone(),
                (kind, _) if kind.is_keyword() => key.text.clone(),
                _ => return Err(self.expected("associative array key")),
            };
            self.advance();
            self.consume(Lexeme::Colon, "':' after associative array key")?;
            let value = self.expression()?;
            let location = self.span_from(&key.location);
            members.push(Member {
                name,
                value,
                location,
            });

            let separated = self.match_any(&[Lexeme::Comma]);
            self.skip_newlines();
            if !separated && self.previous().kind != Lexeme::Newline {
                break;
            }
        }
        self.consume(Lexeme::RightBrace, "'}' to close associative array literal")?;
        Ok(Expression::AssociativeArrayLiteral {
            members,
            location: self.span_from(&open.location),
        })
    }

    /// `function name?(params) [as type] ... end function`, or the `sub`
    /// equivalent. `named` requires and records the name.
    pub(super) fn function_expression(&mut self, named: bool) -> ParseResult<FunctionExpression> {
        let keyword = self.advance().clone();
        let is_sub = keyword.kind == Lexeme::Sub;

        let name = if named {
            Some(self.consume(Lexeme::Identifier, "function name")?.text)
        } else {
            None
        };

        self.consume(Lexeme::LeftParen, "'(' after function name")?;
        let mut parameters = Vec::new();
        if !self.check(Lexeme::RightParen) {
            loop {
                parameters.push(self.parameter()?);
                if !self.match_any(&[Lexeme::Comma]) {
                    break;
                }
            }
        }
        self.consume(Lexeme::RightParen, "')' after parameters")?;

        let return_type = if self.match_as() {
            self.type_name()?
        } else if is_sub {
            ValueKind::Void
        } else {
            ValueKind::Dynamic
        };

        self.consume_newline()?;
        let terminator = if is_sub {
            Lexeme::EndSub
        } else {
            Lexeme::EndFunction
        };
        let body = self.block(&[terminator])?;
        let expected = if is_sub { "'end sub'" } else { "'end function'" };
        self.consume(terminator, expected)?;

        Ok(FunctionExpression {
            name,
            parameters,
            return_type,
            body,
            is_sub,
            location: self.span_from(&keyword.location),
        })
    }

    fn parameter(&mut self) -> ParseResult<Parameter> {
        let token = self.consume(Lexeme::Identifier, "parameter name")?;
        let default = if self.match_any(&[Lexeme::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        let kind = if self.match_as() {
            self.type_name()?
        } else {
            ValueKind::from_designator(&token.text).unwrap_or(ValueKind::Dynamic)
        };
        Ok(Parameter {
            name: token.text,
            kind,
            default,
            location: self.span_from(&token.location),
        })
    }

    /// `as` is an ordinary identifier everywhere else.
    fn match_as(&mut self) -> bool {
        let token = self.peek();
        if token.kind == Lexeme::Identifier && token.text.eq_ignore_ascii_case("as") {
            self.advance();
            true
        } else {
            false
        }
    }

    fn type_name(&mut self) -> ParseResult<ValueKind> {
        let token = self.peek();
        let kind = match token.kind {
            Lexeme::Identifier | Lexeme::Function | Lexeme::Invalid => {
                ValueKind::from_type_name(&token.text)
            }
            _ => None,
        };
        match kind {
            Some(kind) => {
                self.advance();
                Ok(kind)
            }
            None => Err(self.error_at_current(ParseErrorKind::Expected {
                expected: "type name".to_string(),
                found: Self::describe(self.peek()),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOperator, Expression, Statement, UnaryOperator};
    use crate::lexer::scan;
    use crate::parser::parse;

    fn expression_of(source: &str) -> Expression {
        let results = parse(&scan(&format!("x = {source}"), "test.brs").tokens);
        assert!(results.errors.is_empty(), "{:?}", results.errors);
        match results.statements.into_iter().next() {
            Some(Statement::Assignment { value, .. }) => value,
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    fn operator_of(expression: &Expression) -> Option<BinaryOperator> {
        match expression {
            Expression::Binary { operator, .. } => Some(*operator),
            _ => None,
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = expression_of("1 + 2 * 3");
        assert_eq!(operator_of(&expr), Some(BinaryOperator::Add));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = expression_of("a or b and c");
        let Expression::Binary {
            operator, right, ..
        } = &expr
        else {
            panic!("expected binary");
        };
        assert_eq!(*operator, BinaryOperator::Or);
        assert_eq!(operator_of(right), Some(BinaryOperator::And));
    }

    #[test]
    fn negation_binds_tighter_than_power() {
        let expr = expression_of("-2 ^ 2");
        let Expression::Binary { left, .. } = &expr else {
            panic!("expected binary");
        };
        assert!(matches!(
            **left,
            Expression::Unary {
                operator: UnaryOperator::Negate,
                ..
            }
        ));
    }

    #[test]
    fn accessor_chains() {
        let expr = expression_of("m.items[1].name(2)");
        assert!(matches!(expr, Expression::Call { .. }));
    }

    #[test]
    fn multi_line_associative_array() {
        let expr = expression_of("{\n  name: \"x\"\n  \"quoted key\": 2,\n  if: true\n}");
        let Expression::AssociativeArrayLiteral { members, .. } = expr else {
            panic!("expected associative array");
        };
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["name", "quoted key", "if"]);
    }

    #[test]
    fn anonymous_function_with_defaults() {
        let expr = expression_of("function(a, b = 2 as integer) as integer\nreturn a + b\nend function");
        let Expression::AnonymousFunction(function) = expr else {
            panic!("expected anonymous function");
        };
        assert_eq!(function.parameters.len(), 2);
        assert!(function.parameters[1].default.is_some());
        assert_eq!(function.body.statements.len(), 1);
    }
}
