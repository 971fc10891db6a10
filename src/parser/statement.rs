use std::rc::Rc;

use crate::ast::{
    BinaryOperator, Block, ElseIf, Expression, IncrementOperator, PrintItem, Statement,
};
use crate::token::{Lexeme, Literal, Location, Token};

use super::{ParseError, ParseErrorKind, ParseResult, Parser};

/// Keywords that close a function body. Blocks nested inside a function
/// stop at these even when they are not their own terminator, so a
/// missing `end if` is reported once instead of swallowing the rest of
/// the file.
const FUNCTION_TERMINATORS: &[Lexeme] = &[Lexeme::EndFunction, Lexeme::EndSub];

impl Parser<'_> {
    /// Top-level statement: named functions are only allowed here.
    pub(super) fn declaration(&mut self) -> ParseResult<Statement> {
        if self.check_any(&[Lexeme::Function, Lexeme::Sub])
            && self.peek_at(1).kind == Lexeme::Identifier
        {
            return self.function_declaration();
        }
        self.statement()
    }

    fn function_declaration(&mut self) -> ParseResult<Statement> {
        let function = self.function_expression(true)?;
        let name = function.name.clone().unwrap_or_default();
        let location = function.location.clone();
        Ok(Statement::Function {
            name,
            function: Rc::new(function),
            location,
        })
    }

    pub(super) fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek().kind {
            Lexeme::If => self.if_statement(),
            Lexeme::For => self.for_statement(),
            Lexeme::ForEach => self.for_each_statement(),
            Lexeme::While => self.while_statement(),
            Lexeme::Print => self.print_statement(),
            Lexeme::Return => self.return_statement(),
            Lexeme::Dim => self.dim_statement(),
            Lexeme::Goto => self.goto_statement(),
            Lexeme::Try => self.try_statement(),
            Lexeme::Throw => self.throw_statement(),
            Lexeme::ExitFor => Ok(Statement::ExitFor {
                location: self.advance().location.clone(),
            }),
            Lexeme::ExitWhile => Ok(Statement::ExitWhile {
                location: self.advance().location.clone(),
            }),
            Lexeme::End => Ok(Statement::End {
                location: self.advance().location.clone(),
            }),
            Lexeme::Stop => Ok(Statement::Stop {
                location: self.advance().location.clone(),
            }),
            Lexeme::Identifier if self.peek_at(1).kind == Lexeme::Colon => {
                self.label_statement()
            }
            Lexeme::Identifier | Lexeme::LeftParen => self.expression_statement(),
            Lexeme::Function | Lexeme::Sub => {
                let token = self.peek().clone();
                Err(self.error_at_current(ParseErrorKind::UnexpectedToken(format!(
                    "'{}'; named functions may only be declared at the top level",
                    token.text
                ))))
            }
            _ => {
                let found = Self::describe(self.peek());
                Err(self.error_at_current(ParseErrorKind::UnexpectedToken(found)))
            }
        }
    }

    /// Statements up to (not including) one of `terminators`.
    ///
    /// The block's location starts right after the header line and ends
    /// right before the terminator.
    pub(super) fn block(&mut self, terminators: &[Lexeme]) -> ParseResult<Block> {
        let start = self.previous().location.end;
        let mut statements = Vec::new();

        loop {
            self.skip_separators();
            if self.check_any(terminators) || self.check_any(FUNCTION_TERMINATORS) {
                break;
            }
            if self.is_at_end() {
                return Err(self.expected(&Self::terminator_names(terminators)));
            }

            match self.statement().and_then(|statement| {
                self.block_statement_separator(terminators)?;
                Ok(statement)
            }) {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }

        let end = self.peek().location.start;
        Ok(Block {
            statements,
            location: Location::new(self.peek().location.file.clone(), start, end),
        })
    }

    /// Like `statement_separator`, but a terminator may directly follow a
    /// statement on the same line in single-line forms.
    fn block_statement_separator(&mut self, terminators: &[Lexeme]) -> ParseResult<()> {
        if self.check_any(terminators) {
            return Ok(());
        }
        self.statement_separator()
    }

    fn terminator_names(terminators: &[Lexeme]) -> String {
        let names: Vec<&str> = terminators
            .iter()
            .map(|kind| match kind {
                Lexeme::EndIf => "'end if'",
                Lexeme::EndFor => "'end for'",
                Lexeme::Next => "'next'",
                Lexeme::EndWhile => "'end while'",
                Lexeme::EndFunction => "'end function'",
                Lexeme::EndSub => "'end sub'",
                Lexeme::EndTry => "'end try'",
                Lexeme::Catch => "'catch'",
                Lexeme::Else => "'else'",
                Lexeme::ElseIf => "'else if'",
                _ => "block terminator",
            })
            .collect();
        names.join(" or ")
    }

    fn if_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let condition = self.expression()?;
        self.match_any(&[Lexeme::Then]);

        if self.check(Lexeme::Newline) {
            self.block_if(start, condition)
        } else {
            self.single_line_if(start, condition)
        }
    }

    fn block_if(&mut self, start: Location, condition: Expression) -> ParseResult<Statement> {
        const BRANCH_ENDS: &[Lexeme] = &[Lexeme::ElseIf, Lexeme::Else, Lexeme::EndIf];

        self.consume_newline()?;
        let then_branch = self.block(BRANCH_ENDS)?;

        let mut else_ifs = Vec::new();
        while self.match_any(&[Lexeme::ElseIf]) {
            let condition = self.expression()?;
            self.match_any(&[Lexeme::Then]);
            self.consume_newline()?;
            let then_branch = self.block(BRANCH_ENDS)?;
            else_ifs.push(ElseIf {
                condition,
                then_branch,
            });
        }

        let else_branch = if self.match_any(&[Lexeme::Else]) {
            self.consume_newline()?;
            Some(self.block(&[Lexeme::EndIf])?)
        } else {
            None
        };

        self.consume(Lexeme::EndIf, "'end if'")?;
        Ok(Statement::If {
            condition,
            then_branch,
            else_ifs,
            else_branch,
            location: self.span_from(&start),
        })
    }

    /// `if cond then a : b else c` on one line. The trailing newline is
    /// left for the enclosing block.
    fn single_line_if(&mut self, start: Location, condition: Expression) -> ParseResult<Statement> {
        let then_branch = self.inline_block()?;

        let mut else_ifs = Vec::new();
        let mut else_branch = None;
        loop {
            if self.match_any(&[Lexeme::ElseIf]) {
                let condition = self.expression()?;
                self.match_any(&[Lexeme::Then]);
                let then_branch = self.inline_block()?;
                else_ifs.push(ElseIf {
                    condition,
                    then_branch,
                });
            } else if self.match_any(&[Lexeme::Else]) {
                else_branch = Some(self.inline_block()?);
                break;
            } else {
                break;
            }
        }

        Ok(Statement::If {
            condition,
            then_branch,
            else_ifs,
            else_branch,
            location: self.span_from(&start),
        })
    }

    /// `:`-separated statements up to end of line, `else`, or `else if`.
    fn inline_block(&mut self) -> ParseResult<Block> {
        let start = self.peek().location.clone();
        let mut statements = Vec::new();
        loop {
            if self.check_any(&[Lexeme::Newline, Lexeme::Eof, Lexeme::Else, Lexeme::ElseIf]) {
                break;
            }
            statements.push(self.statement()?);
            if !self.match_any(&[Lexeme::Colon]) {
                break;
            }
        }

        if statements.is_empty() {
            return Err(self.expected("statement after 'then'"));
        }
        Ok(Block {
            statements,
            location: self.span_from(&start),
        })
    }

    fn for_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let counter = self.consume(Lexeme::Identifier, "loop counter name")?;
        self.consume(Lexeme::Equal, "'=' after loop counter")?;
        let initial = self.expression()?;
        self.consume(Lexeme::To, "'to' in for loop")?;
        let end = self.expression()?;

        let step = if self.match_any(&[Lexeme::Step]) {
            self.expression()?
        } else {
            Expression::Literal {
                value: Literal::Integer(1),
                location: self.previous().location.clone(),
            }
        };

        self.consume_newline()?;
        let body = self.block(&[Lexeme::EndFor, Lexeme::Next])?;
        self.loop_end()?;

        Ok(Statement::For {
            counter: counter.text,
            start: initial,
            end,
            step,
            body,
            location: self.span_from(&start),
        })
    }

    fn for_each_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let item = self.consume(Lexeme::Identifier, "loop variable name")?;
        self.consume(Lexeme::In, "'in' after loop variable")?;
        let target = self.expression()?;
        self.consume_newline()?;
        let body = self.block(&[Lexeme::EndFor, Lexeme::Next])?;
        self.loop_end()?;

        Ok(Statement::ForEach {
            item: item.text,
            target,
            body,
            location: self.span_from(&start),
        })
    }

    /// `end for`, or `next` with an optional counter name.
    fn loop_end(&mut self) -> ParseResult<()> {
        let end = self.consume_any(&[Lexeme::EndFor, Lexeme::Next], "'end for' or 'next'")?;
        if end.kind == Lexeme::Next && self.check(Lexeme::Identifier) {
            self.advance();
        }
        Ok(())
    }

    fn while_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let condition = self.expression()?;
        self.consume_newline()?;
        let body = self.block(&[Lexeme::EndWhile])?;
        self.consume(Lexeme::EndWhile, "'end while'")?;
        Ok(Statement::While {
            condition,
            body,
            location: self.span_from(&start),
        })
    }

    fn print_statement(&mut self) -> ParseResult<Statement> {
        const PRINT_ENDS: &[Lexeme] = &[
            Lexeme::Newline,
            Lexeme::Colon,
            Lexeme::Eof,
            Lexeme::Else,
            Lexeme::ElseIf,
        ];

        let start = self.advance().location.clone();
        let mut items = Vec::new();
        while !self.check_any(PRINT_ENDS) {
            if self.match_any(&[Lexeme::Semicolon]) {
                items.push(PrintItem::Space);
            } else if self.match_any(&[Lexeme::Comma]) {
                items.push(PrintItem::Tab);
            } else {
                items.push(PrintItem::Expression(self.expression()?));
            }
        }
        Ok(Statement::Print {
            items,
            location: self.span_from(&start),
        })
    }

    fn return_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let value = if self.check_any(&[
            Lexeme::Newline,
            Lexeme::Colon,
            Lexeme::Eof,
            Lexeme::Else,
            Lexeme::ElseIf,
        ]) {
            None
        } else {
            Some(self.expression()?)
        };
        Ok(Statement::Return {
            value,
            location: self.span_from(&start),
        })
    }

    fn dim_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let name = self.consume(Lexeme::Identifier, "array name after 'dim'")?;
        self.consume(Lexeme::LeftSquare, "'[' after array name")?;
        let mut dimensions = vec![self.expression()?];
        while self.match_any(&[Lexeme::Comma]) {
            dimensions.push(self.expression()?);
        }
        self.consume(Lexeme::RightSquare, "']' after dimensions")?;
        Ok(Statement::Dim {
            name: name.text,
            dimensions,
            location: self.span_from(&start),
        })
    }

    fn goto_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let label = self.consume(Lexeme::Identifier, "label name after 'goto'")?;
        Ok(Statement::Goto {
            label: label.text,
            location: self.span_from(&start),
        })
    }

    fn label_statement(&mut self) -> ParseResult<Statement> {
        let name = self.advance().clone();
        self.advance();
        Ok(Statement::Label {
            name: name.text,
            location: self.span_from(&name.location),
        })
    }

    pub(super) fn library_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let path = self.consume(Lexeme::String, "library path string")?;
        let path = match path.literal {
            Some(Literal::String(path)) => path,
            _ => path.text,
        };
        Ok(Statement::Library {
            path,
            location: self.span_from(&start),
        })
    }

    fn try_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        self.consume_newline()?;
        let try_block = self.block(&[Lexeme::Catch])?;
        self.consume(Lexeme::Catch, "'catch'")?;

        if !self.check(Lexeme::Identifier) {
            return Err(self.error_at_current(ParseErrorKind::MissingCatchVariable));
        }
        let catch_variable = self.advance().text.clone();
        self.consume_newline()?;
        let catch_block = self.block(&[Lexeme::EndTry])?;
        self.consume(Lexeme::EndTry, "'end try'")?;

        Ok(Statement::TryCatch {
            try_block,
            catch_variable,
            catch_block,
            location: self.span_from(&start),
        })
    }

    fn throw_statement(&mut self) -> ParseResult<Statement> {
        let start = self.advance().location.clone();
        let value = self.expression()?;
        Ok(Statement::Throw {
            value,
            location: self.span_from(&start),
        })
    }

    /// Assignment, property/index set, increment, or a bare call.
    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let target = self.call()?;

        if let Some(operator) = self.assignment_operator() {
            let operator_token = self.advance().clone();
            let value = self.expression()?;
            return self.assignment(target, operator, &operator_token, value);
        }

        if self.check_any(&[Lexeme::PlusPlus, Lexeme::MinusMinus]) {
            return self.increment(target);
        }

        match target {
            Expression::Call { .. } => {
                let location = target.location().clone();
                Ok(Statement::Expression {
                    expression: target,
                    location,
                })
            }
            _ => Err(ParseError::at(
                ParseErrorKind::ExpressionNotStatement,
                target.location(),
            )),
        }
    }

    /// `=` yields `None` inside `Some`; compound operators carry their
    /// binary operator.
    fn assignment_operator(&self) -> Option<Option<BinaryOperator>> {
        let operator = match self.peek().kind {
            Lexeme::Equal => None,
            Lexeme::PlusEqual => Some(BinaryOperator::Add),
            Lexeme::MinusEqual => Some(BinaryOperator::Subtract),
            Lexeme::StarEqual => Some(BinaryOperator::Multiply),
            Lexeme::SlashEqual => Some(BinaryOperator::Divide),
            Lexeme::BackslashEqual => Some(BinaryOperator::IntegerDivide),
            Lexeme::LeftShiftEqual => Some(BinaryOperator::LeftShift),
            Lexeme::RightShiftEqual => Some(BinaryOperator::RightShift),
            _ => return None,
        };
        Some(operator)
    }

    fn assignment(
        &self,
        target: Expression,
        operator: Option<BinaryOperator>,
        operator_token: &Token,
        value: Expression,
    ) -> ParseResult<Statement> {
        let location = target.location().to(value.location());
        let value = match operator {
            None => value,
            Some(operator) => Expression::Binary {
                left: Box::new(target.clone()),
                operator,
                right: Box::new(value),
                location: location.clone(),
            },
        };

        match target {
            Expression::Variable { name, .. } => Ok(Statement::Assignment {
                name,
                value,
                location,
            }),
            Expression::DottedGet { object, name, .. } => Ok(Statement::DottedSet {
                object: *object,
                name,
                value,
                location,
            }),
            Expression::IndexedGet { object, index, .. } => Ok(Statement::IndexedSet {
                object: *object,
                index: *index,
                value,
                location,
            }),
            _ => Err(ParseError::at(
                ParseErrorKind::InvalidAssignmentTarget,
                &operator_token.location,
            )),
        }
    }

    fn increment(&mut self, target: Expression) -> ParseResult<Statement> {
        let operator_token = self.advance().clone();

        if !target.is_assignable() {
            let kind = if matches!(target, Expression::Call { .. }) {
                ParseErrorKind::IncrementOnCall
            } else {
                ParseErrorKind::IncrementOnNonAssignable
            };
            return Err(ParseError::at(kind, &operator_token.location));
        }

        if self.check_any(&[Lexeme::PlusPlus, Lexeme::MinusMinus]) {
            return Err(self.error_at_current(ParseErrorKind::ConsecutiveIncrement));
        }

        let operator = if operator_token.kind == Lexeme::PlusPlus {
            IncrementOperator::Increment
        } else {
            IncrementOperator::Decrement
        };
        let location = target.location().to(&operator_token.location);
        Ok(Statement::Increment {
            target,
            operator,
            location,
        })
    }
}

impl ParseError {
    fn at(kind: ParseErrorKind, location: &Location) -> Self {
        Self {
            kind,
            location: location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{PrintItem, Statement};
    use crate::lexer::scan;
    use crate::parser::{ParseErrorKind, ParseResults, parse};

    fn parse_source(source: &str) -> ParseResults {
        parse(&scan(source, "test.brs").tokens)
    }

    #[test]
    fn single_line_if_with_else() {
        let results = parse_source("if x then print 1 : print 2 else print 3");
        assert!(results.errors.is_empty(), "{:?}", results.errors);
        let Statement::If {
            then_branch,
            else_branch,
            ..
        } = &results.statements[0]
        else {
            panic!("expected if");
        };
        assert_eq!(then_branch.statements.len(), 2);
        assert_eq!(else_branch.as_ref().map(|b| b.statements.len()), Some(1));
    }

    #[test]
    fn block_if_without_then() {
        let results = parse_source("if x\n  y = 1\nelse if z then\n  y = 2\nelse\n  y = 3\nend if\n");
        assert!(results.errors.is_empty(), "{:?}", results.errors);
        let Statement::If { else_ifs, .. } = &results.statements[0] else {
            panic!("expected if");
        };
        assert_eq!(else_ifs.len(), 1);
    }

    #[test]
    fn block_location_excludes_header_and_terminator() {
        let results = parse_source("while true\n  x = 1\nend while\n");
        let Statement::While { body, .. } = &results.statements[0] else {
            panic!("expected while");
        };
        assert_eq!(body.location.start.line, 2);
        assert_eq!(body.location.start.column, 1);
        assert_eq!(body.location.end.line, 3);
        assert_eq!(body.location.end.column, 1);
    }

    #[test]
    fn for_step_defaults_to_one() {
        let results = parse_source("for i = 0 to 10\nnext i\n");
        assert!(results.errors.is_empty(), "{:?}", results.errors);
        assert!(matches!(results.statements[0], Statement::For { .. }));
    }

    #[test]
    fn print_separators() {
        let results = parse_source("print a; b, c;");
        let Statement::Print { items, .. } = &results.statements[0] else {
            panic!("expected print");
        };
        assert_eq!(items.len(), 6);
        assert_eq!(items[1], PrintItem::Space);
        assert_eq!(items[3], PrintItem::Tab);
        assert_eq!(items[5], PrintItem::Space);
    }

    #[test]
    fn increment_on_call_is_rejected() {
        let results = parse_source("foo()++");
        assert_eq!(results.errors[0].kind, ParseErrorKind::IncrementOnCall);
    }

    #[test]
    fn consecutive_increments_are_rejected() {
        let results = parse_source("x++--");
        assert_eq!(results.errors[0].kind, ParseErrorKind::ConsecutiveIncrement);
    }

    #[test]
    fn catch_requires_variable() {
        let results = parse_source("try\n  x = 1\ncatch\n  x = 2\nend try\n");
        assert_eq!(results.errors[0].kind, ParseErrorKind::MissingCatchVariable);
    }

    #[test]
    fn bare_expression_is_not_a_statement() {
        let results = parse_source("x + 1");
        assert_eq!(results.errors[0].kind, ParseErrorKind::ExpressionNotStatement);
    }

    #[test]
    fn compound_assignment_desugars() {
        let results = parse_source("m.count += 2");
        assert!(matches!(results.statements[0], Statement::DottedSet { .. }));
    }
}
