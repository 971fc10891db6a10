use std::rc::Rc;

use crate::ast::{
    BinaryOperator, Block, ElseIf, Expression, IncrementOperator, PrintItem, Statement,
};
use crate::token::Location;
use crate::value::number::{self, to_f64, to_i64};
use crate::value::{
    BrsObject, BrsType, Callable, MAX_ARRAY_LENGTH, RoArray, RoAssociativeArray, ValueKind,
    try_coerce,
};

use super::{
    At, ExecResult, Halt, Interpreter, Outcome, RuntimeError, RuntimeErrorKind, Scope,
    USER_ERROR_NUMBER,
};

impl Interpreter {
    /// Run statements in order. A `goto` whose label sits in this block
    /// resumes after the label; any other signal goes to the caller.
    pub(crate) fn execute_block(&mut self, statements: &[Statement]) -> ExecResult {
        let mut index = 0;
        while let Some(statement) = statements.get(index) {
            match self.execute(statement)? {
                Outcome::Completed => index += 1,
                Outcome::Goto(label, location) => match find_label(statements, &label) {
                    Some(target) => index = target + 1,
                    None => return Ok(Outcome::Goto(label, location)),
                },
                signal => return Ok(signal),
            }
        }
        Ok(Outcome::Completed)
    }

    fn execute(&mut self, statement: &Statement) -> ExecResult {
        match statement {
            Statement::Expression { expression, .. } => {
                self.evaluate(expression)?;
                Ok(Outcome::Completed)
            }
            Statement::Print { items, location } => self.print(items, location),
            Statement::Assignment {
                name,
                value,
                location,
            } => {
                let value = self.evaluate(value)?;
                self.assign(name, value, location)?;
                Ok(Outcome::Completed)
            }
            Statement::Dim {
                name,
                dimensions,
                location,
            } => self.dim(name, dimensions, location),
            Statement::If {
                condition,
                then_branch,
                else_ifs,
                else_branch,
                ..
            } => self.if_statement(condition, then_branch, else_ifs, else_branch.as_ref()),
            Statement::For {
                counter,
                start,
                end,
                step,
                body,
                location,
            } => self.for_statement(counter, start, end, step, body, location),
            Statement::ForEach {
                item, target, body, ..
            } => self.for_each(item, target, body),
            Statement::While {
                condition, body, ..
            } => self.while_statement(condition, body),
            Statement::Function { name, function, .. } => {
                self.environment.define(
                    Scope::Module,
                    name,
                    BrsType::Callable(Rc::new(Callable::user(Rc::clone(function)))),
                );
                Ok(Outcome::Completed)
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expression) => self.evaluate(expression)?,
                    None => BrsType::Invalid,
                };
                Ok(Outcome::Return(value))
            }
            Statement::DottedSet {
                object,
                name,
                value,
                location,
            } => {
                let target = self.evaluate(object)?;
                let value = self.evaluate(value)?;
                set_property(&target, name, value).at(location)?;
                Ok(Outcome::Completed)
            }
            Statement::IndexedSet {
                object,
                index,
                value,
                location,
            } => {
                let target = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                set_index(&target, &index, value).at(location)?;
                Ok(Outcome::Completed)
            }
            Statement::Increment {
                target,
                operator,
                location,
            } => self.increment(target, *operator, location),
            Statement::Library { path, .. } => {
                tracing::debug!(path = %path, "library import left to the host");
                Ok(Outcome::Completed)
            }
            Statement::Goto { label, location } => {
                Ok(Outcome::Goto(label.clone(), location.clone()))
            }
            Statement::Label { .. } => Ok(Outcome::Completed),
            Statement::ExitFor { location } => Ok(Outcome::ExitFor(location.clone())),
            Statement::ExitWhile { location } => Ok(Outcome::ExitWhile(location.clone())),
            Statement::TryCatch {
                try_block,
                catch_variable,
                catch_block,
                ..
            } => self.try_catch(try_block, catch_variable, catch_block),
            Statement::Throw { value, location } => self.throw(value, location),
            Statement::End { .. } => Err(Halt::End),
            Statement::Stop { location } => {
                tracing::debug!(%location, "stop");
                Ok(Outcome::Completed)
            }
            Statement::Block(block) => self.execute_block(&block.statements),
        }
    }

    /// Store into the function scope, converting to the kind demanded by
    /// a type designator on the name.
    fn assign(&mut self, name: &str, value: BrsType, location: &Location) -> Result<(), Halt> {
        let value = match ValueKind::from_designator(name) {
            Some(kind) => try_coerce(&value, kind)
                .ok_or_else(|| RuntimeErrorKind::AssignmentMismatch {
                    name: name.to_string(),
                    found: value.kind(),
                })
                .at(location)?,
            None => value,
        };
        self.environment.define(Scope::Function, name, value);
        Ok(())
    }

    fn condition(&mut self, expression: &Expression) -> Result<bool, Halt> {
        let value = self.evaluate(expression)?;
        number::truthiness(&value)
            .ok_or_else(|| RuntimeErrorKind::InvalidCondition(value.kind()))
            .at(expression.location())
    }

    fn print(&mut self, items: &[PrintItem], location: &Location) -> ExecResult {
        let width = self.options.print_width;
        let mut newline = true;

        for item in items {
            let written = match item {
                PrintItem::Expression(expression) => {
                    let value = self.evaluate(expression)?;
                    newline = true;
                    self.stdout.write_str(&value.to_string())
                }
                PrintItem::Tab => {
                    newline = false;
                    self.stdout.next_zone(width)
                }
                PrintItem::Space => {
                    newline = false;
                    Ok(())
                }
            };
            written
                .map_err(|error| RuntimeErrorKind::Output(error.to_string()))
                .at(location)?;
        }

        if newline {
            self.stdout
                .write_str("\n")
                .map_err(|error| RuntimeErrorKind::Output(error.to_string()))
                .at(location)?;
        }
        Ok(Outcome::Completed)
    }

    /// `dim a[n, m]` builds nested arrays with `n + 1` and `m + 1` slots.
    fn dim(&mut self, name: &str, dimensions: &[Expression], location: &Location) -> ExecResult {
        let mut sizes = Vec::with_capacity(dimensions.len());
        for dimension in dimensions {
            let value = self.evaluate(dimension)?;
            let size = to_i64(&value)
                .ok_or_else(|| RuntimeErrorKind::TypeMismatch {
                    operator: "dim".to_string(),
                    left: value.kind(),
                    right: None,
                })
                .at(dimension.location())?;
            sizes.push(size);
        }
        let lengths = dimension_lengths(&sizes).at(location)?;
        self.assign(name, nested_array(&lengths), location)?;
        Ok(Outcome::Completed)
    }

    fn if_statement(
        &mut self,
        condition: &Expression,
        then_branch: &Block,
        else_ifs: &[ElseIf],
        else_branch: Option<&Block>,
    ) -> ExecResult {
        if self.condition(condition)? {
            return self.execute_block(&then_branch.statements);
        }
        for else_if in else_ifs {
            if self.condition(&else_if.condition)? {
                return self.execute_block(&else_if.then_branch.statements);
            }
        }
        match else_branch {
            Some(block) => self.execute_block(&block.statements),
            None => Ok(Outcome::Completed),
        }
    }

    /// The end and step expressions are evaluated again before every
    /// iteration. A zero step runs nothing.
    fn for_statement(
        &mut self,
        counter: &str,
        start: &Expression,
        end: &Expression,
        step: &Expression,
        body: &Block,
        location: &Location,
    ) -> ExecResult {
        let initial = self.evaluate(start)?;
        self.assign(counter, initial, location)?;

        loop {
            let end_value = self.evaluate(end)?;
            let step_value = self.evaluate(step)?;
            let current = self
                .environment
                .get(counter)
                .unwrap_or(BrsType::Uninitialized);

            let (Some(step_amount), Some(_), Some(_)) =
                (to_f64(&step_value), to_f64(&current), to_f64(&end_value))
            else {
                return Err(RuntimeErrorKind::TypeMismatch {
                    operator: "for".to_string(),
                    left: current.kind(),
                    right: Some(end_value.kind()),
                })
                .at(location);
            };
            if step_amount == 0.0 {
                break;
            }

            let keep_going = if step_amount > 0.0 {
                number::compare(BinaryOperator::LessEqual, &current, &end_value)
            } else {
                number::compare(BinaryOperator::GreaterEqual, &current, &end_value)
            };
            if !keep_going {
                break;
            }

            match self.execute_block(&body.statements)? {
                Outcome::Completed => {}
                Outcome::ExitFor(_) => break,
                signal => return Ok(signal),
            }

            let current = self
                .environment
                .get(counter)
                .unwrap_or(BrsType::Uninitialized);
            let next = number::binary(BinaryOperator::Add, &current, &step_value).at(location)?;
            self.assign(counter, next, location)?;
        }
        Ok(Outcome::Completed)
    }

    /// Iterates over a snapshot, so the body may mutate the collection.
    fn for_each(&mut self, item: &str, target: &Expression, body: &Block) -> ExecResult {
        let collection = self.evaluate(target)?;
        let elements = match &collection {
            BrsType::Object(object) => object.elements(),
            BrsType::Interface(interface) => interface.object.elements(),
            _ => None,
        }
        .ok_or_else(|| RuntimeErrorKind::NotIterable(collection.kind()))
        .at(target.location())?;

        for element in elements {
            self.environment.define(Scope::Function, item, element);
            match self.execute_block(&body.statements)? {
                Outcome::Completed => {}
                Outcome::ExitFor(_) => break,
                signal => return Ok(signal),
            }
        }
        Ok(Outcome::Completed)
    }

    fn while_statement(&mut self, condition: &Expression, body: &Block) -> ExecResult {
        while self.condition(condition)? {
            match self.execute_block(&body.statements)? {
                Outcome::Completed => {}
                Outcome::ExitWhile(_) => break,
                signal => return Ok(signal),
            }
        }
        Ok(Outcome::Completed)
    }

    /// `x++` reads and writes the target once; the object and index of a
    /// dotted or indexed target are evaluated only once.
    fn increment(
        &mut self,
        target: &Expression,
        operator: IncrementOperator,
        location: &Location,
    ) -> ExecResult {
        let operator = match operator {
            IncrementOperator::Increment => BinaryOperator::Add,
            IncrementOperator::Decrement => BinaryOperator::Subtract,
        };
        let step = BrsType::Int32(1);

        match target {
            Expression::Variable { name, .. } => {
                let current = self.environment.get(name).unwrap_or(BrsType::Uninitialized);
                let next = number::binary(operator, &current, &step).at(location)?;
                self.assign(name, next, location)?;
            }
            Expression::DottedGet { object, name, .. } => {
                let object = self.evaluate(object)?;
                let current = Self::property_of(&object, name).at(location)?;
                let next = number::binary(operator, &current, &step).at(location)?;
                set_property(&object, name, next).at(location)?;
            }
            Expression::IndexedGet { object, index, .. } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let current = Self::index_of(&object, &index).at(location)?;
                let next = number::binary(operator, &current, &step).at(location)?;
                set_index(&object, &index, next).at(location)?;
            }
            other => {
                return Err(RuntimeErrorKind::TypeMismatch {
                    operator: "++".to_string(),
                    left: self.evaluate(other)?.kind(),
                    right: None,
                })
                .at(location);
            }
        }
        Ok(Outcome::Completed)
    }

    /// Errors raised inside the `try` block are bound to the catch
    /// variable as `{ message, number }`. `end` is not an error and is
    /// never caught.
    fn try_catch(
        &mut self,
        try_block: &Block,
        catch_variable: &str,
        catch_block: &Block,
    ) -> ExecResult {
        match self.execute_block(&try_block.statements) {
            Err(Halt::Error(error)) => {
                tracing::debug!(code = error.code(), %error, "caught runtime error");
                let caught = RoAssociativeArray::new();
                caught.set("message", BrsType::String(error.kind.to_string()));
                caught.set("number", BrsType::Int32(error.code()));
                self.environment.define(
                    Scope::Function,
                    catch_variable,
                    BrsType::Object(BrsObject::AssociativeArray(caught)),
                );
                self.execute_block(&catch_block.statements)
            }
            other => other,
        }
    }

    /// `throw "message"` or `throw { message: ..., number: ... }`.
    fn throw(&mut self, value: &Expression, location: &Location) -> ExecResult {
        let value = self.evaluate(value)?;
        let kind = match value.unboxed() {
            BrsType::String(message) => RuntimeErrorKind::Thrown {
                message,
                number: USER_ERROR_NUMBER,
            },
            BrsType::Object(BrsObject::AssociativeArray(aa)) => {
                let message = aa
                    .get("message")
                    .map(|message| message.unboxed().to_string())
                    .unwrap_or_default();
                let number = aa
                    .get("number")
                    .and_then(|number| to_i64(&number))
                    .and_then(|number| i32::try_from(number).ok())
                    .unwrap_or(USER_ERROR_NUMBER);
                RuntimeErrorKind::Thrown { message, number }
            }
            other => RuntimeErrorKind::TypeMismatch {
                operator: "throw".to_string(),
                left: other.kind(),
                right: None,
            },
        };
        Err(Halt::Error(RuntimeError::new(kind, location.clone())))
    }
}

fn find_label(statements: &[Statement], label: &str) -> Option<usize> {
    statements.iter().position(|statement| {
        matches!(statement, Statement::Label { name, .. } if name.eq_ignore_ascii_case(label))
    })
}

/// Slots per dimension, refused when the whole grid would hold more than
/// [`MAX_ARRAY_LENGTH`] elements.
fn dimension_lengths(sizes: &[i64]) -> Result<Vec<usize>, RuntimeErrorKind> {
    let mut total: usize = 1;
    let mut lengths = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let len = usize::try_from(size.saturating_add(1)).unwrap_or(0);
        total = total.saturating_mul(len);
        if len > MAX_ARRAY_LENGTH || total > MAX_ARRAY_LENGTH {
            return Err(RuntimeErrorKind::IndexOutOfRange(size));
        }
        lengths.push(len);
    }
    Ok(lengths)
}

fn nested_array(lengths: &[usize]) -> BrsType {
    let Some((&len, rest)) = lengths.split_first() else {
        return BrsType::Invalid;
    };
    let elements = (0..len).map(|_| nested_array(rest)).collect();
    BrsType::Object(BrsObject::Array(RoArray::new(elements)))
}

fn set_property(target: &BrsType, name: &str, value: BrsType) -> Result<(), RuntimeErrorKind> {
    match target {
        BrsType::Object(object) => object.set_property(name, value),
        other => Err(RuntimeErrorKind::InvalidDottedAccess(other.kind())),
    }
}

fn set_index(target: &BrsType, index: &BrsType, value: BrsType) -> Result<(), RuntimeErrorKind> {
    match target {
        BrsType::Object(object) => object.set_index(index, value),
        BrsType::Interface(interface) => interface.object.set_index(index, value),
        other => Err(RuntimeErrorKind::InvalidIndexedAccess(other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::config::ExecutionOptions;
    use crate::interpreter::OutputBuffer;
    use crate::lexer::scan;
    use crate::parser::parse;

    fn run(source: &str) -> String {
        let stdout = OutputBuffer::new();
        let mut interpreter = Interpreter::with_output(
            ExecutionOptions::default(),
            Box::new(stdout.clone()),
            Box::new(io::sink()),
        );
        let parsed = parse(&scan(source, "stmt.brs").tokens);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        interpreter.exec(&parsed.statements).unwrap();
        stdout.contents()
    }

    #[test]
    fn for_loop_with_negative_step() {
        assert_eq!(run("for i = 3 to 1 step -1\nprint i\nend for"), "3\n2\n1\n");
    }

    #[test]
    fn for_loop_with_zero_step_does_nothing() {
        assert_eq!(run("for i = 0 to 3 step 0\nprint i\nend for\nprint \"done\""), "done\n");
    }

    #[test]
    fn exit_while_leaves_only_the_inner_loop() {
        let source = "i = 0\nwhile i < 2\ni = i + 1\nwhile true\nexit while\nend while\nprint i\nend while";
        assert_eq!(run(source), "1\n2\n");
    }

    #[test]
    fn goto_jumps_forward_within_block() {
        assert_eq!(run("goto skip\nprint 1\nskip:\nprint 2"), "2\n");
    }

    #[test]
    fn goto_escapes_nested_blocks() {
        let source = "i = 0\nagain:\ni = i + 1\nif i < 3 then\ngoto again\nend if\nprint i";
        assert_eq!(run(source), "3\n");
    }

    #[test]
    fn designators_coerce_on_assignment() {
        assert_eq!(run("n% = 3.9\nprint n%"), "3\n");
    }

    #[test]
    fn dim_builds_nested_arrays() {
        assert_eq!(run("dim grid[1, 2]\nprint grid.count()\nprint grid[0].count()"), "2\n3\n");
    }

    #[test]
    fn increment_on_member() {
        assert_eq!(run("a = { n: 1 }\na.n++\na[\"n\"]++\nprint a.n"), "3\n");
    }
}
