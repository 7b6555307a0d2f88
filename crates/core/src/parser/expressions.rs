use super::{describe, is_bool_word, is_reserved, Parser};
use crate::ast::{CompareOp, Expression};
use crate::error::GrammarError;
use crate::lexer::Token;

impl<'a> Parser<'a> {
    // -- Expression parsing --------------------------------------

    pub(super) fn parse_expr(&mut self) -> Result<Expression, GrammarError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expression, GrammarError> {
        let mut operands = vec![self.parse_and_expr()?];
        while self.is_word("or") {
            self.advance();
            operands.push(self.parse_and_expr()?);
        }
        Ok(Expression::any(operands))
    }

    fn parse_and_expr(&mut self) -> Result<Expression, GrammarError> {
        let mut operands = vec![self.parse_unary_expr()?];
        while self.is_word("and") {
            self.advance();
            operands.push(self.parse_unary_expr()?);
        }
        Ok(Expression::all(operands))
    }

    fn parse_unary_expr(&mut self) -> Result<Expression, GrammarError> {
        if self.is_word("not") {
            self.advance();
            let e = self.parse_atom_expr()?;
            return Ok(Expression::negate(e));
        }
        self.parse_atom_expr()
    }

    fn parse_atom_expr(&mut self) -> Result<Expression, GrammarError> {
        if self.peek() == &Token::LParen {
            self.advance();
            let e = self.parse_expr()?;
            self.expect_rparen()?;
            return Ok(e);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, GrammarError> {
        let var = self.parse_variable()?;

        if self.is_word("between") {
            self.advance();
            let low = self.parse_value()?;
            self.expect_word("and")?;
            let high = self.parse_value()?;
            return Ok(Expression::all(vec![
                Expression::compare(var.clone(), CompareOp::Gte, low),
                Expression::compare(var, CompareOp::Lte, high),
            ]));
        }

        if self.is_word("is") {
            self.advance();
            let op = if self.is_word("not") {
                self.advance();
                CompareOp::Neq
            } else {
                CompareOp::Eq
            };
            let right = self.parse_value()?;
            return Ok(Expression::compare(var, op, right));
        }

        let op = self.parse_compare_op()?;
        let right = self.parse_value()?;
        Ok(Expression::compare(var, op, right))
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, GrammarError> {
        let op = match self.peek() {
            Token::Eq => CompareOp::Eq,
            Token::Neq => CompareOp::Neq,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            other => {
                return Err(self.err(format!(
                    "expected comparison operator, got {}",
                    describe(other)
                )))
            }
        };
        self.advance();
        Ok(op)
    }

    fn parse_variable(&mut self) -> Result<Expression, GrammarError> {
        match self.peek().clone() {
            Token::Word(w) if !is_reserved(&w) && !is_bool_word(&w) => {
                self.advance();
                Ok(Expression::var(w))
            }
            other => Err(self.err(format!("expected variable name, got {}", describe(&other)))),
        }
    }

    /// Right-hand side of a comparison. Bare identifiers are variables, which
    /// also covers enum-like symbolic values.
    fn parse_value(&mut self) -> Result<Expression, GrammarError> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expression::number(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expression::string(s))
            }
            Token::Word(w) if is_bool_word(&w) => {
                self.advance();
                Ok(Expression::boolean(w.eq_ignore_ascii_case("true")))
            }
            Token::Word(w) if !is_reserved(&w) => {
                self.advance();
                Ok(Expression::var(w))
            }
            other => Err(self.err(format!("expected value, got {}", describe(&other)))),
        }
    }
}
