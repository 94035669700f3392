//! Expression parsing: operators, calls, field access.

use super::{ParseResult, Parser};
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::errors::ParseError;
use crate::lexer::TokenKind;

impl Parser<'_> {
    /// Parse any expression.
    pub(crate) fn expression(&mut self) -> ParseResult<Expr> {
        self.parse_precedence(1)
    }

    fn parse_precedence(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.unary()?;
        let mut left_depth = self.expr_depth;

        while let Some(op) = self.binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            self.skip_newlines();
            // All binary operators are left-associative.
            let right = self.parse_precedence(prec + 1)?;
            left_depth = self.wrap(left_depth.max(self.expr_depth))?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.expr_depth = left_depth;
        Ok(left)
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        let op = match self.current().kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary()?;
        self.leave();
        self.expr_depth = self.wrap(self.expr_depth)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        while self.at(&TokenKind::Dot) {
            self.advance();
            let field = self.ident("a field name after `.`")?;
            self.expr_depth = self.wrap(self.expr_depth)?;
            expr = Expr::Field {
                object: Box::new(expr),
                field,
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        self.expr_depth = 1;
        let expr = match &token.kind {
            TokenKind::Int(n) => Expr::Int(*n),
            TokenKind::Str(s) => Expr::Str(s.clone()),
            TokenKind::True => Expr::Bool(true),
            TokenKind::False => Expr::Bool(false),
            TokenKind::Nil => Expr::Nil,
            TokenKind::Ident(name) => {
                if self.at(&TokenKind::LParen) {
                    self.advance();
                    self.enter()?;
                    let (args, deepest) = self.arguments()?;
                    self.leave();
                    self.expr_depth = self.wrap(deepest)?;
                    Expr::Call {
                        callee: name.clone(),
                        args,
                    }
                } else {
                    Expr::Var(name.clone())
                }
            }
            TokenKind::LParen => {
                self.enter()?;
                self.skip_newlines();
                let inner = self.expression()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen, "`)`")?;
                self.leave();
                inner
            }
            other => {
                return Err(ParseError::new(
                    token.line,
                    format!("expected an expression, found {other}"),
                ))
            }
        };
        Ok(expr)
    }

    /// Arguments after the opening parenthesis, consuming the closing one.
    /// Also returns the depth of the deepest argument.
    fn arguments(&mut self) -> ParseResult<(Vec<Expr>, u32)> {
        let mut args = Vec::new();
        let mut deepest = 0;
        self.skip_newlines();
        if self.eat(&TokenKind::RParen) {
            return Ok((args, deepest));
        }
        loop {
            args.push(self.expression()?);
            deepest = deepest.max(self.expr_depth);
            self.skip_newlines();
            if self.eat(&TokenKind::RParen) {
                return Ok((args, deepest));
            }
            self.expect(&TokenKind::Comma, "`,` or `)`")?;
            self.skip_newlines();
        }
    }
}
