//! Recursive descent parser for trial scripts.
//!
//! Statements are newline-terminated. Blocks are brace-delimited and may
//! span lines. Parsing stops at the first error: a file that does not parse
//! never runs, so there is nothing to gain from recovery.

mod expr;

use crate::ast::{Block, Chunk, HookKind, Place, Stmt, StmtKind, TestDecl, TestMode};
use crate::errors::ParseError;
use crate::lexer::{lex, Token, TokenKind};

type ParseResult<T> = Result<T, ParseError>;

/// Deepest nesting of blocks, parentheses, calls and operator chains.
/// Evaluation and drop recurse over the tree, so deeper input is rejected
/// here instead of overflowing the worker's stack later.
pub const MAX_NESTING: u32 = 128;

/// Parse a complete script.
pub fn parse(source: &str) -> Result<Chunk, ParseError> {
    let tokens = lex(source);
    Parser::new(&tokens).parse_chunk()
}

/// Parser state.
pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Next branch id handed to an `if`.
    branches: u32,
    /// Open blocks, parentheses and argument lists.
    depth: u32,
    /// Tree depth of the expression most recently parsed.
    expr_depth: u32,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            branches: 0,
            depth: 0,
            expr_depth: 0,
        }
    }

    fn parse_chunk(mut self) -> ParseResult<Chunk> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.at(&TokenKind::Eof) {
            stmts.push(self.statement()?);
            self.end_of_statement()?;
            self.skip_separators();
        }
        Ok(Chunk {
            stmts,
            branch_count: self.branches,
        })
    }

    // === Token helpers ===

    fn current(&self) -> &'t Token {
        // The token list always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn line(&self) -> u32 {
        self.current().line
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn advance(&mut self) -> &'t Token {
        let token = self.current();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> ParseResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        ParseError::new(
            self.line(),
            format!("expected {what}, found {}", self.current().kind),
        )
    }

    fn ident(&mut self, what: &str) -> ParseResult<String> {
        if let TokenKind::Ident(name) = &self.current().kind {
            self.advance();
            Ok(name.clone())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn string(&mut self, what: &str) -> ParseResult<String> {
        if let TokenKind::Str(s) = &self.current().kind {
            self.advance();
            Ok(s.clone())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn too_deep(&self) -> ParseError {
        ParseError::new(
            self.line(),
            format!("nesting exceeds {MAX_NESTING} levels"),
        )
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Depth of a node wrapping a child of depth `child`.
    fn wrap(&self, child: u32) -> ParseResult<u32> {
        if child >= MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok(child + 1)
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn skip_separators(&mut self) {
        while self.eat(&TokenKind::Newline) || self.eat(&TokenKind::Semi) {}
    }

    /// A statement ends at a newline, `;`, `}` (left in place) or end of file.
    fn end_of_statement(&mut self) -> ParseResult<()> {
        match self.current().kind {
            TokenKind::Newline | TokenKind::Semi => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    // === Statements ===

    fn statement(&mut self) -> ParseResult<Stmt> {
        let line = self.line();
        let kind = match &self.current().kind {
            TokenKind::Use => self.use_stmt()?,
            TokenKind::Let => {
                self.advance();
                let name = self.ident("a variable name after `let`")?;
                self.expect(&TokenKind::Eq, "`=`")?;
                let value = self.expression()?;
                StmtKind::Let { name, value }
            }
            TokenKind::If => self.if_stmt()?,
            TokenKind::While => {
                self.advance();
                let cond = self.expression()?;
                let body = self.plain_block()?;
                StmtKind::While { cond, body }
            }
            TokenKind::Wait => {
                self.advance();
                StmtKind::Wait(self.expression()?)
            }
            TokenKind::Expect => {
                self.advance();
                let cond = self.expression()?;
                let message = if self.eat(&TokenKind::Comma) {
                    Some(self.expression()?)
                } else {
                    None
                };
                StmtKind::Expect { cond, message }
            }
            TokenKind::Fail => {
                self.advance();
                StmtKind::Fail(self.expression()?)
            }
            TokenKind::Mock => {
                self.advance();
                let global = self.ident("a global name after `mock`")?;
                let value = if self.eat(&TokenKind::Eq) {
                    Some(self.expression()?)
                } else {
                    None
                };
                StmtKind::Mock { global, value }
            }
            TokenKind::Describe => self.describe()?,
            TokenKind::Test => self.test()?,
            TokenKind::BeforeAll => self.hook(HookKind::BeforeAll)?,
            TokenKind::AfterAll => self.hook(HookKind::AfterAll)?,
            TokenKind::BeforeEach => self.hook(HookKind::BeforeEach)?,
            TokenKind::AfterEach => self.hook(HookKind::AfterEach)?,
            _ => self.expr_or_assign()?,
        };
        Ok(Stmt { kind, line })
    }

    fn use_stmt(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let alias = self.ident("a module alias after `use`")?;
        self.expect(&TokenKind::Eq, "`=`")?;
        let path = self.string("a module path string")?;
        Ok(StmtKind::Use { alias, path })
    }

    fn if_stmt(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let branch = self.branches;
        self.branches += 1;
        let cond = self.expression()?;
        let then_block = self.plain_block()?;

        // `else` may sit on the line after the closing brace.
        let save = self.pos;
        self.skip_newlines();
        let else_block = if self.eat(&TokenKind::Else) {
            if self.at(&TokenKind::If) {
                let line = self.line();
                self.enter()?;
                let nested = self.if_stmt()?;
                self.leave();
                Some(vec![Stmt { kind: nested, line }])
            } else {
                Some(self.plain_block()?)
            }
        } else {
            self.pos = save;
            None
        };

        Ok(StmtKind::If {
            cond,
            then_block,
            else_block,
            branch,
        })
    }

    /// `.skip` / `.todo` modifier after `describe` or `test`.
    fn modifier(&mut self) -> ParseResult<Option<String>> {
        if self.eat(&TokenKind::Dot) {
            Ok(Some(self.ident("`skip` or `todo`")?))
        } else {
            Ok(None)
        }
    }

    fn describe(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let skip = match self.modifier()?.as_deref() {
            None => false,
            Some("skip") => true,
            Some(other) => {
                return Err(ParseError::new(
                    self.line(),
                    format!("unknown describe modifier `{other}`"),
                ))
            }
        };
        let name = self.string("a describe name")?;
        let body = self.block()?;
        if let Some(stmt) = body.iter().find(|s| !s.is_declaration()) {
            return Err(ParseError::new(
                stmt.line,
                "only tests, hooks and describe blocks may appear inside describe",
            ));
        }
        Ok(StmtKind::Describe { name, skip, body })
    }

    fn test(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let mode = match self.modifier()?.as_deref() {
            None => TestMode::Run,
            Some("skip") => TestMode::Skip,
            Some("todo") => TestMode::Todo,
            Some(other) => {
                return Err(ParseError::new(
                    self.line(),
                    format!("unknown test modifier `{other}`"),
                ))
            }
        };
        let name = self.string("a test name")?;

        let timeout_ms = if self.eat(&TokenKind::Timeout) {
            match self.current().kind {
                TokenKind::Int(ms) => {
                    self.advance();
                    Some(u64::try_from(ms).unwrap_or(0))
                }
                _ => return Err(self.unexpected("a timeout in milliseconds")),
            }
        } else {
            None
        };

        let body = if mode == TestMode::Todo {
            if self.at(&TokenKind::LBrace) {
                return Err(ParseError::new(
                    self.line(),
                    "`test.todo` cannot have a body",
                ));
            }
            Vec::new()
        } else {
            self.plain_block()?
        };

        Ok(StmtKind::Test(TestDecl {
            name,
            mode,
            timeout_ms,
            body,
        }))
    }

    fn hook(&mut self, kind: HookKind) -> ParseResult<StmtKind> {
        self.advance();
        let body = self.plain_block()?;
        Ok(StmtKind::Hook { kind, body })
    }

    fn expr_or_assign(&mut self) -> ParseResult<StmtKind> {
        let line = self.line();
        let expr = self.expression()?;
        if !self.eat(&TokenKind::Eq) {
            return Ok(StmtKind::Expr(expr));
        }
        let target = match expr {
            crate::ast::Expr::Var(name) => Place::Var(name),
            crate::ast::Expr::Field { object, field } => match *object {
                crate::ast::Expr::Var(object) => Place::Field { object, field },
                _ => return Err(ParseError::new(line, "invalid assignment target")),
            },
            _ => return Err(ParseError::new(line, "invalid assignment target")),
        };
        let value = self.expression()?;
        Ok(StmtKind::Assign { target, value })
    }

    fn block(&mut self) -> ParseResult<Block> {
        self.expect(&TokenKind::LBrace, "`{`")?;
        self.enter()?;
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            stmts.push(self.statement()?);
            self.end_of_statement()?;
            self.skip_separators();
        }
        self.advance();
        self.leave();
        Ok(stmts)
    }

    /// Block of executable statements: no tests, describes or hooks.
    fn plain_block(&mut self) -> ParseResult<Block> {
        let body = self.block()?;
        if let Some(stmt) = body.iter().find(|s| s.is_declaration()) {
            return Err(ParseError::new(
                stmt.line,
                "tests, describes and hooks must be declared at the top level or inside describe",
            ));
        }
        Ok(body)
    }
}
