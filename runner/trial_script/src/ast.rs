//! Syntax tree for trial scripts.
//!
//! Statements carry the line they start on. Expressions do not: failures
//! and coverage are reported per statement.

use std::fmt;

/// A parsed script: either a test file or a module.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chunk {
    pub stmts: Vec<Stmt>,
    /// Number of `if` statements; branch ids are `0..branch_count`.
    pub branch_count: u32,
}

pub type Block = Vec<Stmt>;

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

impl Stmt {
    /// Describes, tests and hooks are declarations: collected, not executed.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::Describe { .. } | StmtKind::Test(_) | StmtKind::Hook { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// `use alias = "path"`
    Use { alias: String, path: String },
    /// `let name = value`
    Let { name: String, value: Expr },
    /// `place = value`
    Assign { target: Place, value: Expr },
    /// `if cond { .. } else { .. }`
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
        branch: u32,
    },
    /// `while cond { .. }`
    While { cond: Expr, body: Block },
    /// `wait ms`
    Wait(Expr),
    /// `expect cond [, message]`
    Expect { cond: Expr, message: Option<Expr> },
    /// `fail message`
    Fail(Expr),
    /// `mock global [= value]`
    Mock { global: String, value: Option<Expr> },
    /// `describe "name" { .. }`
    Describe {
        name: String,
        skip: bool,
        body: Block,
    },
    /// `test "name" [timeout N] { .. }`
    Test(TestDecl),
    /// `before_each { .. }` and friends.
    Hook { kind: HookKind, body: Block },
    /// Expression evaluated for its effects (usually a call).
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestDecl {
    pub name: String,
    pub mode: TestMode,
    /// Per-case timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
    pub body: Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestMode {
    Run,
    Skip,
    /// Declared without a body; reported as skipped.
    Todo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::BeforeAll => "before_all",
            HookKind::AfterAll => "after_all",
            HookKind::BeforeEach => "before_each",
            HookKind::AfterEach => "after_each",
        }
    }
}

/// Assignable location.
#[derive(Clone, Debug, PartialEq)]
pub enum Place {
    Var(String),
    /// `module.field`
    Field { object: String, field: String },
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Var(name) => f.write_str(name),
            Place::Field { object, field } => write!(f, "{object}.{field}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Bool(bool),
    Nil,
    Var(String),
    Field { object: Box<Expr>, field: String },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call { callee: String, args: Vec<Expr> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    /// Comparisons get a left/right breakdown in `expect` failures.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    /// Binding power; higher binds tighter.
    pub(crate) fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 5,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Nil => f.write_str("nil"),
            Expr::Var(name) => f.write_str(name),
            Expr::Field { object, field } => write!(f, "{object}.{field}"),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::Not => write!(f, "not {operand}"),
            },
            Expr::Binary { op, left, right } => {
                write_operand(f, left, *op)?;
                write!(f, " {} ", op.as_symbol())?;
                write_operand(f, right, *op)
            }
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expr, parent: BinaryOp) -> fmt::Result {
    match operand {
        Expr::Binary { op, .. } if op.precedence() < parent.precedence() => {
            write!(f, "({operand})")
        }
        _ => write!(f, "{operand}"),
    }
}
