//! Tree-walking interpreter for trial scripts.
//!
//! One [`Interpreter`] evaluates one chunk. It never loads modules itself:
//! every `use` goes through the [`ModuleHost`] it was created with, which is
//! what lets a runner reset all module state by dropping the host's arena.
//!
//! Side effects (`print`, `random`, `now`) go through the borrowed
//! [`Capabilities`]; coverage events go to the borrowed [`Probe`]. Both are
//! threaded into nested module loads through [`Effects`].
//!
//! Cancellation is cooperative: the [`Deadline`] is checked before every
//! statement, on every loop iteration and while waiting.

mod builtins;
mod scope_guard;

pub use scope_guard::CaseScope;

use crate::ast::{BinaryOp, Chunk, Expr, Place, Stmt, StmtKind, UnaryOp};
use crate::capability::Capabilities;
use crate::errors::{ExecResult, RuntimeError, RuntimeErrorKind};
use crate::instrument::Probe;
use crate::value::{ModuleRef, Value};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Longest single sleep inside `wait`, so deadlines stay responsive.
const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Point in time after which the running case (or hook) has timed out.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Instant,
    limit_ms: u64,
}

impl Deadline {
    pub fn after(limit_ms: u64) -> Self {
        Deadline {
            at: Instant::now() + Duration::from_millis(limit_ms),
            limit_ms,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn check(&self) -> ExecResult<()> {
        if self.is_expired() {
            Err(RuntimeErrorKind::Timeout {
                limit_ms: self.limit_ms,
            }
            .into())
        } else {
            Ok(())
        }
    }

    fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}

/// Mutable context lent to a nested module evaluation.
pub struct Effects<'a> {
    pub caps: &'a mut Capabilities,
    pub probe: &'a mut dyn Probe,
    pub deadline: Option<Deadline>,
}

/// Source of module instances.
///
/// `requester` is the raw identifier of the chunk executing the `use`.
pub trait ModuleHost {
    fn require(
        &mut self,
        request: &str,
        requester: &str,
        effects: Effects<'_>,
    ) -> ExecResult<ModuleRef>;
}

/// Evaluates one chunk.
pub struct Interpreter<'a> {
    /// Raw identifier of the chunk being evaluated.
    origin: Rc<str>,
    host: &'a mut dyn ModuleHost,
    caps: &'a mut Capabilities,
    probe: &'a mut dyn Probe,
    deadline: Option<Deadline>,
    /// Top-level bindings of the chunk.
    globals: FxHashMap<String, Value>,
    /// Block scopes, innermost last.
    scopes: Vec<FxHashMap<String, Value>>,
}

impl<'a> Interpreter<'a> {
    pub fn new<'e: 'a>(origin: &str, host: &'a mut dyn ModuleHost, effects: Effects<'e>) -> Self {
        Interpreter {
            origin: Rc::from(origin),
            host,
            caps: effects.caps,
            probe: effects.probe,
            deadline: effects.deadline,
            globals: FxHashMap::default(),
            scopes: Vec::new(),
        }
    }

    /// Evaluate a module chunk and hand back its top-level bindings.
    pub fn run_module(mut self, chunk: &Chunk) -> ExecResult<FxHashMap<String, Value>> {
        if let Some(decl) = chunk.stmts.iter().find(|s| s.is_declaration()) {
            return Err(
                RuntimeError::new(RuntimeErrorKind::DeclarationInModule)
                    .at(&self.origin, decl.line),
            );
        }
        for stmt in &chunk.stmts {
            self.exec(stmt)?;
        }
        Ok(self.globals)
    }

    /// Run the executable top-level code of a test file. Declarations are
    /// counted as executed but otherwise left to the engine.
    pub fn run_top_level(&mut self, chunk: &Chunk) -> ExecResult<()> {
        chunk.stmts.iter().try_for_each(|stmt| self.exec(stmt))
    }

    /// Run a test or hook body under `deadline`.
    pub fn run_block(&mut self, stmts: &[Stmt], deadline: Option<Deadline>) -> ExecResult<()> {
        let outer = std::mem::replace(&mut self.deadline, deadline);
        let result = self.exec_block(stmts);
        self.deadline = outer;
        result
    }

    /// Load a module through the host.
    pub fn require(&mut self, request: &str) -> ExecResult<ModuleRef> {
        self.host.require(
            request,
            &self.origin,
            Effects {
                caps: &mut *self.caps,
                probe: &mut *self.probe,
                deadline: self.deadline,
            },
        )
    }

    // === Statements ===

    fn exec_block(&mut self, stmts: &[Stmt]) -> ExecResult<()> {
        self.scopes.push(FxHashMap::default());
        let result = stmts.iter().try_for_each(|stmt| self.exec(stmt));
        self.scopes.pop();
        result
    }

    fn exec(&mut self, stmt: &Stmt) -> ExecResult<()> {
        self.exec_kind(stmt)
            .map_err(|e| e.at(&self.origin, stmt.line))
    }

    fn exec_kind(&mut self, stmt: &Stmt) -> ExecResult<()> {
        self.check_deadline()?;
        self.probe.line(&self.origin, stmt.line);

        match &stmt.kind {
            StmtKind::Use { alias, path } => {
                let module = self.require(path)?;
                self.define(alias, Value::Module(module));
            }
            StmtKind::Let { name, value } => {
                let value = self.eval(value)?;
                self.define(name, value);
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
                branch,
            } => {
                let taken = self.eval(cond)?.is_truthy();
                self.probe.branch(&self.origin, *branch, taken);
                if taken {
                    self.exec_block(then_block)?;
                } else if let Some(else_block) = else_block {
                    self.exec_block(else_block)?;
                }
            }
            StmtKind::While { cond, body } => loop {
                self.check_deadline()?;
                if !self.eval(cond)?.is_truthy() {
                    break;
                }
                self.exec_block(body)?;
            },
            StmtKind::Wait(ms) => {
                let ms = self.eval_int(ms)?;
                self.wait(ms)?;
            }
            StmtKind::Expect { cond, message } => self.expect(cond, message.as_ref())?,
            StmtKind::Fail(message) => {
                let message = self.eval(message)?.to_string();
                return Err(RuntimeErrorKind::Failed { message }.into());
            }
            StmtKind::Mock { global, value } => {
                let value = value.as_ref().map(|v| self.eval(v)).transpose()?;
                self.caps.mock(global, value.as_ref())?;
            }
            // Collected and scheduled by the engine.
            StmtKind::Describe { .. } | StmtKind::Test(_) | StmtKind::Hook { .. } => {}
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    fn check_deadline(&self) -> ExecResult<()> {
        match &self.deadline {
            Some(deadline) => deadline.check(),
            None => Ok(()),
        }
    }

    /// Suspend the current case. A fake clock advances instantly.
    fn wait(&mut self, ms: i64) -> ExecResult<()> {
        if ms <= 0 || self.caps.advance_clock(ms) {
            return Ok(());
        }
        let end = Instant::now() + Duration::from_millis(ms.unsigned_abs());
        loop {
            self.check_deadline()?;
            let now = Instant::now();
            if now >= end {
                return Ok(());
            }
            let mut slice = (end - now).min(WAIT_SLICE);
            if let Some(deadline) = &self.deadline {
                slice = slice.min(deadline.remaining().max(Duration::from_millis(1)));
            }
            std::thread::sleep(slice);
        }
    }

    fn expect(&mut self, cond: &Expr, message: Option<&Expr>) -> ExecResult<()> {
        // Comparisons are split so a failure can show both sides.
        let (passed, detail) = match cond {
            Expr::Binary { op, left, right } if op.is_comparison() => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                let passed = compare(*op, &left, &right)?;
                (passed, format!("\n  left: {left:?}\n right: {right:?}"))
            }
            _ => (self.eval(cond)?.is_truthy(), String::new()),
        };
        if passed {
            return Ok(());
        }
        let message = match message {
            Some(message) => self.eval(message)?.to_string(),
            None => format!("expect {cond} failed{detail}"),
        };
        Err(RuntimeErrorKind::AssertionFailed { message }.into())
    }

    // === Bindings ===

    fn define(&mut self, name: &str, value: Value) {
        let scope = self.scopes.last_mut().unwrap_or(&mut self.globals);
        scope.insert(name.to_string(), value);
    }

    fn lookup(&self, name: &str) -> ExecResult<Value> {
        self.scopes
            .iter()
            .rev()
            .chain(std::iter::once(&self.globals))
            .find_map(|scope| scope.get(name))
            .cloned()
            .ok_or_else(|| {
                RuntimeErrorKind::UndefinedVariable {
                    name: name.to_string(),
                }
                .into()
            })
    }

    fn assign(&mut self, target: &Place, value: Value) -> ExecResult<()> {
        match target {
            Place::Var(name) => {
                let slot = self
                    .scopes
                    .iter_mut()
                    .rev()
                    .chain(std::iter::once(&mut self.globals))
                    .find_map(|scope| scope.get_mut(name.as_str()));
                match slot {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(RuntimeErrorKind::UndefinedVariable { name: name.clone() }.into()),
                }
            }
            Place::Field { object, field } => match self.lookup(object)? {
                Value::Module(module) => {
                    if module.set(field, value) {
                        Ok(())
                    } else {
                        Err(RuntimeErrorKind::UndefinedField {
                            module: module.name(),
                            field: field.clone(),
                        }
                        .into())
                    }
                }
                other => Err(RuntimeErrorKind::NotAModule {
                    field: field.clone(),
                    type_name: other.type_name().to_string(),
                }
                .into()),
            },
        }
    }

    // === Expressions ===

    fn eval(&mut self, expr: &Expr) -> ExecResult<Value> {
        match expr {
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Str(s) => Ok(Value::str(s)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Nil => Ok(Value::Nil),
            Expr::Var(name) => self.lookup(name),
            Expr::Field { object, field } => match self.eval(object)? {
                Value::Module(module) => {
                    module
                        .get(field)
                        .ok_or_else(|| RuntimeErrorKind::UndefinedField {
                            module: module.name(),
                            field: field.clone(),
                        })
                        .map_err(RuntimeError::from)
                }
                other => Err(RuntimeErrorKind::NotAModule {
                    field: field.clone(),
                    type_name: other.type_name().to_string(),
                }
                .into()),
            },
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                evaluate_unary(*op, &value)
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let left = self.eval(left)?;
                    if left.is_truthy() {
                        self.eval(right)
                    } else {
                        Ok(left)
                    }
                }
                BinaryOp::Or => {
                    let left = self.eval(left)?;
                    if left.is_truthy() {
                        Ok(left)
                    } else {
                        self.eval(right)
                    }
                }
                _ => {
                    let left = self.eval(left)?;
                    let right = self.eval(right)?;
                    evaluate_binary(*op, &left, &right)
                }
            },
            Expr::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<ExecResult<Vec<_>>>()?;
                builtins::call(self.caps, callee, &args)
            }
        }
    }

    fn eval_int(&mut self, expr: &Expr) -> ExecResult<i64> {
        match self.eval(expr)? {
            Value::Int(n) => Ok(n),
            other => Err(type_mismatch("int", &other)),
        }
    }
}

fn type_mismatch(expected: &str, got: &Value) -> RuntimeError {
    RuntimeErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
    .into()
}

fn evaluate_unary(op: UnaryOp, value: &Value) -> ExecResult<Value> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(|| {
            RuntimeErrorKind::IntegerOverflow {
                operation: "negation".to_string(),
            }
            .into()
        }),
        (UnaryOp::Neg, other) => Err(type_mismatch("int", other)),
    }
}

fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> ExecResult<Value> {
    if op.is_comparison() {
        return compare(op, left, right).map(Value::Bool);
    }
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::str(&joined))
        }
        _ => Err(invalid_op(op, left, right)),
    }
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> ExecResult<Value> {
    let (result, operation) = match op {
        BinaryOp::Add => (a.checked_add(b), "addition"),
        BinaryOp::Sub => (a.checked_sub(b), "subtraction"),
        BinaryOp::Mul => (a.checked_mul(b), "multiplication"),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => {
            return Err(RuntimeErrorKind::DivisionByZero.into())
        }
        BinaryOp::Div => (a.checked_div(b), "division"),
        BinaryOp::Rem => (a.checked_rem(b), "remainder"),
        _ => return Err(invalid_op(op, &Value::Int(a), &Value::Int(b))),
    };
    result.map(Value::Int).ok_or_else(|| {
        RuntimeErrorKind::IntegerOverflow {
            operation: operation.to_string(),
        }
        .into()
    })
}

/// Evaluate a comparison operator.
fn compare(op: BinaryOp, left: &Value, right: &Value) -> ExecResult<bool> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match (op, ordering) {
        (BinaryOp::Eq, _) => Ok(left == right),
        (BinaryOp::NotEq, _) => Ok(left != right),
        (BinaryOp::Lt, Some(ord)) => Ok(ord.is_lt()),
        (BinaryOp::LtEq, Some(ord)) => Ok(ord.is_le()),
        (BinaryOp::Gt, Some(ord)) => Ok(ord.is_gt()),
        (BinaryOp::GtEq, Some(ord)) => Ok(ord.is_ge()),
        _ => Err(invalid_op(op, left, right)),
    }
}

fn invalid_op(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeErrorKind::InvalidBinaryOp {
        op,
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
    .into()
}
