//! Coverage instrumentation.
//!
//! The interpreter reports every statement it executes and every branch
//! decision to a [`Probe`]. [`Instrumentation`] is the static side: the lines
//! and branch ids a chunk *could* hit. Runners compare the two to detect
//! hits that don't belong to the chunk they were attributed to.

use crate::ast::{Chunk, Stmt, StmtKind};
use std::collections::{BTreeMap, BTreeSet};

/// Receiver for execution events. Both methods default to no-ops.
pub trait Probe {
    /// A statement starting on `line` of chunk `origin` is about to run.
    fn line(&mut self, origin: &str, line: u32) {
        let _ = (origin, line);
    }

    /// `if` number `branch` of chunk `origin` went `taken` (then) or not (else).
    fn branch(&mut self, origin: &str, branch: u32, taken: bool) {
        let _ = (origin, branch, taken);
    }
}

/// Probe that records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProbe;

impl Probe for NoProbe {}

/// Executable lines and branch ids of one chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instrumentation {
    pub lines: BTreeSet<u32>,
    /// Branch id to the line of its `if`.
    pub branches: BTreeMap<u32, u32>,
}

impl Instrumentation {
    pub fn of(chunk: &Chunk) -> Self {
        let mut inst = Instrumentation::default();
        inst.visit(&chunk.stmts);
        inst
    }

    fn visit(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.lines.insert(stmt.line);
            match &stmt.kind {
                StmtKind::If {
                    then_block,
                    else_block,
                    branch,
                    ..
                } => {
                    self.branches.insert(*branch, stmt.line);
                    self.visit(then_block);
                    if let Some(else_block) = else_block {
                        self.visit(else_block);
                    }
                }
                StmtKind::While { body, .. }
                | StmtKind::Describe { body, .. }
                | StmtKind::Hook { body, .. } => self.visit(body),
                StmtKind::Test(decl) => self.visit(&decl.body),
                StmtKind::Use { .. }
                | StmtKind::Let { .. }
                | StmtKind::Assign { .. }
                | StmtKind::Wait(_)
                | StmtKind::Expect { .. }
                | StmtKind::Fail(_)
                | StmtKind::Mock { .. }
                | StmtKind::Expr(_) => {}
            }
        }
    }

    /// Returns true if every hit line and branch belongs to this chunk.
    pub fn accepts<'h>(
        &self,
        mut lines: impl Iterator<Item = &'h u32>,
        mut branches: impl Iterator<Item = &'h u32>,
    ) -> bool {
        lines.all(|l| self.lines.contains(l)) && branches.all(|b| self.branches.contains_key(b))
    }
}
