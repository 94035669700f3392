//! Test tree collected from a test file's declarations.
//!
//! Collection is purely structural: it borrows the chunk and never runs
//! anything. The engine walks the resulting [`Suite`] in declaration order.

use crate::ast::{Chunk, HookKind, Stmt, StmtKind, TestDecl, TestMode};

/// A hook body and the line it was declared on.
#[derive(Clone, Copy, Debug)]
pub struct HookBody<'c> {
    pub body: &'c [Stmt],
    pub line: u32,
}

/// Hooks declared directly inside one describe (or the file root).
#[derive(Clone, Debug, Default)]
pub struct Hooks<'c> {
    pub before_all: Vec<HookBody<'c>>,
    pub after_all: Vec<HookBody<'c>>,
    pub before_each: Vec<HookBody<'c>>,
    pub after_each: Vec<HookBody<'c>>,
}

impl<'c> Hooks<'c> {
    fn push(&mut self, kind: HookKind, hook: HookBody<'c>) {
        match kind {
            HookKind::BeforeAll => self.before_all.push(hook),
            HookKind::AfterAll => self.after_all.push(hook),
            HookKind::BeforeEach => self.before_each.push(hook),
            HookKind::AfterEach => self.after_each.push(hook),
        }
    }
}

/// One declared test case.
#[derive(Clone, Copy, Debug)]
pub struct TestCase<'c> {
    pub decl: &'c TestDecl,
    pub line: u32,
}

impl TestCase<'_> {
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn is_skipped(&self) -> bool {
        self.decl.mode != TestMode::Run
    }
}

#[derive(Clone, Debug)]
pub enum SuiteItem<'c> {
    Test(TestCase<'c>),
    Describe(Suite<'c>),
}

/// A describe block, or the file itself when `name` is `None`.
#[derive(Clone, Debug, Default)]
pub struct Suite<'c> {
    pub name: Option<&'c str>,
    pub skip: bool,
    pub line: u32,
    pub hooks: Hooks<'c>,
    pub items: Vec<SuiteItem<'c>>,
}

impl<'c> Suite<'c> {
    /// Collect the root suite of a test file.
    pub fn collect(chunk: &'c Chunk) -> Self {
        let mut root = Suite::default();
        root.fill(&chunk.stmts);
        root
    }

    fn fill(&mut self, stmts: &'c [Stmt]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Test(decl) => self.items.push(SuiteItem::Test(TestCase {
                    decl,
                    line: stmt.line,
                })),
                StmtKind::Describe { name, skip, body } => {
                    let mut child = Suite {
                        name: Some(name),
                        skip: *skip,
                        line: stmt.line,
                        ..Suite::default()
                    };
                    child.fill(body);
                    self.items.push(SuiteItem::Describe(child));
                }
                StmtKind::Hook { kind, body } => self.hooks.push(
                    *kind,
                    HookBody {
                        body,
                        line: stmt.line,
                    },
                ),
                // Executable top-level code is run by the engine before collection.
                _ => {}
            }
        }
    }

    /// Number of test cases in this suite and every nested describe.
    pub fn case_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                SuiteItem::Test(_) => 1,
                SuiteItem::Describe(child) => child.case_count(),
            })
            .sum()
    }
}

/// `outer > inner > leaf`.
pub fn qualified_name(path: &[&str], leaf: &str) -> String {
    let mut name = String::new();
    for segment in path {
        name.push_str(segment);
        name.push_str(" > ");
    }
    name.push_str(leaf);
    name
}
