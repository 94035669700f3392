//! Trial Script - the scripting language trial test files are written in.
//!
//! # Architecture
//!
//! - `lexer`: logos-based tokenizer with significant newlines
//! - `parser`: recursive descent parser producing a [`Chunk`]
//! - `suite`: describe/test/hook tree collected from a test file
//! - `interpreter`: tree-walking evaluator; modules come from a [`ModuleHost`]
//! - `capability`: the mockable `print`/`random`/`now` table
//! - `instrument`: coverage probes and static instrumentation
//!
//! The crate knows nothing about files or sandbox paths. Chunks are named by
//! the raw identifiers the runner hands in.

pub mod ast;
pub mod capability;
pub mod errors;
pub mod instrument;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod suite;
pub mod value;

pub use ast::{Chunk, HookKind, Stmt, TestMode};
pub use capability::{Capabilities, MOCKABLE_GLOBALS};
pub use errors::{ExecResult, Location, ParseError, RuntimeError, RuntimeErrorKind};
pub use instrument::{Instrumentation, NoProbe, Probe};
pub use interpreter::{CaseScope, Deadline, Effects, Interpreter, ModuleHost};
pub use parser::parse;
pub use suite::{qualified_name, HookBody, Hooks, Suite, SuiteItem, TestCase};
pub use value::{ModuleRef, Value};
