//! RAII guard that scopes mocks to one test case.
//!
//! The guard records the capability stack depth when the case starts and
//! restores it on drop, including when the case body returns early with an
//! error or panics.

use super::Interpreter;
use std::ops::{Deref, DerefMut};

/// Interpreter borrowed for the duration of one case.
///
/// Implements `Deref`/`DerefMut`, so the case runs through the guard exactly
/// as it would through the interpreter.
pub struct CaseScope<'guard, 'interp> {
    interpreter: &'guard mut Interpreter<'interp>,
    depth: usize,
}

impl Drop for CaseScope<'_, '_> {
    fn drop(&mut self) {
        self.interpreter.caps.restore_to(self.depth);
    }
}

impl<'interp> Deref for CaseScope<'_, 'interp> {
    type Target = Interpreter<'interp>;

    fn deref(&self) -> &Self::Target {
        self.interpreter
    }
}

impl DerefMut for CaseScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interpreter
    }
}

impl<'a> Interpreter<'a> {
    /// Open a case scope. Mocks installed through it are undone on drop.
    pub fn case_scope(&mut self) -> CaseScope<'_, 'a> {
        let depth = self.caps.depth();
        CaseScope {
            interpreter: self,
            depth,
        }
    }
}
