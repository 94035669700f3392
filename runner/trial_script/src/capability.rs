//! Interceptable globals: print, random and now.
//!
//! Scripts never touch process globals. Output, randomness and time go
//! through a [`Capabilities`] table owned by the interpreter, created fresh
//! for every file. `mock` swaps one entry and pushes the previous value on a
//! restore stack; callers record [`Capabilities::depth`] when a scope opens
//! and [`Capabilities::restore_to`] it when the scope closes, so mocks made
//! inside a test never outlive it.
//!
//! Random and time sources use enum dispatch between real and mocked.

use crate::errors::RuntimeErrorKind;
use crate::value::Value;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Globals that `mock` may intercept. Anything else is `UnsupportedMock`.
pub const MOCKABLE_GLOBALS: [&str; 3] = ["print", "random", "now"];

/// Source for `random(n)`.
#[derive(Clone, Debug)]
pub enum RandomSource {
    Seeded(StdRng),
    /// Mocked: always returns the same value.
    Fixed(i64),
}

impl RandomSource {
    /// Next value in `0..bound`; `bound` must be positive.
    fn next_below(&mut self, bound: i64) -> i64 {
        match self {
            RandomSource::Seeded(rng) => rng.gen_range(0..bound),
            RandomSource::Fixed(value) => *value,
        }
    }
}

/// Source for `now()`, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock since the Unix epoch.
    Real,
    /// Mocked: only moves when `wait` advances it.
    Fake(i64),
}

impl Clock {
    fn now_ms(self) -> i64 {
        match self {
            Clock::Real => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX)),
            Clock::Fake(ms) => ms,
        }
    }
}

/// A capability value displaced by `mock`, restored when its scope closes.
#[derive(Clone, Debug)]
enum Displaced {
    Print(String),
    Random(RandomSource),
    Clock(Clock),
}

/// Per-file table of interceptable globals.
#[derive(Clone, Debug)]
pub struct Capabilities {
    /// Captured `print` output of the innermost print mock, or of the file.
    print: String,
    random: RandomSource,
    clock: Clock,
    displaced: Vec<Displaced>,
}

impl Capabilities {
    /// Capturing print, seeded PRNG, real clock.
    pub fn new(seed: u64) -> Self {
        Capabilities {
            print: String::new(),
            random: RandomSource::Seeded(StdRng::seed_from_u64(seed)),
            clock: Clock::Real,
            displaced: Vec::new(),
        }
    }

    /// Intercept `global` with `value`.
    pub fn mock(&mut self, global: &str, value: Option<&Value>) -> Result<(), RuntimeErrorKind> {
        let invalid = |reason: &str| RuntimeErrorKind::InvalidMock {
            name: global.to_string(),
            reason: reason.to_string(),
        };
        match global {
            "print" => {
                if value.is_some() {
                    return Err(invalid("`mock print` takes no value"));
                }
                let previous = std::mem::take(&mut self.print);
                self.displaced.push(Displaced::Print(previous));
            }
            "random" => {
                let Some(Value::Int(fixed)) = value else {
                    return Err(invalid("expected an int value"));
                };
                let previous = std::mem::replace(&mut self.random, RandomSource::Fixed(*fixed));
                self.displaced.push(Displaced::Random(previous));
            }
            "now" => {
                let start = match value {
                    None => self.clock.now_ms(),
                    Some(Value::Int(ms)) => *ms,
                    Some(_) => return Err(invalid("expected an int value")),
                };
                let previous = std::mem::replace(&mut self.clock, Clock::Fake(start));
                self.displaced.push(Displaced::Clock(previous));
            }
            other => {
                return Err(RuntimeErrorKind::UnsupportedMock {
                    name: other.to_string(),
                })
            }
        }
        tracing::trace!(global, depth = self.displaced.len(), "mock installed");
        Ok(())
    }

    /// Number of active mocks.
    pub fn depth(&self) -> usize {
        self.displaced.len()
    }

    /// Undo mocks, newest first, until only `depth` remain.
    pub fn restore_to(&mut self, depth: usize) {
        while self.displaced.len() > depth {
            match self.displaced.pop() {
                Some(Displaced::Print(p)) => self.print = p,
                Some(Displaced::Random(r)) => self.random = r,
                Some(Displaced::Clock(c)) => self.clock = c,
                None => break,
            }
        }
    }

    pub fn print(&mut self, msg: &str) {
        self.print.push_str(msg);
        self.print.push('\n');
    }

    /// Output captured since the innermost `mock print`, or by the file.
    pub fn printed(&self) -> &str {
        &self.print
    }

    pub fn random(&mut self, bound: i64) -> Result<i64, RuntimeErrorKind> {
        if bound <= 0 {
            return Err(RuntimeErrorKind::TypeMismatch {
                expected: "a positive bound".to_string(),
                got: bound.to_string(),
            });
        }
        Ok(self.random.next_below(bound))
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Advance a fake clock by `ms`. Returns false for the real clock,
    /// meaning the caller has to actually wait.
    pub fn advance_clock(&mut self, ms: i64) -> bool {
        match &mut self.clock {
            Clock::Fake(now) => {
                *now = now.saturating_add(ms);
                true
            }
            Clock::Real => false,
        }
    }

    /// Drop every mock and hand back the file's captured console output.
    pub fn into_console(mut self) -> String {
        self.restore_to(0);
        self.print
    }
}
