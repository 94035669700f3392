//! Module registry: the only way a script obtains a module.
//!
//! Each worker owns one [`ModuleRegistry`]. Module instances live in an
//! arena that [`ModuleRegistry::reset_before_file`] drops and reallocates, so
//! nothing one test file evaluated is observable to the next. Parsed chunks
//! carry no runtime state and are cached across resets.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use trial_script::{
    parse, Chunk, Effects, ExecResult, Instrumentation, Interpreter, ModuleHost, ModuleRef,
    ParseError, RuntimeErrorKind,
};

use crate::paths::{module_source, normalize_relative, PathError, PathRewriter};

/// Failure to produce a chunk for a raw identifier.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("failed to read {source_path}: {source}")]
    Read {
        source_path: String,
        source: std::io::Error,
    },
    #[error("syntax error in {source_path} at {source}")]
    Parse {
        source_path: String,
        source: ParseError,
    },
}

/// Module instances created since the last reset.
#[derive(Default)]
struct ModuleArena {
    loaded: FxHashMap<String, ModuleRef>,
    /// Modules whose evaluation is in progress, for cycle detection.
    loading: FxHashSet<String>,
}

pub struct ModuleRegistry {
    root: PathBuf,
    rewriter: Arc<PathRewriter>,
    arena: ModuleArena,
    chunks: FxHashMap<String, Rc<Chunk>>,
    resets: u64,
}

impl ModuleRegistry {
    pub fn new(root: &Path, rewriter: Arc<PathRewriter>) -> Self {
        ModuleRegistry {
            root: root.to_path_buf(),
            rewriter,
            arena: ModuleArena::default(),
            chunks: FxHashMap::default(),
            resets: 0,
        }
    }

    /// Drop every module instance. The next `use` of any module re-evaluates it.
    pub fn reset_before_file(&mut self) {
        let dropped = self.loaded_count();
        for module in self.arena.loaded.values() {
            module.release();
        }
        self.arena = ModuleArena::default();
        self.resets += 1;
        tracing::debug!(dropped, resets = self.resets, "module registry reset");
    }

    /// Number of module instances alive in the current arena.
    pub fn loaded_count(&self) -> usize {
        self.arena.loaded.len()
    }

    /// Resolve a `use` request to a raw identifier.
    ///
    /// Requests starting with `./` or `../` are relative to the requesting
    /// chunk's directory; anything else is relative to the project root.
    pub fn resolve(&self, request: &str, requester: &str) -> ExecResult<String> {
        let not_found = || RuntimeErrorKind::ModuleNotFound {
            request: request.to_string(),
        };
        let joined = if request.starts_with("./") || request.starts_with("../") {
            let requester_source = self.rewriter.to_source(requester).map_err(|_| not_found())?;
            let dir = requester_source
                .rsplit_once('/')
                .map_or("", |(dir, _)| dir);
            format!("{dir}/{request}")
        } else {
            request.to_string()
        };
        let source = normalize_relative(&module_source(&joined, self.rewriter.extension()))
            .ok_or_else(not_found)?;
        let raw = self.rewriter.to_raw(&source).map_err(|_| not_found())?;
        Ok(raw.to_string())
    }

    /// Parsed chunk for `raw`, read from disk on first use.
    pub fn chunk(&mut self, raw: &str) -> Result<Rc<Chunk>, LoadError> {
        if let Some(chunk) = self.chunks.get(raw) {
            return Ok(Rc::clone(chunk));
        }
        let source_path = self.rewriter.to_source(raw)?.to_string();
        let text = std::fs::read_to_string(self.root.join(&source_path)).map_err(|source| {
            LoadError::Read {
                source_path: source_path.clone(),
                source,
            }
        })?;
        let chunk = Rc::new(parse(&text).map_err(|source| LoadError::Parse {
            source_path,
            source,
        })?);
        self.chunks.insert(raw.to_string(), Rc::clone(&chunk));
        Ok(chunk)
    }

    /// Static instrumentation of an already parsed chunk.
    pub fn instrumentation(&self, raw: &str) -> Option<Instrumentation> {
        self.chunks.get(raw).map(|chunk| Instrumentation::of(chunk))
    }

    fn evaluate(&mut self, raw: &str, request: &str, effects: Effects<'_>) -> ExecResult<ModuleRef> {
        let chunk = self
            .chunk(raw)
            .map_err(|e| RuntimeErrorKind::ModuleLoad {
                request: request.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(module = raw, "evaluating module");
        let exports = Interpreter::new(raw, self, effects).run_module(&chunk)?;
        Ok(ModuleRef::new(raw, exports))
    }
}

impl ModuleHost for ModuleRegistry {
    fn require(
        &mut self,
        request: &str,
        requester: &str,
        effects: Effects<'_>,
    ) -> ExecResult<ModuleRef> {
        let raw = self.resolve(request, requester)?;
        if let Some(module) = self.arena.loaded.get(&raw) {
            return Ok(module.clone());
        }
        if !self.arena.loading.insert(raw.clone()) {
            return Err(RuntimeErrorKind::CyclicRequire {
                request: request.to_string(),
            }
            .into());
        }
        let result = self.evaluate(&raw, request, effects);
        self.arena.loading.remove(&raw);

        let module = result?;
        self.arena.loaded.insert(raw, module.clone());
        Ok(module)
    }
}
