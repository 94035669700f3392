//! Test runner infrastructure.
//!
//! This module provides:
//! - Test discovery: grouped, lazily scanned test files
//! - Test execution: one file at a time per worker, with module state reset
//! - Result tracking: per-case results, per-file reports, run summary
//! - Coverage: line and branch hits merged across workers
//! - Parallel execution: files run concurrently with rayon

mod discovery;

pub use coverage::{
    percentage, BranchCounts, CoverageCollector, CoverageRecord, CoverageReport, CoverageSet,
    ModuleHits,
};
pub use discovery::{discover, Discovery, DiscoveryIter, TestFile};
pub use engine::{file_seed, run_file, EngineSettings, FileRun};
pub use result::{CaseResult, CaseStatus, FileReport, FileState, RunSummary};
pub use runner::{RunOutcome, TestRunner, TestRunnerConfig};
