//! Test-orchestration harness for AXI-Stream HDL simulation testbenches.
//!
//! The harness reads a declarative catalog of modules and test cases,
//! invokes a compiled simulation executable once per case with module- and
//! case-specific generics (including freshly randomized handshake seeds),
//! interprets each exit status against the case's expectation policy, and
//! aggregates everything into a JUnit XML report.
//!
//! # Pipeline
//!
//! [`catalog::Catalog`] → [`orchestrator::run`] → [`runner::run_module`]
//! per module → [`executor::execute`] per case (parameterized by
//! [`invocation::Invocation`], seeded by [`seed::SeedQuadruple`]) →
//! [`report::ReportAggregator`] → JUnit artifact + process exit code.
//!
//! # Expectation policy
//!
//! A case with `invert: true` expects the simulator to *fail*; the
//! conformance rule is `expected = (exit status == 0) XOR invert`. An
//! unexpected outcome is an ordinary recorded test failure. A child
//! process that cannot be spawned at all is a distinct execution error,
//! recorded per case without aborting its siblings.

use std::path::PathBuf;

pub mod catalog;
pub mod executor;
pub mod invocation;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod seed;

/// Result type alias used throughout the harness.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Fatal errors that abort a run before or during artifact production.
///
/// Per-case execution errors are *not* represented here: they are caught
/// at the module-runner boundary and recorded as report entries.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The case catalog could not be loaded or validated.
    #[error("catalog: {0}")]
    Catalog(#[from] catalog::CatalogError),

    /// A selected module name is absent from the catalog.
    #[error("selection: {0}")]
    Selection(#[from] orchestrator::SelectionError),

    /// An I/O error from the filesystem (e.g. writing the report).
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The JUnit artifact could not be serialized.
    #[error("report serialization: {0}")]
    Report(#[from] quick_junit::SerializeError),
}

/// Paths and scheduling knobs shared by every component of a run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Path to the compiled simulation executable.
    pub testbench: PathBuf,
    /// Fixture root: `<cases_dir>/<module>/<number>{_in.dat,_out.dat,.emu}`.
    pub cases_dir: PathBuf,
    /// Waveform root: `<waves_dir>/<module>/<number>.ghw`.
    pub waves_dir: PathBuf,
    /// Where the JUnit XML artifact is written.
    pub report_path: PathBuf,
    /// Maximum number of concurrently running module tasks.
    pub jobs: usize,
    /// Run the cases of one module concurrently instead of sequentially.
    ///
    /// Off by default: wave paths are case-scoped so this is safe, but it
    /// multiplies simultaneous simulator processes by the case count.
    pub case_parallel: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            testbench: PathBuf::from("./testbench"),
            cases_dir: PathBuf::from("cases"),
            waves_dir: PathBuf::from("waveforms"),
            report_path: PathBuf::from("junit.xml"),
            jobs: default_jobs(),
            case_parallel: false,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
