//! Concrete child-process argument lists for one (module, case) pair.
//!
//! The simulator's command-line contract, in order:
//!
//! - `--wave=<waves_dir>/<module>/<number>.ghw` — case-scoped wave output,
//!   so cases never collide even when run concurrently.
//! - `-gg_module=<name>` plus the two `tdata` width generics.
//! - Three per-case fixture files (`_in.dat`, `_out.dat`, `.emu`), each
//!   replaced by [`DISCARD_PATH`] when absent — not every case provides
//!   every fixture.
//! - Four seed generics, one pair per randomized handshake stream.

use std::path::{Path, PathBuf};

use crate::catalog::{Case, Module};
use crate::seed::SeedQuadruple;
use crate::HarnessConfig;

/// Canonical stand-in path for an absent optional fixture. The simulator
/// treats a read from it as an empty fixture.
pub const DISCARD_PATH: &str = "/dev/null";

/// Ephemeral, fully resolved invocation of the simulation executable.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Executable to spawn.
    pub program: PathBuf,
    /// Full argument list, seeds included.
    pub args: Vec<String>,
    /// The quadruple baked into `args`, kept for failure reporting.
    pub seeds: SeedQuadruple,
}

impl Invocation {
    /// Resolve all arguments for `case` of `module`, drawing fresh seeds.
    #[must_use]
    pub fn build(config: &HarnessConfig, module: &Module, case: &Case) -> Self {
        Self::with_seeds(config, module, case, SeedQuadruple::random())
    }

    /// Same as [`Invocation::build`] with a caller-provided quadruple.
    ///
    /// Fixture resolution is a pure existence check: a present file is
    /// passed through verbatim, an absent one becomes [`DISCARD_PATH`].
    /// Absence is legal and never an error.
    #[must_use]
    pub fn with_seeds(
        config: &HarnessConfig,
        module: &Module,
        case: &Case,
        seeds: SeedQuadruple,
    ) -> Self {
        let stub = config.cases_dir.join(&module.name).join(&case.number);
        let wave = wave_path(config, module, case);

        let args = vec![
            format!("--wave={}", wave.display()),
            format!("-gg_module={}", module.name),
            format!("-gg_in_tdata_width={}", module.g_in_tdata_width),
            format!("-gg_out_tdata_width={}", module.g_out_tdata_width),
            format!("-gg_in_filename={}", fixture_or_discard(&stub, "_in.dat")),
            format!("-gg_out_filename={}", fixture_or_discard(&stub, "_out.dat")),
            format!("-gg_emu_filename={}", fixture_or_discard(&stub, ".emu")),
            format!("-gg_random_tvalid_seed_0={}", seeds.tvalid[0]),
            format!("-gg_random_tvalid_seed_1={}", seeds.tvalid[1]),
            format!("-gg_random_tready_seed_0={}", seeds.tready[0]),
            format!("-gg_random_tready_seed_1={}", seeds.tready[1]),
        ];

        Self {
            program: config.testbench.clone(),
            args,
            seeds,
        }
    }
}

/// Case-scoped waveform output path.
#[must_use]
pub fn wave_path(config: &HarnessConfig, module: &Module, case: &Case) -> PathBuf {
    config
        .waves_dir
        .join(&module.name)
        .join(format!("{}.ghw", case.number))
}

/// Append `suffix` to the case's fixture stub; return the resulting path
/// when the file exists, [`DISCARD_PATH`] otherwise.
fn fixture_or_discard(stub: &Path, suffix: &str) -> String {
    let mut os = stub.as_os_str().to_owned();
    os.push(suffix);
    let path = PathBuf::from(os);
    if path.is_file() {
        path.display().to_string()
    } else {
        DISCARD_PATH.to_owned()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
