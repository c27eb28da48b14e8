//! Module selection, fan-out across a bounded worker pool, and final
//! artifact production.
//!
//! Selection is validated before any child process is spawned. Modules
//! then execute on up to `jobs` scoped threads, each task accumulating its
//! module's results locally; suites are merged single-threaded after all
//! tasks join, so the report needs no locking and suite order is selection
//! order regardless of completion order.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use crate::catalog::{Catalog, Module};
use crate::executor::CaseResult;
use crate::report::{Report, ReportAggregator};
use crate::{runner, HarnessConfig, HarnessResult};

// ── Selection ────────────────────────────────────────────────────────────

/// Which modules of the catalog to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every module, in catalog order.
    All,
    /// An explicit, non-empty list of module names, run in the given order.
    Modules(Vec<String>),
}

/// A selected module name is absent from the catalog. Fatal: nothing is
/// executed and no report is written.
#[derive(Debug, thiserror::Error)]
#[error("module `{0}` not found in catalog")]
pub struct SelectionError(pub String);

/// Resolve `selection` against `catalog`.
///
/// # Errors
///
/// Fails on the first unknown module name, before any side effect.
pub fn resolve_selection<'a>(
    catalog: &'a Catalog,
    selection: &Selection,
) -> Result<Vec<&'a Module>, SelectionError> {
    match selection {
        Selection::All => Ok(catalog.modules().iter().collect()),
        Selection::Modules(names) => names
            .iter()
            .map(|name| {
                catalog
                    .get(name)
                    .ok_or_else(|| SelectionError(name.clone()))
            })
            .collect(),
    }
}

// ── Run ──────────────────────────────────────────────────────────────────

/// Final product of a run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    /// `0` when every case conformed to its expectation, `1` otherwise.
    pub exit_code: i32,
}

/// Run the selected modules and write the JUnit artifact.
///
/// The artifact is written whenever execution happened, even when (and
/// especially when) unexpected results make the exit code non-zero. Only
/// catalog/selection failures abort with no artifact.
///
/// # Errors
///
/// [`SelectionError`] for unknown module names; I/O and serialization
/// errors from writing the artifact.
pub fn run(
    config: &HarnessConfig,
    catalog: &Catalog,
    selection: &Selection,
) -> HarnessResult<RunOutcome> {
    let modules = resolve_selection(catalog, selection)?;
    info!(modules = modules.len(), jobs = config.jobs, "starting test run");

    // Register every suite up front: report order is selection order,
    // independent of which module's tasks finish first.
    let mut aggregator = ReportAggregator::new();
    for module in &modules {
        aggregator.register_suite(&module.name);
    }

    let results = run_pool(config, &modules);
    for (module, cases) in modules.iter().zip(results) {
        for case in cases {
            aggregator.add_result(&module.name, case);
        }
    }

    let report = aggregator.finalize();
    persist(config, &report)?;

    let exit_code = i32::from(!report.all_expected());
    Ok(RunOutcome { report, exit_code })
}

/// Execute each module on a bounded pool of scoped worker threads,
/// returning per-module results in `modules` order.
///
/// Workers pull module indices from a shared cursor and keep their results
/// locally until the single-threaded merge below.
fn run_pool(config: &HarnessConfig, modules: &[&Module]) -> Vec<Vec<CaseResult>> {
    let workers = config.jobs.clamp(1, modules.len().max(1));
    let cursor = AtomicUsize::new(0);

    let per_worker: Vec<Vec<(usize, Vec<CaseResult>)>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                s.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        let i = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(module) = modules.get(i).copied() else { break };
                        local.push((i, runner::run_module(config, module)));
                    }
                    local
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_default())
            .collect()
    });

    let mut slots: Vec<Option<Vec<CaseResult>>> = vec![None; modules.len()];
    for (i, cases) in per_worker.into_iter().flatten() {
        slots[i] = Some(cases);
    }

    // A panicked worker loses its local results; surface every affected
    // case rather than dropping the module from the report.
    slots
        .into_iter()
        .zip(modules)
        .map(|(slot, module)| {
            slot.unwrap_or_else(|| {
                module
                    .cases
                    .iter()
                    .map(|case| {
                        CaseResult::execution_error(case, None, "module task panicked".to_owned())
                    })
                    .collect()
            })
        })
        .collect()
}

fn persist(config: &HarnessConfig, report: &Report) -> HarnessResult<()> {
    let bytes = crate::report::serialize_junit(report)?;
    if let Some(parent) = config.report_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&config.report_path, bytes)?;
    info!(path = %config.report_path.display(), "wrote JUnit report");
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────
