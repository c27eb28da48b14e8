//! Per-module case sequencing.
//!
//! Cases run in catalog declaration order, sequentially by default. A case
//! whose process cannot be spawned is recorded as an execution-error
//! result and does not abort the remaining cases of the module.

use std::fs;

use tracing::{info, warn};

use crate::catalog::{Case, Module};
use crate::executor::{self, CaseResult};
use crate::invocation::Invocation;
use crate::HarnessConfig;

/// Run every case of `module`, returning results in catalog order.
pub fn run_module(config: &HarnessConfig, module: &Module) -> Vec<CaseResult> {
    info!(module = %module.name, cases = module.cases.len(), "starting module");

    // Wave paths are case-scoped under a per-module directory; create it
    // up front so the simulator can open its --wave target.
    let wave_dir = config.waves_dir.join(&module.name);
    if let Err(e) = fs::create_dir_all(&wave_dir) {
        warn!(module = %module.name, error = %e, "cannot create waveform directory");
    }

    let results = if config.case_parallel {
        run_cases_parallel(config, module)
    } else {
        module
            .cases
            .iter()
            .map(|case| run_case(config, module, case))
            .collect()
    };

    info!(module = %module.name, "all cases run");
    results
}

fn run_case(config: &HarnessConfig, module: &Module, case: &Case) -> CaseResult {
    if case.invert {
        info!(module = %module.name, case = %case.number, "starting case, expecting failure");
    } else {
        info!(module = %module.name, case = %case.number, "starting case");
    }

    let invocation = Invocation::build(config, module, case);
    let seeds = invocation.seeds;
    match executor::execute(&invocation, case) {
        Ok(result) => result,
        Err(e) => {
            warn!(module = %module.name, case = %case.number, error = %e, "execution error");
            CaseResult::execution_error(case, Some(seeds), e.to_string())
        }
    }
}

/// Opt-in concurrent execution of one module's cases.
///
/// Safe because every case writes to its own wave path. Result order still
/// follows catalog order: join handles are collected in declaration order.
fn run_cases_parallel(config: &HarnessConfig, module: &Module) -> Vec<CaseResult> {
    std::thread::scope(|s| {
        let handles: Vec<_> = module
            .cases
            .iter()
            .map(|case| s.spawn(move || run_case(config, module, case)))
            .collect();

        handles
            .into_iter()
            .zip(&module.cases)
            .map(|(handle, case)| {
                handle.join().unwrap_or_else(|_| {
                    CaseResult::execution_error(case, None, "case task panicked".to_owned())
                })
            })
            .collect()
    })
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_stub(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("testbench");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn config_in(dir: &Path, testbench: std::path::PathBuf) -> HarnessConfig {
        HarnessConfig {
            testbench,
            cases_dir: dir.join("cases"),
            waves_dir: dir.join("waveforms"),
            report_path: dir.join("junit.xml"),
            jobs: 1,
            case_parallel: false,
        }
    }

    fn module_with_cases(numbers: &[&str]) -> Module {
        Module {
            name: "adder".to_owned(),
            g_in_tdata_width: 8,
            g_out_tdata_width: 8,
            cases: numbers
                .iter()
                .map(|n| Case {
                    number: (*n).to_owned(),
                    title: None,
                    invert: false,
                })
                .collect(),
        }
    }

    #[test]
    fn results_follow_catalog_order() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(dir.path(), "exit 0");
        let config = config_in(dir.path(), stub);
        let module = module_with_cases(&["003", "001", "002"]);

        let results = run_module(&config, &module);
        let order: Vec<&str> = results.iter().map(|r| r.number.as_str()).collect();
        assert_eq!(order, ["003", "001", "002"]);
        assert!(results.iter().all(|r| r.expected));
    }

    #[test]
    fn wave_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(dir.path(), "exit 0");
        let config = config_in(dir.path(), stub);

        run_module(&config, &module_with_cases(&["001"]));
        assert!(config.waves_dir.join("adder").is_dir());
    }

    #[test]
    fn missing_executable_records_error_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), dir.path().join("no-such-testbench"));
        let module = module_with_cases(&["001", "002"]);

        let results = run_module(&config, &module);
        assert_eq!(results.len(), 2, "both cases are recorded");
        assert!(results.iter().all(CaseResult::is_execution_error));
        assert!(
            results.iter().all(|r| r.seeds.is_some()),
            "the drawn seeds are surfaced even when spawning failed"
        );
    }

    #[test]
    fn case_parallel_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        // The first-declared case finishes last.
        let stub = write_stub(
            dir.path(),
            r#"case "$1" in *001.ghw) sleep 0.2 ;; esac
exit 0"#,
        );
        let mut config = config_in(dir.path(), stub);
        config.case_parallel = true;

        let module = module_with_cases(&["001", "002", "003"]);
        let results = run_module(&config, &module);
        let order: Vec<&str> = results.iter().map(|r| r.number.as_str()).collect();
        assert_eq!(order, ["001", "002", "003"]);
    }
}
