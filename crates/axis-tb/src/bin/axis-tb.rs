//! Command-line entry point for the testbench orchestration harness.
//!
//! Runs the selected modules from the case catalog against the compiled
//! simulation executable and writes a JUnit XML report. Progress narration
//! goes to stderr; per-case end lines go to stdout; the report and the
//! process exit code are the programmatic contract.

use std::ffi::OsString;
use std::io::{self, Write as _};
use std::path::PathBuf;

use axis_tb::catalog::Catalog;
use axis_tb::executor::{CaseFailure, CaseResult};
use axis_tb::orchestrator::{self, Selection};
use axis_tb::HarnessConfig;

fn main() {
    let exit_code = run_cli(std::env::args_os());
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run_cli<I>(os_args: I) -> i32
where
    I: IntoIterator<Item = OsString>,
{
    let raw: Vec<String> = os_args
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let tail: &[String] = if raw.len() > 1 { &raw[1..] } else { &[] };

    if tail.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return 0;
    }

    let mut config = HarnessConfig::default();
    let mut catalog_path = PathBuf::from("cases/cases.json");
    let mut json_summary = false;
    let mut names: Vec<String> = Vec::new();

    let mut i = 0;
    while i < tail.len() {
        let arg = tail[i].as_str();
        match arg {
            "--testbench" => {
                let Some(value) = tail.get(i + 1) else {
                    return missing_value(arg);
                };
                config.testbench = PathBuf::from(value);
                i += 2;
            }
            "--cases" => {
                let Some(value) = tail.get(i + 1) else {
                    return missing_value(arg);
                };
                catalog_path = PathBuf::from(value);
                i += 2;
            }
            "--cases-dir" => {
                let Some(value) = tail.get(i + 1) else {
                    return missing_value(arg);
                };
                config.cases_dir = PathBuf::from(value);
                i += 2;
            }
            "--waves" => {
                let Some(value) = tail.get(i + 1) else {
                    return missing_value(arg);
                };
                config.waves_dir = PathBuf::from(value);
                i += 2;
            }
            "--report" => {
                let Some(value) = tail.get(i + 1) else {
                    return missing_value(arg);
                };
                config.report_path = PathBuf::from(value);
                i += 2;
            }
            "--jobs" => {
                let Some(value) = tail.get(i + 1) else {
                    return missing_value(arg);
                };
                match value.parse::<usize>() {
                    Ok(n) if n > 0 => config.jobs = n,
                    _ => {
                        eprintln!("error: --jobs expects a positive integer");
                        return 2;
                    }
                }
                i += 2;
            }
            "--case-parallel" => {
                config.case_parallel = true;
                i += 1;
            }
            "--json" => {
                json_summary = true;
                i += 1;
            }
            _ if arg.starts_with('-') => {
                eprintln!("error: unknown option `{arg}`");
                return 2;
            }
            _ => {
                names.push(arg.to_owned());
                i += 1;
            }
        }
    }

    if names.is_empty() {
        eprintln!("error: specify module names or `all`");
        eprintln!();
        print_help();
        return 2;
    }

    let selection = if names.iter().any(|n| n == "all") {
        if names.len() > 1 {
            eprintln!("error: `all` cannot be combined with module names");
            return 2;
        }
        Selection::All
    } else {
        Selection::Modules(names)
    };

    eprintln!("starting test run");

    let catalog = match Catalog::load(&catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };

    let outcome = match orchestrator::run(&config, &catalog, &selection) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };

    for suite in &outcome.report.suites {
        eprintln!(" module {}:", suite.module);
        for case in &suite.cases {
            println!("{}", end_line(case));
        }
    }

    eprintln!("all tests run");
    eprintln!("wrote JUnit XML to {}", config.report_path.display());

    if json_summary {
        match serde_json::to_string_pretty(&outcome.report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: cannot serialize summary: {e}");
                return 2;
            }
        }
    }

    outcome.exit_code
}

/// One stdout line per case, in the harness's traditional phrasing.
fn end_line(case: &CaseResult) -> String {
    let mut line = format!("  {}", case.display_name());
    if let Some(CaseFailure::Execution(message)) = &case.failure {
        line.push_str(" could not run: ");
        line.push_str(message);
        return line;
    }
    line.push_str(if case.exit_code == Some(0) {
        " succeeded"
    } else {
        " failed"
    });
    line.push_str(if case.expected {
        " as expected"
    } else {
        " unexpectedly"
    });
    line
}

fn missing_value(arg: &str) -> i32 {
    eprintln!("error: {arg} requires a value");
    2
}

fn print_help() {
    let text = "\
axis-tb — AXI-Stream testbench orchestration harness

USAGE:
    axis-tb [OPTIONS] <all | MODULE...>

ARGS:
    all | MODULE...       Run every module in the catalog, or only the
                          named ones (fails fast on unknown names)

OPTIONS:
    --testbench <PATH>    Simulation executable (default: ./testbench)
    --cases <PATH>        Case catalog (default: cases/cases.json)
    --cases-dir <DIR>     Fixture root directory (default: cases)
    --waves <DIR>         Waveform output root (default: waveforms)
    --report <PATH>       JUnit XML output path (default: junit.xml)
    --jobs <N>            Max concurrent module tasks (default: CPU count)
    --case-parallel       Run the cases of one module concurrently
    --json                Also print a JSON run summary to stdout
    -h, --help            Show this help message

EXIT CODES:
    0    every case conformed to its expectation
    1    at least one unexpected result or execution error
    2    usage, catalog, or selection error (nothing was run)
";
    let _ = io::stdout().write_all(text.as_bytes());
}

// ── Tests ────────────────────────────────────────────────────────────────
