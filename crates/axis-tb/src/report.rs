//! Suite accumulation and JUnit XML serialization.
//!
//! The aggregator collects per-case results into named suites, preserving
//! first-registration module order regardless of which module's tasks
//! finish first. [`serialize_junit`] renders the finalized report as JUnit
//! XML: one `<testsuite>` per module, one `<testcase>` per case, with the
//! captured streams attached and a `<failure>` (expectation mismatch) or
//! `<error>` (process could not run) on non-conforming cases.

use std::collections::HashMap;

use quick_junit::{NonSuccessKind, TestCase, TestCaseStatus, TestSuite};
use serde::{Deserialize, Serialize};

use crate::executor::{CaseFailure, CaseResult};

// ── Report model ─────────────────────────────────────────────────────────

/// All case results for one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSuite {
    pub module: String,
    pub cases: Vec<CaseResult>,
}

/// Finalized run report: ordered suites plus derived counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub suites: Vec<ModuleSuite>,
    pub total: usize,
    /// Cases whose outcome matched the expectation policy.
    pub passed: usize,
    /// Cases whose exit status did not match the expectation policy.
    pub failed: usize,
    /// Cases whose child process could not be executed.
    pub errors: usize,
}

impl Report {
    /// `true` when every case across every suite conformed.
    #[must_use]
    pub fn all_expected(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

// ── Aggregation ──────────────────────────────────────────────────────────

/// Accumulates case results into named suites.
///
/// Suites appear in the report in first-registration order; accumulation
/// is keyed by module name, so completion order never reorders the output.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    suites: Vec<ModuleSuite>,
    index: HashMap<String, usize>,
}

impl ReportAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a suite exists for `module`. Creates it on first use; calling
    /// again for the same name is a no-op, so registration is idempotent.
    pub fn register_suite(&mut self, module: &str) {
        if !self.index.contains_key(module) {
            self.index.insert(module.to_owned(), self.suites.len());
            self.suites.push(ModuleSuite {
                module: module.to_owned(),
                cases: Vec::new(),
            });
        }
    }

    /// Append one case result to the named suite, creating it on first use.
    pub fn add_result(&mut self, module: &str, result: CaseResult) {
        self.register_suite(module);
        let idx = self.index[module];
        self.suites[idx].cases.push(result);
    }

    /// Consume the aggregator and compute the counters.
    #[must_use]
    pub fn finalize(self) -> Report {
        let mut total = 0;
        let mut passed = 0;
        let mut failed = 0;
        let mut errors = 0;
        for suite in &self.suites {
            for case in &suite.cases {
                total += 1;
                match &case.failure {
                    None => passed += 1,
                    Some(CaseFailure::Unexpected(_)) => failed += 1,
                    Some(CaseFailure::Execution(_)) => errors += 1,
                }
            }
        }
        Report {
            suites: self.suites,
            total,
            passed,
            failed,
            errors,
        }
    }
}

// ── JUnit serialization ──────────────────────────────────────────────────

/// Render `report` as JUnit XML bytes.
///
/// Non-conforming cases carry the exact failure message (`"succeeded"` or
/// `"failed unexpectedly"`) and, when an invocation was built, the drawn
/// seed quadruple in the description for reproduction.
///
/// # Errors
///
/// Returns the underlying XML serialization error.
pub fn serialize_junit(report: &Report) -> Result<Vec<u8>, quick_junit::SerializeError> {
    let mut junit = quick_junit::Report::new("axis-tb");

    for suite in &report.suites {
        let mut test_suite = TestSuite::new(suite.module.clone());
        for case in &suite.cases {
            let status = match &case.failure {
                None => TestCaseStatus::success(),
                Some(failure) => {
                    let (kind, message) = match failure {
                        CaseFailure::Unexpected(message) => (NonSuccessKind::Failure, message),
                        CaseFailure::Execution(message) => (NonSuccessKind::Error, message),
                    };
                    let mut status = TestCaseStatus::non_success(kind);
                    status.set_message(message.clone());
                    if let Some(seeds) = case.seeds {
                        status.set_description(format!("seeds: {seeds}"));
                    }
                    status
                }
            };

            let mut test_case = TestCase::new(case.display_name(), status);
            test_case.set_system_out(case.stdout.to_text());
            test_case.set_system_err(case.stderr.to_text());
            test_suite.add_test_case(test_case);
        }
        junit.add_test_suite(test_suite);
    }

    let mut buf = Vec::new();
    junit.serialize(&mut buf)?;
    Ok(buf)
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CapturedStream;
    use crate::seed::SeedQuadruple;

    fn passing(number: &str) -> CaseResult {
        CaseResult {
            number: number.to_owned(),
            title: None,
            stdout: CapturedStream::default(),
            stderr: CapturedStream::default(),
            exit_code: Some(0),
            seeds: Some(SeedQuadruple {
                tvalid: [1, 2],
                tready: [3, 4],
            }),
            expected: true,
            failure: None,
        }
    }

    fn unexpected(number: &str, message: &str) -> CaseResult {
        CaseResult {
            failure: Some(CaseFailure::Unexpected(message.to_owned())),
            expected: false,
            ..passing(number)
        }
    }

    fn exec_error(number: &str) -> CaseResult {
        CaseResult {
            failure: Some(CaseFailure::Execution("cannot spawn".to_owned())),
            expected: false,
            exit_code: None,
            ..passing(number)
        }
    }

    #[test]
    fn first_registration_order_wins() {
        let mut agg = ReportAggregator::new();
        agg.register_suite("b");
        agg.register_suite("a");
        agg.register_suite("c");

        // Results arrive in completion order, which differs.
        agg.add_result("c", passing("1"));
        agg.add_result("a", passing("1"));
        agg.add_result("b", passing("1"));

        let report = agg.finalize();
        let order: Vec<&str> = report.suites.iter().map(|s| s.module.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut agg = ReportAggregator::new();
        agg.register_suite("a");
        agg.register_suite("a");
        agg.add_result("a", passing("1"));
        agg.add_result("a", passing("2"));

        let report = agg.finalize();
        assert_eq!(report.suites.len(), 1);
        assert_eq!(report.suites[0].cases.len(), 2);
    }

    #[test]
    fn counters_classify_all_three_outcomes() {
        let mut agg = ReportAggregator::new();
        agg.add_result("m", passing("1"));
        agg.add_result("m", unexpected("2", "succeeded"));
        agg.add_result("m", exec_error("3"));

        let report = agg.finalize();
        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors, 1);
        assert!(!report.all_expected());
    }

    #[test]
    fn empty_report_is_all_expected() {
        let report = ReportAggregator::new().finalize();
        assert_eq!(report.total, 0);
        assert!(report.all_expected());
    }

    #[test]
    fn junit_contains_suites_cases_and_failure_message() {
        let mut agg = ReportAggregator::new();
        let mut with_output = passing("001");
        with_output.title = Some("two operands".to_owned());
        with_output.stdout = CapturedStream::from_bytes(b"sum ok\x00checker done");
        agg.add_result("adder", with_output);
        agg.add_result("adder", unexpected("002", "succeeded"));
        agg.add_result("shifter", exec_error("001"));

        let xml_bytes = serialize_junit(&agg.finalize()).unwrap();
        let xml = String::from_utf8(xml_bytes).unwrap();

        assert!(xml.contains("adder"));
        assert!(xml.contains("shifter"));
        assert!(xml.contains("001 two operands"));
        assert!(xml.contains("succeeded"));
        assert!(xml.contains("failure"));
        assert!(xml.contains("error"));
        // NUL-separated sub-messages render as separate lines.
        assert!(xml.contains("sum ok"));
        assert!(xml.contains("checker done"));
        // The seed quadruple is surfaced for reproduction.
        assert!(xml.contains("tvalid=[1, 2]"));
    }

    #[test]
    fn report_serializes_to_json() {
        let mut agg = ReportAggregator::new();
        agg.add_result("m", passing("1"));
        let report = agg.finalize();

        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"passed\": 1"));
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total, 1);
    }
}
