//! Child-process execution and outcome classification for one case.
//!
//! Exactly one simulator process is spawned and fully reaped per call to
//! [`execute`]. Both output streams are captured in full and split into
//! the simulator's NUL-separated sub-messages. The exit status is judged
//! against the case's expectation policy: `expected = (exit status == 0)
//! XOR invert`.
//!
//! Spawn and reap failures are [`ExecutionError`]s, distinct from an
//! unexpected exit status: the former means the harness could not run the
//! test, the latter means the test ran and misbehaved.

use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::Case;
use crate::invocation::Invocation;
use crate::seed::SeedQuadruple;

// ── Errors ───────────────────────────────────────────────────────────────

/// The child process could not be spawned or reaped. Callers record this
/// per case; it never masquerades as an ordinary test failure.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("cannot spawn `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("cannot collect output of `{program}`: {source}")]
    Collect {
        program: String,
        source: std::io::Error,
    },
}

// ── Captured output ──────────────────────────────────────────────────────

/// Captured bytes of one stream, split into the simulator's NUL-separated
/// sub-messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedStream {
    pub segments: Vec<String>,
}

impl CapturedStream {
    /// Split `bytes` on `0x00` and lossily decode each segment.
    ///
    /// The simulator multiplexes sub-messages within a single stream using
    /// NUL separators; the separator positions survive as segment
    /// boundaries and render as line breaks in [`CapturedStream::to_text`].
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let segments = bytes
            .split(|&b| b == 0)
            .map(|seg| String::from_utf8_lossy(seg).into_owned())
            .collect();
        Self { segments }
    }

    /// Newline-joined rendition for reports.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.segments.join("\n")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(String::is_empty)
    }
}

// ── Case result ──────────────────────────────────────────────────────────

/// Why a case did not conform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseFailure {
    /// The exit status did not match the expectation policy. The message
    /// is `"succeeded"` (exit 0 where failure was expected) or
    /// `"failed unexpectedly"` (non-zero where success was expected).
    Unexpected(String),
    /// The child process could not be spawned or reaped.
    Execution(String),
}

/// Outcome of one executed (or attempted) case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub number: String,
    pub title: Option<String>,
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
    /// Exit code of the child, if it ran and exited normally.
    pub exit_code: Option<i32>,
    /// Seeds of the invocation, surfaced for reproduction. `None` only
    /// when no invocation was ever built for this case.
    pub seeds: Option<SeedQuadruple>,
    /// `(exit status == 0) XOR invert`, fixed at classification time and
    /// never recomputed.
    pub expected: bool,
    pub failure: Option<CaseFailure>,
}

impl CaseResult {
    /// Display name used in narration and the report.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.title {
            Some(title) => format!("{} {title}", self.number),
            None => self.number.clone(),
        }
    }

    /// Result for a case whose child process never ran.
    #[must_use]
    pub fn execution_error(case: &Case, seeds: Option<SeedQuadruple>, message: String) -> Self {
        Self {
            number: case.number.clone(),
            title: case.title.clone(),
            stdout: CapturedStream::default(),
            stderr: CapturedStream::default(),
            exit_code: None,
            seeds,
            expected: false,
            failure: Some(CaseFailure::Execution(message)),
        }
    }

    #[must_use]
    pub fn is_execution_error(&self) -> bool {
        matches!(self.failure, Some(CaseFailure::Execution(_)))
    }
}

// ── Execution ────────────────────────────────────────────────────────────

/// The expectation rule: a zero exit status conforms unless the case is
/// inverted, a non-zero status conforms only when it is.
#[must_use]
pub fn conforms(succeeded: bool, invert: bool) -> bool {
    succeeded != invert
}

/// Run one invocation to completion and classify the outcome.
///
/// Spawns the simulator with piped stdout/stderr and waits for exit plus
/// full stream drain. Exactly one child process per call.
///
/// # Errors
///
/// Returns [`ExecutionError`] when the process cannot be spawned (missing
/// executable, permission denied) or its output cannot be collected. These
/// propagate so the caller can record them distinctly from test failures.
pub fn execute(invocation: &Invocation, case: &Case) -> Result<CaseResult, ExecutionError> {
    debug!(
        case = %case.number,
        program = %invocation.program.display(),
        "spawning testbench"
    );

    let child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExecutionError::Spawn {
            program: invocation.program.display().to_string(),
            source,
        })?;

    let output = child
        .wait_with_output()
        .map_err(|source| ExecutionError::Collect {
            program: invocation.program.display().to_string(),
            source,
        })?;

    let succeeded = output.status.success();
    let expected = conforms(succeeded, case.invert);

    let failure = if expected {
        None
    } else {
        let message = if succeeded {
            "succeeded"
        } else {
            "failed unexpectedly"
        };
        warn!(
            case = %case.number,
            outcome = message,
            seeds = %invocation.seeds,
            "unexpected outcome"
        );
        Some(CaseFailure::Unexpected(message.to_owned()))
    };

    Ok(CaseResult {
        number: case.number.clone(),
        title: case.title.clone(),
        stdout: CapturedStream::from_bytes(&output.stdout),
        stderr: CapturedStream::from_bytes(&output.stderr),
        exit_code: output.status.code(),
        seeds: Some(invocation.seeds),
        expected,
        failure,
    })
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn conformance_covers_all_four_combinations() {
        // (succeeded, invert) -> expected
        assert!(conforms(true, false), "exit 0, normal case");
        assert!(!conforms(false, false), "non-zero, normal case");
        assert!(!conforms(true, true), "exit 0, inverted case");
        assert!(conforms(false, true), "non-zero, inverted case");
    }

    #[test]
    fn captured_stream_splits_on_nul() {
        let stream = CapturedStream::from_bytes(b"first\x00second\x00third");
        assert_eq!(stream.segments, ["first", "second", "third"]);
        assert_eq!(stream.to_text(), "first\nsecond\nthird");
    }

    #[test]
    fn captured_stream_preserves_empty_segments() {
        // Two adjacent separators delimit an empty sub-message; it must
        // survive as a blank line, not vanish.
        let stream = CapturedStream::from_bytes(b"a\x00\x00b");
        assert_eq!(stream.segments, ["a", "", "b"]);
        assert_eq!(stream.to_text(), "a\n\nb");
    }

    #[test]
    fn captured_stream_empty_input() {
        let stream = CapturedStream::from_bytes(b"");
        assert!(stream.is_empty());
        assert_eq!(stream.to_text(), "");
    }

    #[test]
    fn captured_stream_decodes_invalid_utf8_lossily() {
        let stream = CapturedStream::from_bytes(b"ok\xff\x00tail");
        assert_eq!(stream.segments.len(), 2);
        assert!(stream.segments[0].starts_with("ok"));
        assert_eq!(stream.segments[1], "tail");
    }

    fn sh_invocation(script: &str) -> Invocation {
        Invocation {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_owned(), script.to_owned()],
            seeds: SeedQuadruple {
                tvalid: [1, 2],
                tready: [3, 4],
            },
        }
    }

    fn plain_case(invert: bool) -> Case {
        Case {
            number: "001".to_owned(),
            title: None,
            invert,
        }
    }

    #[cfg(unix)]
    #[test]
    fn execute_classifies_success() {
        let result = execute(&sh_invocation("exit 0"), &plain_case(false)).unwrap();
        assert!(result.expected);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.failure.is_none());
        assert_eq!(result.seeds.unwrap().tvalid, [1, 2]);
    }

    #[cfg(unix)]
    #[test]
    fn execute_flags_unexpected_failure() {
        let result = execute(&sh_invocation("exit 3"), &plain_case(false)).unwrap();
        assert!(!result.expected);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(
            result.failure,
            Some(CaseFailure::Unexpected("failed unexpectedly".to_owned()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn execute_flags_unexpected_success_on_inverted_case() {
        let result = execute(&sh_invocation("exit 0"), &plain_case(true)).unwrap();
        assert!(!result.expected);
        assert_eq!(
            result.failure,
            Some(CaseFailure::Unexpected("succeeded".to_owned()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn execute_accepts_expected_failure_on_inverted_case() {
        let result = execute(&sh_invocation("exit 1"), &plain_case(true)).unwrap();
        assert!(result.expected);
        assert!(result.failure.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn execute_captures_nul_separated_streams() {
        let result = execute(
            &sh_invocation("printf 'out_a\\0out_b'; printf 'err_a\\0err_b' >&2; exit 0"),
            &plain_case(false),
        )
        .unwrap();
        assert_eq!(result.stdout.segments, ["out_a", "out_b"]);
        assert_eq!(result.stderr.segments, ["err_a", "err_b"]);
    }

    #[test]
    fn execute_missing_program_is_spawn_error() {
        let invocation = Invocation {
            program: PathBuf::from("/nonexistent/testbench"),
            args: vec![],
            seeds: SeedQuadruple {
                tvalid: [1, 1],
                tready: [1, 1],
            },
        };
        let err = execute(&invocation, &plain_case(false)).unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }

    #[test]
    fn execution_error_result_shape() {
        let result = CaseResult::execution_error(&plain_case(false), None, "boom".to_owned());
        assert!(!result.expected);
        assert!(result.is_execution_error());
        assert_eq!(result.exit_code, None);
        assert!(result.stdout.is_empty());
    }
}
