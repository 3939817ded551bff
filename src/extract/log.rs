//! Maven log scanning
//!
//! Each stage here is a small function over the lines of one build log:
//! the build verdict, the exception block, and the stack frame that belongs
//! to the failing test. Markers come from [`LogMarkers`] so the stages can be
//! run against synthetic logs.

use super::ExtractError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Marker printed by Maven when the reactor build fails
pub const BUILD_FAILURE: &str = "BUILD FAILURE";
/// Surefire suffix for a test that errored
pub const ERROR_MARKER: &str = "<<< ERROR!";
/// Surefire suffix for a test whose assertion failed
pub const FAILURE_MARKER: &str = "<<< FAILURE!";
/// Prefix of a stack-frame line
pub const FRAME_PREFIX: &str = "at ";

/// Log vocabulary used by the scanning stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMarkers {
    /// Substring marking a failed build
    #[serde(default = "default_build_failure")]
    pub build_failure: String,

    /// Suffix of the line introducing an errored test
    #[serde(default = "default_error")]
    pub error: String,

    /// Suffix of the line introducing a failed test
    #[serde(default = "default_failure")]
    pub failure: String,

    /// Prefix of stack-frame lines
    #[serde(default = "default_frame_prefix")]
    pub frame_prefix: String,
}

fn default_build_failure() -> String {
    BUILD_FAILURE.to_string()
}

fn default_error() -> String {
    ERROR_MARKER.to_string()
}

fn default_failure() -> String {
    FAILURE_MARKER.to_string()
}

fn default_frame_prefix() -> String {
    FRAME_PREFIX.to_string()
}

impl Default for LogMarkers {
    fn default() -> Self {
        Self {
            build_failure: default_build_failure(),
            error: default_error(),
            failure: default_failure(),
            frame_prefix: default_frame_prefix(),
        }
    }
}

impl LogMarkers {
    /// Whether a trimmed line opens an exception block
    fn opens_exception(&self, trimmed: &str) -> bool {
        trimmed.ends_with(&self.error) || trimmed.ends_with(&self.failure)
    }

    /// Whether a trimmed line is a stack frame
    fn is_frame(&self, trimmed: &str) -> bool {
        trimmed.starts_with(&self.frame_prefix)
    }
}

/// The captured output of one build/test run
#[derive(Debug, Clone)]
pub struct BuildLog {
    run_id: String,
    lines: Vec<String>,
}

impl BuildLog {
    /// Build a log from in-memory text
    pub fn new(run_id: &str, text: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Read the log written for a run
    pub fn read<P: AsRef<Path>>(run_id: &str, path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read build log {:?}", path))?;
        // Maven output may carry bytes from the project's platform encoding
        let text = String::from_utf8_lossy(&bytes);
        Ok(Self::new(run_id, &text))
    }

    /// Identifier of the run this log belongs to
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Lines in output order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Verdict of a build/test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildOutcome {
    Success,
    Failure,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success)
    }
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildOutcome::Success => write!(f, "BUILD SUCCESS"),
            BuildOutcome::Failure => write!(f, "BUILD FAILURE"),
        }
    }
}

/// Classify a run by its log.
///
/// Any line containing the failure marker makes the run a failure. A log with
/// no marker at all counts as a success.
pub fn classify_build(log: &BuildLog, markers: &LogMarkers) -> BuildOutcome {
    let failed = log
        .lines()
        .iter()
        .any(|line| line.trim().contains(&markers.build_failure));

    if failed {
        BuildOutcome::Failure
    } else {
        BuildOutcome::Success
    }
}

/// Exception type and detail message reported for a failing test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    /// Exception class, e.g. `java.lang.NullPointerException`
    #[serde(rename = "type")]
    pub kind: String,
    /// Text after the first colon with later colons dropped; empty when the exception carries none
    pub message: String,
}

impl ExceptionRecord {
    /// Split a raw exception block on its colons: the first segment is the
    /// type, the rest are joined back together as the message
    pub fn from_block(block: &str) -> Self {
        let mut segments = block.split(':');
        let kind = segments.next().unwrap_or_default().trim().to_string();
        let message = segments.collect::<String>().trim().to_string();

        Self { kind, message }
    }
}

/// Recover the exception reported after the first errored or failed test.
///
/// The block is every line between the marker line and the first stack
/// frame (or the end of the log).
pub fn extract_exception(
    log: &BuildLog,
    markers: &LogMarkers,
) -> std::result::Result<ExceptionRecord, ExtractError> {
    let lines = log.lines();

    let marker = lines
        .iter()
        .position(|line| markers.opens_exception(line.trim()))
        .ok_or(ExtractError::NoExceptionFound)?;

    let block = lines[marker + 1..]
        .iter()
        .take_while(|line| !markers.is_frame(line.trim()))
        .map(String::as_str)
        .collect::<Vec<_>>();

    if block.is_empty() {
        return Err(ExtractError::NoExceptionFound);
    }
    let block = block.join("\n");

    tracing::debug!(run = log.run_id(), line = marker + 1, "found exception marker");
    Ok(ExceptionRecord::from_block(&block))
}

/// One raw stack-frame line, `at <qualified-method>(<File>:<line>)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame(String);

impl StackFrame {
    pub fn new(line: &str) -> Self {
        Self(line.trim().to_string())
    }

    /// The frame line as it appeared in the log, trimmed
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name and line number encoded in the frame.
    ///
    /// Frames without a `File:line` location (native methods, unknown
    /// source) yield whatever substrings the split produces.
    pub fn position(&self) -> SourcePosition {
        let line = self.0.as_str();

        let file_name = line
            .rsplit('(')
            .next()
            .and_then(|location| location.split(':').next())
            .unwrap_or_default();

        let line_number = line
            .split(')')
            .next()
            .and_then(|head| head.rsplit(':').next())
            .unwrap_or_default();

        SourcePosition {
            file_name: file_name.to_string(),
            line_number: line_number.to_string(),
        }
    }
}

/// Source location parsed out of a stack frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub file_name: String,
    pub line_number: String,
}

impl SourcePosition {
    /// The line number, if it is a positive integer
    pub fn line(&self) -> Option<usize> {
        self.line_number
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|line| *line >= 1)
    }
}

/// Find the first stack frame that belongs to the given test.
///
/// `test_name` is matched against the frame's source location (the first
/// parenthesised group) and against its qualified method name.
pub fn locate_frame(log: &BuildLog, test_name: &str, markers: &LogMarkers) -> Option<StackFrame> {
    if test_name.is_empty() {
        return None;
    }

    for line in log.lines() {
        let trimmed = line.trim();
        if !markers.is_frame(trimmed) || !trimmed.ends_with(')') {
            continue;
        }

        let body = &trimmed[markers.frame_prefix.len()..];
        let mut groups = body.split('(');
        let method = groups.next().unwrap_or_default();
        let location = groups.next().unwrap_or_default();

        if location.contains(test_name) || method.contains(test_name) {
            return Some(StackFrame::new(trimmed));
        }
    }

    None
}

/// The test-class portion of a `Class#member` test identifier
pub fn test_target(test: &str) -> &str {
    test.split('#').next().unwrap_or_default()
}
