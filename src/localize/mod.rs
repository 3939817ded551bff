//! Failure localization
//!
//! This module turns the log of one failed run into a [`FailureContext`]:
//! - The exception type and message
//! - The stack frame and source position inside the client's test code
//! - The text of the method around the failing line
//!
//! Missing pieces degrade to empty strings. Only a log without an exception
//! and a Java file that doesn't parse stop a run.

mod pipeline;

pub use pipeline::{localize_run, Localizer, SourceLookup};

use crate::extract::{ExceptionRecord, ExtractError, MethodSpan, SourcePosition, StackFrame};
use crate::storage::KnowledgeRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage a run stopped at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Setting up the Java parser
    Setup,
    /// Reading the exception block from the log
    Exception,
    /// Parsing the client source file
    SourceParse,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Setup => write!(f, "setup"),
            Stage::Exception => write!(f, "exception extraction"),
            Stage::SourceParse => write!(f, "source parsing"),
        }
    }
}

/// A run that cannot be localized automatically
#[derive(Debug, Error)]
#[error("run {run_id}: {stage} failed: {source}")]
pub struct LocalizeError {
    /// Run identifier
    pub run_id: String,
    /// Stage the run stopped at
    pub stage: Stage,
    /// File to inspect manually (the log, or the source that failed to parse)
    pub inspect: Option<PathBuf>,
    #[source]
    pub source: ExtractError,
}

impl LocalizeError {
    pub fn new(run_id: &str, stage: Stage, source: ExtractError) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage,
            inspect: None,
            source,
        }
    }

    /// Attach the file an operator should look at
    pub fn with_inspect(mut self, path: impl Into<PathBuf>) -> Self {
        self.inspect = Some(path.into());
        self
    }

    /// Format error with a pointer for manual follow-up
    pub fn format_for_cli(&self) -> String {
        let mut output = format!("Error: {}", self);
        if let Some(ref path) = self.inspect {
            output.push_str(&format!("\n\nPlease refer to {} for details.", path.display()));
        }
        output
    }
}

/// Everything learned about one failed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Run identifier
    pub run_id: String,
    /// Exception reported by the failing test
    pub exception: ExceptionRecord,
    /// Raw stack frame pointing into the client, or empty
    pub frame: String,
    /// File and line parsed from the frame, or empty
    pub position: SourcePosition,
    /// Enclosing method (line range and source), or empty
    pub method: MethodSpan,
}

impl FailureContext {
    /// Start an empty context for a run
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            ..Default::default()
        }
    }

    /// Record the extracted exception
    pub fn with_exception(mut self, exception: ExceptionRecord) -> Self {
        self.exception = exception;
        self
    }

    /// Record the located frame; `None` clears the location fields
    pub fn with_frame(mut self, frame: Option<&StackFrame>) -> Self {
        match frame {
            Some(frame) => {
                self.frame = frame.as_str().to_string();
                self.position = frame.position();
            }
            None => {
                self.frame.clear();
                self.position = SourcePosition::default();
            }
        }
        self
    }

    /// Record the resolved method
    pub fn with_method(mut self, method: MethodSpan) -> Self {
        self.method = method;
        self
    }

    /// Whether code context was extracted automatically
    pub fn has_code(&self) -> bool {
        !self.method.text.trim().is_empty()
    }

    /// Text sent to the LLM: exception type, message and method source
    pub fn payload(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.exception.kind,
            self.exception.message,
            self.method.text.trim()
        )
    }

    /// Copy the localized fields into a knowledge record
    pub fn apply_to(&self, record: &mut KnowledgeRecord) {
        record.exception = self.exception.kind.clone();
        record.exception_info = self.exception.message.clone();
        record.file_name = self.position.file_name.clone();
        record.line_no = self.position.line_number.clone();
    }
}
