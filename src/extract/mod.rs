//! Failure extraction from Maven build output and Java sources
//!
//! This module handles the text-analysis stages of failure localization:
//! - Classifying a build log as success or failure
//! - Recovering the exception type and message
//! - Locating the stack frame that points into the client's test code
//! - Resolving the Java method that encloses a source line (using tree-sitter)

pub mod log;
pub mod method;

pub use log::{
    classify_build, extract_exception, locate_frame, BuildLog, BuildOutcome, ExceptionRecord,
    LogMarkers, SourcePosition, StackFrame, test_target,
};
pub use method::{MethodResolver, MethodSpan};

use thiserror::Error;

/// Errors raised by the extraction stages that cannot be degraded to empty output
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The log has no failure marker, or nothing sits between the marker and the first frame
    #[error("No exception found.")]
    NoExceptionFound,

    /// The Java source could not be parsed into a usable syntax tree
    #[error("failed to parse Java source: syntax error at line {line}, column {column}")]
    SourceParse { line: usize, column: usize },

    /// The tree-sitter parser could not be set up
    #[error("failed to initialise the Java parser: {0}")]
    ParserSetup(String),
}
