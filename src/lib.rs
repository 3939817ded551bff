//! Sludi - diagnose library-upgrade failures in Maven projects
//!
//! This library reruns a client project's failing test against an upgraded
//! dependency, localizes the failure in the build log down to the enclosing
//! Java method, and forwards that context to an LLM for a suggested fix.

pub mod cli;
pub mod extract;
pub mod llm;
pub mod localize;
pub mod repo;
pub mod runner;
pub mod storage;
pub mod workspace;

/// Re-export commonly used types
pub use extract::{BuildLog, BuildOutcome, ExceptionRecord, MethodResolver};
pub use localize::{FailureContext, LocalizeError};
pub use storage::{KnowledgeRecord, KnowledgeStore};
pub use workspace::Workspace;

/// Application-wide error type
pub use anyhow::Result;
