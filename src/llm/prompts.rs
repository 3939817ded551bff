//! Prompt templates for LLM interactions

use crate::localize::FailureContext;

/// System prompt for the repair request
pub const REPAIR_SYSTEM_PROMPT: &str = "You are an automated repair tool for Maven projects. You will receive two inputs: the exception details and the relevant block of code. Respond in two sections: 1. Error Analysis: Provide a concise explanation (maximum 100 words) identifying the root cause of the error based on the given exception and code. 2. Code Correction: Present the corrected version of the code, with changes clearly indicated by bolding the new or modified lines. Ensure the explanation is precise and that the corrected code adheres to best practices.";

/// Prompt asking for a fix to a localized failure
pub struct RepairPrompt;

impl RepairPrompt {
    /// User message for a failure context: exception type, message, then code
    pub fn generate(ctx: &FailureContext) -> String {
        ctx.payload()
    }

    /// User message typed by the operator when no code could be extracted
    pub fn manual(text: &str) -> String {
        text.trim().to_string()
    }
}
