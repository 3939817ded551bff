//! LLM-assisted repair suggestions
//!
//! This module handles:
//! - Sending a localized failure to an LLM service (OpenAI or Anthropic)
//! - The fixed repair prompt
//! - Operator-written prompts when automatic extraction failed

mod client;
mod prompts;

pub use client::{CompletionProvider, LlmClient, LlmConfig, LlmResponse, MockLlmClient};
pub use prompts::{RepairPrompt, REPAIR_SYSTEM_PROMPT};

use crate::localize::FailureContext;
use anyhow::Result;

/// Attempts made per request before giving up
pub const MAX_ATTEMPTS: usize = 3;

/// Ask for a fix to a localized failure.
///
/// The response is returned as-is for display.
pub async fn diagnose(provider: &dyn CompletionProvider, ctx: &FailureContext) -> Result<String> {
    let prompt = RepairPrompt::generate(ctx);
    tracing::info!(run = %ctx.run_id, chars = prompt.len(), "sending failure context to LLM");

    let response = provider.complete_with_retry(&prompt, MAX_ATTEMPTS).await?;
    if let Some(tokens) = response.tokens_used {
        tracing::debug!(tokens, "LLM response received");
    }

    Ok(response.content)
}

/// Send an operator-written prompt
pub async fn ask(provider: &dyn CompletionProvider, text: &str) -> Result<String> {
    let response = provider
        .complete_with_retry(&RepairPrompt::manual(text), MAX_ATTEMPTS)
        .await?;
    Ok(response.content)
}
