//! Command implementations

use super::LlmArgs;
use crate::extract::BuildOutcome;
use crate::llm::{self, LlmClient, LlmConfig};
use crate::localize::{localize_run, FailureContext};
use crate::repo::ClientRepo;
use crate::runner::run_upgrade_test;
use crate::storage::{KnowledgeRecord, KnowledgeStore};
use crate::workspace::{Config, Workspace, CONFIG_FILE};
use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::Path;

/// Look up a run, preferring the knowledge file over the catalogue
pub fn find_record(workspace: &Workspace, id: &str) -> Result<KnowledgeRecord> {
    if let Some(record) = KnowledgeStore::open(workspace.knowledge_path()).get(id)? {
        return Ok(record);
    }

    KnowledgeStore::open(workspace.incompatibilities_path())
        .get(id)?
        .ok_or_else(|| anyhow::anyhow!("Unable to find incompatibility id {}..", id))
}

/// Check out the client of an incompatibility and record it in the knowledge file
pub fn discover(workspace: &Workspace, id: &str) -> Result<KnowledgeRecord> {
    let record = KnowledgeStore::open(workspace.incompatibilities_path())
        .get(id)?
        .ok_or_else(|| anyhow::anyhow!("Unable to find incompatibility id {}..", id))?;

    workspace.init_dirs()?;

    let client = ClientRepo::new(workspace.client_dir(&record.client));
    if client.exists() {
        println!("{:?} already exists, reverting changes...", client.root());
        client.revert_changes()?;
    } else {
        println!("Cloning {} at {}...", record.url, record.sha);
        client.clone_at(&record.url, &record.sha)?;
    }

    let knowledge = KnowledgeStore::open(workspace.knowledge_path());
    knowledge.ensure_exists()?;
    knowledge.upsert(&record)?;

    println!("✓ Discovered {} for incompatibility {}", record.client, record.id);
    println!("  Library: {} {} -> {}", record.lib, record.old, record.new);
    println!("  Test: {}", record.test);

    Ok(record)
}

/// Upgrade the library and run the failing test
pub fn test(workspace: &Workspace, id: &str) -> Result<BuildOutcome> {
    let record = find_record(workspace, id)?;
    let outcome = run_upgrade_test(workspace, &record)?;

    match outcome {
        BuildOutcome::Success => println!("✓ Test successful!"),
        BuildOutcome::Failure => {
            println!("✗ Test failed");
            println!("  Log: {:?}", workspace.test_log_path(id));
        }
    }

    Ok(outcome)
}

/// Localize the failure of a run and store what was learned
pub fn extract(workspace: &Workspace, id: &str) -> Result<FailureContext> {
    let mut record = find_record(workspace, id)?;
    let ctx = localize_run(workspace, &record)?;

    ctx.apply_to(&mut record);
    let knowledge = KnowledgeStore::open(workspace.knowledge_path());
    knowledge.upsert(&record)?;

    Ok(ctx)
}

/// Build an LLM client from workspace settings and command-line overrides
pub fn build_client(workspace: &Workspace, args: &LlmArgs) -> LlmClient {
    let mut settings = workspace.config().llm.clone();
    if let Some(provider) = args.provider {
        settings.provider = provider;
    }

    let api_key = args.api_key(settings.provider);
    LlmClient::new(LlmConfig::from_settings(&settings, api_key))
}

/// Extract a run's failure and ask the LLM for a fix.
///
/// Returns `None` when nothing was sent.
pub async fn diagnose(
    workspace: &Workspace,
    id: &str,
    yes: bool,
    args: &LlmArgs,
) -> Result<Option<String>> {
    let ctx = extract(workspace, id)?;
    print_context_text(&ctx);

    if !ctx.has_code() {
        println!("{}", manual_hint(workspace, id));
        return Ok(None);
    }

    if !yes {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        if !confirm(&mut input, &mut output, SEND_PROMPT)? {
            println!("Please refer to {} for details.", workspace.test_log_path(id).display());
            return Ok(None);
        }
    }

    let client = build_client(workspace, args);
    println!("\n🤖 Sending to {}...\n", client.config().provider);
    let answer = llm::diagnose(&client, &ctx).await?;
    println!("{}", answer);

    Ok(Some(answer))
}

/// Show or initialise the workspace configuration
pub fn config(root: &Path, show: bool, init: bool, force: bool) -> Result<()> {
    let path = root.join(CONFIG_FILE);

    if init {
        if path.exists() && !force {
            anyhow::bail!("{:?} already exists. Use --force to overwrite.", path);
        }
        Config::default().save(root)?;
        println!("✓ Wrote default configuration to {:?}", path);
    }

    if show || !init {
        let config = Config::load_or_default(root)?;

        println!("Sludi Configuration");
        println!("===================\n");

        println!("Log markers:");
        println!("  Build failure: {}", config.markers.build_failure);
        println!("  Error: {}", config.markers.error);
        println!("  Failure: {}", config.markers.failure);
        println!("  Frame prefix: {}", config.markers.frame_prefix);

        println!("\nMaven: {}", config.maven.executable);
        println!("  Install: {}", config.maven.install_args.join(" "));
        println!("  Test: {}", config.maven.test_args.join(" "));

        println!("\nLLM provider: {}", config.llm.provider);
        if let Some(ref model) = config.llm.model {
            println!("LLM model: {}", model);
        }
        if let Some(ref endpoint) = config.llm.endpoint {
            println!("LLM endpoint: {}", endpoint);
        }
        println!("Max tokens: {}", config.llm.max_tokens);
    }

    Ok(())
}

pub(crate) const SEND_PROMPT: &str = "Send to AI to diagnose and resolve this issue? (Y/N): ";

/// Message shown when the failing code could not be extracted
pub(crate) fn manual_hint(workspace: &Workspace, id: &str) -> String {
    format!(
        "Unable to automatically extract information, please refer to {} for details.",
        workspace.test_log_path(id).display()
    )
}

/// Ask a yes/no question; anything but an uppercase `Y` is a no
pub(crate) fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<bool> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim() == "Y")
}

/// Print a failure context in JSON format
pub fn print_context_json(ctx: &FailureContext) -> Result<()> {
    let json = serde_json::to_string_pretty(ctx)?;
    println!("{}", json);
    Ok(())
}

/// Print a failure context in text format
pub fn print_context_text(ctx: &FailureContext) {
    println!("Run {}", ctx.run_id);
    println!("======\n");

    println!("💥 {}", ctx.exception.kind);
    println!("   {}", ctx.exception.message);

    if ctx.frame.is_empty() {
        println!("\nNo stack frame found in the client's test code.");
    } else {
        println!("\n📍 {}", ctx.frame);
        println!("   File: {}", ctx.position.file_name);
        println!("   Line: {}", ctx.position.line_number);
    }

    if ctx.has_code() {
        println!(
            "\n🔎 Lines {}-{}\n{}",
            ctx.method.start_line,
            ctx.method.end_line,
            ctx.method.text.trim_end()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn workspace_with_catalogue(dir: &Path) -> Workspace {
        let mut record = KnowledgeRecord::new("7");
        record.client = "demo".to_string();
        record.test = "FooTest".to_string();
        KnowledgeStore::open(dir.join("incompatibilities.json"))
            .upsert(&record)
            .unwrap();
        Workspace::open(dir).unwrap()
    }

    #[test]
    fn test_find_record_prefers_knowledge() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = workspace_with_catalogue(dir.path());
        assert!(find_record(&workspace, "7").unwrap().exception.is_empty());

        let mut known = KnowledgeRecord::new("7");
        known.exception = "java.lang.NoSuchMethodError".to_string();
        KnowledgeStore::open(workspace.knowledge_path())
            .upsert(&known)
            .unwrap();

        assert_eq!(
            find_record(&workspace, "7").unwrap().exception,
            "java.lang.NoSuchMethodError"
        );
    }

    #[test]
    fn test_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = workspace_with_catalogue(dir.path());

        let err = find_record(&workspace, "99").unwrap_err();
        assert!(err.to_string().contains("Unable to find incompatibility id 99"));
        assert!(discover(&workspace, "99").is_err());
    }

    #[test]
    fn test_confirm() {
        let mut out = Vec::new();
        assert!(confirm(&mut Cursor::new("Y\n"), &mut out, SEND_PROMPT).unwrap());
        assert!(!confirm(&mut Cursor::new("n\n"), &mut out, SEND_PROMPT).unwrap());
        assert!(!confirm(&mut Cursor::new("y\n"), &mut out, SEND_PROMPT).unwrap());
        assert!(!confirm(&mut Cursor::new(""), &mut out, SEND_PROMPT).unwrap());
        assert!(String::from_utf8(out).unwrap().starts_with("Send to AI"));
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        config(dir.path(), false, true, false).unwrap();
        assert!(dir.path().join(CONFIG_FILE).exists());

        assert!(config(dir.path(), false, true, false).is_err());
        config(dir.path(), false, true, true).unwrap();
    }
}
