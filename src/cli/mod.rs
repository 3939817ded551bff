//! CLI interface using clap
//!
//! Provides the command-line interface for sludi

mod commands;
mod session;

pub use commands::*;
pub use session::Session;

use crate::workspace::Provider;
use clap::{Args, Parser, Subcommand};

/// sludi - diagnose library-upgrade failures in Maven projects
#[derive(Parser, Debug)]
#[command(name = "sludi")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workspace directory holding the records, checkouts and test logs
    #[arg(short, long, global = true, default_value = ".")]
    pub workspace: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short = 'o', long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check out the client of an incompatibility and record it
    Discover(RunArgs),

    /// Upgrade the library and run the failing test
    Test(RunArgs),

    /// Extract the exception and failing method from a run's test log
    Extract(RunArgs),

    /// Extract the failure and ask an LLM for a fix
    Diagnose(DiagnoseArgs),

    /// Interactive test / extract / diagnose loop
    Session(SessionArgs),

    /// Show or initialise the workspace configuration
    Config(ConfigArgs),
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Arguments naming one incompatibility
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Incompatibility id
    #[arg(long)]
    pub id: String,
}

/// LLM connection options
#[derive(Args, Debug, Default)]
pub struct LlmArgs {
    /// LLM service (overrides the workspace configuration)
    #[arg(long)]
    pub provider: Option<Provider>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,
}

impl LlmArgs {
    /// API key for the given provider
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        match provider {
            Provider::OpenAi => self.openai_api_key.clone(),
            Provider::Anthropic => self.anthropic_api_key.clone(),
        }
    }
}

/// Arguments for diagnose command
#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// Incompatibility id
    #[arg(long)]
    pub id: String,

    /// Send to the LLM without confirmation
    #[arg(short, long)]
    pub yes: bool,

    #[command(flatten)]
    pub llm: LlmArgs,
}

/// Arguments for session command
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Incompatibility id
    #[arg(long)]
    pub id: String,

    /// Run the Maven upgrade test on each 'test' (otherwise only the existing log is read)
    #[arg(long)]
    pub run_tests: bool,

    #[command(flatten)]
    pub llm: LlmArgs,
}

/// Arguments for config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Write the default configuration file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
