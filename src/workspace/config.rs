//! Workspace configuration for sludi

use crate::extract::LogMarkers;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file at the workspace root
pub const CONFIG_FILE: &str = "sludi.toml";

/// Configuration for a diagnosis workspace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Maven log vocabulary
    #[serde(default)]
    pub markers: LogMarkers,

    /// Maven invocation
    #[serde(default)]
    pub maven: MavenConfig,

    /// LLM endpoint configuration
    #[serde(default)]
    pub llm: LlmSettings,
}

/// How the client project is built and tested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MavenConfig {
    /// Maven executable
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Arguments for the install pass run before testing
    #[serde(default = "default_install_args")]
    pub install_args: Vec<String>,

    /// Arguments for the test pass; `-Dtest=<test>` is appended
    #[serde(default = "default_test_args")]
    pub test_args: Vec<String>,
}

/// Which LLM service answers diagnosis requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[value(name = "openai")]
    OpenAi,
    Anthropic,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Service to query
    #[serde(default)]
    pub provider: Provider,

    /// Model name (provider default when unset)
    pub model: Option<String>,

    /// API base URL (provider default when unset)
    pub endpoint: Option<String>,

    /// Maximum tokens for response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Temperature for generation
    #[serde(default)]
    pub temperature: f32,
}

fn default_executable() -> String {
    "mvn".to_string()
}

fn default_install_args() -> Vec<String> {
    [
        "install",
        "-DskipTests",
        "-fn",
        "-Denforcer.skip",
        "-Dgpg.skip",
        "-Drat.skip",
        "-Dcheckstyle.skip",
        "-Danimal.sniffer.skip",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_test_args() -> Vec<String> {
    ["test", "-fn", "-Drat.ignoreErrors=true", "-DtrimStackTrace=false"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_tokens() -> usize {
    800
}

impl Default for MavenConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            install_args: default_install_args(),
            test_args: default_test_args(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            endpoint: None,
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

impl Config {
    /// Load configuration from the workspace or return defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the workspace
    pub fn save(&self, root: &Path) -> Result<()> {
        std::fs::create_dir_all(root)?;

        let config_path = root.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }
}
