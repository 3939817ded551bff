//! Workspace layout
//!
//! A workspace is the directory sludi works in. It holds:
//! - The incompatibility catalogue and the knowledge records
//! - Client checkouts under `knowledge/_downloads`
//! - One test log per run under `knowledge/_test_logs/<id>/test.log`
//! - An optional `sludi.toml` configuration

mod config;

pub use config::{Config, LlmSettings, MavenConfig, Provider, CONFIG_FILE};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File listing the known upgrade incompatibilities
pub const INCOMPATIBILITIES_FILE: &str = "incompatibilities.json";
/// File holding the records produced by diagnosis runs
pub const KNOWLEDGE_FILE: &str = "knowledge.json";

/// The directory tree a diagnosis runs in
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Open a workspace, loading `sludi.toml` when present
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config = Config::load_or_default(&root)?;
        Ok(Self { root, config })
    }

    /// Open a workspace with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(root: P, config: Config) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
        }
    }

    /// Get the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the workspace configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory holding client checkouts
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("knowledge").join("_downloads")
    }

    /// Checkout directory of one client project
    pub fn client_dir(&self, client: &str) -> PathBuf {
        self.downloads_dir().join(client)
    }

    /// Directory holding per-run test logs
    pub fn test_log_dir(&self) -> PathBuf {
        self.root.join("knowledge").join("_test_logs")
    }

    /// Test log of one run
    pub fn test_log_path(&self, id: &str) -> PathBuf {
        self.test_log_dir().join(id).join("test.log")
    }

    /// Catalogue of known incompatibilities
    pub fn incompatibilities_path(&self) -> PathBuf {
        self.root.join(INCOMPATIBILITIES_FILE)
    }

    /// Records written by diagnosis runs
    pub fn knowledge_path(&self) -> PathBuf {
        self.root.join(KNOWLEDGE_FILE)
    }

    /// Create the downloads and test-log directories if they don't exist
    pub fn init_dirs(&self) -> Result<()> {
        for dir in [self.downloads_dir(), self.test_log_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {:?}", dir))?;
            }
        }
        Ok(())
    }
}
