//! Client project checkouts
//!
//! This module handles the client-side Git and file operations:
//! - Cloning a client and pinning it to a commit
//! - Reverting local modifications before a new run
//! - Locating source files by name
//! - Bumping a dependency version across every `pom.xml`

mod pom;

pub use pom::bump_version;

use anyhow::{Context, Result};
use git2::{build::CheckoutBuilder, Repository as GitRepo};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A client project checked out in the workspace
pub struct ClientRepo {
    /// Path to the checkout root
    root: PathBuf,
}

impl ClientRepo {
    /// Refer to a checkout directory, whether or not it exists yet
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the checkout root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the checkout directory exists
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Clone `url` into the checkout directory and detach HEAD at `sha`
    pub fn clone_at(&self, url: &str, sha: &str) -> Result<()> {
        tracing::info!("Cloning {} into {:?}", url, self.root);

        let repo = GitRepo::clone(url, &self.root)
            .with_context(|| format!("Failed to clone {}", url))?;

        let commit = repo
            .revparse_single(sha)
            .with_context(|| format!("Failed to parse revision: {}", sha))?
            .peel_to_commit()
            .context("Failed to peel to commit")?;

        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
            .with_context(|| format!("Failed to check out {}", sha))?;
        repo.set_head_detached(commit.id())
            .context("Failed to detach HEAD")?;

        Ok(())
    }

    /// Discard modifications to tracked files
    pub fn revert_changes(&self) -> Result<()> {
        let repo = GitRepo::open(&self.root)
            .with_context(|| format!("Failed to open Git repository at {:?}", self.root))?;

        repo.checkout_head(Some(CheckoutBuilder::new().force()))
            .context("Failed to revert working tree")?;

        Ok(())
    }

    /// Find the first file with the given name in the checkout
    pub fn find_file(&self, file_name: &str) -> Option<PathBuf> {
        tracing::debug!("Searching for file: {}", file_name);

        self.walk_files()
            .find(|path| path.file_name().and_then(|n| n.to_str()) == Some(file_name))
    }

    /// Set `version` on the `group:artifact` dependency in every pom.
    ///
    /// Returns the number of pom files rewritten.
    pub fn bump_dependency(&self, group_id: &str, artifact_id: &str, version: &str) -> Result<usize> {
        let mut changed = 0;

        let poms: Vec<PathBuf> = self
            .walk_files()
            .filter(|path| path.file_name().and_then(|n| n.to_str()) == Some("pom.xml"))
            .collect();

        for pom_path in poms {
            let content = std::fs::read_to_string(&pom_path)
                .with_context(|| format!("Failed to read {:?}", pom_path))?;

            if let Some(updated) = bump_version(&content, group_id, artifact_id, version) {
                std::fs::write(&pom_path, updated)
                    .with_context(|| format!("Failed to write {:?}", pom_path))?;
                tracing::info!("Set {}:{} to {} in {:?}", group_id, artifact_id, version, pom_path);
                changed += 1;
            }
        }

        Ok(changed)
    }

    fn walk_files(&self) -> impl Iterator<Item = PathBuf> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
    }
}
