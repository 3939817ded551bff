//! Maven test runs against an upgraded client
//!
//! A run builds the client once with its pinned dependencies, bumps the
//! library to the new version, then re-runs the failing test with all output
//! captured in the run's log.

use crate::extract::{classify_build, BuildLog, BuildOutcome};
use crate::repo::ClientRepo;
use crate::storage::KnowledgeRecord;
use crate::workspace::{MavenConfig, Workspace};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Runs Maven commands in a client checkout
pub struct TestRunner {
    maven: MavenConfig,
}

impl TestRunner {
    pub fn new(maven: MavenConfig) -> Self {
        Self { maven }
    }

    /// `mvn install` with tests and checks skipped
    pub fn install_command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.maven.executable);
        cmd.args(&self.maven.install_args).current_dir(dir);
        cmd
    }

    /// `mvn test` restricted to one test
    pub fn test_command(&self, dir: &Path, test: &str) -> Command {
        let mut cmd = Command::new(&self.maven.executable);
        cmd.args(&self.maven.test_args)
            .arg(format!("-Dtest={}", test))
            .current_dir(dir);
        cmd
    }

    /// A user-supplied test command, run through the shell
    pub fn custom_command(&self, dir: &Path, command_line: &str) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command_line]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command_line]);
            cmd
        };
        cmd.current_dir(dir);
        cmd
    }

    /// Run a command, discarding its output
    pub fn run_quiet(&self, mut cmd: Command) -> Result<ExitStatus> {
        tracing::debug!(?cmd, "running");
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run {:?}", cmd.get_program()))
    }

    /// Run a command with stdout and stderr written to `log_path`
    pub fn run_logged(&self, mut cmd: Command, log_path: &Path) -> Result<ExitStatus> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let log = File::create(log_path)
            .with_context(|| format!("Failed to create log file {:?}", log_path))?;
        let err_log = log.try_clone()?;

        tracing::debug!(?cmd, log = ?log_path, "running");
        cmd.stdout(Stdio::from(log))
            .stderr(Stdio::from(err_log))
            .status()
            .with_context(|| format!("Failed to run {:?}", cmd.get_program()))
    }
}

/// Directory tests run in: the submodule when the record names one
fn test_dir(client_dir: &Path, record: &KnowledgeRecord) -> PathBuf {
    match record.submodule() {
        Some(module) => client_dir.join(module),
        None => client_dir.to_path_buf(),
    }
}

/// Build the client, bump the library and re-run the failing test.
///
/// The test output lands in the run's log, which decides the outcome.
pub fn run_upgrade_test(workspace: &Workspace, record: &KnowledgeRecord) -> Result<BuildOutcome> {
    let runner = TestRunner::new(workspace.config().maven.clone());
    let client_dir = workspace.client_dir(&record.client);
    let client = ClientRepo::new(&client_dir);

    if !client.exists() {
        anyhow::bail!(
            "Client {} is not checked out at {:?}. Run 'sludi discover --id {}' first.",
            record.client,
            client_dir,
            record.id
        );
    }

    tracing::info!("Running Test for Maven Project '{}' with id: {}...", record.client, record.id);

    let status = runner.run_quiet(runner.install_command(&client_dir))?;
    tracing::debug!(%status, "install finished");

    let dir = test_dir(&client_dir, record);
    if record.submodule().is_some() {
        let status = runner.run_quiet(runner.test_command(&dir, &record.test))?;
        tracing::debug!(%status, "baseline test finished");
    }

    let (group_id, artifact_id) = record
        .lib_coordinates()
        .ok_or_else(|| anyhow::anyhow!("Library must be 'groupId:artifactId', got '{}'", record.lib))?;
    let changed = client.bump_dependency(group_id, artifact_id, &record.new)?;
    if changed == 0 {
        tracing::warn!("No pom.xml declares {} with an explicit version", record.lib);
    }

    let log_path = workspace.test_log_path(&record.id);
    let cmd = match record.test_cmd() {
        Some(command_line) => runner.custom_command(&dir, command_line),
        None => runner.test_command(&dir, &record.test),
    };
    let status = runner.run_logged(cmd, &log_path)?;
    tracing::info!(%status, log = ?log_path, "test run finished");

    let log = BuildLog::read(&record.id, &log_path)?;
    Ok(classify_build(&log, &workspace.config().markers))
}
