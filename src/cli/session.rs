//! Interactive diagnosis session

use super::commands::{confirm, extract, manual_hint, SEND_PROMPT};
use crate::llm::{self, CompletionProvider};
use crate::localize::LocalizeError;
use crate::runner::run_upgrade_test;
use crate::storage::KnowledgeRecord;
use crate::workspace::Workspace;
use anyhow::Result;
use std::io::{BufRead, Write};

/// A `test` / `exit` loop over one incompatibility.
///
/// Each `test` optionally re-runs the upgrade, then localizes the failure and
/// offers to send it to the LLM. When nothing could be extracted, the operator
/// can type a prompt instead.
pub struct Session<'a, R, W> {
    workspace: &'a Workspace,
    record: KnowledgeRecord,
    provider: &'a dyn CompletionProvider,
    run_tests: bool,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(
        workspace: &'a Workspace,
        record: KnowledgeRecord,
        provider: &'a dyn CompletionProvider,
        input: R,
        output: W,
    ) -> Self {
        Self {
            workspace,
            record,
            provider,
            run_tests: false,
            input,
            output,
        }
    }

    /// Run the Maven upgrade test before each extraction
    pub fn with_tests(mut self, run_tests: bool) -> Self {
        self.run_tests = run_tests;
        self
    }

    /// Run until `exit`, end of input, or a passing test
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let Some(command) = self.prompt("Type 'test' to run Maven test build or 'exit' to quit: ")?
            else {
                break;
            };

            match command.as_str() {
                "exit" => break,
                "test" => {}
                _ => {
                    writeln!(self.output, "Invalid input. Please type 'test' or 'exit'.")?;
                    continue;
                }
            }

            if self.run_tests && run_upgrade_test(self.workspace, &self.record)?.is_success() {
                writeln!(self.output, "Test successful!.")?;
                return Ok(());
            }

            if self.diagnose_once().await? {
                continue;
            }

            let Some(prompt) = self.prompt("Enter prompt manually or 'exit' to quit: ")? else {
                break;
            };
            if prompt == "exit" {
                break;
            }
            if prompt.is_empty() {
                continue;
            }

            writeln!(self.output, "Sending to AI: '{}'!", prompt)?;
            let answer = llm::ask(self.provider, &prompt).await?;
            writeln!(self.output, "{}", answer)?;
        }

        Ok(())
    }

    /// Localize and offer to send. Returns whether an answer was received.
    async fn diagnose_once(&mut self) -> Result<bool> {
        let ctx = match extract(self.workspace, &self.record.id) {
            Ok(ctx) => ctx,
            Err(e) => {
                if let Some(err) = e.downcast_ref::<LocalizeError>() {
                    writeln!(self.output, "{}", err.format_for_cli())?;
                    return Ok(false);
                }
                return Err(e);
            }
        };

        if !ctx.has_code() {
            writeln!(self.output, "{}", manual_hint(self.workspace, &self.record.id))?;
            return Ok(false);
        }

        writeln!(self.output, "{}", ctx.payload())?;
        if !confirm(&mut self.input, &mut self.output, SEND_PROMPT)? {
            writeln!(
                self.output,
                "Please refer to {} for details.",
                self.workspace.test_log_path(&self.record.id).display()
            )?;
            return Ok(false);
        }

        writeln!(self.output, "Sending to AI...")?;
        let answer = llm::diagnose(self.provider, &ctx).await?;
        writeln!(self.output, "{}", answer)?;
        Ok(true)
    }

    /// Print a prompt and read one trimmed line; `None` at end of input
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::storage::KnowledgeStore;
    use std::io::Cursor;

    const JAVA: &str = "package com.x;\n\npublic class FooTest {\n    @Test\n    public void testBar() {\n        new Foo().bar();\n    }\n}\n";

    const LOG: &str = "[ERROR] testBar(com.x.FooTest)  Time elapsed: 0.01 s  <<< ERROR!\njava.lang.NoSuchMethodError: Foo.bar()\n\tat com.x.FooTest.testBar(FooTest.java:6)\n[INFO] BUILD FAILURE\n";

    fn setup(dir: &std::path::Path, log: &str) -> (Workspace, KnowledgeRecord) {
        let workspace = Workspace::open(dir).unwrap();

        let log_path = workspace.test_log_path("1");
        std::fs::create_dir_all(log_path.parent().unwrap()).unwrap();
        std::fs::write(&log_path, log).unwrap();

        let client = workspace.client_dir("demo");
        std::fs::create_dir_all(&client).unwrap();
        std::fs::write(client.join("FooTest.java"), JAVA).unwrap();

        let mut record = KnowledgeRecord::new("1");
        record.client = "demo".to_string();
        record.test = "FooTest#testBar".to_string();
        KnowledgeStore::open(workspace.incompatibilities_path())
            .upsert(&record)
            .unwrap();

        (workspace, record)
    }

    async fn run_session(workspace: &Workspace, record: KnowledgeRecord, input: &str) -> String {
        let mut provider = MockLlmClient::new();
        provider.add_response("NoSuchMethodError", "Call the new method");

        let mut output = Vec::new();
        Session::new(workspace, record, &provider, Cursor::new(input.to_string()), &mut output)
            .run()
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_session_sends_context() {
        let dir = tempfile::tempdir().unwrap();
        let (workspace, record) = setup(dir.path(), LOG);

        let output = run_session(&workspace, record, "test\nY\nexit\n").await;
        assert!(output.contains("java.lang.NoSuchMethodError\nFoo.bar()\n@Test"));
        assert!(output.contains("Call the new method"));

        let stored = KnowledgeStore::open(workspace.knowledge_path())
            .get("1")
            .unwrap()
            .unwrap();
        assert_eq!(stored.line_no, "6");
    }

    #[tokio::test]
    async fn test_session_rejects_unknown_input() {
        let dir = tempfile::tempdir().unwrap();
        let (workspace, record) = setup(dir.path(), LOG);

        let output = run_session(&workspace, record, "build\n").await;
        assert!(output.contains("Invalid input. Please type 'test' or 'exit'."));
    }

    #[tokio::test]
    async fn test_session_falls_back_to_manual_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let (workspace, record) = setup(dir.path(), "[INFO] BUILD FAILURE\n");

        let output = run_session(&workspace, record, "test\nwhat went wrong?\nexit\n").await;
        assert!(output.contains("Please refer to"));
        assert!(output.contains("Sending to AI: 'what went wrong?'!"));
        assert!(output.contains("Error Analysis"));
    }

    #[tokio::test]
    async fn test_session_declined_send() {
        let dir = tempfile::tempdir().unwrap();
        let (workspace, record) = setup(dir.path(), LOG);

        let output = run_session(&workspace, record, "test\nN\nexit\n").await;
        assert!(output.contains("test.log for details."));
        assert!(!output.contains("Call the new method"));
    }
}
