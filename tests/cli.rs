use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const LOG: &str = "\
[INFO] Running com.acme.ParserTest
[ERROR] testParse(com.acme.ParserTest)  Time elapsed: 0.02 s  <<< ERROR!
java.lang.NoSuchMethodError: 'org.jsoup.nodes.Document org.jsoup.Jsoup.parse(java.lang.String, boolean)'
\tat com.acme.ParserTest.testParse(ParserTest.java:9)
\tat java.base/jdk.internal.reflect.NativeMethodAccessorImpl.invoke0(Native Method)
[INFO] BUILD FAILURE
";

const JAVA: &str = "\
package com.acme;

import org.jsoup.Jsoup;

public class ParserTest {

    @Test
    public void testParse() {
        Jsoup.parse(\"<p>\", true);
    }
}
";

const CATALOGUE: &str = r#"[
  {
    "id": "1",
    "client": "acme",
    "url": "https://example.invalid/acme.git",
    "sha": "abc123",
    "lib": "org.jsoup:jsoup",
    "old": "1.13.1",
    "new": "1.15.3",
    "test": "ParserTest#testParse",
    "submodule": "N/A",
    "test_cmd": "N/A",
    "tags": ["api-removal"]
  }
]"#;

fn sludi() -> Command {
    Command::cargo_bin("sludi").unwrap()
}

fn workspace(dir: &Path, log: &str) {
    std::fs::write(dir.join("incompatibilities.json"), CATALOGUE).unwrap();

    let log_dir = dir.join("knowledge/_test_logs/1");
    std::fs::create_dir_all(&log_dir).unwrap();
    std::fs::write(log_dir.join("test.log"), log).unwrap();

    let source_dir = dir.join("knowledge/_downloads/acme/src/test/java/com/acme");
    std::fs::create_dir_all(&source_dir).unwrap();
    std::fs::write(source_dir.join("ParserTest.java"), JAVA).unwrap();
}

#[test]
fn test_help_lists_commands() {
    sludi()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("diagnose"))
        .stdout(predicate::str::contains("session"));
}

#[test]
fn test_config_init_writes_file() {
    let dir = tempfile::tempdir().unwrap();

    sludi()
        .args(["-w", dir.path().to_str().unwrap(), "config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default configuration"));

    let content = std::fs::read_to_string(dir.path().join("sludi.toml")).unwrap();
    assert!(content.contains("BUILD FAILURE"));
}

#[test]
fn test_extract_json() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path(), LOG);

    sludi()
        .args(["-w", dir.path().to_str().unwrap(), "-o", "json", "extract", "--id", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"java.lang.NoSuchMethodError\""))
        .stdout(predicate::str::contains("\"file_name\": \"ParserTest.java\""))
        .stdout(predicate::str::contains("\"start_line\": 7"))
        .stdout(predicate::str::contains("\"end_line\": 9"))
        .stdout(predicate::str::contains("Jsoup.parse"));

    let knowledge = std::fs::read_to_string(dir.path().join("knowledge.json")).unwrap();
    assert!(knowledge.contains("\"line_no\": \"9\""));
    assert!(knowledge.contains("api-removal"));
}

#[test]
fn test_extract_without_exception_fails() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path(), "[INFO] BUILD FAILURE\n");

    sludi()
        .args(["-w", dir.path().to_str().unwrap(), "extract", "--id", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No exception found."))
        .stderr(predicate::str::contains("test.log for details."));
}

#[test]
fn test_unknown_id() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path(), LOG);

    sludi()
        .args(["-w", dir.path().to_str().unwrap(), "extract", "--id", "404"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unable to find incompatibility id 404"));
}
