//! Stage composition for failure localization

use super::{FailureContext, LocalizeError, Stage};
use crate::extract::{
    extract_exception, locate_frame, test_target, BuildLog, ExtractError, LogMarkers,
    MethodResolver, MethodSpan,
};
use crate::repo::ClientRepo;
use crate::storage::KnowledgeRecord;
use crate::workspace::Workspace;
use std::path::PathBuf;

/// Resolves a source file name from a stack frame to a path
pub trait SourceLookup {
    /// Path of the first file with this name, if any
    fn find_source(&self, file_name: &str) -> Option<PathBuf>;
}

impl SourceLookup for ClientRepo {
    fn find_source(&self, file_name: &str) -> Option<PathBuf> {
        self.find_file(file_name)
    }
}

/// Runs the localization stages over one build log
pub struct Localizer {
    markers: LogMarkers,
    resolver: MethodResolver,
}

impl Localizer {
    /// Create a localizer using the given log vocabulary
    pub fn new(markers: LogMarkers) -> Result<Self, ExtractError> {
        Ok(Self {
            markers,
            resolver: MethodResolver::new()?,
        })
    }

    /// Localize the failure recorded in `log` for `test` (`Class` or `Class#member`)
    pub fn localize(
        &mut self,
        log: &BuildLog,
        test: &str,
        sources: &dyn SourceLookup,
    ) -> Result<FailureContext, LocalizeError> {
        let run_id = log.run_id();

        let exception = extract_exception(log, &self.markers)
            .map_err(|e| LocalizeError::new(run_id, Stage::Exception, e))?;
        let ctx = FailureContext::new(run_id).with_exception(exception);

        let frame = locate_frame(log, test_target(test), &self.markers);
        if frame.is_none() {
            tracing::warn!(run = run_id, test, "no stack frame found for test");
        }
        let ctx = ctx.with_frame(frame.as_ref());

        let method = self.enclosing_method(&ctx, sources)?;
        Ok(ctx.with_method(method))
    }

    /// Method at the context's position, or an empty span when it can't be found
    fn enclosing_method(
        &mut self,
        ctx: &FailureContext,
        sources: &dyn SourceLookup,
    ) -> Result<MethodSpan, LocalizeError> {
        let position = &ctx.position;
        let Some(line) = position.line() else {
            if !ctx.frame.is_empty() {
                tracing::warn!(frame = %ctx.frame, "stack frame carries no line number");
            }
            return Ok(MethodSpan::default());
        };

        let Some(path) = sources.find_source(&position.file_name) else {
            tracing::warn!("Source file not found: {}", position.file_name);
            return Ok(MethodSpan::default());
        };

        let source = match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                return Ok(MethodSpan::default());
            }
        };

        self.resolver
            .enclosing_method(&source, line)
            .map_err(|e| LocalizeError::new(&ctx.run_id, Stage::SourceParse, e).with_inspect(&path))
    }
}

/// Localize the failure of a recorded run from its test log in the workspace.
///
/// A missing log is read as empty, so the run stops at the exception stage
/// with the log path attached.
pub fn localize_run(
    workspace: &Workspace,
    record: &KnowledgeRecord,
) -> Result<FailureContext, LocalizeError> {
    let log_path = workspace.test_log_path(&record.id);
    let log = BuildLog::read(&record.id, &log_path).unwrap_or_else(|e| {
        tracing::warn!("{:#}", e);
        BuildLog::new(&record.id, "")
    });

    let client = ClientRepo::new(workspace.client_dir(&record.client));

    let mut localizer = Localizer::new(workspace.config().markers.clone())
        .map_err(|e| LocalizeError::new(&record.id, Stage::Setup, e))?;

    localizer
        .localize(&log, &record.test, &client)
        .map_err(|e| match e.stage {
            Stage::Exception => e.with_inspect(&log_path),
            _ => e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    const JAVA: &str = r#"package com.x;

public class FooTest {
    @Test
    public void testBar() {
        Foo foo = new Foo();
        foo.bar();
    }
}
"#;

    const LOG: &str = r#"[INFO] Running com.x.FooTest
[ERROR] testBar(com.x.FooTest)  Time elapsed: 0.01 s  <<< ERROR!
java.lang.NoSuchMethodError: 'void com.lib.Foo.bar()'
	at com.x.FooTest.testBar(FooTest.java:7)
	at java.base/jdk.internal.reflect.NativeMethodAccessorImpl.invoke0(Native Method)
[INFO] BUILD FAILURE
"#;

    struct MapLookup(HashMap<String, PathBuf>);

    impl SourceLookup for MapLookup {
        fn find_source(&self, file_name: &str) -> Option<PathBuf> {
            self.0.get(file_name).cloned()
        }
    }

    fn lookup_with(dir: &Path, name: &str, content: &str) -> MapLookup {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        MapLookup(HashMap::from([(name.to_string(), path)]))
    }

    #[test]
    fn test_localize_full_context() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = lookup_with(dir.path(), "FooTest.java", JAVA);

        let mut localizer = Localizer::new(LogMarkers::default()).unwrap();
        let log = BuildLog::new("42", LOG);
        let ctx = localizer.localize(&log, "FooTest#testBar", &lookup).unwrap();

        assert_eq!(ctx.exception.kind, "java.lang.NoSuchMethodError");
        assert_eq!(ctx.exception.message, "'void com.lib.Foo.bar()'");
        assert_eq!(ctx.position.file_name, "FooTest.java");
        assert_eq!(ctx.position.line_number, "7");
        assert_eq!(ctx.method.name, "testBar");
        assert_eq!((ctx.method.start_line, ctx.method.end_line), (4, 7));
        assert!(ctx.method.text.starts_with("    @Test"));
        assert!(ctx.method.text.contains("foo.bar();"));
        assert!(ctx.method.text.ends_with("    }"));
    }

    #[test]
    fn test_frame_not_found_is_soft() {
        let lookup = MapLookup(HashMap::new());
        let mut localizer = Localizer::new(LogMarkers::default()).unwrap();
        let log = BuildLog::new("42", LOG);

        let ctx = localizer.localize(&log, "OtherTest", &lookup).unwrap();
        assert_eq!(ctx.exception.kind, "java.lang.NoSuchMethodError");
        assert!(ctx.frame.is_empty());
        assert!(ctx.position.file_name.is_empty());
        assert!(!ctx.has_code());
    }

    #[test]
    fn test_missing_source_is_soft() {
        let lookup = MapLookup(HashMap::new());
        let mut localizer = Localizer::new(LogMarkers::default()).unwrap();
        let log = BuildLog::new("42", LOG);

        let ctx = localizer.localize(&log, "FooTest", &lookup).unwrap();
        assert_eq!(ctx.position.line_number, "7");
        assert_eq!(ctx.method, MethodSpan::default());
    }

    #[test]
    fn test_no_exception_is_fatal() {
        let lookup = MapLookup(HashMap::new());
        let mut localizer = Localizer::new(LogMarkers::default()).unwrap();
        let log = BuildLog::new("42", "[INFO] BUILD FAILURE\n");

        let err = localizer.localize(&log, "FooTest", &lookup).unwrap_err();
        assert_eq!(err.stage, Stage::Exception);
        assert_eq!(err.run_id, "42");
    }

    #[test]
    fn test_unparsable_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = lookup_with(dir.path(), "FooTest.java", "public class FooTest { void x( {");

        let mut localizer = Localizer::new(LogMarkers::default()).unwrap();
        let log = BuildLog::new("42", LOG);

        let err = localizer.localize(&log, "FooTest", &lookup).unwrap_err();
        assert_eq!(err.stage, Stage::SourceParse);
        assert!(err.inspect.unwrap().ends_with("FooTest.java"));
    }

    #[test]
    fn test_localize_run_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();

        let log_path = workspace.test_log_path("42");
        std::fs::create_dir_all(log_path.parent().unwrap()).unwrap();
        std::fs::write(&log_path, LOG).unwrap();

        let source_dir = workspace.client_dir("demo").join("src/test/java/com/x");
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(source_dir.join("FooTest.java"), JAVA).unwrap();

        let mut record = KnowledgeRecord::new("42");
        record.client = "demo".to_string();
        record.test = "FooTest#testBar".to_string();

        let ctx = localize_run(&workspace, &record).unwrap();
        assert!(ctx.method.text.contains("foo.bar();"));
    }

    #[test]
    fn test_localize_run_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        let record = KnowledgeRecord::new("missing");

        let err = localize_run(&workspace, &record).unwrap_err();
        assert_eq!(err.stage, Stage::Exception);
        assert_eq!(err.inspect, Some(workspace.test_log_path("missing")));
    }
}
