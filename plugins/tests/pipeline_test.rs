//! Stock plugins composed into pipelines.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use startkit_plugin::{ExecutionContext, FileRecord, MemoryReporter, Parallel, Plugin, Report, Sequence};
use startkit_plugins::{exec, find, read};
use tempfile::TempDir;

fn project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/a.txt"), "alpha").unwrap();
    std::fs::write(root.join("src/b.txt"), "beta").unwrap();
    std::fs::write(root.join("src/c.md"), "gamma").unwrap();
    temp_dir
}

#[tokio::test]
async fn test_find_then_read() {
    let temp_dir = project();
    let root = temp_dir.path();
    let reporter = Arc::new(MemoryReporter::new());
    let ctx = ExecutionContext::new()
        .with_working_dir(root)
        .with_reporter(reporter.clone());

    let pipeline = Sequence::new().then(find(["src/*.txt"])).then(read());
    let output = pipeline.run(&ctx, Vec::new()).await.unwrap();

    assert_eq!(
        output,
        vec![
            FileRecord::new(root.join("src/a.txt")).with_data("alpha"),
            FileRecord::new(root.join("src/b.txt")).with_data("beta"),
        ]
    );

    let entries = reporter.entries();
    assert_eq!(entries.first(), Some(&Report::Start("find".to_string())));
    assert_eq!(entries.last(), Some(&Report::Done("read".to_string())));
    assert!(entries.contains(&Report::Message {
        plugin: "find".to_string(),
        message: "found 2 files".to_string(),
    }));
}

#[tokio::test]
async fn test_parallel_finds_concatenate() {
    let temp_dir = project();
    let root = temp_dir.path();
    let ctx = ExecutionContext::new().with_working_dir(root);

    let pipeline = Parallel::new().with(find(["src/*.md"])).with(find(["src/a.txt"]));
    let output = pipeline.run(&ctx, Vec::new()).await.unwrap();

    assert_eq!(
        output,
        vec![
            FileRecord::new(root.join("src/c.md")),
            FileRecord::new(root.join("src/a.txt")),
        ]
    );
}

#[tokio::test]
async fn test_failing_exec_stops_sequence() {
    let temp_dir = project();
    let root = temp_dir.path();
    let reporter = Arc::new(MemoryReporter::new());
    let ctx = ExecutionContext::new()
        .with_working_dir(root)
        .with_reporter(reporter.clone());

    let pipeline = Sequence::new()
        .then(find(["src/*.txt"]))
        .then(exec("false", Vec::<String>::new()))
        .then(read());
    let result = pipeline.run(&ctx, Vec::new()).await;

    assert!(result.is_err());
    let entries = reporter.entries();
    assert!(entries.iter().any(|e| matches!(e, Report::Error { plugin, .. } if plugin == "exec")));
    assert!(!entries.contains(&Report::Start("read".to_string())));
}
