mod common;

use codevet::{SweepStatus, ValidationStatus};
use common::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn project() -> TempDir {
    let project = TempDir::new().unwrap();
    create_test_file(
        project.path(),
        "good.py",
        b"def area(w, h):\n    \"\"\"Area.\"\"\"\n    return w * h\n",
    );
    create_test_file(project.path(), "broken.py", b"def broken(:\n    return\n");
    // Not UTF-8, so reading it as text fails.
    create_test_file(project.path(), "binary.py", &[0xff, 0xfe, 0x00, 0x81]);
    create_test_file(project.path(), "README.md", b"# not python\n");
    create_test_file(
        project.path(),
        "pkg/nested.py",
        b"def helper():\n    \"\"\"Help.\"\"\"\n    return 1\n",
    );
    project
}

#[test]
fn test_sweep_isolates_per_file_failures() {
    let project = project();
    let cache = TempDir::new().unwrap();
    let orchestrator = free_orchestrator(&cache, false);

    let report = orchestrator.validate_directory(project.path(), false);

    assert_eq!(report.status, SweepStatus::Success);
    assert_eq!(report.files.len(), 3);
    let names: Vec<String> = report
        .files
        .iter()
        .map(|v| {
            v.file_path
                .as_ref()
                .unwrap()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(names, vec!["binary.py", "broken.py", "good.py"]);

    let binary = &report.files[0];
    assert_eq!(binary.status, ValidationStatus::Error);
    assert_eq!(binary.source, "filesystem");
    assert_eq!(report.files[1].status, ValidationStatus::NotValid);
    assert_eq!(report.files[2].status, ValidationStatus::Valid);

    assert_eq!(report.counts["ERROR"], 1);
    assert_eq!(report.counts["NOT_VALID"], 1);
    assert_eq!(report.counts["VALID"], 1);
    assert_eq!(report.total_cost, 0.0);
}

#[test]
fn test_recursive_sweep_includes_subdirectories() {
    let project = project();
    let cache = TempDir::new().unwrap();
    let orchestrator = free_orchestrator(&cache, false);

    let report = orchestrator.validate_directory(project.path(), true);

    assert_eq!(report.files.len(), 4);
    assert!(report
        .files
        .iter()
        .any(|v| v.file_path.as_ref().unwrap().ends_with("pkg/nested.py")));
}

#[test]
fn test_missing_directory_reports_error() {
    let cache = TempDir::new().unwrap();
    let orchestrator = free_orchestrator(&cache, false);
    let missing = cache.path().join("nowhere");

    let report = orchestrator.validate_directory(&missing, true);

    assert_eq!(report.status, SweepStatus::Error);
    assert!(report.error.is_some());
    assert!(report.files.is_empty());
}

#[test]
fn test_validate_file_attaches_path() {
    let project = project();
    let cache = TempDir::new().unwrap();
    let orchestrator = free_orchestrator(&cache, false);
    let path = project.path().join("good.py");

    let verdict = orchestrator.validate_file(&path);
    assert_eq!(verdict.file_path.as_deref(), Some(path.as_path()));

    let missing = project.path().join("absent.py");
    let verdict = orchestrator.validate_file(&missing);
    assert_eq!(verdict.status, ValidationStatus::Error);
    assert_eq!(verdict.file_path.as_deref(), Some(missing.as_path()));
    assert!(verdict.explanation.contains("absent.py"));
}

#[test]
fn test_sweep_stats_count_every_file() {
    let project = project();
    let cache = TempDir::new().unwrap();
    let orchestrator = free_orchestrator(&cache, false);

    orchestrator.validate_directory(project.path(), true);
    let stats = orchestrator.get_stats();

    // The unreadable file never enters the pipeline.
    assert_eq!(stats.total_validations, 3);
    assert_eq!(stats.rule_resolutions, 1);
    assert_eq!(stats.fallback_resolutions, 2);
}
