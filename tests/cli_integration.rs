//! Integration tests for the command-line interface.
//!
//! Drives the binary end to end and checks output plus the exit-code
//! contract: 0 success, 1 match failure, 2 I/O failure.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_cli(args: &[&str]) -> Output {
    let mut cargo_args = vec!["run", "--quiet", "--"];
    cargo_args.extend_from_slice(args);
    Command::new("cargo").args(&cargo_args).output().unwrap()
}

/// Helper to create a root with a patchable page and a patch set.
fn setup_root() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::write(dir.path().join("index.html"), "<head></head>\n<body>AAA</body>\n").unwrap();

    let patches_dir = dir.path().join("patches");
    fs::create_dir(&patches_dir).unwrap();
    fs::write(
        patches_dir.join("banner.toml"),
        r#"[meta]
name = "banner"
root_relative = true

[[patches]]
id = "add-banner"
file = "index.html"
guard = true

[patches.operation]
type = "insert"
marker = "AAA"
payload = "<nav>banner</nav>"
"#,
    )
    .unwrap();

    dir
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_insert_help() {
    let output = run_cli(&["insert", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Insert a payload"));
}

#[test]
fn test_insert_succeeds_with_exit_zero() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("page.html");
    fs::write(&target, "a MARK b").unwrap();

    let output = run_cli(&[
        "insert",
        "--marker",
        "MARK",
        "--payload",
        "X ",
        "--target",
        path_str(&target),
    ]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(fs::read_to_string(&target).unwrap(), "a X MARK b");
}

#[test]
fn test_missing_marker_exits_one_and_names_it() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("page.html");
    fs::write(&target, "no anchor in sight").unwrap();

    let output = run_cli(&[
        "insert",
        "--marker",
        "MARK",
        "--payload",
        "X",
        "--target",
        path_str(&target),
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("MARK"));
    // the target keeps its prior content
    assert_eq!(fs::read_to_string(&target).unwrap(), "no anchor in sight");
}

#[test]
fn test_missing_target_exits_two() {
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("absent.html");

    let output = run_cli(&[
        "insert",
        "--marker",
        "MARK",
        "--payload",
        "X",
        "--target",
        path_str(&absent),
    ]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_replace_with_boundary_pattern() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("page.html");
    fs::write(&target, "<a>old</a><b>").unwrap();

    let output = run_cli(&[
        "replace",
        "--start",
        "<a>",
        "--boundary-pattern",
        "<b>",
        "--payload",
        "<a>new</a>",
        "--target",
        path_str(&target),
    ]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(fs::read_to_string(&target).unwrap(), "<a>new</a><b>");
}

#[test]
fn test_dry_run_does_not_write() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("page.html");
    fs::write(&target, "a MARK b").unwrap();

    let output = run_cli(&[
        "insert",
        "--marker",
        "MARK",
        "--payload",
        "X",
        "--target",
        path_str(&target),
        "--dry-run",
    ]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "a MARK b");
}

#[test]
fn test_apply_patch_set() {
    let root = setup_root();

    let output = run_cli(&["apply", "--root", path_str(root.path())]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("add-banner"));
    assert!(stdout.contains("Summary:"));

    let html = fs::read_to_string(root.path().join("index.html")).unwrap();
    assert!(html.contains("<nav>banner</nav>AAA"));
}

#[test]
fn test_apply_is_rerunnable_with_guard() {
    let root = setup_root();

    run_cli(&["apply", "--root", path_str(root.path())]);
    let output = run_cli(&["apply", "--root", path_str(root.path())]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Already applied"));

    let html = fs::read_to_string(root.path().join("index.html")).unwrap();
    assert_eq!(html.matches("<nav>banner</nav>").count(), 1);
}

#[test]
fn test_status_reports_without_writing() {
    let root = setup_root();
    let before = fs::read_to_string(root.path().join("index.html")).unwrap();

    let output = run_cli(&["status", "--root", path_str(root.path())]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Patch Status Report"));
    assert!(stdout.contains("WOULD APPLY"));

    assert_eq!(
        fs::read_to_string(root.path().join("index.html")).unwrap(),
        before
    );
}
