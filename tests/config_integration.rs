//! Integration tests for patch-set loading and batch application.
//!
//! Covers TOML parsing, validation, idempotency guards, and the
//! group-by-file write path.

use anchor_splice::{apply_all, check_all, load_from_str, ApplicationError, PatchStatus};
use std::fs;
use tempfile::TempDir;

/// Helper to create a site tree shaped like the real targets: a stylesheet
/// with a known trailing block, and a page with a replaceable section.
fn setup_site() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::create_dir_all(dir.path().join("css")).unwrap();
    fs::write(
        dir.path().join("css/layout.css"),
        ".preview-pane {\n    overflow: auto;\n}\n\nbody.bg-aurora {\n    background: black;\n}\n",
    )
    .unwrap();

    fs::write(
        dir.path().join("index.html"),
        "<body>\n    <!-- Home Screen -->\n    <div id=\"home\">old</div>\n    <div class=\"app-layout\">\n</body>\n",
    )
    .unwrap();

    dir
}

#[test]
fn test_load_patch_set_basic() {
    let toml = r#"
[meta]
name = "home-screen"
description = "Splice the home screen into the app shell"
root_relative = true

[[patches]]
id = "inject-css"
file = "css/layout.css"

[patches.operation]
type = "insert"
marker = "\nbody.bg-aurora {"
payload = ".home-screen { position: fixed; }\n"
"#;

    let config = load_from_str(toml).expect("failed to parse patch set");

    assert_eq!(config.meta.name, "home-screen");
    assert!(config.meta.root_relative);
    assert_eq!(config.patches.len(), 1);
    assert_eq!(config.patches[0].id, "inject-css");
    assert!(!config.patches[0].guard);
}

#[test]
fn test_empty_patch_set_rejected() {
    let err = load_from_str("[meta]\nname = \"empty\"\n").unwrap_err();
    assert!(err.to_string().contains("no patches"));
}

#[test]
fn test_missing_payload_rejected() {
    let toml = r#"
[[patches]]
id = "no-payload"
file = "index.html"

[patches.operation]
type = "insert"
marker = "X"
"#;

    let err = load_from_str(toml).unwrap_err();
    assert!(err.to_string().contains("payload"));
}

#[test]
fn test_both_payload_sources_rejected() {
    let toml = r#"
[[patches]]
id = "twice"
file = "index.html"

[patches.operation]
type = "insert"
marker = "X"
payload = "a"
payload_file = "a.html"
"#;

    let err = load_from_str(toml).unwrap_err();
    assert!(err.to_string().contains("exactly one"));
}

#[test]
fn test_verify_on_insert_rejected() {
    let toml = r#"
[[patches]]
id = "bad-verify"
file = "index.html"

[patches.operation]
type = "insert"
marker = "X"
payload = "a"

[patches.verify]
method = "exact_match"
expected_text = "X"
"#;

    let err = load_from_str(toml).unwrap_err();
    assert!(err.to_string().contains("replace"));
}

#[test]
fn test_apply_insert_into_stylesheet() {
    let site = setup_site();

    let config = load_from_str(
        r#"
[meta]
name = "home-screen"
root_relative = true

[[patches]]
id = "inject-css"
file = "css/layout.css"

[patches.operation]
type = "insert"
marker = "\nbody.bg-aurora {"
payload = "\n.home-screen {\n    position: fixed;\n    inset: 0;\n}\n"
"#,
    )
    .unwrap();

    let results = apply_all(&config, site.path(), site.path());
    assert!(matches!(results[0].1, Ok(PatchStatus::Applied { .. })));

    let css = fs::read_to_string(site.path().join("css/layout.css")).unwrap();
    assert!(css.contains(".home-screen {\n    position: fixed;"));
    // the payload sits immediately before the marker block
    assert!(css.contains("}\n\nbody.bg-aurora {"));
}

#[test]
fn test_apply_replace_section_in_page() {
    let site = setup_site();

    let config = load_from_str(
        r#"
[meta]
root_relative = true

[[patches]]
id = "replace-home"
file = "index.html"

[patches.operation]
type = "replace"
start = "    <!-- Home Screen"
boundary = '\n    <div class="app-layout">'
payload = "    <!-- Home Screen -->\n    <div id=\"home\">new</div>"
"#,
    )
    .unwrap();

    let results = apply_all(&config, site.path(), site.path());
    assert!(matches!(results[0].1, Ok(PatchStatus::Applied { .. })));

    let html = fs::read_to_string(site.path().join("index.html")).unwrap();
    assert_eq!(
        html,
        "<body>\n    <!-- Home Screen -->\n    <div id=\"home\">new</div>\n    <div class=\"app-layout\">\n</body>\n"
    );
}

#[test]
fn test_guarded_patch_set_is_rerunnable() {
    let site = setup_site();

    let config = load_from_str(
        r#"
[meta]
root_relative = true

[[patches]]
id = "inject-css"
file = "css/layout.css"
guard = true

[patches.operation]
type = "insert"
marker = "\nbody.bg-aurora {"
payload = ".home-screen { inset: 0; }\n"
"#,
    )
    .unwrap();

    let first = apply_all(&config, site.path(), site.path());
    assert!(matches!(first[0].1, Ok(PatchStatus::Applied { .. })));
    let after_first = fs::read_to_string(site.path().join("css/layout.css")).unwrap();

    let second = apply_all(&config, site.path(), site.path());
    assert!(matches!(
        second[0].1,
        Ok(PatchStatus::AlreadyApplied { .. })
    ));
    let after_second = fs::read_to_string(site.path().join("css/layout.css")).unwrap();
    assert_eq!(after_first, after_second);
}

#[test]
fn test_unguarded_patch_set_duplicates_on_rerun() {
    // without a guard, re-running re-inserts: the payload lands twice
    let site = setup_site();

    let config = load_from_str(
        r#"
[meta]
root_relative = true

[[patches]]
id = "inject-css"
file = "css/layout.css"

[patches.operation]
type = "insert"
marker = "\nbody.bg-aurora {"
payload = ".home-screen { inset: 0; }\n"
"#,
    )
    .unwrap();

    apply_all(&config, site.path(), site.path());
    apply_all(&config, site.path(), site.path());

    let css = fs::read_to_string(site.path().join("css/layout.css")).unwrap();
    assert_eq!(css.matches(".home-screen { inset: 0; }").count(), 2);
}

#[test]
fn test_missing_target_is_an_io_error() {
    let site = setup_site();
    let absent = site.path().join("absent.html");

    let config = load_from_str(&format!(
        r#"
[[patches]]
id = "misses"
file = "{}"

[patches.operation]
type = "insert"
marker = "X"
payload = "y"
"#,
        absent.display()
    ))
    .unwrap();

    let results = apply_all(&config, site.path(), site.path());
    assert!(matches!(results[0].1, Err(ApplicationError::Io { .. })));
}

#[test]
fn test_check_all_reports_without_writing() {
    let site = setup_site();
    let before = fs::read_to_string(site.path().join("index.html")).unwrap();

    let config = load_from_str(
        r#"
[meta]
root_relative = true

[[patches]]
id = "replace-home"
file = "index.html"

[patches.operation]
type = "replace"
start = "    <!-- Home Screen"
boundary = '\n    <div class="app-layout">'
payload = "REPLACED"
"#,
    )
    .unwrap();

    let results = check_all(&config, site.path(), site.path());
    assert!(matches!(results[0].1, Ok(PatchStatus::Applied { .. })));

    let after = fs::read_to_string(site.path().join("index.html")).unwrap();
    assert_eq!(before, after);
}
