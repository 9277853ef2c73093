use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn clerk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("clerk");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let project = root.join("project");
    fs::create_dir_all(project.join("2 drafts/sub")).unwrap();
    fs::create_dir_all(project.join("10 final")).unwrap();
    fs::write(project.join("notes.txt"), "notes").unwrap();
    fs::write(project.join("desktop.ini"), "ignored").unwrap();
    fs::write(project.join("2 drafts/a.docx"), "a").unwrap();
    fs::write(project.join("2 drafts/sub/deep.txt"), "deep").unwrap();
    fs::write(project.join("10 final/b.docx"), "b").unwrap();
    fs::write(project.join("10 final/b.tmp"), "t").unwrap();

    let config_content = format!(
        r#"[tree]
ignored_extensions = [".tmp"]

[wipe]
max_attempts = 2
delay_ms = 10
trash_dir = "{}/trash"
"#,
        root.display()
    );
    let config_path = config_dir.join("clerk.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_clerk(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = clerk_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run clerk binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn path_arg(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_tree_output() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");

    let (stdout, stderr, success) = run_clerk(&config_path, &["tree", path_arg(&project)]);
    assert!(success, "tree failed: stdout={}, stderr={}", stdout, stderr);

    let expected = "\
project/
├── notes.txt
│
├── 2 drafts/
│   ├── a.docx
│   │
│   └── sub/
│       └── deep.txt
│
└── 10 final/
    └── b.docx
";
    assert_eq!(stdout, expected);
}

#[test]
fn test_tree_is_deterministic_and_writes_file() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");
    let out1 = tmp.path().join("tree1.txt");
    let out2 = tmp.path().join("tree2.txt");

    let (_, _, ok1) = run_clerk(
        &config_path,
        &["tree", path_arg(&project), "--output", path_arg(&out1)],
    );
    let (_, _, ok2) = run_clerk(
        &config_path,
        &["tree", path_arg(&project), "--output", path_arg(&out2)],
    );
    assert!(ok1 && ok2);
    assert_eq!(fs::read(&out1).unwrap(), fs::read(&out2).unwrap());
}

#[test]
fn test_tree_missing_root_fails() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("nope");
    let (_, stderr, success) = run_clerk(&config_path, &["tree", path_arg(&missing)]);
    assert!(!success);
    assert!(stderr.contains("Not a directory"), "stderr: {}", stderr);
}

#[test]
fn test_list_with_extension_filter() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");

    let (stdout, stderr, success) = run_clerk(
        &config_path,
        &[
            "list",
            path_arg(&project),
            "--recursive",
            "--files-only",
            "--ext",
            ".docx",
            "--format",
            "file-name",
        ],
    );
    assert!(success, "list failed: {}", stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["a.docx", "b.docx"]);
}

#[test]
fn test_list_exclude_mode() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");

    let (stdout, _, success) = run_clerk(
        &config_path,
        &[
            "list",
            path_arg(&project),
            "--files-only",
            "--ext",
            ".txt",
            "--filter-mode",
            "exclude",
            "--format",
            "file-name",
        ],
    );
    assert!(success);
    assert!(stdout.contains("desktop.ini"));
    assert!(!stdout.contains("notes.txt"));
}

#[test]
fn test_count_files() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");

    let (stdout, stderr, success) = run_clerk(&config_path, &["count", path_arg(&project)]);
    assert!(success, "count failed: {}", stderr);
    // desktop.ini is ignored by default.
    assert!(stdout.contains("Total files: 5"), "stdout: {}", stdout);
}

#[test]
fn test_copy_folders_only() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");
    let dest = tmp.path().join("skeleton");

    let (stdout, stderr, success) = run_clerk(
        &config_path,
        &["copy", path_arg(&project), path_arg(&dest)],
    );
    assert!(success, "copy failed: {}", stderr);
    assert!(stdout.contains("Created 2 folder(s)"));
    assert!(dest.join("2 drafts").is_dir());
    assert!(dest.join("10 final").is_dir());
    assert!(!dest.join("2 drafts/sub").exists());
    assert!(!dest.join("notes.txt").exists());
}

#[test]
fn test_copy_docs_never_overwrites() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");
    let dest = tmp.path().join("docs");
    fs::create_dir_all(dest.join("2 drafts")).unwrap();
    fs::write(dest.join("2 drafts/a.docx"), "existing").unwrap();

    let (stdout, stderr, success) = run_clerk(
        &config_path,
        &["copy-docs", path_arg(&project), path_arg(&dest)],
    );
    assert!(success, "copy-docs failed: {}", stderr);
    assert!(stdout.contains("Copied 2 document(s)"));
    assert_eq!(fs::read_to_string(dest.join("2 drafts/a.docx")).unwrap(), "existing");
    assert_eq!(fs::read_to_string(dest.join("2 drafts/a_copy1.docx")).unwrap(), "a");
    assert!(dest.join("10 final/b.docx").exists());
}

#[test]
fn test_wipe_moves_tree_to_trash() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");

    let (stdout, stderr, success) = run_clerk(&config_path, &["wipe", path_arg(&project)]);
    assert!(success, "wipe failed: stdout={}, stderr={}", stdout, stderr);
    assert!(!project.exists());
    assert!(stdout.contains("Deleted 6/6 file(s)"), "stdout: {}", stdout);

    let trashed = fs::read_dir(tmp.path().join("trash")).unwrap().count();
    assert!(trashed > 0);
}

#[test]
fn test_wipe_rerun_is_noop() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");

    let (_, _, first) = run_clerk(&config_path, &["wipe", path_arg(&project), "--permanent"]);
    assert!(first);
    let (stdout, stderr, second) = run_clerk(&config_path, &["wipe", path_arg(&project), "--permanent"]);
    assert!(second, "rerun failed: {}", stderr);
    assert!(stdout.contains("Deleted 0/0 file(s)"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("dir/inner")).unwrap();
    let config_path = tmp.path().join("absent.toml");

    let (stdout, stderr, success) =
        run_clerk(&config_path, &["tree", path_arg(&tmp.path().join("dir"))]);
    assert!(success, "tree failed: {}", stderr);
    assert_eq!(stdout, "dir/\n└── inner/\n");
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[wipe]\nmax_attempts = 0\n").unwrap();

    let (_, stderr, success) = run_clerk(&config_path, &["count", path_arg(tmp.path())]);
    assert!(!success);
    assert!(stderr.contains("max_attempts"), "stderr: {}", stderr);
}
