//! Folder tree rendering.
//!
//! Produces the familiar box-drawing listing of a directory:
//!
//! ```text
//! project/
//! ├── notes.txt
//! │
//! ├── 2 drafts/
//! │   └── a.docx
//! │
//! └── 10 final/
//!     └── b.docx
//! ```
//!
//! Within each directory files come first, then folders, each group in
//! natural order. The output depends only on the directory contents, never
//! on the order the OS returns entries in.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::config::TreeConfig;
use crate::sort::sort_natural;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    #[default]
    Slash,
    Backslash,
}

impl Separator {
    pub fn as_char(self) -> char {
        match self {
            Separator::Slash => '/',
            Separator::Backslash => '\\',
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    pub ignored_files: Vec<String>,
    pub ignored_folders: Vec<String>,
    /// Extensions without the leading dot; files ending with one are hidden.
    pub ignored_extensions: Vec<String>,
    pub hide_dot_entries: bool,
    pub separator: Separator,
}

impl From<&TreeConfig> for TreeOptions {
    fn from(cfg: &TreeConfig) -> Self {
        Self {
            ignored_files: cfg.ignored_files.clone(),
            ignored_folders: cfg.ignored_folders.clone(),
            ignored_extensions: cfg
                .ignored_extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect(),
            hide_dot_entries: cfg.hide_dot_entries,
            separator: cfg.separator,
        }
    }
}

const BRANCH: &str = "├── ";
const LAST: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render the tree rooted at `root`.
pub fn render_tree(root: &Path, opts: &TreeOptions) -> Result<String> {
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    let abs = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", root.display()))?;
    let root_name = abs
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| abs.display().to_string());

    let mut out = String::new();
    out.push_str(&root_name);
    out.push(opts.separator.as_char());
    out.push('\n');
    render_dir(&abs, "", opts, &mut out);
    Ok(out)
}

fn render_dir(path: &Path, prefix: &str, opts: &TreeOptions, out: &mut String) {
    let (files, folders) = match read_entries(path, opts) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    for (i, name) in files.iter().enumerate() {
        let is_last = i == files.len() - 1 && folders.is_empty();
        out.push_str(prefix);
        out.push_str(if is_last { LAST } else { BRANCH });
        out.push_str(name);
        out.push('\n');
    }

    for (i, name) in folders.iter().enumerate() {
        if i > 0 || !files.is_empty() {
            out.push_str(prefix);
            out.push_str("│\n");
        }

        let is_last = i == folders.len() - 1;
        out.push_str(prefix);
        out.push_str(if is_last { LAST } else { BRANCH });
        out.push_str(name);
        out.push(opts.separator.as_char());
        out.push('\n');

        let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { PIPE });
        render_dir(&path.join(name), &child_prefix, opts, out);
    }
}

/// Split a directory's visible entries into naturally sorted files and folders.
fn read_entries(path: &Path, opts: &TreeOptions) -> std::io::Result<(Vec<String>, Vec<String>)> {
    let mut files = Vec::new();
    let mut folders = Vec::new();

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if opts.hide_dot_entries && name.starts_with('.') {
            continue;
        }
        if opts.ignored_files.contains(&name) || opts.ignored_folders.contains(&name) {
            continue;
        }

        // Follow symlinks like a plain stat would; dangling links are dropped.
        let meta = match std::fs::metadata(entry.path()) {
            Ok(m) => m,
            Err(_) => continue,
        };

        if meta.is_dir() {
            folders.push(name);
        } else if meta.is_file() {
            if opts.ignored_extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
                continue;
            }
            files.push(name);
        }
    }

    sort_natural(&mut files);
    sort_natural(&mut folders);
    Ok((files, folders))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("project");
        fs::create_dir_all(root.join("10 final")).unwrap();
        fs::create_dir_all(root.join("2 drafts/sub")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("notes.txt"), "n").unwrap();
        fs::write(root.join("desktop.ini"), "x").unwrap();
        fs::write(root.join("2 drafts/a.docx"), "a").unwrap();
        fs::write(root.join("2 drafts/sub/deep.txt"), "d").unwrap();
        fs::write(root.join("10 final/b.docx"), "b").unwrap();
        fs::write(root.join("10 final/b.tmp"), "t").unwrap();
        tmp
    }

    fn opts() -> TreeOptions {
        let mut cfg = TreeConfig::default();
        cfg.ignored_extensions = vec![".tmp".to_string()];
        TreeOptions::from(&cfg)
    }

    #[test]
    fn renders_files_before_folders_with_spacers() {
        let tmp = fixture();
        let out = render_tree(&tmp.path().join("project"), &opts()).unwrap();
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
        assert_eq!(out, expected);
    }

    #[test]
    fn output_is_identical_across_runs() {
        let tmp = fixture();
        let root = tmp.path().join("project");
        let a = render_tree(&root, &opts()).unwrap();
        let b = render_tree(&root, &opts()).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn backslash_separator_marks_folders() {
        let tmp = fixture();
        let mut o = opts();
        o.separator = Separator::Backslash;
        let out = render_tree(&tmp.path().join("project"), &o).unwrap();
        assert!(out.starts_with("project\\\n"));
        assert!(out.contains("└── 10 final\\\n"));
    }

    #[test]
    fn empty_directory_renders_only_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("empty");
        fs::create_dir(&root).unwrap();
        assert_eq!(render_tree(&root, &opts()).unwrap(), "empty/\n");
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(render_tree(&tmp.path().join("nope"), &opts()).is_err());
    }
}
