//! Copying folder structures and Word documents.
//!
//! [`copy_listed`] copies a folder's top level (or its full tree) into a
//! destination. [`copy_documents`] copies Word documents out of a folder
//! tree on a background worker thread, mirroring relative folders and never
//! overwriting an existing file.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use walkdir::WalkDir;

use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sort::natural_cmp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CopyMode {
    /// Create each top-level subfolder, empty.
    #[default]
    FoldersOnly,
    /// Create top-level subfolders empty and copy top-level files.
    FoldersAndFiles,
    /// Copy everything recursively, merging into the destination.
    FullTree,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub folders_created: usize,
    pub files_copied: usize,
}

pub fn copy_listed(src: &Path, dest: &Path, mode: CopyMode) -> Result<CopySummary> {
    if !src.is_dir() {
        bail!("Source folder doesn't exist: {}", src.display());
    }
    std::fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let mut summary = CopySummary::default();

    if mode == CopyMode::FullTree {
        copy_dir_all(src, dest, &mut summary)?;
        return Ok(summary);
    }

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let target = dest.join(entry.file_name());

        if path.is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            summary.folders_created += 1;
        } else if path.is_file() && mode == CopyMode::FoldersAndFiles {
            std::fs::copy(&path, &target)
                .with_context(|| format!("Failed to copy {}", path.display()))?;
            summary.files_copied += 1;
        }
    }

    Ok(summary)
}

fn copy_dir_all(src: &Path, dest: &Path, summary: &mut CopySummary) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            summary.folders_created += 1;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            summary.files_copied += 1;
        }
    }
    Ok(())
}

/// A Word document found under the copy source, with its folder relative
/// to the source root (empty for top-level files).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentItem {
    pub path: PathBuf,
    pub relative_dir: PathBuf,
}

const WORD_EXTENSIONS: [&str; 2] = ["docx", "doc"];

pub fn is_word_document(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name.starts_with("~$") {
        return false;
    }
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| WORD_EXTENSIONS.contains(&e.as_str()))
}

/// Collect Word documents from a file or folder.
pub fn collect_documents(source: &Path, include_subfolders: bool) -> Result<Vec<DocumentItem>> {
    if source.is_file() {
        return Ok(vec![DocumentItem {
            path: source.to_path_buf(),
            relative_dir: PathBuf::new(),
        }]);
    }
    if !source.is_dir() {
        bail!("Source not found: {}", source.display());
    }

    let mut walker = WalkDir::new(source).min_depth(1).sort_by(|a, b| {
        natural_cmp(
            &a.file_name().to_string_lossy(),
            &b.file_name().to_string_lossy(),
        )
    });
    if !include_subfolders {
        walker = walker.max_depth(1);
    }

    let mut items = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_word_document(entry.path()) {
            continue;
        }
        let relative_dir = entry
            .path()
            .parent()
            .and_then(|p| p.strip_prefix(source).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        items.push(DocumentItem {
            path: entry.path().to_path_buf(),
            relative_dir,
        });
    }
    Ok(items)
}

/// First free path among `path`, `<stem>_copy1.<ext>`, `<stem>_copy2.<ext>`, ...
pub fn unique_destination(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut i = 1;
    loop {
        let candidate = parent.join(format!("{}_copy{}{}", stem, i, ext));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocCopyReport {
    pub copied: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

enum WorkerMessage {
    Progress(ProgressEvent),
    Copied(PathBuf),
    Failed(PathBuf, String),
}

/// Copy Word documents from `source` into `dest` on a worker thread.
///
/// The calling thread only relays progress to `reporter`; failures of
/// individual files are collected and do not stop the batch.
pub fn copy_documents(
    source: &Path,
    dest: &Path,
    include_subfolders: bool,
    reporter: &dyn ProgressReporter,
) -> Result<DocCopyReport> {
    reporter.report(ProgressEvent::Scanning {
        task: "copy-docs".to_string(),
    });
    let items = collect_documents(source, include_subfolders)?;
    if items.is_empty() {
        bail!("No Word documents found in {}", source.display());
    }

    let (tx, rx) = mpsc::channel();
    let dest = dest.to_path_buf();
    let total = items.len() as u64;

    let worker = std::thread::spawn(move || {
        for (i, item) in items.into_iter().enumerate() {
            let display = item
                .relative_dir
                .join(item.path.file_name().unwrap_or_default())
                .display()
                .to_string();
            let _ = tx.send(WorkerMessage::Progress(ProgressEvent::Working {
                task: "copy-docs".to_string(),
                n: i as u64 + 1,
                total,
                item: display,
            }));

            let msg = match copy_one(&item, &dest) {
                Ok(target) => WorkerMessage::Copied(target),
                Err(e) => WorkerMessage::Failed(item.path.clone(), format!("{:#}", e)),
            };
            let _ = tx.send(msg);
        }
    });

    let mut report = DocCopyReport::default();
    for msg in rx {
        match msg {
            WorkerMessage::Progress(ev) => reporter.report(ev),
            WorkerMessage::Copied(p) => report.copied.push(p),
            WorkerMessage::Failed(p, e) => {
                tracing::warn!(path = %p.display(), error = %e, "copy failed");
                report.failed.push((p, e));
            }
        }
    }

    if worker.join().is_err() {
        bail!("copy worker panicked");
    }

    reporter.report(ProgressEvent::Finished {
        task: "copy-docs".to_string(),
        total,
    });
    Ok(report)
}

fn copy_one(item: &DocumentItem, dest: &Path) -> Result<PathBuf> {
    let folder = dest.join(&item.relative_dir);
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("Failed to create {}", folder.display()))?;

    let name = item
        .path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("No file name: {}", item.path.display()))?;
    let target = unique_destination(&folder.join(name));
    std::fs::copy(&item.path, &target)
        .with_context(|| format!("Failed to copy {}", item.path.display()))?;
    Ok(target)
}
