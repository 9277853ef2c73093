//! Bulk listing and counting of files and folders.
//!
//! [`list_items`] lists the direct children of a folder, or walks it
//! recursively down to an optional depth. Files pass through the
//! [`FilterSpec`]; folders are never filtered. Each item is rendered with an
//! [`OutputFormat`], and an item whose rendering is empty is dropped.
//!
//! [`count_files`] reports the total number of files and the count per
//! folder, skipping ignored folders entirely.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::filter::FilterSpec;
use crate::sort::natural_cmp;

/// Separator written between folder parts and the name in
/// [`OutputFormat::FolderLevel`] output, on every platform.
pub const LEVEL_SEPARATOR: char = '\\';

/// Which parts of the containing folder and the item name to print when
/// using [`OutputFormat::FolderLevel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderLevel {
    /// Number of trailing folder components to keep; `None` keeps the whole path.
    pub level: Option<usize>,
    pub folder: bool,
    pub file: bool,
    pub extension: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    FullPath,
    /// File name without its extension.
    Stem,
    FileName,
    /// Extension with a leading dot.
    Extension,
    FolderLevel(FolderLevel),
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub list_files: bool,
    pub list_folders: bool,
    pub recursive: bool,
    /// Deepest folder (relative to the root, which is depth 0) whose
    /// children are listed. 0 means unlimited. Ignored unless `recursive`.
    pub max_depth: usize,
    pub filter: FilterSpec,
    pub format: OutputFormat,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            list_files: true,
            list_folders: true,
            recursive: false,
            max_depth: 0,
            filter: FilterSpec::default(),
            format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub folders: Vec<String>,
    pub files: Vec<String>,
}

impl Listing {
    /// Folders first, then files, one per line.
    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.folders.iter().chain(self.files.iter())
    }
}

pub fn list_items(root: &Path, opts: &ListOptions) -> Result<Listing> {
    if !root.is_dir() {
        bail!("Not a directory: {}", root.display());
    }

    let mut walker = WalkDir::new(root).min_depth(1);
    if !opts.recursive {
        walker = walker.max_depth(1);
    } else if opts.max_depth != 0 {
        walker = walker.max_depth(opts.max_depth + 1);
    }

    let mut listing = Listing::default();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        let parent = entry.path().parent().unwrap_or(root);
        let is_dir = entry.file_type().is_dir();

        if is_dir {
            if !opts.list_folders {
                continue;
            }
            let line = format_item(parent, &name, true, &opts.format);
            if !line.is_empty() {
                listing.folders.push(line);
            }
        } else if entry.file_type().is_file() {
            if !opts.list_files || !opts.filter.matches(&name) {
                continue;
            }
            let line = format_item(parent, &name, false, &opts.format);
            if !line.is_empty() {
                listing.files.push(line);
            }
        }
    }

    listing
        .folders
        .sort_by(|a, b| folder_sort_key(a).cmp(&folder_sort_key(b)).then_with(|| a.cmp(b)));
    listing
        .files
        .sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));

    Ok(listing)
}

/// Render one item according to `format`. Returns an empty string when the
/// format selects nothing.
pub fn format_item(folder: &Path, name: &str, is_dir: bool, format: &OutputFormat) -> String {
    let (stem, ext) = split_name(name);

    match format {
        OutputFormat::FullPath => folder.join(name).display().to_string(),
        OutputFormat::Stem => stem.to_string(),
        OutputFormat::FileName => name.to_string(),
        OutputFormat::Extension => format!(".{}", ext),
        OutputFormat::FolderLevel(fl) => {
            if !(fl.folder || fl.file || fl.extension) {
                return String::new();
            }

            let mut result = String::new();
            if fl.folder {
                result.push_str(&folder_tail(folder, fl.level));
                result.push(LEVEL_SEPARATOR);
            }
            if fl.file {
                result.push_str(stem);
            }
            if fl.extension {
                if !is_dir {
                    if fl.folder && !fl.file {
                        result.push('|');
                    }
                    result.push('.');
                    result.push_str(ext);
                } else if !fl.file && !fl.folder {
                    result.push('.');
                    result.push_str(ext);
                }
            }
            result
        }
    }
}

/// Last `level` components of `folder` (clamped to at least one and at most
/// all), or the whole path when `level` is `None`.
fn folder_tail(folder: &Path, level: Option<usize>) -> String {
    let Some(level) = level else {
        return folder.display().to_string();
    };

    let parts: Vec<String> = folder
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .filter(|p| !p.is_empty() && p != "/" && p != "\\")
        .collect();
    if parts.is_empty() {
        return folder.display().to_string();
    }

    let keep = level.clamp(1, parts.len());
    parts[parts.len() - keep..].join(&LEVEL_SEPARATOR.to_string())
}

/// Split `name` at its last dot. Leading-dot names have no extension.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos + 1..]),
        _ => (name, ""),
    }
}

/// Folders sort by a leading number in their last component (names without
/// one go last), then by lowercased name.
fn folder_sort_key(line: &str) -> (u64, String) {
    let base = line
        .rsplit(|c| c == '/' || c == '\\')
        .find(|s| !s.is_empty())
        .unwrap_or(line);
    let digits: String = base.chars().take_while(|c| c.is_ascii_digit()).collect();
    let num = if digits.is_empty() {
        u64::MAX
    } else {
        digits.parse().unwrap_or(u64::MAX)
    };
    (num, base.to_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountReport {
    pub total: usize,
    /// Every visited folder with its file count, in natural walk order.
    pub per_folder: Vec<(PathBuf, usize)>,
}

pub fn count_files(
    root: &Path,
    ignored_folders: &[String],
    ignored_files: &[String],
) -> Result<CountReport> {
    if !root.is_dir() {
        bail!("Not a directory: {}", root.display());
    }

    let walker = WalkDir::new(root)
        .sort_by(|a, b| {
            natural_cmp(
                &a.file_name().to_string_lossy(),
                &b.file_name().to_string_lossy(),
            )
        })
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !ignored_folders.contains(&e.file_name().to_string_lossy().to_string())
        });

    let mut report = CountReport::default();
    let mut index_of: std::collections::HashMap<PathBuf, usize> = std::collections::HashMap::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            index_of.insert(entry.path().to_path_buf(), report.per_folder.len());
            report.per_folder.push((entry.path().to_path_buf(), 0));
            continue;
        }

        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if ignored_files.contains(&name) {
            continue;
        }

        report.total += 1;
        if let Some(parent) = entry.path().parent() {
            if let Some(&i) = index_of.get(parent) {
                report.per_folder[i].1 += 1;
            }
        }
    }

    Ok(report)
}
