//! Safe deletion of a folder tree ("wipe and recycle").
//!
//! The routine runs in phases so a single locked or oddly named item never
//! blocks the rest of the tree:
//!
//! 1. collect every file and subfolder bottom-up;
//! 2. rename each file to `temp_delete_file_<n>`;
//! 3. wipe each temp file (clear read-only, truncate) and send it to the
//!    [`Trash`];
//! 4. deepest first, rename each subfolder to `temp_delete_folder_<n>`
//!    and send it to the trash straight away;
//! 5. remove the root itself.
//!
//! Deletions run under a [`RetryPolicy`]: permission-denied errors are
//! retried, and when attempts run out the policy's [`Fallback`] decides
//! between permanent removal and giving up. Every per-item failure is
//! recorded in the [`WipeReport`] and the run continues.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::progress::{ProgressEvent, ProgressReporter};
use crate::retry::{Attempt, Fallback, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum WipeError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("trash directory {trash} is inside the folder being wiped")]
    TrashInsideTarget { trash: PathBuf },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Destination for deleted items.
pub trait Trash {
    /// Move `path` (a file or an empty folder) out of the way.
    fn send(&self, path: &Path) -> io::Result<()>;

    /// Directory items are moved into, if any.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Moves items into a trash folder under a collision-free name so they can
/// be recovered by hand.
pub struct DirectoryTrash {
    dir: PathBuf,
}

impl DirectoryTrash {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn target_for(&self, path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "item".to_string());
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        self.dir
            .join(format!("{}.{}.{}", name, stamp, uuid::Uuid::new_v4().simple()))
    }
}

impl Trash for DirectoryTrash {
    fn send(&self, path: &Path) -> io::Result<()> {
        let target = self.target_for(path);
        match fs::rename(path, &target) {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind(), io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound) => {
                Err(e)
            }
            // Rename across filesystems fails; copy then remove instead.
            Err(_) => move_by_copy(path, &target),
        }
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

/// Move a file or an empty folder to `target` without `rename`.
fn move_by_copy(path: &Path, target: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::create_dir(target)?;
        fs::remove_dir(path)
    } else {
        fs::copy(path, target)?;
        fs::remove_file(path)
    }
}

/// Deletes items outright; nothing is recoverable.
pub struct PermanentDelete;

impl Trash for PermanentDelete {
    fn send(&self, path: &Path) -> io::Result<()> {
        remove_permanently(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeStage {
    RenameFile,
    DeleteFile,
    RenameFolder,
    DeleteFolder,
    DeleteRoot,
}

#[derive(Debug, Clone)]
pub struct WipeFailure {
    pub path: PathBuf,
    pub stage: WipeStage,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct WipeReport {
    pub files_found: usize,
    pub folders_found: usize,
    pub files_deleted: usize,
    pub folders_deleted: usize,
    pub root_removed: bool,
    pub failures: Vec<WipeFailure>,
}

impl WipeReport {
    fn fail(&mut self, path: &Path, stage: WipeStage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(path = %path.display(), ?stage, %message, "wipe step failed");
        self.failures.push(WipeFailure {
            path: path.to_path_buf(),
            stage,
            message,
        });
    }
}

/// Wipe `root` and everything below it.
///
/// A missing `root` is not an error: the report is empty, so re-running
/// after a successful wipe is a no-op.
pub fn wipe_and_recycle(
    root: &Path,
    policy: &RetryPolicy,
    trash: &dyn Trash,
    reporter: &dyn ProgressReporter,
) -> Result<WipeReport, WipeError> {
    let meta = match fs::symlink_metadata(root) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %root.display(), "nothing to wipe");
            return Ok(WipeReport::default());
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_dir() {
        return Err(WipeError::NotADirectory(root.to_path_buf()));
    }
    if let Some(trash_dir) = trash.location() {
        let abs_root = root.canonicalize()?;
        let abs_trash = trash_dir.canonicalize().unwrap_or_else(|_| trash_dir.to_path_buf());
        if abs_trash.starts_with(&abs_root) {
            return Err(WipeError::TrashInsideTarget { trash: abs_trash });
        }
    }

    reporter.report(ProgressEvent::Scanning {
        task: "wipe".to_string(),
    });
    let (files, folders) = collect_bottom_up(root);
    let mut report = WipeReport {
        files_found: files.len(),
        folders_found: folders.len(),
        ..WipeReport::default()
    };
    tracing::info!(
        files = files.len(),
        folders = folders.len(),
        path = %root.display(),
        "collected items to wipe"
    );
    let total = (files.len() + folders.len() + 1) as u64;
    let mut done = 0u64;

    let mut temp_files = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        match rename_to_temp(file, "temp_delete_file", i + 1) {
            Ok(p) => temp_files.push(p),
            Err(e) => report.fail(file, WipeStage::RenameFile, e.to_string()),
        }
    }

    for file in &temp_files {
        done += 1;
        report_item(reporter, done, total, file);
        if !exists(file) {
            continue;
        }
        match delete_with_policy(file, policy, |p| wipe_file(p, trash), remove_permanently) {
            Ok(()) => report.files_deleted += 1,
            Err(msg) => report.fail(file, WipeStage::DeleteFile, msg),
        }
    }

    // Children come before their parent, so each folder is already empty
    // when it is renamed and released, and no stored path goes stale.
    for (i, folder) in folders.iter().enumerate() {
        done += 1;
        let temp = match rename_to_temp(folder, "temp_delete_folder", i + 1) {
            Ok(p) => p,
            Err(e) => {
                report_item(reporter, done, total, folder);
                report.fail(folder, WipeStage::RenameFolder, e.to_string());
                continue;
            }
        };
        report_item(reporter, done, total, &temp);
        match delete_with_policy(&temp, policy, |p| release_folder(p, trash), remove_permanently) {
            Ok(()) => report.folders_deleted += 1,
            Err(msg) => report.fail(&temp, WipeStage::DeleteFolder, msg),
        }
    }

    report_item(reporter, total, total, root);
    match delete_with_policy(root, policy, |p| release_folder(p, trash), remove_permanently) {
        Ok(()) => report.root_removed = true,
        Err(msg) => report.fail(root, WipeStage::DeleteRoot, msg),
    }

    reporter.report(ProgressEvent::Finished {
        task: "wipe".to_string(),
        total,
    });
    Ok(report)
}

fn report_item(reporter: &dyn ProgressReporter, n: u64, total: u64, path: &Path) {
    reporter.report(ProgressEvent::Working {
        task: "wipe".to_string(),
        n,
        total,
        item: path.display().to_string(),
    });
}

/// Files and folders below `root`, children listed before their parent.
/// Folders are made writable on the way so their entries can be renamed.
fn collect_bottom_up(root: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut files = Vec::new();
    let mut folders = Vec::new();

    let _ = make_writable(root);
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            let _ = make_writable(entry.path());
            folders.push(entry.path().to_path_buf());
        } else {
            files.push(entry.path().to_path_buf());
        }
    }

    (files, folders)
}

/// Rename `path` to `<prefix>_<index>` in the same folder, picking a free
/// name if that one is taken.
fn rename_to_temp(path: &Path, prefix: &str, index: usize) -> io::Result<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut target = parent.join(format!("{}_{}", prefix, index));
    let mut bump = 1;
    while exists(&target) && target != path {
        target = parent.join(format!("{}_{}_{}", prefix, index, bump));
        bump += 1;
    }
    fs::rename(path, &target)?;
    Ok(target)
}

/// Clear read-only, truncate regular files, then hand to the trash.
fn wipe_file(path: &Path, trash: &dyn Trash) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_file() {
        make_writable(path)?;
        fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)?;
    }
    trash.send(path)
}

fn release_folder(path: &Path, trash: &dyn Trash) -> io::Result<()> {
    make_writable(path)?;
    trash.send(path)
}

fn delete_with_policy<F, G>(
    path: &Path,
    policy: &RetryPolicy,
    mut primary: F,
    fallback: G,
) -> Result<(), String>
where
    F: FnMut(&Path) -> io::Result<()>,
    G: Fn(&Path) -> io::Result<()>,
{
    match policy.run(|| primary(path)) {
        Attempt::Done(()) => Ok(()),
        Attempt::Failed(e) => Err(e.to_string()),
        Attempt::Exhausted(e) => match policy.fallback {
            Fallback::Remove => {
                tracing::debug!(path = %path.display(), "retries exhausted, removing permanently");
                if !exists(path) {
                    return Ok(());
                }
                fallback(path).map_err(|fe| format!("final removal failed: {} (after: {})", fe, e))
            }
            Fallback::Skip => Err(format!(
                "gave up after {} attempts: {}",
                policy.max_attempts, e
            )),
        },
    }
}

fn remove_permanently(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(unix)]
fn make_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        return Ok(());
    }
    let mut perms = meta.permissions();
    let mode = perms.mode();
    let wanted = mode | 0o700;
    if mode != wanted {
        perms.set_mode(wanted);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_writable(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    let mut perms = meta.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::time::Duration;
    use tempfile::TempDir;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        }
    }

    fn build_tree(root: &Path) -> (usize, usize) {
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("d")).unwrap();
        fs::write(root.join("top.txt"), "secret").unwrap();
        fs::write(root.join("a/one.txt"), "1").unwrap();
        fs::write(root.join("a/b/two.txt"), "2").unwrap();
        fs::write(root.join("a/b/c/temp_delete_file_1"), "collide").unwrap();
        fs::write(root.join("d/CON.txt"), "odd").unwrap();
        (5, 4)
    }

    #[test]
    fn wipes_tree_into_trash_and_removes_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("target");
        let (n_files, n_folders) = build_tree(&root);
        let trash = DirectoryTrash::new(tmp.path().join("trash")).unwrap();

        let report = wipe_and_recycle(&root, &policy(), &trash, &NoProgress).unwrap();

        assert!(!root.exists());
        assert!(report.root_removed);
        assert_eq!(report.files_found, n_files);
        assert_eq!(report.folders_found, n_folders);
        assert_eq!(report.files_deleted, n_files);
        assert_eq!(report.folders_deleted, n_folders);
        assert!(report.failures.is_empty(), "{:?}", report.failures);

        // Files reach the trash under temp names, emptied.
        let trashed: Vec<_> = fs::read_dir(tmp.path().join("trash"))
            .unwrap()
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(trashed.len(), n_files + n_folders + 1);
        for entry in &trashed {
            let name = entry.file_name().to_string_lossy().to_string();
            assert!(name.starts_with("temp_delete_") || name.starts_with("target."), "{}", name);
            if entry.file_type().unwrap().is_file() {
                assert_eq!(entry.metadata().unwrap().len(), 0);
            }
        }
    }

    #[test]
    fn rerun_on_missing_path_is_noop() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("target");
        build_tree(&root);

        wipe_and_recycle(&root, &policy(), &PermanentDelete, &NoProgress).unwrap();
        let again = wipe_and_recycle(&root, &policy(), &PermanentDelete, &NoProgress).unwrap();
        assert_eq!(again.files_found, 0);
        assert_eq!(again.folders_found, 0);
        assert!(!again.root_removed);
        assert!(again.failures.is_empty());
    }

    fn build_deep_tree(root: &Path) {
        fs::create_dir_all(root.join("a/b/c/d")).unwrap();
        fs::write(root.join("a/b/c/d/leaf.txt"), "leaf").unwrap();
        fs::write(root.join("a/b/mid.txt"), "mid").unwrap();
    }

    #[test]
    fn deep_tree_is_removed_permanently() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("t");
        build_deep_tree(&root);

        let report = wipe_and_recycle(&root, &policy(), &PermanentDelete, &NoProgress).unwrap();

        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.files_deleted, 2);
        assert_eq!(report.folders_found, 4);
        assert_eq!(report.folders_deleted, 4);
        assert!(report.root_removed);
        assert!(!root.exists());
    }

    #[test]
    fn deep_tree_folders_reach_trash_one_by_one() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("t");
        build_deep_tree(&root);
        let trash = DirectoryTrash::new(tmp.path().join("trash")).unwrap();

        let report = wipe_and_recycle(&root, &policy(), &trash, &NoProgress).unwrap();

        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.folders_deleted, 4);
        assert!(!root.exists());
        let trashed: Vec<_> = fs::read_dir(tmp.path().join("trash"))
            .unwrap()
            .map(|e| e.unwrap())
            .collect();
        // 2 files + 4 folders + the root, every folder empty.
        assert_eq!(trashed.len(), 7);
        for entry in trashed.iter().filter(|e| e.file_type().unwrap().is_dir()) {
            assert_eq!(fs::read_dir(entry.path()).unwrap().count(), 0);
        }
    }

    #[test]
    fn move_by_copy_handles_files_and_empty_folders() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("f.txt");
        fs::write(&file, "payload").unwrap();
        let file_target = tmp.path().join("moved.txt");
        move_by_copy(&file, &file_target).unwrap();
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(&file_target).unwrap(), "payload");

        let dir = tmp.path().join("empty");
        fs::create_dir(&dir).unwrap();
        let dir_target = tmp.path().join("moved_dir");
        move_by_copy(&dir, &dir_target).unwrap();
        assert!(!dir.exists());
        assert!(dir_target.is_dir());

        let full = tmp.path().join("full");
        fs::create_dir(&full).unwrap();
        fs::write(full.join("x"), "x").unwrap();
        assert!(move_by_copy(&full, &tmp.path().join("full_target")).is_err());
        assert!(full.join("x").exists());
    }

    #[test]
    fn empty_directory_is_removed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("empty");
        fs::create_dir(&root).unwrap();

        let report = wipe_and_recycle(&root, &policy(), &PermanentDelete, &NoProgress).unwrap();
        assert!(report.root_removed);
        assert!(!root.exists());
    }

    #[test]
    fn read_only_files_are_wiped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ro");
        fs::create_dir(&root).unwrap();
        let file = root.join("locked.txt");
        fs::write(&file, "data").unwrap();
        let mut perms = fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&file, perms).unwrap();

        let report = wipe_and_recycle(&root, &policy(), &PermanentDelete, &NoProgress).unwrap();
        assert_eq!(report.files_deleted, 1);
        assert!(!root.exists());
    }

    #[test]
    fn file_path_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        let err = wipe_and_recycle(&file, &policy(), &PermanentDelete, &NoProgress).unwrap_err();
        assert!(matches!(err, WipeError::NotADirectory(_)));
        assert!(file.exists());
    }

    #[test]
    fn trash_inside_target_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("target");
        build_tree(&root);
        let trash = DirectoryTrash::new(root.join("a/trash")).unwrap();
        let err = wipe_and_recycle(&root, &policy(), &trash, &NoProgress).unwrap_err();
        assert!(matches!(err, WipeError::TrashInsideTarget { .. }));
        assert!(root.join("top.txt").exists());
    }

    #[test]
    fn fallback_skip_reports_failure() {
        struct Locked;
        impl Trash for Locked {
            fn send(&self, _path: &Path) -> io::Result<()> {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            }
        }

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("t");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("x"), "x").unwrap();

        let skip = RetryPolicy {
            fallback: Fallback::Skip,
            ..policy()
        };
        let report = wipe_and_recycle(&root, &skip, &Locked, &NoProgress).unwrap();
        assert_eq!(report.files_deleted, 0);
        assert!(report
            .failures
            .iter()
            .any(|f| f.stage == WipeStage::DeleteFile && f.message.contains("gave up")));
        assert!(root.join("temp_delete_file_1").exists());
    }

    #[test]
    fn fallback_remove_deletes_permanently() {
        struct Locked;
        impl Trash for Locked {
            fn send(&self, _path: &Path) -> io::Result<()> {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            }
        }

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("t");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/x"), "x").unwrap();

        let report = wipe_and_recycle(&root, &policy(), &Locked, &NoProgress).unwrap();
        assert_eq!(report.files_deleted, 1);
        assert_eq!(report.folders_deleted, 1);
        assert!(report.root_removed);
        assert!(!root.exists());
    }
}
