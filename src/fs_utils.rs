//! Filesystem primitives used by the synchronization engine.
//!
//! Every operation here either completes, fails with an error, or reports an
//! explicit skip. Nothing partially applies silently. There is deliberately
//! no rollback: a failed tree copy leaves whatever was written so far, and
//! the failure is surfaced to the caller.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::{Error, Result};

/// Outcome of a [`copy_tree`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    /// Source missing or a path was unusable; nothing was touched.
    Skipped,
}

/// Which direction [`reconcile_newest`] actually copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    SrcToDst,
    DstToSrc,
    /// Neither file exists.
    Skipped,
}

/// Create `path` (and parents) if absent. Returns whether the directory
/// exists afterward. Idempotent.
pub fn ensure_dir(path: &Path) -> Result<bool> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(path.is_dir())
}

/// Names of the non-directory entries directly inside `dir`. Does not
/// recurse. Fails with [`Error::NotFound`] when `dir` does not exist.
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Err(Error::not_found(dir));
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Recursively copy `src` into `dst`, creating `dst` if needed and
/// overwriting existing files unconditionally.
///
/// Returns [`CopyOutcome::Skipped`] without touching anything when `src`
/// does not exist or either path is unusable.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<CopyOutcome> {
    if !is_valid_path(&[src]) || !is_valid_path(&[dst]) || !src.exists() {
        return Ok(CopyOutcome::Skipped);
    }

    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_tree(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(CopyOutcome::Copied)
}

/// Recursively delete everything under `path`, then `path` itself.
/// No-op when `path` does not exist.
pub fn remove_tree(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    fs::remove_dir_all(path)?;
    Ok(())
}

/// True iff joining the segments yields a non-empty string. A pre-flight
/// sanity check only, not an existence check.
pub fn is_valid_path(parts: &[&Path]) -> bool {
    let mut joined = std::path::PathBuf::new();
    for part in parts {
        joined.push(part);
    }
    !joined.as_os_str().is_empty()
}

/// Newest-wins synchronization of a single file pair.
///
/// If `dst` is absent (and `src` present), or `src`'s mtime is greater than
/// or equal to `dst`'s, copies `src` over `dst`, creating `dst`'s parent
/// directory first. Otherwise, if `dst` exists, copies `dst` over `src`.
/// Equal timestamps favor `src`; callers choose the winner of a tie by
/// argument order.
pub fn reconcile_newest(src: &Path, dst: &Path) -> Result<ReconcileOutcome> {
    let src_mtime = mtime_of(src)?;
    let dst_mtime = mtime_of(dst)?;

    match (src_mtime, dst_mtime) {
        (None, None) => Ok(ReconcileOutcome::Skipped),
        (Some(_), None) => {
            copy_file_creating_parent(src, dst)?;
            Ok(ReconcileOutcome::SrcToDst)
        }
        (None, Some(_)) => {
            copy_file_creating_parent(dst, src)?;
            Ok(ReconcileOutcome::DstToSrc)
        }
        (Some(s), Some(d)) => {
            if s >= d {
                copy_file_creating_parent(src, dst)?;
                Ok(ReconcileOutcome::SrcToDst)
            } else {
                copy_file_creating_parent(dst, src)?;
                Ok(ReconcileOutcome::DstToSrc)
            }
        }
    }
}

fn mtime_of(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.modified()?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Copy a single file, creating the destination's parent directory first.
pub fn copy_file_creating_parent(src: &Path, dst: &Path) -> Result<u64> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::copy(src, dst)?)
}

/// Total size in bytes of all files under `path`. Symlinks are not followed.
pub fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        } else if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, when: SystemTime) {
        let file = File::options().append(true).open(path).unwrap();
        file.set_times(fs::FileTimes::new().set_modified(when))
            .unwrap();
    }

    #[test]
    fn test_ensure_dir_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a/b/c");

        assert!(ensure_dir(&dir).unwrap());
        assert!(dir.is_dir());
        assert!(ensure_dir(&dir).unwrap());
    }

    #[test]
    fn test_list_files_skips_directories() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.json"), "{}").unwrap();
        fs::write(temp.path().join("b.json"), "{}").unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();

        let names = list_files(temp.path()).unwrap();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_list_files_missing_dir() {
        let temp = TempDir::new().unwrap();
        let err = list_files(&temp.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_copy_tree_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("f.txt"), "new").unwrap();
        fs::write(src.join("nested/g.txt"), "g").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("f.txt"), "old").unwrap();

        assert_eq!(copy_tree(&src, &dst).unwrap(), CopyOutcome::Copied);
        assert_eq!(fs::read_to_string(dst.join("f.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dst.join("nested/g.txt")).unwrap(), "g");
    }

    #[test]
    fn test_copy_tree_missing_source_is_skip() {
        let temp = TempDir::new().unwrap();
        let outcome = copy_tree(&temp.path().join("missing"), &temp.path().join("dst")).unwrap();
        assert_eq!(outcome, CopyOutcome::Skipped);
        assert!(!temp.path().join("dst").exists());
    }

    #[test]
    fn test_remove_tree_noop_when_absent() {
        let temp = TempDir::new().unwrap();
        remove_tree(&temp.path().join("nope")).unwrap();

        let dir = temp.path().join("full");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("sub/f"), "x").unwrap();
        remove_tree(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_is_valid_path() {
        assert!(is_valid_path(&[Path::new("a"), Path::new("b")]));
        assert!(!is_valid_path(&[Path::new(""), Path::new("")]));
        assert!(!is_valid_path(&[]));
        let owned = PathBuf::from("profiles");
        assert!(is_valid_path(&[&owned]));
    }

    #[test]
    fn test_reconcile_newer_source_wins() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("live.json");
        let dst = temp.path().join("stored.json");
        fs::write(&src, "newer").unwrap();
        fs::write(&dst, "older").unwrap();

        let earlier = SystemTime::now() - std::time::Duration::from_secs(60);
        set_mtime(&dst, earlier);

        assert_eq!(
            reconcile_newest(&src, &dst).unwrap(),
            ReconcileOutcome::SrcToDst
        );
        assert_eq!(fs::read_to_string(&dst).unwrap(), "newer");
    }

    #[test]
    fn test_reconcile_newer_destination_wins() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("live.json");
        let dst = temp.path().join("stored.json");
        fs::write(&src, "older").unwrap();
        fs::write(&dst, "newer").unwrap();

        let earlier = SystemTime::now() - std::time::Duration::from_secs(60);
        set_mtime(&src, earlier);

        assert_eq!(
            reconcile_newest(&src, &dst).unwrap(),
            ReconcileOutcome::DstToSrc
        );
        assert_eq!(fs::read_to_string(&src).unwrap(), "newer");
    }

    #[test]
    fn test_reconcile_tie_favors_source() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("live.json");
        let dst = temp.path().join("stored.json");
        fs::write(&src, "src").unwrap();
        fs::write(&dst, "dst").unwrap();

        let now = SystemTime::now();
        set_mtime(&src, now);
        set_mtime(&dst, now);

        assert_eq!(
            reconcile_newest(&src, &dst).unwrap(),
            ReconcileOutcome::SrcToDst
        );
        assert_eq!(fs::read_to_string(&dst).unwrap(), "src");
    }

    #[test]
    fn test_reconcile_missing_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("live.json");
        let dst = temp.path().join("deep/nested/stored.json");
        fs::write(&src, "content").unwrap();

        assert_eq!(
            reconcile_newest(&src, &dst).unwrap(),
            ReconcileOutcome::SrcToDst
        );
        assert_eq!(fs::read_to_string(&dst).unwrap(), "content");
    }

    #[test]
    fn test_reconcile_both_missing() {
        let temp = TempDir::new().unwrap();
        let outcome = reconcile_newest(&temp.path().join("a"), &temp.path().join("b")).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped);
    }

    #[test]
    fn test_dir_size() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "12345").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/b"), "123").unwrap();
        assert_eq!(dir_size(temp.path()).unwrap(), 8);
    }
}
