//! Make-style freshness checks for derived files.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;

fn modified(path: &Path) -> Result<SystemTime> {
    Ok(fs::metadata(path)?.modified()?)
}

/// Check whether every target exists and is newer than every dependency.
///
/// Returns `Ok(false)` if any target is missing (or `targets` is empty),
/// without looking at the dependencies. Otherwise the oldest target must be
/// strictly newer than the newest dependency. A missing dependency is an
/// I/O error. With no dependencies, existing targets are up to date.
pub fn is_up_to_date<T, D>(targets: &[T], dependencies: &[D]) -> Result<bool>
where
    T: AsRef<Path>,
    D: AsRef<Path>,
{
    if targets.is_empty() || !targets.iter().all(|t| t.as_ref().exists()) {
        return Ok(false);
    }

    let mut oldest_target = None;
    for target in targets {
        let time = modified(target.as_ref())?;
        oldest_target = Some(oldest_target.map_or(time, |t: SystemTime| t.min(time)));
    }

    let mut newest_dependency = None;
    for dependency in dependencies {
        let time = modified(dependency.as_ref())?;
        newest_dependency = Some(newest_dependency.map_or(time, |t: SystemTime| t.max(time)));
    }

    Ok(match (oldest_target, newest_dependency) {
        (Some(target), Some(dependency)) => target > dependency,
        _ => true,
    })
}

/// Create the parent directory of every target.
///
/// Directories that already exist, including ones created concurrently by
/// another process, are not an error.
pub fn prepare_dirs<T: AsRef<Path>>(targets: &[T]) -> Result<()> {
    for target in targets {
        if let Some(parent) = target.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::error::MeshError;

    fn touch(path: &Path, age_secs: u64) {
        fs::write(path, "").unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_newer_target_is_up_to_date() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let tgt = dir.path().join("tgt");
        touch(&src, 100);
        touch(&tgt, 10);

        assert!(is_up_to_date(&[&tgt], &[&src]).unwrap());
        assert!(!is_up_to_date(&[&src], &[&tgt]).unwrap());
    }

    #[test]
    fn test_oldest_target_decides() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let fresh = dir.path().join("fresh");
        let stale = dir.path().join("stale");
        touch(&src, 50);
        touch(&fresh, 10);
        touch(&stale, 100);

        assert!(!is_up_to_date(&[&fresh, &stale], &[&src]).unwrap());
    }

    #[test]
    fn test_missing_target() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        // Dependencies are not inspected when a target is missing
        assert!(!is_up_to_date(&[&missing], &[&missing]).unwrap());
        assert!(!is_up_to_date::<PathBuf, PathBuf>(&[], &[]).unwrap());
    }

    #[test]
    fn test_missing_dependency_is_error() {
        let dir = tempdir().unwrap();
        let tgt = dir.path().join("tgt");
        touch(&tgt, 0);

        let err = is_up_to_date(&[&tgt], &[dir.path().join("missing")]).unwrap_err();
        assert!(matches!(err, MeshError::Io(_)));
    }

    #[test]
    fn test_no_dependencies() {
        let dir = tempdir().unwrap();
        let tgt = dir.path().join("tgt");
        touch(&tgt, 0);
        assert!(is_up_to_date::<_, PathBuf>(&[&tgt], &[]).unwrap());
    }

    #[test]
    fn test_prepare_dirs() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a/b/lh.out.mgh");
        let b = dir.path().join("a/c/rh.out.mgh");

        prepare_dirs(&[&a, &b]).unwrap();
        prepare_dirs(&[&a]).unwrap();
        prepare_dirs(&["relative.mgh"]).unwrap();

        assert!(dir.path().join("a/b").is_dir());
        assert!(dir.path().join("a/c").is_dir());
    }
}
