//! Periodic removal of old uploaded templates and generated decks.

use log::{debug, warn};
use slidegen_core::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Which directories to sweep and how old a file must be to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPolicy {
    pub directories: Vec<PathBuf>,
    pub max_age: Duration,
    /// Files left alone whatever their age.
    pub keep: Vec<PathBuf>,
}

impl CleanupPolicy {
    /// Upload and output directories, with the configured maximum age.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            directories: config.cleanup_dirs(),
            max_age: config.max_file_age(),
            keep: Vec::new(),
        }
    }

    /// Exclude a file from the sweep.
    pub fn keeping(mut self, path: impl Into<PathBuf>) -> Self {
        self.keep.push(path.into());
        self
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files looked at.
    pub scanned: usize,
    /// Files deleted.
    pub removed: usize,
    /// Entries or directories that could not be handled.
    pub failed: usize,
}

/// Delete regular files older than the policy allows.
///
/// Missing directories and kept files are skipped. Failures are logged and
/// counted, never returned, so a sweep cannot break the caller.
pub fn sweep(policy: &CleanupPolicy, now: SystemTime) -> SweepReport {
    let keep: Vec<PathBuf> = policy
        .keep
        .iter()
        .filter_map(|p| fs::canonicalize(p).ok())
        .collect();

    let mut report = SweepReport::default();
    for dir in &policy.directories {
        sweep_dir(dir, policy.max_age, now, &keep, &mut report);
    }
    debug!(
        "cleanup: scanned {}, removed {}, failed {}",
        report.scanned, report.removed, report.failed
    );
    report
}

fn sweep_dir(
    dir: &Path,
    max_age: Duration,
    now: SystemTime,
    keep: &[PathBuf],
    report: &mut SweepReport,
) {
    if !dir.exists() {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cleanup: cannot read {}: {}", dir.display(), e);
            report.failed += 1;
            return;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!("cleanup: cannot list {}: {}", dir.display(), e);
                report.failed += 1;
                continue;
            }
        };
        if fs::canonicalize(&path).is_ok_and(|p| keep.contains(&p)) {
            debug!("cleanup: keeping {}", path.display());
            continue;
        }

        match remove_if_expired(&path, max_age, now) {
            Ok(None) => {}
            Ok(Some(removed)) => {
                report.scanned += 1;
                if removed {
                    debug!("cleanup: removed {}", path.display());
                    report.removed += 1;
                }
            }
            Err(e) => {
                warn!("cleanup: cannot remove {}: {}", path.display(), e);
                report.scanned += 1;
                report.failed += 1;
            }
        }
    }
}

/// `None` for anything that is not a regular file, otherwise whether it was
/// deleted.
fn remove_if_expired(path: &Path, max_age: Duration, now: SystemTime) -> std::io::Result<Option<bool>> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_file() {
        return Ok(None);
    }

    let age = now
        .duration_since(metadata.modified()?)
        .unwrap_or(Duration::ZERO);
    if age <= max_age {
        return Ok(Some(false));
    }

    fs::remove_file(path)?;
    Ok(Some(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn policy(dirs: &[&Path]) -> CleanupPolicy {
        CleanupPolicy {
            directories: dirs.iter().map(|d| d.to_path_buf()).collect(),
            max_age: HOUR,
            keep: Vec::new(),
        }
    }

    #[test]
    fn test_recent_files_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fresh.pptx"), b"x").unwrap();

        let report = sweep(&policy(&[dir.path()]), SystemTime::now());
        assert_eq!(report, SweepReport { scanned: 1, removed: 0, failed: 0 });
        assert!(dir.path().join("fresh.pptx").exists());
    }

    #[test]
    fn test_old_files_removed() {
        let uploads = tempfile::tempdir().unwrap();
        let generated = tempfile::tempdir().unwrap();
        fs::write(uploads.path().join("template.potx"), b"x").unwrap();
        fs::write(generated.path().join("a.pptx"), b"x").unwrap();
        fs::write(generated.path().join("b.pptx"), b"x").unwrap();
        fs::create_dir(generated.path().join("nested")).unwrap();

        let later = SystemTime::now() + 2 * HOUR;
        let policy = policy(&[uploads.path(), generated.path()]);
        let report = sweep(&policy, later);

        assert_eq!(report, SweepReport { scanned: 3, removed: 3, failed: 0 });
        assert!(generated.path().join("nested").is_dir());

        // Nothing left to do the second time.
        let report = sweep(&policy, later);
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_kept_file_survives() {
        let uploads = tempfile::tempdir().unwrap();
        let template = uploads.path().join("theme.pptx");
        fs::write(&template, b"x").unwrap();
        fs::write(uploads.path().join("stale.pptx"), b"x").unwrap();

        // Same file through a different spelling of the path.
        let policy = policy(&[uploads.path()])
            .keeping(uploads.path().join(".").join("theme.pptx"));
        let report = sweep(&policy, SystemTime::now() + 2 * HOUR);

        assert_eq!(report, SweepReport { scanned: 1, removed: 1, failed: 0 });
        assert!(template.exists());
        assert!(!uploads.path().join("stale.pptx").exists());
    }

    #[test]
    fn test_missing_directory_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let report = sweep(&policy(&[&missing]), SystemTime::now());
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_policy_from_config() {
        let config = AppConfig::default();
        let policy = CleanupPolicy::from_config(&config);
        assert_eq!(
            policy.directories,
            vec![PathBuf::from("uploads"), PathBuf::from("generated")]
        );
        assert_eq!(policy.max_age, HOUR);
        assert!(policy.keep.is_empty());
    }
}
