// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media directory pruning.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use herald_core::HeraldError;
use tracing::{debug, warn};

/// Deletes files under `root` last modified before `cutoff`, walking
/// subdirectories. Returns the number of files removed.
///
/// A missing directory is not an error. Directories themselves are kept.
pub async fn prune_media_dir(root: &Path, cutoff: SystemTime) -> Result<u64, HeraldError> {
    let mut removed = 0u64;
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "media directory does not exist");
                continue;
            }
            Err(e) => return Err(io_error(&dir, e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable media entry");
                    continue;
                }
            };

            if metadata.is_dir() {
                pending.push(path);
                continue;
            }

            let modified = metadata.modified().map_err(|e| io_error(&path, e))?;
            if modified >= cutoff {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "removed expired media file");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path, e)),
            }
        }
    }

    Ok(removed)
}

fn io_error(path: &Path, e: io::Error) -> HeraldError {
    HeraldError::Storage {
        source: format!("media sweep failed at {}: {e}", path.display()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;

    fn backdate(path: &Path, age: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn removes_only_files_older_than_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("t1");
        fs::create_dir_all(&nested).unwrap();

        let old_top = dir.path().join("old.jpg");
        let old_nested = nested.join("old.pdf");
        let fresh = nested.join("fresh.png");
        for p in [&old_top, &old_nested, &fresh] {
            fs::write(p, b"data").unwrap();
        }
        let forty_days = Duration::from_secs(40 * 24 * 3600);
        backdate(&old_top, forty_days);
        backdate(&old_nested, forty_days);

        let cutoff = SystemTime::now() - Duration::from_secs(30 * 24 * 3600);
        let removed = prune_media_dir(dir.path(), cutoff).await.unwrap();

        assert_eq!(removed, 2);
        assert!(!old_top.exists());
        assert!(!old_nested.exists());
        assert!(fresh.exists());
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let removed = prune_media_dir(&dir.path().join("nope"), SystemTime::now())
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }
}
