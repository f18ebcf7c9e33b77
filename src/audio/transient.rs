//! Per-message transient audio files.
//!
//! Each voice message gets one `.ogg` / `.wav` pair named
//! `{user_id}-{request_id}`, so two messages from the same sender never
//! share a path.  [`TransientFiles::cleanup`] consumes the pair, which makes
//! a second cleanup impossible; dropping the pair without cleaning up (a
//! panic or a cancelled task) removes the files synchronously instead.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct TransientFiles {
    source: PathBuf,
    converted: PathBuf,
    cleaned: bool,
}

impl TransientFiles {
    pub fn new(work_dir: &Path, user_id: u64, request_id: &str) -> Self {
        let stem = format!("{user_id}-{request_id}");
        Self {
            source: work_dir.join(format!("{stem}.ogg")),
            converted: work_dir.join(format!("{stem}.wav")),
            cleaned: false,
        }
    }

    /// Downloaded voice note.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Converter output.
    pub fn converted(&self) -> &Path {
        &self.converted
    }

    /// Remove both files, returning how many existed.  Missing files are not
    /// an error; other failures are logged.
    pub async fn cleanup(mut self) -> usize {
        self.cleaned = true;
        let mut removed = 0;
        for path in [&self.source, &self.converted] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => log::warn!("cleanup: could not remove {}: {e}", path.display()),
            }
        }
        removed
    }
}

impl Drop for TransientFiles {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        for path in [&self.source, &self.converted] {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn names_combine_user_and_request() {
        let files = TransientFiles::new(Path::new("/tmp/work"), 42, "abc");
        assert_eq!(files.source(), Path::new("/tmp/work/42-abc.ogg"));
        assert_eq!(files.converted(), Path::new("/tmp/work/42-abc.wav"));
    }

    #[test]
    fn same_user_different_requests_do_not_collide() {
        let a = TransientFiles::new(Path::new("."), 7, "one");
        let b = TransientFiles::new(Path::new("."), 7, "two");
        assert_ne!(a.source(), b.source());
        assert_ne!(a.converted(), b.converted());
    }

    #[tokio::test]
    async fn cleanup_removes_existing_files() {
        let dir = tempdir().unwrap();
        let files = TransientFiles::new(dir.path(), 1, "r");
        std::fs::write(files.source(), b"ogg").unwrap();
        std::fs::write(files.converted(), b"wav").unwrap();
        let (source, converted) = (files.source().to_owned(), files.converted().to_owned());

        assert_eq!(files.cleanup().await, 2);
        assert!(!source.exists());
        assert!(!converted.exists());
    }

    #[tokio::test]
    async fn cleanup_tolerates_missing_files() {
        let dir = tempdir().unwrap();
        let files = TransientFiles::new(dir.path(), 1, "r");
        std::fs::write(files.source(), b"ogg").unwrap();

        assert_eq!(files.cleanup().await, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_without_cleanup_removes_files() {
        let dir = tempdir().unwrap();
        let files = TransientFiles::new(dir.path(), 1, "r");
        std::fs::write(files.source(), b"ogg").unwrap();
        std::fs::write(files.converted(), b"wav").unwrap();

        drop(files);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
