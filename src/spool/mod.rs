//! Disk spool for bulk payloads that could not be delivered.
//!
//! Each failed payload is written to its own file. File names embed a
//! zero-padded creation timestamp and sequence number so sorting by name
//! yields creation order without touching file metadata:
//!
//! ```text
//! metrics-00001706659200123456-000000.metric
//! metrics-00001706659260123456-000001.metric
//! ```
//!
//! A spool directory must be owned by exactly one reporter; nothing in a file
//! name says which process wrote it.

use crate::core::{ReporterError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncWriteExt};

/// File name prefix of spooled payloads
pub const SPOOL_FILE_PREFIX: &str = "metrics-";

/// File name suffix of spooled payloads
pub const SPOOL_FILE_SUFFIX: &str = ".metric";

/// Suffix of a payload still being written
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Gives up after this many consecutive name collisions.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// A payload waiting on disk to be resent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpoolEntry {
    /// File name, also the entry's ordering key
    pub id: String,
    /// Full path of the file
    pub path: PathBuf,
}

/// FIFO of undelivered payloads backed by a directory.
#[derive(Debug)]
pub struct Spool {
    directory: PathBuf,
    sequence: AtomicU64,
}

impl Spool {
    /// Open a spool, creating the directory if needed.
    ///
    /// A directory that cannot be created is a configuration error; a
    /// reporter must not run without somewhere to hold failed payloads.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory).map_err(|e| {
            ReporterError::config(format!(
                "Unable to access or create directory [{}]: {}",
                directory.display(),
                e
            ))
        })?;

        if !directory.is_dir() {
            return Err(ReporterError::config(format!(
                "Spool path [{}] is not a directory",
                directory.display()
            )));
        }

        remove_partial_files(&directory);

        Ok(Self {
            directory,
            sequence: AtomicU64::new(0),
        })
    }

    /// Directory holding the spooled files
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write a payload to a new file and return its entry.
    ///
    /// The payload goes to a temporary file that only gets its final name
    /// once every byte is flushed and synced, so a failed or interrupted
    /// write never shows up in [`Spool::list_pending`].
    pub async fn persist(&self, payload: &str) -> Result<SpoolEntry> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let id = self.next_file_name();
            if let Some(entry) = self.write_entry(id, payload.as_bytes()).await? {
                tracing::debug!(file = %entry.id, bytes = payload.len(), "Spooled metrics payload");
                return Ok(entry);
            }
        }

        Err(ReporterError::spool(format!(
            "No free spool file name after {} attempts in {}",
            MAX_NAME_ATTEMPTS,
            self.directory.display()
        )))
    }

    /// Copy `source` into a new entry named `id`; `None` if the name is taken.
    async fn write_entry<R>(&self, id: String, mut source: R) -> Result<Option<SpoolEntry>>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.directory.join(&id);
        let temp_path = self.directory.join(format!("{}{}", id, TEMP_FILE_SUFFIX));

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => {
                return Err(ReporterError::spool(format!(
                    "Failed to create spool file {}: {}",
                    temp_path.display(),
                    e
                )))
            },
        };

        let written = async {
            tokio::io::copy(&mut source, &mut file).await?;
            // Background write errors only surface on flush
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&temp_path, &path).await
        }
        .await;

        match written {
            Ok(()) => Ok(Some(SpoolEntry { id, path })),
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                    tracing::warn!(
                        file = %temp_path.display(),
                        "Failed to remove partial spool file: {}",
                        cleanup
                    );
                }
                Err(ReporterError::spool(format!("Failed to write spool file {}: {}", id, e)))
            },
        }
    }

    /// All spooled payloads, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<SpoolEntry>> {
        let mut dir_entries = tokio::fs::read_dir(&self.directory).await.map_err(|e| {
            ReporterError::spool(format!(
                "Failed to read spool directory {}: {}",
                self.directory.display(),
                e
            ))
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = dir_entries
            .next_entry()
            .await
            .map_err(|e| ReporterError::spool(format!("Failed to read directory entry: {}", e)))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !(name.starts_with(SPOOL_FILE_PREFIX) && name.ends_with(SPOOL_FILE_SUFFIX)) {
                continue;
            }
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                entries.push(SpoolEntry {
                    path: entry.path(),
                    id: name,
                });
            }
        }

        entries.sort();
        Ok(entries)
    }

    /// Number of spooled payloads
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.list_pending().await?.len())
    }

    /// Read a spooled payload exactly as it was persisted.
    pub async fn read(&self, entry: &SpoolEntry) -> Result<String> {
        tokio::fs::read_to_string(&entry.path).await.map_err(|e| {
            ReporterError::spool(format!("Failed to read spool file {}: {}", entry.id, e))
        })
    }

    /// Delete a spooled payload.
    pub async fn remove(&self, entry: &SpoolEntry) -> Result<()> {
        tokio::fs::remove_file(&entry.path).await.map_err(|e| {
            ReporterError::spool(format!("Failed to delete spool file {}: {}", entry.id, e))
        })
    }

    fn next_file_name(&self) -> String {
        let micros = chrono::Utc::now().timestamp_micros().max(0);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) % 1_000_000;
        format!("{}{:020}-{:06}{}", SPOOL_FILE_PREFIX, micros, seq, SPOOL_FILE_SUFFIX)
    }
}

/// Drop temporary files left behind by a write that never completed.
fn remove_partial_files(directory: &Path) {
    let Ok(entries) = std::fs::read_dir(directory) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(SPOOL_FILE_PREFIX) && name.ends_with(TEMP_FILE_SUFFIX) {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => tracing::warn!(file = %name, "Removed partially written spool file"),
                Err(e) => tracing::warn!(file = %name, "Failed to remove partial spool file: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, ReadBuf};

    /// Source whose reads fail, standing in for a disk that fills up mid-write.
    struct FailingSource;

    impl AsyncRead for FailingSource {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(
                ErrorKind::Other,
                "No space left on device",
            )))
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("spool");

        let spool = Spool::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(spool.directory(), dir.as_path());
    }

    #[test]
    fn test_open_on_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("occupied");
        std::fs::write(&file, "x").unwrap();

        let err = Spool::open(&file).unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[tokio::test]
    async fn test_persist_and_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let spool = Spool::open(temp_dir.path()).unwrap();

        let payload = "{\"index\":{}}\n{\"count\":1}\n";
        let entry = spool.persist(payload).await.unwrap();

        assert!(entry.id.starts_with(SPOOL_FILE_PREFIX));
        assert!(entry.id.ends_with(SPOOL_FILE_SUFFIX));
        assert_eq!(spool.read(&entry).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_list_pending_is_creation_ordered() {
        let temp_dir = TempDir::new().unwrap();
        let spool = Spool::open(temp_dir.path()).unwrap();

        let mut created = Vec::new();
        for i in 0..5 {
            created.push(spool.persist(&format!("payload-{}", i)).await.unwrap());
        }
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let pending = spool.list_pending().await.unwrap();
        assert_eq!(pending, created);
        for (i, entry) in pending.iter().enumerate() {
            assert_eq!(spool.read(entry).await.unwrap(), format!("payload-{}", i));
        }
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let spool = Spool::open(temp_dir.path()).unwrap();

        let entry = spool.persist("payload").await.unwrap();
        assert_eq!(spool.pending_count().await.unwrap(), 1);

        spool.remove(&entry).await.unwrap();
        assert_eq!(spool.pending_count().await.unwrap(), 0);

        // Second delete fails but is only an error value
        assert!(spool.remove(&entry).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_nothing_pending() {
        let temp_dir = TempDir::new().unwrap();
        let spool = Spool::open(temp_dir.path()).unwrap();

        let source = (&b"{\"index\":{}}\n{\"cou"[..]).chain(FailingSource);
        let result = spool.write_entry(spool.next_file_name(), source).await;

        assert_eq!(result.unwrap_err().category(), "spool");
        assert!(spool.list_pending().await.unwrap().is_empty());
        assert!(file_names(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_taken_name_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let spool = Spool::open(temp_dir.path()).unwrap();

        let id = spool.next_file_name();
        std::fs::write(temp_dir.path().join(&id), "first").unwrap();

        let written = spool.write_entry(id.clone(), &b"second"[..]).await.unwrap();
        assert!(written.is_none());
        assert_eq!(std::fs::read_to_string(temp_dir.path().join(&id)).unwrap(), "first");
    }

    #[tokio::test]
    async fn test_open_removes_partial_files() {
        let temp_dir = TempDir::new().unwrap();
        let partial = format!(
            "{}00001706659200123456-000000{}{}",
            SPOOL_FILE_PREFIX, SPOOL_FILE_SUFFIX, TEMP_FILE_SUFFIX
        );
        std::fs::write(temp_dir.path().join(&partial), "{\"ind").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "kept").unwrap();

        let spool = Spool::open(temp_dir.path()).unwrap();

        assert_eq!(file_names(temp_dir.path()), vec!["notes.txt"]);
        assert!(spool.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_directories_are_not_pending() {
        let temp_dir = TempDir::new().unwrap();
        let spool = Spool::open(temp_dir.path()).unwrap();
        std::fs::create_dir(temp_dir.path().join(spool.next_file_name())).unwrap();

        let entry = spool.persist("payload").await.unwrap();
        assert_eq!(spool.list_pending().await.unwrap(), vec![entry]);
    }
}
