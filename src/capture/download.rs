//! Persisting encoded captures.

use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Blob, Error, ImageFormat, Result};

/// Subject used in filenames when none is configured.
pub const DEFAULT_SUBJECT: &str = "dm";

/// Saves an encoded capture under a filename.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, blob: &Blob, filename: &str) -> Result<()>;
}

/// Writes captures into a directory.
///
/// Data goes to a hidden `.{name}.part` file first and is renamed into
/// place once complete, so a reader never sees a partial image.
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path for `filename` inside the target directory.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !filename.contains(['/', '\\']) => {
                Ok(self.dir.join(name))
            }
            _ => Err(Error::Other(format!("invalid download filename '{}'", filename))),
        }
    }
}

/// Removes the transient file unless it was committed.
struct PartFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[async_trait]
impl Downloader for DirectoryDownloader {
    async fn download(&self, blob: &Blob, filename: &str) -> Result<()> {
        let target = self.path_for(filename)?;
        if blob.is_empty() {
            return Err(Error::Other("nothing to download".into()));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Other(format!("{}: {}", self.dir.display(), e)))?;

        let mut part = PartFile {
            path: self.dir.join(format!(".{}.part", filename)),
            committed: false,
        };
        tokio::fs::write(&part.path, &blob.bytes)
            .await
            .map_err(|e| Error::Other(format!("{}: {}", part.path.display(), e)))?;
        tokio::fs::rename(&part.path, &target)
            .await
            .map_err(|e| Error::Other(format!("{}: {}", target.display(), e)))?;
        part.committed = true;

        log::info!("saved {} ({} bytes)", target.display(), blob.len());
        Ok(())
    }
}

/// Keeps downloads in memory, for embedding hosts that take the bytes
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryDownloader {
    files: Mutex<Vec<(String, Blob)>>,
}

impl MemoryDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Downloaded `(filename, blob)` pairs in order.
    pub fn files(&self) -> Vec<(String, Blob)> {
        match self.files.lock() {
            Ok(files) => files.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Downloader for MemoryDownloader {
    async fn download(&self, blob: &Blob, filename: &str) -> Result<()> {
        self.files
            .lock()
            .map_err(|_| Error::Other("download list poisoned".into()))?
            .push((filename.to_string(), blob.clone()));
        Ok(())
    }
}

/// Filename for a capture taken now.
pub fn screenshot_filename(subject: Option<&str>, format: ImageFormat) -> String {
    screenshot_filename_at(subject, format, Utc::now())
}

/// `{subject}-dm-screenshot-{YYYY-MM-DDTHH-MM-SS}.{ext}` with the UTC time
/// of `at`.
pub fn screenshot_filename_at(subject: Option<&str>, format: ImageFormat, at: DateTime<Utc>) -> String {
    format!(
        "{}-dm-screenshot-{}.{}",
        sanitize_subject(subject),
        at.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}

fn sanitize_subject(subject: Option<&str>) -> String {
    let cleaned: String = subject
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        DEFAULT_SUBJECT.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filename_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            screenshot_filename_at(Some("instagram"), ImageFormat::Png, at),
            "instagram-dm-screenshot-2024-03-09T07-05-01.png"
        );
        assert_eq!(
            screenshot_filename_at(None, ImageFormat::Jpeg, at),
            "dm-dm-screenshot-2024-03-09T07-05-01.jpeg"
        );
        assert_eq!(
            screenshot_filename_at(Some(" Jane Doe/../x "), ImageFormat::Webp, at),
            "Jane-Doex-dm-screenshot-2024-03-09T07-05-01.webp"
        );
    }

    #[test]
    fn rejects_paths() {
        let d = DirectoryDownloader::new("/tmp/out");
        assert!(d.path_for("a.png").is_ok());
        assert!(d.path_for("../a.png").is_err());
        assert!(d.path_for("sub/a.png").is_err());
        assert!(d.path_for("..").is_err());
        assert!(d.path_for("").is_err());
    }

    #[tokio::test]
    async fn writes_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let d = DirectoryDownloader::new(dir.path().join("shots"));
        let blob = Blob::new("image/png", vec![1, 2, 3]);
        d.download(&blob, "x.png").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(d.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["x.png".to_string()]);
        assert_eq!(std::fs::read(d.dir().join("x.png")).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failed_rename_removes_part_file() {
        let dir = tempfile::tempdir().unwrap();
        // a directory in the way makes the rename fail
        std::fs::create_dir(dir.path().join("taken.png")).unwrap();
        std::fs::write(dir.path().join("taken.png").join("keep"), b"k").unwrap();
        let d = DirectoryDownloader::new(dir.path());
        let blob = Blob::new("image/png", vec![9]);
        assert!(d.download(&blob, "taken.png").await.is_err());
        assert!(!dir.path().join(".taken.png.part").exists());
    }

    #[tokio::test]
    async fn memory_downloader_collects() {
        let d = MemoryDownloader::new();
        d.download(&Blob::new("image/png", vec![1]), "a.png").await.unwrap();
        assert_eq!(d.files().len(), 1);
        assert_eq!(d.files()[0].0, "a.png");
    }
}
