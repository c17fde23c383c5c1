//! Task-owned local resources (image previews).
//!
//! A task may own one [`ResourceHandle`]; the orchestrator releases it when
//! the task is removed. Release failures are logged by the caller and never
//! block removal.

use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::candidate::{Candidate, MimeKind, Source};

/// A local resource owned by exactly one task.
pub trait ResourceHandle: Send + Sync + fmt::Debug {
    /// Where consumers can find the resource (e.g. a file path).
    fn locator(&self) -> String;

    /// Frees the resource. Called once, when the owning task is removed.
    fn release(self: Box<Self>) -> Result<()>;
}

/// Creates the resource a new task should own, if any.
pub trait PreviewProvider: Send + Sync {
    fn create(&self, candidate: &Candidate) -> Result<Option<Box<dyn ResourceHandle>>>;
}

/// Writes image payloads to temporary files under a preview directory.
#[derive(Debug, Clone)]
pub struct TempFilePreviews {
    dir: PathBuf,
}

impl TempFilePreviews {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create preview dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PreviewProvider for TempFilePreviews {
    fn create(&self, candidate: &Candidate) -> Result<Option<Box<dyn ResourceHandle>>> {
        if candidate.kind() != MimeKind::Image {
            return Ok(None);
        }
        let suffix = candidate
            .extension()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("preview-")
            .suffix(&suffix)
            .tempfile_in(&self.dir)
            .context("create preview file")?;
        match &candidate.source {
            Source::Memory(data) => file.write_all(data).context("write preview")?,
            Source::Path(path) => {
                let mut src = std::fs::File::open(path)
                    .with_context(|| format!("open {}", path.display()))?;
                std::io::copy(&mut src, file.as_file_mut()).context("copy preview")?;
            }
        }
        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), name = %candidate.name, "created preview");
        Ok(Some(Box::new(TempPreview { path })))
    }
}

/// Preview file deleted on release (or on drop, if release is never reached).
#[derive(Debug)]
struct TempPreview {
    path: tempfile::TempPath,
}

impl ResourceHandle for TempPreview {
    fn locator(&self) -> String {
        self.path.display().to_string()
    }

    fn release(self: Box<Self>) -> Result<()> {
        let shown = self.path.display().to_string();
        self.path
            .close()
            .with_context(|| format!("delete preview {shown}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_gets_preview_file_and_release_deletes_it() {
        let dir = tempfile::tempdir().unwrap();
        let previews = TempFilePreviews::new(dir.path().join("previews")).unwrap();
        let c = Candidate::from_bytes("cat.png", "image/png", vec![9; 64]);
        let handle = previews.create(&c).unwrap().expect("image preview");
        let path = PathBuf::from(handle.locator());
        assert!(path.starts_with(previews.dir()));
        assert!(path.to_string_lossy().ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![9; 64]);

        handle.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn non_images_get_no_preview() {
        let dir = tempfile::tempdir().unwrap();
        let previews = TempFilePreviews::new(dir.path()).unwrap();
        let c = Candidate::from_bytes("doc.pdf", "application/pdf", vec![1; 8]);
        assert!(previews.create(&c).unwrap().is_none());
    }

    #[test]
    fn preview_copied_from_path_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photo.jpg");
        std::fs::write(&src, b"jpegdata").unwrap();
        let previews = TempFilePreviews::new(dir.path().join("p")).unwrap();
        let c = Candidate {
            name: "photo.jpg".into(),
            size_bytes: 8,
            mime_type: "image/jpeg".into(),
            source: Source::Path(src),
        };
        let handle = previews.create(&c).unwrap().unwrap();
        assert_eq!(std::fs::read(handle.locator()).unwrap(), b"jpegdata");
        handle.release().unwrap();
    }
}
