//! Upload candidates: a file the caller wants transferred, before validation.
//!
//! A candidate carries the display name, byte size and MIME type used by the
//! validator, plus the [`Source`] the transfer client reads bytes from.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/x-hwp",
    "text/plain",
];

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "hwp", "txt"];

/// Coarse classification of a payload, used for allow-lists and previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeKind {
    Image,
    Document,
    Unknown,
}

impl MimeKind {
    /// Image if the MIME type is a known image type; document if the MIME type
    /// or the file extension is a known document type; otherwise unknown.
    pub fn classify(name: &str, mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();
        if IMAGE_TYPES.contains(&mime.as_str()) {
            return MimeKind::Image;
        }
        let doc_ext = extension(name)
            .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);
        if DOCUMENT_TYPES.contains(&mime.as_str()) || doc_ext {
            return MimeKind::Document;
        }
        MimeKind::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MimeKind::Image => "image",
            MimeKind::Document => "document",
            MimeKind::Unknown => "unknown",
        }
    }
}

/// Where the bytes of a candidate live.
#[derive(Debug, Clone)]
pub enum Source {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// An in-memory payload (shared, never copied by the orchestrator).
    Memory(Arc<[u8]>),
}

/// A file offered for upload.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub source: Source,
}

impl Candidate {
    /// Builds a candidate from an in-memory payload.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        let data: Arc<[u8]> = data.into();
        Self {
            name: name.into(),
            size_bytes: data.len() as u64,
            mime_type: mime_type.into(),
            source: Source::Memory(data),
        }
    }

    /// Builds a candidate from a local file. The MIME type is guessed from the
    /// file extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("stat {}", path.display()))?;
        if !meta.is_file() {
            anyhow::bail!("not a regular file: {}", path.display());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", path.display()))?;
        let mime_type = guess_mime_type(&name).to_string();
        Ok(Self {
            name,
            size_bytes: meta.len(),
            mime_type,
            source: Source::Path(path),
        })
    }

    pub fn kind(&self) -> MimeKind {
        MimeKind::classify(&self.name, &self.mime_type)
    }

    /// Lowercased extension without the dot, if the name has one.
    pub fn extension(&self) -> Option<String> {
        extension(&self.name)
    }
}

fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type for a file name, from its extension. Falls back to
/// `application/octet-stream`.
pub fn guess_mime_type(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("hwp") => "application/x-hwp",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Human-readable size, e.g. `"1.5 MB"`. Two decimals at most, base 1024.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
