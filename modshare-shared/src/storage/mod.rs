/// File intake and the managed upload directory
///
/// All uploaded assets (module archives, module images, profile pictures)
/// live flat in one managed directory and are referenced from the database by
/// a reference path of the form `/uploads/<stored name>`.
///
/// # Rules
///
/// - Accepted extensions: `.zip`, `.png`, `.jpg`, `.jpeg`, case-insensitive.
///   The check looks at the client-supplied file name only; the declared
///   content type is ignored and the bytes are not sniffed. This is advisory,
///   not a content guarantee.
/// - Stored names are `<unix millis>-<8 hex>-<sanitized original name>`.
/// - Files are written to a temporary name and renamed into place, so a
///   failed write never leaves a half-written asset under its final name.
/// - Reference paths are validated as strings before any filesystem access:
///   [`UploadStore::resolve_reference`] only accepts `/uploads/` followed by a
///   single plain file name.
///
/// # Example
///
/// ```no_run
/// use modshare_shared::storage::{PendingUpload, UploadStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = UploadStore::new("./uploads");
/// store.ensure_root().await?;
///
/// let upload = PendingUpload::new("d.zip", bytes::Bytes::from_static(b"PK\x03\x04"));
/// let stored = store.store(&upload).await?;
/// assert!(stored.reference.starts_with("/uploads/"));
///
/// let path = store.resolve_reference(&stored.reference)?;
/// assert!(path.starts_with("./uploads"));
/// # Ok(())
/// # }
/// ```

use bytes::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// URL prefix under which stored files are referenced and served
pub const REFERENCE_PREFIX: &str = "/uploads/";

/// Extensions accepted by file intake (lowercase, without the dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &["zip", "png", "jpg", "jpeg"];

const MAX_STORED_ORIGINAL_LEN: usize = 100;

/// Error type for file intake and download resolution
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Extension not on the allowlist
    #[error("Only .zip, .png, .jpg, .jpeg files are allowed (got {0:?})")]
    UnsupportedType(String),

    /// More files in one field than allowed
    #[error("Too many files for field '{field}' (max {max})")]
    TooManyFiles { field: String, max: usize },

    /// Stored reference does not resolve inside the managed directory
    #[error("Invalid file path")]
    InvalidPath,

    /// Reference is valid but the file is gone
    #[error("File not found on server")]
    FileMissing,

    /// Filesystem failure
    #[error("Upload storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad category of an accepted file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.zip`
    Archive,

    /// `.png`, `.jpg`, `.jpeg`
    Image,
}

impl FileKind {
    /// MIME type used when serving a file of this kind
    pub fn content_type(&self, extension: &str) -> &'static str {
        match (self, extension) {
            (FileKind::Archive, _) => "application/zip",
            (FileKind::Image, "png") => "image/png",
            (FileKind::Image, _) => "image/jpeg",
        }
    }
}

/// Lowercased extension of a file name, if any
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Classifies a client file name against the extension allowlist
///
/// # Example
///
/// ```
/// use modshare_shared::storage::{classify, FileKind};
///
/// assert_eq!(classify("Dungeon.ZIP").unwrap(), FileKind::Archive);
/// assert_eq!(classify("shot.jpeg").unwrap(), FileKind::Image);
/// assert!(classify("payload.exe").is_err());
/// assert!(classify("no_extension").is_err());
/// ```
pub fn classify(file_name: &str) -> Result<FileKind, UploadError> {
    match extension_of(file_name).as_deref() {
        Some("zip") => Ok(FileKind::Archive),
        Some("png") | Some("jpg") | Some("jpeg") => Ok(FileKind::Image),
        _ => Err(UploadError::UnsupportedType(file_name.to_string())),
    }
}

/// Reduces a client file name to a safe single path component
///
/// Directory parts are dropped, anything outside `[A-Za-z0-9._-]` becomes
/// `_`, leading dots are stripped, and the result is capped in length while
/// keeping the extension.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.len() > MAX_STORED_ORIGINAL_LEN {
        let ext = extension_of(&cleaned).unwrap_or_default();
        let keep = MAX_STORED_ORIGINAL_LEN.saturating_sub(ext.len() + 1);
        cleaned.truncate(keep);
        if !ext.is_empty() {
            cleaned.push('.');
            cleaned.push_str(&ext);
        }
    }

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// A file received from a client but not yet stored
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// File name as sent by the client
    pub original_name: String,

    /// File contents
    pub data: Bytes,
}

impl PendingUpload {
    pub fn new(original_name: impl Into<String>, data: Bytes) -> Self {
        Self {
            original_name: original_name.into(),
            data,
        }
    }

    /// Validates the extension without storing anything
    pub fn kind(&self) -> Result<FileKind, UploadError> {
        classify(&self.original_name)
    }
}

/// A file written to the managed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name inside the managed directory
    pub stored_name: String,

    /// Reference path persisted in the database (`/uploads/<stored_name>`)
    pub reference: String,

    /// Absolute or root-relative location on disk
    pub path: PathBuf,

    /// Size in bytes
    pub size: u64,
}

/// The managed upload directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the managed directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the managed directory if it does not exist
    pub async fn ensure_root(&self) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Builds a collision-resistant stored name for a client file name
    pub fn stored_name_for(original_name: &str) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &nonce[..8],
            sanitize_file_name(original_name)
        )
    }

    /// Validates and writes one upload into the managed directory
    pub async fn store(&self, upload: &PendingUpload) -> Result<StoredFile, UploadError> {
        upload.kind()?;

        let stored_name = Self::stored_name_for(&upload.original_name);
        let final_path = self.root.join(&stored_name);
        let temp_path = self.root.join(format!(".{}.part", stored_name));

        if let Err(e) = tokio::fs::write(&temp_path, &upload.data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(
            stored_name = %stored_name,
            size = upload.data.len(),
            "Stored upload"
        );

        Ok(StoredFile {
            reference: format!("{}{}", REFERENCE_PREFIX, stored_name),
            stored_name,
            path: final_path,
            size: upload.data.len() as u64,
        })
    }

    /// Removes stored files, logging instead of failing
    ///
    /// Used to roll back files whose database rows were never committed.
    pub async fn discard(&self, files: &[StoredFile]) {
        for file in files {
            if let Err(e) = tokio::fs::remove_file(&file.path).await {
                warn!(stored_name = %file.stored_name, error = %e, "Failed to discard stored upload");
            }
        }
    }

    /// Maps a stored reference path to a location inside the managed directory
    ///
    /// Pure string validation; the filesystem is not consulted. Rejects
    /// anything but `/uploads/<name>` where `<name>` is one plain component
    /// (no separators, no `..`, not hidden, no NUL).
    pub fn resolve_reference(&self, reference: &str) -> Result<PathBuf, UploadError> {
        let name = reference
            .strip_prefix(REFERENCE_PREFIX)
            .ok_or(UploadError::InvalidPath)?;

        let is_plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0', ':']);

        if !is_plain {
            return Err(UploadError::InvalidPath);
        }

        Ok(self.root.join(name))
    }

    /// Resolves a reference and checks the file exists
    pub async fn locate(&self, reference: &str) -> Result<PathBuf, UploadError> {
        let path = self.resolve_reference(reference)?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(UploadError::FileMissing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::FileMissing),
            Err(e) => Err(e.into()),
        }
    }
}
