/// Buffered multipart forms
///
/// Upload endpoints read the whole form before acting on it so every check
/// (file counts, extensions, required text fields) runs before the first
/// byte is written to the upload directory. Memory use is bounded by the
/// router's body limit.

use crate::error::ApiResult;
use axum::extract::Multipart;
use modshare_shared::storage::{PendingUpload, UploadError};
use std::collections::HashMap;

/// A fully read multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<PendingUpload>>,
}

impl MultipartForm {
    /// Drains a multipart body
    ///
    /// Parts with a file name are files, everything else is text. A file
    /// part with an empty name and no content (an untouched file input) is
    /// ignored. For repeated text fields the first value wins.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await?;
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    form.files
                        .entry(name)
                        .or_default()
                        .push(PendingUpload::new(file_name, data));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.entry(name).or_insert(value);
                }
            }
        }

        Ok(form)
    }

    /// Text value of a field, if sent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed text value, `None` when missing or blank
    pub fn non_blank(&self, name: &str) -> Option<String> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Number of files sent under a field
    pub fn file_count(&self, name: &str) -> usize {
        self.files.get(name).map_or(0, Vec::len)
    }

    /// Rejects the form when a field carries more than `max` files
    pub fn ensure_max_files(&self, name: &str, max: usize) -> ApiResult<()> {
        if self.file_count(name) > max {
            return Err(UploadError::TooManyFiles {
                field: name.to_string(),
                max,
            }
            .into());
        }
        Ok(())
    }

    /// Files sent under a field, in arrival order
    pub fn files(&self, name: &str) -> &[PendingUpload] {
        self.files.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Checks every file's extension without storing anything
    pub fn ensure_allowed_types(&self) -> ApiResult<()> {
        for upload in self.files.values().flatten() {
            upload.kind()?;
        }
        Ok(())
    }
}
