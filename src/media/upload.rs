use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use axum::extract::Multipart;
use tempfile::NamedTempFile;

use crate::error::AppError;

/// An uploaded file staged on local disk. The temporary file is deleted on
/// drop, whether or not it was ever copied into media storage.
#[derive(Debug)]
pub struct StagedFile {
    pub file_name: Option<String>,
    temp: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Extension of the client's file name, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(self.file_name.as_deref()?)
            .extension()
            .and_then(|extension| extension.to_str())
    }

    pub fn len(&self) -> u64 {
        self.temp.as_file().metadata().map(|meta| meta.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Text fields and staged files of one multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, StagedFile>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart, staging_dir: &Path) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_none() {
                form.fields.insert(name, field.text().await?);
                continue;
            }

            let file_name = field.file_name().map(str::to_string);
            tracing::debug!(
                field = %name,
                content_type = ?field.content_type(),
                "Staging uploaded file"
            );
            let mut temp = tempfile::Builder::new()
                .prefix("upload-")
                .tempfile_in(staging_dir)
                .map_err(|err| AppError::internal(format!("Failed to stage upload: {err}")))?;

            while let Some(chunk) = field.chunk().await? {
                temp.write_all(&chunk)
                    .map_err(|err| AppError::internal(format!("Failed to stage upload: {err}")))?;
            }

            let staged = StagedFile {
                file_name,
                temp,
            };
            // Empty file inputs count as absent.
            if !staged.is_empty() {
                form.files.insert(name, staged);
            }
        }

        Ok(form)
    }

    /// Trimmed value of a text field; blank counts as missing.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}
