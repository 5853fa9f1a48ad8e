use serde::Deserialize;
use shared::error::SetError;

use crate::FileHandle;

/// Per-session upload policy. Mirrors what the workflow host would pass in:
/// accepted size bounds and document types.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    pub file_size_min: u64,
    pub file_size_max: u64,
    /// Empty list accepts any type. A file without a reported mime type is
    /// accepted; the transport remains free to reject it later.
    pub valid_mime_types: Vec<String>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            file_size_min: 0,
            file_size_max: 50 * 1024 * 1024,
            valid_mime_types: vec![
                "application/pdf".to_string(),
                "application/vnd.ms-powerpoint".to_string(),
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
                    .to_string(),
                "application/vnd.oasis.opendocument.presentation".to_string(),
            ],
        }
    }
}

impl UploaderConfig {
    pub fn validate_file(&self, file: &FileHandle) -> Result<(), SetError> {
        if file.name.is_empty() {
            return Err(SetError::EmptyFilename);
        }
        if file.size_bytes > self.file_size_max {
            return Err(SetError::FileTooLarge {
                filename: file.name.clone(),
                max_bytes: self.file_size_max,
            });
        }
        if file.size_bytes < self.file_size_min {
            return Err(SetError::FileTooSmall {
                filename: file.name.clone(),
                min_bytes: self.file_size_min,
            });
        }
        if let Some(mime_type) = &file.mime_type {
            if !self.valid_mime_types.is_empty()
                && !self.valid_mime_types.contains(mime_type)
            {
                return Err(SetError::UnsupportedMimeType {
                    filename: file.name.clone(),
                    mime_type: mime_type.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(size_bytes: u64) -> FileHandle {
        FileHandle {
            name: "a.pdf".to_string(),
            size_bytes,
            mime_type: Some("application/pdf".to_string()),
        }
    }

    #[test]
    fn accepts_pdf_within_bounds() {
        let config = UploaderConfig::default();
        config.validate_file(&pdf(1024)).expect("valid");
    }

    #[test]
    fn rejects_oversized_file() {
        let config = UploaderConfig {
            file_size_max: 10,
            ..UploaderConfig::default()
        };
        let err = config.validate_file(&pdf(11)).expect_err("too large");
        assert!(matches!(err, SetError::FileTooLarge { .. }));
    }

    #[test]
    fn rejects_undersized_file() {
        let config = UploaderConfig {
            file_size_min: 100,
            ..UploaderConfig::default()
        };
        let err = config.validate_file(&pdf(10)).expect_err("too small");
        assert!(matches!(err, SetError::FileTooSmall { .. }));
    }

    #[test]
    fn rejects_unknown_mime_type() {
        let config = UploaderConfig::default();
        let file = FileHandle {
            name: "a.exe".to_string(),
            size_bytes: 10,
            mime_type: Some("application/octet-stream".to_string()),
        };
        let err = config.validate_file(&file).expect_err("bad type");
        assert!(matches!(err, SetError::UnsupportedMimeType { .. }));
    }

    #[test]
    fn accepts_file_without_reported_mime_type() {
        let config = UploaderConfig::default();
        let file = FileHandle {
            name: "a.pdf".to_string(),
            size_bytes: 10,
            mime_type: None,
        };
        config.validate_file(&file).expect("accepted");
    }
}
