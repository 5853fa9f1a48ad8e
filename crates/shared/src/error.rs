use thiserror::Error;

use crate::domain::PresentationId;

/// Hard failures returned by set-mutating operations. Upload and conversion
/// errors are not represented here: they are data on the item, surfaced
/// through status projection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetError {
    #[error("no presentation with id {0}")]
    NotFound(PresentationId),
    #[error("the default presentation cannot be removed")]
    RemoveDefault,
    #[error("a presentation named {0:?} is already in the set")]
    DuplicateName(String),
    #[error("presentation filename must not be empty")]
    EmptyFilename,
    #[error("file {filename:?} is larger than the allowed {max_bytes} bytes")]
    FileTooLarge { filename: String, max_bytes: u64 },
    #[error("file {filename:?} is smaller than the required {min_bytes} bytes")]
    FileTooSmall { filename: String, min_bytes: u64 },
    #[error("file {filename:?} has unsupported mime type {mime_type:?}")]
    UnsupportedMimeType { filename: String, mime_type: String },
}
