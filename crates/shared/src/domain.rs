use std::fmt;

use serde::{Deserialize, Serialize};

/// Filename reserved for the built-in fallback presentation. The item
/// carrying this name is always present, never removable, and sorted first.
pub const DEFAULT_PRESENTATION_NAME: &str = "default.pdf";

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(PresentationId);
id_newtype!(MeetingId);

/// Opaque error code reported by the upload transport. Closed enumeration;
/// the rendering layer owns the presentation strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadErrorCode {
    /// The server rejected the file as too large (HTTP 413 on the wire).
    PayloadTooLarge,
    TransportFailure,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionErrorCode {
    Timeout,
    UnsupportedDocument,
    PageLimitExceeded,
    Generic,
}

/// Intermediate phase reported by the conversion service while no page
/// counter is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatusCode {
    GeneratingThumbnail,
    GeneratedSlide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadState {
    pub done: bool,
    pub error: Option<UploadErrorCode>,
    /// Fraction in `0.0..=1.0`.
    pub progress: f64,
}

impl UploadState {
    pub fn pending() -> Self {
        Self {
            done: false,
            error: None,
            progress: 0.0,
        }
    }

    pub fn completed() -> Self {
        Self {
            done: true,
            error: None,
            progress: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionState {
    pub done: bool,
    pub error: Option<ConversionErrorCode>,
    pub pages_completed: u32,
    pub num_pages: u32,
    pub status: Option<ConversionStatusCode>,
}

impl ConversionState {
    pub fn pending() -> Self {
        Self {
            done: false,
            error: None,
            pages_completed: 0,
            num_pages: 0,
            status: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            done: true,
            ..Self::pending()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationItem {
    /// Equals `filename` until the server assigns an id during reconcile.
    pub id: PresentationId,
    pub filename: String,
    pub is_current: bool,
    pub upload: UploadState,
    pub conversion: ConversionState,
}

impl PresentationItem {
    /// A freshly accepted local file: upload not yet started, nothing
    /// converted, never current until the user says so.
    pub fn new_local(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            id: PresentationId::new(filename.clone()),
            filename,
            is_current: false,
            upload: UploadState::pending(),
            conversion: ConversionState::pending(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.filename == DEFAULT_PRESENTATION_NAME
    }

    /// Not yet reconciled against a server record.
    pub fn is_new(&self) -> bool {
        self.id.as_str() == self.filename
    }

    pub fn is_busy(&self) -> bool {
        !self.upload.done || !self.conversion.done
    }

    pub fn has_error(&self) -> bool {
        self.upload.error.is_some() || self.conversion.error.is_some()
    }
}
