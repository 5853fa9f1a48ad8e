use shared::domain::{
    ConversionErrorCode, ConversionStatusCode, PresentationItem, UploadErrorCode,
};

/// Single display status derived from an item's upload and conversion
/// sub-states. The rendering layer maps each variant to user-facing text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayStatus {
    /// Accepted locally, upload not started.
    PendingUpload,
    Uploading { progress: f64 },
    UploadFailed(UploadErrorCode),
    ConversionFailed(ConversionErrorCode),
    ConvertingPage { current: u32, total: u32 },
    /// Converting with no meaningful page counter; the optional code names
    /// the phase the conversion service last reported.
    Converting(Option<ConversionStatusCode>),
    /// Both upload and conversion complete; no status text is shown.
    Ready,
}

/// Projects one item to its display status, first match wins. An upload
/// error is terminal and checked before any conversion state, so an item
/// carrying both errors reports the upload failure.
pub fn project_status(item: &PresentationItem) -> DisplayStatus {
    let upload = &item.upload;
    let conversion = &item.conversion;

    if !upload.done && upload.progress == 0.0 {
        return DisplayStatus::PendingUpload;
    }
    if !upload.done && upload.error.is_none() {
        return DisplayStatus::Uploading {
            progress: upload.progress,
        };
    }
    if upload.done {
        if let Some(code) = upload.error {
            return DisplayStatus::UploadFailed(code);
        }
    }
    if !conversion.done {
        if let Some(code) = conversion.error {
            return DisplayStatus::ConversionFailed(code);
        }
        if conversion.pages_completed < conversion.num_pages {
            return DisplayStatus::ConvertingPage {
                current: conversion.pages_completed,
                total: conversion.num_pages,
            };
        }
        return DisplayStatus::Converting(conversion.status);
    }
    DisplayStatus::Ready
}

/// UI-affecting flags per item, consumed by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemFlags {
    /// Not yet assigned a server id.
    pub is_new: bool,
    pub is_busy: bool,
    pub has_error: bool,
    /// Upload visibly in flight while conversion is outstanding.
    pub is_animated_progress: bool,
    /// The current item with a completed upload and the reserved default
    /// presentation must not offer a remove action.
    pub is_removable: bool,
}

pub fn project_flags(item: &PresentationItem) -> ItemFlags {
    ItemFlags {
        is_new: item.is_new(),
        is_busy: item.is_busy(),
        has_error: item.has_error(),
        is_animated_progress: !item.conversion.done
            && !item.upload.done
            && item.upload.progress > 0.0,
        is_removable: !(item.is_current && item.upload.done) && !item.is_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{ConversionState, UploadState, DEFAULT_PRESENTATION_NAME};

    fn item() -> PresentationItem {
        PresentationItem::new_local("a.pdf")
    }

    #[test]
    fn pending_before_any_progress() {
        assert_eq!(project_status(&item()), DisplayStatus::PendingUpload);
    }

    #[test]
    fn uploading_while_in_progress_without_error() {
        let mut item = item();
        item.upload.progress = 0.3;
        assert_eq!(
            project_status(&item),
            DisplayStatus::Uploading { progress: 0.3 }
        );
    }

    #[test]
    fn upload_failure_is_terminal() {
        let mut item = item();
        item.upload = UploadState {
            done: true,
            error: Some(UploadErrorCode::PayloadTooLarge),
            progress: 1.0,
        };
        assert_eq!(
            project_status(&item),
            DisplayStatus::UploadFailed(UploadErrorCode::PayloadTooLarge)
        );
    }

    #[test]
    fn upload_error_wins_over_conversion_error() {
        let mut item = item();
        item.upload = UploadState {
            done: true,
            error: Some(UploadErrorCode::TransportFailure),
            progress: 1.0,
        };
        item.conversion.error = Some(ConversionErrorCode::Generic);

        assert_eq!(
            project_status(&item),
            DisplayStatus::UploadFailed(UploadErrorCode::TransportFailure)
        );
    }

    #[test]
    fn conversion_failure_after_successful_upload() {
        let mut item = item();
        item.upload = UploadState::completed();
        item.conversion.error = Some(ConversionErrorCode::UnsupportedDocument);

        assert_eq!(
            project_status(&item),
            DisplayStatus::ConversionFailed(ConversionErrorCode::UnsupportedDocument)
        );
    }

    #[test]
    fn converting_reports_page_counter_until_pages_complete() {
        let mut item = item();
        item.upload = UploadState::completed();
        item.conversion.pages_completed = 3;
        item.conversion.num_pages = 10;

        assert_eq!(
            project_status(&item),
            DisplayStatus::ConvertingPage {
                current: 3,
                total: 10
            }
        );
    }

    #[test]
    fn converting_falls_back_to_phase_code_when_pages_complete() {
        let mut item = item();
        item.upload = UploadState::completed();
        item.conversion.pages_completed = 10;
        item.conversion.num_pages = 10;
        item.conversion.status = Some(ConversionStatusCode::GeneratingThumbnail);

        assert_eq!(
            project_status(&item),
            DisplayStatus::Converting(Some(ConversionStatusCode::GeneratingThumbnail))
        );
    }

    #[test]
    fn ready_when_both_phases_complete() {
        let mut item = item();
        item.upload = UploadState::completed();
        item.conversion = ConversionState::completed();

        assert_eq!(project_status(&item), DisplayStatus::Ready);
    }

    #[test]
    fn animated_progress_only_while_upload_moves() {
        let mut item = item();
        assert!(!project_flags(&item).is_animated_progress);

        item.upload.progress = 0.4;
        assert!(project_flags(&item).is_animated_progress);

        item.upload = UploadState::completed();
        assert!(!project_flags(&item).is_animated_progress);
    }

    #[test]
    fn current_item_with_completed_upload_is_not_removable() {
        let mut item = item();
        item.is_current = true;
        assert!(project_flags(&item).is_removable);

        item.upload = UploadState::completed();
        assert!(!project_flags(&item).is_removable);
    }

    #[test]
    fn default_item_is_never_removable() {
        let item = PresentationItem::new_local(DEFAULT_PRESENTATION_NAME);
        assert!(!project_flags(&item).is_removable);
    }

    #[test]
    fn new_flag_clears_once_server_assigns_an_id() {
        let mut item = item();
        assert!(project_flags(&item).is_new);

        item.id = shared::domain::PresentationId::new("srv-17");
        assert!(!project_flags(&item).is_new);
    }
}
