use shared::{
    domain::{PresentationId, PresentationItem, UploadErrorCode},
    error::SetError,
    protocol::ReconcileSnapshot,
};
use tracing::{debug, info};

/// The authoritative in-memory list of presentation items for one editing
/// session. Single-writer: the session serializes every mutation, so the set
/// itself carries no locking.
///
/// Mutations rebuild the item vector instead of patching entries by index, so
/// a removal can never alias a concurrent positional update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationSet {
    items: Vec<PresentationItem>,
}

impl PresentationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the set with the items already known for the meeting, typically
    /// the reserved default presentation plus previous uploads.
    pub fn with_items(items: Vec<PresentationItem>) -> Self {
        let mut set = Self { items };
        set.normalize_current();
        set
    }

    pub fn items(&self) -> &[PresentationItem] {
        &self.items
    }

    /// Items in display order: the reserved default presentation first,
    /// everything else in insertion order.
    pub fn display_items(&self) -> Vec<PresentationItem> {
        let mut ordered = self.items.clone();
        ordered.sort_by_key(|item| !item.is_default());
        ordered
    }

    pub fn get(&self, id: &PresentationId) -> Option<&PresentationItem> {
        self.items.iter().find(|item| item.id == *id)
    }

    pub fn current(&self) -> Option<&PresentationItem> {
        self.items.iter().find(|item| item.is_current)
    }

    pub fn default_item(&self) -> Option<&PresentationItem> {
        self.items.iter().find(|item| item.is_default())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True while any item has an unfinished upload or conversion. The
    /// workflow gate is re-derived from this after every mutation.
    pub fn still_busy(&self) -> bool {
        self.items.iter().any(PresentationItem::is_busy)
    }

    /// Appends one new item per filename. Existing items are never mutated.
    /// The whole batch is validated before anything is appended; a duplicate
    /// filename, in the set or within the batch, rejects the batch.
    pub fn add_files<I>(&mut self, filenames: I) -> Result<Vec<PresentationId>, SetError>
    where
        I: IntoIterator<Item = String>,
    {
        let filenames: Vec<String> = filenames.into_iter().collect();
        for (index, filename) in filenames.iter().enumerate() {
            if filename.is_empty() {
                return Err(SetError::EmptyFilename);
            }
            let collides_with_set = self.items.iter().any(|item| item.filename == *filename);
            let collides_within_batch = filenames[..index].contains(filename);
            if collides_with_set || collides_within_batch {
                return Err(SetError::DuplicateName(filename.clone()));
            }
        }

        let mut ids = Vec::with_capacity(filenames.len());
        for filename in filenames {
            let item = PresentationItem::new_local(filename);
            info!(filename = %item.filename, "presentation added to set");
            ids.push(item.id.clone());
            self.items.push(item);
        }
        self.normalize_current();
        Ok(ids)
    }

    /// Atomically moves currency to `id`. Already-current is a no-op, not an
    /// error.
    pub fn set_current(&mut self, id: &PresentationId) -> Result<(), SetError> {
        let target = self
            .get(id)
            .ok_or_else(|| SetError::NotFound(id.clone()))?;
        if target.is_current {
            return Ok(());
        }

        self.items = self
            .items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                item.is_current = item.id == *id;
                item
            })
            .collect();
        info!(item = %id, "current presentation changed");
        Ok(())
    }

    /// Removes `id` from the set. The reserved default presentation is never
    /// removable. When the target is current, currency is handed to the
    /// default item before the removal commits, so the set never observes
    /// zero current items.
    pub fn remove(&mut self, id: &PresentationId) -> Result<(), SetError> {
        let target = self
            .get(id)
            .ok_or_else(|| SetError::NotFound(id.clone()))?;
        if target.is_default() {
            return Err(SetError::RemoveDefault);
        }

        if target.is_current {
            if let Some(default_id) = self.default_item().map(|item| item.id.clone()) {
                self.set_current(&default_id)?;
            }
        }

        self.items = self
            .items
            .iter()
            .filter(|item| item.id != *id)
            .cloned()
            .collect();
        self.normalize_current();
        info!(item = %id, "presentation removed from set");
        Ok(())
    }

    /// Applies one progress event from the upload transport. Non-computable
    /// lengths (`total_bytes == 0`) and ids that no longer exist (late events
    /// for removed items) are dropped silently.
    pub fn apply_upload_progress(&mut self, id: &PresentationId, loaded_bytes: u64, total_bytes: u64) {
        if total_bytes == 0 {
            debug!(item = %id, "upload progress with non-computable length dropped");
            return;
        }
        if !self.update_item(id, |item| {
            item.upload.progress = loaded_bytes as f64 / total_bytes as f64;
            item.upload.done = loaded_bytes == total_bytes;
        }) {
            debug!(item = %id, "upload progress for removed item dropped");
        }
    }

    /// Records a terminal transport error on the item. Does not mark the
    /// upload done; the status projection decides what the user sees.
    pub fn apply_upload_error(&mut self, id: &PresentationId, error: UploadErrorCode) {
        if !self.update_item(id, |item| {
            item.upload.error = Some(error);
        }) {
            debug!(item = %id, "upload error for removed item dropped");
        }
    }

    /// Merges a server snapshot into the set, matching records to local items
    /// by filename. The local upload state is preserved verbatim; the server
    /// wins for the assigned id, the conversion state and currency. Local
    /// items without a matching record are kept untouched (they may simply
    /// not have reached the server yet), and records without a local item
    /// never abort the pass. Applying the same snapshot twice is a no-op.
    pub fn reconcile(&mut self, snapshot: &ReconcileSnapshot) {
        self.items = self
            .items
            .iter()
            .map(|item| {
                // Last record wins if a filename transiently appears twice.
                let record = snapshot
                    .records
                    .iter()
                    .rev()
                    .find(|record| record.filename == item.filename);
                match record {
                    Some(record) => {
                        let mut merged = item.clone();
                        merged.id = record.id.clone();
                        merged.is_current = record.is_current;
                        merged.conversion = record.conversion.clone();
                        merged
                    }
                    None => {
                        debug!(
                            filename = %item.filename,
                            "no server record for local item; keeping as-is"
                        );
                        item.clone()
                    }
                }
            })
            .collect();
        self.normalize_current();
    }

    fn update_item(
        &mut self,
        id: &PresentationId,
        apply: impl FnOnce(&mut PresentationItem),
    ) -> bool {
        let Some(position) = self.items.iter().position(|item| item.id == *id) else {
            return false;
        };
        let mut items = self.items.clone();
        apply(&mut items[position]);
        self.items = items;
        true
    }

    /// Restores the exactly-one-current invariant after a mutation. With no
    /// current item the default presentation is promoted (or the first item
    /// when no default exists); with several, the first in display order
    /// wins.
    fn normalize_current(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let current_count = self.items.iter().filter(|item| item.is_current).count();
        if current_count == 1 {
            return;
        }

        let winner = if current_count == 0 {
            self.default_item()
                .or_else(|| self.items.first())
                .map(|item| item.id.clone())
        } else {
            self.display_items()
                .into_iter()
                .find(|item| item.is_current)
                .map(|item| item.id)
        };

        if let Some(winner) = winner {
            self.items = self
                .items
                .iter()
                .map(|item| {
                    let mut item = item.clone();
                    item.is_current = item.id == winner;
                    item
                })
                .collect();
        }
    }
}
