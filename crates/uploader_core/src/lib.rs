use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{PresentationId, PresentationItem, UploadErrorCode},
    error::SetError,
    protocol::ReconcileSnapshot,
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

pub mod config;
pub mod set;
pub mod status;

pub use config::UploaderConfig;
pub use set::PresentationSet;
pub use status::{project_flags, project_status, DisplayStatus, ItemFlags};

const TRANSPORT_QUEUE_DEPTH: usize = 256;
const SESSION_EVENT_DEPTH: usize = 256;

/// A file accepted from the user, as handed to the upload transport.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHandle {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

/// Events the upload transport delivers back to the session, keyed by item
/// id. Late events for an id that was removed in the meantime are dropped
/// silently: the queue decouples the transport from the set, so there is no
/// stale closure left to fire.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Progress {
        item_id: PresentationId,
        loaded_bytes: u64,
        total_bytes: u64,
    },
    Failed {
        item_id: PresentationId,
        error: UploadErrorCode,
    },
}

/// Seam to the file transport. The session starts one upload per accepted
/// file and hands the transport the event queue sender; everything the
/// transport reports afterwards arrives asynchronously through that queue.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn start_upload(
        &self,
        item_id: PresentationId,
        file: FileHandle,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<()>;
}

pub struct MissingUploadTransport;

#[async_trait]
impl UploadTransport for MissingUploadTransport {
    async fn start_upload(
        &self,
        item_id: PresentationId,
        _file: FileHandle,
        _events: mpsc::Sender<TransportEvent>,
    ) -> Result<()> {
        Err(anyhow!("upload transport is unavailable for item {item_id}"))
    }
}

/// What the workflow host reads to gate its close and confirm actions.
/// Re-derived after every mutation, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkflowGate {
    pub prevent_closing: bool,
    pub disable_actions: bool,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SetChanged {
        items: Vec<PresentationItem>,
        gate: WorkflowGate,
    },
    Error(String),
}

struct SessionState {
    set: PresentationSet,
    /// Set by `confirm`, cleared by `dismiss`. While held, the gate stays
    /// locked regardless of busy state.
    confirmed: bool,
}

/// Serialization point for the presentation set: user gestures, transport
/// progress and server reconciliation all mutate the set through this one
/// session, one event at a time, in arrival order.
pub struct UploaderSession {
    config: UploaderConfig,
    transport: Arc<dyn UploadTransport>,
    inner: Mutex<SessionState>,
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl UploaderSession {
    pub fn new(config: UploaderConfig, transport: Arc<dyn UploadTransport>) -> Arc<Self> {
        Self::with_items(config, transport, Vec::new())
    }

    /// Builds a session seeded with the items already known for the meeting,
    /// typically the reserved default presentation plus previous uploads.
    pub fn with_items(
        config: UploaderConfig,
        transport: Arc<dyn UploadTransport>,
        items: Vec<PresentationItem>,
    ) -> Arc<Self> {
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_QUEUE_DEPTH);
        let (events, _) = broadcast::channel(SESSION_EVENT_DEPTH);
        Arc::new(Self {
            config,
            transport,
            inner: Mutex::new(SessionState {
                set: PresentationSet::with_items(items),
                confirmed: false,
            }),
            transport_tx,
            transport_rx: Mutex::new(Some(transport_rx)),
            events,
        })
    }

    /// Drains the transport queue onto the session for as long as any
    /// transport holds a sender. Call once after construction.
    pub async fn spawn_transport_task(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        let mut rx = self
            .transport_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("transport task already running"))?;
        let session = Arc::clone(self);
        Ok(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                session.apply_transport_event(event).await;
            }
        }))
    }

    async fn apply_transport_event(&self, event: TransportEvent) {
        let mut guard = self.inner.lock().await;
        match event {
            TransportEvent::Progress {
                item_id,
                loaded_bytes,
                total_bytes,
            } => guard
                .set
                .apply_upload_progress(&item_id, loaded_bytes, total_bytes),
            TransportEvent::Failed { item_id, error } => {
                warn!(item = %item_id, ?error, "upload transport reported failure");
                guard.set.apply_upload_error(&item_id, error);
            }
        }
        self.publish(&guard);
    }

    /// Accepts a batch of files: validates each against the session policy,
    /// appends the items, then starts one upload per item. A transport that
    /// fails to start is recorded as that item's upload error, not a hard
    /// failure; the item stays in the set and reports through its status.
    pub async fn add_files(&self, files: Vec<FileHandle>) -> Result<Vec<PresentationId>, SetError> {
        for file in &files {
            self.config.validate_file(file)?;
        }

        let mut guard = self.inner.lock().await;
        let ids = guard
            .set
            .add_files(files.iter().map(|file| file.name.clone()))?;

        for (id, file) in ids.iter().zip(files) {
            if let Err(err) = self
                .transport
                .start_upload(id.clone(), file, self.transport_tx.clone())
                .await
            {
                warn!(item = %id, "failed to start upload: {err}");
                guard
                    .set
                    .apply_upload_error(id, UploadErrorCode::TransportFailure);
                let _ = self.events.send(SessionEvent::Error(format!(
                    "failed to start upload for {id}: {err}"
                )));
            }
        }

        self.publish(&guard);
        Ok(ids)
    }

    pub async fn set_current(&self, id: &PresentationId) -> Result<(), SetError> {
        let mut guard = self.inner.lock().await;
        guard.set.set_current(id)?;
        self.publish(&guard);
        Ok(())
    }

    pub async fn remove(&self, id: &PresentationId) -> Result<(), SetError> {
        let mut guard = self.inner.lock().await;
        guard.set.remove(id)?;
        self.publish(&guard);
        Ok(())
    }

    /// Applies one delivery from the server reconciliation feed. Total: a
    /// malformed or unmatched record never prevents other items from being
    /// updated, so this cannot fail.
    pub async fn reconcile(&self, snapshot: &ReconcileSnapshot) {
        let mut guard = self.inner.lock().await;
        guard.set.reconcile(snapshot);
        self.publish(&guard);
    }

    /// Locks the workflow and hands back the item list verbatim for the host
    /// to persist. No other side effect.
    pub async fn confirm(&self) -> Vec<PresentationItem> {
        let mut guard = self.inner.lock().await;
        guard.confirmed = true;
        info!("presentation workflow confirmed");
        self.publish(&guard);
        guard.set.display_items()
    }

    /// Releases a confirm lock, e.g. when the host dialog is dismissed.
    pub async fn dismiss(&self) {
        let mut guard = self.inner.lock().await;
        guard.confirmed = false;
        self.publish(&guard);
    }

    pub async fn items(&self) -> Vec<PresentationItem> {
        self.inner.lock().await.set.display_items()
    }

    pub async fn gate(&self) -> WorkflowGate {
        let guard = self.inner.lock().await;
        Self::derive_gate(&guard)
    }

    pub async fn still_busy(&self) -> bool {
        self.inner.lock().await.set.still_busy()
    }

    /// Whether the host may offer the file drop target: no while an upload
    /// is unfinished or actions are disabled.
    pub async fn can_accept_files(&self) -> bool {
        let guard = self.inner.lock().await;
        let some_upload_unfinished = guard
            .set
            .items()
            .iter()
            .any(|item| !item.upload.done);
        !some_upload_unfinished && !Self::derive_gate(&guard).disable_actions
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn derive_gate(state: &SessionState) -> WorkflowGate {
        let locked = state.set.still_busy() || state.confirmed;
        WorkflowGate {
            prevent_closing: locked,
            disable_actions: locked,
        }
    }

    fn publish(&self, state: &SessionState) {
        let _ = self.events.send(SessionEvent::SetChanged {
            items: state.set.display_items(),
            gate: Self::derive_gate(state),
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
