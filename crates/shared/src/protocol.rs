use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ConversionState, PresentationId};

/// Server-side view of one presentation, as delivered by the reconciliation
/// feed. Matched against local items by `filename`, never by id: a local
/// item keeps its filename as id until the server assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerPresentationRecord {
    pub id: PresentationId,
    pub filename: String,
    pub is_current: bool,
    pub conversion: ConversionState,
}

/// One delivery from the reconciliation feed: the authoritative list of
/// records currently known server-side. Absence of a filename is legal (a
/// local item may not have propagated yet) and never drops the local item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSnapshot {
    pub records: Vec<ServerPresentationRecord>,
    pub reported_at: DateTime<Utc>,
}

impl ReconcileSnapshot {
    pub fn new(records: Vec<ServerPresentationRecord>) -> Self {
        Self {
            records,
            reported_at: Utc::now(),
        }
    }
}
