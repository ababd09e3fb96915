//! Batches handed from the buffer to a segment writer.

use logspool_codec::Record;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// An immutable batch of records on its way to disk.
///
/// Two saves are equal only if they are the same save: identity is a
/// random id, never the records they carry.
#[derive(Debug, Clone)]
pub struct PendingSave {
    id: Uuid,
    records: Arc<[Record]>,
}

impl PendingSave {
    /// Packages `records` under a fresh identity.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            id: Uuid::new_v4(),
            records: records.into(),
        }
    }

    /// Returns the save's identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the records in the save.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the save carries no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PartialEq for PendingSave {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PendingSave {}

impl Hash for PendingSave {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
