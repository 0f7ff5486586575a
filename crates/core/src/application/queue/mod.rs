// Scan Queue - ordered, append-mostly store of queue items

pub mod aggregator;

pub use aggregator::StatusCounts;

use crate::domain::{DecodedPayload, QueueItem, ScanItemId, ScanStatus};
use std::collections::HashMap;

/// Items in enqueue order, indexed by id for in-place status updates
#[derive(Debug, Default)]
pub struct ScanQueue {
    items: Vec<QueueItem>,
    index: HashMap<ScanItemId, usize>,
}

impl ScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pending item and return its id
    pub fn enqueue(&mut self, payload: DecodedPayload, enqueued_at: i64) -> ScanItemId {
        let base = QueueItem::derive_id(&payload.identifier, enqueued_at);
        let mut id = base.clone();
        let mut n = 1;
        while self.index.contains_key(&id) {
            id = format!("{}-{}", base, n);
            n += 1;
        }

        self.index.insert(id.clone(), self.items.len());
        self.items.push(QueueItem::new(id.clone(), enqueued_at, payload));
        id
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&QueueItem> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut QueueItem> {
        match self.index.get(id) {
            Some(&i) => self.items.get_mut(i),
            None => None,
        }
    }

    /// Ids of pending items, FIFO
    pub fn pending_ids(&self) -> Vec<ScanItemId> {
        self.items
            .iter()
            .filter(|item| item.status == ScanStatus::Pending)
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.items.iter().any(|item| item.status == ScanStatus::Pending)
    }

    /// Remove every item regardless of status, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        self.index.clear();
        dropped
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::from_items(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
