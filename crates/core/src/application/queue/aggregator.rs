// Status Aggregator - per-status counts for display

use crate::domain::{QueueItem, ScanStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub success: usize,
    pub error: usize,
}

impl StatusCounts {
    /// Full rescan of the queue (sizes are tens to low hundreds per session)
    pub fn from_items(items: &[QueueItem]) -> Self {
        items.iter().fold(Self::default(), |mut counts, item| {
            match item.status {
                ScanStatus::Pending => counts.pending += 1,
                ScanStatus::Processing => counts.processing += 1,
                ScanStatus::Success => counts.success += 1,
                ScanStatus::Error => counts.error += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.success + self.error
    }

    pub fn get(&self, status: ScanStatus) -> usize {
        match status {
            ScanStatus::Pending => self.pending,
            ScanStatus::Processing => self.processing,
            ScanStatus::Success => self.success,
            ScanStatus::Error => self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{decode, Attendee, ScanOutcome};

    fn item(identifier: &str, at: i64) -> QueueItem {
        QueueItem::new(format!("{}-{}", identifier, at), at, decode(identifier))
    }

    #[test]
    fn test_empty_queue() {
        let counts = StatusCounts::from_items(&[]);
        assert_eq!(counts, StatusCounts::default());
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_counts_each_status() {
        let mut done = item("A", 1);
        done.start().unwrap();
        done.finish(&ScanOutcome::Recorded(Attendee {
            name: "A".into(),
            chapter: "North".into(),
        }))
        .unwrap();

        let mut failed = item("B", 2);
        failed.start().unwrap();
        failed.finish(&ScanOutcome::NotFound).unwrap();

        let mut running = item("C", 3);
        running.start().unwrap();

        let items = vec![done, failed, running, item("D", 4), item("E", 5)];
        let counts = StatusCounts::from_items(&items);

        assert_eq!(counts.success, 1);
        assert_eq!(counts.error, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.get(ScanStatus::Pending), 2);
    }
}
