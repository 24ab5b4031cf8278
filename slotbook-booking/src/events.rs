use chrono::{DateTime, NaiveDate, Utc};
use slotbook_shared::{SlotChange, SlotChangedEvent};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Fan-out of slot changes to live availability streams.
///
/// Purely advisory: a dropped or lagging subscriber never affects a write.
#[derive(Clone)]
pub struct SlotEvents {
    tx: broadcast::Sender<SlotChangedEvent>,
}

impl SlotEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SlotChangedEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, tier_id: Uuid, date: NaiveDate, change: SlotChange, at: DateTime<Utc>) {
        // Err only means nobody is listening
        let _ = self.tx.send(SlotChangedEvent::new(tier_id, date, change, at.timestamp()));
    }
}

impl Default for SlotEvents {
    fn default() -> Self {
        Self::new(100)
    }
}
