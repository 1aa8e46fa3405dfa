//! Typed in-process publish/subscribe between dashboard modules.
//!
//! Delivery is fire-and-forget: an event published while nobody is subscribed is
//! dropped, and a subscriber that falls more than `capacity` events behind skips
//! the oldest ones.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::domain::project::{ColumnId, ProjectId};
use crate::domain::rfq::{RfqId, RfqStatus};

/// Calendar event details handed to the task list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTaskPayload {
    pub event_id: u64,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum AppEvent {
    AddEventTask(EventTaskPayload),
    OpenCreateRfqModal { category: Option<String> },
    OpenAddSupplierModal,
    OpenAddTaskModal,
    RfqSaved { id: RfqId, status: RfqStatus },
    ProjectMoved { id: ProjectId, from: ColumnId, to: ColumnId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    AddEventTask,
    OpenCreateRfqModal,
    OpenAddSupplierModal,
    OpenAddTaskModal,
    RfqSaved,
    ProjectMoved,
}

impl AppEvent {
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::AddEventTask(_) => EventTopic::AddEventTask,
            Self::OpenCreateRfqModal { .. } => EventTopic::OpenCreateRfqModal,
            Self::OpenAddSupplierModal => EventTopic::OpenAddSupplierModal,
            Self::OpenAddTaskModal => EventTopic::OpenAddTaskModal,
            Self::RfqSaved { .. } => EventTopic::RfqSaved,
            Self::ProjectMoved { .. } => EventTopic::ProjectMoved,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: AppEvent) -> usize {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(delivered) => {
                debug!(event_name = "bus.published", topic = ?topic, delivered, "event published");
                delivered
            }
            Err(_) => {
                debug!(event_name = "bus.dropped", topic = ?topic, "no subscribers, event dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription { receiver: self.sender.subscribe(), topics: None }
    }

    pub fn subscribe_to(&self, topics: impl IntoIterator<Item = EventTopic>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            topics: Some(topics.into_iter().collect()),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<AppEvent>,
    topics: Option<HashSet<EventTopic>>,
}

impl Subscription {
    fn wants(&self, event: &AppEvent) -> bool {
        self.topics.as_ref().map_or(true, |topics| topics.contains(&event.topic()))
    }

    /// Next already-published event, without waiting.
    pub fn try_next(&mut self) -> Option<AppEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(event_name = "bus.subscriber_lagged", skipped, "subscriber skipped events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Waits for the next matching event. `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<AppEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(event_name = "bus.subscriber_lagged", skipped, "subscriber skipped events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn drain(&mut self) -> Vec<AppEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{AppEvent, EventBus, EventTopic};
    use crate::domain::rfq::{RfqId, RfqStatus};

    #[test]
    fn publish_without_subscribers_is_silently_dropped() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(AppEvent::OpenAddSupplierModal), 0);

        let mut late = bus.subscribe();
        assert_eq!(late.try_next(), None, "late subscribers do not see dropped events");
    }

    #[test]
    fn every_subscriber_receives_each_event() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let delivered = bus.publish(AppEvent::RfqSaved { id: RfqId(9), status: RfqStatus::Draft });

        assert_eq!(delivered, 2);
        assert_eq!(first.drain().len(), 1);
        assert_eq!(second.drain().len(), 1);
    }

    #[test]
    fn topic_filter_skips_other_events() {
        let bus = EventBus::default();
        let mut modals = bus.subscribe_to([EventTopic::OpenCreateRfqModal]);

        bus.publish(AppEvent::OpenAddTaskModal);
        bus.publish(AppEvent::OpenCreateRfqModal { category: Some("Logistics".to_owned()) });

        let events = modals.drain();
        assert_eq!(
            events,
            vec![AppEvent::OpenCreateRfqModal { category: Some("Logistics".to_owned()) }]
        );
    }

    #[test]
    fn lagging_subscriber_keeps_newest_events() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe();

        for id in 1..=5 {
            bus.publish(AppEvent::RfqSaved { id: RfqId(id), status: RfqStatus::OnProcess });
        }

        let received = slow.drain();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1], AppEvent::RfqSaved { id: RfqId(5), status: RfqStatus::OnProcess });
    }

    #[tokio::test]
    async fn async_subscriber_waits_for_event() {
        let bus = EventBus::default();
        let mut subscription = bus.subscribe();
        let publisher = bus.clone();

        tokio::spawn(async move {
            publisher.publish(AppEvent::OpenAddTaskModal);
        });

        assert_eq!(subscription.next().await, Some(AppEvent::OpenAddTaskModal));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(AppEvent::OpenAddSupplierModal).expect("serialize");
        assert_eq!(json["type"], "open_add_supplier_modal");
    }
}
