use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::domain::{
    repositories::domain_events::DomainEventPublisher,
    value_objects::domain_events::DomainEvent,
};

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// In-process fan-out of committed domain events. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl DomainEventPublisher for BroadcastEventBus {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event = name, receivers, "event_bus: published"),
            // no subscribers is a normal state, not a failure
            Err(_) => debug!(event = name, "event_bus: published with no subscribers"),
        }
    }
}

/// Logs every event on the bus until the bus is dropped.
pub fn spawn_event_logger(bus: &BroadcastEventBus) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    info!(event = event.name(), %payload, "event_bus: domain event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event_bus: logger lagged behind, events skipped");
                }
                Err(RecvError::Closed) => {
                    debug!("event_bus: closed, logger stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn every_subscriber_receives_event() {
        let bus = BroadcastEventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let membership_id = Uuid::new_v4();

        bus.publish(DomainEvent::MembershipExpired { membership_id });

        assert_eq!(
            first.recv().await.unwrap(),
            DomainEvent::MembershipExpired { membership_id }
        );
        assert_eq!(
            second.recv().await.unwrap(),
            DomainEvent::MembershipExpired { membership_id }
        );
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let bus = BroadcastEventBus::default();
        bus.publish(DomainEvent::MembershipExpired {
            membership_id: Uuid::new_v4(),
        });
    }

    #[tokio::test]
    async fn logger_stops_when_bus_is_dropped() {
        let bus = BroadcastEventBus::new(4);
        let handle = spawn_event_logger(&bus);
        bus.publish(DomainEvent::MembershipExpired {
            membership_id: Uuid::new_v4(),
        });
        drop(bus);
        handle.await.unwrap();
    }
}
