use mockall::automock;

use crate::domain::value_objects::domain_events::DomainEvent;

/// Fire-and-forget sink for committed changes. Publishing never fails the caller.
#[automock]
pub trait DomainEventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent);
}
