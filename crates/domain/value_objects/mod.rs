pub mod approvals;
pub mod cancellations;
pub mod domain_events;
pub mod enums;
pub mod freezes;
pub mod membership_transitions;
pub mod memberships;
pub mod reversals;
