pub mod approvals;
pub mod catalog;
pub mod domain_events;
pub mod freezes;
pub mod memberships;
pub mod reversal_ledger;
