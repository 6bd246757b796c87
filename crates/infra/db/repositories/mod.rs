pub mod approvals;
pub mod catalog;
pub mod freezes;
pub mod memberships;
pub mod reversal_ledger;
