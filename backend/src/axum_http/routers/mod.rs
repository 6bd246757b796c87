pub mod approvals;
pub mod memberships;
pub mod reversals;
