pub mod approval_requests;
pub mod freeze_histories;
pub mod invoices;
pub mod memberships;
pub mod payments;
pub mod plans;
