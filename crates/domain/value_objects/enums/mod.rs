pub mod approval_statuses;
pub mod approval_types;
pub mod freeze_statuses;
pub mod invoice_statuses;
pub mod member_statuses;
pub mod membership_statuses;
pub mod payment_methods;
pub mod payment_statuses;
pub mod reference_types;
