pub mod approval_gateway;
pub mod cancellations;
pub mod errors;
pub mod membership_freezes;
pub mod memberships;
pub mod reconciliation;

#[cfg(test)]
mod fixtures;
