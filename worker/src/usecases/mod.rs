pub mod membership_sweep;
