//! Legal moves for `memberships.status`.
//!
//! | From      | Transition       | To        |
//! |-----------|------------------|-----------|
//! | pending   | activate         | active    |
//! | active    | apply_freeze     | frozen    |
//! | frozen    | resume           | active    |
//! | active    | cancel           | cancelled |
//! | frozen    | cancel           | cancelled |
//! | active    | expire           | expired   |
//!
//! `cancelled` and `expired` accept nothing.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::membership_statuses::MembershipStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTransition {
    Activate,
    ApplyFreeze,
    ResumeFromFreeze,
    Cancel,
    Expire,
}

impl MembershipTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipTransition::Activate => "activate",
            MembershipTransition::ApplyFreeze => "apply_freeze",
            MembershipTransition::ResumeFromFreeze => "resume_from_freeze",
            MembershipTransition::Cancel => "cancel",
            MembershipTransition::Expire => "expire",
        }
    }
}

impl Display for MembershipTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transition `{transition}` is not allowed from status `{from}`")]
pub struct InvalidTransition {
    pub from: MembershipStatus,
    pub transition: MembershipTransition,
}

impl MembershipStatus {
    pub fn transition(
        self,
        transition: MembershipTransition,
    ) -> Result<MembershipStatus, InvalidTransition> {
        use MembershipStatus::*;
        use MembershipTransition::*;

        let next = match (self, transition) {
            (Pending, Activate) => Active,
            (Active, ApplyFreeze) => Frozen,
            (Frozen, ResumeFromFreeze) => Active,
            (Active | Frozen, Cancel) => Cancelled,
            (Active, Expire) => Expired,
            _ => {
                return Err(InvalidTransition {
                    from: self,
                    transition,
                });
            }
        };

        Ok(next)
    }

    pub fn can(self, transition: MembershipTransition) -> bool {
        self.transition(transition).is_ok()
    }

    pub fn allowed_transitions(self) -> &'static [MembershipTransition] {
        match self {
            MembershipStatus::Pending => &[MembershipTransition::Activate],
            MembershipStatus::Active => &[
                MembershipTransition::ApplyFreeze,
                MembershipTransition::Cancel,
                MembershipTransition::Expire,
            ],
            MembershipStatus::Frozen => &[
                MembershipTransition::ResumeFromFreeze,
                MembershipTransition::Cancel,
            ],
            MembershipStatus::Expired | MembershipStatus::Cancelled => &[],
        }
    }
}
