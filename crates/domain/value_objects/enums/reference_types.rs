use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// What an approval envelope or ledger row points at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    FreezeHistory,
    Member,
    Membership,
    MembershipRefund,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::FreezeHistory => "freeze_history",
            ReferenceType::Member => "member",
            ReferenceType::Membership => "membership",
            ReferenceType::MembershipRefund => "membership_refund",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "freeze_history" => Some(ReferenceType::FreezeHistory),
            "member" => Some(ReferenceType::Member),
            "membership" => Some(ReferenceType::Membership),
            "membership_refund" => Some(ReferenceType::MembershipRefund),
            _ => None,
        }
    }
}

impl Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
