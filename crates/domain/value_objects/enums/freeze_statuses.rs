use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FreezeStatus {
    Pending,
    Approved,
    Rejected,
}

impl FreezeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreezeStatus::Pending => "pending",
            FreezeStatus::Approved => "approved",
            FreezeStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(FreezeStatus::Pending),
            "approved" => Some(FreezeStatus::Approved),
            "rejected" => Some(FreezeStatus::Rejected),
            _ => None,
        }
    }

    /// Pending and approved windows both hold a claim on the plan's freeze allowance.
    pub fn reserves_allowance(&self) -> bool {
        matches!(self, FreezeStatus::Pending | FreezeStatus::Approved)
    }
}

impl Display for FreezeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
