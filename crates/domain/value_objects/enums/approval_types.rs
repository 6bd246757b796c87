use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    Freeze,
    Transfer,
    Refund,
    Discount,
    Complimentary,
    TrainerChange,
}

impl ApprovalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalType::Freeze => "freeze",
            ApprovalType::Transfer => "transfer",
            ApprovalType::Refund => "refund",
            ApprovalType::Discount => "discount",
            ApprovalType::Complimentary => "complimentary",
            ApprovalType::TrainerChange => "trainer_change",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "freeze" => Some(ApprovalType::Freeze),
            "transfer" => Some(ApprovalType::Transfer),
            "refund" => Some(ApprovalType::Refund),
            "discount" => Some(ApprovalType::Discount),
            "complimentary" => Some(ApprovalType::Complimentary),
            "trainer_change" => Some(ApprovalType::TrainerChange),
            _ => None,
        }
    }
}

impl Display for ApprovalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
