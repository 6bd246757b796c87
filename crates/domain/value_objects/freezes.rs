use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::freeze_statuses::FreezeStatus;

/// Number of calendar days in `[start, end]`. Zero or negative when `end < start`.
pub fn inclusive_day_count(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreezeAllowance {
    pub max_freeze_days: i32,
    /// `memberships.total_freeze_days_used`, refreshed on resume.
    pub used_days: i32,
    /// Sum of `days_frozen` over pending and approved windows.
    pub reserved_days: i32,
}

impl FreezeAllowance {
    /// Windows approved since the last resume are not in `used_days` yet, so the
    /// larger of the two claims wins.
    pub fn remaining(&self) -> i32 {
        (self.max_freeze_days - self.used_days.max(self.reserved_days)).max(0)
    }
}

/// Sums the days held by windows that still claim allowance.
pub fn reserved_days<I>(windows: I) -> i32
where
    I: IntoIterator<Item = (FreezeStatus, i32)>,
{
    windows
        .into_iter()
        .filter(|(status, _)| status.reserves_allowance())
        .map(|(_, days)| days)
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeQuote {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_frozen: i32,
    /// Flat branch fee, never prorated.
    pub fee_minor: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FreezeRejection {
    #[error("freeze window {start} to {end} covers no days")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("freeze of {requested} days exceeds the {remaining} days remaining")]
    InsufficientAllowance { requested: i64, remaining: i32 },
    #[error(
        "freeze window {start} to {end} overlaps the window {existing_start} to {existing_end}"
    )]
    OverlappingWindow {
        start: NaiveDate,
        end: NaiveDate,
        existing_start: NaiveDate,
        existing_end: NaiveDate,
    },
}

/// First pending or approved window sharing a calendar day with `[start, end]`.
/// Such days would otherwise be counted twice by the allowance and by resume.
pub fn find_overlap<I>(
    start: NaiveDate,
    end: NaiveDate,
    windows: I,
) -> Option<(NaiveDate, NaiveDate)>
where
    I: IntoIterator<Item = (FreezeStatus, NaiveDate, NaiveDate)>,
{
    windows
        .into_iter()
        .filter(|(status, _, _)| status.reserves_allowance())
        .find(|(_, existing_start, existing_end)| *existing_start <= end && start <= *existing_end)
        .map(|(_, existing_start, existing_end)| (existing_start, existing_end))
}

pub fn quote_freeze(
    start_date: NaiveDate,
    end_date: NaiveDate,
    allowance: &FreezeAllowance,
    freeze_fee_minor: i64,
) -> Result<FreezeQuote, FreezeRejection> {
    let days = inclusive_day_count(start_date, end_date);
    if days <= 0 {
        return Err(FreezeRejection::InvalidDateRange {
            start: start_date,
            end: end_date,
        });
    }

    let remaining = allowance.remaining();
    if days > i64::from(remaining) {
        return Err(FreezeRejection::InsufficientAllowance {
            requested: days,
            remaining,
        });
    }

    Ok(FreezeQuote {
        start_date,
        end_date,
        // bounded by `remaining`, which is an i32
        days_frozen: days as i32,
        fee_minor: freeze_fee_minor.max(0),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeQuote {
    pub total_frozen_days: i32,
    pub new_end_date: NaiveDate,
}

/// Recomputes from every approved window instead of incrementing, so replays
/// land on the same numbers.
pub fn quote_resume<I>(original_end_date: NaiveDate, windows: I) -> Option<ResumeQuote>
where
    I: IntoIterator<Item = (FreezeStatus, i32)>,
{
    let total_frozen_days: i32 = windows
        .into_iter()
        .filter(|(status, _)| *status == FreezeStatus::Approved)
        .map(|(_, days)| days)
        .sum();

    let new_end_date =
        original_end_date.checked_add_signed(Duration::days(i64::from(total_frozen_days)))?;

    Some(ResumeQuote {
        total_frozen_days,
        new_end_date,
    })
}
