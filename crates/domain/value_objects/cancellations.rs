use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RefundPolicy {
    Full,
    Prorated,
    None,
    Custom { amount_minor: i64 },
}

impl RefundPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundPolicy::Full => "full",
            RefundPolicy::Prorated => "prorated",
            RefundPolicy::None => "none",
            RefundPolicy::Custom { .. } => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProrationBreakdown {
    pub total_days: i64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub prorated_minor: i64,
}

/// `round(price * remaining / total)` with ties away from zero. A zero-length
/// term refunds nothing.
pub fn prorate(
    price_paid_minor: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
) -> ProrationBreakdown {
    let total_days = (end_date - start_date).num_days().max(0);
    let days_elapsed = (today - start_date).num_days().max(0);
    let days_remaining = (total_days - days_elapsed).max(0);

    let prorated_minor = if total_days == 0 {
        0
    } else {
        round_ratio(price_paid_minor, days_remaining, total_days)
    };

    ProrationBreakdown {
        total_days,
        days_elapsed,
        days_remaining,
        prorated_minor,
    }
}

fn round_ratio(amount: i64, numerator: i64, denominator: i64) -> i64 {
    let product = i128::from(amount) * i128::from(numerator);
    let denominator = i128::from(denominator);
    let half_up = (product.abs() * 2 + denominator) / (2 * denominator);
    let rounded = if product < 0 { -half_up } else { half_up };
    rounded as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefundQuote {
    pub policy: RefundPolicy,
    pub refund_minor: i64,
    pub proration: ProrationBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RefundRejection {
    #[error("refund amount {amount_minor} is outside 0..={price_paid_minor}")]
    InvalidRefundAmount {
        amount_minor: i64,
        price_paid_minor: i64,
    },
}

pub fn quote_refund(
    policy: RefundPolicy,
    price_paid_minor: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
) -> Result<RefundQuote, RefundRejection> {
    let proration = prorate(price_paid_minor, start_date, end_date, today);

    let refund_minor = match policy {
        RefundPolicy::Full => price_paid_minor,
        RefundPolicy::Prorated => proration.prorated_minor,
        RefundPolicy::None => 0,
        RefundPolicy::Custom { amount_minor } => {
            if !(0..=price_paid_minor).contains(&amount_minor) {
                return Err(RefundRejection::InvalidRefundAmount {
                    amount_minor,
                    price_paid_minor,
                });
            }
            amount_minor
        }
    };

    Ok(RefundQuote {
        policy,
        refund_minor,
        proration,
    })
}

/// Trimmed reason, or `None` when nothing is left.
pub fn normalize_reason(reason: &str) -> Option<String> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn prorated_refund_for_ten_elapsed_days() {
        let quote = quote_refund(
            RefundPolicy::Prorated,
            1200,
            date(2024, 1, 1),
            date(2024, 1, 31),
            date(2024, 1, 11),
        )
        .unwrap();

        assert_eq!(quote.proration.total_days, 30);
        assert_eq!(quote.proration.days_elapsed, 10);
        assert_eq!(quote.proration.days_remaining, 20);
        assert_eq!(quote.refund_minor, 800);
    }

    #[test]
    fn full_refund_ignores_elapsed_days() {
        for today in [date(2023, 12, 1), date(2024, 1, 15), date(2024, 6, 1)] {
            let quote = quote_refund(
                RefundPolicy::Full,
                3000,
                date(2024, 1, 1),
                date(2024, 1, 31),
                today,
            )
            .unwrap();
            assert_eq!(quote.refund_minor, 3000);
        }
    }

    #[test]
    fn none_policy_refunds_nothing() {
        let quote = quote_refund(
            RefundPolicy::None,
            3000,
            date(2024, 1, 1),
            date(2024, 1, 31),
            date(2024, 1, 2),
        )
        .unwrap();
        assert_eq!(quote.refund_minor, 0);
    }

    #[test]
    fn custom_amount_within_price_is_kept() {
        let quote = quote_refund(
            RefundPolicy::Custom { amount_minor: 450 },
            1000,
            date(2024, 1, 1),
            date(2024, 1, 31),
            date(2024, 1, 2),
        )
        .unwrap();
        assert_eq!(quote.refund_minor, 450);
    }

    #[test]
    fn custom_amount_outside_price_is_rejected() {
        for amount_minor in [-1, 1001] {
            let err = quote_refund(
                RefundPolicy::Custom { amount_minor },
                1000,
                date(2024, 1, 1),
                date(2024, 1, 31),
                date(2024, 1, 2),
            )
            .unwrap_err();
            assert_eq!(
                err,
                RefundRejection::InvalidRefundAmount {
                    amount_minor,
                    price_paid_minor: 1000
                }
            );
        }
    }

    #[test]
    fn proration_stays_within_price_paid() {
        let start = date(2024, 1, 1);
        let end = date(2024, 3, 1);
        for offset in -5..80 {
            let today = start + chrono::Duration::days(offset);
            let breakdown = prorate(999, start, end, today);
            assert!(breakdown.prorated_minor >= 0);
            assert!(breakdown.prorated_minor <= 999);
        }
    }

    #[test]
    fn cancelling_before_start_refunds_everything_prorated() {
        let breakdown = prorate(1200, date(2024, 2, 1), date(2024, 3, 2), date(2024, 1, 20));
        assert_eq!(breakdown.days_elapsed, 0);
        assert_eq!(breakdown.prorated_minor, 1200);
    }

    #[test]
    fn zero_length_term_prorates_to_zero() {
        let breakdown = prorate(1200, date(2024, 2, 1), date(2024, 2, 1), date(2024, 2, 1));
        assert_eq!(breakdown.total_days, 0);
        assert_eq!(breakdown.prorated_minor, 0);
    }

    #[test]
    fn half_rounds_away_from_zero() {
        // 100 * 1 / 8 = 12.5
        assert_eq!(round_ratio(100, 1, 8), 13);
        // 100 * 1 / 3 = 33.33
        assert_eq!(round_ratio(100, 1, 3), 33);
        assert_eq!(round_ratio(-100, 1, 8), -13);
    }

    #[test]
    fn blank_reason_is_dropped() {
        assert_eq!(normalize_reason("   "), None);
        assert_eq!(normalize_reason(" moving away "), Some("moving away".to_string()));
    }
}
