//! Gift vouchers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use hackshop_core::{UserId, VoucherId, VoucherStatus};

/// A single-use balance voucher.
#[derive(Debug, Clone, FromRow)]
pub struct Voucher {
    pub id: VoucherId,
    pub code: String,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: VoucherStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Whether the voucher is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// The refusal a redemption at `now` would get, if any.
    #[must_use]
    pub fn redeem_block(&self, now: DateTime<Utc>) -> Option<RedeemOutcome> {
        if self.status != VoucherStatus::Unused {
            return Some(RedeemOutcome::AlreadyUsed);
        }
        self.is_expired(now).then_some(RedeemOutcome::Expired)
    }
}

/// Result of a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed { amount: Decimal, balance: Decimal },
    NotFound,
    AlreadyUsed,
    Expired,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn voucher(expires_at: Option<DateTime<Utc>>) -> Voucher {
        Voucher {
            id: VoucherId::new(1),
            code: "abc".into(),
            amount: Decimal::new(50, 0),
            status: VoucherStatus::Unused,
            expires_at,
            used_at: None,
            used_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(voucher(Some(now - Duration::days(1))).is_expired(now));
        assert!(!voucher(Some(now + Duration::days(1))).is_expired(now));
        assert!(!voucher(None).is_expired(now));
    }

    #[test]
    fn test_redeem_block_rejects_used_and_expired() {
        let now = Utc::now();
        assert_eq!(voucher(None).redeem_block(now), None);
        assert_eq!(
            voucher(Some(now - Duration::hours(1))).redeem_block(now),
            Some(RedeemOutcome::Expired)
        );

        let mut used = voucher(Some(now - Duration::hours(1)));
        used.status = VoucherStatus::Used;
        assert_eq!(used.redeem_block(now), Some(RedeemOutcome::AlreadyUsed));
    }
}
