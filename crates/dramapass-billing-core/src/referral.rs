//! Referral bonuses and code redemption

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use dramapass_db::SubscriberRepository;
use dramapass_types::{ReferralCode, SubscriberId};

use crate::BillingError;

/// Bonus days granted on a referred purchase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReferralBonus {
    pub payer_days: u32,
    pub referrer_days: u32,
}

/// Capped referral bonus rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralCalculator {
    payer_cap_days: u32,
    referrer_cap_days: u32,
}

impl ReferralCalculator {
    pub fn new(payer_cap_days: u32, referrer_cap_days: u32) -> Self {
        Self {
            payer_cap_days,
            referrer_cap_days,
        }
    }

    /// Payer gets the base duration again up to their cap, the referrer up to
    /// theirs. Nothing without a recorded referrer.
    pub fn compute_bonuses(
        &self,
        referred_by: Option<&ReferralCode>,
        base_days: u32,
    ) -> ReferralBonus {
        match referred_by {
            None => ReferralBonus::default(),
            Some(_) => ReferralBonus {
                payer_days: base_days.min(self.payer_cap_days),
                referrer_days: base_days.min(self.referrer_cap_days),
            },
        }
    }
}

impl Default for ReferralCalculator {
    fn default() -> Self {
        Self::new(7, 3)
    }
}

/// Redeems referral codes
#[derive(Clone)]
pub struct ReferralService {
    subscribers: Arc<dyn SubscriberRepository>,
}

impl ReferralService {
    pub fn new(subscribers: Arc<dyn SubscriberRepository>) -> Self {
        Self { subscribers }
    }

    /// Link `subscriber` to the owner of `code`. The link is written at most
    /// once; a concurrent redemption that lands first wins.
    #[instrument(skip(self))]
    pub async fn redeem(
        &self,
        subscriber: SubscriberId,
        code: &str,
    ) -> Result<ReferralCode, BillingError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(BillingError::Validation("referral code is empty".into()));
        }
        let code = ReferralCode::parse(code)?;

        let redeemer = self
            .subscribers
            .find(subscriber)
            .await?
            .ok_or(BillingError::SubscriberNotFound(subscriber))?;

        if let Some(existing) = redeemer.referred_by {
            return Err(BillingError::ReferralAlreadySet(existing));
        }

        let owner = self
            .subscribers
            .find_by_referral_code(&code)
            .await?
            .ok_or_else(|| BillingError::ReferralCodeNotFound(code.to_string()))?;

        if owner.id == subscriber {
            return Err(BillingError::SelfReferral);
        }

        if !self.subscribers.set_referred_by(subscriber, &code).await? {
            warn!(subscriber = %subscriber, "Referral code set concurrently");
            let current = self
                .subscribers
                .find(subscriber)
                .await?
                .and_then(|s| s.referred_by)
                .unwrap_or_else(|| code.clone());
            return Err(BillingError::ReferralAlreadySet(current));
        }

        info!(subscriber = %subscriber, referrer = %owner.id, "Referral code redeemed");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bonus_caps() {
        let calc = ReferralCalculator::default();
        let code = ReferralCode("abcd1234".into());

        let long = calc.compute_bonuses(Some(&code), 30);
        assert_eq!((long.payer_days, long.referrer_days), (7, 3));

        let short = calc.compute_bonuses(Some(&code), 1);
        assert_eq!((short.payer_days, short.referrer_days), (1, 1));

        assert_eq!(calc.compute_bonuses(None, 30), ReferralBonus::default());
    }

    #[test]
    fn test_bonus_for_zero_days() {
        let calc = ReferralCalculator::default();
        let code = ReferralCode("abcd1234".into());
        assert_eq!(calc.compute_bonuses(Some(&code), 0), ReferralBonus::default());
    }
}
