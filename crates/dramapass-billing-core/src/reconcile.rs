//! Payment reconciliation
//!
//! Turns a gateway notification into exactly one VIP extension. The pending
//! entry is claimed before anything is applied, so a redelivered or replayed
//! notification finds it claimed (or gone) and changes nothing.
//!
//! ```text
//! Received -> Matched -> Computing -> Applied -> Recorded -> Retired
//!     |           |           |           |
//! Unmatched   Duplicate   ApplyFailed  Uncertain
//! ```
//!
//! Everything up to the payer's extension runs under the engine's apply
//! timeout. A failure or timeout before the extension is sent releases the
//! claim so the gateway can redeliver. Once it is sent the claim is never
//! released: an extension whose result is unknown ends `Uncertain` and waits
//! for manual review, and a missing audit record or referrer bonus is
//! logged, not retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use dramapass_db::{
    ClaimOutcome, Repositories, SubscriberRepository, TransactionSuccessRepository,
};
use dramapass_types::{
    PendingTransaction, ReferralCode, Subscriber, SubscriberId, TransactionId,
    TransactionSuccess,
};

use crate::clock::{BusinessCalendar, Clock};
use crate::ledger::PendingTransactionLedger;
use crate::notify::Notifier;
use crate::pricing::PricingResolver;
use crate::referral::{ReferralBonus, ReferralCalculator};
use crate::session::SessionStore;
use crate::BillingError;

/// Inbound payment notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    /// Amount actually paid, in rupiah
    pub amount: u64,
    pub order_id: TransactionId,
}

/// Reconciliation progress, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Received,
    Matched,
    Computing,
    Applied,
    Recorded,
    Retired,
}

impl std::fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Matched => "matched",
            Self::Computing => "computing",
            Self::Applied => "applied",
            Self::Recorded => "recorded",
            Self::Retired => "retired",
        };
        f.write_str(name)
    }
}

/// Referrer's share of a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerCredit {
    pub subscriber: SubscriberId,
    pub bonus_days: u32,
    pub expire_time: DateTime<Utc>,
}

/// A fully applied payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub transaction_id: TransactionId,
    pub payer: SubscriberId,
    /// Days covered by the paid amount, before bonuses
    pub base_days: u32,
    pub bonus: ReferralBonus,
    /// Payer's new VIP expiry
    pub expire_time: DateTime<Utc>,
    /// Set when the referrer's bonus was applied
    pub referrer: Option<ReferrerCredit>,
    /// Whether the audit record was written by this delivery
    pub audit_recorded: bool,
}

impl Settlement {
    /// Days added to the payer's window
    pub fn payer_days(&self) -> u32 {
        self.base_days.saturating_add(self.bonus.payer_days)
    }
}

/// Terminal state of one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Credit applied and pending entry retired
    Retired(Settlement),
    /// No pending entry for the order id
    Unmatched,
    /// Another delivery owns or already settled the entry
    Duplicate,
    /// Nothing was applied; the claim was released
    ApplyFailed { reason: String },
    /// The payer's extension was sent but its result is unknown. The claim
    /// is kept so a redelivery cannot credit twice.
    Uncertain { reason: String },
}

impl ReconcileOutcome {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Retired(_) => "retired",
            Self::Unmatched => "unmatched",
            Self::Duplicate => "duplicate",
            Self::ApplyFailed { .. } => "apply_failed",
            Self::Uncertain { .. } => "uncertain",
        }
    }
}

/// Webhook-driven reconciliation state machine
#[derive(Clone)]
pub struct ReconciliationEngine {
    subscribers: Arc<dyn SubscriberRepository>,
    successes: Arc<dyn TransactionSuccessRepository>,
    ledger: PendingTransactionLedger,
    pricing: PricingResolver,
    referral: ReferralCalculator,
    notifier: Arc<dyn Notifier>,
    sessions: SessionStore,
    calendar: BusinessCalendar,
    clock: Arc<dyn Clock>,
    apply_timeout: Duration,
}

/// Collaborators for [`ReconciliationEngine::new`]
pub struct EngineParts {
    pub repos: Repositories,
    pub pricing: PricingResolver,
    pub referral: ReferralCalculator,
    pub notifier: Arc<dyn Notifier>,
    pub sessions: SessionStore,
    pub calendar: BusinessCalendar,
    pub clock: Arc<dyn Clock>,
    /// Bound on each step up to and including the payer's extension
    pub apply_timeout: Duration,
}

/// Credit worked out before anything is written
struct CreditPlan {
    payer: Subscriber,
    base_days: u32,
    bonus: ReferralBonus,
    now: DateTime<Utc>,
}

impl CreditPlan {
    fn payer_days(&self) -> u32 {
        self.base_days.saturating_add(self.bonus.payer_days)
    }
}

impl ReconciliationEngine {
    pub fn new(parts: EngineParts) -> Self {
        let EngineParts {
            repos,
            pricing,
            referral,
            notifier,
            sessions,
            calendar,
            clock,
            apply_timeout,
        } = parts;
        Self {
            subscribers: repos.subscribers,
            successes: repos.successes,
            ledger: PendingTransactionLedger::new(repos.pending, clock.clone()),
            pricing,
            referral,
            notifier,
            sessions,
            calendar,
            clock,
            apply_timeout,
        }
    }

    /// Reconcile one notification. Only a store failure while claiming is
    /// returned as an error; every later failure is folded into the outcome.
    #[instrument(skip(self, notification), fields(order_id = %notification.order_id, amount = notification.amount))]
    pub async fn reconcile(
        &self,
        notification: &PaymentNotification,
    ) -> Result<ReconcileOutcome, BillingError> {
        let order_id = &notification.order_id;
        transition(order_id, ReconcileState::Received);

        let pending = match self.ledger.claim(order_id).await? {
            ClaimOutcome::Claimed(pending) => pending,
            ClaimOutcome::Missing => {
                warn!(order_id = %order_id, "No pending transaction for payment");
                return Ok(ReconcileOutcome::Unmatched);
            }
            ClaimOutcome::AlreadyClaimed => {
                warn!(order_id = %order_id, "Pending transaction already claimed");
                return Ok(ReconcileOutcome::Duplicate);
            }
        };
        transition(order_id, ReconcileState::Matched);

        let plan = match tokio::time::timeout(
            self.apply_timeout,
            self.plan(&pending, notification.amount),
        )
        .await
        {
            Ok(Ok(plan)) => plan,
            Ok(Err(e)) => return Ok(self.abandon(order_id, e).await),
            Err(_) => {
                return Ok(self
                    .abandon(order_id, BillingError::Timeout("payment lookup"))
                    .await)
            }
        };

        let extended = tokio::time::timeout(
            self.apply_timeout,
            self.subscribers
                .extend_vip(plan.payer.id, plan.payer_days(), plan.now),
        )
        .await;
        let expire_time = match extended {
            Ok(Ok(Some(expire_time))) => expire_time,
            // No row matched, so nothing was written
            Ok(Ok(None)) => {
                return Ok(self
                    .abandon(order_id, BillingError::SubscriberNotFound(plan.payer.id))
                    .await)
            }
            Ok(Err(e)) => return Ok(uncertain(order_id, e.into())),
            Err(_) => return Ok(uncertain(order_id, BillingError::Timeout("vip extension"))),
        };
        transition(order_id, ReconcileState::Applied);

        Ok(ReconcileOutcome::Retired(
            self.settle(order_id, plan, expire_time).await,
        ))
    }

    /// Most recent settlements for a payer, newest first
    pub async fn history(
        &self,
        payer: SubscriberId,
        limit: u32,
    ) -> Result<Vec<TransactionSuccess>, BillingError> {
        Ok(self.successes.list_by_payer(payer, limit).await?)
    }

    /// Resolve the payer and the days owed. Writes nothing.
    async fn plan(
        &self,
        pending: &PendingTransaction,
        amount: u64,
    ) -> Result<CreditPlan, BillingError> {
        let order_id = &pending.transaction_id;
        let now = self.clock.now();

        let payer = self
            .subscribers
            .find(pending.payer)
            .await?
            .ok_or(BillingError::SubscriberNotFound(pending.payer))?;
        transition(order_id, ReconcileState::Computing);

        // The paid amount is authoritative over the duration requested at checkout
        let breakdown = self.pricing.decompose_amount(amount);
        if breakdown.total_days == 0 {
            return Err(BillingError::Validation(format!(
                "amount {amount} is below the cheapest package"
            )));
        }
        if breakdown.total_days != pending.duration_days {
            warn!(
                order_id = %order_id,
                paid_days = breakdown.total_days,
                requested_days = pending.duration_days,
                "Paid amount differs from the requested package"
            );
        }
        let base_days = breakdown.total_days;
        let bonus = self
            .referral
            .compute_bonuses(payer.referred_by.as_ref(), base_days);

        Ok(CreditPlan {
            payer,
            base_days,
            bonus,
            now,
        })
    }

    /// Give the entry back for redelivery
    async fn abandon(&self, order_id: &TransactionId, e: BillingError) -> ReconcileOutcome {
        error!(order_id = %order_id, error = %e, "Failed to apply payment");
        self.ledger.release(order_id).await;
        ReconcileOutcome::ApplyFailed {
            reason: e.to_string(),
        }
    }

    /// Referrer bonus, audit record, retirement and notifications after the
    /// payer's extension committed. Nothing here can undo the credit.
    async fn settle(
        &self,
        order_id: &TransactionId,
        plan: CreditPlan,
        expire_time: DateTime<Utc>,
    ) -> Settlement {
        let CreditPlan {
            payer,
            base_days,
            bonus,
            now,
        } = plan;

        let referrer = match payer.referred_by.as_ref() {
            Some(code) if bonus.referrer_days > 0 => {
                self.credit_referrer(order_id, code, bonus.referrer_days, now)
                    .await
            }
            _ => None,
        };

        let audit_recorded = self
            .record_success(order_id, payer.id, now, base_days)
            .await;
        transition(order_id, ReconcileState::Recorded);

        if !self.ledger.remove(order_id).await {
            warn!(order_id = %order_id, "Pending transaction was not removed");
        }
        self.sessions.clear_checkout_for(payer.id, order_id).await;
        transition(order_id, ReconcileState::Retired);

        let settlement = Settlement {
            transaction_id: order_id.clone(),
            payer: payer.id,
            base_days,
            bonus,
            expire_time,
            referrer,
            audit_recorded,
        };
        info!(
            order_id = %order_id,
            payer = %payer.id,
            base_days,
            payer_bonus_days = bonus.payer_days,
            referrer_bonus_days = bonus.referrer_days,
            "Payment reconciled"
        );

        self.notify_payer(&settlement).await;
        if let Some(credit) = &settlement.referrer {
            self.notify_referrer(credit, &payer.display_name).await;
        }

        settlement
    }

    /// Best-effort referrer bonus
    async fn credit_referrer(
        &self,
        order_id: &TransactionId,
        code: &ReferralCode,
        bonus_days: u32,
        now: DateTime<Utc>,
    ) -> Option<ReferrerCredit> {
        match self
            .subscribers
            .extend_vip_by_referral_code(code, bonus_days, now)
            .await
        {
            Ok(Some(extension)) => Some(ReferrerCredit {
                subscriber: extension.subscriber,
                bonus_days,
                expire_time: extension.expire_time,
            }),
            Ok(None) => {
                warn!(order_id = %order_id, code = %code, "Referrer no longer exists");
                None
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Partial apply: referrer bonus failed");
                None
            }
        }
    }

    async fn record_success(
        &self,
        order_id: &TransactionId,
        payer: SubscriberId,
        activated_at: DateTime<Utc>,
        base_days: u32,
    ) -> bool {
        let record = TransactionSuccess {
            transaction_id: order_id.clone(),
            payer,
            activated_at,
            duration_days: base_days,
        };
        match self.successes.record(&record).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(order_id = %order_id, "Settlement record already present");
                false
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Partial apply: settlement record failed");
                false
            }
        }
    }

    async fn notify_payer(&self, settlement: &Settlement) {
        let text = format!(
            "✨ Hore! VIP kamu sudah aktif! ✨\n\n\
             🎁 <b>Paket:</b> Akses VIP {} Hari\n\
             ⏰ <b>Berlaku sampai:</b> {}\n\
             📺 Sekarang kamu bisa nonton semua drama tanpa batas!",
            settlement.payer_days(),
            self.calendar.format_expiry(settlement.expire_time),
        );
        if let Err(e) = self.notifier.notify(settlement.payer, &text).await {
            warn!(subscriber = %settlement.payer, error = %e, "Failed to notify payer");
        }
    }

    async fn notify_referrer(&self, credit: &ReferrerCredit, payer_name: &str) {
        let text = format!(
            "🎉 Bonus VIP!\n\n\
             👤 Teman kamu <b>{}</b> baru berlangganan VIP.\n\
             🎁 Kamu dapat tambahan VIP {} Hari.\n\
             ⏰ VIP berlaku sampai: {}",
            escape_html(payer_name),
            credit.bonus_days,
            self.calendar.format_expiry(credit.expire_time),
        );
        if let Err(e) = self.notifier.notify(credit.subscriber, &text).await {
            warn!(subscriber = %credit.subscriber, error = %e, "Failed to notify referrer");
        }
    }
}

/// The extension may have committed; keep the claim for manual review
fn uncertain(order_id: &TransactionId, e: BillingError) -> ReconcileOutcome {
    error!(
        order_id = %order_id,
        error = %e,
        "Payer extension result unknown, claim kept for manual review"
    );
    ReconcileOutcome::Uncertain {
        reason: e.to_string(),
    }
}

fn transition(order_id: &TransactionId, state: ReconcileState) {
    debug!(order_id = %order_id, state = %state, "Reconciliation state");
}

/// Escape user-controlled text for HTML parse mode
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>A&B</b>"), "&lt;b&gt;A&amp;B&lt;/b&gt;");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ReconcileOutcome::Unmatched.label(), "unmatched");
        assert_eq!(ReconcileOutcome::Duplicate.label(), "duplicate");
        assert_eq!(
            ReconcileOutcome::ApplyFailed {
                reason: "x".into()
            }
            .label(),
            "apply_failed"
        );
        assert_eq!(
            ReconcileOutcome::Uncertain {
                reason: "x".into()
            }
            .label(),
            "uncertain"
        );
    }
}
