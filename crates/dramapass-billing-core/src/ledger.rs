//! Pending transaction ledger

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use dramapass_db::{
    ClaimOutcome, LedgerBacklog, NewPendingTransaction, PendingTransactionRepository,
};
use dramapass_types::{PendingTransaction, SubscriberId, TransactionId};

use crate::clock::Clock;
use crate::BillingError;

/// Records outstanding payments until the gateway confirms them
#[derive(Clone)]
pub struct PendingTransactionLedger {
    repo: Arc<dyn PendingTransactionRepository>,
    clock: Arc<dyn Clock>,
}

impl PendingTransactionLedger {
    pub fn new(repo: Arc<dyn PendingTransactionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Record a payment attempt. Re-issuing the same `(payer, transaction_id)`
    /// refreshes the duration without creating a second entry.
    #[instrument(skip(self))]
    pub async fn create_or_update(
        &self,
        payer: SubscriberId,
        transaction_id: &TransactionId,
        duration_days: u32,
    ) -> Result<PendingTransaction, BillingError> {
        let pending = self
            .repo
            .upsert(NewPendingTransaction {
                transaction_id: transaction_id.clone(),
                payer,
                duration_days,
                now: self.clock.now(),
            })
            .await?;
        debug!(transaction_id = %transaction_id, "Pending transaction recorded");
        Ok(pending)
    }

    /// Look up a pending entry
    pub async fn find_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<PendingTransaction, BillingError> {
        self.repo
            .find(transaction_id)
            .await?
            .ok_or_else(|| BillingError::TransactionNotFound(transaction_id.to_string()))
    }

    /// Take exclusive ownership of an entry for reconciliation
    pub async fn claim(&self, transaction_id: &TransactionId) -> Result<ClaimOutcome, BillingError> {
        Ok(self.repo.claim(transaction_id, self.clock.now()).await?)
    }

    /// Give up ownership so a redelivery can retry. Failures are logged.
    pub async fn release(&self, transaction_id: &TransactionId) {
        if let Err(e) = self.repo.release(transaction_id).await {
            warn!(transaction_id = %transaction_id, error = %e, "Failed to release claim");
        }
    }

    /// Retire an entry. Failures are logged, never escalated.
    pub async fn remove(&self, transaction_id: &TransactionId) -> bool {
        match self.repo.remove(transaction_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(transaction_id = %transaction_id, error = %e, "Failed to remove pending transaction");
                false
            }
        }
    }

    /// Outstanding entries, split into open and claimed
    pub async fn backlog(&self) -> Result<LedgerBacklog, BillingError> {
        Ok(self.repo.backlog().await?)
    }
}
