//! Submits refunds to the provider and mirrors the result locally.

use std::sync::Arc;

use uuid::Uuid;

use crate::entity::{RefundMirror, TransactionMirror};
use crate::error::{SyncError, SyncResult};
use crate::payload::RefundPayloadBuilder;
use crate::psp::{Refund, Transaction};
use crate::settings::{SettingsResolver, TenantContext};
use crate::store::{into_patch, Criteria, Repository, StoreError};

pub struct RefundReconciler {
    settings: Arc<dyn SettingsResolver>,
    transactions: Arc<dyn Repository<TransactionMirror>>,
    refunds: Arc<dyn Repository<RefundMirror>>,
    payload: RefundPayloadBuilder,
}

impl RefundReconciler {
    pub fn new(
        settings: Arc<dyn SettingsResolver>,
        transactions: Arc<dyn Repository<TransactionMirror>>,
        refunds: Arc<dyn Repository<RefundMirror>>,
        payload: RefundPayloadBuilder,
    ) -> Self {
        Self {
            settings,
            transactions,
            refunds,
            payload,
        }
    }

    /// Requests a refund of `refundable_amount` for `transaction`.
    ///
    /// `None` means no refund was created, either because the refund policy
    /// declined it or because something failed (already logged). Callers may
    /// retry.
    pub async fn create(
        &self,
        transaction: &Transaction,
        refundable_amount: f64,
        context: &TenantContext,
    ) -> Option<Refund> {
        match self.try_create(transaction, refundable_amount).await {
            Ok(refund) => refund,
            Err(e) => {
                tracing::error!(
                    tenant_id = %context.tenant_id,
                    transaction_id = transaction.id,
                    amount = refundable_amount,
                    error = %e,
                    "Refund could not be created"
                );
                None
            }
        }
    }

    async fn try_create(&self, transaction: &Transaction, amount: f64) -> SyncResult<Option<Refund>> {
        let mirror = self
            .transactions
            .search(&Criteria::new().eq("transaction_id", transaction.id).limit(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::RecordNotFound(format!("transaction mirror for transaction {}", transaction.id)))?;

        let settings = self.settings.get_settings(&mirror.sales_channel_id).await?;

        let Some(request) = self.payload.build(transaction, amount, settings.space_id) else {
            tracing::debug!(transaction_id = transaction.id, amount, "Refund declined by policy");
            return Ok(None);
        };

        let refund = settings.api.submit_refund(request.space_id, &request).await?;
        tracing::info!(
            refund_id = refund.id,
            transaction_id = transaction.id,
            state = ?refund.state,
            amount = refund.amount,
            "Refund submitted"
        );

        self.upsert_mirror(&refund, transaction.id).await?;
        Ok(Some(refund))
    }

    async fn upsert_mirror(&self, refund: &Refund, transaction_id: i64) -> SyncResult<()> {
        let existing = self
            .refunds
            .search(
                &Criteria::new()
                    .eq("space_id", refund.linked_space_id)
                    .eq("refund_id", refund.id)
                    .limit(1),
            )
            .await?;
        let id = existing.first().map(|m| m.id).unwrap_or_else(Uuid::new_v4);

        let transaction_id = if refund.transaction.id != 0 {
            refund.transaction.id
        } else {
            transaction_id
        };

        let mirror = RefundMirror {
            id,
            refund_id: refund.id,
            space_id: refund.linked_space_id,
            state: refund.state,
            transaction_id,
            data: serde_json::to_value(refund).map_err(StoreError::from)?,
        };
        self.refunds.upsert(vec![into_patch(&mirror)?]).await?;
        Ok(())
    }
}
