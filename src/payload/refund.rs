use uuid::Uuid;

use crate::psp::types::RefundType;
use crate::psp::{RefundCreate, Transaction, TransactionState};

const MERCHANT_REFERENCE_MAX_LEN: usize = 100;

/// Decides whether a refund may be requested and shapes the request.
#[derive(Debug, Clone, Default)]
pub struct RefundPayloadBuilder;

impl RefundPayloadBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Returns `None` when the transaction can't be refunded for `amount`:
    /// it must be fulfilled and the rounded amount must lie in
    /// `(0, authorization amount]`.
    pub fn build(&self, transaction: &Transaction, amount: f64, space_id: i64) -> Option<RefundCreate> {
        if transaction.state != TransactionState::Fulfill {
            tracing::debug!(
                transaction_id = transaction.id,
                state = ?transaction.state,
                "Transaction is not in a refundable state"
            );
            return None;
        }

        let amount = round_amount(amount);
        if !amount.is_finite() || amount <= 0.0 || amount > round_amount(transaction.authorization_amount) {
            tracing::debug!(
                transaction_id = transaction.id,
                amount,
                authorized = transaction.authorization_amount,
                "Refund amount outside the refundable range"
            );
            return None;
        }

        Some(RefundCreate {
            space_id,
            transaction: transaction.id,
            amount,
            external_id: format!("refund_{}", Uuid::new_v4().simple()),
            merchant_reference: transaction
                .merchant_reference
                .as_deref()
                .map(|reference| reference.chars().take(MERCHANT_REFERENCE_MAX_LEN).collect()),
            refund_type: RefundType::MerchantInitiatedOnline,
        })
    }
}

fn round_amount(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
