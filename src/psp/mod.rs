pub mod mock;
pub mod types;
pub mod wallee;

use async_trait::async_trait;
use thiserror::Error;

pub use types::{
    ConfigurationState, EntityQuery, PaymentMethodConfiguration, Refund, RefundCreate, RefundState,
    Transaction, TransactionState,
};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Unavailable(String),

    #[error("API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("could not decode provider response: {0}")]
    Protocol(String),
}

impl ProviderError {
    pub fn is_server_error(&self) -> bool {
        matches!(self, ProviderError::Api { status_code, .. } if (500..600).contains(status_code))
    }
}

/// Remote calls the reconcilers make against the payment provider.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    fn name(&self) -> &str;

    async fn search_payment_method_configurations(
        &self,
        space_id: i64,
        query: &EntityQuery,
    ) -> Result<Vec<PaymentMethodConfiguration>, ProviderError>;

    async fn submit_refund(&self, space_id: i64, refund: &RefundCreate) -> Result<Refund, ProviderError>;

    async fn read_transaction(&self, space_id: i64, transaction_id: i64) -> Result<Transaction, ProviderError>;
}
