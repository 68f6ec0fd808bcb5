use super::types::TransactionReference;
use super::{
    ConfigurationState, EntityQuery, PaymentMethodConfiguration, ProviderApi, ProviderError, Refund, RefundCreate,
    RefundState, Transaction, TransactionState,
};
use async_trait::async_trait;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-process provider. Holds the configurations and transactions it serves and
/// records every refund submitted to it.
#[derive(Default)]
pub struct MockProvider {
    configurations: Mutex<Vec<PaymentMethodConfiguration>>,
    transactions: Mutex<Vec<Transaction>>,
    submitted: Mutex<Vec<RefundCreate>>,
    refund_id: Mutex<Option<i64>>,
    unavailable: Mutex<bool>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider preloaded with a couple of configurations for offline runs.
    pub fn demo(space_id: i64) -> Self {
        let provider = Self::new();
        provider.set_configurations(vec![
            demo_configuration(space_id, 1, 10, "Invoice", "Pay within 30 days"),
            demo_configuration(space_id, 2, 20, "Credit / Debit Card", "Visa, Mastercard"),
            PaymentMethodConfiguration {
                state: ConfigurationState::Inactive,
                ..demo_configuration(space_id, 3, 30, "Direct Debit", "SEPA")
            },
        ]);
        provider.add_transaction(Transaction {
            id: 1001,
            linked_space_id: space_id,
            state: TransactionState::Fulfill,
            authorization_amount: 120.0,
            currency: "EUR".to_string(),
            merchant_reference: Some("demo-order-1001".to_string()),
            created_on: Some(chrono::Utc::now()),
            extra: Default::default(),
        });
        provider
    }

    pub fn set_configurations(&self, configurations: Vec<PaymentMethodConfiguration>) {
        *lock(&self.configurations) = configurations;
    }

    pub fn add_transaction(&self, transaction: Transaction) {
        lock(&self.transactions).push(transaction);
    }

    /// Makes every following refund carry this provider id instead of a random one.
    pub fn fix_refund_id(&self, id: i64) {
        *lock(&self.refund_id) = Some(id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }

    pub fn submitted_refunds(&self) -> Vec<RefundCreate> {
        lock(&self.submitted).clone()
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if *lock(&self.unavailable) {
            return Err(ProviderError::Unavailable("mock provider switched off".to_string()));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn demo_configuration(space_id: i64, id: i64, sort_order: i32, name: &str, description: &str) -> PaymentMethodConfiguration {
    PaymentMethodConfiguration {
        id,
        linked_space_id: space_id,
        state: ConfigurationState::Active,
        sort_order,
        resolved_title: BTreeMap::from([("en-GB".to_string(), name.to_string())]),
        resolved_description: BTreeMap::from([("en-GB".to_string(), description.to_string())]),
        name: name.to_string(),
        resolved_image_url: None,
        extra: Default::default(),
    }
}

#[async_trait]
impl ProviderApi for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn search_payment_method_configurations(
        &self,
        space_id: i64,
        _query: &EntityQuery,
    ) -> Result<Vec<PaymentMethodConfiguration>, ProviderError> {
        self.check_available()?;
        Ok(lock(&self.configurations)
            .iter()
            .filter(|c| c.linked_space_id == space_id)
            .cloned()
            .collect())
    }

    async fn submit_refund(&self, space_id: i64, refund: &RefundCreate) -> Result<Refund, ProviderError> {
        self.check_available()?;
        lock(&self.submitted).push(refund.clone());

        let id = match *lock(&self.refund_id) {
            Some(id) => id,
            None => rand::thread_rng().gen_range(1..i64::from(i32::MAX)),
        };

        Ok(Refund {
            id,
            linked_space_id: space_id,
            state: RefundState::Successful,
            transaction: TransactionReference {
                id: refund.transaction,
                extra: Default::default(),
            },
            amount: refund.amount,
            external_id: Some(refund.external_id.clone()),
            created_on: Some(chrono::Utc::now()),
            extra: Default::default(),
        })
    }

    async fn read_transaction(&self, space_id: i64, transaction_id: i64) -> Result<Transaction, ProviderError> {
        self.check_available()?;
        lock(&self.transactions)
            .iter()
            .find(|t| t.linked_space_id == space_id && t.id == transaction_id)
            .cloned()
            .ok_or_else(|| ProviderError::Api {
                status_code: 404,
                message: format!("transaction {transaction_id} not found in space {space_id}"),
            })
    }
}
