use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigurationState {
    Create,
    Active,
    Inactive,
    Deleted,
}

impl ConfigurationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigurationState::Create => "CREATE",
            ConfigurationState::Active => "ACTIVE",
            ConfigurationState::Inactive => "INACTIVE",
            ConfigurationState::Deleted => "DELETED",
        }
    }
}

/// A payment method configuration as the provider returns it for a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodConfiguration {
    pub id: i64,
    pub linked_space_id: i64,
    pub state: ConfigurationState,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub resolved_title: BTreeMap<String, String>,
    #[serde(default)]
    pub resolved_description: BTreeMap<String, String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_image_url: Option<String>,
    /// Provider fields we don't interpret, kept so the mirrored copy stays complete.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Create,
    Pending,
    Confirmed,
    Processing,
    Failed,
    Authorized,
    Voided,
    Completed,
    Fulfill,
    Decline,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub linked_space_id: i64,
    pub state: TransactionState,
    pub authorization_amount: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundState {
    Create,
    Scheduled,
    Pending,
    ManualCheck,
    Failed,
    Successful,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundType {
    MerchantInitiatedOnline,
    MerchantInitiatedOffline,
    CustomerInitiatedAutomatic,
    CustomerInitiatedManual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReference {
    pub id: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: i64,
    pub linked_space_id: i64,
    pub state: RefundState,
    pub transaction: TransactionReference,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outbound refund request. `space_id` selects the space the request is sent to
/// and is not part of the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundCreate {
    #[serde(skip)]
    pub space_id: i64,
    pub transaction: i64,
    pub amount: f64,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_reference: Option<String>,
    #[serde(rename = "type")]
    pub refund_type: RefundType,
}

/// Search body for the provider's `*/search` endpoints. Serializes to `{}`,
/// which the provider reads as "every entity of the space".
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityQuery {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "id": 7,
            "linkedSpaceId": 1,
            "state": "ACTIVE",
            "sortOrder": 3,
            "resolvedTitle": {"en-GB": "Invoice"},
            "name": "Invoice",
            "dataCollectionType": "ONSITE",
            "version": 4
        });

        let configuration: PaymentMethodConfiguration = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(configuration.state, ConfigurationState::Active);
        assert_eq!(configuration.extra.get("version"), Some(&Value::from(4)));

        let back = serde_json::to_value(&configuration).unwrap();
        assert_eq!(back["dataCollectionType"], "ONSITE");
        assert_eq!(back["linkedSpaceId"], 1);
    }

    #[test]
    fn unknown_refund_state_is_tolerated() {
        let refund: Refund = serde_json::from_value(serde_json::json!({
            "id": 11,
            "linkedSpaceId": 1,
            "state": "SOMETHING_NEW",
            "transaction": {"id": 5}
        }))
        .unwrap();
        assert_eq!(refund.state, RefundState::Unknown);
    }

    #[test]
    fn refund_create_body_omits_space() {
        let body = serde_json::to_value(RefundCreate {
            space_id: 9,
            transaction: 5,
            amount: 10.5,
            external_id: "refund_x".to_string(),
            merchant_reference: None,
            refund_type: RefundType::MerchantInitiatedOnline,
        })
        .unwrap();
        assert!(body.get("spaceId").is_none());
        assert_eq!(body["type"], "MERCHANT_INITIATED_ONLINE");
        assert_eq!(body["externalId"], "refund_x");
    }

    #[test]
    fn default_query_is_unfiltered() {
        assert_eq!(serde_json::to_value(EntityQuery::default()).unwrap(), serde_json::json!({}));
    }
}
