//! Local records kept in the catalog store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::psp::{ConfigurationState, RefundState};
use crate::store::Entity;

/// Local copy of one provider payment method configuration.
///
/// (`space_id`, `payment_method_configuration_id`) identifies the row; the
/// generated `id` is reused on every later sync and doubles as the id of the
/// linked [`PaymentMethodRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodMirror {
    pub id: Uuid,
    pub space_id: i64,
    pub payment_method_configuration_id: i64,
    pub payment_method_id: Uuid,
    pub data: Value,
    pub sort_order: i32,
    pub state: ConfigurationState,
}

impl Entity for PaymentMethodMirror {
    const ENTITY_NAME: &'static str = "payment_method_mirror";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodTranslation {
    pub name: String,
    pub description: String,
}

/// Payment method as the host catalog shows it at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodRecord {
    pub id: Uuid,
    pub handler_identifier: String,
    pub plugin_id: Uuid,
    pub position: i32,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<Uuid>,
    #[serde(default)]
    pub translations: BTreeMap<String, PaymentMethodTranslation>,
}

impl Entity for PaymentMethodRecord {
    const ENTITY_NAME: &'static str = "payment_method";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundMirror {
    pub id: Uuid,
    pub refund_id: i64,
    pub space_id: i64,
    pub state: RefundState,
    pub transaction_id: i64,
    pub data: Value,
}

impl Entity for RefundMirror {
    const ENTITY_NAME: &'static str = "refund_mirror";
}

/// Links a provider transaction to the sales channel (tenant) it was paid through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMirror {
    pub id: Uuid,
    pub transaction_id: i64,
    pub space_id: i64,
    pub sales_channel_id: String,
    pub data: Value,
}

impl Entity for TransactionMirror {
    const ENTITY_NAME: &'static str = "transaction_mirror";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDefaultFolder {
    pub id: Uuid,
    pub entity: String,
}

impl Entity for MediaDefaultFolder {
    const ENTITY_NAME: &'static str = "media_default_folder";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFolder {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_folder_id: Option<Uuid>,
}

impl Entity for MediaFolder {
    const ENTITY_NAME: &'static str = "media_folder";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: Uuid,
    pub media_folder_id: Uuid,
    pub title: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_size: u64,
    pub path: String,
}

impl Entity for Media {
    const ENTITY_NAME: &'static str = "media";
}
