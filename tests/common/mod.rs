#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use psp_mirror::entity::{Media, MediaDefaultFolder, MediaFolder};
use psp_mirror::media::{MediaError, MediaPipeline};
use psp_mirror::payload::PaymentMethodPayloadBuilder;
use psp_mirror::psp::mock::MockProvider;
use psp_mirror::psp::{ConfigurationState, PaymentMethodConfiguration, ProviderApi, Transaction, TransactionState};
use psp_mirror::settings::PluginRegistry;
use psp_mirror::store::Catalog;
use psp_mirror::{ConfigSyncEngine, Settings, SettingsResolver, SyncError, SyncResult, TenantContext};
use uuid::Uuid;

pub const TENANT: &str = "storefront";
pub const SPACE_ID: i64 = 405;

/// Resolves every tenant to the same mock provider and space.
pub struct FixedSettings {
    pub provider: Arc<MockProvider>,
    pub space_id: i64,
}

#[async_trait]
impl SettingsResolver for FixedSettings {
    async fn get_settings(&self, tenant_id: &str) -> SyncResult<Settings> {
        if tenant_id != TENANT {
            return Err(SyncError::Settings(format!("unknown tenant {tenant_id}")));
        }
        let api: Arc<dyn ProviderApi> = self.provider.clone();
        Ok(Settings {
            space_id: self.space_id,
            api,
        })
    }
}

pub struct FixedPlugin;

impl PluginRegistry for FixedPlugin {
    fn plugin_id(&self, _owner: &str) -> SyncResult<Uuid> {
        Ok(Uuid::from_u128(0x5053_5000))
    }
}

/// Media pipeline that never touches the network. Fails for the listed titles.
#[derive(Default)]
pub struct StubMedia {
    pub failing_titles: Vec<String>,
    pub stored: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl MediaPipeline for StubMedia {
    async fn upsert_default_folder(&self, _folder: MediaDefaultFolder) -> Result<(), MediaError> {
        Ok(())
    }

    async fn upsert_folder(&self, _folder: MediaFolder) -> Result<(), MediaError> {
        Ok(())
    }

    async fn store_from_url(&self, media_id: Uuid, folder_id: Uuid, url: &str, title: &str) -> Result<Media, MediaError> {
        if self.failing_titles.iter().any(|t| t == title) {
            return Err(MediaError::Download {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.stored.lock().unwrap().push(media_id);
        Ok(Media {
            id: media_id,
            media_folder_id: folder_id,
            title: title.to_string(),
            file_name: format!("{}.svg", media_id.simple()),
            mime_type: Some("image/svg+xml".to_string()),
            file_size: 128,
            path: format!("/media/{}.svg", media_id.simple()),
        })
    }
}

pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub catalog: Catalog,
    pub settings: Arc<FixedSettings>,
    pub media: Arc<StubMedia>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_media(StubMedia::default())
    }

    pub fn with_media(media: StubMedia) -> Self {
        let provider = Arc::new(MockProvider::new());
        Self {
            settings: Arc::new(FixedSettings {
                provider: provider.clone(),
                space_id: SPACE_ID,
            }),
            provider,
            catalog: Catalog::in_memory(),
            media: Arc::new(media),
        }
    }

    pub fn engine(&self) -> ConfigSyncEngine {
        ConfigSyncEngine::new(
            self.settings.clone(),
            self.catalog.payment_method_mirrors.clone(),
            self.catalog.payment_methods.clone(),
            PaymentMethodPayloadBuilder::new(
                Arc::new(FixedPlugin),
                self.media.clone(),
                vec!["en-GB".to_string(), "de-DE".to_string()],
            ),
        )
    }

    pub fn context(&self) -> TenantContext {
        TenantContext::new(TENANT)
    }
}

pub fn configuration(id: i64, sort_order: i32, state: ConfigurationState, name: &str) -> PaymentMethodConfiguration {
    PaymentMethodConfiguration {
        id,
        linked_space_id: SPACE_ID,
        state,
        sort_order,
        resolved_title: BTreeMap::from([("en-GB".to_string(), name.to_string())]),
        resolved_description: BTreeMap::from([("en-GB".to_string(), format!("Pay with {name}"))]),
        name: name.to_string(),
        resolved_image_url: Some(format!("https://cdn.test/icons/{id}.svg")),
        extra: Default::default(),
    }
}

pub fn transaction(id: i64, state: TransactionState, authorized: f64) -> Transaction {
    Transaction {
        id,
        linked_space_id: SPACE_ID,
        state,
        authorization_amount: authorized,
        currency: "EUR".to_string(),
        merchant_reference: Some(format!("order-{id}")),
        created_on: None,
        extra: Default::default(),
    }
}
