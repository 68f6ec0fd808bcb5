use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::entity::{MediaDefaultFolder, MediaFolder, PaymentMethodTranslation};
use crate::error::SyncResult;
use crate::media::{MediaError, MediaPipeline};
use crate::psp::PaymentMethodConfiguration;
use crate::settings::PluginRegistry;
use crate::store::{into_patch, Patch};

/// Handler the host checkout dispatches mirrored payment methods to.
pub const PAYMENT_HANDLER_IDENTIFIER: &str = "PspMirror\\Checkout\\ProviderPaymentHandler";

/// Plugin that owns every mirrored payment method.
pub const PLUGIN_NAME: &str = "PspMirror";

/// Sort orders below this stay free for the host's own payment methods.
pub const POSITION_OFFSET: i32 = 100;

const MEDIA_ENTITY: &str = "payment_method";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentMethodPayload {
    pub id: Uuid,
    pub handler_identifier: String,
    pub plugin_id: Uuid,
    pub position: i32,
    pub active: bool,
    pub translations: BTreeMap<String, PaymentMethodTranslation>,
    pub media_id: Option<Uuid>,
}

impl PaymentMethodPayload {
    /// Store patch for this payload; a missing `media_id` is left out.
    pub fn into_patch(&self) -> SyncResult<Patch> {
        Ok(into_patch(self)?)
    }
}

pub struct PaymentMethodPayloadBuilder {
    plugins: Arc<dyn PluginRegistry>,
    media: Arc<dyn MediaPipeline>,
    locales: Vec<String>,
}

impl PaymentMethodPayloadBuilder {
    pub fn new(plugins: Arc<dyn PluginRegistry>, media: Arc<dyn MediaPipeline>, locales: Vec<String>) -> Self {
        Self {
            plugins,
            media,
            locales,
        }
    }

    pub async fn build(&self, configuration: &PaymentMethodConfiguration, id: Uuid) -> SyncResult<PaymentMethodPayload> {
        let plugin_id = self.plugins.plugin_id(PLUGIN_NAME)?;
        let media_id = self.media_id(configuration, id).await;

        Ok(PaymentMethodPayload {
            id,
            handler_identifier: PAYMENT_HANDLER_IDENTIFIER.to_string(),
            plugin_id,
            position: configuration.sort_order.saturating_sub(POSITION_OFFSET),
            active: true,
            translations: self.translations(configuration),
            media_id,
        })
    }

    /// One translation per configured locale. The description falls back to the
    /// configuration *name*, not to a description.
    pub fn translations(&self, configuration: &PaymentMethodConfiguration) -> BTreeMap<String, PaymentMethodTranslation> {
        self.locales
            .iter()
            .map(|locale| {
                let name = configuration
                    .resolved_title
                    .get(locale)
                    .unwrap_or(&configuration.name)
                    .clone();
                let description = configuration
                    .resolved_description
                    .get(locale)
                    .unwrap_or(&configuration.name)
                    .clone();
                (locale.clone(), PaymentMethodTranslation { name, description })
            })
            .collect()
    }

    async fn media_id(&self, configuration: &PaymentMethodConfiguration, id: Uuid) -> Option<Uuid> {
        match self.upsert_media(configuration, id).await {
            Ok(media_id) => Some(media_id),
            Err(e) => {
                tracing::error!(
                    payment_method_id = %id,
                    configuration_id = configuration.id,
                    error = %e,
                    "Media for payment method could not be stored"
                );
                None
            }
        }
    }

    async fn upsert_media(&self, configuration: &PaymentMethodConfiguration, id: Uuid) -> Result<Uuid, MediaError> {
        let url = configuration
            .resolved_image_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| MediaError::Download {
                url: String::new(),
                message: format!("configuration {} has no icon url", configuration.id),
            })?;

        let ids = MediaIds::for_payment_method(id);

        self.media
            .upsert_default_folder(MediaDefaultFolder {
                id: ids.default_folder,
                entity: MEDIA_ENTITY.to_string(),
            })
            .await?;
        self.media
            .upsert_folder(MediaFolder {
                id: ids.folder,
                name: configuration.name.clone(),
                default_folder_id: Some(ids.default_folder),
            })
            .await?;

        let media = self
            .media
            .store_from_url(ids.media, ids.folder, url, &configuration.name)
            .await?;
        Ok(media.id)
    }
}

/// Media ids derived from the payment method id, so repeated syncs hit the same rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaIds {
    pub default_folder: Uuid,
    pub folder: Uuid,
    pub media: Uuid,
}

impl MediaIds {
    pub fn for_payment_method(id: Uuid) -> Self {
        let derive = |kind: &str| Uuid::new_v5(&id, kind.as_bytes());
        Self {
            default_folder: derive("media-default-folder"),
            folder: derive("media-folder"),
            media: derive("media"),
        }
    }
}
