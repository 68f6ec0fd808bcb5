use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SyncResult;
use crate::psp::ProviderApi;

/// Identifies the tenant (sales channel) a call runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: String,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
        }
    }
}

/// Provider settings that apply to one tenant.
#[derive(Clone)]
pub struct Settings {
    pub space_id: i64,
    pub api: Arc<dyn ProviderApi>,
}

#[async_trait]
pub trait SettingsResolver: Send + Sync {
    async fn get_settings(&self, tenant_id: &str) -> SyncResult<Settings>;
}

/// Resolves the host-side identity of the plugin that owns the payment methods.
pub trait PluginRegistry: Send + Sync {
    fn plugin_id(&self, owner: &str) -> SyncResult<Uuid>;
}
