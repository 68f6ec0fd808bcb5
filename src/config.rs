use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::payload::payment_method::PLUGIN_NAME;
use crate::psp::mock::MockProvider;
use crate::psp::wallee::WalleeProvider;
use crate::psp::ProviderApi;
use crate::settings::{PluginRegistry, Settings, SettingsResolver};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub space_id: i64,
    pub provider: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub locales: Vec<String>,
    #[serde(default = "default_plugin_name")]
    pub plugin_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub tenants: Vec<TenantConfig>,
}

fn default_plugin_name() -> String {
    PLUGIN_NAME.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locales: vec!["en-GB".to_string(), "de-DE".to_string()],
            plugin_name: default_plugin_name(),
            data_dir: None,
            tenants: vec![TenantConfig {
                tenant_id: "default".to_string(),
                space_id: 1,
                provider: "Mock".to_string(),
                user_id: 0,
                api_secret: String::new(),
                base_url: None,
            }],
        }
    }
}

impl AppConfig {
    /// Directory holding the catalog files and downloaded media.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("psp-mirror")
        })
    }

    pub fn catalog_dir(&self) -> PathBuf {
        self.data_dir().join("catalog")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.data_dir().join("media")
    }

    pub fn tenant(&self, tenant_id: &str) -> Option<&TenantConfig> {
        self.tenants.iter().find(|t| t.tenant_id == tenant_id)
    }
}

pub fn config_path() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("psp-mirror");
    std::fs::create_dir_all(&dir).ok();
    dir.join("config.json")
}

pub fn load_config(path: &Path) -> Option<AppConfig> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
            None
        }
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn build_provider(tenant: &TenantConfig) -> Result<Arc<dyn ProviderApi>> {
    match tenant.provider.as_str() {
        "Mock" => Ok(Arc::new(MockProvider::demo(tenant.space_id))),
        "Wallee" => {
            if tenant.api_secret.is_empty() {
                anyhow::bail!("tenant {} has no api_secret", tenant.tenant_id);
            }
            let provider = WalleeProvider::new(tenant.user_id, tenant.api_secret.clone(), tenant.base_url.clone())?;
            Ok(Arc::new(provider))
        }
        other => anyhow::bail!("unknown provider {other:?} for tenant {}", tenant.tenant_id),
    }
}

/// Settings for every configured tenant, built once at startup.
pub struct TenantRegistry {
    settings: HashMap<String, Settings>,
}

impl TenantRegistry {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut settings = HashMap::new();
        for tenant in &config.tenants {
            let api = build_provider(tenant)?;
            settings.insert(
                tenant.tenant_id.clone(),
                Settings {
                    space_id: tenant.space_id,
                    api,
                },
            );
        }
        Ok(Self { settings })
    }

    pub fn tenant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.settings.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl SettingsResolver for TenantRegistry {
    async fn get_settings(&self, tenant_id: &str) -> SyncResult<Settings> {
        self.settings
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| SyncError::Settings(format!("no tenant configured with id {tenant_id:?}")))
    }
}

/// Plugin ids are name-based v5 uuids, so they stay stable across installs.
pub struct StaticPluginRegistry {
    installed: Vec<String>,
}

impl StaticPluginRegistry {
    pub fn new(installed: Vec<String>) -> Self {
        Self { installed }
    }
}

impl PluginRegistry for StaticPluginRegistry {
    fn plugin_id(&self, owner: &str) -> SyncResult<Uuid> {
        if !self.installed.iter().any(|name| name == owner) {
            return Err(SyncError::Settings(format!("plugin {owner} is not installed")));
        }
        Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, owner.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.tenants[0].base_url = Some("https://example.test/api".into());

        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.locales, config.locales);
        assert_eq!(loaded.tenants[0].base_url.as_deref(), Some("https://example.test/api"));
    }

    #[test]
    fn broken_config_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_config(&path).is_none());
    }

    #[test]
    fn wallee_tenant_needs_secret() {
        let tenant = TenantConfig {
            tenant_id: "shop".into(),
            space_id: 4,
            provider: "Wallee".into(),
            user_id: 9,
            api_secret: String::new(),
            base_url: None,
        };
        assert!(build_provider(&tenant).is_err());
    }

    #[tokio::test]
    async fn registry_resolves_configured_tenants_only() {
        let registry = TenantRegistry::from_config(&AppConfig::default()).unwrap();
        let settings = registry.get_settings("default").await.unwrap();
        assert_eq!(settings.space_id, 1);
        assert_eq!(settings.api.name(), "Mock");
        assert!(matches!(registry.get_settings("other").await, Err(SyncError::Settings(_))));
    }

    #[test]
    fn plugin_id_is_stable() {
        let plugins = StaticPluginRegistry::new(vec![PLUGIN_NAME.to_string()]);
        assert_eq!(plugins.plugin_id(PLUGIN_NAME).unwrap(), plugins.plugin_id(PLUGIN_NAME).unwrap());
        assert!(plugins.plugin_id("Other").is_err());
    }
}
