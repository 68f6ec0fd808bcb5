//! Mirrors the provider's payment method configurations into the catalog.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::entity::{PaymentMethodMirror, PaymentMethodRecord};
use crate::error::SyncResult;
use crate::payload::PaymentMethodPayloadBuilder;
use crate::psp::{ConfigurationState, EntityQuery, PaymentMethodConfiguration};
use crate::settings::{SettingsResolver, TenantContext};
use crate::store::{into_patch, Criteria, Patch, Repository};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub deactivated: usize,
    pub activated: usize,
    pub skipped: usize,
    /// Mirrors that could not be fully deactivated plus configurations that
    /// could not be mirrored.
    pub failed: usize,
}

pub struct ConfigSyncEngine {
    settings: Arc<dyn SettingsResolver>,
    mirrors: Arc<dyn Repository<PaymentMethodMirror>>,
    payment_methods: Arc<dyn Repository<PaymentMethodRecord>>,
    payload: PaymentMethodPayloadBuilder,
}

impl ConfigSyncEngine {
    pub fn new(
        settings: Arc<dyn SettingsResolver>,
        mirrors: Arc<dyn Repository<PaymentMethodMirror>>,
        payment_methods: Arc<dyn Repository<PaymentMethodRecord>>,
        payload: PaymentMethodPayloadBuilder,
    ) -> Self {
        Self {
            settings,
            mirrors,
            payment_methods,
            payload,
        }
    }

    /// Runs one sync pass for the tenant.
    ///
    /// Every active mirror of the space is deactivated first; the configurations
    /// the provider still reports as active are then reactivated and upserted in
    /// sort order. Failing to resolve settings, list mirrors or fetch the
    /// configurations aborts the pass. A failure on a single entry is logged and
    /// the pass moves on.
    pub async fn synchronize(&self, context: &TenantContext) -> SyncResult<SyncReport> {
        let settings = self.settings.get_settings(&context.tenant_id).await?;
        let space_id = settings.space_id;
        let mut report = SyncReport::default();

        tracing::info!(tenant_id = %context.tenant_id, space_id, provider = settings.api.name(), "Starting payment method sync");

        self.deactivate_all(space_id, &mut report).await?;

        let mut configurations = settings
            .api
            .search_payment_method_configurations(space_id, &EntityQuery::default())
            .await?;
        configurations.sort_by_key(|c| c.sort_order);

        for configuration in &configurations {
            if configuration.state != ConfigurationState::Active {
                tracing::debug!(
                    configuration_id = configuration.id,
                    state = configuration.state.as_str(),
                    "Skipping inactive payment method configuration"
                );
                report.skipped += 1;
                continue;
            }

            match self.upsert_configuration(space_id, configuration).await {
                Ok(id) => {
                    tracing::debug!(configuration_id = configuration.id, payment_method_id = %id, "Payment method activated");
                    report.activated += 1;
                }
                Err(e) => {
                    tracing::error!(
                        space_id,
                        configuration_id = configuration.id,
                        error = %e,
                        "Failed to mirror payment method configuration"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            space_id,
            deactivated = report.deactivated,
            activated = report.activated,
            skipped = report.skipped,
            failed = report.failed,
            "Payment method sync complete"
        );
        Ok(report)
    }

    /// Flips every active mirror of the space to INACTIVE. The mirror is flipped
    /// even when its payment method can't be updated, so a removed payment
    /// method doesn't pin the mirror to ACTIVE.
    async fn deactivate_all(&self, space_id: i64, report: &mut SyncReport) -> SyncResult<()> {
        let active = self
            .mirrors
            .search(
                &Criteria::new()
                    .eq("space_id", space_id)
                    .eq("state", ConfigurationState::Active.as_str()),
            )
            .await?;

        for mirror in active {
            let payment_method = self
                .payment_methods
                .update(vec![field_patch(mirror.payment_method_id, "active", Value::Bool(false))])
                .await;
            let mirror_state = self
                .mirrors
                .update(vec![field_patch(
                    mirror.id,
                    "state",
                    Value::from(ConfigurationState::Inactive.as_str()),
                )])
                .await;

            if let Err(e) = &payment_method {
                tracing::error!(
                    mirror_id = %mirror.id,
                    payment_method_id = %mirror.payment_method_id,
                    error = %e,
                    "Failed to deactivate payment method"
                );
            }
            match &mirror_state {
                Ok(()) => report.deactivated += 1,
                Err(e) => tracing::error!(
                    mirror_id = %mirror.id,
                    error = %e,
                    "Failed to mark payment method mirror inactive"
                ),
            }
            if payment_method.is_err() || mirror_state.is_err() {
                report.failed += 1;
            }
        }
        Ok(())
    }

    async fn upsert_configuration(&self, space_id: i64, configuration: &PaymentMethodConfiguration) -> SyncResult<Uuid> {
        let existing = self
            .mirrors
            .search(
                &Criteria::new()
                    .eq("space_id", space_id)
                    .eq("payment_method_configuration_id", configuration.id)
                    .limit(1),
            )
            .await?;
        let id = existing.first().map(|m| m.id).unwrap_or_else(Uuid::new_v4);

        let payload = self.payload.build(configuration, id).await?;
        self.payment_methods.upsert(vec![payload.into_patch()?]).await?;

        let mirror = PaymentMethodMirror {
            id,
            space_id,
            payment_method_configuration_id: configuration.id,
            payment_method_id: id,
            data: serde_json::to_value(configuration).map_err(crate::store::StoreError::from)?,
            sort_order: configuration.sort_order,
            state: ConfigurationState::Active,
        };
        self.mirrors.upsert(vec![into_patch(&mirror)?]).await?;

        Ok(id)
    }
}

fn field_patch(id: Uuid, field: &str, value: Value) -> Patch {
    Patch::from_iter([
        ("id".to_string(), Value::String(id.to_string())),
        (field.to_string(), value),
    ])
}
