use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use psp_mirror::config::{config_path, load_config, save_config, AppConfig, StaticPluginRegistry, TenantRegistry};
use psp_mirror::entity::TransactionMirror;
use psp_mirror::media::LocalMediaPipeline;
use psp_mirror::payload::{PaymentMethodPayloadBuilder, RefundPayloadBuilder};
use psp_mirror::store::{into_patch, Catalog, Criteria, Repository};
use psp_mirror::{ConfigSyncEngine, RefundReconciler, SettingsResolver, TenantContext};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "psp-mirror", about = "Mirror payment provider configurations and refunds")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Run a payment method sync pass
    Sync {
        /// Only this tenant (all tenants otherwise)
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Record a provider transaction so it can be refunded later
    Track {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        transaction: i64,
    },
    /// Refund part or all of a tracked transaction
    Refund {
        #[arg(long)]
        transaction: i64,
        #[arg(long)]
        amount: f64,
    },
    /// Show mirrored payment methods and refunds
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config_path);

    if let Command::Init { force } = cli.command {
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        save_config(&path, &AppConfig::default())?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let config = load_config(&path)
        .with_context(|| format!("no usable config at {} (run `psp-mirror init`)", path.display()))?;
    let catalog = Catalog::open(&config.catalog_dir())?;
    let tenants = Arc::new(TenantRegistry::from_config(&config)?);

    match cli.command {
        Command::Init { .. } => {}
        Command::Sync { tenant } => run_sync(&config, &catalog, tenants, tenant).await?,
        Command::Track { tenant, transaction } => track_transaction(&catalog, &tenants, &tenant, transaction).await?,
        Command::Refund { transaction, amount } => run_refund(&catalog, tenants, transaction, amount).await?,
        Command::Status => print_status(&catalog).await?,
    }

    Ok(())
}

async fn run_sync(config: &AppConfig, catalog: &Catalog, tenants: Arc<TenantRegistry>, only: Option<String>) -> Result<()> {
    let media = Arc::new(LocalMediaPipeline::new(catalog, config.media_dir())?);
    let plugins = Arc::new(StaticPluginRegistry::new(vec![config.plugin_name.clone()]));
    let engine = ConfigSyncEngine::new(
        tenants.clone(),
        catalog.payment_method_mirrors.clone(),
        catalog.payment_methods.clone(),
        PaymentMethodPayloadBuilder::new(plugins, media, config.locales.clone()),
    );

    let tenant_ids = match only {
        Some(id) => vec![id],
        None => tenants.tenant_ids(),
    };

    let mut failures = 0;
    for tenant_id in tenant_ids {
        match engine.synchronize(&TenantContext::new(tenant_id.clone())).await {
            Ok(report) => println!(
                "{tenant_id}: {} activated, {} deactivated, {} skipped, {} failed",
                report.activated, report.deactivated, report.skipped, report.failed
            ),
            Err(e) => {
                failures += 1;
                eprintln!("{tenant_id}: sync failed: {e}");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} tenant sync(s) failed");
    }
    Ok(())
}

async fn track_transaction(catalog: &Catalog, tenants: &TenantRegistry, tenant_id: &str, transaction_id: i64) -> Result<()> {
    let settings = tenants.get_settings(tenant_id).await?;
    let transaction = settings.api.read_transaction(settings.space_id, transaction_id).await?;

    let existing = catalog
        .transaction_mirrors
        .search(&Criteria::new().eq("transaction_id", transaction_id).limit(1))
        .await?;
    let mirror = TransactionMirror {
        id: existing.first().map(|m| m.id).unwrap_or_else(Uuid::new_v4),
        transaction_id,
        space_id: settings.space_id,
        sales_channel_id: tenant_id.to_string(),
        data: serde_json::to_value(&transaction)?,
    };
    catalog.transaction_mirrors.upsert(vec![into_patch(&mirror)?]).await?;

    println!(
        "Tracking transaction {transaction_id} ({:?}, {} {})",
        transaction.state, transaction.authorization_amount, transaction.currency
    );
    Ok(())
}

async fn run_refund(catalog: &Catalog, tenants: Arc<TenantRegistry>, transaction_id: i64, amount: f64) -> Result<()> {
    let mirror = catalog
        .transaction_mirrors
        .search(&Criteria::new().eq("transaction_id", transaction_id).limit(1))
        .await?
        .into_iter()
        .next()
        .with_context(|| format!("transaction {transaction_id} is not tracked (run `psp-mirror track`)"))?;

    let settings = tenants.get_settings(&mirror.sales_channel_id).await?;
    let transaction = settings.api.read_transaction(settings.space_id, transaction_id).await?;

    let reconciler = RefundReconciler::new(
        tenants.clone(),
        catalog.transaction_mirrors.clone(),
        catalog.refund_mirrors.clone(),
        RefundPayloadBuilder::new(),
    );

    match reconciler
        .create(&transaction, amount, &TenantContext::new(mirror.sales_channel_id.clone()))
        .await
    {
        Some(refund) => println!("Refund {} created ({:?}, {})", refund.id, refund.state, refund.amount),
        None => anyhow::bail!("no refund created for transaction {transaction_id}"),
    }
    Ok(())
}

async fn print_status(catalog: &Catalog) -> Result<()> {
    let mut mirrors = catalog.payment_method_mirrors.search(&Criteria::new()).await?;
    mirrors.sort_by_key(|m| (m.space_id, m.sort_order));

    println!("Payment methods:");
    for mirror in &mirrors {
        let name = mirror.data.get("name").and_then(|v| v.as_str()).unwrap_or("?");
        println!(
            "  space {:>6}  #{:<8} {:<9} sort {:>4}  {}",
            mirror.space_id,
            mirror.payment_method_configuration_id,
            mirror.state.as_str(),
            mirror.sort_order,
            name
        );
    }

    let refunds = catalog.refund_mirrors.search(&Criteria::new()).await?;
    println!("Refunds:");
    for refund in &refunds {
        println!(
            "  space {:>6}  refund {:<10} transaction {:<10} {:?}",
            refund.space_id, refund.refund_id, refund.transaction_id, refund.state
        );
    }
    Ok(())
}
