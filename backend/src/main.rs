//! Workshop ERP maintenance CLI
//!
//! Operator entry point for jobs that run outside request handling:
//! material reconciliation and the inventory expiry sweep.

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{presets::ASCII_FULL_CONDENSED, CellAlignment, Table};
use shared::TenantScope;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use workshop_erp::alerts::TracingAlertSink;
use workshop_erp::reconciliation::ReconcileMode;
use workshop_erp::services::{AlertService, ReconcileRun, ReconciliationService};
use workshop_erp::Config;

#[derive(Debug, Parser)]
#[command(name = "workshop-maint", version, about = "Stock maintenance jobs for Workshop ERP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recompute material stock from receipts and completed preparation orders
    ReconcileMaterials {
        /// Overwrite mismatching stock figures
        #[arg(long)]
        apply: bool,

        /// Limit to one tenant; all tenants when omitted
        #[arg(long, env = "WERP_TENANT")]
        tenant: Option<Uuid>,
    },
    /// Mark expired items and emit expiry alerts
    SweepExpiry {
        #[arg(long, env = "WERP_TENANT")]
        tenant: Option<Uuid>,
    },
    /// Apply pending database migrations
    Migrate,
}

fn scope_of(tenant: Option<Uuid>) -> TenantScope {
    let scope = tenant.map(TenantScope::Tenant).unwrap_or(TenantScope::Unscoped);
    if scope.is_unscoped() {
        tracing::warn!("No --tenant given, running across all tenants");
    }
    scope
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.logging.filter.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Environment: {}", config.environment);

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")?;

    if config.database.run_migrations || matches!(cli.command, Command::Migrate) {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    match cli.command {
        Command::ReconcileMaterials { apply, tenant } => {
            let mode = if apply {
                ReconcileMode::Apply
            } else {
                ReconcileMode::DryRun
            };
            let service = ReconciliationService::new(db_pool, config.stock.clone());
            let run = service.run(scope_of(tenant), mode).await?;
            println!("{}", render_report(&run));
            println!(
                "{} material(s), {} mismatch(es), {} malformed usage entr(ies) skipped{}",
                run.rows.len(),
                run.mismatches(),
                run.skipped_entries,
                if apply { "" } else { " (dry run)" }
            );
        }
        Command::SweepExpiry { tenant } => {
            let alerts = AlertService::new(db_pool, Arc::new(TracingAlertSink), config.stock.clone());
            let today = chrono::Utc::now().date_naive();
            let summary = alerts.sweep_expiry(scope_of(tenant), today).await?;
            println!(
                "{} item(s) checked, {} marked expired, {} alert(s)",
                summary.evaluated,
                summary.expired,
                summary.alerts.len()
            );
        }
        Command::Migrate => {}
    }

    Ok(())
}

fn render_report(run: &ReconcileRun) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL_CONDENSED)
        .set_header(["Code", "Name", "Current", "Received", "Used", "Expected", "Status"]);

    for row in &run.rows {
        table.add_row([
            row.code.clone(),
            row.name.clone(),
            row.current.normalize().to_string(),
            row.total_received.normalize().to_string(),
            row.total_used.normalize().to_string(),
            row.expected.normalize().to_string(),
            row.status.as_str().to_string(),
        ]);
    }

    for col in 2..=5 {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}
