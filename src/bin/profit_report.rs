use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use profit_analytics::{
    config::{self, AppConfig},
    db,
    models::ProfitAnalysisRequest,
    repositories::AnalyticsRepository,
    services::{InventorySnapshotService, ProfitAnalysisService},
    tenancy::{TenantFilter, TenantKey},
};
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Analyze(args) => handle_analyze(&context, args).await?,
        Commands::Snapshot(args) => handle_snapshot(&context, args).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "profit-report",
    about = "Profit, ROI and investment analytics for a tenant",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full profit analysis and print it as JSON
    Analyze(AnalyzeArgs),
    /// Store the current inventory valuation as a monthly snapshot
    Snapshot(SnapshotArgs),
}

#[derive(Args, Debug)]
struct TenantArgs {
    #[arg(long, conflicts_with = "no_organization", help = "Organization id to scope by")]
    organization: Option<i64>,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Only rows without an organization"
    )]
    no_organization: bool,
    #[arg(long, conflicts_with = "no_company", help = "Company id to scope by")]
    company: Option<i64>,
    #[arg(long, action = ArgAction::SetTrue, help = "Only rows without a company")]
    no_company: bool,
}

impl TenantArgs {
    fn filter(&self) -> TenantFilter {
        TenantFilter::new(
            tenant_key(self.organization, self.no_organization),
            tenant_key(self.company, self.no_company),
        )
    }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long, value_parser = parse_start, help = "Range start (RFC3339 or YYYY-MM-DD)")]
    from: DateTime<Utc>,
    #[arg(long, value_parser = parse_end, help = "Range end (RFC3339 or YYYY-MM-DD, inclusive)")]
    to: DateTime<Utc>,
    #[arg(long, value_parser = parse_start, help = "Reference instant, defaults to now")]
    as_of: Option<DateTime<Utc>>,
    #[command(flatten)]
    tenant: TenantArgs,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    #[arg(long, requires = "month", help = "Snapshot year, defaults to the current year")]
    year: Option<i32>,
    #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
    #[command(flatten)]
    tenant: TenantArgs,
}

struct CliContext {
    config: AppConfig,
    repository: Arc<AnalyticsRepository>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(&config.log_level, config.log_json);

        let pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        debug!(environment = %config.environment, "database ready");

        Ok(Self {
            repository: Arc::new(AnalyticsRepository::new(Arc::new(pool))),
            config,
        })
    }
}

async fn handle_analyze(context: &CliContext, args: AnalyzeArgs) -> Result<()> {
    let filter = args.tenant.filter();
    let service =
        ProfitAnalysisService::new(context.repository.clone(), context.config.analysis.clone());
    let request = ProfitAnalysisRequest {
        from: args.from,
        to: args.to,
        organization: filter.organization,
        company: filter.company,
    };

    let response = service
        .get_profit_analysis(request, args.as_of.unwrap_or_else(Utc::now))
        .await
        .context("profit analysis failed")?;
    print_json(&response)
}

async fn handle_snapshot(context: &CliContext, args: SnapshotArgs) -> Result<()> {
    let filter = args.tenant.filter();
    let service = InventorySnapshotService::new(context.repository.clone());
    let now = Utc::now();

    let result = service
        .capture_snapshot(
            args.year.unwrap_or_else(|| now.year()),
            args.month.unwrap_or_else(|| now.month()),
            &filter,
        )
        .await
        .context("snapshot capture failed")?;
    print_json(&result)
}

fn tenant_key(id: Option<i64>, explicit_null: bool) -> TenantKey {
    match (id, explicit_null) {
        (Some(id), _) => TenantKey::Id(id),
        (None, true) => TenantKey::Unassigned,
        (None, false) => TenantKey::Any,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_datetime(raw: &str, time: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(time).and_utc())
        .map_err(|_| format!("invalid datetime '{}', expected RFC3339 or YYYY-MM-DD", raw))
}

fn parse_start(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_datetime(raw, NaiveTime::MIN)
}

fn parse_end(raw: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| "invalid end-of-day time".to_string())?;
    parse_datetime(raw, end_of_day)
}
