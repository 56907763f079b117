use std::sync::Arc;

use activity_pricing::{
    config,
    db::{self, DbPool},
    events::{self, Event, EventSender},
    prelude::*,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Available(args) => handle_available(&context, args, cli.json).await?,
        Commands::Check(args) => handle_check(&context, args, cli.json).await?,
        Commands::Quote(args) => handle_quote(&context, args, cli.json).await?,
        Commands::Stats(args) => handle_stats(&context, args, cli.json).await?,
        Commands::OrderActivities(args) => handle_order_activities(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "activity-cli",
    about = "Inspect customer activity pricing and statistics",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List activities the customer can currently purchase
    Available(AvailableArgs),
    /// Check whether one activity is purchasable
    Check(CheckArgs),
    /// Price a quantity of an activity
    Quote(QuoteArgs),
    /// Aggregate the customer's activity instances
    Stats(StatsArgs),
    /// List active instances recorded on an order
    OrderActivities(OrderActivitiesArgs),
}

#[derive(Args)]
struct AvailableArgs {
    customer_id: String,
    #[arg(long, help = "Evaluate availability at this RFC 3339 instant instead of now")]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct CheckArgs {
    customer_id: String,
    definition_id: String,
    #[arg(long, help = "Evaluate availability at this RFC 3339 instant instead of now")]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct QuoteArgs {
    customer_id: String,
    definition_id: String,
    quantity: Decimal,
    #[arg(long, help = "Resolve the tier effective at this RFC 3339 instant instead of now")]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct StatsArgs {
    customer_id: String,
    #[arg(long, help = "Only include instances created at or after this instant")]
    from: Option<DateTime<Utc>>,
    #[arg(long, help = "Only include instances created at or before this instant")]
    to: Option<DateTime<Utc>>,
    #[arg(long = "definition", help = "Restrict to instances of these definitions (repeatable)")]
    definitions: Vec<String>,
}

#[derive(Args)]
struct OrderActivitiesArgs {
    order_id: String,
}

struct CliContext {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_currency: String,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        db::check_connection(&db_pool)
            .await
            .context("database is not reachable")?;
        if config.auto_migrate {
            db::run_migrations(&db_pool)
                .await
                .context("failed to apply migrations")?;
        }

        let (event_tx, event_rx) = mpsc::channel::<Event>(32);
        tokio::spawn(events::process_events(event_rx));

        Ok(Self {
            db: Arc::new(db_pool),
            event_sender: Arc::new(EventSender::new(event_tx)),
            default_currency: config.default_currency,
        })
    }

    fn activity_service(&self) -> CustomerActivityService {
        CustomerActivityService::new(self.db.clone(), Some(self.event_sender.clone()))
    }

    fn price_tier_service(&self) -> PriceTierService {
        PriceTierService::new(
            self.db.clone(),
            Some(self.event_sender.clone()),
            self.default_currency.clone(),
        )
    }
}

async fn handle_available(context: &CliContext, args: AvailableArgs, json: bool) -> Result<()> {
    let as_of = args.as_of.unwrap_or_else(Utc::now);
    let available = context
        .activity_service()
        .list_available_activities_at(&args.customer_id, as_of)
        .await?;

    if json {
        return print_json(&available);
    }

    if available.is_empty() {
        println!("No activities available for customer {}", args.customer_id);
    }
    for activity in &available {
        render_available(activity);
    }
    Ok(())
}

async fn handle_check(context: &CliContext, args: CheckArgs, json: bool) -> Result<()> {
    let as_of = args.as_of.unwrap_or_else(Utc::now);
    let available = context
        .activity_service()
        .is_activity_available_at(&args.customer_id, &args.definition_id, as_of)
        .await?;

    if json {
        return print_json(&serde_json::json!({
            "customer_id": args.customer_id,
            "activity_definition_id": args.definition_id,
            "as_of": as_of,
            "available": available,
        }));
    }

    println!(
        "Activity {} is {} for customer {}",
        args.definition_id,
        if available { "available" } else { "not available" },
        args.customer_id
    );
    Ok(())
}

async fn handle_quote(context: &CliContext, args: QuoteArgs, json: bool) -> Result<()> {
    let as_of = args.as_of.unwrap_or_else(Utc::now);
    let quote = context
        .price_tier_service()
        .quote(&args.customer_id, &args.definition_id, args.quantity, as_of)
        .await?;

    if json {
        return print_json(&quote);
    }

    println!(
        "{} x {} {} = {} {} (tier {})",
        quote.quantity,
        quote.unit_price,
        quote.currency,
        quote.line_total,
        quote.currency,
        quote.tier_id
    );
    Ok(())
}

async fn handle_stats(context: &CliContext, args: StatsArgs, json: bool) -> Result<()> {
    let options = StatisticsOptions {
        start_date: args.from,
        end_date: args.to,
        activity_definition_ids: if args.definitions.is_empty() {
            None
        } else {
            Some(args.definitions)
        },
    };
    let statistics = context
        .activity_service()
        .get_activity_statistics(&args.customer_id, options)
        .await?;

    if json {
        return print_json(&statistics);
    }

    println!("Statistics {} group(s)", statistics.len());
    for row in &statistics {
        println!(
            "- {} [{}] {} • {} {} • value {} • {} instance(s)",
            row.activity.name,
            row.activity.activity_type.as_str(),
            row.activity.code.as_deref().unwrap_or("-"),
            row.total_quantity,
            row.activity.unit,
            row.total_value,
            row.instance_count
        );
    }
    Ok(())
}

async fn handle_order_activities(
    context: &CliContext,
    args: OrderActivitiesArgs,
    json: bool,
) -> Result<()> {
    let instances = context
        .activity_service()
        .list_order_activities(&args.order_id)
        .await?;

    if json {
        return print_json(&instances);
    }

    println!("Order {} • {} activity line(s)", args.order_id, instances.len());
    for instance in &instances {
        println!(
            "  • {} x {} {} @ {} (total {}) • {}",
            instance.quantity,
            instance.unit,
            instance.name,
            instance.unit_price,
            instance.line_total,
            instance.created_at.to_rfc3339()
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_available(activity: &AvailableActivity) {
    let definition = &activity.definition;
    println!(
        "- {} • {} • {} • unit {}",
        definition.name,
        definition.activity_type.as_str(),
        definition.id,
        definition.unit
    );
    for tier in &activity.price_tiers {
        let band = match tier.max_quantity {
            Some(max) => format!("{}..={}", tier.min_quantity, max),
            None => format!("{}+", tier.min_quantity),
        };
        println!("  • {} @ {} {}", band, tier.unit_price, tier.currency);
    }
}
