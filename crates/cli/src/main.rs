//! Maintenance CLI for the commerce bookkeeping core.
//!
//! Usage:
//!   commerce-cli migrate
//!   commerce-cli usage <PROMOTION_ID>... [--coupon <COUPON_ID>]... [--email <EMAIL>]
//!   commerce-cli purge <PROMOTION_ID>...
//!   commerce-cli order <ORDER_ID>

mod commands;
mod config;

use clap::{Parser, Subcommand};
use common::{CouponId, OrderId, PromotionId};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::{Config, LogFormat};

#[derive(Parser)]
#[command(name = "commerce-cli")]
#[command(about = "Order and promotion usage maintenance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,

    /// Print usage counts per promotion
    Usage {
        /// Promotions to count
        #[arg(required = true)]
        promotion_ids: Vec<PromotionId>,

        /// Only count usages with one of these coupons
        #[arg(long = "coupon")]
        coupon_ids: Vec<CouponId>,

        /// Only count usages recorded for this email
        #[arg(long)]
        email: Option<String>,
    },

    /// Delete every usage record of the given promotions
    Purge {
        #[arg(required = true)]
        promotion_ids: Vec<PromotionId>,
    },

    /// Show a stored order
    Order { order_id: OrderId },
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing(&config);

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &Config) -> Result<(), commands::CliError> {
    let store = commands::connect(config).await?;

    match cli.command {
        Commands::Migrate => commands::migrate(&store).await,
        Commands::Usage {
            promotion_ids,
            coupon_ids,
            email,
        } => commands::usage(store, &promotion_ids, &coupon_ids, email.as_deref()).await,
        Commands::Purge { promotion_ids } => commands::purge(store, &promotion_ids).await,
        Commands::Order { order_id } => commands::show_order(store, order_id).await,
    }
}
