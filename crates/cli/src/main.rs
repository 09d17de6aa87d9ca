//! Esencia de Romero storefront - terminal front end.
//!
//! # Usage
//!
//! ```bash
//! # List products, optionally filtered
//! storefront products --ingredient romero --sort price-asc
//!
//! # Show one product
//! storefront show jabon-romero
//!
//! # Manage the cart
//! storefront add jabon-romero
//! storefront qty jabon-romero -1
//! storefront cart
//!
//! # Hand off to the hosted payment page
//! storefront checkout
//! ```
//!
//! Configuration comes from the environment (see `storefront::config`). The
//! cart is kept in a file-backed slot under `STOREFRONT_STORAGE_DIR`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use storefront::config::StorefrontConfig;
use storefront::error::StorefrontError;
use storefront::filter::SortMode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod presenter;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(author, version, about = "Esencia de Romero storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show one product
    Show {
        /// Product id
        id: String,
    },
    /// List the available filter values
    Facets,
    /// Show the cart
    Cart,
    /// Add one unit of a product to the cart
    Add {
        /// Product id
        id: String,
    },
    /// Change the quantity of a cart line
    Qty {
        /// Product id
        id: String,
        /// Quantity change (e.g. 1 or -1)
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Remove a line from the cart
    Remove {
        /// Product id
        id: String,
    },
    /// Start a hosted checkout for the cart
    Checkout,
}

/// Filters for the product listing.
#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    /// Search text (name, description, ingredients)
    #[arg(short, long)]
    search: Option<String>,

    /// Category slug (repeatable)
    #[arg(short, long = "category")]
    categories: Vec<String>,

    /// Scent (repeatable)
    #[arg(long = "scent")]
    scents: Vec<String>,

    /// Required ingredient (repeatable, all must match)
    #[arg(short, long = "ingredient")]
    ingredients: Vec<String>,

    /// Maximum price
    #[arg(long)]
    max_price: Option<Decimal>,

    /// Hide sold-out products
    #[arg(long)]
    in_stock: bool,

    /// Sort order (`default`, `price-asc`, `price-desc`, `name`)
    #[arg(long, default_value = "default")]
    sort: SortMode,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Sentry is not up yet, so the error only goes to stderr
            let err = StorefrontError::from(e);
            #[allow(clippy::print_stderr)]
            {
                eprintln!("{}\n{err}", err.user_message());
            }
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront=info,storefront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), commands::CommandError> {
    let mut ctx = commands::Context::new(config)?;

    match cli.command {
        Commands::Products { filters } => {
            commands::catalog::products(&mut ctx, filters.into_changes()?).await;
        }
        Commands::Show { id } => commands::catalog::show(&mut ctx, &id.into()).await?,
        Commands::Facets => commands::catalog::facets(&mut ctx).await,
        Commands::Cart => commands::cart::show(&ctx),
        Commands::Add { id } => commands::cart::add(&mut ctx, &id.into()).await?,
        Commands::Qty { id, delta } => commands::cart::change_quantity(&mut ctx, &id.into(), delta)?,
        Commands::Remove { id } => commands::cart::remove(&mut ctx, &id.into())?,
        Commands::Checkout => commands::checkout::run(&mut ctx).await?,
    }
    Ok(())
}

impl FilterArgs {
    /// Translate flags into filter changes, in the order a shopper would
    /// apply them.
    fn into_changes(self) -> Result<Vec<storefront::filter::FilterChange>, commands::CommandError> {
        use storefront::catalog::Category;
        use storefront::filter::FilterChange;
        use storefront_core::Price;

        let mut changes = Vec::new();
        if let Some(search) = self.search {
            changes.push(FilterChange::Search(search));
        }
        changes.extend(self.categories.into_iter().map(|c| FilterChange::Category {
            category: Category::new(c),
            selected: true,
        }));
        changes.extend(self.scents.into_iter().map(|scent| FilterChange::Scent {
            scent,
            selected: true,
        }));
        changes.extend(self.ingredients.into_iter().map(|ingredient| FilterChange::Ingredient {
            ingredient,
            selected: true,
        }));
        if let Some(max) = self.max_price {
            changes.push(FilterChange::MaxPrice(Price::new(max)?));
        }
        if self.in_stock {
            changes.push(FilterChange::InStockOnly(true));
        }
        changes.push(FilterChange::Sort(self.sort));
        Ok(changes)
    }
}
