use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use time::OffsetDateTime;
use tracing::{info, warn};

use design_quote::domain::MAX_UNITS;
use design_quote::infra::{CacheStatus, CbrClient, CbrClientError, RatePayload, REFRESH_INTERVAL};
use design_quote::util::logger;
use design_quote::util::version::{version_label, APP_NAME};
use design_quote::{CurrencyFormatter, FormCatalog, ProjectInput, QuoteConfig, QuoteEngine};

#[derive(Debug, Parser)]
#[command(name = "design-quote", version)]
#[command(about = "Quote client price and designer payout for a design project")]
struct Cli {
    /// TOML file overriding the pricing table, currency or rate source.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not fetch the exchange rate; use the cached or fallback rate.
    #[arg(long, global = true)]
    offline: bool,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute a quote.
    Quote(QuoteArgs),
    /// List the codes accepted by `quote`.
    Options,
    /// Show the current USD/RUB rate.
    Rate(RateArgs),
}

#[derive(Debug, Args)]
struct RateArgs {
    /// Keep running and print the rate whenever it changes.
    #[arg(long)]
    watch: bool,
}

#[derive(Debug, Args)]
struct QuoteArgs {
    #[arg(long)]
    work_type: String,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_UNITS)))]
    units: u32,

    /// Hourly rate in USD.
    #[arg(long)]
    rate: f64,

    #[arg(long)]
    source: Option<String>,

    /// Delivery window in days for urgent projects (1 or 3).
    #[arg(long)]
    urgent_days: Option<u8>,

    #[arg(long)]
    region: Option<String>,

    /// Client discount in percent (0, 5, 10 or 15).
    #[arg(long, default_value_t = 0)]
    discount: u8,
}

impl QuoteArgs {
    fn to_input(&self) -> ProjectInput {
        let mut input = ProjectInput::new(self.work_type.clone(), self.units, self.rate)
            .with_discount(self.discount);
        if let Some(source) = &self.source {
            input = input.with_source(source.clone());
        }
        if let Some(region) = &self.region {
            input = input.with_region(region.clone());
        }
        if let Some(days) = self.urgent_days {
            input = input.with_urgency(days);
        }
        input
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose, cli.json);
    info!(app = APP_NAME, version = %version_label(), "starting");

    let config = QuoteConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let offline = cli.offline || config.exchange.offline;

    match &cli.command {
        Command::Quote(args) => run_quote(&config, args, offline, cli.json).await,
        Command::Options => print_options(&config, cli.json),
        Command::Rate(args) => print_rate(&config, args, offline, cli.json).await,
    }
}

async fn run_quote(
    config: &QuoteConfig,
    args: &QuoteArgs,
    offline: bool,
    json: bool,
) -> anyhow::Result<()> {
    let engine = QuoteEngine::new(config.pricing.clone());
    let input = args.to_input();

    let Some(quote) = engine.compute_quote(&input) else {
        println!("Form incomplete: work type, units and a positive hourly rate are required.");
        return Ok(());
    };

    let mut formatter = config.currency.formatter();
    let status = apply_current_rate(config, &mut formatter, offline)
        .await
        .map(|payload| payload.status);

    let client = formatter.format(quote.client_price);
    let designer = formatter.format(quote.designer_price);

    if json {
        let body = serde_json::json!({
            "input": input,
            "quote": quote,
            "client": client,
            "designer": designer,
            "exchange_rate": formatter.exchange_rate(),
            "rate_status": status.map(status_label),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("Client price:    {:>10}  {:>14}", client.usd, client.rub);
    println!("Designer price:  {:>10}  {:>14}", designer.usd, designer.rub);
    println!(
        "Estimated hours: {}-{} h",
        quote.estimated_hours.min, quote.estimated_hours.max
    );
    println!(
        "USD/RUB:         {:.2} ({})",
        formatter.exchange_rate(),
        status.map(status_label).unwrap_or("fallback")
    );
    Ok(())
}

fn print_options(config: &QuoteConfig, json: bool) -> anyhow::Result<()> {
    let catalog = FormCatalog::from_table(&config.pricing);
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let sections = [
        ("Work types (--work-type)", &catalog.work_types),
        ("Sources (--source)", &catalog.sources),
        ("Regions (--region)", &catalog.regions),
        ("Urgency (--urgent-days)", &catalog.urgency_days),
        ("Discounts (--discount)", &catalog.discounts),
    ];
    for (title, options) in sections {
        println!("{title}");
        for option in options {
            println!("  {:<20} {}", option.value, option.label);
        }
    }
    println!("Units (--units): 1..={MAX_UNITS}");
    Ok(())
}

async fn print_rate(
    config: &QuoteConfig,
    args: &RateArgs,
    offline: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut formatter = config.currency.formatter();
    let payload = apply_current_rate(config, &mut formatter, offline).await;
    let label = payload
        .as_ref()
        .map(|payload| status_label(payload.status))
        .unwrap_or("fallback");
    let now = OffsetDateTime::now_utc();

    if json {
        let body = serde_json::json!({
            "usd_rub": formatter.exchange_rate(),
            "status": label,
            "observed_date": payload.as_ref().map(|p| p.data.observed_date.as_str()),
            "stored_at": payload.as_ref().map(|p| p.data.stored_at.as_str()),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        match &payload {
            Some(payload) => println!(
                "USD/RUB {:.4} ({label}, published {}, fetched {} ago)",
                formatter.exchange_rate(),
                payload.data.observed_date,
                payload.data.age_string(now)
            ),
            None => println!("USD/RUB {:.4} ({label})", formatter.exchange_rate()),
        }
    }

    if !args.watch {
        return Ok(());
    }
    if offline {
        anyhow::bail!("--watch needs network access; drop --offline");
    }

    let client = rate_client(config).context("creating rate client")?;
    let (mut rx, _refresh) = client.watch_usd_rub(formatter.exchange_rate(), REFRESH_INTERVAL);
    info!(every = ?REFRESH_INTERVAL, "watching USD/RUB rate");
    let mut shown = formatter.exchange_rate();
    while rx.changed().await.is_ok() {
        let rate = *rx.borrow_and_update();
        // The first refresh usually republishes the rate shown above.
        if rate == shown {
            continue;
        }
        shown = rate;
        if json {
            println!("{}", serde_json::json!({ "usd_rub": rate }));
        } else {
            println!("USD/RUB {rate:.4}");
        }
    }
    Ok(())
}

fn rate_client(config: &QuoteConfig) -> Result<CbrClient, CbrClientError> {
    let client = CbrClient::with_base_url(&config.exchange.base_url)?;
    Ok(match &config.exchange.cache_dir {
        Some(dir) => client.with_cache_dir(dir),
        None => client,
    })
}

/// Pushes the best available rate into `formatter`. `None` means the fallback
/// constant is still in effect.
async fn apply_current_rate(
    config: &QuoteConfig,
    formatter: &mut CurrencyFormatter,
    offline: bool,
) -> Option<RatePayload> {
    let client = match rate_client(config) {
        Ok(client) => client,
        Err(e) => {
            warn!("rate client unavailable: {e}");
            return None;
        }
    };

    if offline {
        let data = client.cached_usd_rub().await?;
        formatter.set_exchange_rate(data.rate);
        return Some(RatePayload {
            data,
            status: CacheStatus::Cached,
        });
    }

    match client.get_usd_rub().await {
        Ok(payload) => {
            formatter.set_exchange_rate(payload.data.rate);
            Some(payload)
        }
        Err(e) => {
            warn!("could not load USD/RUB rate, using fallback: {e}");
            None
        }
    }
}

fn status_label(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::Fresh => "fresh",
        CacheStatus::Cached => "cached",
        CacheStatus::Stale => "stale",
    }
}
