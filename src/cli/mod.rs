use clap::{Args, Parser, Subcommand};
use log::{error, info};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::models::{AllFeedsResponse, AllPricesResponse, AppState, StatusResponse};
use crate::autoupdate::{self, AutoUpdateConfig, Pattern};
use crate::chain::{Chain, DEFAULT_BLOCK_TIME_MS, producer};
use crate::feed::{FeedConnector, FeedRecord};
use crate::oracle::{PriceOracle, PricePoint};
use crate::state::Storage;

/// Local chain simulation sandbox with mock oracle feeds.
#[derive(Parser)]
#[command(name = "chainsim", version, about)]
pub struct Cli {
    /// RPC server port
    #[arg(short, long, global = true, default_value_t = 9650)]
    pub port: u16,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the chain engine and RPC server
    Start(StartArgs),
    /// Inject a price or feed record
    #[command(subcommand)]
    Inject(InjectCommand),
    /// Show chain status and known prices
    Status,
    /// Show recent price history for an asset
    History {
        /// Asset symbol, e.g. BTC
        asset: String,
    },
    /// Query the latest data for a feed
    Query {
        /// Feed name, e.g. weather
        name: String,
    },
    /// List known feeds
    List,
    /// Stop block production on the running server
    Stop,
}

#[derive(Args)]
pub struct StartArgs {
    /// Block generation interval in milliseconds
    #[arg(short = 'b', long, default_value_t = DEFAULT_BLOCK_TIME_MS)]
    pub block_time: u64,
    /// Enable automatic price updates
    #[arg(long)]
    pub auto_update: bool,
    /// Auto-update interval in milliseconds
    #[arg(long, default_value_t = 1800)]
    pub update_interval: u64,
    /// Price evolution pattern for auto-updates
    #[arg(long, value_enum, default_value = "random")]
    pub update_pattern: Pattern,
    /// Assets to auto-update (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "BTC,ETH")]
    pub update_assets: Vec<String>,
    /// Price volatility percentage
    #[arg(long, default_value_t = 1.0)]
    pub volatility: f64,
}

#[derive(Subcommand)]
pub enum InjectCommand {
    /// Inject a price for an asset
    Price { asset: String, price: f64 },
    /// Inject JSON data for a feed, e.g. `inject feed weather '{"temp":25}'`
    Feed { name: String, data: String },
}

pub async fn run(cli: Cli) -> std::io::Result<ExitCode> {
    let base = format!("http://localhost:{}", cli.port);
    match cli.command {
        Command::Start(args) => {
            run_start(cli.port, args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Inject(InjectCommand::Price { asset, price }) => {
            Ok(run_inject_price(&base, &asset, price).await)
        }
        Command::Inject(InjectCommand::Feed { name, data }) => {
            Ok(run_inject_feed(&base, &name, &data).await)
        }
        Command::Status => Ok(run_status(&base).await),
        Command::History { asset } => Ok(run_history(&base, &asset).await),
        Command::Query { name } => Ok(run_query(&base, &name).await),
        Command::List => Ok(run_list(&base).await),
        Command::Stop => Ok(run_stop(&base).await),
    }
}

/// Wire up the sandbox and serve until interrupted: one shared storage, an
/// explicitly constructed chain handed to every component, the block
/// producer, the optional auto-updater and the HTTP API.
async fn run_start(port: u16, args: StartArgs) -> std::io::Result<()> {
    use actix_web::{App, HttpServer, web};

    let storage = Arc::new(Storage::new());
    let chain = Arc::new(Chain::new(Duration::from_millis(args.block_time)));
    let prices = Arc::new(PriceOracle::new(
        Arc::clone(&storage),
        Some(Arc::clone(&chain)),
    ));
    let feeds = Arc::new(FeedConnector::new(
        Arc::clone(&storage),
        Some(Arc::clone(&chain)),
    ));

    info!("starting chain sandbox: block time {} ms, port {port}", args.block_time);
    chain.start();
    let _producer = producer::spawn(Arc::clone(&chain));

    let update_cancel = CancellationToken::new();
    let _updater = autoupdate::spawn(
        AutoUpdateConfig {
            enabled: args.auto_update,
            interval: Duration::from_millis(args.update_interval),
            pattern: args.update_pattern,
            assets: args.update_assets,
            base_prices: HashMap::new(),
            volatility: args.volatility,
        },
        Arc::clone(&prices),
        Arc::clone(&chain),
        update_cancel.clone(),
    );

    let state = web::Data::new(AppState {
        chain: Arc::clone(&chain),
        prices,
        feeds,
    });
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    println!("⛓️ chainsim RPC listening at http://{host}:{port} (Ctrl+C to stop)");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(crate::api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    info!("shutting down");
    update_cancel.cancel();
    chain.stop();
    info!("chain stopped");
    Ok(())
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client builds")
}

/// The degraded path taken when no server answers: operate on a fresh
/// in-process store. It cannot see a separately-running server's state.
fn local_oracle() -> PriceOracle {
    PriceOracle::new(Arc::new(Storage::new()), None)
}

fn local_feeds() -> FeedConnector {
    FeedConnector::new(Arc::new(Storage::new()), None)
}

/// Non-finite floats serialize to JSON null, which would poison the series
/// for every later read; reject them before either the round-trip or the
/// local fallback write, matching the HTTP boundary's check.
fn validate_price(price: f64) -> Result<(), &'static str> {
    if price.is_finite() {
        Ok(())
    } else {
        Err("price must be a finite number")
    }
}

async fn run_inject_price(base: &str, asset: &str, price: f64) -> ExitCode {
    if let Err(msg) = validate_price(price) {
        error!("{msg}");
        return ExitCode::FAILURE;
    }

    let url = format!("{base}/price/inject?asset={asset}&price={price}");
    match client().post(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            println!("Injected price: {asset} = {price}");
            ExitCode::SUCCESS
        }
        Ok(resp) => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!("failed to inject price: status {status} - {body}");
            ExitCode::FAILURE
        }
        Err(_) => {
            let record = local_oracle().set_price(asset, price);
            println!(
                "Injected price locally: {} = {:.2} (server unreachable; local data is not shared)",
                record.name, record.value
            );
            ExitCode::SUCCESS
        }
    }
}

async fn run_inject_feed(base: &str, name: &str, data: &str) -> ExitCode {
    let payload: Map<String, Value> = match serde_json::from_str(data) {
        Ok(payload) => payload,
        Err(err) => {
            error!("invalid JSON data: {err}");
            return ExitCode::FAILURE;
        }
    };

    let url = format!("{base}/feed/inject?name={name}");
    match client().post(&url).json(&payload).send().await {
        Ok(resp) if resp.status().is_success() => {
            println!("Injected feed: {name}");
            ExitCode::SUCCESS
        }
        Ok(resp) => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!("failed to inject feed: status {status} - {body}");
            ExitCode::FAILURE
        }
        Err(_) => {
            local_feeds().set_feed(name, Value::Object(payload));
            println!("Injected feed locally: {name} (server unreachable; local data is not shared)");
            ExitCode::SUCCESS
        }
    }
}

async fn run_status(base: &str) -> ExitCode {
    let http = client();
    let status: StatusResponse = match http.get(format!("{base}/status")).send().await {
        Ok(resp) => match resp.json().await {
            Ok(status) => status,
            Err(err) => {
                error!("error parsing status response: {err}");
                return ExitCode::FAILURE;
            }
        },
        Err(_) => {
            println!("Chain is not running. Start it with `chainsim start`.");
            return ExitCode::SUCCESS;
        }
    };

    println!("=== Chain Status ===");
    println!("Running: {}", status.running);
    println!("Block Height: {}", status.height);
    println!("Last Block Time: {}", status.last_block_time);

    println!("\n=== Prices ===");
    match http.get(format!("{base}/price/all")).send().await {
        Ok(resp) => match resp.json::<AllPricesResponse>().await {
            Ok(all) if all.prices.is_empty() => println!("No prices available"),
            Ok(all) => {
                for (asset, record) in all.prices {
                    println!("{asset}: {:.2} (timestamp: {})", record.value, record.timestamp);
                }
            }
            Err(err) => error!("error parsing prices response: {err}"),
        },
        Err(err) => error!("error retrieving prices: {err}"),
    }
    ExitCode::SUCCESS
}

async fn run_history(base: &str, asset: &str) -> ExitCode {
    let url = format!("{base}/price/history?asset={asset}&limit=10");
    let points: Vec<PricePoint> = match client().get(&url).send().await {
        Ok(resp) => match resp.json().await {
            Ok(points) => points,
            Err(err) => {
                error!("error parsing history response: {err}");
                return ExitCode::FAILURE;
            }
        },
        Err(_) => {
            println!("Server unreachable; no price history available for {asset}.");
            return ExitCode::SUCCESS;
        }
    };

    println!("=== Price History for {asset} (last 10) ===");
    if points.is_empty() {
        println!("No price history available");
        return ExitCode::SUCCESS;
    }
    for point in points.iter().rev() {
        println!(
            "Price: {:.2}, Timestamp: {}, Block: {}",
            point.value, point.timestamp, point.block
        );
    }
    ExitCode::SUCCESS
}

async fn run_query(base: &str, name: &str) -> ExitCode {
    let url = format!("{base}/feed/latest?name={name}");
    match client().get(&url).send().await {
        Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
            println!("Feed not found: {name}");
            ExitCode::SUCCESS
        }
        Ok(resp) => match resp.json::<FeedRecord>().await {
            Ok(record) => {
                println!("=== Feed: {name} ===");
                println!(
                    "Data: {}",
                    serde_json::to_string_pretty(&record.value).unwrap_or_default()
                );
                println!("Timestamp: {}", record.timestamp);
                println!("Block: {}", record.block);
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("error parsing feed response: {err}");
                ExitCode::FAILURE
            }
        },
        Err(_) => {
            println!("Server unreachable; no feed data available for {name}.");
            ExitCode::SUCCESS
        }
    }
}

async fn run_list(base: &str) -> ExitCode {
    let all: AllFeedsResponse = match client().get(format!("{base}/feed/list")).send().await {
        Ok(resp) => match resp.json().await {
            Ok(all) => all,
            Err(err) => {
                error!("error parsing feeds response: {err}");
                return ExitCode::FAILURE;
            }
        },
        Err(_) => {
            println!("Server unreachable; no feeds available.");
            return ExitCode::SUCCESS;
        }
    };

    println!("=== Feeds ===");
    if all.feeds.is_empty() {
        println!("No feeds available");
    } else {
        for (name, record) in all.feeds {
            println!("{name}: timestamp {}, block {}", record.timestamp, record.block);
        }
    }
    ExitCode::SUCCESS
}

async fn run_stop(base: &str) -> ExitCode {
    match client().post(format!("{base}/chain/stop")).send().await {
        Ok(resp) => match resp.json::<StatusResponse>().await {
            Ok(status) => {
                if status.running {
                    println!("Chain is still running");
                } else {
                    println!("Chain stopped at height {}", status.height);
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("error parsing stop response: {err}");
                ExitCode::FAILURE
            }
        },
        Err(_) => {
            println!("Chain is not running");
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{local_oracle, validate_price};

    #[test]
    fn non_finite_prices_are_rejected_before_any_write() {
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
        assert!(validate_price(f64::NEG_INFINITY).is_err());
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(50_000.0).is_ok());
    }

    #[test]
    fn gated_fallback_write_stays_readable() {
        let oracle = local_oracle();
        let price = 123.45;
        assert!(validate_price(price).is_ok());
        oracle.set_price("BTC", price);
        let record = oracle.price("BTC").unwrap().expect("price present");
        assert_eq!(record.value, price);
    }
}
