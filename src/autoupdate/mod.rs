use clap::ValueEnum;
use log::{debug, info};
use rand::Rng;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::chain::Chain;
use crate::oracle::PriceOracle;

/// Deterministic price evolution selected per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Random walk within +/- volatility percent per update.
    Random,
    /// Oscillation around the base price with a 60-second period.
    Sine,
    /// Gradual decline for ten updates, then a slow recovery from -20%.
    Crash,
    /// Sharp rise for five updates, then a slow decline from +50%.
    Spike,
    /// Minimal random drift (+/- 0.05% per update).
    Stable,
}

/// Configuration for the automatic price update loop. Mutable only by the
/// loop task itself (it adopts each new price as the next base).
#[derive(Debug, Clone)]
pub struct AutoUpdateConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub pattern: Pattern,
    pub assets: Vec<String>,
    pub base_prices: HashMap<String, f64>,
    pub volatility: f64,
}

/// Compute the next price from the previous base price.
///
/// `elapsed_secs` is time since the loop started (sine only) and `n` is the
/// 0-based update counter since loop start (crash/spike only).
pub fn next_price(
    pattern: Pattern,
    base: f64,
    volatility: f64,
    elapsed_secs: f64,
    n: u64,
) -> f64 {
    match pattern {
        Pattern::Random => {
            let change = rand::thread_rng().gen_range(-volatility..=volatility);
            base * (1.0 + change / 100.0)
        }
        Pattern::Sine => {
            let amplitude = base * volatility / 100.0;
            base + (2.0 * PI * elapsed_secs / 60.0).sin() * amplitude
        }
        Pattern::Crash => {
            if n < 10 {
                base * (1.0 - (n as f64) * 2.0 / 100.0)
            } else {
                base * 0.8 * (1.0 + ((n - 10) as f64) * 0.1 / 100.0)
            }
        }
        Pattern::Spike => {
            if n < 5 {
                base * (1.0 + (n as f64) * 10.0 / 100.0)
            } else {
                base * 1.5 * (1.0 - ((n - 5) as f64) / 100.0)
            }
        }
        Pattern::Stable => {
            let change = rand::thread_rng().gen_range(-0.05..=0.05);
            base * (1.0 + change / 100.0)
        }
    }
}

/// Spawn the automatic price update loop, or return `None` when disabled.
///
/// Each tick is skipped entirely while the chain is not running. The loop
/// owns `cancel`, distinct from the chain's token, and observes it only at
/// the iteration boundary: a tick already underway finishes its writes.
pub fn spawn(
    mut config: AutoUpdateConfig,
    oracle: Arc<PriceOracle>,
    chain: Arc<Chain>,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        return None;
    }

    Some(tokio::spawn(async move {
        for asset in &config.assets {
            if !config.base_prices.contains_key(asset) {
                config
                    .base_prices
                    .insert(asset.clone(), oracle.starting_price(asset));
            }
        }
        info!(
            "auto-update started: pattern={:?}, interval={:?}, assets={:?}",
            config.pattern, config.interval, config.assets
        );

        let mut ticker = tokio::time::interval(config.interval);
        ticker.tick().await;
        let started = Instant::now();
        let mut update_count: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("auto-update stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if !chain.is_running() {
                        continue;
                    }
                    let elapsed = started.elapsed().as_secs_f64();
                    for asset in &config.assets {
                        let base = config.base_prices[asset];
                        let price = next_price(
                            config.pattern,
                            base,
                            config.volatility,
                            elapsed,
                            update_count,
                        );
                        oracle.set_price(asset, price);
                        config.base_prices.insert(asset.clone(), price);
                        debug!("auto-updated {asset}: {price:.2}");
                    }
                    update_count += 1;
                }
            }
        }
    }))
}
