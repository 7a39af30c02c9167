//! Nerkh command-line converter.
//!
//! Converts amounts between IRT and foreign currencies using black-market
//! quotes, and between foreign currencies using a public rates API.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nerkh_common::{currency_name, DurationExt, SourceFamily, SourceId};
use nerkh_fx::adapters::{
    BonbastConfig, BonbastProvider, OpenErApiConfig, OpenErApiProvider, SnapshotProvider,
};
use nerkh_fx::{
    ConversionRequest, EngineConfig, FallbackProvider, RateProvider, ResolutionEngine,
    UnitCorrectionTable,
};

/// Nerkh currency converter
#[derive(Parser, Debug)]
#[command(name = "nerkh")]
#[command(about = "Currency conversion with black-market IRT rates")]
struct Args {
    /// Program that prints the bonbast JSON export
    #[arg(long, default_value = "python")]
    bonbast_program: String,

    /// Skip the bonbast export and use only snapshot files
    #[arg(long)]
    no_bonbast: bool,

    /// Scraper snapshot to fall back on, as SOURCE=PATH (repeatable)
    #[arg(long = "snapshot", value_parser = parse_snapshot_arg)]
    snapshots: Vec<(SourceId, PathBuf)>,

    /// Root URL of the general rates API
    #[arg(long, default_value = "https://open.er-api.com/v6")]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an amount from one currency to another
    Convert {
        /// Amount to convert; thousands separators are accepted
        amount: String,
        /// Source currency code
        from: String,
        /// Target currency code
        to: String,
    },
    /// List supported currencies
    Currencies,
}

fn parse_snapshot_arg(value: &str) -> Result<(SourceId, PathBuf), String> {
    match value.split_once('=') {
        Some((source, path)) if !source.trim().is_empty() && !path.is_empty() => {
            Ok((SourceId::new(source.trim()), PathBuf::from(path)))
        }
        _ => Err(format!("expected SOURCE=PATH, got '{value}'")),
    }
}

fn black_market_provider(
    args: &Args,
    config: &EngineConfig,
    corrections: &Arc<UnitCorrectionTable>,
) -> Arc<dyn RateProvider> {
    let mut providers: Vec<Arc<dyn RateProvider>> = Vec::new();

    // Each source gets the shorter budget so a hung one leaves time for the next
    let budget = config.provider_timeout.as_std();

    if !args.no_bonbast {
        let bonbast = BonbastConfig {
            program: args.bonbast_program.clone(),
            timeout: budget,
            ..Default::default()
        };
        providers.push(Arc::new(BonbastProvider::new(bonbast, corrections.clone())));
    }

    for (source, path) in &args.snapshots {
        providers.push(Arc::new(
            SnapshotProvider::new(source.clone(), path).with_timeout(budget),
        ));
    }

    Arc::new(FallbackProvider::new(
        SourceId::new("black-market"),
        SourceFamily::BlackMarket,
        providers,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so stdout carries only results
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(anyhow::anyhow!("Configuration error: {}", e));
        }
    };

    let corrections = Arc::new(UnitCorrectionTable::standard());
    let black_market = black_market_provider(&args, &config, &corrections);
    let general = Arc::new(OpenErApiProvider::new(OpenErApiConfig {
        base_url: args.api_url.clone(),
        timeout: config.fetch_timeout.as_std(),
    }));

    let engine = ResolutionEngine::new(black_market, general, config);

    match args.command {
        Command::Currencies => {
            for code in engine.list_supported_currencies() {
                println!("{:<5} {}", code, currency_name(&code));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Convert { amount, from, to } => {
            let request = match ConversionRequest::parse(&amount, &from, &to) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("{}: {}", e.user_message(), e);
                    return Ok(ExitCode::from(2));
                }
            };

            info!(from = %request.from, to = %request.to, "Converting");

            match engine.resolve(request).await {
                Ok(result) => {
                    println!("{} {}", result.display, result.currency);
                    if result.is_stale {
                        eprintln!("note: rate data may be outdated");
                    }
                    info!(route = %result.route, stale = result.is_stale, "Conversion complete");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot_arg() {
        let (source, path) = parse_snapshot_arg("TGJU=/var/lib/nerkh/tgju_live.json").unwrap();
        assert_eq!(source, SourceId::tgju());
        assert_eq!(path, PathBuf::from("/var/lib/nerkh/tgju_live.json"));

        assert!(parse_snapshot_arg("tgju_live.json").is_err());
        assert!(parse_snapshot_arg("=x.json").is_err());
    }

    #[test]
    fn test_black_market_chain_includes_snapshots() {
        let args = Args::try_parse_from([
            "nerkh",
            "--snapshot",
            "tgju=tgju_live.json",
            "--snapshot",
            "alanchand=alanchand_live.json",
            "currencies",
        ])
        .unwrap();
        let provider = black_market_provider(
            &args,
            &EngineConfig::default(),
            &Arc::new(UnitCorrectionTable::standard()),
        );

        assert_eq!(provider.source(), &SourceId::new("black-market"));
        assert_eq!(provider.family(), SourceFamily::BlackMarket);
    }

    #[test]
    fn test_cli_parses_convert() {
        let args = Args::try_parse_from([
            "nerkh",
            "--no-bonbast",
            "--snapshot",
            "alanchand=alanchand_live.json",
            "convert",
            "1,000",
            "eur",
            "irt",
        ])
        .unwrap();

        assert!(args.no_bonbast);
        assert_eq!(args.snapshots.len(), 1);
        assert!(matches!(args.command, Command::Convert { ref amount, .. } if amount == "1,000"));
    }
}
