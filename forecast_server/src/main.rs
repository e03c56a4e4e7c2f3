//! Forecast service entry point

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use forecast_core::{DataLoader, ForecastParams, ForecastPipeline};
use forecast_server::{run_server, PredictResponse, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nyxs-forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-step forecasting of multivariate time series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host (overrides FORECAST_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides FORECAST_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Forecast a series stored in a JSON or CSV file
    Predict {
        /// Input file; `.csv` is read as CSV, anything else as a JSON array of rows
        #[arg(short, long)]
        input: PathBuf,

        /// Number of future periods
        #[arg(long, default_value = "10", allow_negative_numbers = true)]
        periods: i64,

        /// Share of the series used as the window length
        #[arg(long, default_value = "0.1")]
        ratio: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Serve { host, port } => {
            let config = ServerConfig::from_env().with_overrides(host, port);
            run_server(config).await
        }
        Commands::Predict {
            input,
            periods,
            ratio,
        } => {
            let response =
                tokio::task::spawn_blocking(move || predict_file(&input, periods, ratio)).await??;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

fn predict_file(input: &Path, periods: i64, ratio: f64) -> anyhow::Result<PredictResponse> {
    let is_csv = input
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
    let series = if is_csv {
        DataLoader::from_csv(input)
    } else {
        DataLoader::from_json(input)
    }
    .with_context(|| format!("Failed to load {}", input.display()))?;

    let pipeline = ForecastPipeline::new(ForecastParams::new(periods, ratio)?)?;
    let outcome = pipeline.run_series(&series)?;
    Ok(PredictResponse::from(&outcome))
}
