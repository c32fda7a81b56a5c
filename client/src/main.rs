//! Ratekeeper Client
//!
//! Interactive shell and load generator for a ratekeeper server.

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod command;
mod load;
mod metrics;
mod repl;

use api::RatesClient;
use load::LoadOptions;

/// Ratekeeper client CLI
#[derive(Parser, Debug)]
#[command(name = "ratekeeper-client")]
#[command(about = "Interactive client for the ratekeeper service")]
struct Args {
    /// Server address with port
    #[arg(long, default_value = "http://localhost:8080")]
    addr: String,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Fire random update requests and print a latency summary
    Load {
        /// Number of update requests
        #[arg(short, long, default_value = "100")]
        requests: usize,

        /// Requests in flight at once
        #[arg(short, long, default_value = "8")]
        concurrency: usize,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let client = RatesClient::new(&args.addr)?;

    match args.command {
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            repl::run(&client, stdin, &mut stdout).await?;
        }
        Some(Mode::Load {
            requests,
            concurrency,
            seed,
        }) => {
            let options = LoadOptions {
                requests,
                concurrency,
                seed,
            };
            let report = load::run_load(&client, &options).await?;

            info!("Load run complete");
            println!("{}", report.metrics);
            println!("Elapsed: {:.2}s", report.elapsed.as_secs_f64());
            println!(
                "Throughput: {:.1} req/s",
                report.metrics.throughput(report.elapsed)
            );
        }
    }

    Ok(())
}
