use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use scholar_search::{Config, Dispatcher};

/// Federated scholarly paper search across multiple research sources
#[derive(Parser, Debug)]
#[command(name = "scholar-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search scholarly papers across multiple bibliographic providers", long_about = None)]
struct Cli {
    /// Request envelope as JSON; reads stdin when omitted
    #[arg(long, short)]
    request: Option<String>,

    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let raw = match cli.request {
        Some(request) => request,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read request from stdin")?;
            buffer
        }
    };

    // A malformed body still gets an envelope back; the dispatcher maps
    // the non-object value to an invalid-request error.
    let request: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);

    let dispatcher = Dispatcher::new(Config::from_env());
    let response = dispatcher.process(request).await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "scholar_search=warn",
        1 => "scholar_search=info",
        2 => "scholar_search=debug",
        _ => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
