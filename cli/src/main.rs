//! forkrpc CLI: send JSON-RPC calls and read fork configuration from the terminal.
//!
//! Usage:
//! ```bash
//! # Send a raw JSON-RPC call
//! forkrpc call --url https://cloudflare-eth.com --method eth_getBalance \
//!     --params '["0x0000000000000000000000000000000000000000", "latest"]'
//!
//! # Read chain id and head block in one batched POST
//! forkrpc fork-config --url https://cloudflare-eth.com --batch-wait 10 --batch-size 10
//! ```

use std::env;
use std::process;

use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use forkrpc_core::ForkConfig;
use forkrpc_http::{BatchConfig, HttpTransport, TransportConfig};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }
    init_logging(parse_flag(&args, "--log-level"));

    let result = match args[1].as_str() {
        "call" => cmd_call(&args[2..]).await,
        "fork-config" => cmd_fork_config(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("forkrpc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// `--log-level` wins over `RUST_LOG`; default is `warn` so retries show up.
fn init_logging(level: Option<String>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    println!("forkrpc {}", env!("CARGO_PKG_VERSION"));
    println!("JSON-RPC over HTTP with retries and request batching\n");
    println!("USAGE:");
    println!("    forkrpc <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    call         Send a single JSON-RPC call and print its result");
    println!("    fork-config  Print the chain id and latest block number");
    println!("    version      Print version");
    println!("    help         Print this help\n");
    println!("FLAGS:");
    println!("    --url <URL>           RPC endpoint URL  [required]");
    println!("    --method <METHOD>     JSON-RPC method   [call only, required]");
    println!("    --params <JSON>       JSON array of params  [call only, default: []]");
    println!("    --batch-wait <MS>     Enable batching with this window");
    println!("    --batch-size <N>      Max requests per batch  [default: 100]");
    println!("    --log-level <FILTER>  Log filter, overrides RUST_LOG  [default: warn]");
}

async fn cmd_call(args: &[String]) -> anyhow::Result<()> {
    let method = parse_flag(args, "--method").ok_or_else(|| anyhow!("--method is required"))?;
    let params = match parse_flag(args, "--params") {
        Some(raw) => parse_params(&raw)?,
        None => Vec::new(),
    };

    let transport = HttpTransport::new(transport_config(args)?)?;
    let result = transport.request(&method, params).await;
    transport.shutdown().await;

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn cmd_fork_config(args: &[String]) -> anyhow::Result<()> {
    let transport = HttpTransport::new(transport_config(args)?)?;
    let result = ForkConfig::from_rpc(&transport).await;
    transport.shutdown().await;

    let fork = result?;
    println!("  Chain ID:     {}", fork.chain_id);
    println!("  Block number: {}", fork.block_number);
    Ok(())
}

fn transport_config(args: &[String]) -> anyhow::Result<TransportConfig> {
    let url = parse_flag(args, "--url").ok_or_else(|| anyhow!("--url is required"))?;
    let mut config = TransportConfig::new(url);

    let wait = parse_flag(args, "--batch-wait");
    let size = parse_flag(args, "--batch-size");
    if wait.is_some() || size.is_some() {
        let mut batch = BatchConfig::default();
        if let Some(ms) = wait {
            batch.wait_ms = ms.parse().with_context(|| format!("invalid --batch-wait `{ms}`"))?;
        }
        if let Some(n) = size {
            batch.max_size = n.parse().with_context(|| format!("invalid --batch-size `{n}`"))?;
        }
        config = config.with_batch(batch);
    }
    tracing::debug!(url = %config.url, batching = config.batch.is_some(), "transport configured");
    Ok(config)
}

fn parse_params(raw: &str) -> anyhow::Result<Vec<Value>> {
    match serde_json::from_str(raw).context("--params is not valid JSON")? {
        Value::Array(items) => Ok(items),
        other => bail!("--params must be a JSON array, got {other}"),
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}
