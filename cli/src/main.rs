//! chainrelay CLI — resilient JSON-RPC calls from the terminal.
//!
//! Usage:
//! ```bash
//! # Call a method on a chain, rotating across public endpoints
//! chainrelay call --chain 1 --method eth_blockNumber
//!
//! # Several methods in one JSON-RPC batch
//! chainrelay batch --chain 137 --methods eth_blockNumber,eth_gasPrice
//!
//! # Latency of every public endpoint for a chain
//! chainrelay probe --chain 42161
//!
//! # One request to one URL, no failover
//! chainrelay direct --url https://cloudflare-eth.com --method eth_chainId
//! ```

use std::env;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chainrelay_core::{
    ClientConfig, ClientRegistry, ClientSettings, ErrorEvent, FallbackEvent, RateLimitEvent,
    RpcCall, RpcError, SuccessEvent, TelemetryHooks,
};
use chainrelay_endpoints::{
    chain_name, dedicated_fallback, public_endpoints, supported_chain_ids, BuiltinChains, CHAINS,
};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    init_tracing(&args[2..]);

    let result = match args[1].as_str() {
        "call" => cmd_call(&args[2..]).await,
        "batch" => cmd_batch(&args[2..]).await,
        "endpoints" => cmd_endpoints(&args[2..]),
        "chains" => {
            cmd_chains();
            Ok(())
        }
        "probe" => cmd_probe(&args[2..]).await,
        "direct" => cmd_direct(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("chainrelay {}", env!("CARGO_PKG_VERSION"));
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
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("chainrelay {}", env!("CARGO_PKG_VERSION"));
    println!("Resilient JSON-RPC calls across public blockchain endpoints\n");
    println!("USAGE:");
    println!("    chainrelay <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    call       Call a method with rotation, retry and fallback");
    println!("    batch      Send several methods as one JSON-RPC batch");
    println!("    endpoints  Show the endpoint catalog for a chain");
    println!("    chains     List built-in chains");
    println!("    probe      Measure every public endpoint of a chain");
    println!("    direct     Send one request to one URL (no failover)");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --chain <ID>         Chain id                         [call, batch, endpoints, probe]");
    println!("    --method <NAME>      JSON-RPC method                  [call, direct]");
    println!("    --methods <A,B,..>   Comma-separated methods          [batch]");
    println!("    --params <JSON>      JSON array of params             [call, direct]");
    println!("    --config <FILE>      JSON client settings             [call, batch]");
    println!("    --url <URL>          Endpoint URL                     [direct]");
    println!("    --health             Show pool health afterwards      [call]");
    println!("    --timeout-ms <MS>    Request timeout (default 10000)  [direct, probe]");
    println!("    --json-logs          Emit logs as JSON");
    println!("    -v, --verbose        Debug logging (overrides RUST_LOG)");
}

fn init_tracing(args: &[String]) {
    let verbose = has_flag(args, "--verbose") || has_flag(args, "-v");
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let registry = tracing_subscriber::registry().with(filter);
    if has_flag(args, "--json-logs") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Logs client outcomes; attached to every client the CLI creates.
struct LogHooks;

impl TelemetryHooks for LogHooks {
    fn on_success(&self, e: &SuccessEvent<'_>) {
        tracing::debug!(endpoint = e.endpoint, method = e.method, latency_ms = e.latency_ms, "ok");
    }

    fn on_error(&self, e: &ErrorEvent<'_>) {
        tracing::info!(endpoint = e.endpoint, kind = %e.kind, error = %e.error, "attempt failed");
    }

    fn on_rate_limit(&self, e: &RateLimitEvent<'_>) {
        tracing::info!(endpoint = e.endpoint, "rate limited");
    }

    fn on_fallback(&self, e: &FallbackEvent<'_>) {
        tracing::info!(tier = %e.tier, endpoint = e.endpoint, "using fallback");
    }
}

fn registry() -> Result<ClientRegistry, String> {
    chainrelay_endpoints::default_registry().map_err(|e| e.to_string())
}

fn client_config(args: &[String], chain_id: u64) -> Result<ClientConfig, String> {
    let settings = match parse_flag(args, "--config") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {path}: {e}"))?;
            serde_json::from_str::<ClientSettings>(&raw)
                .map_err(|e| format!("invalid config {path}: {e}"))?
        }
        None => ClientSettings::default(),
    };
    Ok(settings
        .into_config(chain_id)
        .with_telemetry(Arc::new(LogHooks)))
}

async fn cmd_call(args: &[String]) -> Result<(), String> {
    let chain_id = parse_chain(args)?;
    let method = parse_flag(args, "--method").ok_or("--method is required")?;
    let params = parse_params(args)?;

    let registry = registry()?;
    let client = registry.get_client(chain_id, Some(client_config(args, chain_id)?));
    let outcome = client
        .call_with_metadata::<Value>(&method, params)
        .await
        .map_err(describe)?;

    println!("{}", serde_json::to_string_pretty(&outcome.result).unwrap_or_default());
    eprintln!("served by {} in {}ms", outcome.endpoint, outcome.latency_ms);
    if has_flag(args, "--health") {
        for record in client.health_snapshot() {
            eprintln!("  {:<48} {}", record.url, record.state());
        }
    }
    Ok(())
}

async fn cmd_batch(args: &[String]) -> Result<(), String> {
    let chain_id = parse_chain(args)?;
    let methods = parse_flag(args, "--methods").ok_or("--methods is required")?;
    let calls: Vec<RpcCall> = methods
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| RpcCall::new(m, vec![]))
        .collect();
    if calls.is_empty() {
        return Err("--methods must name at least one method".into());
    }

    let registry = registry()?;
    let client = registry.get_client(chain_id, Some(client_config(args, chain_id)?));
    let results = client.batch_call(calls.clone()).await.map_err(describe)?;

    for (call, result) in calls.iter().zip(&results) {
        println!("{:<28} {result}", call.method);
    }
    Ok(())
}

fn cmd_endpoints(args: &[String]) -> Result<(), String> {
    let chain_id = parse_chain(args)?;
    let pool = public_endpoints(chain_id);
    if pool.is_empty() && dedicated_fallback(chain_id).is_none() {
        return Err(format!("chain {chain_id} is not in the built-in catalog"));
    }

    println!(
        "Chain {chain_id} ({})\n",
        chain_name(chain_id).unwrap_or("unknown")
    );
    println!("  Public pool:");
    for (i, url) in pool.iter().enumerate() {
        println!("    {}. {url}", i + 1);
    }
    println!(
        "  Dedicated fallback: {}",
        dedicated_fallback(chain_id).unwrap_or("-")
    );
    let network_default = chainrelay_core::ChainRegistry::default_rpc_url(&BuiltinChains, chain_id);
    println!("  Network default:    {}", network_default.as_deref().unwrap_or("-"));
    Ok(())
}

fn cmd_chains() {
    let supported = supported_chain_ids();
    println!("Built-in chains:\n");
    for chain in CHAINS.iter().filter(|c| supported.contains(&c.chain_id)) {
        println!(
            "  {:>9}  {:<20} {:<5} {} public endpoint(s)",
            chain.chain_id,
            chain.name,
            chain.native_symbol,
            public_endpoints(chain.chain_id).len()
        );
    }
}

async fn cmd_probe(args: &[String]) -> Result<(), String> {
    let chain_id = parse_chain(args)?;
    let timeout = parse_timeout(args)?;
    let pool = public_endpoints(chain_id);
    if pool.is_empty() {
        return Err(format!("chain {chain_id} has no public endpoints"));
    }

    println!("Probing {} endpoint(s) for chain {chain_id}...\n", pool.len());
    let probes = pool.iter().map(|url| async move {
        let start = Instant::now();
        let block = chainrelay_http::direct_rpc_fetch::<String>(url, "eth_blockNumber", vec![], timeout)
            .await;
        (*url, block, start.elapsed())
    });

    let mut healthy = 0usize;
    for (url, block, elapsed) in futures::future::join_all(probes).await {
        match block {
            Ok(block) => {
                healthy += 1;
                let shown = display_block(&block);
                println!("  OK    {:>6}ms  block {shown:<12} {url}", elapsed.as_millis());
            }
            Err(e) => println!("  FAIL  {:>6}ms  {e}\n        {url}", elapsed.as_millis()),
        }
    }
    println!("\n{healthy}/{} endpoint(s) responded", pool.len());
    Ok(())
}

async fn cmd_direct(args: &[String]) -> Result<(), String> {
    let url = parse_flag(args, "--url").ok_or("--url is required")?;
    let method = parse_flag(args, "--method").ok_or("--method is required")?;
    let params = parse_params(args)?;
    let timeout = parse_timeout(args)?;

    let result: Value = chainrelay_http::direct_rpc_fetch(&url, &method, params, timeout)
        .await
        .map_err(describe)?;
    println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
    Ok(())
}

/// Decimal block number, or the node's raw reply if it is not a hex quantity.
fn display_block(raw: &str) -> String {
    raw.strip_prefix("0x")
        .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        .map_or_else(|| raw.to_string(), |n| n.to_string())
}

/// Error text, expanded with per-endpoint causes when every endpoint failed.
fn describe(err: RpcError) -> String {
    match err {
        RpcError::AllEndpointsFailed(all) => {
            let mut out = all.to_string();
            for failure in &all.errors {
                out.push_str(&format!("\n  {failure}"));
            }
            out
        }
        other => other.to_string(),
    }
}

fn parse_chain(args: &[String]) -> Result<u64, String> {
    let raw = parse_flag(args, "--chain").ok_or("--chain is required")?;
    raw.parse().map_err(|_| format!("invalid chain id: {raw}"))
}

fn parse_params(args: &[String]) -> Result<Vec<Value>, String> {
    match parse_flag(args, "--params") {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| format!("--params must be a JSON array: {e}")),
        None => Ok(vec![]),
    }
}

fn parse_timeout(args: &[String]) -> Result<Duration, String> {
    match parse_flag(args, "--timeout-ms") {
        Some(raw) => raw
            .parse()
            .map(Duration::from_millis)
            .map_err(|_| format!("invalid --timeout-ms: {raw}")),
        None => Ok(chainrelay_core::config::DEFAULT_REQUEST_TIMEOUT),
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_display() {
        assert_eq!(display_block("0x12d687"), "1234567");
        assert_eq!(display_block("0xnope"), "0xnope");
        assert_eq!(display_block("1234"), "1234");
        assert_eq!(display_block(""), "");
    }

    #[test]
    fn flag_parsing() {
        let args: Vec<String> = ["--chain", "137", "--health"].iter().map(|s| s.to_string()).collect();
        assert_eq!(parse_chain(&args), Ok(137));
        assert!(has_flag(&args, "--health"));
        assert_eq!(parse_flag(&args, "--method"), None);
    }
}
