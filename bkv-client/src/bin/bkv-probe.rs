//! # Cluster Probe
//!
//! Purpose: Provide a tiny diagnostic driver that pings a node, reports its
//! identity, and lists its buckets, so connectivity can be checked without
//! an application.
//!
//! Usage: `bkv-probe [host] [port] [pool_size]`

use std::env;
use std::time::Instant;

use anyhow::Context;

use bkv_client::{ClientConfig, KvClient};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8087;
const DEFAULT_POOL_SIZE: usize = 2;

struct ProbeConfig {
    host: String,
    port: u16,
    pool_size: usize,
}

impl ProbeConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        let host = args.next().unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(args.next(), DEFAULT_PORT);
        let pool_size = parse_or(args.next(), DEFAULT_POOL_SIZE);
        ProbeConfig {
            host,
            port,
            pool_size,
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, fallback: T) -> T {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let probe = ProbeConfig::from_args();
    let mut config = ClientConfig::new(probe.host.clone(), probe.port);
    config.pool_size = probe.pool_size;

    let client = KvClient::with_config(config).context("invalid configuration")?;

    let start = Instant::now();
    client
        .ping()
        .with_context(|| format!("ping {}:{}", probe.host, probe.port))?;
    println!("ping: ok ({:?})", start.elapsed());

    let info = client.server_info().context("server-info")?;
    println!("node: {}", info.node);
    println!("version: {}", info.version);

    let buckets = client.list_buckets().context("list-buckets")?;
    println!("buckets: {}", buckets.len());
    for bucket in buckets {
        println!("  {}", String::from_utf8_lossy(&bucket));
    }

    client.dispose();
    Ok(())
}
