//! Fetch Cache - command line front end
//!
//! Fetches JSON resources through a file-persisted response cache.

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fetch_cache::fetch::{Record, RecordSet};
use fetch_cache::{
    CacheStore, Config, EvictionPolicy, Expires, Expiry, FetchInterceptor, FetchOptions,
    FileBackend, HttpFetcher, PersistenceAdapter, Served,
};

/// Fetch JSON resources through a persistent response cache.
#[derive(Parser, Debug)]
#[command(name = "fetch_cache", version)]
struct Args {
    /// URLs to fetch
    #[arg(required = true)]
    urls: Vec<String>,

    /// Serve a cached copy first, then refresh from the network
    #[arg(long)]
    prefill: bool,

    /// Ignore cached copies and always fetch live
    #[arg(long, conflicts_with = "prefill")]
    no_cache: bool,

    /// Treat responses as arrays of records
    #[arg(long)]
    collection: bool,

    /// Lifetime of newly cached responses, in seconds
    #[arg(long, conflicts_with = "no_expiry")]
    expires: Option<u64>,

    /// Cache new responses without an expiry
    #[arg(long)]
    no_expiry: bool,
}

impl Args {
    fn options<R>(&self) -> FetchOptions<R> {
        let mut options = FetchOptions::new()
            .with_cache(!self.no_cache && !self.prefill)
            .with_prefill(self.prefill);
        if self.no_expiry {
            options = options.with_expires(Expires::Never);
        } else if let Some(secs) = self.expires {
            options = options.with_expires(Expires::After(secs));
        }
        options
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetch_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    info!(
        "Configuration loaded: persist={}, default_ttl={}s, slot={}, dir={}",
        config.persist,
        config.default_ttl,
        config.slot,
        config.cache_dir.display()
    );

    let backend = FileBackend::open(&config.cache_dir)
        .with_context(|| format!("opening cache directory {}", config.cache_dir.display()))?
        .with_quota(config.storage_quota);
    let persistence = PersistenceAdapter::from_config(&config, Arc::new(backend));
    let store = CacheStore::open(persistence, EvictionPolicy::new());
    info!("Cache primed with {} entries", store.len());

    let store = Arc::new(RwLock::new(store));
    let cache = FetchInterceptor::from_config(&config, store, HttpFetcher::new());

    let mut failures = 0;
    for url in &args.urls {
        let result = if args.collection {
            let mut set = RecordSet::new(url.as_str());
            let served = cache.fetch(&mut set, args.options()).await;
            served.map(|s| (s, Value::Array(set.records().to_vec())))
        } else {
            let mut record = Record::new(url.as_str());
            let served = cache.fetch(&mut record, args.options()).await;
            served.map(|s| (s, Value::Object(record.attributes().clone())))
        };

        match result {
            Ok((served, body)) => {
                let expiry = cache.store().read().await.get(url).map(|e| e.expires_at);
                report(url, served, expiry);
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Err(e) => {
                error!("{}: {}", url, e);
                failures += 1;
            }
        }
    }

    let stats = cache.stats().await;
    info!(
        "hits={} prefills={} misses={} stale={} evictions={} write_failures={} entries={} hit_rate={:.2} offload_rate={:.2}",
        stats.hits,
        stats.prefills,
        stats.misses,
        stats.stale,
        stats.evictions,
        stats.write_failures,
        stats.total_entries,
        stats.hit_rate(),
        stats.offload_rate()
    );

    if failures > 0 {
        bail!("{} of {} fetches failed", failures, args.urls.len());
    }
    Ok(())
}

fn report(url: &str, served: Served, expiry: Option<Expiry>) {
    let source = match served {
        Served::Cache => "cache",
        Served::Network => "network",
        Served::Refreshed => "cache, refreshed from network",
    };
    let until = match expiry {
        Some(Expiry::At(ms)) => DateTime::<Utc>::from_timestamp_millis(ms as i64)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| ms.to_string()),
        Some(Expiry::Never) => "never".to_string(),
        None => "not cached".to_string(),
    };
    eprintln!("{} (served from {}; expires {})", url, source, until);
}
