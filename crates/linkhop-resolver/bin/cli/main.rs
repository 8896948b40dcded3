mod cli;

use crate::cli::{CacheBackendArg, Command, LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use jiff::SignedDuration;
use linkhop_cache::{MokaLinkCache, RedisLinkCache};
use linkhop_clicks::{ClickAggregator, ClickAggregatorConfig};
use linkhop_core::{ClickStore, LinkCache, ShortCode, UrlStore};
use linkhop_generator::RandomCodeGenerator;
use linkhop_resolver::{CreateLink, Redirector, ResolutionService, ResolverConfig};
use linkhop_storage::{InMemoryStore, MySqlStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        code_length = config.code_length,
        "starting linkhop"
    );

    let (urls, clicks) = open_store(&config).await?;
    let cache = open_cache(&config).await?;

    let resolver = ResolutionService::new(
        urls,
        cache,
        Arc::new(RandomCodeGenerator::os()),
        ResolverConfig::builder()
            .code_length(config.code_length)
            .build(),
    );

    match config.command {
        Command::Shorten {
            url,
            code,
            ttl_minutes,
        } => {
            let mut request = CreateLink::new(url);
            if let Some(code) = code {
                request = request.with_code(ShortCode::new(code)?);
            }
            if let Some(minutes) = ttl_minutes {
                request = request.with_ttl(SignedDuration::from_mins(minutes));
            }

            let link = resolver.create_and_warm(request).await?;
            println!("{}\t{}\t{}", link.code, link.original_url, link.expire_at);
        }
        Command::Resolve { code, times } => {
            let code = ShortCode::new(code)?;
            let aggregator = ClickAggregator::spawn(
                clicks,
                ClickAggregatorConfig::builder()
                    .queue_capacity(config.click_queue_capacity)
                    .flush_interval(Duration::from_millis(config.click_flush_interval_ms))
                    .build(),
            );
            let redirector = Redirector::new(resolver, aggregator.recorder());

            let mut outcome = Ok(());
            for _ in 0..times {
                match redirector.redirect(&code).await {
                    Ok(url) => println!("{url}"),
                    Err(e) => {
                        outcome = Err(e);
                        break;
                    }
                }
            }

            // Flush pending clicks even when resolution failed.
            let stats = aggregator.drain().await;
            info!(
                accepted = stats.accepted,
                dropped = stats.dropped,
                flushed_clicks = stats.flushed_clicks,
                "click aggregator drained"
            );
            outcome.with_context(|| format!("failed to resolve {code}"))?;
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn open_store(config: &CLI) -> anyhow::Result<(Arc<dyn UrlStore>, Arc<dyn ClickStore>)> {
    match config.storage {
        StorageBackendArg::InMemory => {
            let store = Arc::new(InMemoryStore::new());
            let urls: Arc<dyn UrlStore> = store.clone();
            let clicks: Arc<dyn ClickStore> = store;
            Ok((urls, clicks))
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = Arc::new(MySqlStore::connect(dsn).await?);
            let urls: Arc<dyn UrlStore> = store.clone();
            let clicks: Arc<dyn ClickStore> = store;
            Ok((urls, clicks))
        }
    }
}

async fn open_cache(config: &CLI) -> anyhow::Result<Arc<dyn LinkCache>> {
    let cache: Arc<dyn LinkCache> = match config.cache {
        CacheBackendArg::Moka => Arc::new(MokaLinkCache::new()),
        CacheBackendArg::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("redis url is required when cache backend is redis")?;
            let client = redis::Client::open(url)?;
            let conn = client.get_multiplexed_async_connection().await?;
            Arc::new(RedisLinkCache::new(conn))
        }
    };
    Ok(cache)
}
