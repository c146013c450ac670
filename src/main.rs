use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hn_newest::config::Config;
use hn_newest::pipeline::Pipeline;
use hn_newest::query::QueryServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hn-newest", version, about = "Newest Hacker News items, cached and searchable")]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/hn-newest/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    ttl_secs: Option<u64>,

    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[arg(long, global = true)]
    single_flight: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 启动 HTTP 服务（默认）
    Serve {
        #[arg(long)]
        listen: Option<String>,
    },
    /// 拉取一次并输出一页 JSON
    Query {
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long)]
        page_size: Option<i64>,
    },
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let mut cfg = Config::discover(self.config.as_deref())?;
        if let Some(url) = &self.base_url {
            cfg.base_url = url.clone();
        }
        if let Some(ttl) = self.ttl_secs {
            cfg.cache_ttl_secs = ttl;
        }
        if let Some(n) = self.concurrency {
            cfg.fetch_concurrency = n;
        }
        if self.single_flight {
            cfg.single_flight = true;
        }
        if let Some(Command::Serve { listen: Some(addr) }) = &self.command {
            cfg.listen = addr.clone();
        }
        Ok(cfg.validate()?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = cli.config()?;
    let pipeline = Arc::new(
        Pipeline::from_config(&cfg).context("failed to build HTTP client")?,
    );

    match cli.command {
        Some(Command::Query {
            search,
            page,
            page_size,
        }) => {
            let page = pipeline
                .query(
                    search.as_deref(),
                    page,
                    page_size.unwrap_or(cfg.page_size as i64),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
            eprint!("{}", pipeline.stats());
        }
        Some(Command::Serve { .. }) | None => {
            info!(
                "Starting hn-newest: upstream={} ttl={}s concurrency={} single_flight={}",
                cfg.base_url, cfg.cache_ttl_secs, cfg.fetch_concurrency, cfg.single_flight
            );

            // 预热缓存；失败不影响启动，首个请求会再次尝试
            if let Err(e) = pipeline.get_view().await {
                tracing::warn!("Initial warm-up failed: {}", e);
            }

            QueryServer::new(pipeline.clone()).run(&cfg.listen).await?;
            info!("Shutting down...\n{}", pipeline.stats());
        }
    }

    Ok(())
}
