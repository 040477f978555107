//! Pool Tester CLI Tool
//!
//! Seeds an in-memory state store with synthetic players and drives the
//! matchmaking logic API against it, printing what comes back.
//!
//! Usage:
//!   cargo run --bin pool-tester -- --help
//!   cargo run --bin pool-tester -- --players 5000 resolve --filter mmr:1200:1800 --filter region:2:2
//!   cargo run --bin pool-tester -- propose --id match-1 --players p1,p2,p3
//!   cargo run --bin pool-tester -- scenario --rounds 5 --match-size 8

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use mmlogic::config::AppConfig;
use mmlogic::metrics::NullObserver;
use mmlogic::{
    Filter, InMemoryStateStore, MatchObject, MmLogicApi, PageSink, PlayerPool, Roster,
    StateStore,
};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pool-tester")]
#[command(about = "Exercise mmlogic pool resolution and proposals against a seeded store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Number of synthetic players to index
    #[arg(long, default_value = "1000")]
    players: usize,

    /// Players per streamed page
    #[arg(long, default_value = "250")]
    page_size: usize,

    /// Print every player id instead of page summaries
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one player pool
    Resolve {
        /// Pool name
        #[arg(short, long, default_value = "tester")]
        name: String,
        /// Filter as attribute:min:max (max 0 is unbounded)
        #[arg(short, long, required = true)]
        filter: Vec<String>,
    },
    /// Submit one proposal and show the resulting ignorelists
    Propose {
        /// Proposal id
        #[arg(short, long)]
        id: String,
        /// Comma-separated player ids
        #[arg(short, long, value_delimiter = ',')]
        players: Vec<String>,
        /// Report an error instead of a match
        #[arg(short, long)]
        error: Option<String>,
    },
    /// Repeatedly resolve a pool and propose matches from it
    Scenario {
        #[arg(short, long, default_value = "3")]
        rounds: usize,
        #[arg(short, long, default_value = "4")]
        match_size: usize,
    },
}

/// Prints a one-line summary per page
struct PrintingSink {
    verbose: bool,
    pages: Vec<PlayerPool>,
}

#[async_trait]
impl PageSink for PrintingSink {
    async fn send_page(&mut self, page: PlayerPool) -> mmlogic::Result<()> {
        println!("  📄 {} ({} players)", page.name, page.players().len());
        if self.verbose {
            for player in page.players() {
                println!("     {} {:?}", player.id, player.attributes);
            }
        }
        self.pages.push(page);
        Ok(())
    }
}

fn parse_filter(raw: &str) -> Result<Filter> {
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.as_slice() {
        [attribute, min, max] => Ok(Filter::new(
            *attribute,
            min.parse().with_context(|| format!("bad min in '{}'", raw))?,
            max.parse().with_context(|| format!("bad max in '{}'", raw))?,
        )),
        _ => Err(anyhow!("Filter must look like attribute:min:max, got '{}'", raw)),
    }
}

/// Deterministic synthetic attributes so runs are reproducible
fn seed_store(store: &InMemoryStateStore, players: usize) -> Result<()> {
    for i in 0..players {
        let id = format!("player-{:05}", i);
        let mmr = 800 + ((i * 7919) % 1600) as i64;
        let region = (i % 4) as i64 + 1;
        let latency = 10 + ((i * 31) % 190) as i64;
        store.index_player("mmr", &id, mmr)?;
        store.index_player("region", &id, region)?;
        store.index_player("latency", &id, latency)?;
    }
    Ok(())
}

async fn resolve(
    api: &MmLogicApi,
    pool: PlayerPool,
    verbose: bool,
) -> Result<Vec<mmlogic::PlayerId>> {
    let started = Instant::now();
    let mut sink = PrintingSink {
        verbose,
        pages: Vec::new(),
    };
    let pages = api.get_player_pool(pool, &mut sink).await?;

    if let Some(first) = sink.pages.first() {
        for filter in &first.filters {
            if let Some(stats) = filter.stats {
                println!(
                    "  🔎 {} [{}, {}] -> {} players in {:.4}s",
                    filter.attribute, filter.min, filter.max, stats.count, stats.elapsed
                );
            } else {
                println!(
                    "  🔎 {} [{}, {}] -> not evaluated",
                    filter.attribute, filter.min, filter.max
                );
            }
        }
    }

    let ids: Vec<_> = sink
        .pages
        .iter()
        .flat_map(|page| page.players().iter().map(|p| p.id.clone()))
        .collect();
    println!(
        "✅ {} players across {} pages in {:?}",
        ids.len(),
        pages,
        started.elapsed()
    );
    Ok(ids)
}

async fn propose(api: &MmLogicApi, proposal: MatchObject) -> Result<()> {
    let report = api.create_proposal(&proposal).await?;
    println!(
        "✅ Proposal {}: {} players ignored, enqueued={}, workers remaining={:?}",
        proposal.id, report.players_ignored, report.enqueued, report.workers_remaining
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = AppConfig::default();
    config.pool.page_size = cli.page_size;
    mmlogic::config::validate_config(&config)?;

    let store = Arc::new(InMemoryStateStore::new());
    seed_store(&store, cli.players)?;
    println!("🌱 Seeded {} players", cli.players);

    let api = MmLogicApi::new(store.clone(), &config, Arc::new(NullObserver));

    match cli.command {
        Commands::Resolve { name, filter } => {
            let filters = filter
                .iter()
                .map(|raw| parse_filter(raw))
                .collect::<Result<Vec<_>>>()?;
            println!("🎯 Resolving pool '{}'", name);
            resolve(&api, PlayerPool::new(name, filters), cli.verbose).await?;
        }
        Commands::Propose { id, players, error } => {
            let proposal = MatchObject {
                id,
                rosters: vec![Roster::from_player_ids(players)],
                error: error.unwrap_or_default(),
                ..Default::default()
            };
            propose(&api, proposal).await?;
        }
        Commands::Scenario { rounds, match_size } => {
            let match_size = match_size.max(1);
            store
                .increment(&config.proposals.worker_counter_key, rounds as i64)
                .await?;

            for round in 1..=rounds {
                println!("🔁 Round {}/{}", round, rounds);
                let pool = PlayerPool::new(
                    format!("round-{}", round),
                    vec![Filter::new("mmr", 1000, 2000), Filter::new("latency", 0, 120)],
                );
                let ids = resolve(&api, pool, cli.verbose).await?;

                let proposal = if ids.len() >= match_size {
                    MatchObject {
                        id: format!("match-{}", round),
                        rosters: vec![Roster::from_player_ids(
                            ids.into_iter().take(match_size),
                        )],
                        ..Default::default()
                    }
                } else {
                    MatchObject {
                        id: format!("match-{}", round),
                        error: "insufficient players".to_string(),
                        ..Default::default()
                    }
                };
                propose(&api, proposal).await?;
            }
        }
    }

    let ignored = api.get_all_ignored_players().await?;
    println!("🚫 {} players on ignorelists", ignored.players.len());
    let queued = store.set_members(&config.proposals.queue_name).await?;
    println!("📬 {} proposals queued: {:?}", queued.len(), queued);

    Ok(())
}
