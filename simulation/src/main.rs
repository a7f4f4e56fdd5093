//! Hintnet experiment runner
//!
//! Runs one strategy, or the whole roster, over a line or tree cache
//! network with a Zipf workload and prints the measured counters.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hintnet_simulation::{experiment, scenario};
use hintnet_strategies::{StrategyParams, STRATEGY_NAMES};

#[derive(Parser)]
#[command(
    name = "hintnet",
    about = "Cache network strategy experiments",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Strategy name, or "ALL" for the whole roster
    #[arg(short, long, global = true, default_value = "DFIB")]
    strategy: String,

    /// Catalog size
    #[arg(long, global = true, default_value = "1000")]
    contents: u64,

    /// Cache capacity at every caching node
    #[arg(long, global = true, default_value = "16")]
    cache_size: usize,

    /// Warmup requests (not measured)
    #[arg(long, global = true, default_value = "2000")]
    warmup: usize,

    /// Measured requests
    #[arg(long, global = true, default_value = "5000")]
    requests: usize,

    /// Zipf skew of the workload
    #[arg(long, global = true, default_value = "0.8")]
    alpha: f64,

    /// Exploration budget beyond the shortest path
    #[arg(long, global = true, default_value = "1")]
    extra_quota: u32,

    /// Workload and strategy seed
    #[arg(long, global = true, default_value = "0")]
    seed: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Line network: receiver - caches - source
    Line {
        /// Total nodes on the line
        #[arg(short, long, default_value = "6")]
        nodes: u32,
    },

    /// Complete tree: source at the root, receivers at the leaves
    Tree {
        /// Tree depth
        #[arg(short, long, default_value = "3")]
        depth: u32,

        /// Children per node
        #[arg(short, long, default_value = "2")]
        arity: u32,

        /// Connect siblings on interior levels
        #[arg(short, long)]
        cross_links: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut params = StrategyParams::default();
    params.extra_quota = cli.extra_quota;
    params.seed = cli.seed;

    let build_scenario = || match &cli.command {
        Commands::Line { nodes } => scenario::line(*nodes, cli.cache_size, cli.contents),
        Commands::Tree {
            depth,
            arity,
            cross_links,
        } => scenario::tree(*depth, *arity, cli.cache_size, cli.contents, *cross_links),
    };

    let names: Vec<&str> = if cli.strategy == "ALL" {
        STRATEGY_NAMES.to_vec()
    } else {
        vec![cli.strategy.as_str()]
    };

    for name in names {
        let exp = experiment::Experiment {
            strategy: name.to_string(),
            params: params.clone(),
            warmup: cli.warmup,
            requests: cli.requests,
            alpha: cli.alpha,
        };
        let stats = exp.run(build_scenario())?;
        println!("{}", experiment::summarize(name, &stats));
    }

    Ok(())
}
