use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tsuro::GameConfig;
use tsuro_server::{serve, ServerConfig};

#[derive(Parser)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// The game does not start with fewer players
    #[arg(long, default_value_t = 3)]
    min_players: usize,

    /// The game starts as soon as this many players joined
    #[arg(long, default_value_t = 8)]
    max_players: usize,

    /// Seconds to wait for more players before starting with at least the minimum
    #[arg(long, default_value_t = 30)]
    join_timeout_secs: u64,

    /// Seconds a player has for each action
    #[arg(long, default_value_t = 10)]
    turn_timeout_secs: u64,

    /// How many invalid actions in a row a player may submit before being disqualified
    #[arg(long, default_value_t = 2)]
    max_retries: u8,

    /// Number of tiles in a full hand
    #[arg(long, default_value_t = 3)]
    hand_size: usize,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    anyhow::ensure!(
        args.min_players >= 1 && args.min_players <= args.max_players,
        "--min-players must be between 1 and --max-players"
    );

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed);
    let rng = StdRng::seed_from_u64(seed);

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        join_timeout: Duration::from_secs(args.join_timeout_secs),
        turn_timeout: Duration::from_secs(args.turn_timeout_secs),
    };
    let game_config = GameConfig {
        min_players: args.min_players,
        max_players: args.max_players,
        hand_size: args.hand_size,
        max_retries: args.max_retries,
    };

    let winners = serve(config, game_config, rng).await?;
    info!(?winners, "Done");
    Ok(())
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().event_format(format))
        .with(filter)
        .init();
}
