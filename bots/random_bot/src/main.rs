use clap::Parser;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tsuro::rules::{legal_actions, legal_initial_placements};
use tsuro::{BoardState, Color, InitialPlacement, IntermediatePlacement, PlayerState};
use tsuro_bot_utils::{Bot, Registration};

#[derive(Parser)]
struct Args {
    /// Server to connect to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Name to register with; the server picks one if unset
    #[arg(long)]
    name: Option<String>,

    /// Avatar color, e.g. "red"; the server picks one if unset
    #[arg(long, value_parser = parse_color)]
    color: Option<Color>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_color(s: &str) -> Result<Color, serde_json::Error> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let rng = StdRng::seed_from_u64(seed);

    let registration = Registration {
        name: args.name,
        color: args.color,
        strategy: Some(String::from("random")),
    };
    let addr = format!("{}:{}", args.host, args.port);
    let winners = RandomBot { rng }.run(&addr, registration)?;
    let winners: Vec<String> = winners.iter().map(|player| player.to_string()).collect();
    println!("Winners: {}", winners.join(", "));
    Ok(())
}

/// Picks uniformly among the legal placements.
struct RandomBot {
    rng: StdRng,
}

impl Bot for RandomBot {
    fn initial_placement(&mut self, me: &PlayerState, board: &BoardState) -> Option<InitialPlacement> {
        legal_initial_placements(board, me)
            .choose(&mut self.rng)
            .copied()
    }

    fn take_turn(&mut self, me: &PlayerState, board: &BoardState) -> Option<IntermediatePlacement> {
        legal_actions(board, me).choose(&mut self.rng).copied()
    }
}
