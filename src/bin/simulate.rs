use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use fruit_arena_server::config::ArenaSettings;
use fruit_arena_server::engine::{fruit_key, ArenaEngine};
use fruit_arena_server::rng::ArenaRng;
use fruit_arena_server::types::{ArenaState, Direction, MoveCommand};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive an arena with random bots and check its invariants")]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 6)]
    players: usize,
    #[arg(long, default_value_t = 2_000)]
    moves: usize,
    /// Drop one random fruit every N rounds (0 disables).
    #[arg(long, default_value_t = 5)]
    drop_every: usize,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct SimulationResult {
    seed: u64,
    players: usize,
    rounds: usize,
    #[serde(rename = "movesApplied")]
    moves_applied: usize,
    #[serde(rename = "movesRejected")]
    moves_rejected: usize,
    #[serde(rename = "fruitCollected")]
    fruit_collected: i64,
    collisions: usize,
    #[serde(rename = "valueExploded")]
    value_exploded: i64,
    #[serde(rename = "autoDropped")]
    auto_dropped: i64,
    #[serde(rename = "finalScores")]
    final_scores: Vec<(String, i32)>,
    #[serde(rename = "fruitOnBoard")]
    fruit_on_board: i64,
    anomalies: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = match resolve_settings(&cli) {
        Ok(settings) => settings,
        Err(message) => {
            error!(error = %message, "invalid simulation settings");
            std::process::exit(2);
        }
    };
    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    });

    info!(seed, players = cli.players, moves = cli.moves, "simulation started");
    let result = run_simulation(settings, seed, cli.players, cli.moves, cli.drop_every);
    for anomaly in &result.anomalies {
        warn!(anomaly = %anomaly, "anomaly detected");
    }

    match serde_json::to_string(&result) {
        Ok(line) => println!("{line}"),
        Err(err) => {
            error!(error = %err, "failed to serialize result");
            std::process::exit(2);
        }
    }

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &result) {
            error!(path = %path.display(), error = %err, "summary write failed");
            std::process::exit(2);
        }
    }

    info!(
        collisions = result.collisions,
        anomalies = result.anomalies.len(),
        "simulation finished"
    );
    if !result.anomalies.is_empty() {
        std::process::exit(1);
    }
}

fn resolve_settings(cli: &Cli) -> Result<ArenaSettings, String> {
    let mut settings = match cli.settings.as_ref() {
        Some(path) => ArenaSettings::load(path).map_err(|err| err.to_string())?,
        None => ArenaSettings::default(),
    };
    if let Some(width) = cli.width {
        settings.screen.width = width;
    }
    if let Some(height) = cli.height {
        settings.screen.height = height;
    }
    settings.validate().map_err(|err| err.to_string())?;
    Ok(settings)
}

fn run_simulation(
    settings: ArenaSettings,
    seed: u64,
    players: usize,
    rounds: usize,
    drop_every: usize,
) -> SimulationResult {
    let mut engine = ArenaEngine::with_seed(settings, seed);
    let mut bots = ArenaRng::new(seed.wrapping_add(1));
    for idx in 0..players {
        engine.add_player(&format!("bot_{}", idx + 1), None, None);
    }

    let mut expected_total = engine.total_score() + engine.total_fruit_value();
    let mut result = SimulationResult {
        seed,
        players,
        rounds,
        moves_applied: 0,
        moves_rejected: 0,
        fruit_collected: 0,
        collisions: 0,
        value_exploded: 0,
        auto_dropped: 0,
        final_scores: Vec::new(),
        fruit_on_board: 0,
        anomalies: Vec::new(),
    };
    let mut seen = HashSet::new();

    for round in 0..rounds {
        if drop_every > 0 && round % drop_every == 0 {
            if let Some(fruit) = engine.add_random_fruit() {
                let dropped = engine.config().auto_drop_fruit_value as i64;
                expected_total += dropped;
                result.auto_dropped += dropped;
                if engine.require_fruit(&fruit.id).is_err() {
                    push_anomaly(&mut result.anomalies, &mut seen, round, "dropped fruit missing");
                }
            }
        }

        for idx in 0..players {
            let dir = Direction::ALL[bots.pick_index(Direction::ALL.len())];
            let command = MoveCommand {
                player_id: format!("bot_{}", idx + 1),
                key_pressed: dir.key().to_string(),
            };
            match engine.move_player(command) {
                Ok(report) => {
                    result.moves_applied += 1;
                    result.fruit_collected += report.fruit_collected as i64;
                    result.collisions += report.collisions.len();
                    for hit in &report.collisions {
                        result.value_exploded += hit.total_fruits as i64;
                        if hit.total_fruits != hit.discount_other + hit.discount_self {
                            push_anomaly(
                                &mut result.anomalies,
                                &mut seen,
                                round,
                                "collision total differs from discounts",
                            );
                        }
                    }
                }
                Err(_) => result.moves_rejected += 1,
            }
        }

        let state = engine.state();
        for message in collect_state_anomalies(&state, expected_total) {
            push_anomaly(&mut result.anomalies, &mut seen, round, &message);
        }
    }

    let state = engine.state();
    result.final_scores = state
        .players
        .iter()
        .map(|player| (player.id.clone(), player.score))
        .collect();
    result.fruit_on_board = engine.total_fruit_value();
    result
}

fn collect_state_anomalies(state: &ArenaState, expected_total: i64) -> Vec<String> {
    let mut anomalies = Vec::new();
    let (width, height) = (state.screen.width, state.screen.height);

    for player in &state.players {
        if player.x < 0 || player.x >= width || player.y < 0 || player.y >= height {
            anomalies.push(format!("player out of bounds: {}", player.id));
        }
        if player.score < 0 {
            anomalies.push(format!("negative score: {}", player.id));
        }
    }

    let mut keys = HashSet::new();
    for fruit in &state.fruits {
        if fruit.x < 0 || fruit.x >= width || fruit.y < 0 || fruit.y >= height {
            anomalies.push(format!("fruit out of bounds: {}", fruit.id));
        }
        if fruit.id != fruit_key(fruit.x, fruit.y) {
            anomalies.push(format!("fruit id does not match its cell: {}", fruit.id));
        }
        if fruit.quantity < 1 {
            anomalies.push(format!("empty fruit left on board: {}", fruit.id));
        }
        if !keys.insert(fruit.id.clone()) {
            anomalies.push(format!("duplicate fruit: {}", fruit.id));
        }
    }

    let total: i64 = state.players.iter().map(|p| p.score as i64).sum::<i64>()
        + state.fruits.iter().map(|f| f.quantity as i64).sum::<i64>();
    if total != expected_total {
        anomalies.push(format!(
            "value not conserved: expected {expected_total}, found {total}"
        ));
    }
    anomalies
}

/// Messages are reported once; later repeats are dropped.
fn push_anomaly(anomalies: &mut Vec<String>, seen: &mut HashSet<String>, round: usize, message: &str) {
    if seen.insert(message.to_string()) {
        anomalies.push(format!("round {round}: {message}"));
    }
}

fn write_summary(path: &Path, result: &SimulationResult) -> io::Result<()> {
    let text = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
    std::fs::write(path, text)
}
