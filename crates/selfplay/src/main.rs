//! Self-play episode generation and single-game analysis.
//!
//! Plays the built-in corridor environment with the MCTS engine and saves
//! every episode in MessagePack format for a training pipeline. The `play`
//! command runs one episode and prints per-move search statistics as JSON
//! lines.

mod config;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use playout_core::{ActionId, Environment};
use playout_mcts::{
    games::{Corridor, CorridorState},
    EpisodeSummary, Mcts, SearchStatistics, SelfPlay, SelfPlayConfig, TrainingExample,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{FileConfig, Overrides};

/// MCTS self-play and analysis tool.
#[derive(Parser)]
#[command(name = "playout-selfplay")]
#[command(about = "Generate self-play episodes and analyse games with MCTS")]
struct Cli {
    /// Log level (RUST_LOG takes precedence).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command.
#[derive(Args, Clone, Debug)]
struct CommonArgs {
    /// Path to a config.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of MCTS simulations per move.
    #[arg(short, long)]
    simulations: Option<usize>,

    /// Random seed for reproducibility.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Temperature for move selection (0 = greedy, 1 = proportional to visits).
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Moves after which an episode is cut off.
    #[arg(long)]
    max_moves: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate self-play episodes for training.
    Generate {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of episodes to generate.
        #[arg(short, long)]
        episodes: Option<usize>,

        /// Output directory for episode files.
        #[arg(short, long, default_value = "data/episodes")]
        output: PathBuf,
    },

    /// Play one episode, printing per-move statistics as JSON.
    Play {
        #[command(flatten)]
        common: CommonArgs,
    },
}

/// A complete self-play episode as written to disk.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EpisodeRecord {
    /// Episode index within the run.
    episode: usize,

    /// Seed of the agent that played it.
    seed: u64,

    /// One example per move.
    examples: Vec<TrainingExample<CorridorState>>,

    /// Move count, outcome and reward.
    summary: EpisodeSummary,
}

/// One line of `play` output.
#[derive(Serialize, Debug)]
struct MoveRecord {
    move_number: usize,
    state: CorridorState,
    action: ActionId,
    visit_counts: Vec<(ActionId, u32)>,
    root_value: f64,
    reward: f64,
    statistics: Option<SearchStatistics>,
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}

/// Load the config file and apply command-line overrides.
fn resolve_config(common: &CommonArgs, episodes: Option<usize>) -> Result<FileConfig> {
    let mut config = FileConfig::load(common.config.as_deref())?;
    config.apply(&Overrides {
        simulations: common.simulations,
        temperature: common.temperature,
        episodes,
        max_moves: common.max_moves,
    });
    config.validate()?;
    Ok(config)
}

/// Seed of the agent playing episode `index`.
fn episode_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64 * 1000)
}

/// Play a single episode with its own seeded agent.
fn generate_episode(env: &Corridor, config: &FileConfig, index: usize, seed: u64) -> Result<EpisodeRecord> {
    let agent = Mcts::new(config.mcts.clone(), ChaCha8Rng::seed_from_u64(seed))?;
    let selfplay = SelfPlayConfig {
        episodes: 1,
        ..config.selfplay.clone()
    };
    let mut driver = SelfPlay::new(env, agent, selfplay);

    let examples = driver
        .by_ref()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Episode {index} failed"))?;
    let summary = driver
        .last_episode()
        .cloned()
        .with_context(|| format!("Episode {index} did not finish"))?;

    debug!(
        episode = index,
        moves = summary.moves,
        outcome = summary.outcome,
        "Generated episode"
    );
    Ok(EpisodeRecord {
        episode: index,
        seed,
        examples,
        summary,
    })
}

/// Write one MessagePack file per episode into `output`.
fn write_episodes(records: &[EpisodeRecord], output: &Path) -> Result<()> {
    for record in records {
        let filename = output.join(format!("episode_{:06}.msgpack", record.episode));
        let file = File::create(&filename)
            .with_context(|| format!("Failed to create file: {}", filename.display()))?;
        let mut writer = BufWriter::new(file);
        // Use named fields to serialize structs as maps (not arrays)
        rmp_serde::encode::write_named(&mut writer, record)
            .with_context(|| format!("Failed to serialize episode {}", record.episode))?;
    }
    Ok(())
}

/// Run the generate command.
fn cmd_generate(config: &FileConfig, seed: u64, output: &Path) -> Result<Vec<EpisodeRecord>> {
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

    let env = config.corridor.build();
    let episodes = config.selfplay.episodes;
    info!(
        episodes,
        simulations = config.mcts.num_simulations,
        seed,
        output = %output.display(),
        "Generating self-play episodes"
    );

    let start = Instant::now();
    let records = (0..episodes)
        .into_par_iter()
        .map(|i| generate_episode(&env, config, i, episode_seed(seed, i)))
        .collect::<Result<Vec<_>>>()?;

    write_episodes(&records, output)?;

    let total_moves: usize = records.iter().map(|r| r.summary.moves).sum();
    let reached_goal = records.iter().filter(|r| r.summary.outcome > 0.5).count();
    info!(
        episodes,
        total_moves,
        avg_moves = total_moves as f64 / episodes.max(1) as f64,
        reached_goal,
        elapsed_s = start.elapsed().as_secs_f64(),
        "Generation complete"
    );

    Ok(records)
}

/// Run the play command, returning one record per move.
fn cmd_play(config: &FileConfig, seed: u64) -> Result<Vec<MoveRecord>> {
    let env = config.corridor.build();
    let mut mcts: Mcts<Corridor, _> = Mcts::new(config.mcts.clone(), ChaCha8Rng::seed_from_u64(seed))?;
    let mut state = env.initial_state();
    let mut moves = Vec::new();

    for move_number in 0..config.selfplay.max_moves {
        let temperature = mcts.config().effective_temperature(move_number);
        let Some(result) = mcts.analyze_with_temperature(&env, &state, temperature)? else {
            break;
        };
        let step = env.simulate_step(&state, result.action)?;

        let record = MoveRecord {
            move_number,
            state,
            action: result.action,
            visit_counts: result.visit_counts,
            root_value: result.root_value,
            reward: step.reward,
            statistics: mcts.statistics().cloned(),
        };
        println!("{}", serde_json::to_string(&record)?);
        moves.push(record);

        state = step.next_state;
        if step.done {
            break;
        }
        if !config.selfplay.reuse_tree || !mcts.update_root(result.action) {
            mcts.reset();
        }
    }

    info!(
        moves = moves.len(),
        final_state = %state,
        outcome = env.terminal_value(&state)?,
        "Episode finished"
    );
    Ok(moves)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Generate {
            common,
            episodes,
            output,
        } => {
            let config = resolve_config(&common, episodes)?;
            cmd_generate(&config, common.seed, &output)?;
        }
        Commands::Play { common } => {
            let config = resolve_config(&common, None)?;
            cmd_play(&config, common.seed)?;
        }
    }

    Ok(())
}
