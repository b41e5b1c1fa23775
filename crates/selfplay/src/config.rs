//! Configuration file loading.
//!
//! A `config.toml` holds one table per concern. Every table and field is
//! optional; missing values fall back to the built-in defaults, and
//! command-line flags override whatever the file says.
//!
//! ```toml
//! [mcts]
//! num_simulations = 200
//!
//! [selfplay]
//! episodes = 32
//!
//! [corridor]
//! length = 8
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use playout_mcts::{games::Corridor, MctsConfig, SelfPlayConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Shape of the built-in corridor environment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorConfig {
    /// Goal cell.
    pub length: u32,

    /// Step cap per episode.
    pub max_steps: u32,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            length: 8,
            max_steps: 40,
        }
    }
}

impl CorridorConfig {
    /// Build the environment.
    pub fn build(&self) -> Corridor {
        Corridor::new(self.length, self.max_steps)
    }
}

/// Everything a `config.toml` can set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub mcts: MctsConfig,
    pub selfplay: SelfPlayConfig,
    pub corridor: CorridorConfig,
}

/// Values given on the command line, applied over the file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub simulations: Option<usize>,
    pub temperature: Option<f64>,
    pub episodes: Option<usize>,
    pub max_moves: Option<usize>,
}

impl FileConfig {
    /// Load from `path`, or use defaults when no path is given.
    ///
    /// A path that was given but cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No config file given, using built-in defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line overrides.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(simulations) = overrides.simulations {
            self.mcts.num_simulations = simulations;
        }
        if let Some(temperature) = overrides.temperature {
            self.mcts.temperature = temperature;
        }
        if let Some(episodes) = overrides.episodes {
            self.selfplay.episodes = episodes;
        }
        if let Some(max_moves) = overrides.max_moves {
            self.selfplay.max_moves = max_moves;
        }
    }

    /// Check the settings that would otherwise fail deep inside a worker.
    pub fn validate(&self) -> Result<()> {
        self.mcts.validate().context("Invalid [mcts] settings")?;
        anyhow::ensure!(
            self.corridor.length > 0,
            "Invalid [corridor] settings: length must be at least 1"
        );
        anyhow::ensure!(
            !self.mcts.use_estimator,
            "Invalid [mcts] settings: no estimator is available to this tool"
        );
        Ok(())
    }
}
