// Configuration module for reading Population.toml
// This module provides the tunable parameters for boards, populations and the tick driver

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::trainer::PolicyKind;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub board: BoardConfig,
    pub population: PopulationConfig,
    pub timing: TimingConfig,
    pub parallel: ParallelConfig,
    pub outcome_log: OutcomeLogConfig,
}

/// Board dimensions shared by every instance of a generation
#[derive(Debug, Deserialize, Clone)]
pub struct BoardConfig {
    pub width: i32,
    pub height: i32,
}

/// Population sizing and seeding
#[derive(Debug, Deserialize, Clone)]
pub struct PopulationConfig {
    pub size: usize,
    /// Master seed; per-instance seeds are derived from it. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Ticks after which still-alive instances are retired. Unlimited when absent.
    #[serde(default)]
    pub max_ticks_per_generation: Option<u64>,
    pub policy: PolicyKind,
}

/// Tick driver cadence
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub ticks_per_second: f64,
}

impl TimingConfig {
    /// Interval between two scheduling ticks in milliseconds
    pub fn tick_interval_ms(&self) -> u64 {
        if self.ticks_per_second <= 0.0 {
            return 1000;
        }
        ((1000.0 / self.ticks_per_second).round() as u64).max(1)
    }
}

/// Worker-thread fan-out for the per-tick sweep
#[derive(Debug, Deserialize, Clone)]
pub struct ParallelConfig {
    pub enabled: bool,
    pub min_instances_for_parallel: usize,
}

/// Outcome log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutcomeLogConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Population.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed and validated configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Loads default configuration from Population.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Population.toml")
    }

    /// Rejects configurations the simulation cannot run
    pub fn validate(&self) -> Result<(), String> {
        if self.board.width < 3 || self.board.height < 1 {
            return Err(format!(
                "Board must be at least 3x1, got {}x{}",
                self.board.width, self.board.height
            ));
        }
        if self.population.size == 0 {
            return Err("Population size must be positive".to_string());
        }
        if self.population.max_ticks_per_generation == Some(0) {
            return Err("max_ticks_per_generation must be positive when set".to_string());
        }
        let rate = self.timing.ticks_per_second;
        if !rate.is_finite() || rate <= 0.0 {
            return Err("ticks_per_second must be positive".to_string());
        }
        Ok(())
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the values in Population.toml
    pub fn default_hardcoded() -> Self {
        Config {
            board: BoardConfig {
                width: 24,
                height: 24,
            },
            population: PopulationConfig {
                size: 50,
                seed: None,
                max_ticks_per_generation: Some(2000),
                policy: PolicyKind::RandomTurn,
            },
            timing: TimingConfig {
                ticks_per_second: 5.0,
            },
            parallel: ParallelConfig {
                enabled: true,
                min_instances_for_parallel: 16,
            },
            outcome_log: OutcomeLogConfig {
                enabled: false,
                log_file_path: "snake_outcomes.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            log::warn!(
                "Could not load Population.toml ({}), using hardcoded defaults",
                e
            );
            Self::default_hardcoded()
        })
    }
}
