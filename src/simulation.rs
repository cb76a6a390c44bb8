// Simulation service shared by the HTTP handlers and the tick driver
//
// Wraps the population controller behind a lock, owns the steering hub that
// feeds manual sources and forwards retired generations to the outcome log.

use log::{error, info};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::decision::SteeringHub;
use crate::outcome_log::OutcomeLogger;
use crate::population::{
    PopulationController, PopulationError, PopulationSnapshot, RetiredGeneration, TickReport,
};
use crate::trainer::{PolicyTrainer, Trainer};
use crate::types::Direction;

pub struct Simulation {
    controller: Mutex<PopulationController>,
    steering: Arc<SteeringHub>,
    logger: OutcomeLogger,
    config: Config,
}

impl Simulation {
    /// Creates a simulation driven by the built-in policy named in the config
    pub fn new(config: Config, logger: OutcomeLogger) -> Result<Self, PopulationError> {
        let steering = Arc::new(SteeringHub::new());
        let trainer_seed = match config.population.seed {
            Some(seed) => seed.wrapping_add(1),
            None => rand::random(),
        };
        let trainer =
            PolicyTrainer::for_kind(config.population.policy, steering.clone(), trainer_seed);
        Self::with_trainer(config, Box::new(trainer), steering, logger)
    }

    /// Creates a simulation around an external trainer
    ///
    /// # Arguments
    /// * `config` - Static configuration for the lifetime of the simulation
    /// * `trainer` - Produces decision sources and receives outcomes
    /// * `steering` - Hub fed by `steer`; manual sources register with it
    /// * `logger` - Destination for retired generations
    pub fn with_trainer(
        config: Config,
        trainer: Box<dyn Trainer>,
        steering: Arc<SteeringHub>,
        logger: OutcomeLogger,
    ) -> Result<Self, PopulationError> {
        let controller = PopulationController::new(&config, trainer)?;
        Ok(Simulation {
            controller: Mutex::new(controller),
            steering,
            logger,
            config,
        })
    }

    /// Returns simulation metadata
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        let controller = self.controller.lock();
        json!({
            "apiversion": "1",
            "generation": controller.generation(),
            "population_size": controller.population_size(),
            "alive": controller.alive_count(),
            "board": {
                "width": self.config.board.width,
                "height": self.config.board.height,
            },
            "policy": self.config.population.policy,
            "ticks_per_second": self.config.timing.ticks_per_second,
        })
    }

    /// Corresponds to GET /state endpoint
    pub fn snapshot(&self) -> PopulationSnapshot {
        self.controller.lock().snapshot()
    }

    /// Corresponds to GET /outcomes endpoint
    pub fn last_generation(&self) -> Value {
        let controller = self.controller.lock();
        json!({
            "summary": controller.last_summary(),
            "outcomes": controller.last_outcomes(),
        })
    }

    /// Buffers a manual direction for the next tick of every manual snake
    /// Corresponds to POST /steer endpoint
    pub fn steer(&self, direction: Direction) {
        self.steering.push(direction);
    }

    /// Runs one scheduling tick
    pub fn step(&self) -> Result<TickReport, PopulationError> {
        self.controller.lock().tick_all()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.timing.tick_interval_ms())
    }

    /// Drives the simulation at the configured cadence until the task is dropped
    ///
    /// Ticks run on the blocking pool since a sweep may fan out over rayon.
    /// Tick errors are logged and the driver keeps going.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.tick_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            "Tick driver started at {} ticks/s",
            self.config.timing.ticks_per_second
        );

        loop {
            interval.tick().await;

            let sim = self.clone();
            let result = match tokio::task::spawn_blocking(move || sim.step()).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Tick task panicked: {}", e);
                    continue;
                }
            };

            match result {
                Ok(TickReport {
                    retired: Some(RetiredGeneration { summary, outcomes }),
                    ..
                }) => {
                    self.logger.log_generation(summary, outcomes);
                }
                Ok(_) => {}
                Err(e) => error!("Tick failed: {}", e),
            }
        }
    }
}
