// Population controller: advances a generation of instances in lockstep
//
// A generation is RUNNING until every instance is dead, then EVOLVING while
// outcomes go to the trainer and the next set of decision sources comes back.
// The hand-off happens inside `tick_all`, so callers only ever drive ticks.

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, ParallelConfig};
use crate::decision::DecisionSource;
use crate::grid::{GridError, GridInstance, GridSnapshot};
use crate::trainer::Trainer;
use crate::types::{DeathCause, GenerationSummary, Outcome};

#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("population size must be positive")]
    EmptyPopulation,
    #[error("trainer produced {actual} decision sources for a population of {expected}")]
    GenerationSizeMismatch { expected: usize, actual: usize },
    #[error("instance {index} failed its tick: {source}")]
    Instance {
        index: usize,
        #[source]
        source: GridError,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Running,
    Evolving,
}

/// How the per-tick sweep is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutionStrategy {
    Sequential,
    /// Instances spread over the rayon thread pool
    Parallel,
}

/// What one `tick_all` call did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Generation the swept instances belong to
    pub generation: u64,
    /// Instances still alive after the sweep
    pub alive: usize,
    /// Set when this call retired the generation
    pub retired: Option<RetiredGeneration>,
}

/// A generation as it was handed to the trainer
#[derive(Debug, Clone, PartialEq)]
pub struct RetiredGeneration {
    pub summary: GenerationSummary,
    /// Exactly the outcomes the trainer received, in instance order
    pub outcomes: Vec<Outcome>,
}

/// Read-only view of the whole population
#[derive(Debug, Clone, Serialize)]
pub struct PopulationSnapshot {
    pub generation: u64,
    pub phase: Phase,
    pub generation_ticks: u64,
    pub alive: usize,
    pub instances: Vec<GridSnapshot>,
    /// Decision source kind per instance, same order as `instances`
    pub sources: Vec<&'static str>,
}

struct Slot {
    grid: GridInstance,
    source: Arc<dyn DecisionSource>,
}

pub struct PopulationController {
    width: i32,
    height: i32,
    size: usize,
    max_ticks_per_generation: Option<u64>,
    parallel: ParallelConfig,
    slots: Vec<Slot>,
    generation: u64,
    generation_ticks: u64,
    phase: Phase,
    outcomes_reported: bool,
    trainer: Box<dyn Trainer>,
    seeds: StdRng,
    last_outcomes: Vec<Outcome>,
    last_summary: Option<GenerationSummary>,
}

impl PopulationController {
    /// Creates the controller and its first generation
    ///
    /// # Arguments
    /// * `config` - Board, population and parallelism settings
    /// * `trainer` - Supplies decision sources and receives outcomes
    pub fn new(config: &Config, trainer: Box<dyn Trainer>) -> Result<Self, PopulationError> {
        let size = config.population.size;
        if size == 0 {
            return Err(PopulationError::EmptyPopulation);
        }

        let master_seed = config.population.seed.unwrap_or_else(rand::random);
        info!(
            "Creating population of {} on a {}x{} board (seed {})",
            size, config.board.width, config.board.height, master_seed
        );

        let mut controller = PopulationController {
            width: config.board.width,
            height: config.board.height,
            size,
            max_ticks_per_generation: config.population.max_ticks_per_generation,
            parallel: config.parallel.clone(),
            slots: Vec::new(),
            generation: 0,
            generation_ticks: 0,
            phase: Phase::Running,
            outcomes_reported: false,
            trainer,
            seeds: StdRng::seed_from_u64(master_seed),
            last_outcomes: Vec::new(),
            last_summary: None,
        };

        let sources = controller.request_sources()?;
        controller.slots = controller.build_slots(sources)?;
        Ok(controller)
    }

    /// Advances every live instance by one tick
    ///
    /// When the sweep leaves no instance alive the generation is retired and
    /// the next one built before returning. If a previous hand-off failed the
    /// call retries it instead of sweeping.
    pub fn tick_all(&mut self) -> Result<TickReport, PopulationError> {
        if self.phase == Phase::Evolving {
            let generation = self.generation;
            let retired = self.evolve()?;
            return Ok(TickReport {
                generation,
                alive: 0,
                retired: Some(retired),
            });
        }

        let alive_before = self.alive_count();
        let strategy = Self::determine_strategy(alive_before, &self.parallel);
        let failures = match strategy {
            ExecutionStrategy::Sequential => self.sweep_sequential(),
            ExecutionStrategy::Parallel => self.sweep_parallel(),
        };
        self.generation_ticks += 1;

        if let Some(limit) = self.max_ticks_per_generation {
            if self.generation_ticks >= limit {
                self.retire_survivors(limit);
            }
        }

        let alive = self.alive_count();
        debug!(
            "Generation {} tick {}: {} -> {} alive ({:?})",
            self.generation, self.generation_ticks, alive_before, alive, strategy
        );

        if alive == 0 {
            self.phase = Phase::Evolving;
        }

        if let Some((index, source)) = failures.into_iter().next() {
            return Err(PopulationError::Instance { index, source });
        }

        let generation = self.generation;
        let retired = if self.phase == Phase::Evolving {
            Some(self.evolve()?)
        } else {
            None
        };

        Ok(TickReport {
            generation,
            alive,
            retired,
        })
    }

    fn determine_strategy(live: usize, parallel: &ParallelConfig) -> ExecutionStrategy {
        if parallel.enabled
            && live >= parallel.min_instances_for_parallel
            && rayon::current_num_threads() > 1
        {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Sequential
        }
    }

    fn sweep_sequential(&mut self) -> Vec<(usize, GridError)> {
        let mut failures = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.grid.is_dead() {
                continue;
            }
            if let Err(e) = slot.grid.tick(slot.source.as_ref()) {
                error!("Instance {} failed its tick: {}", index, e);
                failures.push((index, e));
            }
        }
        failures
    }

    fn sweep_parallel(&mut self) -> Vec<(usize, GridError)> {
        // Instances own all of their mutable state, so each one is an independent task
        let mut failures: Vec<(usize, GridError)> = self
            .slots
            .par_iter_mut()
            .enumerate()
            .filter(|(_, slot)| !slot.grid.is_dead())
            .filter_map(|(index, slot)| {
                slot.grid
                    .tick(slot.source.as_ref())
                    .err()
                    .map(|e| (index, e))
            })
            .collect();
        failures.sort_by_key(|(index, _)| *index);
        for (index, e) in &failures {
            error!("Instance {} failed its tick: {}", index, e);
        }
        failures
    }

    fn retire_survivors(&mut self, limit: u64) {
        let mut retired = 0;
        for slot in self.slots.iter_mut().filter(|s| !s.grid.is_dead()) {
            slot.grid.retire(DeathCause::TickLimit);
            retired += 1;
        }
        if retired > 0 {
            info!(
                "Generation {} hit the {}-tick cap, retiring {} survivors",
                self.generation, limit, retired
            );
        }
    }

    /// Reports outcomes, obtains new sources and rebuilds the instances
    fn evolve(&mut self) -> Result<RetiredGeneration, PopulationError> {
        let outcomes: Vec<Outcome> = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| slot.grid.outcome(index))
            .collect();
        let summary = GenerationSummary::from_outcomes(self.generation, self.generation_ticks, &outcomes);

        // A retried hand-off must not deliver the same outcomes twice
        if !self.outcomes_reported {
            self.trainer.report_outcomes(self.generation, &outcomes);
            self.outcomes_reported = true;
        }

        let sources = self.request_sources()?;
        let slots = self.build_slots(sources)?;

        info!(
            "Generation {} retired after {} ticks: best length {}, mean length {:.2}, mean alive ticks {:.1}",
            summary.generation,
            summary.ticks,
            summary.best_length,
            summary.mean_length,
            summary.mean_alive_ticks
        );

        self.slots = slots;
        self.generation += 1;
        self.generation_ticks = 0;
        self.last_outcomes = outcomes.clone();
        self.last_summary = Some(summary.clone());
        self.outcomes_reported = false;
        self.phase = Phase::Running;

        Ok(RetiredGeneration { summary, outcomes })
    }

    fn request_sources(&mut self) -> Result<Vec<Arc<dyn DecisionSource>>, PopulationError> {
        let sources = self.trainer.produce_generation(self.size);
        if sources.len() != self.size {
            warn!(
                "Trainer returned {} sources, expected {}",
                sources.len(),
                self.size
            );
            return Err(PopulationError::GenerationSizeMismatch {
                expected: self.size,
                actual: sources.len(),
            });
        }
        Ok(sources)
    }

    fn build_slots(
        &mut self,
        sources: Vec<Arc<dyn DecisionSource>>,
    ) -> Result<Vec<Slot>, GridError> {
        sources
            .into_iter()
            .map(|source| {
                let grid = GridInstance::new(self.width, self.height, self.seeds.random())?;
                Ok(Slot { grid, source })
            })
            .collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn generation_ticks(&self) -> u64 {
        self.generation_ticks
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn population_size(&self) -> usize {
        self.size
    }

    pub fn board_dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn alive_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.grid.is_dead()).count()
    }

    /// Instances of the current generation, in stable index order
    pub fn instances(&self) -> impl Iterator<Item = &GridInstance> {
        self.slots.iter().map(|s| &s.grid)
    }

    pub fn instance(&self, index: usize) -> Option<&GridInstance> {
        self.slots.get(index).map(|s| &s.grid)
    }

    /// Outcomes of the most recently retired generation
    pub fn last_outcomes(&self) -> &[Outcome] {
        &self.last_outcomes
    }

    pub fn last_summary(&self) -> Option<&GenerationSummary> {
        self.last_summary.as_ref()
    }

    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            generation: self.generation,
            phase: self.phase,
            generation_ticks: self.generation_ticks,
            alive: self.alive_count(),
            instances: self.slots.iter().map(|s| s.grid.snapshot()).collect(),
            sources: self.slots.iter().map(|s| s.source.kind()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{FixedDirection, KeepHeading};
    use crate::types::Direction;

    struct ScriptedTrainer {
        direction: Direction,
        reports: Vec<(u64, usize)>,
    }

    impl Trainer for ScriptedTrainer {
        fn report_outcomes(&mut self, generation: u64, outcomes: &[Outcome]) {
            self.reports.push((generation, outcomes.len()));
        }

        fn produce_generation(&mut self, population_size: usize) -> Vec<Arc<dyn DecisionSource>> {
            (0..population_size)
                .map(|_| Arc::new(FixedDirection(self.direction)) as Arc<dyn DecisionSource>)
                .collect()
        }
    }

    fn config(size: usize) -> Config {
        let mut config = Config::default_hardcoded();
        config.board.width = 8;
        config.board.height = 8;
        config.population.size = size;
        config.population.seed = Some(17);
        config.population.max_ticks_per_generation = None;
        config.parallel.enabled = false;
        config
    }

    #[test]
    fn test_reversal_population_retires_in_one_tick() {
        let trainer = ScriptedTrainer {
            direction: Direction::Left,
            reports: Vec::new(),
        };
        let mut controller = PopulationController::new(&config(4), Box::new(trainer)).unwrap();

        let report = controller.tick_all().unwrap();
        assert_eq!(report.generation, 0);
        assert_eq!(report.alive, 0);
        let retired = report.retired.expect("generation retired");
        assert_eq!(retired.summary.population_size, 4);
        assert_eq!(retired.outcomes.as_slice(), controller.last_outcomes());
        assert_eq!(controller.generation(), 1);
        assert_eq!(controller.phase(), Phase::Running);
        assert_eq!(controller.alive_count(), 4);
        assert!(controller
            .last_outcomes()
            .iter()
            .all(|o| o.death_cause == Some(DeathCause::SelfCollision) && o.alive_ticks == 0));
    }

    #[test]
    fn test_tick_cap_retires_survivors() {
        let mut cfg = config(3);
        cfg.population.max_ticks_per_generation = Some(5);
        let trainer = crate::trainer::PolicyTrainer::new(|_| -> Arc<dyn DecisionSource> {
            Arc::new(KeepHeading)
        });
        let mut controller = PopulationController::new(&cfg, Box::new(trainer)).unwrap();

        for _ in 0..4 {
            assert!(controller.tick_all().unwrap().retired.is_none());
        }
        let report = controller.tick_all().unwrap();
        let retired = report.retired.expect("cap retires the generation");
        assert_eq!(retired.summary.ticks, 5);
        assert_eq!(retired.outcomes.len(), 3);
        assert!(controller
            .last_outcomes()
            .iter()
            .all(|o| o.death_cause == Some(DeathCause::TickLimit) && o.alive_ticks == 5));
    }

    #[test]
    fn test_zero_population_is_rejected() {
        let trainer = ScriptedTrainer {
            direction: Direction::Up,
            reports: Vec::new(),
        };
        let mut cfg = config(1);
        cfg.population.size = 0;
        assert!(matches!(
            PopulationController::new(&cfg, Box::new(trainer)),
            Err(PopulationError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_same_seed_same_snapshots() {
        let build = || {
            let trainer = ScriptedTrainer {
                direction: Direction::Up,
                reports: Vec::new(),
            };
            PopulationController::new(&config(3), Box::new(trainer)).unwrap()
        };
        let mut a = build();
        let mut b = build();
        for _ in 0..6 {
            a.tick_all().unwrap();
            b.tick_all().unwrap();
        }
        let foods_a: Vec<_> = a.instances().map(|g| g.food()).collect();
        let foods_b: Vec<_> = b.instances().map(|g| g.food()).collect();
        assert_eq!(foods_a, foods_b);
    }

    #[test]
    fn test_snapshot_names_each_source() {
        let trainer = ScriptedTrainer {
            direction: Direction::Up,
            reports: Vec::new(),
        };
        let controller = PopulationController::new(&config(2), Box::new(trainer)).unwrap();
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.sources, vec!["fixed", "fixed"]);
        assert_eq!(snapshot.instances.len(), snapshot.sources.len());
    }
}
