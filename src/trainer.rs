// Trainer boundary between the simulation and an evolutionary optimizer
//
// The controller only ever talks to `Trainer`; how a trainer represents its
// population or turns outcomes into fitness is its own business.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::decision::{DecisionSource, KeepHeading, ManualInput, RandomTurn, SteeringHub};
use crate::types::{GenerationSummary, Outcome};

/// External collaborator that turns outcomes into the next population
pub trait Trainer: Send {
    /// Receives every instance's outcome, in instance order, before the next
    /// generation is requested.
    fn report_outcomes(&mut self, generation: u64, outcomes: &[Outcome]);

    /// Produces `population_size` decision sources, paired positionally with
    /// the new generation's instances.
    fn produce_generation(&mut self, population_size: usize) -> Vec<Arc<dyn DecisionSource>>;
}

/// Built-in source families for runs without an external optimizer
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Manual,
    RandomTurn,
    Straight,
}

type SourceFactory = Box<dyn FnMut(usize) -> Arc<dyn DecisionSource> + Send>;

/// Trainer that builds every generation from a factory and keeps history
///
/// It does no optimisation itself; it is the baseline used by the binaries
/// and the place to hang an optimizer that only needs outcome history.
pub struct PolicyTrainer {
    factory: SourceFactory,
    history: Vec<GenerationSummary>,
    last_outcomes: Vec<Outcome>,
}

impl PolicyTrainer {
    /// Creates a trainer whose factory is called once per instance index
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut(usize) -> Arc<dyn DecisionSource> + Send + 'static,
    {
        PolicyTrainer {
            factory: Box::new(factory),
            history: Vec::new(),
            last_outcomes: Vec::new(),
        }
    }

    /// Creates a trainer for one of the built-in policy families
    ///
    /// # Arguments
    /// * `kind` - Which source to hand out
    /// * `steering` - Hub that hands each manual source its own buffer
    /// * `seed` - Seeds the random-turn sources, one derived seed per source
    pub fn for_kind(kind: PolicyKind, steering: Arc<SteeringHub>, seed: u64) -> Self {
        let mut seeds = StdRng::seed_from_u64(seed);
        Self::new(move |_index| -> Arc<dyn DecisionSource> {
            match kind {
                PolicyKind::Manual => Arc::new(ManualInput::new(steering.register())),
                PolicyKind::RandomTurn => Arc::new(RandomTurn::new(seeds.random(), 0.2)),
                PolicyKind::Straight => Arc::new(KeepHeading),
            }
        })
    }

    pub fn history(&self) -> &[GenerationSummary] {
        &self.history
    }

    pub fn last_outcomes(&self) -> &[Outcome] {
        &self.last_outcomes
    }
}

impl Trainer for PolicyTrainer {
    fn report_outcomes(&mut self, generation: u64, outcomes: &[Outcome]) {
        let ticks = outcomes.iter().map(|o| o.alive_ticks).max().unwrap_or(0);
        let summary = GenerationSummary::from_outcomes(generation, ticks, outcomes);
        info!(
            "Trainer received generation {}: best length {}, mean alive ticks {:.1}",
            generation, summary.best_length, summary.mean_alive_ticks
        );
        self.history.push(summary);
        self.last_outcomes = outcomes.to_vec();
    }

    fn produce_generation(&mut self, population_size: usize) -> Vec<Arc<dyn DecisionSource>> {
        (0..population_size).map(|i| (self.factory)(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeathCause;

    #[test]
    fn test_produces_requested_cardinality() {
        let mut trainer = PolicyTrainer::for_kind(PolicyKind::Straight, Arc::new(SteeringHub::new()), 0);
        let sources = trainer.produce_generation(7);
        assert_eq!(sources.len(), 7);
        assert!(sources.iter().all(|s| s.kind() == "straight"));
    }

    #[test]
    fn test_manual_sources_get_their_own_buffers() {
        let hub = Arc::new(SteeringHub::new());
        let mut trainer = PolicyTrainer::for_kind(PolicyKind::Manual, hub.clone(), 0);
        let sources = trainer.produce_generation(2);
        assert!(sources.iter().all(|s| s.kind() == "manual"));
        assert_eq!(hub.live_buffers(), 2);

        // Releasing a generation releases its buffers
        drop(sources);
        let _next = trainer.produce_generation(2);
        assert_eq!(hub.live_buffers(), 2);
    }

    #[test]
    fn test_report_records_history() {
        let mut trainer = PolicyTrainer::new(|_| -> Arc<dyn DecisionSource> { Arc::new(KeepHeading) });
        let outcomes = vec![Outcome {
            index: 0,
            alive_ticks: 12,
            final_length: 4,
            death_cause: Some(DeathCause::SelfCollision),
        }];
        trainer.report_outcomes(0, &outcomes);
        assert_eq!(trainer.history().len(), 1);
        assert_eq!(trainer.history()[0].best_length, 4);
        assert_eq!(trainer.last_outcomes(), outcomes.as_slice());
    }
}
