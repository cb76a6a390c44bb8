// Decision sources: where a snake's next heading comes from
//
// Every source is consulted exactly once per live tick and only ever sees the
// instance through a shared reference. Sources are shared across worker
// threads, so anything stateful lives behind a lock.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Weak};

use crate::grid::GridInstance;
use crate::types::Direction;

/// Thin trait object used to steer a snake without coupling to a policy implementation.
pub trait DecisionSource: Send + Sync {
    /// Static identifier of the source implementation.
    fn kind(&self) -> &'static str;

    /// Chooses the heading for the coming tick.
    fn next_direction(&self, grid: &GridInstance) -> Direction;
}

/// Single-slot buffer of pending manual input
///
/// Newer input overwrites older input; consuming clears the slot.
#[derive(Debug, Default)]
pub struct InputBuffer {
    pending: Mutex<Option<Direction>>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, direction: Direction) {
        *self.pending.lock() = Some(direction);
    }

    pub fn peek(&self) -> Option<Direction> {
        *self.pending.lock()
    }

    pub fn consume(&self) -> Option<Direction> {
        self.pending.lock().take()
    }
}

/// Fans one steering command out to every registered manual buffer
///
/// Each manual source owns its buffer, so consuming input on one board never
/// hides it from another. Buffers of retired generations drop out on their
/// own once their sources are released.
#[derive(Debug, Default)]
pub struct SteeringHub {
    buffers: Mutex<Vec<Weak<InputBuffer>>>,
}

impl SteeringHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh buffer that receives every later `push`
    pub fn register(&self) -> Arc<InputBuffer> {
        let buffer = Arc::new(InputBuffer::new());
        let mut buffers = self.buffers.lock();
        buffers.retain(|b| b.strong_count() > 0);
        buffers.push(Arc::downgrade(&buffer));
        buffer
    }

    /// Buffers `direction` on every live registered buffer
    pub fn push(&self, direction: Direction) {
        let mut buffers = self.buffers.lock();
        buffers.retain(|weak| match weak.upgrade() {
            Some(buffer) => {
                buffer.push(direction);
                true
            }
            None => false,
        });
    }

    /// Number of buffers still held by a source
    pub fn live_buffers(&self) -> usize {
        self.buffers
            .lock()
            .iter()
            .filter(|b| b.strong_count() > 0)
            .count()
    }
}

/// Steers from externally buffered input
///
/// Without fresh input the snake keeps its heading. A buffered reversal is
/// consumed and dropped.
#[derive(Debug, Clone)]
pub struct ManualInput {
    buffer: Arc<InputBuffer>,
}

impl ManualInput {
    pub fn new(buffer: Arc<InputBuffer>) -> Self {
        ManualInput { buffer }
    }
}

impl DecisionSource for ManualInput {
    fn kind(&self) -> &'static str {
        "manual"
    }

    fn next_direction(&self, grid: &GridInstance) -> Direction {
        let current = grid.direction();
        match self.buffer.consume() {
            Some(requested) if requested != current.opposite() => requested,
            _ => current,
        }
    }
}

type PolicyFn = dyn Fn(&GridInstance) -> Direction + Send + Sync;

/// Delegates to an externally supplied policy function
///
/// The policy owns the encoding of the board; it gets the whole read-only
/// instance and returns a heading.
pub struct LearnedPolicy {
    policy: Box<PolicyFn>,
}

impl LearnedPolicy {
    pub fn new<F>(policy: F) -> Self
    where
        F: Fn(&GridInstance) -> Direction + Send + Sync + 'static,
    {
        LearnedPolicy {
            policy: Box::new(policy),
        }
    }
}

impl std::fmt::Debug for LearnedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedPolicy").finish_non_exhaustive()
    }
}

impl DecisionSource for LearnedPolicy {
    fn kind(&self) -> &'static str {
        "learned"
    }

    fn next_direction(&self, grid: &GridInstance) -> Direction {
        (self.policy)(grid)
    }
}

/// Always answers the same direction
#[derive(Debug, Clone, Copy)]
pub struct FixedDirection(pub Direction);

impl DecisionSource for FixedDirection {
    fn kind(&self) -> &'static str {
        "fixed"
    }

    fn next_direction(&self, _grid: &GridInstance) -> Direction {
        self.0
    }
}

/// No-op source: keeps whatever heading the snake already has
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepHeading;

impl DecisionSource for KeepHeading {
    fn kind(&self) -> &'static str {
        "straight"
    }

    fn next_direction(&self, grid: &GridInstance) -> Direction {
        grid.direction()
    }
}

/// Baseline that randomly goes straight or turns, never reversing
#[derive(Debug)]
pub struct RandomTurn {
    rng: Mutex<StdRng>,
    turn_probability: f64,
}

impl RandomTurn {
    pub fn new(seed: u64, turn_probability: f64) -> Self {
        RandomTurn {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            turn_probability: turn_probability.clamp(0.0, 1.0),
        }
    }
}

impl DecisionSource for RandomTurn {
    fn kind(&self) -> &'static str {
        "random_turn"
    }

    fn next_direction(&self, grid: &GridInstance) -> Direction {
        let current = grid.direction();
        let mut rng = self.rng.lock();
        if !rng.random_bool(self.turn_probability) {
            return current;
        }
        if rng.random_bool(0.5) {
            current.left()
        } else {
            current.right()
        }
    }
}
