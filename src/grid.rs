// One simulated board: a snake, its food and an instance-local RNG
//
// Instances share nothing with each other, which is what lets the population
// controller tick them from several threads at once.

use log::{debug, error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::decision::DecisionSource;
use crate::snake::{Advance, SnakeError, SnakeState};
use crate::types::{DeathCause, Direction, Outcome, Position};

/// Number of segments every fresh snake starts with
pub const INITIAL_LENGTH: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("no free cell left for food on a {width}x{height} board")]
    FoodPlacementExhausted { width: i32, height: i32 },
    #[error("board must be at least {min_width}x1, got {width}x{height}")]
    InvalidDimensions {
        width: i32,
        height: i32,
        min_width: i32,
    },
    #[error("snake segment {0:?} lies outside the board")]
    SegmentOutOfBounds(Position),
    #[error(transparent)]
    Snake(#[from] SnakeError),
}

fn check_dimensions(width: i32, height: i32, min_width: i32) -> Result<(), GridError> {
    if width < min_width || height < 1 {
        return Err(GridError::InvalidDimensions {
            width,
            height,
            min_width,
        });
    }
    Ok(())
}

/// Read-only copy of an instance, enough for a renderer or logger
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GridSnapshot {
    pub width: i32,
    pub height: i32,
    pub head: Position,
    pub body: Vec<Position>,
    pub food: Option<Position>,
    pub direction: Direction,
    pub is_dead: bool,
    pub death_cause: Option<DeathCause>,
    pub ticks_survived: u64,
    pub max_length: usize,
}

#[derive(Debug)]
pub struct GridInstance {
    width: i32,
    height: i32,
    snake: SnakeState,
    food: Option<Position>,
    rng: StdRng,
    death_cause: Option<DeathCause>,
    ticks_survived: u64,
}

impl GridInstance {
    /// Creates a board with the standard starting snake
    ///
    /// The snake occupies `(0, h/2)`, `(1, h/2)`, `(2, h/2)` with its head at
    /// `(2, h/2)`, heading right. Food is placed on the first tick.
    pub fn new(width: i32, height: i32, seed: u64) -> Result<Self, GridError> {
        check_dimensions(width, height, INITIAL_LENGTH as i32)?;

        let y = height / 2;
        let body: Vec<Position> = (0..INITIAL_LENGTH as i32)
            .rev()
            .map(|x| Position::new(x, y))
            .collect();
        let snake = SnakeState::new(&body, INITIAL_LENGTH, Direction::Right)?;

        Self::with_snake(width, height, snake, seed)
    }

    /// Creates a board around an existing snake, for scenarios and tests
    ///
    /// Every segment must already lie on the board.
    pub fn with_snake(
        width: i32,
        height: i32,
        snake: SnakeState,
        seed: u64,
    ) -> Result<Self, GridError> {
        check_dimensions(width, height, 1)?;
        if let Some(outside) = snake
            .segments()
            .find(|p| p.x < 0 || p.x >= width || p.y < 0 || p.y >= height)
        {
            return Err(GridError::SegmentOutOfBounds(*outside));
        }

        Ok(GridInstance {
            width,
            height,
            snake,
            food: None,
            rng: StdRng::seed_from_u64(seed),
            death_cause: None,
            ticks_survived: 0,
        })
    }

    /// Overrides the food location
    pub fn set_food(&mut self, food: Position) {
        self.food = Some(food);
    }

    /// Picks a uniformly random free cell for the food
    ///
    /// Rejection sampling is tried first; if the board is crowded enough that
    /// it keeps missing, the free cells are enumerated and one is drawn from
    /// those. A full board is an error.
    pub fn place_food(&mut self) -> Result<Position, GridError> {
        let cells = (self.width as usize) * (self.height as usize);
        if self.snake.len() >= cells {
            return Err(GridError::FoodPlacementExhausted {
                width: self.width,
                height: self.height,
            });
        }

        let max_attempts = cells * 4;
        for _ in 0..max_attempts {
            let candidate = Position::new(
                self.rng.random_range(0..self.width),
                self.rng.random_range(0..self.height),
            );
            if !self.snake.contains(&candidate) {
                self.food = Some(candidate);
                return Ok(candidate);
            }
        }

        let free: Vec<Position> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Position::new(x, y)))
            .filter(|p| !self.snake.contains(p))
            .collect();
        let pick = free[self.rng.random_range(0..free.len())];
        self.food = Some(pick);
        Ok(pick)
    }

    /// Advances the instance by one tick
    ///
    /// Food is placed before the source is consulted, the source is consulted
    /// before the snake moves, and eating is checked after the move.
    pub fn tick(&mut self, source: &dyn DecisionSource) -> Result<(), GridError> {
        if self.is_dead() {
            return Ok(());
        }

        if self.food.is_none() {
            self.place_food_or_retire()?;
        }

        let direction = source.next_direction(self);

        match self.snake.advance(direction, self.width, self.height) {
            Advance::Collided(at) => {
                debug!(
                    "Snake collided with itself at ({}, {}) after {} ticks (length {})",
                    at.x,
                    at.y,
                    self.ticks_survived,
                    self.snake.len()
                );
                self.death_cause = Some(DeathCause::SelfCollision);
                return Ok(());
            }
            Advance::Moved(head) => {
                self.ticks_survived += 1;
                if self.food == Some(head) {
                    self.snake.grow(self.snake.max_length() + 1)?;
                    self.place_food_or_retire()?;
                }
            }
        }

        Ok(())
    }

    fn place_food_or_retire(&mut self) -> Result<(), GridError> {
        if let Err(e) = self.place_food() {
            error!("Retiring instance: {}", e);
            self.food = None;
            self.death_cause = Some(DeathCause::BoardFilled);
            return Err(e);
        }
        Ok(())
    }

    /// Marks a live instance dead without moving it; dead instances keep their cause
    pub fn retire(&mut self, cause: DeathCause) {
        if self.death_cause.is_none() {
            self.death_cause = Some(cause);
        }
    }

    pub fn is_dead(&self) -> bool {
        self.death_cause.is_some()
    }

    pub fn death_cause(&self) -> Option<DeathCause> {
        self.death_cause
    }

    pub fn head(&self) -> Position {
        self.snake.head()
    }

    pub fn body_len(&self) -> usize {
        self.snake.len()
    }

    pub fn ticks_survived(&self) -> u64 {
        self.ticks_survived
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn food(&self) -> Option<Position> {
        self.food
    }

    pub fn snake(&self) -> &SnakeState {
        &self.snake
    }

    pub fn direction(&self) -> Direction {
        self.snake.direction()
    }

    pub fn outcome(&self, index: usize) -> Outcome {
        Outcome {
            index,
            alive_ticks: self.ticks_survived,
            final_length: self.snake.len(),
            death_cause: self.death_cause,
        }
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.width,
            height: self.height,
            head: self.snake.head(),
            body: self.snake.segments().copied().collect(),
            food: self.food,
            direction: self.snake.direction(),
            is_dead: self.is_dead(),
            death_cause: self.death_cause,
            ticks_survived: self.ticks_survived,
            max_length: self.snake.max_length(),
        }
    }
}
