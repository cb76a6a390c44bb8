// Shared value types for the snake simulation
// Positions, headings and the outcome records handed to trainers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 2D cell coordinate on a board
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Position { x, y }
    }
}

/// Represents the four possible movement directions for a snake
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Returns all possible directions
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
    }

    /// Converts direction to its lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Unit displacement `(dx, dy)`; `Up` increases `y`
    pub fn vector(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// 90 degrees counter-clockwise
    pub fn left(&self) -> Direction {
        match self {
            Direction::Up => Direction::Left,
            Direction::Down => Direction::Right,
            Direction::Left => Direction::Down,
            Direction::Right => Direction::Up,
        }
    }

    /// 90 degrees clockwise
    pub fn right(&self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
            Direction::Right => Direction::Down,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Calculates the unwrapped neighbour of `pos` in this direction
    pub fn apply(&self, pos: &Position) -> Position {
        let (dx, dy) = self.vector();
        Position {
            x: pos.x + dx,
            y: pos.y + dy,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "u" => Ok(Direction::Up),
            "down" | "d" => Ok(Direction::Down),
            "left" | "l" => Ok(Direction::Left),
            "right" | "r" => Ok(Direction::Right),
            other => Err(format!("Invalid direction '{}'", other)),
        }
    }
}

/// Why an instance stopped ticking
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// Head moved onto the snake's own body (including the neck)
    SelfCollision,
    /// No free cell was left for food
    BoardFilled,
    /// Retired by the controller's per-generation tick cap
    TickLimit,
}

/// Per-instance result delivered to the trainer when a generation retires
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Stable index of the instance within its generation
    pub index: usize,
    pub alive_ticks: u64,
    pub final_length: usize,
    pub death_cause: Option<DeathCause>,
}

/// Aggregate view of one retired generation
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub generation: u64,
    pub population_size: usize,
    pub ticks: u64,
    pub best_length: usize,
    pub mean_length: f64,
    pub mean_alive_ticks: f64,
}

impl GenerationSummary {
    /// Summarizes a generation's outcomes; empty input yields zeroed means
    pub fn from_outcomes(generation: u64, ticks: u64, outcomes: &[Outcome]) -> Self {
        let n = outcomes.len();
        let best_length = outcomes.iter().map(|o| o.final_length).max().unwrap_or(0);
        let (mean_length, mean_alive_ticks) = if n == 0 {
            (0.0, 0.0)
        } else {
            let total_len: usize = outcomes.iter().map(|o| o.final_length).sum();
            let total_ticks: u64 = outcomes.iter().map(|o| o.alive_ticks).sum();
            (total_len as f64 / n as f64, total_ticks as f64 / n as f64)
        };

        GenerationSummary {
            generation,
            population_size: n,
            ticks,
            best_length,
            mean_length,
            mean_alive_ticks,
        }
    }
}
