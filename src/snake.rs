// Snake body state machine
//
// The body is kept twice: a head-first VecDeque for ordering and a HashSet for
// O(1) occupancy checks. Both are always updated together.

use std::collections::{HashSet, VecDeque};
use thiserror::Error;

use crate::types::{Direction, Position};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnakeError {
    #[error("cannot lower max length from {current} to {requested}")]
    InvalidGrowth { current: usize, requested: usize },
    #[error("segment {0:?} is already part of the body")]
    Overlap(Position),
    #[error("a snake needs at least one segment")]
    EmptyBody,
}

/// Result of a single movement tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Head moved to the contained position
    Moved(Position),
    /// Wrapped head landed on the body; nothing was mutated
    Collided(Position),
}

#[derive(Debug, Clone)]
pub struct SnakeState {
    body: VecDeque<Position>,
    occupied: HashSet<Position>,
    max_length: usize,
    current_direction: Direction,
}

impl SnakeState {
    /// Builds a snake from head-first segments
    ///
    /// # Arguments
    /// * `segments` - Body cells, head first; must be non-empty and distinct
    /// * `max_length` - Initial length cap, at least `segments.len()`
    /// * `direction` - Heading the snake is considered to be travelling in
    pub fn new(
        segments: &[Position],
        max_length: usize,
        direction: Direction,
    ) -> Result<Self, SnakeError> {
        if segments.is_empty() {
            return Err(SnakeError::EmptyBody);
        }
        if max_length < segments.len() {
            return Err(SnakeError::InvalidGrowth {
                current: segments.len(),
                requested: max_length,
            });
        }

        let mut body = VecDeque::with_capacity(max_length);
        let mut occupied = HashSet::with_capacity(max_length);
        for &segment in segments {
            if !occupied.insert(segment) {
                return Err(SnakeError::Overlap(segment));
            }
            body.push_back(segment);
        }

        Ok(SnakeState {
            body,
            occupied,
            max_length,
            current_direction: direction,
        })
    }

    /// Raises the length cap. Growth is monotonic.
    pub fn grow(&mut self, new_max_length: usize) -> Result<(), SnakeError> {
        if new_max_length < self.max_length {
            return Err(SnakeError::InvalidGrowth {
                current: self.max_length,
                requested: new_max_length,
            });
        }
        self.max_length = new_max_length;
        Ok(())
    }

    /// Moves the head one cell on a `width` x `height` torus
    ///
    /// The tail is dropped only when the body would exceed `max_length`, so
    /// pending growth shows up as ticks where the tail stays put.
    pub fn advance(&mut self, direction: Direction, width: i32, height: i32) -> Advance {
        let new_head = wrap(direction.apply(&self.head()), width, height);

        if self.occupied.contains(&new_head) {
            return Advance::Collided(new_head);
        }

        self.body.push_front(new_head);
        self.occupied.insert(new_head);
        self.current_direction = direction;

        if self.body.len() > self.max_length {
            if let Some(tail) = self.body.pop_back() {
                self.occupied.remove(&tail);
            }
        }

        Advance::Moved(new_head)
    }

    pub fn contains(&self, pos: &Position) -> bool {
        self.occupied.contains(pos)
    }

    pub fn head(&self) -> Position {
        // Never empty: `new` rejects empty bodies and `advance` pushes before it pops
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn direction(&self) -> Direction {
        self.current_direction
    }

    /// Head-first iterator over the body
    pub fn segments(&self) -> impl Iterator<Item = &Position> {
        self.body.iter()
    }
}

/// Wraps each axis independently onto `[0, dim)`
fn wrap(pos: Position, width: i32, height: i32) -> Position {
    let x = if pos.x < 0 {
        width - 1
    } else if pos.x >= width {
        0
    } else {
        pos.x
    };
    let y = if pos.y < 0 {
        height - 1
    } else if pos.y >= height {
        0
    } else {
        pos.y
    };
    Position { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal(head_x: i32, y: i32, len: i32) -> Vec<Position> {
        (0..len).map(|i| Position::new(head_x - i, y)).collect()
    }

    fn assert_consistent(snake: &SnakeState) {
        assert!(snake.len() <= snake.max_length());
        let unique: HashSet<_> = snake.segments().copied().collect();
        assert_eq!(unique.len(), snake.len());
        for seg in snake.segments() {
            assert!(snake.contains(seg));
        }
    }

    #[test]
    fn test_new_rejects_duplicate_segments() {
        let segs = vec![Position::new(1, 1), Position::new(0, 1), Position::new(1, 1)];
        assert_eq!(
            SnakeState::new(&segs, 3, Direction::Right).unwrap_err(),
            SnakeError::Overlap(Position::new(1, 1))
        );
    }

    #[test]
    fn test_new_rejects_empty_body() {
        assert_eq!(
            SnakeState::new(&[], 3, Direction::Right).unwrap_err(),
            SnakeError::EmptyBody
        );
    }

    #[test]
    fn test_new_rejects_cap_below_length() {
        let err = SnakeState::new(&horizontal(2, 0, 3), 2, Direction::Right).unwrap_err();
        assert!(matches!(err, SnakeError::InvalidGrowth { .. }));
    }

    #[test]
    fn test_advance_keeps_length_at_cap() {
        let mut snake = SnakeState::new(&horizontal(2, 2, 3), 3, Direction::Right).unwrap();
        assert_eq!(snake.advance(Direction::Right, 10, 10), Advance::Moved(Position::new(3, 2)));
        assert_eq!(snake.len(), 3);
        assert!(!snake.contains(&Position::new(0, 2)));
        assert_eq!(snake.head(), Position::new(3, 2));
        assert_consistent(&snake);
    }

    #[test]
    fn test_grow_defers_tail_removal() {
        let mut snake = SnakeState::new(&horizontal(2, 2, 3), 3, Direction::Right).unwrap();
        snake.grow(5).unwrap();
        snake.advance(Direction::Right, 10, 10);
        assert_eq!(snake.len(), 4);
        snake.advance(Direction::Right, 10, 10);
        assert_eq!(snake.len(), 5);
        snake.advance(Direction::Right, 10, 10);
        assert_eq!(snake.len(), 5);
        assert_consistent(&snake);
    }

    #[test]
    fn test_grow_is_monotonic() {
        let mut snake = SnakeState::new(&horizontal(2, 2, 3), 4, Direction::Right).unwrap();
        assert!(snake.grow(4).is_ok());
        assert_eq!(
            snake.grow(3),
            Err(SnakeError::InvalidGrowth {
                current: 4,
                requested: 3
            })
        );
        assert_eq!(snake.max_length(), 4);
    }

    #[test]
    fn test_wraps_right_edge() {
        let mut snake = SnakeState::new(&horizontal(4, 1, 2), 2, Direction::Right).unwrap();
        assert_eq!(snake.advance(Direction::Right, 5, 5), Advance::Moved(Position::new(0, 1)));
    }

    #[test]
    fn test_wraps_top_and_bottom_edges() {
        let segs = vec![Position::new(2, 4), Position::new(2, 3)];
        let mut snake = SnakeState::new(&segs, 2, Direction::Up).unwrap();
        assert_eq!(snake.advance(Direction::Up, 5, 5), Advance::Moved(Position::new(2, 0)));

        let segs = vec![Position::new(2, 0), Position::new(2, 1)];
        let mut snake = SnakeState::new(&segs, 2, Direction::Down).unwrap();
        assert_eq!(snake.advance(Direction::Down, 5, 5), Advance::Moved(Position::new(2, 4)));
    }

    #[test]
    fn test_wraps_left_edge() {
        let segs = vec![Position::new(0, 3), Position::new(1, 3)];
        let mut snake = SnakeState::new(&segs, 2, Direction::Left).unwrap();
        assert_eq!(snake.advance(Direction::Left, 6, 5), Advance::Moved(Position::new(5, 3)));
    }

    #[test]
    fn test_reversal_collides_with_neck_without_mutation() {
        let mut snake = SnakeState::new(&horizontal(2, 2, 3), 3, Direction::Right).unwrap();
        let before: Vec<_> = snake.segments().copied().collect();

        assert_eq!(snake.advance(Direction::Left, 10, 10), Advance::Collided(Position::new(1, 2)));

        let after: Vec<_> = snake.segments().copied().collect();
        assert_eq!(before, after);
        assert_eq!(snake.direction(), Direction::Right);
    }

    #[test]
    fn test_moving_into_departing_tail_is_fatal() {
        // 2x2 loop: the tail is still occupied when the head arrives
        let segs = vec![
            Position::new(0, 0),
            Position::new(1, 0),
            Position::new(1, 1),
            Position::new(0, 1),
        ];
        let mut snake = SnakeState::new(&segs, 4, Direction::Left).unwrap();
        assert_eq!(snake.advance(Direction::Up, 10, 10), Advance::Collided(Position::new(0, 1)));
    }

    #[test]
    fn test_non_reversing_walk_stays_consistent() {
        let mut snake = SnakeState::new(&horizontal(2, 5, 3), 3, Direction::Right).unwrap();
        let turns = [
            Direction::Right,
            Direction::Up,
            Direction::Up,
            Direction::Left,
            Direction::Left,
            Direction::Up,
            Direction::Right,
        ];
        for (i, dir) in turns.iter().cycle().take(60).enumerate() {
            if i % 7 == 0 {
                snake.grow(snake.max_length() + 1).unwrap();
            }
            if let Advance::Collided(_) = snake.advance(*dir, 11, 13) {
                break;
            }
            assert_consistent(&snake);
        }
    }
}
