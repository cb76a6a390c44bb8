// Integration tests for single-board behaviour
//
// Drives GridInstance through hand-built scenarios: eating and growth,
// toroidal wraparound, reversal deaths and food placement.

use snake_population::decision::{FixedDirection, InputBuffer, LearnedPolicy, ManualInput};
use snake_population::grid::{GridError, GridInstance};
use snake_population::snake::SnakeState;
use snake_population::types::{DeathCause, Direction, Position};
use std::collections::HashSet;
use std::sync::Arc;

fn p(x: i32, y: i32) -> Position {
    Position::new(x, y)
}

fn body(grid: &GridInstance) -> Vec<Position> {
    grid.snake().segments().copied().collect()
}

/// Snake laid out tail-to-head along `y`, heading right, head at `(len-1, y)`
fn scenario(width: i32, height: i32, y: i32, seed: u64) -> GridInstance {
    let segments = vec![p(2, y), p(1, y), p(0, y)];
    let snake = SnakeState::new(&segments, 3, Direction::Right).unwrap();
    GridInstance::with_snake(width, height, snake, seed).unwrap()
}

#[test]
fn test_eating_on_5x5_board_grows_over_following_tick() {
    let mut grid = scenario(5, 5, 2, 1);
    grid.set_food(p(3, 2));
    let right = FixedDirection(Direction::Right);

    grid.tick(&right).unwrap();

    assert_eq!(grid.head(), p(3, 2));
    assert_eq!(grid.snake().max_length(), 4);
    assert_eq!(body(&grid), vec![p(3, 2), p(2, 2), p(1, 2)]);
    let food = grid.food().expect("food replaced");
    assert_ne!(food, p(3, 2));
    assert!(!grid.snake().contains(&food));

    // New food may sit on (4,2); either way the tail is kept this tick
    grid.tick(&right).unwrap();
    assert_eq!(grid.body_len(), 4);
    assert_eq!(&body(&grid)[..4], &[p(4, 2), p(3, 2), p(2, 2), p(1, 2)]);
}

#[test]
fn test_eating_once_raises_cap_by_exactly_one() {
    let mut grid = scenario(20, 20, 10, 2);
    grid.set_food(p(3, 10));
    let up = FixedDirection(Direction::Up);
    let right = FixedDirection(Direction::Right);

    grid.tick(&right).unwrap();
    assert_eq!(grid.snake().max_length(), 4);
    // Steer away from wherever the new food landed and make sure nothing else is eaten
    grid.set_food(p(19, 0));
    for _ in 0..5 {
        grid.tick(&up).unwrap();
    }
    assert_eq!(grid.snake().max_length(), 4);
    assert_eq!(grid.body_len(), 4);
}

#[test]
fn test_wraparound_right_edge() {
    let segments = vec![p(4, 1), p(3, 1), p(2, 1)];
    let snake = SnakeState::new(&segments, 3, Direction::Right).unwrap();
    let mut grid = GridInstance::with_snake(5, 5, snake, 0).unwrap();
    grid.set_food(p(0, 4));

    grid.tick(&FixedDirection(Direction::Right)).unwrap();
    assert_eq!(grid.head(), p(0, 1));
    assert!(!grid.is_dead());
}

#[test]
fn test_wraparound_top_edge() {
    let segments = vec![p(2, 4), p(2, 3), p(2, 2)];
    let snake = SnakeState::new(&segments, 3, Direction::Up).unwrap();
    let mut grid = GridInstance::with_snake(5, 5, snake, 0).unwrap();
    grid.set_food(p(4, 4));

    grid.tick(&FixedDirection(Direction::Up)).unwrap();
    assert_eq!(grid.head(), p(2, 0));
}

#[test]
fn test_reversal_is_fatal_on_next_tick() {
    let mut grid = GridInstance::new(10, 10, 4).unwrap();
    grid.set_food(p(9, 0));

    grid.tick(&FixedDirection(Direction::Right)).unwrap();
    assert!(!grid.is_dead());

    grid.tick(&FixedDirection(Direction::Left)).unwrap();
    assert!(grid.is_dead());
    assert_eq!(grid.death_cause(), Some(DeathCause::SelfCollision));
    assert_eq!(grid.ticks_survived(), 1);
    assert_eq!(grid.head(), p(3, 5));
}

#[test]
fn test_manual_input_protects_against_reversal() {
    let input = Arc::new(InputBuffer::new());
    let manual = ManualInput::new(input.clone());
    let mut grid = GridInstance::new(10, 10, 4).unwrap();
    grid.set_food(p(9, 0));

    input.push(Direction::Left);
    grid.tick(&manual).unwrap();
    assert!(!grid.is_dead());
    assert_eq!(grid.head(), p(3, 5));

    input.push(Direction::Down);
    grid.tick(&manual).unwrap();
    assert_eq!(grid.head(), p(3, 4));
}

#[test]
fn test_food_is_placed_before_first_decision() {
    let mut grid = GridInstance::new(12, 12, 8).unwrap();
    let policy = LearnedPolicy::new(|g: &GridInstance| {
        assert!(g.food().is_some(), "food must exist before the policy is asked");
        Direction::Up
    });
    grid.tick(&policy).unwrap();
}

#[test]
fn test_long_walk_never_duplicates_cells_or_exceeds_cap() {
    // Follows food greedily on the torus; stops at the first death
    let mut grid = GridInstance::new(9, 7, 21).unwrap();
    let policy = LearnedPolicy::new(|g: &GridInstance| {
        let head = g.head();
        let current = g.direction();
        let food = g.food().unwrap_or(head);
        let preferred = if food.x != head.x {
            if food.x > head.x { Direction::Right } else { Direction::Left }
        } else if food.y > head.y {
            Direction::Up
        } else {
            Direction::Down
        };
        if preferred == current.opposite() {
            current.left()
        } else {
            preferred
        }
    });

    for _ in 0..500 {
        if grid.is_dead() {
            break;
        }
        if grid.tick(&policy).is_err() {
            break;
        }
        let cells: HashSet<Position> = grid.snake().segments().copied().collect();
        assert_eq!(cells.len(), grid.body_len());
        assert!(grid.body_len() <= grid.snake().max_length());
        if let Some(food) = grid.food() {
            assert!(!grid.snake().contains(&food));
        }
    }
}

#[test]
fn test_full_board_reports_exhaustion() {
    let mut grid = GridInstance::new(3, 1, 0).unwrap();
    let err = grid.tick(&FixedDirection(Direction::Right)).unwrap_err();
    assert!(matches!(err, GridError::FoodPlacementExhausted { .. }));
    assert!(grid.is_dead());
}
