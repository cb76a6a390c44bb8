// Library exports for the snake population simulator
// The server binary and the headless runner both build on these modules

pub mod config;
pub mod decision;
pub mod grid;
pub mod outcome_log;
pub mod population;
pub mod simulation;
pub mod snake;
pub mod trainer;
pub mod types;
