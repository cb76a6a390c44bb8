// HTTP handler bindings for the observation API
//
// This module provides thin wrapper functions that bind Rocket HTTP routes
// to the Simulation's methods. Handlers are responsible for:
// - Extracting the Simulation from Rocket's managed state
// - Parsing path parameters
// - Delegating to Simulation methods
// - Serializing responses

use rocket::http::Status;
use rocket::serde::json::Json;
use serde_json::Value;
use std::sync::Arc;

use snake_population::population::PopulationSnapshot;
use snake_population::simulation::Simulation;
use snake_population::types::Direction;

/// GET / endpoint
/// Returns simulation metadata
#[get("/")]
pub fn index(sim: &rocket::State<Arc<Simulation>>) -> Json<Value> {
    Json(sim.info())
}

/// GET /state endpoint
/// Returns every instance of the current generation
#[get("/state")]
pub fn state(sim: &rocket::State<Arc<Simulation>>) -> Json<PopulationSnapshot> {
    Json(sim.snapshot())
}

/// GET /outcomes endpoint
/// Returns the outcomes of the last retired generation
#[get("/outcomes")]
pub fn outcomes(sim: &rocket::State<Arc<Simulation>>) -> Json<Value> {
    Json(sim.last_generation())
}

/// POST /steer/<direction> endpoint
/// Buffers a direction for manual-input snakes
#[post("/steer/<direction>")]
pub fn steer(sim: &rocket::State<Arc<Simulation>>, direction: &str) -> Status {
    match direction.parse::<Direction>() {
        Ok(dir) => {
            sim.steer(dir);
            Status::Ok
        }
        Err(_) => Status::BadRequest,
    }
}
