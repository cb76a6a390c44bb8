#[macro_use]
extern crate rocket;

use log::{error, info};
use rocket::fairing::AdHoc;
use std::env;
use std::sync::Arc;

use snake_population::config::Config;
use snake_population::outcome_log::OutcomeLogger;
use snake_population::simulation::Simulation;

mod handler;

#[launch]
async fn rocket() -> _ {
    // Lots of web hosting services expect you to bind to the port specified by the `PORT`
    // environment variable. However, Rocket looks at the `ROCKET_PORT` environment variable.
    // If we find a value for `PORT`, we set `ROCKET_PORT` to that value.
    if let Ok(port) = env::var("PORT") {
        env::set_var("ROCKET_PORT", &port);
    }

    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    info!("Starting snake population server...");

    // Load configuration once at startup
    let config = Config::load_or_default();
    let logger = OutcomeLogger::new(config.outcome_log.enabled, &config.outcome_log.log_file_path).await;

    let sim = match Simulation::new(config, logger) {
        Ok(sim) => Arc::new(sim),
        Err(e) => {
            error!("Failed to create population: {}", e);
            std::process::exit(1);
        }
    };
    let driver = sim.clone();

    rocket::build()
        .manage(sim)
        .attach(AdHoc::on_liftoff("Tick Driver", |_| {
            Box::pin(async move {
                tokio::spawn(driver.run());
            })
        }))
        .mount(
            "/",
            routes![handler::index, handler::state, handler::outcomes, handler::steer],
        )
}
