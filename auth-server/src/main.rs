// auth-server/src/main.rs
mod api;
mod middleware;
mod state;
mod utils;

use std::io;

use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use common::{setup_tracing, Config};
use middleware::rate_limiter::RateLimiter;
use state::AuthState;

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body("Sign-In with Ethereum Auth Server")
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let loaded = Config::load();

    // Setup tracing, at the default level when the config did not load
    let log_level = loaded
        .as_ref()
        .map(|config| config.log_level.clone())
        .unwrap_or_else(|_| Config::default().log_level);
    setup_tracing(&log_level);

    // Missing secret or project id stops the process here
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()));
        }
    };
    tracing::info!("Configuration loaded, log level {}", log_level);

    let state = AuthState::from_config(&config).map_err(|e| {
        tracing::error!("Failed to initialise signature verifier: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let server_addr = config.server_addr.clone();
    let limiter = RateLimiter::from_config(&config.rate_limit);

    tracing::info!("Starting Auth Server on {}", server_addr);

    let state_data = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(limiter.clone())
            .service(index)
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
