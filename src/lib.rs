pub mod app;
pub mod canon;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod ids;
pub mod ledger;
pub mod envelope;
pub mod mcp;
pub mod models;
pub mod rate_limit;
pub mod room;
pub mod routes;
pub mod runtime;
pub mod store;
pub mod tenant;
pub mod workspace;

use std::env;

use config::Config;
use events::EventBus;
use ledger::LedgerCoordinator;
use rate_limit::{RateLimitConfig, RateLimiter};
use room::RoomCoordinator;
use rocket_cors::{AllowedOrigins, CorsOptions};
use runtime::Registry;
use store::Db;
use tenant::TenantCoordinator;
use workspace::WorkspaceCoordinator;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    let config = Config::from_env();
    build_rocket(config)
}

pub fn rocket_with_config(config: Config) -> rocket::Rocket<rocket::Build> {
    build_rocket(config)
}

fn build_rocket(config: Config) -> rocket::Rocket<rocket::Build> {
    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db = Db::new(&config.database_path);
    let events = EventBus::new();
    let rate_limit_config = RateLimitConfig::from_env();
    let rate_limiter = RateLimiter::new();

    let tenants: Registry<TenantCoordinator> = Registry::new();
    let rooms: Registry<RoomCoordinator> = Registry::new();
    let ledgers: Registry<LedgerCoordinator> = Registry::new();
    let workspaces: Registry<WorkspaceCoordinator> = Registry::new();

    let cors = if config.allowed_origins.is_empty() {
        CorsOptions::default().to_cors().expect("failed to build CORS fairing")
    } else {
        CorsOptions {
            allowed_origins: AllowedOrigins::some_exact(&config.allowed_origins),
            ..CorsOptions::default()
        }
        .to_cors()
        .expect("failed to build CORS fairing")
    };

    let figment = rocket::Config::figment().merge(("limits.json", 2 * 1024 * 1024));

    rocket::custom(figment)
        .manage(db)
        .manage(config)
        .manage(events)
        .manage(rate_limit_config)
        .manage(rate_limiter)
        .manage(tenants)
        .manage(rooms)
        .manage(ledgers)
        .manage(workspaces)
        .attach(cors)
        .register("/", rocket::catchers![routes::not_found, routes::too_many_requests])
        .mount(
            "/",
            rocket::routes![
                routes::health,
                routes::whoami::whoami,
                routes::rooms::list_rooms,
                routes::rooms::create_room,
                routes::messages::get_history,
                routes::messages::send_message,
                routes::stream::room_events,
                routes::receipts::get_receipt,
                routes::mcp_routes::mcp_call,
                routes::mcp_routes::mcp_stream,
            ],
        )
}

/// Entry-point helper so `main.rs` stays a thin launcher (teacher's
/// `rocket()`/`rocket_with_db()` split).
pub fn database_path_from_env() -> String {
    env::var("DATABASE_PATH").unwrap_or_else(|_| "data/ubl_core.db".to_string())
}
