#[macro_use]
extern crate rocket;

use rocket::figment::value::Map;
use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use rocket::fs::FileServer;
use rocket::request::Request;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket};

pub mod access;
pub mod admin_init_fairing;
pub mod api;
pub mod config;
pub mod feed;
mod generate_types;
pub mod logged_json;
pub mod mailer;
pub mod matrix;
pub mod models;
pub mod orm;
pub use orm::DbConn;
pub mod rating;
pub mod report;
pub mod schema;
pub mod session_guards;

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unauthorized",
        "path": req.uri().path().to_string(),
        "status": 401
    }))
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Forbidden",
        "path": req.uri().path().to_string(),
        "status": 403
    }))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Not Found",
        "path": req.uri().path().to_string(),
        "status": 404
    }))
}

#[catch(422)]
fn unprocessable_entity(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unprocessable Entity",
        "path": req.uri().path().to_string(),
        "status": 422
    }))
}

#[catch(500)]
fn internal_server_error(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Internal Server Error",
        "path": req.uri().path().to_string(),
        "status": 500
    }))
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, req: &Request) -> Json<Value> {
    Json(json!({
        "error": status.reason().unwrap_or("Unknown Error"),
        "path": req.uri().path().to_string(),
        "status": status.code
    }))
}

pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api::routes())
}

fn log_rocket_info(rocket: &Rocket<Build>) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.sqlite_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }
}

/// Attaches every fairing, managed state, catcher and API route to a Rocket
/// built from `figment`.  Shared by [`rocket`] and the test harness.
pub fn build_rocket(figment: Figment) -> Rocket<Build> {
    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .attach(admin_init_fairing::admin_init_fairing())
        .attach(config::config_fairing())
        .register(
            "/",
            catchers![
                unauthorized,
                forbidden,
                not_found,
                unprocessable_entity,
                internal_server_error,
                default_catcher
            ],
        );

    mount_api_routes(rocket)
}

/// Note that this function doesn't get tested by our tests.  Tests
/// set up the test_rocket in-memory db.  That is defined in orm/testing.rs.
pub fn rocket() -> Rocket<Build> {
    dotenvy::dotenv().ok();

    let mut figment = Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global());
    match std::env::var("DATABASE_URL") {
        Ok(database_url) => figment = figment.merge(("databases.sqlite_db.url", database_url)),
        Err(_) => warn!("DATABASE_URL not set; relying on Rocket.toml for the database"),
    }

    let rocket = build_rocket(figment);
    log_rocket_info(&rocket);

    let static_dir =
        std::env::var("SKILLMATRIX_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    rocket.mount("/", FileServer::from(static_dir).rank(10))
}
