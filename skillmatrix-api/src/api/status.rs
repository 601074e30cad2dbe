//! Health check endpoint.

use diesel::RunQueryDsl;
use rocket::{Route, State, serde::json::Json};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::feed::ChangeFeed;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub built: String,
    pub git_commit: Option<String>,
    /// `"ok"` when a trivial query succeeds.
    pub database: String,
    pub feed_subscribers: usize,
}

/// Health Status endpoint.
///
/// - **URL:** `/api/1/status`
/// - **Method:** `GET`
/// - **Purpose:** Reports that the server is running, its build and whether the database answers
/// - **Authentication:** None required
///
/// # Response
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "status": "running",
///   "version": "0.1.0",
///   "built": "Fri, 15 Aug 2025 18:13:43 +0000",
///   "git_commit": "cd51275141a2e7d49737aa7dd4e8ff7c9a804d67",
///   "database": "ok",
///   "feed_subscribers": 0
/// }
/// ```
#[rocket::get("/1/status")]
pub async fn health_status(db: DbConn, feed: &State<ChangeFeed>) -> Json<HealthStatus> {
    let database = match db
        .run(|conn| diesel::sql_query("SELECT 1").execute(conn))
        .await
    {
        Ok(_) => "ok".to_string(),
        Err(e) => {
            error!("Health check query failed: {:?}", e);
            "unavailable".to_string()
        }
    };

    Json(HealthStatus {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        built: built_info::BUILT_TIME_UTC.to_string(),
        git_commit: built_info::GIT_COMMIT_HASH.map(str::to_string),
        database,
        feed_subscribers: feed.subscriber_count(),
    })
}

pub fn routes() -> Vec<Route> {
    routes![health_status]
}
