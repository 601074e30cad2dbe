pub mod changes;
pub mod contact;
pub mod department;
pub mod employee;
pub mod login;
pub mod logout;
pub mod matrix;
pub mod production_line;
pub mod rating;
pub mod report;
pub mod station;
pub mod status;
pub mod team;
pub mod team_access;
pub mod user;

use rocket::Route;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::access::AccessError;
use crate::orm::{is_foreign_key_violation, is_unique_violation};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = Custom<Json<ErrorResponse>>;

pub fn error_response(status: Status, message: impl Into<String>) -> ApiError {
    Custom(
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn not_found(what: &str, id: i32) -> ApiError {
    error_response(Status::NotFound, format!("{} {} not found", what, id))
}

/// Maps a store error to a response.  Constraint violations are the
/// caller's fault; anything else is logged and reported as a 500.
pub fn store_error(context: &str, e: diesel::result::Error) -> ApiError {
    if is_unique_violation(&e) {
        return error_response(Status::Conflict, format!("{}: already exists", context));
    }
    if is_foreign_key_violation(&e) {
        return error_response(
            Status::BadRequest,
            format!("{}: referenced record does not exist", context),
        );
    }
    if matches!(e, diesel::result::Error::NotFound) {
        return error_response(Status::NotFound, format!("{}: not found", context));
    }
    error!("{}: {:?}", context, e);
    error_response(Status::InternalServerError, format!("{}: {}", context, e))
}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        error_response(Status::Forbidden, e.to_string())
    }
}

/// Rejects blank names and returns the trimmed value.
pub fn required_name(raw: &str, what: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(error_response(
            Status::BadRequest,
            format!("{} name is required", what),
        ));
    }
    Ok(name.to_string())
}

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(changes::routes());
    routes.extend(contact::routes());
    routes.extend(department::routes());
    routes.extend(employee::routes());
    routes.extend(login::routes());
    routes.extend(logout::routes());
    routes.extend(matrix::routes());
    routes.extend(production_line::routes());
    routes.extend(rating::routes());
    routes.extend(report::routes());
    routes.extend(station::routes());
    routes.extend(status::routes());
    routes.extend(team::routes());
    routes.extend(team_access::routes());
    routes.extend(user::routes());
    routes
}
