//! API endpoints for user login and authentication.

use rocket::http::CookieJar;
use rocket::response;
use rocket::serde::json::Json;
use rocket::{Route, get, post};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{ErrorResponse, error_response};
use crate::DbConn;
use crate::access::{AccessContext, Grant};
use crate::logged_json::LoggedJson;
use crate::models::{User, UserRole};
use crate::orm::login::process_login;
use crate::orm::team_access::get_user_team_access;
use crate::session_guards::AuthenticatedUser;

/// Login request structure containing user credentials.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The current user and their team grants.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoginSuccessResponse {
    pub user_id: i32,
    pub email: String,
    pub role: UserRole,
    pub grants: Vec<Grant>,
}

fn build_user_response(user: &User, grants: Vec<Grant>) -> LoginSuccessResponse {
    LoginSuccessResponse {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
        grants,
    }
}

/// Login endpoint that authenticates users and creates sessions.
///
/// - **URL:** `/api/1/login`
/// - **Method:** `POST`
/// - **Purpose:** Authenticates a user by email and password, and sets a secure session cookie
/// - **Authentication:** None required
///
/// # Request Format
///
/// ```json
/// { "email": "lead@plant.example", "password": "secret" }
/// ```
///
/// # Response
///
/// **Success (HTTP 200 OK):** the user, their role and their team grants.
/// Sets the HTTP-only `session` cookie.
///
/// **Failure (HTTP 401 Unauthorized):**
/// ```json
/// { "error": "Invalid credentials" }
/// ```
#[post("/1/login", data = "<login>")]
pub async fn login(
    db: DbConn,
    cookies: &CookieJar<'_>,
    login: LoggedJson<LoginRequest>,
) -> Result<Json<LoginSuccessResponse>, response::status::Custom<Json<ErrorResponse>>> {
    let user = match process_login(&db, cookies, &login).await {
        Ok(user) => user,
        Err(status) => return Err(error_response(status, "Invalid credentials")),
    };

    let user_id = user.id;
    let grants = match db.run(move |conn| get_user_team_access(conn, user_id)).await {
        Ok(rows) => rows.iter().map(Grant::from).collect(),
        Err(e) => {
            warn!("Could not load grants for user {} at login: {:?}", user_id, e);
            Vec::new()
        }
    };
    info!("User {} logged in", user.email);
    Ok(Json(build_user_response(&user, grants)))
}

/// Hello (Authentication Check) endpoint.
///
/// - **URL:** `/api/1/hello`
/// - **Method:** `GET`
/// - **Purpose:** Returns the current user and grants; useful for checking authentication status
/// - **Authentication:** Required
///
/// Grants are read fresh on every call, so a grant change shows up here
/// without logging in again.
#[get("/1/hello")]
pub async fn secure_hello(
    auth_user: AuthenticatedUser,
    access: AccessContext,
) -> Json<LoginSuccessResponse> {
    Json(build_user_response(
        &auth_user.user,
        access.grants().copied().collect(),
    ))
}

pub fn routes() -> Vec<Route> {
    routes![login, secure_hello]
}
