//! API endpoint for user logout and session termination.

use rocket::http::{Cookie, CookieJar};
use rocket::serde::json::{Json, Value, json};
use rocket::{Route, post};

use crate::DbConn;
use crate::orm::login::SESSION_COOKIE;
use crate::orm::logout::revoke_session;

/// Logout endpoint that terminates user sessions.
///
/// - **URL:** `/api/1/logout`
/// - **Method:** `POST`
/// - **Purpose:** Revokes the current session and removes the session cookie
/// - **Authentication:** None required (works with or without valid session)
///
/// **Always returns HTTP 200 OK.**
#[post("/1/logout")]
pub async fn logout(db: DbConn, cookies: &CookieJar<'_>) -> Json<Value> {
    let cookie_value = cookies.get(SESSION_COOKIE).map(|c| c.value().to_string());

    if let Some(session_id) = cookie_value {
        match revoke_session(&db, &session_id).await {
            Ok(0) => debug!("Logout with unknown session token"),
            Ok(_) => {}
            Err(e) => warn!("Failed to revoke session: {:?}", e),
        }
        cookies.remove(Cookie::from(SESSION_COOKIE));
    }

    Json(json!({
        "message": "Logout successful",
        "status": "ok"
    }))
}

pub fn routes() -> Vec<Route> {
    routes![logout]
}
