//! API endpoints for managing user accounts.
//!
//! Every endpoint here is admin-only.  Responses never include password
//! hashes.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, delete, get, post, put};

use super::{ApiError, error_response, not_found, store_error};
use crate::DbConn;
use crate::logged_json::LoggedJson;
use crate::models::{UserInput, UserRole, UserUpdate, UserView};
use crate::orm::user::{count_admins, delete_user, get_user, insert_user, list_all_users, update_user};
use crate::session_guards::AdminUser;

fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(error_response(
            Status::BadRequest,
            "A valid email address is required",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.trim().is_empty() {
        return Err(error_response(Status::BadRequest, "Password is required"));
    }
    Ok(())
}

/// List Users endpoint.
///
/// - **URL:** `/api/1/Users`
/// - **Method:** `GET`
/// - **Purpose:** Lists every account
/// - **Authentication:** Admin
#[get("/1/Users")]
pub async fn list_users(db: DbConn, _admin: AdminUser) -> Result<Json<Vec<UserView>>, ApiError> {
    db.run(list_all_users)
        .await
        .map(|users| Json(users.into_iter().map(UserView::from).collect()))
        .map_err(|e| store_error("Error listing users", e))
}

/// Create User endpoint.
///
/// - **URL:** `/api/1/Users`
/// - **Method:** `POST`
/// - **Purpose:** Creates an account with an Argon2-hashed password
/// - **Authentication:** Admin
///
/// # Request Format
///
/// ```json
/// { "email": "lead@plant.example", "password": "secret", "role": "user" }
/// ```
///
/// Returns 201 with the new user, 400 for a missing email or password and
/// 409 when the email is taken.
#[post("/1/Users", data = "<new_user>")]
pub async fn create_user(
    db: DbConn,
    admin: AdminUser,
    new_user: LoggedJson<UserInput>,
) -> Result<status::Created<Json<UserView>>, ApiError> {
    validate_email(&new_user.email)?;
    validate_password(&new_user.password)?;

    let input = new_user.into_inner();
    let user = db
        .run(move |conn| insert_user(conn, input))
        .await
        .map_err(|e| store_error("Error creating user", e))?;
    info!("Admin {} created user {}", admin.user.email, user.email);

    let location = format!("/api/1/Users/{}", user.id);
    Ok(status::Created::new(location).body(Json(UserView::from(user))))
}

/// Update User endpoint.
///
/// - **URL:** `/api/1/Users/<user_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Changes email, password or role
/// - **Authentication:** Admin
///
/// Demoting the last remaining admin is refused with 400.
#[put("/1/Users/<user_id>", data = "<update>")]
pub async fn update_user_endpoint(
    db: DbConn,
    _admin: AdminUser,
    user_id: i32,
    update: LoggedJson<UserUpdate>,
) -> Result<Json<UserView>, ApiError> {
    if let Some(email) = &update.email {
        validate_email(email)?;
    }
    if let Some(password) = &update.password {
        validate_password(password)?;
    }

    let update = update.into_inner();
    db.run(move |conn| {
        let existing = get_user(conn, user_id)
            .map_err(|e| store_error("Error loading user", e))?
            .ok_or_else(|| not_found("User", user_id))?;

        if existing.is_admin() && update.role == Some(UserRole::User) {
            let admins = count_admins(conn).map_err(|e| store_error("Error counting admins", e))?;
            if admins <= 1 {
                return Err(error_response(
                    Status::BadRequest,
                    "Cannot demote the last administrator",
                ));
            }
        }

        update_user(conn, user_id, update)
            .map(|user| Json(UserView::from(user)))
            .map_err(|e| store_error("Error updating user", e))
    })
    .await
}

/// Delete User endpoint.
///
/// - **URL:** `/api/1/Users/<user_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Deletes an account with its sessions and grants
/// - **Authentication:** Admin
///
/// Admins cannot delete themselves.  Returns 204 on success.
#[delete("/1/Users/<user_id>")]
pub async fn delete_user_endpoint(
    db: DbConn,
    admin: AdminUser,
    user_id: i32,
) -> Result<Status, ApiError> {
    if admin.user.id == user_id {
        return Err(error_response(
            Status::BadRequest,
            "You cannot delete your own account",
        ));
    }

    let deleted = db
        .run(move |conn| delete_user(conn, user_id))
        .await
        .map_err(|e| store_error("Error deleting user", e))?;
    if deleted == 0 {
        return Err(not_found("User", user_id));
    }
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![list_users, create_user, update_user_endpoint, delete_user_endpoint]
}
