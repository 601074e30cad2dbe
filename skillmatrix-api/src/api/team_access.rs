//! API endpoints for per-team grants.
//!
//! Grants are written to the access store and its legacy projection in one
//! transaction.  A changed grant is visible to the affected user on their
//! next request.

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Route, State, delete, get, put};

use super::{ApiError, not_found, store_error};
use crate::DbConn;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::logged_json::LoggedJson;
use crate::models::{TeamAccess, TeamAccessInput};
use crate::orm::team::get_team;
use crate::orm::team_access::{get_user_team_access, grant_team_access, revoke_team_access};
use crate::orm::user::get_user;
use crate::session_guards::{AdminUser, AuthenticatedUser};

/// List Team Access endpoint.
///
/// - **URL:** `/api/1/Users/<user_id>/TeamAccess`
/// - **Method:** `GET`
/// - **Purpose:** Lists a user's team grants
/// - **Authentication:** Admin, or the user themselves
#[get("/1/Users/<user_id>/TeamAccess")]
pub async fn list_team_access(
    db: DbConn,
    auth_user: AuthenticatedUser,
    user_id: i32,
) -> Result<Json<Vec<TeamAccess>>, ApiError> {
    if !auth_user.is_admin() && auth_user.user.id != user_id {
        return Err(super::error_response(
            Status::Forbidden,
            "You can only view your own team access",
        ));
    }

    db.run(move |conn| get_user_team_access(conn, user_id))
        .await
        .map(Json)
        .map_err(|e| store_error("Error loading team access", e))
}

/// Grant Team Access endpoint.
///
/// - **URL:** `/api/1/Users/<user_id>/TeamAccess/<team_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Creates or replaces a user's grant on a team
/// - **Authentication:** Admin
///
/// # Request Format
///
/// ```json
/// { "can_read": true, "can_write": true }
/// ```
///
/// Write access always implies read access; the stored grant is returned.
#[put("/1/Users/<user_id>/TeamAccess/<team_id>", data = "<grant>")]
pub async fn grant_team_access_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    _admin: AdminUser,
    user_id: i32,
    team_id: i32,
    grant: LoggedJson<TeamAccessInput>,
) -> Result<Json<TeamAccess>, ApiError> {
    let grant = grant.into_inner();
    let (access, existed) = db
        .run(move |conn| {
            if get_user(conn, user_id)
                .map_err(|e| store_error("Error loading user", e))?
                .is_none()
            {
                return Err(not_found("User", user_id));
            }
            if get_team(conn, team_id)
                .map_err(|e| store_error("Error loading team", e))?
                .is_none()
            {
                return Err(not_found("Team", team_id));
            }
            let existed = get_user_team_access(conn, user_id)
                .map_err(|e| store_error("Error loading team access", e))?
                .iter()
                .any(|row| row.team_id == team_id);
            grant_team_access(conn, user_id, team_id, grant)
                .map(|access| (access, existed))
                .map_err(|e| store_error("Error granting team access", e))
        })
        .await?;

    let kind = if existed {
        ChangeKind::Update
    } else {
        ChangeKind::Insert
    };
    feed.publish(ChangeEvent::new(Table::TeamAccess, kind, access.id, Some(team_id)));
    Ok(Json(access))
}

/// Revoke Team Access endpoint.
///
/// - **URL:** `/api/1/Users/<user_id>/TeamAccess/<team_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Removes a user's grant on a team
/// - **Authentication:** Admin
///
/// Returns 204 whether or not a grant existed.
#[delete("/1/Users/<user_id>/TeamAccess/<team_id>")]
pub async fn revoke_team_access_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    _admin: AdminUser,
    user_id: i32,
    team_id: i32,
) -> Result<Status, ApiError> {
    let revoked = db
        .run(move |conn| {
            let row = get_user_team_access(conn, user_id)?
                .into_iter()
                .find(|row| row.team_id == team_id);
            revoke_team_access(conn, user_id, team_id)?;
            Ok::<_, diesel::result::Error>(row)
        })
        .await
        .map_err(|e| store_error("Error revoking team access", e))?;

    if let Some(row) = revoked {
        feed.publish(ChangeEvent::new(
            Table::TeamAccess,
            ChangeKind::Delete,
            row.id,
            Some(team_id),
        ));
    }
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_team_access,
        grant_team_access_endpoint,
        revoke_team_access_endpoint
    ]
}
