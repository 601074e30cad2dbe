//! API endpoints for teams.
//!
//! Teams are listed through the caller's grants.  Any user with write
//! access to some team may create a team; changing or deleting one needs
//! write access to that team.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State, delete, get, post, put};

use super::{ApiError, not_found, required_name, store_error};
use crate::DbConn;
use crate::access::AccessContext;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::logged_json::LoggedJson;
use crate::models::{Team, TeamInput, TeamUpdate};
use crate::orm::team::{delete_team, insert_team, list_teams, update_team};

/// List Teams endpoint.
///
/// - **URL:** `/api/1/Teams?production_line_id=<id>`
/// - **Method:** `GET`
/// - **Purpose:** Lists the teams the caller can read
/// - **Authentication:** Required; admins see every team
#[get("/1/Teams?<production_line_id>")]
pub async fn list_teams_endpoint(
    db: DbConn,
    access: AccessContext,
    production_line_id: Option<i32>,
) -> Result<Json<Vec<Team>>, ApiError> {
    let readable = access.readable_team_ids();
    let teams = db
        .run(move |conn| list_teams(conn, readable.as_deref()))
        .await
        .map_err(|e| store_error("Error listing teams", e))?;

    Ok(Json(
        teams
            .into_iter()
            .filter(|t| production_line_id.is_none_or(|line| t.production_line_id == line))
            .collect(),
    ))
}

/// Create Team endpoint.
///
/// - **URL:** `/api/1/Teams`
/// - **Method:** `POST`
/// - **Purpose:** Creates a team on a production line
/// - **Authentication:** Write access to at least one team
///
/// ```json
/// { "name": "Early shift", "production_line_id": 4 }
/// ```
#[post("/1/Teams", data = "<input>")]
pub async fn create_team(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    input: LoggedJson<TeamInput>,
) -> Result<status::Created<Json<Team>>, ApiError> {
    access.require_any_write()?;
    let name = required_name(&input.name, "Team")?;
    let line_id = input.production_line_id;

    let team = db
        .run(move |conn| insert_team(conn, &name, line_id))
        .await
        .map_err(|e| store_error("Error creating team", e))?;

    feed.publish(ChangeEvent::new(
        Table::Teams,
        ChangeKind::Insert,
        team.id,
        Some(team.id),
    ));
    let location = format!("/api/1/Teams/{}", team.id);
    Ok(status::Created::new(location).body(Json(team)))
}

/// Update Team endpoint.
///
/// - **URL:** `/api/1/Teams/<team_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Renames a team or moves it to another production line
/// - **Authentication:** Write access to the team
#[put("/1/Teams/<team_id>", data = "<update>")]
pub async fn update_team_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    team_id: i32,
    update: LoggedJson<TeamUpdate>,
) -> Result<Json<Team>, ApiError> {
    access.require_write(team_id)?;
    let mut update = update.into_inner();
    if let Some(name) = &update.name {
        update.name = Some(required_name(name, "Team")?);
    }

    let team = db
        .run(move |conn| update_team(conn, team_id, update))
        .await
        .map_err(|e| store_error("Error updating team", e))?;

    feed.publish(ChangeEvent::new(
        Table::Teams,
        ChangeKind::Update,
        team.id,
        Some(team.id),
    ));
    Ok(Json(team))
}

/// Delete Team endpoint.
///
/// - **URL:** `/api/1/Teams/<team_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Deletes a team with its employees, ratings and grants
/// - **Authentication:** Write access to the team
#[delete("/1/Teams/<team_id>")]
pub async fn delete_team_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    team_id: i32,
) -> Result<Status, ApiError> {
    access.require_write(team_id)?;

    let deleted = db
        .run(move |conn| delete_team(conn, team_id))
        .await
        .map_err(|e| store_error("Error deleting team", e))?;
    if deleted == 0 {
        return Err(not_found("Team", team_id));
    }

    feed.publish(ChangeEvent::new(
        Table::Teams,
        ChangeKind::Delete,
        team_id,
        Some(team_id),
    ));
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_teams_endpoint,
        create_team,
        update_team_endpoint,
        delete_team_endpoint
    ]
}
