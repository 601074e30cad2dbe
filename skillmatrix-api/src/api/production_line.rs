//! API endpoints for production lines.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State, delete, get, post, put};

use super::{ApiError, not_found, required_name, store_error};
use crate::DbConn;
use crate::access::AccessContext;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::logged_json::LoggedJson;
use crate::models::{ProductionLine, ProductionLineInput, ProductionLineUpdate};
use crate::orm::production_line::{
    delete_production_line, insert_production_line, list_production_lines,
    update_production_line,
};
use crate::session_guards::AuthenticatedUser;

/// List Production Lines endpoint.
///
/// - **URL:** `/api/1/ProductionLines?department_id=<id>`
/// - **Method:** `GET`
/// - **Purpose:** Lists production lines, optionally of one department
/// - **Authentication:** Required
#[get("/1/ProductionLines?<department_id>")]
pub async fn list_production_lines_endpoint(
    db: DbConn,
    _auth_user: AuthenticatedUser,
    department_id: Option<i32>,
) -> Result<Json<Vec<ProductionLine>>, ApiError> {
    db.run(move |conn| list_production_lines(conn, department_id))
        .await
        .map(Json)
        .map_err(|e| store_error("Error listing production lines", e))
}

/// Create Production Line endpoint.
///
/// - **URL:** `/api/1/ProductionLines`
/// - **Method:** `POST`
/// - **Purpose:** Creates a production line in a department
/// - **Authentication:** Admin
///
/// ```json
/// { "name": "Line 1", "department_id": 3 }
/// ```
///
/// An unknown department yields 400; a duplicate name within the
/// department yields 409.
#[post("/1/ProductionLines", data = "<input>")]
pub async fn create_production_line(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    input: LoggedJson<ProductionLineInput>,
) -> Result<status::Created<Json<ProductionLine>>, ApiError> {
    access.require_admin()?;
    let name = required_name(&input.name, "Production line")?;
    let department_id = input.department_id;

    let line = db
        .run(move |conn| insert_production_line(conn, &name, department_id))
        .await
        .map_err(|e| store_error("Error creating production line", e))?;

    feed.publish(ChangeEvent::new(
        Table::ProductionLines,
        ChangeKind::Insert,
        line.id,
        None,
    ));
    let location = format!("/api/1/ProductionLines/{}", line.id);
    Ok(status::Created::new(location).body(Json(line)))
}

/// Update Production Line endpoint.
///
/// - **URL:** `/api/1/ProductionLines/<line_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Renames a line or moves it to another department
/// - **Authentication:** Admin
#[put("/1/ProductionLines/<line_id>", data = "<update>")]
pub async fn update_production_line_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    line_id: i32,
    update: LoggedJson<ProductionLineUpdate>,
) -> Result<Json<ProductionLine>, ApiError> {
    access.require_admin()?;
    let mut update = update.into_inner();
    if let Some(name) = &update.name {
        update.name = Some(required_name(name, "Production line")?);
    }

    let line = db
        .run(move |conn| update_production_line(conn, line_id, update))
        .await
        .map_err(|e| store_error("Error updating production line", e))?;

    feed.publish(ChangeEvent::new(
        Table::ProductionLines,
        ChangeKind::Update,
        line.id,
        None,
    ));
    Ok(Json(line))
}

/// Delete Production Line endpoint.
///
/// - **URL:** `/api/1/ProductionLines/<line_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Deletes a line with its teams and their employees
/// - **Authentication:** Admin
#[delete("/1/ProductionLines/<line_id>")]
pub async fn delete_production_line_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    line_id: i32,
) -> Result<Status, ApiError> {
    access.require_admin()?;

    let deleted = db
        .run(move |conn| delete_production_line(conn, line_id))
        .await
        .map_err(|e| store_error("Error deleting production line", e))?;
    if deleted == 0 {
        return Err(not_found("Production line", line_id));
    }

    feed.publish(ChangeEvent::new(
        Table::ProductionLines,
        ChangeKind::Delete,
        line_id,
        None,
    ));
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_production_lines_endpoint,
        create_production_line,
        update_production_line_endpoint,
        delete_production_line_endpoint
    ]
}
