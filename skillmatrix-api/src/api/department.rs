//! API endpoints for departments.
//!
//! Any signed-in user can list departments.  Creating, renaming and deleting
//! them is reserved for administrators.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State, delete, get, post, put};

use super::{ApiError, not_found, required_name, store_error};
use crate::DbConn;
use crate::access::AccessContext;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::logged_json::LoggedJson;
use crate::models::{Department, DepartmentInput};
use crate::orm::department::{delete_department, insert_department, list_departments, rename_department};
use crate::session_guards::AuthenticatedUser;

/// List Departments endpoint.
///
/// - **URL:** `/api/1/Departments`
/// - **Method:** `GET`
/// - **Purpose:** Lists departments ordered by name
/// - **Authentication:** Required
#[get("/1/Departments")]
pub async fn list_departments_endpoint(
    db: DbConn,
    _auth_user: AuthenticatedUser,
) -> Result<Json<Vec<Department>>, ApiError> {
    db.run(list_departments)
        .await
        .map(Json)
        .map_err(|e| store_error("Error listing departments", e))
}

/// Create Department endpoint.
///
/// - **URL:** `/api/1/Departments`
/// - **Method:** `POST`
/// - **Purpose:** Creates a department
/// - **Authentication:** Admin
///
/// ```json
/// { "name": "Assembly" }
/// ```
///
/// Returns 201, 400 for a blank name or 409 for a duplicate.
#[post("/1/Departments", data = "<input>")]
pub async fn create_department(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    input: LoggedJson<DepartmentInput>,
) -> Result<status::Created<Json<Department>>, ApiError> {
    access.require_admin()?;
    let name = required_name(&input.name, "Department")?;

    let department = db
        .run(move |conn| insert_department(conn, &name))
        .await
        .map_err(|e| store_error("Error creating department", e))?;

    feed.publish(ChangeEvent::new(
        Table::Departments,
        ChangeKind::Insert,
        department.id,
        None,
    ));
    let location = format!("/api/1/Departments/{}", department.id);
    Ok(status::Created::new(location).body(Json(department)))
}

/// Rename Department endpoint.
///
/// - **URL:** `/api/1/Departments/<department_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Renames a department
/// - **Authentication:** Admin
#[put("/1/Departments/<department_id>", data = "<input>")]
pub async fn update_department(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    department_id: i32,
    input: LoggedJson<DepartmentInput>,
) -> Result<Json<Department>, ApiError> {
    access.require_admin()?;
    let name = required_name(&input.name, "Department")?;

    let department = db
        .run(move |conn| rename_department(conn, department_id, &name))
        .await
        .map_err(|e| store_error("Error updating department", e))?;

    feed.publish(ChangeEvent::new(
        Table::Departments,
        ChangeKind::Update,
        department.id,
        None,
    ));
    Ok(Json(department))
}

/// Delete Department endpoint.
///
/// - **URL:** `/api/1/Departments/<department_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Deletes a department and everything below it
/// - **Authentication:** Admin
///
/// Production lines, teams, employees, stations and ratings of the
/// department are removed with it.  Returns 204.
#[delete("/1/Departments/<department_id>")]
pub async fn delete_department_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    department_id: i32,
) -> Result<Status, ApiError> {
    access.require_admin()?;

    let deleted = db
        .run(move |conn| delete_department(conn, department_id))
        .await
        .map_err(|e| store_error("Error deleting department", e))?;
    if deleted == 0 {
        return Err(not_found("Department", department_id));
    }

    feed.publish(ChangeEvent::new(
        Table::Departments,
        ChangeKind::Delete,
        department_id,
        None,
    ));
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_departments_endpoint,
        create_department,
        update_department,
        delete_department_endpoint
    ]
}
