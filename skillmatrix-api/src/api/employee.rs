//! API endpoints for team members.
//!
//! Employee permissions follow the team the employee belongs to.  An
//! employee whose team cannot be resolved cannot be changed by anyone.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State, delete, get, post, put};

use super::{ApiError, error_response, not_found, store_error};
use crate::DbConn;
use crate::access::AccessContext;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::logged_json::LoggedJson;
use crate::models::{Employee, EmployeeInput, EmployeeUpdate};
use crate::orm::employee::{
    delete_employee, get_employee, insert_employee, insert_employees_bulk, list_team_employees,
    update_employee,
};
use crate::orm::team::get_team;

async fn require_team(db: &DbConn, team_id: i32) -> Result<(), ApiError> {
    match db.run(move |conn| get_team(conn, team_id)).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(not_found("Team", team_id)),
        Err(e) => Err(store_error("Error loading team", e)),
    }
}

async fn load_employee(db: &DbConn, employee_id: i32) -> Result<Employee, ApiError> {
    db.run(move |conn| get_employee(conn, employee_id))
        .await
        .map_err(|e| store_error("Error loading employee", e))?
        .ok_or_else(|| not_found("Employee", employee_id))
}

/// List Team Employees endpoint.
///
/// - **URL:** `/api/1/Teams/<team_id>/Employees`
/// - **Method:** `GET`
/// - **Purpose:** Lists a team's members by last name
/// - **Authentication:** Read access to the team
#[get("/1/Teams/<team_id>/Employees")]
pub async fn list_employees(
    db: DbConn,
    access: AccessContext,
    team_id: i32,
) -> Result<Json<Vec<Employee>>, ApiError> {
    access.require_read(team_id)?;
    db.run(move |conn| list_team_employees(conn, team_id))
        .await
        .map(Json)
        .map_err(|e| store_error("Error listing employees", e))
}

/// Create Employee endpoint.
///
/// - **URL:** `/api/1/Teams/<team_id>/Employees`
/// - **Method:** `POST`
/// - **Purpose:** Adds a member to a team
/// - **Authentication:** Write access to the team
///
/// ```json
/// {
///   "first_name": "Ann",
///   "last_name": "Doe",
///   "role": "Operator",
///   "contract_type": "Permanent"
/// }
/// ```
#[post("/1/Teams/<team_id>/Employees", data = "<input>")]
pub async fn create_employee(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    team_id: i32,
    input: LoggedJson<EmployeeInput>,
) -> Result<status::Created<Json<Employee>>, ApiError> {
    access.require_write(team_id)?;
    input
        .validate()
        .map_err(|msg| error_response(Status::BadRequest, msg))?;
    require_team(&db, team_id).await?;

    let new = input.into_inner().into_new(team_id);
    let employee = db
        .run(move |conn| insert_employee(conn, new))
        .await
        .map_err(|e| store_error("Error creating employee", e))?;

    feed.publish(ChangeEvent::new(
        Table::Employees,
        ChangeKind::Insert,
        employee.id,
        Some(team_id),
    ));
    let location = format!("/api/1/Employees/{}", employee.id);
    Ok(status::Created::new(location).body(Json(employee)))
}

/// Bulk Create Employees endpoint.
///
/// - **URL:** `/api/1/Teams/<team_id>/Employees/Bulk`
/// - **Method:** `POST`
/// - **Purpose:** Adds several members to a team at once
/// - **Authentication:** Write access to the team
///
/// The body is an array of employee objects.  Either all rows are created
/// or none; a row failing validation rejects the whole batch with 400.
#[post("/1/Teams/<team_id>/Employees/Bulk", data = "<inputs>")]
pub async fn create_employees_bulk(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    team_id: i32,
    inputs: LoggedJson<Vec<EmployeeInput>>,
) -> Result<status::Created<Json<Vec<Employee>>>, ApiError> {
    access.require_write(team_id)?;
    if inputs.is_empty() {
        return Err(error_response(
            Status::BadRequest,
            "At least one employee is required",
        ));
    }
    for (index, input) in inputs.iter().enumerate() {
        input
            .validate()
            .map_err(|msg| error_response(Status::BadRequest, format!("Row {}: {}", index + 1, msg)))?;
    }
    require_team(&db, team_id).await?;

    let inputs = inputs.into_inner();
    let created = db
        .run(move |conn| insert_employees_bulk(conn, team_id, inputs))
        .await
        .map_err(|e| store_error("Error creating employees", e))?;

    for employee in &created {
        feed.publish(ChangeEvent::new(
            Table::Employees,
            ChangeKind::Insert,
            employee.id,
            Some(team_id),
        ));
    }
    let location = format!("/api/1/Teams/{}/Employees", team_id);
    Ok(status::Created::new(location).body(Json(created)))
}

/// Update Employee endpoint.
///
/// - **URL:** `/api/1/Employees/<employee_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Changes an employee's details or moves them to another team
/// - **Authentication:** Write access to the employee's team (and the target team when moving)
#[put("/1/Employees/<employee_id>", data = "<update>")]
pub async fn update_employee_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    employee_id: i32,
    update: LoggedJson<EmployeeUpdate>,
) -> Result<Json<Employee>, ApiError> {
    let current = load_employee(&db, employee_id).await?;
    access.can_write_employee(employee_id, current.team_id)?;

    let update = update.into_inner();
    if let Some(target) = update.team_id.filter(|t| Some(*t) != current.team_id) {
        access.require_write(target)?;
        require_team(&db, target).await?;
    }
    for name in [&update.first_name, &update.last_name].into_iter().flatten() {
        if name.trim().is_empty() {
            return Err(error_response(Status::BadRequest, "Names cannot be blank"));
        }
    }

    let employee = db
        .run(move |conn| update_employee(conn, employee_id, update))
        .await
        .map_err(|e| store_error("Error updating employee", e))?;

    // A moved employee leaves the old team's views.
    if current.team_id.is_some() && current.team_id != employee.team_id {
        feed.publish(ChangeEvent::new(
            Table::Employees,
            ChangeKind::Delete,
            employee.id,
            current.team_id,
        ));
    }
    feed.publish(ChangeEvent::new(
        Table::Employees,
        ChangeKind::Update,
        employee.id,
        employee.team_id,
    ));
    Ok(Json(employee))
}

/// Delete Employee endpoint.
///
/// - **URL:** `/api/1/Employees/<employee_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Removes an employee and their ratings
/// - **Authentication:** Write access to the employee's team
#[delete("/1/Employees/<employee_id>")]
pub async fn delete_employee_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    employee_id: i32,
) -> Result<Status, ApiError> {
    let current = load_employee(&db, employee_id).await?;
    access.can_write_employee(employee_id, current.team_id)?;

    db.run(move |conn| delete_employee(conn, employee_id))
        .await
        .map_err(|e| store_error("Error deleting employee", e))?;

    feed.publish(ChangeEvent::new(
        Table::Employees,
        ChangeKind::Delete,
        employee_id,
        current.team_id,
    ));
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_employees,
        create_employee,
        create_employees_bulk,
        update_employee_endpoint,
        delete_employee_endpoint
    ]
}
