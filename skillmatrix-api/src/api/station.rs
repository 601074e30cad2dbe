//! API endpoints for work stations.
//!
//! Station names are trimmed, between 2 and 49 characters, and unique per
//! department regardless of case.  The uniqueness check is bounded by
//! `station_check_timeout_secs`; when it runs out the request fails with
//! 504 and nothing is written.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State, delete, get, post, put};

use super::{ApiError, error_response, not_found, store_error};
use crate::DbConn;
use crate::access::AccessContext;
use crate::config::SkillMatrixConfig;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::logged_json::LoggedJson;
use crate::models::{Station, StationInput};
use crate::orm::department::get_department;
use crate::orm::station::{
    StationNameError, delete_station, get_station, insert_station, list_all_stations,
    list_department_stations, normalize_station_name, rename_station, station_name_taken,
};
use crate::session_guards::AuthenticatedUser;

fn name_error(e: StationNameError) -> ApiError {
    let status = match e {
        StationNameError::Duplicate(_) => Status::Conflict,
        _ => Status::BadRequest,
    };
    error_response(status, e.to_string())
}

/// Fails unless `name` is free in the department, within the configured
/// time limit.
async fn ensure_name_available(
    db: &DbConn,
    config: &SkillMatrixConfig,
    department_id: i32,
    name: &str,
    except: Option<i32>,
) -> Result<(), ApiError> {
    let wanted = name.to_string();
    let check = db.run(move |conn| station_name_taken(conn, department_id, &wanted, except));

    match tokio::time::timeout(config.station_check_timeout(), check).await {
        Err(_) => {
            warn!(
                "Station name check for department {} timed out after {}s",
                department_id, config.station_check_timeout_secs
            );
            Err(error_response(
                Status::GatewayTimeout,
                "Station name validation timed out, try again",
            ))
        }
        Ok(Err(e)) => Err(store_error("Error checking station names", e)),
        Ok(Ok(true)) => Err(name_error(StationNameError::Duplicate(name.to_string()))),
        Ok(Ok(false)) => Ok(()),
    }
}

/// List Stations endpoint.
///
/// - **URL:** `/api/1/Stations`
/// - **Method:** `GET`
/// - **Purpose:** Lists every station, grouped by department
/// - **Authentication:** Required
#[get("/1/Stations")]
pub async fn list_stations(
    db: DbConn,
    _auth_user: AuthenticatedUser,
) -> Result<Json<Vec<Station>>, ApiError> {
    db.run(list_all_stations)
        .await
        .map(Json)
        .map_err(|e| store_error("Error listing stations", e))
}

/// List Department Stations endpoint.
///
/// - **URL:** `/api/1/Departments/<department_id>/Stations`
/// - **Method:** `GET`
/// - **Purpose:** Lists a department's stations by name
/// - **Authentication:** Required
#[get("/1/Departments/<department_id>/Stations")]
pub async fn list_department_stations_endpoint(
    db: DbConn,
    _auth_user: AuthenticatedUser,
    department_id: i32,
) -> Result<Json<Vec<Station>>, ApiError> {
    db.run(move |conn| list_department_stations(conn, department_id))
        .await
        .map(Json)
        .map_err(|e| store_error("Error listing stations", e))
}

/// Create Station endpoint.
///
/// - **URL:** `/api/1/Departments/<department_id>/Stations`
/// - **Method:** `POST`
/// - **Purpose:** Adds a station to a department
/// - **Authentication:** Admin
///
/// ```json
/// { "name": "Welding" }
/// ```
///
/// # Response
///
/// - **201** with the station
/// - **400** for a blank, too short or too long name
/// - **404** for an unknown department
/// - **409** when the department already has a station of that name
/// - **504** when the duplicate check timed out
#[post("/1/Departments/<department_id>/Stations", data = "<input>")]
pub async fn create_station(
    db: DbConn,
    config: &State<SkillMatrixConfig>,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    department_id: i32,
    input: LoggedJson<StationInput>,
) -> Result<status::Created<Json<Station>>, ApiError> {
    access.require_admin()?;
    let name = normalize_station_name(&input.name).map_err(name_error)?;

    let department = db
        .run(move |conn| get_department(conn, department_id))
        .await
        .map_err(|e| store_error("Error loading department", e))?;
    if department.is_none() {
        return Err(not_found("Department", department_id));
    }

    ensure_name_available(&db, config, department_id, &name, None).await?;

    let station = db
        .run(move |conn| insert_station(conn, department_id, &name))
        .await
        .map_err(|e| store_error("Error creating station", e))?;

    feed.publish(ChangeEvent::new(
        Table::Stations,
        ChangeKind::Insert,
        station.id,
        None,
    ));
    let location = format!("/api/1/Stations/{}", station.id);
    Ok(status::Created::new(location).body(Json(station)))
}

/// Rename Station endpoint.
///
/// - **URL:** `/api/1/Stations/<station_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Renames a station under the same rules as creation
/// - **Authentication:** Admin
#[put("/1/Stations/<station_id>", data = "<input>")]
pub async fn update_station(
    db: DbConn,
    config: &State<SkillMatrixConfig>,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    station_id: i32,
    input: LoggedJson<StationInput>,
) -> Result<Json<Station>, ApiError> {
    access.require_admin()?;
    let name = normalize_station_name(&input.name).map_err(name_error)?;

    let current = db
        .run(move |conn| get_station(conn, station_id))
        .await
        .map_err(|e| store_error("Error loading station", e))?
        .ok_or_else(|| not_found("Station", station_id))?;

    ensure_name_available(&db, config, current.department_id, &name, Some(station_id)).await?;

    let station = db
        .run(move |conn| rename_station(conn, station_id, &name))
        .await
        .map_err(|e| store_error("Error updating station", e))?;

    feed.publish(ChangeEvent::new(
        Table::Stations,
        ChangeKind::Update,
        station.id,
        None,
    ));
    Ok(Json(station))
}

/// Delete Station endpoint.
///
/// - **URL:** `/api/1/Stations/<station_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Deletes a station and every rating recorded against it
/// - **Authentication:** Admin
#[delete("/1/Stations/<station_id>")]
pub async fn delete_station_endpoint(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    station_id: i32,
) -> Result<Status, ApiError> {
    access.require_admin()?;

    let deleted = db
        .run(move |conn| delete_station(conn, station_id))
        .await
        .map_err(|e| store_error("Error deleting station", e))?;
    if deleted == 0 {
        return Err(not_found("Station", station_id));
    }

    feed.publish(ChangeEvent::new(
        Table::Stations,
        ChangeKind::Delete,
        station_id,
        None,
    ));
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_stations,
        list_department_stations_endpoint,
        create_station,
        update_station,
        delete_station_endpoint
    ]
}
