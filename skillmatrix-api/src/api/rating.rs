//! API endpoint for editing one matrix cell.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State, put};

use super::{ApiError, ErrorResponse, error_response, not_found, store_error};
use crate::DbConn;
use crate::access::AccessContext;
use crate::feed::ChangeFeed;
use crate::logged_json::LoggedJson;
use crate::orm::employee::get_employee;
use crate::rating::{RatingEdit, RatingError, RatingOutcome, apply_rating_edit, validate_rating};

impl From<RatingError> for status::Custom<Json<ErrorResponse>> {
    fn from(e: RatingError) -> Self {
        let status = match &e {
            RatingError::Unauthenticated => Status::Unauthorized,
            RatingError::OutOfRange(_) => Status::BadRequest,
            RatingError::EmployeeNotFound(_) | RatingError::StationNotFound(_) => Status::NotFound,
            RatingError::Store(_) => {
                error!("Rating store error: {:?}", e);
                Status::InternalServerError
            }
        };
        error_response(status, e.to_string())
    }
}

/// Set Rating endpoint.
///
/// - **URL:** `/api/1/Ratings`
/// - **Method:** `PUT`
/// - **Purpose:** Sets or clears the rating of one employee at one station
/// - **Authentication:** Write access to the employee's team
///
/// # Request Format
///
/// ```json
/// { "employee_id": 12, "station_id": 3, "rating": 4 }
/// ```
///
/// A `null` rating clears the cell.  Ratings outside 1..=5 are rejected
/// with 400 before anything is written; a caller without write access gets
/// 403 and the store is never touched.
///
/// # Response
///
/// ```json
/// { "outcome": "saved", "rating": { "id": 1, "employee_id": 12, "station_id": 3, "rating": 4, ... } }
/// { "outcome": "cleared", "existed": true }
/// ```
#[put("/1/Ratings", data = "<edit>")]
pub async fn set_rating(
    db: DbConn,
    feed: &State<ChangeFeed>,
    access: AccessContext,
    edit: LoggedJson<RatingEdit>,
) -> Result<Json<RatingOutcome>, ApiError> {
    let edit = edit.into_inner();
    validate_rating(edit.rating)?;

    let employee_id = edit.employee_id;
    let employee = db
        .run(move |conn| get_employee(conn, employee_id))
        .await
        .map_err(|e| store_error("Error loading employee", e))?
        .ok_or_else(|| not_found("Employee", employee_id))?;
    access.can_write_employee(employee.id, employee.team_id)?;

    let actor = Some(access.user_id);
    let feed = feed.inner().clone();
    let outcome = db
        .run(move |conn| apply_rating_edit(conn, actor, edit, &feed))
        .await?;
    Ok(Json(outcome))
}

pub fn routes() -> Vec<Route> {
    routes![set_rating]
}
