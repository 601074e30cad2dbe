//! Reporting endpoints: team headcount, station rating averages and
//! staffing gaps.
//!
//! Non-admin callers only ever see employees of teams they can read.  A
//! failed query returns an error and no partial payload.

use std::collections::HashMap;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Route, State, get, post};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{ApiError, error_response, not_found, store_error};
use crate::DbConn;
use crate::access::AccessContext;
use crate::config::SkillMatrixConfig;
use crate::logged_json::LoggedJson;
use crate::orm::report::{load_rating_rows, load_resolved_employees, load_station_refs};
use crate::orm::team::get_team_placement;
use crate::rating::{MAX_RATING, MIN_RATING};
use crate::report::{
    GroupLevel, HierarchyFilter, StationGap, StationRatingSummary, TeamStatistics, station_gap_report,
    station_rating_aggregate, team_statistics,
};

/// Teams to load for a request: the requested team after a read check, or
/// everything the caller can read.
fn scoped_teams(access: &AccessContext, team_id: Option<i32>) -> Result<Option<Vec<i32>>, ApiError> {
    match team_id {
        Some(team_id) => {
            access.require_read(team_id)?;
            Ok(Some(vec![team_id]))
        }
        None => Ok(access.readable_team_ids()),
    }
}

/// Team Statistics endpoint.
///
/// - **URL:** `/api/1/Reports/TeamStatistics?team_id=<id>`
/// - **Method:** `GET`
/// - **Purpose:** Headcount by role group and contract type
/// - **Authentication:** Read access to the team; without `team_id`, all readable teams
///
/// # Response
///
/// ```json
/// { "total": 3, "leadership": 1, "workforce": 2, "permanent": 2, "temporary": 1 }
/// ```
#[get("/1/Reports/TeamStatistics?<team_id>")]
pub async fn team_statistics_endpoint(
    db: DbConn,
    access: AccessContext,
    team_id: Option<i32>,
) -> Result<Json<TeamStatistics>, ApiError> {
    let teams = scoped_teams(&access, team_id)?;
    let employees = db
        .run(move |conn| load_resolved_employees(conn, teams.as_deref()))
        .await
        .map_err(|e| store_error("Error loading team statistics", e))?;

    Ok(Json(team_statistics(
        employees.iter().map(|e| (e.role, e.contract_type)),
    )))
}

/// Station Ratings endpoint.
///
/// - **URL:** `/api/1/Reports/StationRatings?department_id=&production_line_id=&team_id=`
/// - **Method:** `GET`
/// - **Purpose:** Average rating and rating count per station
/// - **Authentication:** Required; results are limited to readable teams
///
/// Grouping follows the deepest filter given: station only, then
/// department, production line and team.  A line filter needs a department
/// filter and a team filter needs both.
#[get("/1/Reports/StationRatings?<department_id>&<production_line_id>&<team_id>")]
pub async fn station_ratings_endpoint(
    db: DbConn,
    access: AccessContext,
    department_id: Option<i32>,
    production_line_id: Option<i32>,
    team_id: Option<i32>,
) -> Result<Json<Vec<StationRatingSummary>>, ApiError> {
    let filter = HierarchyFilter {
        department_id,
        production_line_id,
        team_id,
    };
    let requested_team = team_id.filter(|_| filter.level() == GroupLevel::Team);
    let teams = scoped_teams(&access, requested_team)?;

    let summaries = db
        .run(move |conn| {
            let employees = load_resolved_employees(conn, teams.as_deref())?;
            let ids: Vec<i32> = employees.iter().map(|e| e.employee_id).collect();
            let stations = load_station_refs(conn, department_id)?;
            let ratings = load_rating_rows(conn, Some(&ids))?;
            Ok::<_, diesel::result::Error>(station_rating_aggregate(
                &employees, &stations, &ratings, &filter,
            ))
        })
        .await
        .map_err(|e| store_error("Error loading station ratings", e))?;
    Ok(Json(summaries))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StationTarget {
    pub station_id: i32,
    pub target: i64,
}

/// Gap report request.  Targets are used for this report only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StationGapRequest {
    pub team_id: i32,
    #[serde(default)]
    pub targets: Vec<StationTarget>,
    /// Overrides the configured qualifying threshold.
    #[serde(default)]
    pub threshold: Option<i32>,
}

/// Station Gaps endpoint.
///
/// - **URL:** `/api/1/Reports/StationGaps`
/// - **Method:** `POST`
/// - **Purpose:** Compares qualified headcount per station with the given targets
/// - **Authentication:** Read access to the team
///
/// # Request Format
///
/// ```json
/// { "team_id": 4, "targets": [{ "station_id": 3, "target": 2 }] }
/// ```
///
/// Every station of the team's department is reported.  A station without a
/// target uses 0.  Employees rated 1 or 2 are listed as upskill candidates.
#[post("/1/Reports/StationGaps", data = "<request>")]
pub async fn station_gaps_endpoint(
    db: DbConn,
    config: &State<SkillMatrixConfig>,
    access: AccessContext,
    request: LoggedJson<StationGapRequest>,
) -> Result<Json<Vec<StationGap>>, ApiError> {
    let request = request.into_inner();
    access.require_read(request.team_id)?;

    let threshold = request.threshold.unwrap_or(config.qualifying_threshold);
    if !(MIN_RATING..=MAX_RATING).contains(&threshold) {
        return Err(error_response(
            Status::BadRequest,
            format!("Threshold must be between 1 and 5, got {}", threshold),
        ));
    }
    if let Some(bad) = request.targets.iter().find(|t| t.target < 0) {
        return Err(error_response(
            Status::BadRequest,
            format!("Target for station {} cannot be negative", bad.station_id),
        ));
    }
    let targets: HashMap<i32, i64> = request
        .targets
        .iter()
        .map(|t| (t.station_id, t.target))
        .collect();

    let team_id = request.team_id;
    db.run(move |conn| {
        let placement = get_team_placement(conn, team_id)
            .map_err(|e| store_error("Error loading team", e))?
            .ok_or_else(|| not_found("Team", team_id))?;
        let load = |conn: &mut diesel::SqliteConnection| {
            let employees = load_resolved_employees(conn, Some(&[team_id]))?;
            let ids: Vec<i32> = employees.iter().map(|e| e.employee_id).collect();
            let stations = load_station_refs(conn, Some(placement.department_id))?;
            let ratings = load_rating_rows(conn, Some(&ids))?;
            Ok::<_, diesel::result::Error>(station_gap_report(
                &stations, &employees, &ratings, &targets, threshold,
            ))
        };
        load(conn)
            .map(Json)
            .map_err(|e| store_error("Error building gap report", e))
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        team_statistics_endpoint,
        station_ratings_endpoint,
        station_gaps_endpoint
    ]
}
