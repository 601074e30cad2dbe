//! API endpoints feeding the skill matrix view.

use std::collections::BTreeSet;

use diesel::SqliteConnection;
use diesel::result::QueryResult;
use rocket::serde::json::Json;
use rocket::{Route, get};

use super::{ApiError, not_found, store_error};
use crate::DbConn;
use crate::access::AccessContext;
use crate::matrix::{MatrixContext, TeamMatrix, auto_selection};
use crate::orm::department::list_departments;
use crate::orm::employee::list_team_employees;
use crate::orm::production_line::list_production_lines;
use crate::orm::skill_rating::list_ratings_for_employees;
use crate::orm::station::{list_all_stations, list_department_stations};
use crate::orm::team::{get_team_placement, list_teams};

/// Team Matrix endpoint.
///
/// - **URL:** `/api/1/Teams/<team_id>/Matrix`
/// - **Method:** `GET`
/// - **Purpose:** Returns a team's members, its department's stations and every rating between them
/// - **Authentication:** Read access to the team
#[get("/1/Teams/<team_id>/Matrix")]
pub async fn team_matrix(
    db: DbConn,
    access: AccessContext,
    team_id: i32,
) -> Result<Json<TeamMatrix>, ApiError> {
    access.require_read(team_id)?;

    db.run(move |conn| {
        let placement = get_team_placement(conn, team_id)
            .map_err(|e| store_error("Error loading team", e))?
            .ok_or_else(|| not_found("Team", team_id))?;
        load_team_matrix(conn, placement)
            .map(Json)
            .map_err(|e| store_error("Error loading matrix", e))
    })
    .await
}

fn load_team_matrix(
    conn: &mut SqliteConnection,
    placement: crate::models::TeamPlacement,
) -> QueryResult<TeamMatrix> {
    let employees = list_team_employees(conn, placement.team_id)?;
    let stations = list_department_stations(conn, placement.department_id)?;
    let ids: Vec<i32> = employees.iter().map(|e| e.id).collect();
    let ratings = list_ratings_for_employees(conn, &ids)?;
    Ok(TeamMatrix {
        placement,
        employees,
        stations,
        ratings,
    })
}

/// Builds the hierarchy visible to `access`.  Non-admins see their readable
/// teams and the lines and departments above them.
fn load_matrix_context(
    conn: &mut SqliteConnection,
    access: &AccessContext,
) -> QueryResult<MatrixContext> {
    let readable = access.readable_team_ids();
    let teams = list_teams(conn, readable.as_deref())?;
    let mut production_lines = list_production_lines(conn, None)?;
    let mut departments = list_departments(conn)?;

    if !access.is_admin() {
        let line_ids: BTreeSet<i32> = teams.iter().map(|t| t.production_line_id).collect();
        production_lines.retain(|l| line_ids.contains(&l.id));
        let dept_ids: BTreeSet<i32> = production_lines.iter().map(|l| l.department_id).collect();
        departments.retain(|d| dept_ids.contains(&d.id));
    }

    let placement = match access.sole_team() {
        Some(team_id) => get_team_placement(conn, team_id)?,
        None => None,
    };
    let selection = auto_selection(access, |_| placement);

    let stations = match selection {
        Some(sel) => list_department_stations(conn, sel.department_id)?,
        None => {
            let dept_ids: BTreeSet<i32> = departments.iter().map(|d| d.id).collect();
            let mut all = list_all_stations(conn)?;
            all.retain(|s| dept_ids.contains(&s.department_id));
            all
        }
    };

    Ok(MatrixContext {
        departments,
        production_lines,
        teams,
        stations,
        auto_selection: selection,
    })
}

/// Matrix Context endpoint.
///
/// - **URL:** `/api/1/Matrix/Context`
/// - **Method:** `GET`
/// - **Purpose:** Returns the departments, lines, teams and stations the caller can see
/// - **Authentication:** Required
///
/// A non-admin with exactly one team gets `auto_selection` filled in and
/// only the stations of that team's department.
#[get("/1/Matrix/Context")]
pub async fn matrix_context(
    db: DbConn,
    access: AccessContext,
) -> Result<Json<MatrixContext>, ApiError> {
    db.run(move |conn| load_matrix_context(conn, &access))
        .await
        .map(Json)
        .map_err(|e| store_error("Error loading matrix context", e))
}

pub fn routes() -> Vec<Route> {
    routes![team_matrix, matrix_context]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Grant;
    use crate::models::UserRole;
    use crate::orm::department::insert_department;
    use crate::orm::production_line::insert_production_line;
    use crate::orm::station::insert_station;
    use crate::orm::team::insert_team;
    use crate::orm::testing::setup_test_db;

    #[test]
    fn single_grant_narrows_context_to_its_department() {
        let mut conn = setup_test_db();
        let assembly = insert_department(&mut conn, "Assembly").unwrap();
        let paint = insert_department(&mut conn, "Paint").unwrap();
        let line = insert_production_line(&mut conn, "Line 1", assembly.id).unwrap();
        let paint_line = insert_production_line(&mut conn, "Line P", paint.id).unwrap();
        let team = insert_team(&mut conn, "Early", line.id).unwrap();
        insert_team(&mut conn, "Painters", paint_line.id).unwrap();
        insert_station(&mut conn, assembly.id, "Welding").unwrap();
        insert_station(&mut conn, paint.id, "Spray").unwrap();

        let member = AccessContext::new(
            9,
            UserRole::User,
            [Grant {
                team_id: team.id,
                can_read: true,
                can_write: false,
            }],
        );
        let ctx = load_matrix_context(&mut conn, &member).unwrap();
        let sel = ctx.auto_selection.unwrap();
        assert_eq!(sel.team_id, team.id);
        assert_eq!(sel.department_id, assembly.id);
        assert_eq!(ctx.teams.len(), 1);
        assert_eq!(ctx.departments.len(), 1);
        assert_eq!(ctx.stations.len(), 1);
        assert_eq!(ctx.stations[0].name, "Welding");

        let admin = AccessContext::new(1, UserRole::Admin, []);
        let ctx = load_matrix_context(&mut conn, &admin).unwrap();
        assert!(ctx.auto_selection.is_none());
        assert_eq!(ctx.teams.len(), 2);
        assert_eq!(ctx.stations.len(), 2);
    }
}
