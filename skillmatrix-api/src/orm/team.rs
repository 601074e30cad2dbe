use chrono::Utc;
use diesel::prelude::*;

use crate::models::{NewTeam, Team, TeamPlacement, TeamUpdate};
use crate::orm::user::last_insert_id;
use crate::schema::{departments, production_lines, teams};

pub fn insert_team(
    conn: &mut SqliteConnection,
    name: &str,
    production_line_id: i32,
) -> QueryResult<Team> {
    diesel::insert_into(teams::table)
        .values(&NewTeam {
            name: name.trim().to_string(),
            production_line_id,
        })
        .execute(conn)?;

    let new_id = last_insert_id(conn)?;
    get_team(conn, new_id)?.ok_or(diesel::result::Error::NotFound)
}

pub fn get_team(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Team>> {
    teams::table
        .find(id)
        .select(Team::as_select())
        .first(conn)
        .optional()
}

/// Lists teams ordered by name.  `only` restricts the result to the given
/// ids; `None` returns every team.
pub fn list_teams(conn: &mut SqliteConnection, only: Option<&[i32]>) -> QueryResult<Vec<Team>> {
    let mut query = teams::table
        .select(Team::as_select())
        .order(teams::name.asc())
        .into_boxed();
    if let Some(ids) = only {
        query = query.filter(teams::id.eq_any(ids.to_vec()));
    }
    query.load(conn)
}

pub fn update_team(conn: &mut SqliteConnection, id: i32, update: TeamUpdate) -> QueryResult<Team> {
    if let Some(name) = update.name {
        diesel::update(teams::table.find(id))
            .set(teams::name.eq(name.trim().to_string()))
            .execute(conn)?;
    }
    if let Some(line_id) = update.production_line_id {
        diesel::update(teams::table.find(id))
            .set(teams::production_line_id.eq(line_id))
            .execute(conn)?;
    }
    diesel::update(teams::table.find(id))
        .set(teams::updated_at.eq(Utc::now().naive_utc()))
        .execute(conn)?;
    teams::table.find(id).select(Team::as_select()).first(conn)
}

/// Deletes a team; its employees, their ratings and every grant on it cascade.
pub fn delete_team(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(teams::table.find(id)).execute(conn)
}

/// Resolves a team to its production line and department.
pub fn get_team_placement(
    conn: &mut SqliteConnection,
    team_id: i32,
) -> QueryResult<Option<TeamPlacement>> {
    let row = teams::table
        .inner_join(production_lines::table.inner_join(departments::table))
        .filter(teams::id.eq(team_id))
        .select((
            teams::id,
            teams::name,
            production_lines::id,
            production_lines::name,
            departments::id,
            departments::name,
        ))
        .first::<(i32, String, i32, String, i32, String)>(conn)
        .optional()?;

    Ok(row.map(
        |(team_id, team_name, line_id, line_name, dept_id, dept_name)| TeamPlacement {
            team_id,
            team_name,
            production_line_id: line_id,
            production_line_name: line_name,
            department_id: dept_id,
            department_name: dept_name,
        },
    ))
}
