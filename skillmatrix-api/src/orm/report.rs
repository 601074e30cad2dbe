//! Join queries for the aggregator, mapped into typed records right after
//! loading.

use diesel::prelude::*;

use crate::models::{ContractType, EmployeeRole};
use crate::report::{RatingRow, ResolvedEmployee, StationRef};
use crate::schema::{departments, employee_skills, employees, production_lines, stations, teams};

type EmployeeJoinRow = (
    i32,
    String,
    String,
    EmployeeRole,
    ContractType,
    i32,
    String,
    i32,
    String,
    i32,
    String,
);

fn into_resolved(row: EmployeeJoinRow) -> ResolvedEmployee {
    let (
        employee_id,
        first_name,
        last_name,
        role,
        contract_type,
        team_id,
        team_name,
        production_line_id,
        production_line_name,
        department_id,
        department_name,
    ) = row;
    ResolvedEmployee {
        employee_id,
        first_name,
        last_name,
        role,
        contract_type,
        team_id,
        team_name,
        production_line_id,
        production_line_name,
        department_id,
        department_name,
    }
}

/// Loads employees resolved to team, line and department.
///
/// Employees whose team is missing drop out of the inner join.  `teams_in`
/// restricts the result to the given teams; `None` means every team.
pub fn load_resolved_employees(
    conn: &mut SqliteConnection,
    teams_in: Option<&[i32]>,
) -> QueryResult<Vec<ResolvedEmployee>> {
    let mut query = employees::table
        .inner_join(teams::table.inner_join(production_lines::table.inner_join(departments::table)))
        .select((
            employees::id,
            employees::first_name,
            employees::last_name,
            employees::role,
            employees::contract_type,
            teams::id,
            teams::name,
            production_lines::id,
            production_lines::name,
            departments::id,
            departments::name,
        ))
        .order((employees::last_name.asc(), employees::first_name.asc()))
        .into_boxed();
    if let Some(ids) = teams_in {
        query = query.filter(teams::id.eq_any(ids.to_vec()));
    }

    let rows = query.load::<EmployeeJoinRow>(conn)?;
    Ok(rows.into_iter().map(into_resolved).collect())
}

/// Loads stations, optionally only those of one department, ordered by name.
pub fn load_station_refs(
    conn: &mut SqliteConnection,
    department_id: Option<i32>,
) -> QueryResult<Vec<StationRef>> {
    let mut query = stations::table
        .select((stations::id, stations::name, stations::department_id))
        .order(stations::name.asc())
        .into_boxed();
    if let Some(dept) = department_id {
        query = query.filter(stations::department_id.eq(dept));
    }

    let rows = query.load::<(i32, String, i32)>(conn)?;
    Ok(rows
        .into_iter()
        .map(|(station_id, station_name, department_id)| StationRef {
            station_id,
            station_name,
            department_id,
        })
        .collect())
}

/// Loads rating cells, optionally restricted to the given employees.
pub fn load_rating_rows(
    conn: &mut SqliteConnection,
    employees_in: Option<&[i32]>,
) -> QueryResult<Vec<RatingRow>> {
    let mut query = employee_skills::table
        .select((
            employee_skills::employee_id,
            employee_skills::station_id,
            employee_skills::rating,
        ))
        .into_boxed();
    if let Some(ids) = employees_in {
        query = query.filter(employee_skills::employee_id.eq_any(ids.to_vec()));
    }

    let rows = query.load::<(i32, i32, i32)>(conn)?;
    Ok(rows
        .into_iter()
        .map(|(employee_id, station_id, rating)| RatingRow {
            employee_id,
            station_id,
            rating,
        })
        .collect())
}
