use diesel::prelude::*;

use crate::models::{Department, NewDepartment};
use crate::orm::user::last_insert_id;
use crate::schema::departments;

pub fn insert_department(conn: &mut SqliteConnection, name: &str) -> QueryResult<Department> {
    diesel::insert_into(departments::table)
        .values(&NewDepartment {
            name: name.trim().to_string(),
        })
        .execute(conn)?;

    let new_id = last_insert_id(conn)?;
    departments::table
        .find(new_id)
        .select(Department::as_select())
        .first(conn)
}

/// Returns all departments ordered by name.
pub fn list_departments(conn: &mut SqliteConnection) -> QueryResult<Vec<Department>> {
    departments::table
        .order(departments::name.asc())
        .select(Department::as_select())
        .load(conn)
}

pub fn get_department(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Department>> {
    departments::table
        .find(id)
        .select(Department::as_select())
        .first(conn)
        .optional()
}

pub fn get_department_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> QueryResult<Option<Department>> {
    departments::table
        .filter(departments::name.eq(name.trim()))
        .select(Department::as_select())
        .first(conn)
        .optional()
}

pub fn rename_department(
    conn: &mut SqliteConnection,
    id: i32,
    name: &str,
) -> QueryResult<Department> {
    diesel::update(departments::table.find(id))
        .set(departments::name.eq(name.trim()))
        .execute(conn)?;
    departments::table
        .find(id)
        .select(Department::as_select())
        .first(conn)
}

/// Deletes a department.  Production lines, teams, employees, stations and
/// their ratings go with it through the foreign key cascade.
pub fn delete_department(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(departments::table.find(id)).execute(conn)
}
