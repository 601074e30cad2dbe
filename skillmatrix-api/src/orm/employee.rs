use chrono::Utc;
use diesel::prelude::*;

use crate::models::{Employee, EmployeeInput, EmployeeUpdate, NewEmployee};
use crate::orm::user::last_insert_id;
use crate::schema::employees;

pub fn insert_employee(conn: &mut SqliteConnection, new: NewEmployee) -> QueryResult<Employee> {
    diesel::insert_into(employees::table)
        .values(&new)
        .execute(conn)?;

    let new_id = last_insert_id(conn)?;
    employees::table
        .find(new_id)
        .select(Employee::as_select())
        .first(conn)
}

/// Inserts several employees into one team inside a single transaction.
/// Either every row is created or none is.
pub fn insert_employees_bulk(
    conn: &mut SqliteConnection,
    team_id: i32,
    inputs: Vec<EmployeeInput>,
) -> QueryResult<Vec<Employee>> {
    conn.transaction(|conn| {
        inputs
            .into_iter()
            .map(|input| insert_employee(conn, input.into_new(team_id)))
            .collect()
    })
}

pub fn get_employee(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Employee>> {
    employees::table
        .find(id)
        .select(Employee::as_select())
        .first(conn)
        .optional()
}

/// Employees of one team ordered by last name, then first name.
pub fn list_team_employees(conn: &mut SqliteConnection, team_id: i32) -> QueryResult<Vec<Employee>> {
    employees::table
        .filter(employees::team_id.eq(team_id))
        .order((employees::last_name.asc(), employees::first_name.asc()))
        .select(Employee::as_select())
        .load(conn)
}

pub fn update_employee(
    conn: &mut SqliteConnection,
    id: i32,
    update: EmployeeUpdate,
) -> QueryResult<Employee> {
    if let Some(first_name) = update.first_name {
        diesel::update(employees::table.find(id))
            .set(employees::first_name.eq(first_name.trim().to_string()))
            .execute(conn)?;
    }
    if let Some(last_name) = update.last_name {
        diesel::update(employees::table.find(id))
            .set(employees::last_name.eq(last_name.trim().to_string()))
            .execute(conn)?;
    }
    if let Some(role) = update.role {
        diesel::update(employees::table.find(id))
            .set(employees::role.eq(role))
            .execute(conn)?;
    }
    if let Some(contract_type) = update.contract_type {
        diesel::update(employees::table.find(id))
            .set(employees::contract_type.eq(contract_type))
            .execute(conn)?;
    }
    if let Some(team_id) = update.team_id {
        diesel::update(employees::table.find(id))
            .set(employees::team_id.eq(Some(team_id)))
            .execute(conn)?;
    }
    diesel::update(employees::table.find(id))
        .set(employees::updated_at.eq(Utc::now().naive_utc()))
        .execute(conn)?;
    employees::table
        .find(id)
        .select(Employee::as_select())
        .first(conn)
}

/// Deletes an employee together with their ratings.
pub fn delete_employee(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(employees::table.find(id)).execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContractType, EmployeeRole};
    use crate::orm::department::insert_department;
    use crate::orm::production_line::insert_production_line;
    use crate::orm::team::insert_team;
    use crate::orm::testing::setup_test_db;

    fn team(conn: &mut SqliteConnection) -> i32 {
        let dept = insert_department(conn, "Assembly").unwrap();
        let line = insert_production_line(conn, "Line 1", dept.id).unwrap();
        insert_team(conn, "Early", line.id).unwrap().id
    }

    fn input(first: &str, last: &str) -> EmployeeInput {
        EmployeeInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            role: EmployeeRole::Operator,
            contract_type: ContractType::Permanent,
            user_id: None,
        }
    }

    #[test]
    fn bulk_insert_is_all_or_nothing() {
        let mut conn = setup_test_db();
        let team_id = team(&mut conn);

        let created =
            insert_employees_bulk(&mut conn, team_id, vec![input("Ada", "Zed"), input("Bo", "Alm")])
                .unwrap();
        assert_eq!(created.len(), 2);

        let listed = list_team_employees(&mut conn, team_id).unwrap();
        assert_eq!(listed[0].last_name, "Alm");
        assert_eq!(listed[1].last_name, "Zed");

        // A nonexistent team fails the foreign key on the first row.
        assert!(insert_employees_bulk(&mut conn, team_id + 50, vec![input("X", "Y")]).is_err());
        assert_eq!(list_team_employees(&mut conn, team_id).unwrap().len(), 2);
    }

    #[test]
    fn update_moves_and_renames() {
        let mut conn = setup_test_db();
        let team_id = team(&mut conn);
        let emp = insert_employee(&mut conn, input("Ada", "Zed").into_new(team_id)).unwrap();

        let updated = update_employee(
            &mut conn,
            emp.id,
            EmployeeUpdate {
                role: Some(EmployeeRole::Hancho),
                contract_type: Some(ContractType::Temporary),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.role, EmployeeRole::Hancho);
        assert_eq!(updated.contract_type, ContractType::Temporary);
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.team_id, Some(team_id));
    }
}
