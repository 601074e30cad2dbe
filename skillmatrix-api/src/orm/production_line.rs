use diesel::prelude::*;

use crate::models::{NewProductionLine, ProductionLine, ProductionLineUpdate};
use crate::orm::user::last_insert_id;
use crate::schema::production_lines;

pub fn insert_production_line(
    conn: &mut SqliteConnection,
    name: &str,
    department_id: i32,
) -> QueryResult<ProductionLine> {
    diesel::insert_into(production_lines::table)
        .values(&NewProductionLine {
            name: name.trim().to_string(),
            department_id,
        })
        .execute(conn)?;

    let new_id = last_insert_id(conn)?;
    get_production_line(conn, new_id)?.ok_or(diesel::result::Error::NotFound)
}

/// Lists production lines, optionally restricted to one department.
pub fn list_production_lines(
    conn: &mut SqliteConnection,
    department_id: Option<i32>,
) -> QueryResult<Vec<ProductionLine>> {
    let mut query = production_lines::table
        .select(ProductionLine::as_select())
        .order(production_lines::name.asc())
        .into_boxed();
    if let Some(dept) = department_id {
        query = query.filter(production_lines::department_id.eq(dept));
    }
    query.load(conn)
}

pub fn get_production_line(
    conn: &mut SqliteConnection,
    id: i32,
) -> QueryResult<Option<ProductionLine>> {
    production_lines::table
        .find(id)
        .select(ProductionLine::as_select())
        .first(conn)
        .optional()
}

pub fn update_production_line(
    conn: &mut SqliteConnection,
    id: i32,
    update: ProductionLineUpdate,
) -> QueryResult<ProductionLine> {
    if let Some(name) = update.name {
        diesel::update(production_lines::table.find(id))
            .set(production_lines::name.eq(name.trim().to_string()))
            .execute(conn)?;
    }
    if let Some(department_id) = update.department_id {
        diesel::update(production_lines::table.find(id))
            .set(production_lines::department_id.eq(department_id))
            .execute(conn)?;
    }
    production_lines::table
        .find(id)
        .select(ProductionLine::as_select())
        .first(conn)
}

pub fn delete_production_line(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(production_lines::table.find(id)).execute(conn)
}
