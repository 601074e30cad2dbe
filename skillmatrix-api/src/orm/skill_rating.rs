use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;

use crate::models::{NewSkillRating, SkillRating};
use crate::schema::employee_skills;

/// Inserts or replaces the rating for one (employee, station) cell,
/// recording who made the change.
pub fn upsert_rating(
    conn: &mut SqliteConnection,
    employee_id: i32,
    station_id: i32,
    rating: i32,
    actor_id: i32,
) -> QueryResult<SkillRating> {
    let now = Utc::now().naive_utc();
    diesel::insert_into(employee_skills::table)
        .values(&NewSkillRating {
            employee_id,
            station_id,
            rating,
            last_updated_by_user_id: Some(actor_id),
        })
        .on_conflict((employee_skills::employee_id, employee_skills::station_id))
        .do_update()
        .set((
            employee_skills::rating.eq(excluded(employee_skills::rating)),
            employee_skills::last_updated_by_user_id
                .eq(excluded(employee_skills::last_updated_by_user_id)),
            employee_skills::updated_at.eq(now),
        ))
        .execute(conn)?;

    get_rating(conn, employee_id, station_id)?.ok_or(diesel::result::Error::NotFound)
}

/// Removes the rating for one cell.  Returns whether a row existed.
pub fn delete_rating(
    conn: &mut SqliteConnection,
    employee_id: i32,
    station_id: i32,
) -> QueryResult<bool> {
    let deleted = diesel::delete(
        employee_skills::table
            .filter(employee_skills::employee_id.eq(employee_id))
            .filter(employee_skills::station_id.eq(station_id)),
    )
    .execute(conn)?;
    Ok(deleted > 0)
}

pub fn get_rating(
    conn: &mut SqliteConnection,
    employee_id: i32,
    station_id: i32,
) -> QueryResult<Option<SkillRating>> {
    employee_skills::table
        .filter(employee_skills::employee_id.eq(employee_id))
        .filter(employee_skills::station_id.eq(station_id))
        .select(SkillRating::as_select())
        .first(conn)
        .optional()
}

/// Every rating recorded for the given employees.
pub fn list_ratings_for_employees(
    conn: &mut SqliteConnection,
    employee_ids: &[i32],
) -> QueryResult<Vec<SkillRating>> {
    employee_skills::table
        .filter(employee_skills::employee_id.eq_any(employee_ids))
        .order((employee_skills::employee_id.asc(), employee_skills::station_id.asc()))
        .select(SkillRating::as_select())
        .load(conn)
}
