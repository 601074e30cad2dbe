use chrono::Utc;
use diesel::prelude::*;
use thiserror::Error;

use crate::models::{NewStation, Station};
use crate::orm::user::last_insert_id;
use crate::schema::stations;

pub const STATION_NAME_MIN_LEN: usize = 2;
pub const STATION_NAME_MAX_LEN: usize = 50;

#[derive(Debug, Error, PartialEq)]
pub enum StationNameError {
    #[error("Station name is required")]
    Empty,
    #[error("Station name must be at least 2 characters")]
    TooShort,
    #[error("Station name must be less than 50 characters")]
    TooLong,
    #[error("A station named '{0}' already exists in this department")]
    Duplicate(String),
}

/// Trims and checks the shape of a station name.  Uniqueness is checked
/// separately against the store.
pub fn normalize_station_name(raw: &str) -> Result<String, StationNameError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 {
        Err(StationNameError::Empty)
    } else if len < STATION_NAME_MIN_LEN {
        Err(StationNameError::TooShort)
    } else if len >= STATION_NAME_MAX_LEN {
        Err(StationNameError::TooLong)
    } else {
        Ok(name.to_string())
    }
}

/// True when another station of the department already uses `name`
/// (case-insensitive).  `except` skips the station being renamed.
pub fn station_name_taken(
    conn: &mut SqliteConnection,
    department_id: i32,
    name: &str,
    except: Option<i32>,
) -> QueryResult<bool> {
    let wanted = name.to_lowercase();
    let existing = stations::table
        .filter(stations::department_id.eq(department_id))
        .select((stations::id, stations::name))
        .load::<(i32, String)>(conn)?;
    Ok(existing
        .into_iter()
        .any(|(id, other)| Some(id) != except && other.to_lowercase() == wanted))
}

pub fn insert_station(
    conn: &mut SqliteConnection,
    department_id: i32,
    name: &str,
) -> QueryResult<Station> {
    diesel::insert_into(stations::table)
        .values(&NewStation {
            name: name.to_string(),
            department_id,
        })
        .execute(conn)?;

    let new_id = last_insert_id(conn)?;
    stations::table
        .find(new_id)
        .select(Station::as_select())
        .first(conn)
}

pub fn get_station(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Station>> {
    stations::table
        .find(id)
        .select(Station::as_select())
        .first(conn)
        .optional()
}

/// Stations of one department ordered by name.
pub fn list_department_stations(
    conn: &mut SqliteConnection,
    department_id: i32,
) -> QueryResult<Vec<Station>> {
    stations::table
        .filter(stations::department_id.eq(department_id))
        .order(stations::name.asc())
        .select(Station::as_select())
        .load(conn)
}

pub fn list_all_stations(conn: &mut SqliteConnection) -> QueryResult<Vec<Station>> {
    stations::table
        .order((stations::department_id.asc(), stations::name.asc()))
        .select(Station::as_select())
        .load(conn)
}

pub fn rename_station(conn: &mut SqliteConnection, id: i32, name: &str) -> QueryResult<Station> {
    diesel::update(stations::table.find(id))
        .set((
            stations::name.eq(name),
            stations::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    stations::table
        .find(id)
        .select(Station::as_select())
        .first(conn)
}

/// Deletes a station together with every rating recorded against it.
pub fn delete_station(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(stations::table.find(id)).execute(conn)
}
