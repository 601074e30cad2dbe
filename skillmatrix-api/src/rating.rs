//! Single-cell rating edits.
//!
//! Authorization is the caller's job (`AccessContext::can_write_employee`);
//! this service only insists that some user is acting.  Concurrent edits of
//! the same cell are last-write-wins.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::models::SkillRating;
use crate::orm::employee::get_employee;
use crate::orm::skill_rating::{delete_rating, get_rating, upsert_rating};
use crate::orm::station::get_station;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// One edit: a rating from 1 to 5, or `None` to clear the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RatingEdit {
    pub employee_id: i32,
    pub station_id: i32,
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export)]
pub enum RatingOutcome {
    Saved { rating: SkillRating },
    Cleared { existed: bool },
}

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("Authentication is required to change ratings")]
    Unauthenticated,
    #[error("Rating must be between 1 and 5, got {0}")]
    OutOfRange(i32),
    #[error("Employee {0} not found")]
    EmployeeNotFound(i32),
    #[error("Station {0} not found")]
    StationNotFound(i32),
    #[error("Database error: {0}")]
    Store(#[from] diesel::result::Error),
}

pub fn validate_rating(rating: Option<i32>) -> Result<(), RatingError> {
    match rating {
        Some(r) if !(MIN_RATING..=MAX_RATING).contains(&r) => Err(RatingError::OutOfRange(r)),
        _ => Ok(()),
    }
}

/// Applies one edit and publishes the change on `feed`.
///
/// `Some(r)` upserts the cell and records `actor` as the last editor.
/// `None` deletes the cell; clearing an empty cell is not an error.
pub fn apply_rating_edit(
    conn: &mut SqliteConnection,
    actor: Option<i32>,
    edit: RatingEdit,
    feed: &ChangeFeed,
) -> Result<RatingOutcome, RatingError> {
    let actor_id = actor.ok_or(RatingError::Unauthenticated)?;
    validate_rating(edit.rating)?;

    let employee =
        get_employee(conn, edit.employee_id)?.ok_or(RatingError::EmployeeNotFound(edit.employee_id))?;
    if get_station(conn, edit.station_id)?.is_none() {
        return Err(RatingError::StationNotFound(edit.station_id));
    }

    match edit.rating {
        Some(rating) => {
            let existed = get_rating(conn, edit.employee_id, edit.station_id)?.is_some();
            let saved = upsert_rating(conn, edit.employee_id, edit.station_id, rating, actor_id)?;
            let kind = if existed {
                ChangeKind::Update
            } else {
                ChangeKind::Insert
            };
            feed.publish(ChangeEvent::new(
                Table::EmployeeSkills,
                kind,
                saved.id,
                employee.team_id,
            ));
            Ok(RatingOutcome::Saved { rating: saved })
        }
        None => {
            let previous = get_rating(conn, edit.employee_id, edit.station_id)?;
            let existed = delete_rating(conn, edit.employee_id, edit.station_id)?;
            if let Some(previous) = previous.filter(|_| existed) {
                feed.publish(ChangeEvent::new(
                    Table::EmployeeSkills,
                    ChangeKind::Delete,
                    previous.id,
                    employee.team_id,
                ));
            }
            Ok(RatingOutcome::Cleared { existed })
        }
    }
}
