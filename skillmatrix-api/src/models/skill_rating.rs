use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::employee_skills;

/// One cell of the skill matrix: how well an employee performs at a station.
#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Associations,
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    TS,
)]
#[diesel(belongs_to(crate::models::employee::Employee))]
#[diesel(belongs_to(crate::models::station::Station))]
#[diesel(table_name = employee_skills)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct SkillRating {
    pub id: i32,
    pub employee_id: i32,
    pub station_id: i32,
    pub rating: i32,
    pub last_updated_by_user_id: Option<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = employee_skills)]
pub struct NewSkillRating {
    pub employee_id: i32,
    pub station_id: i32,
    pub rating: i32,
    pub last_updated_by_user_id: Option<i32>,
}
