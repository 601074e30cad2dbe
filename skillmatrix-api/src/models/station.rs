use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::stations;

/// A work position owned by a department.  Stations are shared by every
/// production line of that department.
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::department::Department))]
#[diesel(table_name = stations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Station {
    pub id: i32,
    pub name: String,
    pub department_id: i32,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = stations)]
pub struct NewStation {
    pub name: String,
    pub department_id: i32,
}

// The department comes from the route.
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct StationInput {
    pub name: String,
}
