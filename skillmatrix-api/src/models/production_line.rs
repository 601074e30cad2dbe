use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::production_lines;

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::department::Department))]
#[diesel(table_name = production_lines)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct ProductionLine {
    pub id: i32,
    pub name: String,
    pub department_id: i32,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = production_lines)]
pub struct NewProductionLine {
    pub name: String,
    pub department_id: i32,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ProductionLineInput {
    pub name: String,
    pub department_id: i32,
}

/// Update payload; omitted fields keep their current value.
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ProductionLineUpdate {
    pub name: Option<String>,
    pub department_id: Option<i32>,
}
