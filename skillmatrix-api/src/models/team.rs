use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::teams;

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::production_line::ProductionLine))]
#[diesel(table_name = teams)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Team {
    pub id: i32,
    pub name: String,
    pub production_line_id: i32,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = teams)]
pub struct NewTeam {
    pub name: String,
    pub production_line_id: i32,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TeamInput {
    pub name: String,
    pub production_line_id: i32,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub production_line_id: Option<i32>,
}

/// A team together with the production line and department it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TeamPlacement {
    pub team_id: i32,
    pub team_name: String,
    pub production_line_id: i32,
    pub production_line_name: String,
    pub department_id: i32,
    pub department_name: String,
}
