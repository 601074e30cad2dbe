use chrono::NaiveDateTime;
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::employees;

/// Position an employee holds inside a team.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[ts(export)]
pub enum EmployeeRole {
    Operator,
    Trainer,
    Hancho,
    Teamleader,
}

sql_text_enum!(EmployeeRole {
    Operator => "Operator",
    Trainer => "Trainer",
    Hancho => "Hancho",
    Teamleader => "Teamleader",
});

impl EmployeeRole {
    /// Hancho and Teamleader count as team leadership.
    pub fn is_leadership(&self) -> bool {
        matches!(self, EmployeeRole::Hancho | EmployeeRole::Teamleader)
    }

    /// Trainer and Operator make up the workforce.
    pub fn is_workforce(&self) -> bool {
        matches!(self, EmployeeRole::Trainer | EmployeeRole::Operator)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[ts(export)]
pub enum ContractType {
    Permanent,
    Temporary,
}

sql_text_enum!(ContractType {
    Permanent => "Permanent",
    Temporary => "Temporary",
});

/// An employee row.  `team_id` is nullable in storage; an employee without a
/// team is treated as orphaned and denied for writes.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = employees)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Employee {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub role: EmployeeRole,
    pub contract_type: ContractType,
    pub team_id: Option<i32>,
    pub user_id: Option<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = employees)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub role: EmployeeRole,
    pub contract_type: ContractType,
    pub team_id: Option<i32>,
    pub user_id: Option<i32>,
}

// For API inputs; the team comes from the route.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct EmployeeInput {
    pub first_name: String,
    pub last_name: String,
    pub role: EmployeeRole,
    #[serde(default = "default_contract_type")]
    pub contract_type: ContractType,
    #[serde(default)]
    pub user_id: Option<i32>,
}

fn default_contract_type() -> ContractType {
    ContractType::Permanent
}

/// Update payload; omitted fields keep their current value.  Setting
/// `team_id` moves the employee to another team.
#[derive(Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<EmployeeRole>,
    pub contract_type: Option<ContractType>,
    pub team_id: Option<i32>,
}

impl EmployeeInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() {
            return Err("First name is required".to_string());
        }
        if self.last_name.trim().is_empty() {
            return Err("Last name is required".to_string());
        }
        Ok(())
    }

    pub fn into_new(self, team_id: i32) -> NewEmployee {
        NewEmployee {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role,
            contract_type: self.contract_type,
            team_id: Some(team_id),
            user_id: self.user_id,
        }
    }
}
