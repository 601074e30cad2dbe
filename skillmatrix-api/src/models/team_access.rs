use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{team_access, user_permissions};

/// A per-team grant for a non-admin user.  `can_write` implies `can_read`.
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::user::User))]
#[diesel(belongs_to(crate::models::team::Team))]
#[diesel(table_name = team_access)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct TeamAccess {
    pub id: i32,
    pub user_id: i32,
    pub team_id: i32,
    pub can_read: bool,
    pub can_write: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = team_access)]
pub struct NewTeamAccess {
    pub user_id: i32,
    pub team_id: i32,
    pub can_read: bool,
    pub can_write: bool,
}

/// Grant request body.  `can_read` is forced on whenever `can_write` is set.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TeamAccessInput {
    #[serde(default = "default_true")]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
}

fn default_true() -> bool {
    true
}

impl TeamAccessInput {
    pub fn normalized(self) -> TeamAccessInput {
        TeamAccessInput {
            can_read: self.can_read || self.can_write,
            can_write: self.can_write,
        }
    }
}

/// Legacy four-flag permission row, kept in sync with `team_access`.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = user_permissions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct UserPermission {
    pub id: i32,
    pub user_id: i32,
    pub team_id: i32,
    pub can_view_team: bool,
    pub can_edit_team_details: bool,
    pub can_manage_employees: bool,
    pub can_manage_skills: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = user_permissions)]
pub struct NewUserPermission {
    pub user_id: i32,
    pub team_id: i32,
    pub can_view_team: bool,
    pub can_edit_team_details: bool,
    pub can_manage_employees: bool,
    pub can_manage_skills: bool,
}

impl NewUserPermission {
    /// Derives the legacy flags from a normalized grant.
    pub fn from_grant(user_id: i32, team_id: i32, grant: TeamAccessInput) -> Self {
        NewUserPermission {
            user_id,
            team_id,
            can_view_team: grant.can_read,
            can_edit_team_details: grant.can_write,
            can_manage_employees: grant.can_write,
            can_manage_skills: grant.can_write,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_implies_read() {
        let grant = TeamAccessInput {
            can_read: false,
            can_write: true,
        }
        .normalized();
        assert!(grant.can_read);
        assert!(grant.can_write);
    }

    #[test]
    fn legacy_flags_follow_grant() {
        let read_only = TeamAccessInput {
            can_read: true,
            can_write: false,
        };
        let legacy = NewUserPermission::from_grant(4, 9, read_only);
        assert!(legacy.can_view_team);
        assert!(!legacy.can_edit_team_details);
        assert!(!legacy.can_manage_employees);
        assert!(!legacy.can_manage_skills);

        let writer = NewUserPermission::from_grant(
            4,
            9,
            TeamAccessInput {
                can_read: false,
                can_write: true,
            }
            .normalized(),
        );
        assert!(writer.can_view_team);
        assert!(writer.can_manage_skills);
    }
}
