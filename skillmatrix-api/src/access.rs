//! Team-scoped access decisions.
//!
//! [`AccessContext`] is built per request from the session and the caller's
//! current grants, so a grant change takes effect on the next request.
//! Every decision is a pure function of that snapshot.
//!
//! ```rust,ignore
//! #[put("/1/Teams/<team_id>", data = "<update>")]
//! async fn update_team(access: AccessContext, team_id: i32, ...) -> ... {
//!     access.require_write(team_id)?;
//!     ...
//! }
//! ```

use std::collections::BTreeMap;

use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::DbConn;
use crate::models::{TeamAccess, UserRole};
use crate::orm::team_access::get_user_team_access;
use crate::session_guards::AuthenticatedUser;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("You do not have read access to team {0}")]
    ReadDenied(i32),
    #[error("You do not have write access to team {0}")]
    WriteDenied(i32),
    #[error("Write access to at least one team is required")]
    NoWriteAccess,
    #[error("Only administrators can manage departments, production lines and stations")]
    AdminOnly,
    #[error("Employee {0} is not assigned to a team and cannot be changed")]
    OrphanedEmployee(i32),
}

/// The effective permissions on one team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Grant {
    pub team_id: i32,
    pub can_read: bool,
    pub can_write: bool,
}

impl From<&TeamAccess> for Grant {
    fn from(row: &TeamAccess) -> Self {
        Grant {
            team_id: row.team_id,
            // Rows written before normalization still honor write => read.
            can_read: row.can_read || row.can_write,
            can_write: row.can_write,
        }
    }
}

/// Caller identity plus grant snapshot for one request.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub user_id: i32,
    pub role: UserRole,
    grants: BTreeMap<i32, Grant>,
}

impl AccessContext {
    pub fn new<I>(user_id: i32, role: UserRole, grants: I) -> Self
    where
        I: IntoIterator<Item = Grant>,
    {
        AccessContext {
            user_id,
            role,
            grants: grants.into_iter().map(|g| (g.team_id, g)).collect(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn can_read(&self, team_id: i32) -> bool {
        self.is_admin() || self.grants.get(&team_id).is_some_and(|g| g.can_read)
    }

    pub fn can_write(&self, team_id: i32) -> bool {
        self.is_admin() || self.grants.get(&team_id).is_some_and(|g| g.can_write)
    }

    /// Gates team creation: a new team has no grants yet, so write access
    /// to any team is enough.
    pub fn has_any_write_access(&self) -> bool {
        self.is_admin() || self.grants.values().any(|g| g.can_write)
    }

    /// Departments, production lines and stations are admin-only.
    pub fn can_manage_structure(&self) -> bool {
        self.is_admin()
    }

    /// Employee writes follow the employee's team.  An employee without a
    /// team is denied.
    pub fn can_write_employee(
        &self,
        employee_id: i32,
        team_id: Option<i32>,
    ) -> Result<(), AccessError> {
        match team_id {
            Some(team_id) => self.require_write(team_id),
            None => Err(AccessError::OrphanedEmployee(employee_id)),
        }
    }

    pub fn require_read(&self, team_id: i32) -> Result<(), AccessError> {
        if self.can_read(team_id) {
            Ok(())
        } else {
            Err(AccessError::ReadDenied(team_id))
        }
    }

    pub fn require_write(&self, team_id: i32) -> Result<(), AccessError> {
        if self.can_write(team_id) {
            Ok(())
        } else {
            Err(AccessError::WriteDenied(team_id))
        }
    }

    pub fn require_any_write(&self) -> Result<(), AccessError> {
        if self.has_any_write_access() {
            Ok(())
        } else {
            Err(AccessError::NoWriteAccess)
        }
    }

    pub fn require_admin(&self) -> Result<(), AccessError> {
        if self.can_manage_structure() {
            Ok(())
        } else {
            Err(AccessError::AdminOnly)
        }
    }

    /// Teams the caller may read, or `None` when every team is readable.
    pub fn readable_team_ids(&self) -> Option<Vec<i32>> {
        if self.is_admin() {
            None
        } else {
            Some(
                self.grants
                    .values()
                    .filter(|g| g.can_read)
                    .map(|g| g.team_id)
                    .collect(),
            )
        }
    }

    /// The one readable team of a non-admin caller with a single grant.
    pub fn sole_team(&self) -> Option<i32> {
        match self.readable_team_ids() {
            Some(ids) if ids.len() == 1 => ids.first().copied(),
            _ => None,
        }
    }

    pub fn grants(&self) -> impl Iterator<Item = &Grant> {
        self.grants.values()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AccessContext {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = match AuthenticatedUser::from_request(request).await {
            Outcome::Success(user) => user,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };
        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        let user_id = auth.user.id;
        match db.run(move |conn| get_user_team_access(conn, user_id)).await {
            Ok(rows) => Outcome::Success(AccessContext::new(
                user_id,
                auth.user.role,
                rows.iter().map(Grant::from),
            )),
            Err(e) => {
                error!("Failed to load team access for user {}: {:?}", user_id, e);
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(team_id: i32, can_read: bool, can_write: bool) -> Grant {
        Grant {
            team_id,
            can_read,
            can_write,
        }
    }

    fn member(grants: Vec<Grant>) -> AccessContext {
        AccessContext::new(7, UserRole::User, grants)
    }

    #[test]
    fn admin_bypasses_every_team() {
        let admin = AccessContext::new(1, UserRole::Admin, []);
        for team in [1, 2, 999] {
            assert!(admin.can_read(team));
            assert!(admin.can_write(team));
        }
        assert!(admin.has_any_write_access());
        assert!(admin.can_manage_structure());
        assert_eq!(admin.readable_team_ids(), None);
        assert_eq!(admin.sole_team(), None);
    }

    #[test]
    fn write_implies_read_for_stored_rows() {
        let row = TeamAccess {
            id: 1,
            user_id: 7,
            team_id: 3,
            can_read: false,
            can_write: true,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: chrono::Utc::now().naive_utc(),
        };
        let ctx = member(vec![Grant::from(&row)]);
        assert!(ctx.can_write(3));
        assert!(ctx.can_read(3));
    }

    #[test]
    fn grants_are_team_scoped() {
        let ctx = member(vec![grant(1, true, false), grant(2, true, true)]);
        assert!(ctx.can_read(1));
        assert!(!ctx.can_write(1));
        assert!(ctx.can_write(2));
        assert!(!ctx.can_read(3));
        assert_eq!(ctx.require_write(1), Err(AccessError::WriteDenied(1)));
        assert_eq!(ctx.require_read(3), Err(AccessError::ReadDenied(3)));
        assert_eq!(ctx.require_admin(), Err(AccessError::AdminOnly));
        assert_eq!(ctx.readable_team_ids(), Some(vec![1, 2]));
    }

    #[test]
    fn any_write_gates_team_creation() {
        assert!(member(vec![grant(4, true, true)]).has_any_write_access());
        let reader = member(vec![grant(4, true, false)]);
        assert!(!reader.has_any_write_access());
        assert_eq!(reader.require_any_write(), Err(AccessError::NoWriteAccess));
    }

    #[test]
    fn employee_writes_follow_team() {
        let ctx = member(vec![grant(5, true, true)]);
        assert_eq!(ctx.can_write_employee(10, Some(5)), Ok(()));
        assert_eq!(
            ctx.can_write_employee(10, Some(6)),
            Err(AccessError::WriteDenied(6))
        );
        assert_eq!(
            ctx.can_write_employee(10, None),
            Err(AccessError::OrphanedEmployee(10))
        );
        let admin = AccessContext::new(1, UserRole::Admin, []);
        assert_eq!(
            admin.can_write_employee(10, None),
            Err(AccessError::OrphanedEmployee(10))
        );
    }

    #[test]
    fn sole_team_needs_exactly_one_readable_grant() {
        assert_eq!(member(vec![grant(8, true, false)]).sole_team(), Some(8));
        assert_eq!(member(vec![]).sole_team(), None);
        assert_eq!(
            member(vec![grant(8, true, false), grant(9, true, false)]).sole_team(),
            None
        );
    }
}
