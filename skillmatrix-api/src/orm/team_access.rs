//! Access store: per-team grants and their legacy projection.
//!
//! `team_access` is the source of truth.  `user_permissions` is derived from
//! it and always written in the same transaction.

use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;

use crate::models::{NewTeamAccess, NewUserPermission, TeamAccess, TeamAccessInput, UserPermission};
use crate::schema::{team_access, user_permissions};

/// Grants a user access to a team.  `can_read` is forced on when
/// `can_write` is set.  Granting the same tuple again updates the existing
/// row instead of adding one.
pub fn grant_team_access(
    conn: &mut SqliteConnection,
    user_id: i32,
    team_id: i32,
    grant: TeamAccessInput,
) -> QueryResult<TeamAccess> {
    let grant = grant.normalized();
    let now = Utc::now().naive_utc();

    conn.transaction(|conn| {
        diesel::insert_into(team_access::table)
            .values(&NewTeamAccess {
                user_id,
                team_id,
                can_read: grant.can_read,
                can_write: grant.can_write,
            })
            .on_conflict((team_access::user_id, team_access::team_id))
            .do_update()
            .set((
                team_access::can_read.eq(excluded(team_access::can_read)),
                team_access::can_write.eq(excluded(team_access::can_write)),
                team_access::updated_at.eq(now),
            ))
            .execute(conn)?;

        let legacy = NewUserPermission::from_grant(user_id, team_id, grant);
        diesel::insert_into(user_permissions::table)
            .values(&legacy)
            .on_conflict((user_permissions::user_id, user_permissions::team_id))
            .do_update()
            .set((
                user_permissions::can_view_team.eq(excluded(user_permissions::can_view_team)),
                user_permissions::can_edit_team_details
                    .eq(excluded(user_permissions::can_edit_team_details)),
                user_permissions::can_manage_employees
                    .eq(excluded(user_permissions::can_manage_employees)),
                user_permissions::can_manage_skills
                    .eq(excluded(user_permissions::can_manage_skills)),
                user_permissions::updated_at.eq(now),
            ))
            .execute(conn)?;

        team_access::table
            .filter(team_access::user_id.eq(user_id))
            .filter(team_access::team_id.eq(team_id))
            .select(TeamAccess::as_select())
            .first(conn)
    })
}

/// Removes a grant from both tables.  Returns whether a grant existed;
/// revoking an absent grant is not an error.
pub fn revoke_team_access(
    conn: &mut SqliteConnection,
    user_id: i32,
    team_id: i32,
) -> QueryResult<bool> {
    conn.transaction(|conn| {
        let removed = diesel::delete(
            team_access::table
                .filter(team_access::user_id.eq(user_id))
                .filter(team_access::team_id.eq(team_id)),
        )
        .execute(conn)?;
        diesel::delete(
            user_permissions::table
                .filter(user_permissions::user_id.eq(user_id))
                .filter(user_permissions::team_id.eq(team_id)),
        )
        .execute(conn)?;
        Ok(removed > 0)
    })
}

/// All grants held by a user, ordered by team.
pub fn get_user_team_access(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> QueryResult<Vec<TeamAccess>> {
    team_access::table
        .filter(team_access::user_id.eq(user_id))
        .order(team_access::team_id.asc())
        .select(TeamAccess::as_select())
        .load(conn)
}

pub fn get_user_permissions(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> QueryResult<Vec<UserPermission>> {
    user_permissions::table
        .filter(user_permissions::user_id.eq(user_id))
        .order(user_permissions::team_id.asc())
        .select(UserPermission::as_select())
        .load(conn)
}
