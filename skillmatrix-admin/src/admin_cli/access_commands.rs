use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use skillmatrix_api::models::{TeamAccess, TeamAccessInput};
use skillmatrix_api::orm::team_access::{
    get_user_team_access, grant_team_access, revoke_team_access,
};

use super::utils::{require_team, require_user};

#[derive(Subcommand)]
pub enum AccessAction {
    #[command(about = "Grant a user access to a team (write implies read)")]
    Grant {
        #[arg(short, long, help = "User email address")]
        email: String,
        #[arg(short, long, help = "Team ID")]
        team_id: i32,
        #[arg(short, long, help = "Also grant write access")]
        write: bool,
    },
    #[command(about = "Revoke a user's access to a team")]
    Revoke {
        #[arg(short, long, help = "User email address")]
        email: String,
        #[arg(short, long, help = "Team ID")]
        team_id: i32,
    },
    #[command(about = "List a user's team grants")]
    Ls {
        #[arg(short, long, help = "User email address")]
        email: String,
    },
}

pub fn handle_access_command_with_conn(
    conn: &mut SqliteConnection,
    action: AccessAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AccessAction::Grant {
            email,
            team_id,
            write,
        } => {
            let access = grant_access_impl(conn, &email, team_id, write)?;
            println!(
                "Granted {} on team {} to {}",
                describe(&access),
                team_id,
                email
            );
        }
        AccessAction::Revoke { email, team_id } => {
            if revoke_access_impl(conn, &email, team_id)? {
                println!("Revoked access to team {} from {}", team_id, email);
            } else {
                println!("User '{}' had no access to team {}", email, team_id);
            }
        }
        AccessAction::Ls { email } => {
            let grants = list_access_impl(conn, &email)?;
            if grants.is_empty() {
                println!("No team access for {}.", email);
            } else {
                println!("Team access for {}:", email);
                for access in grants {
                    println!("  Team ID: {}, Access: {}", access.team_id, describe(&access));
                }
            }
        }
    }
    Ok(())
}

fn describe(access: &TeamAccess) -> &'static str {
    if access.can_write {
        "read/write"
    } else {
        "read"
    }
}

pub fn grant_access_impl(
    conn: &mut SqliteConnection,
    email: &str,
    team_id: i32,
    write: bool,
) -> Result<TeamAccess, Box<dyn std::error::Error>> {
    let user = require_user(conn, email)?;
    require_team(conn, team_id)?;
    let access = grant_team_access(
        conn,
        user.id,
        team_id,
        TeamAccessInput {
            can_read: true,
            can_write: write,
        },
    )?;
    Ok(access)
}

pub fn revoke_access_impl(
    conn: &mut SqliteConnection,
    email: &str,
    team_id: i32,
) -> Result<bool, Box<dyn std::error::Error>> {
    let user = require_user(conn, email)?;
    Ok(revoke_team_access(conn, user.id, team_id)?)
}

pub fn list_access_impl(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Vec<TeamAccess>, Box<dyn std::error::Error>> {
    let user = require_user(conn, email)?;
    Ok(get_user_team_access(conn, user.id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin_cli::user_commands::add_user_impl;
    use skillmatrix_api::models::UserRole;
    use skillmatrix_api::orm::department::insert_department;
    use skillmatrix_api::orm::production_line::insert_production_line;
    use skillmatrix_api::orm::team::insert_team;
    use skillmatrix_api::orm::testing::setup_test_db;

    #[test]
    fn grant_upgrade_and_revoke() {
        let mut conn = setup_test_db();
        add_user_impl(&mut conn, "lead@plant.example", "pw", UserRole::User).unwrap();
        let dept = insert_department(&mut conn, "Assembly").unwrap();
        let line = insert_production_line(&mut conn, "Line 1", dept.id).unwrap();
        let team = insert_team(&mut conn, "Early", line.id).unwrap();

        let read = grant_access_impl(&mut conn, "lead@plant.example", team.id, false).unwrap();
        assert!(read.can_read && !read.can_write);
        let write = grant_access_impl(&mut conn, "lead@plant.example", team.id, true).unwrap();
        assert!(write.can_read && write.can_write);
        assert_eq!(list_access_impl(&mut conn, "lead@plant.example").unwrap().len(), 1);

        assert!(grant_access_impl(&mut conn, "lead@plant.example", team.id + 1, false).is_err());
        assert!(grant_access_impl(&mut conn, "ghost@plant.example", team.id, false).is_err());

        assert!(revoke_access_impl(&mut conn, "lead@plant.example", team.id).unwrap());
        assert!(!revoke_access_impl(&mut conn, "lead@plant.example", team.id).unwrap());
        assert!(list_access_impl(&mut conn, "lead@plant.example").unwrap().is_empty());
    }
}
