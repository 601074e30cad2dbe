use std::io::{self, Write};

use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use rpassword::read_password;
use skillmatrix_api::models::{User, UserInput, UserRole, UserUpdate};
use skillmatrix_api::orm::user::{
    count_admins, delete_user, insert_user, list_all_users, set_user_role, update_user,
};

use super::utils::{confirm, filter_matching, require_user};

#[derive(Subcommand)]
pub enum UserAction {
    #[command(about = "Add a new user")]
    Add {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
        #[arg(short, long, default_value = "user", help = "Role: admin or user")]
        role: UserRole,
    },
    #[command(about = "Change user password")]
    ChangePassword {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "New password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "List users, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
    },
    #[command(about = "Remove users matching search term")]
    Rm {
        #[arg(help = "Search term to match users for removal (regex by default, use -F for fixed string)")]
        search_term: String,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
    #[command(about = "Set a user's role")]
    SetRole {
        #[arg(short, long, help = "User email address")]
        email: String,
        #[arg(short, long, help = "Role: admin or user")]
        role: UserRole,
    },
}

pub fn handle_user_command_with_conn(
    conn: &mut SqliteConnection,
    action: UserAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        UserAction::Add {
            email,
            password,
            role,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt_for_password()?,
            };
            let user = add_user_impl(conn, &email, &password, role)?;
            println!("User created successfully!");
            println!("ID: {}", user.id);
            println!("Email: {}", user.email);
            println!("Role: {}", user.role);
        }
        UserAction::ChangePassword { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_for_password()?,
            };
            change_password_impl(conn, &email, &password)?;
            println!("Password changed successfully for user: {}", email);
        }
        UserAction::Ls {
            search_term,
            fixed_string,
        } => {
            let users = list_users_impl(conn, search_term.as_deref(), fixed_string)?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("Users:");
                for user in users {
                    println!(
                        "  ID: {}, Email: {}, Role: {}, Created: {}",
                        user.id, user.email, user.role, user.created_at
                    );
                }
            }
        }
        UserAction::Rm {
            search_term,
            fixed_string,
            yes,
        } => {
            remove_users_impl(conn, &search_term, fixed_string, yes)?;
        }
        UserAction::SetRole { email, role } => {
            let user = set_role_impl(conn, &email, role)?;
            println!("User '{}' now has role '{}'", user.email, user.role);
        }
    }
    Ok(())
}

pub fn add_user_impl(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
    role: UserRole,
) -> Result<User, Box<dyn std::error::Error>> {
    if !email.contains('@') {
        return Err(format!("'{}' is not a valid email address", email).into());
    }
    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }
    let user = insert_user(
        conn,
        UserInput {
            email: email.to_string(),
            password: password.to_string(),
            role,
        },
    )?;
    Ok(user)
}

pub fn change_password_impl(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }
    let user = require_user(conn, email)?;
    update_user(
        conn,
        user.id,
        UserUpdate {
            password: Some(password.to_string()),
            ..Default::default()
        },
    )?;
    Ok(())
}

pub fn list_users_impl(
    conn: &mut SqliteConnection,
    search_term: Option<&str>,
    fixed_string: bool,
) -> Result<Vec<User>, Box<dyn std::error::Error>> {
    let users = list_all_users(conn)?;
    match search_term {
        Some(term) => filter_matching(users, term, fixed_string, |u| u.email.as_str()),
        None => Ok(users),
    }
}

/// Deletes every user whose email matches.  The last administrator is
/// never removed.  Returns how many users were deleted.
pub fn remove_users_impl(
    conn: &mut SqliteConnection,
    search_term: &str,
    fixed_string: bool,
    yes: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let matching_users = list_users_impl(conn, Some(search_term), fixed_string)?;

    if matching_users.is_empty() {
        println!("No users found matching the search term.");
        return Ok(0);
    }

    println!("Found {} user(s) matching the search term:", matching_users.len());
    for user in &matching_users {
        println!("  ID: {}, Email: {}, Role: {}", user.id, user.email, user.role);
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} user(s)?",
            matching_users.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(0);
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for user in matching_users {
        if user.is_admin() && count_admins(conn)? <= 1 {
            errors.push(format!(
                "Refusing to delete {} (ID: {}): it is the last administrator",
                user.email, user.id
            ));
            continue;
        }
        match delete_user(conn, user.id) {
            Ok(rows_affected) if rows_affected > 0 => {
                deleted_count += 1;
                println!("Deleted user: {} (ID: {})", user.email, user.id);
            }
            Ok(_) => {}
            Err(e) => {
                errors.push(format!(
                    "Failed to delete user {} (ID: {}): {}",
                    user.email, user.id, e
                ));
            }
        }
    }

    println!("Successfully deleted {} user(s).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }

    Ok(deleted_count)
}

pub fn set_role_impl(
    conn: &mut SqliteConnection,
    email: &str,
    role: UserRole,
) -> Result<User, Box<dyn std::error::Error>> {
    let user = require_user(conn, email)?;
    if user.is_admin() && role != UserRole::Admin && count_admins(conn)? <= 1 {
        return Err(format!("Cannot demote '{}': it is the last administrator", email).into());
    }
    Ok(set_user_role(conn, user.id, role)?)
}

pub fn prompt_for_password() -> Result<String, Box<dyn std::error::Error>> {
    print!("Enter new password: ");
    io::stdout().flush()?;
    let password = read_password()?;

    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    print!("Confirm new password: ");
    io::stdout().flush()?;
    let confirm_password = read_password()?;

    if password != confirm_password {
        return Err("Passwords do not match".into());
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillmatrix_api::orm::login::verify_password;
    use skillmatrix_api::orm::testing::setup_test_db;
    use skillmatrix_api::orm::user::get_user_by_email;

    #[test]
    fn add_and_list_users() {
        let mut conn = setup_test_db();
        add_user_impl(&mut conn, "Ann@Plant.example", "pw", UserRole::User).unwrap();
        add_user_impl(&mut conn, "boss@plant.example", "pw", UserRole::Admin).unwrap();

        assert!(add_user_impl(&mut conn, "no-at-sign", "pw", UserRole::User).is_err());
        assert!(add_user_impl(&mut conn, "ann@plant.example", "pw", UserRole::User).is_err());

        let all = list_users_impl(&mut conn, None, false).unwrap();
        assert_eq!(all.len(), 2);
        let matched = list_users_impl(&mut conn, Some("^ann@"), false).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].email, "ann@plant.example");
    }

    #[test]
    fn change_password_rehashes() {
        let mut conn = setup_test_db();
        add_user_impl(&mut conn, "ann@plant.example", "old", UserRole::User).unwrap();
        change_password_impl(&mut conn, "ann@plant.example", "new").unwrap();

        let user = get_user_by_email(&mut conn, "ann@plant.example").unwrap().unwrap();
        assert!(verify_password("new", &user.password_hash));
        assert!(!verify_password("old", &user.password_hash));
        assert!(change_password_impl(&mut conn, "nobody@plant.example", "x").is_err());
    }

    #[test]
    fn last_admin_is_protected() {
        let mut conn = setup_test_db();
        add_user_impl(&mut conn, "boss@plant.example", "pw", UserRole::Admin).unwrap();
        add_user_impl(&mut conn, "ann@plant.example", "pw", UserRole::User).unwrap();

        assert!(set_role_impl(&mut conn, "boss@plant.example", UserRole::User).is_err());
        assert!(remove_users_impl(&mut conn, "boss@", true, true).is_err());

        let promoted = set_role_impl(&mut conn, "ann@plant.example", UserRole::Admin).unwrap();
        assert_eq!(promoted.role, UserRole::Admin);
        assert_eq!(remove_users_impl(&mut conn, "boss@", true, true).unwrap(), 1);
    }
}
