use diesel::prelude::*;
use dotenvy::dotenv;
use rocket::Rocket;
use rocket::fairing::AdHoc;

use crate::models::{User, UserInput, UserRole};
use crate::orm::DbConn;
use crate::orm::user::{get_user_by_email, insert_user, set_user_role};

/// Add the default admin user if needed.
///
/// Set the default admin email/pass with SKILLMATRIX_DEFAULT_EMAIL and
/// SKILLMATRIX_DEFAULT_PASSWORD.
pub fn admin_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Admin User Initialization", |rocket| async {
        dotenv().ok();

        let conn = match get_db_connection(&rocket).await {
            Some(conn) => conn,
            None => return Err(rocket),
        };

        let admin_email = get_admin_email();
        let admin_password = get_admin_password();
        match conn
            .run(move |c| create_admin_user_if_needed(c, &admin_email, &admin_password))
            .await
        {
            Ok(_) => Ok(rocket),
            Err(e) => {
                error!("[admin-init] FATAL: Admin user creation failed: {:?}", e);
                Err(rocket)
            }
        }
    })
}

async fn get_db_connection(rocket: &Rocket<rocket::Build>) -> Option<DbConn> {
    match DbConn::get_one(rocket).await {
        Some(conn) => Some(conn),
        None => {
            error!("[admin-init] ERROR: Could not get DB connection.");
            None
        }
    }
}

fn get_admin_email() -> String {
    std::env::var("SKILLMATRIX_DEFAULT_EMAIL")
        .unwrap_or_else(|_| "superadmin@example.com".to_string())
}

fn get_admin_password() -> String {
    std::env::var("SKILLMATRIX_DEFAULT_PASSWORD").unwrap_or_else(|_| "admin".to_string())
}

/// Creates the admin account, or promotes an existing account with that
/// email back to admin.
fn create_admin_user_if_needed(
    c: &mut SqliteConnection,
    admin_email: &str,
    admin_password: &str,
) -> QueryResult<User> {
    if let Some(existing) = get_user_by_email(c, admin_email)? {
        if existing.is_admin() {
            info!("[admin-init] Admin user '{}' already exists", admin_email);
            return Ok(existing);
        }
        warn!("[admin-init] Promoting '{}' to admin", admin_email);
        return set_user_role(c, existing.id, UserRole::Admin);
    }

    let user = insert_user(
        c,
        UserInput {
            email: admin_email.to_string(),
            password: admin_password.to_string(),
            role: UserRole::Admin,
        },
    )?;
    info!("[admin-init] Created admin user: '{}'", admin_email);
    Ok(user)
}
