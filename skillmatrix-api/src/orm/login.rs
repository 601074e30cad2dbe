//! Database operations for user authentication and session management.
//!
//! Functions here are generic over [`DbRunner`] so they work against the
//! pooled [`DbConn`] in production and a single in-memory connection in
//! tests.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use diesel::prelude::*;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use uuid::Uuid;

use crate::DbConn;
use crate::models::{NewSession, User};
use crate::orm::testing::FakeDbConn;
use crate::schema::{sessions, users};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Trait for abstracting database operations to support both production and testing.
pub trait DbRunner {
    /// Executes a database operation with a connection.
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static;
}

impl DbRunner for DbConn {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        DbConn::run(self, f)
    }
}

impl DbRunner for FakeDbConn {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        FakeDbConn::run(self, f)
    }
}

fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Finds a user by email address, ignoring case.
pub async fn find_user_by_email<D: DbRunner>(db: &D, email: &str) -> Result<Option<User>, Status> {
    let email = email.trim().to_lowercase();
    db.run(move |conn| {
        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    })
    .await
    .map_err(|_| Status::InternalServerError)
}

/// Verifies a password against a stored Argon2 hash.
///
/// Returns `false` for a mismatch and for a hash that cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// Creates a new session and stores it in the database, returning the token.
pub async fn create_and_store_session<D: DbRunner>(db: &D, user_id: i32) -> Result<String, Status> {
    let session_token = generate_session_token();
    let now = Utc::now().naive_utc();

    let new_session = NewSession {
        id: session_token.clone(),
        user_id,
        created_at: now,
        expires_at: None,
        revoked: false,
    };

    db.run(move |conn| {
        diesel::insert_into(sessions::table)
            .values(&new_session)
            .execute(conn)
    })
    .await
    .map_err(|_| Status::InternalServerError)?;

    Ok(session_token)
}

/// Sets the HTTP-only session cookie.  The secure flag is dropped in tests
/// because the local client does not speak TLS.
fn set_session_cookie(cookies: &CookieJar<'_>, session_token: &str) {
    cookies.add(session_cookie(session_token));
}

fn session_cookie(session_token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_token.to_string()))
        .http_only(true)
        .secure(!cfg!(test))
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Runs the complete login workflow: validate input, find the user, verify the
/// password, create a session and set the cookie.
///
/// Unknown users and wrong passwords both yield `Unauthorized`.
pub async fn process_login<D: DbRunner>(
    db: &D,
    cookies: &CookieJar<'_>,
    login: &crate::api::login::LoginRequest,
) -> Result<User, Status> {
    if login.email.trim().is_empty() || login.password.trim().is_empty() {
        return Err(Status::BadRequest);
    }

    let user = match find_user_by_email(db, &login.email).await? {
        Some(user) => user,
        None => return Err(Status::Unauthorized),
    };

    if !verify_password(&login.password, &user.password_hash) {
        return Err(Status::Unauthorized);
    }

    let session_token = create_and_store_session(db, user.id).await?;
    set_session_cookie(cookies, &session_token);

    Ok(user)
}

/// Hashes a password using Argon2 with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserInput, UserRole};
    use crate::orm::testing::setup_test_dbconn;
    use crate::orm::user::insert_user;

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").unwrap();

        assert!(verify_password("correct_password", &hash));
        assert!(!verify_password("wrong_password", &hash));
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_find_user_by_email_ignores_case() {
        let db = setup_test_dbconn();
        let inserted = db
            .run(|conn| {
                insert_user(
                    conn,
                    UserInput {
                        email: "Shift.Lead@plant.example".to_string(),
                        password: "dummy password".to_string(),
                        role: UserRole::User,
                    },
                )
            })
            .await
            .expect("insert dummy user");

        let found = find_user_by_email(&db, "SHIFT.LEAD@plant.example")
            .await
            .expect("db query should succeed")
            .expect("user should be found");

        assert_eq!(found.id, inserted.id);
        assert_eq!(found.email, "shift.lead@plant.example");
    }

    #[tokio::test]
    async fn test_create_and_store_session() {
        let db = setup_test_dbconn();
        let user = db
            .run(|conn| {
                insert_user(
                    conn,
                    UserInput {
                        email: "planner@plant.example".to_string(),
                        password: "dummy password".to_string(),
                        role: UserRole::User,
                    },
                )
            })
            .await
            .expect("insert dummy user");

        let token = create_and_store_session(&db, user.id)
            .await
            .expect("session creation should succeed");

        let lookup = token.clone();
        let stored = db
            .run(move |conn| {
                sessions::table
                    .filter(sessions::id.eq(lookup))
                    .first::<crate::models::Session>(conn)
                    .optional()
            })
            .await
            .expect("db query should succeed")
            .expect("session should be stored");

        assert_eq!(stored.id, token);
        assert_eq!(stored.user_id, user.id);
        assert!(!stored.revoked);
        assert!(stored.expires_at.is_none());
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie("test_session_token_123");

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "test_session_token_123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
