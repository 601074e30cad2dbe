//! Session-based authentication guards for Rocket routes.
//!
//! ```rust,ignore
//! #[get("/profile")]
//! fn get_profile(user: AuthenticatedUser) -> String {
//!     format!("Welcome, {}!", user.user.email)
//! }
//!
//! #[get("/admin")]
//! fn admin_only(admin: AdminUser) -> String {
//!     format!("Admin access granted to {}", admin.user.email)
//! }
//! ```

use chrono::Utc;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};

use crate::DbConn;
use crate::models::{Session, User, UserRole};
use crate::orm::login::SESSION_COOKIE;
use crate::schema::{sessions, users};

/// A request guard for routes that require a logged-in user.
///
/// Reads the session cookie, checks that the session exists, is not revoked
/// and has not expired, then loads the user.
///
/// - `Outcome::Error(Status::Unauthorized)` for a missing or invalid session
/// - `Outcome::Error(Status::InternalServerError)` if no database connection
///   is available
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    /// Session token the request came in with.
    pub session_id: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

async fn authenticate(request: &Request<'_>) -> request::Outcome<AuthenticatedUser, ()> {
    let db = match request.guard::<DbConn>().await {
        Outcome::Success(db) => db,
        _ => return Outcome::Error((Status::InternalServerError, ())),
    };

    let session_id = match request.cookies().get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return Outcome::Error((Status::Unauthorized, ())),
    };

    let lookup_id = session_id.clone();
    let result = db
        .run(move |conn| {
            let session = sessions::table
                .filter(sessions::id.eq(&lookup_id))
                .filter(sessions::revoked.eq(false))
                .filter(
                    sessions::expires_at
                        .is_null()
                        .or(sessions::expires_at.gt(Utc::now().naive_utc())),
                )
                .first::<Session>(conn)
                .optional()?;
            match session {
                Some(session) => users::table
                    .find(session.user_id)
                    .select(User::as_select())
                    .first(conn)
                    .optional(),
                None => Ok(None),
            }
        })
        .await;

    match result {
        Ok(Some(user)) => Outcome::Success(AuthenticatedUser { user, session_id }),
        Ok(None) => Outcome::Error((Status::Unauthorized, ())),
        Err(e) => {
            error!("Database error resolving session: {:?}", e);
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        // Cached so stacked guards on one request hit the store once.
        let outcome = request
            .local_cache_async(async { authenticate(request).await })
            .await;
        match outcome {
            Outcome::Success(user) => Outcome::Success(user.clone()),
            Outcome::Error(e) => Outcome::Error(*e),
            Outcome::Forward(f) => Outcome::Forward(*f),
        }
    }
}

/// Macro to create role-specific request guards
macro_rules! create_role_guard {
    ($name:ident, $role:expr) => {
        #[derive(Debug)]
        pub struct $name {
            pub user: User,
        }

        #[rocket::async_trait]
        impl<'r> FromRequest<'r> for $name {
            type Error = ();

            async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
                let auth_user = match AuthenticatedUser::from_request(request).await {
                    Outcome::Success(user) => user,
                    Outcome::Error(e) => return Outcome::Error(e),
                    Outcome::Forward(f) => return Outcome::Forward(f),
                };

                if auth_user.user.role == $role {
                    Outcome::Success($name {
                        user: auth_user.user,
                    })
                } else {
                    Outcome::Error((Status::Forbidden, ()))
                }
            }
        }
    };
}

// Authenticated and holding the admin role; 403 otherwise.
create_role_guard!(AdminUser, UserRole::Admin);
