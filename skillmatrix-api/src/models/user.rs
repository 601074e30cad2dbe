use crate::schema::users;
use chrono::NaiveDateTime;
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Account role.  Admins bypass every team grant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserRole {
    Admin,
    User,
}

sql_text_enum!(UserRole {
    Admin => "admin",
    User => "user",
});

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub email: String, // Will be unique
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Payload for creating an account.  The plaintext password is hashed
/// before it reaches the store.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UserInput {
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
}

fn default_role() -> UserRole {
    UserRole::User
}

#[derive(Deserialize, Serialize, Default, TS)]
#[ts(export)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

/// What the API returns for a user; never carries the password hash.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, TS)]
#[ts(export)]
pub struct UserView {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            id: user.id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
