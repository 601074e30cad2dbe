use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::models::{NewUser, User, UserInput, UserRole, UserUpdate};
use crate::orm::login::hash_password;
use crate::schema::users;

#[derive(QueryableByName)]
pub(crate) struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    pub last_insert_rowid: i64,
}

/// Returns the rowid of the most recent insert on this connection.
pub(crate) fn last_insert_id(conn: &mut SqliteConnection) -> QueryResult<i32> {
    let row = diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
        .get_result::<LastInsertRowId>(conn)?;
    Ok(row.last_insert_rowid as i32)
}

fn hash_or_error(password: &str) -> QueryResult<String> {
    hash_password(password).map_err(|e| {
        diesel::result::Error::SerializationError(format!("password hashing failed: {e}").into())
    })
}

/// Inserts a new user.  The email is stored lowercased and the password is
/// hashed with Argon2.
pub fn insert_user(conn: &mut SqliteConnection, input: UserInput) -> QueryResult<User> {
    let now = Utc::now().naive_utc();
    let new_user = NewUser {
        email: input.email.trim().to_lowercase(),
        password_hash: hash_or_error(&input.password)?,
        role: input.role,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(conn)?;

    let new_id = last_insert_id(conn)?;
    users::table
        .find(new_id)
        .select(User::as_select())
        .first(conn)
}

/// Returns all users in ascending order by id.
pub fn list_all_users(conn: &mut SqliteConnection) -> QueryResult<Vec<User>> {
    users::table
        .order(users::id.asc())
        .select(User::as_select())
        .load(conn)
}

pub fn get_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Option<User>> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Gets a single user by email, ignoring case.
pub fn get_user_by_email(conn: &mut SqliteConnection, email: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::email.eq(email.trim().to_lowercase()))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Updates the provided fields of a user; omitted fields are left alone.
pub fn update_user(
    conn: &mut SqliteConnection,
    user_id: i32,
    update: UserUpdate,
) -> QueryResult<User> {
    let now = Utc::now().naive_utc();

    if let Some(email) = update.email {
        diesel::update(users::table.find(user_id))
            .set(users::email.eq(email.trim().to_lowercase()))
            .execute(conn)?;
    }
    if let Some(password) = update.password {
        diesel::update(users::table.find(user_id))
            .set(users::password_hash.eq(hash_or_error(&password)?))
            .execute(conn)?;
    }
    if let Some(role) = update.role {
        diesel::update(users::table.find(user_id)).set(users::role.eq(role)).execute(conn)?;
    }
    diesel::update(users::table.find(user_id))
        .set(users::updated_at.eq(now))
        .execute(conn)?;

    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
}

pub fn set_user_role(conn: &mut SqliteConnection, user_id: i32, role: UserRole) -> QueryResult<User> {
    update_user(
        conn,
        user_id,
        UserUpdate {
            role: Some(role),
            ..Default::default()
        },
    )
}

/// Deletes a user.  Sessions and grants cascade; linked employees keep their
/// row with the user link cleared.
pub fn delete_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<usize> {
    diesel::delete(users::table.find(user_id)).execute(conn)
}

pub fn count_admins(conn: &mut SqliteConnection) -> QueryResult<i64> {
    users::table
        .filter(users::role.eq(UserRole::Admin))
        .count()
        .get_result(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::login::verify_password;
    use crate::orm::testing::setup_test_db;

    fn input(email: &str, role: UserRole) -> UserInput {
        UserInput {
            email: email.to_string(),
            password: "hunter22".to_string(),
            role,
        }
    }

    #[test]
    fn insert_hashes_password_and_lowercases_email() {
        let mut conn = setup_test_db();
        let user = insert_user(&mut conn, input("Lead@Plant.Example", UserRole::User)).unwrap();

        assert_eq!(user.email, "lead@plant.example");
        assert_ne!(user.password_hash, "hunter22");
        assert!(verify_password("hunter22", &user.password_hash));
        assert_eq!(user.role, UserRole::User);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let mut conn = setup_test_db();
        insert_user(&mut conn, input("dup@plant.example", UserRole::User)).unwrap();
        let err = insert_user(&mut conn, input("DUP@plant.example", UserRole::User)).unwrap_err();
        assert!(matches!(
            err,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _
            )
        ));
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut conn = setup_test_db();
        let user = insert_user(&mut conn, input("a@plant.example", UserRole::User)).unwrap();

        let updated = set_user_role(&mut conn, user.id, UserRole::Admin).unwrap();
        assert_eq!(updated.role, UserRole::Admin);
        assert_eq!(updated.email, "a@plant.example");
        assert_eq!(updated.password_hash, user.password_hash);
        assert_eq!(count_admins(&mut conn).unwrap(), 1);
    }

    #[test]
    fn delete_and_lookup() {
        let mut conn = setup_test_db();
        let user = insert_user(&mut conn, input("gone@plant.example", UserRole::User)).unwrap();
        assert!(get_user_by_email(&mut conn, "GONE@plant.example").unwrap().is_some());

        assert_eq!(delete_user(&mut conn, user.id).unwrap(), 1);
        assert!(get_user(&mut conn, user.id).unwrap().is_none());
        assert!(list_all_users(&mut conn).unwrap().is_empty());
    }
}
