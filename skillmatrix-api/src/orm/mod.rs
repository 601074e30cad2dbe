mod db;
pub mod department;
pub mod employee;
pub mod login;
pub mod logout;
pub mod production_line;
pub mod report;
pub mod skill_rating;
pub mod station;
pub mod team;
pub mod team_access;
pub mod testing;
pub mod user;

pub use db::*;

/// True when the error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _)
    )
}

/// True when the error is a FOREIGN KEY constraint violation.
pub fn is_foreign_key_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _
        )
    )
}
