//! In-memory database helpers shared by unit and integration tests.

use std::sync::{Arc, Mutex, PoisonError};

use diesel::Connection;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket};
use uuid::Uuid;

use super::db::{run_pending_migrations, set_foreign_keys};

/// Builds a Rocket instance backed by a unique shared in-memory database.
///
/// Migrations run and the default admin (`superadmin@example.com` / `admin`
/// unless overridden through the environment) is created during ignition.
pub fn test_rocket() -> Rocket<Build> {
    let unique_db_name = format!("file:test_db_{}?mode=memory&cache=shared", Uuid::new_v4());

    let db_config: Map<_, Value> = map! {
        "url" => unique_db_name.into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };

    let figment = rocket::Config::figment()
        .merge(("databases", map!["sqlite_db" => db_config]))
        .merge(("skillmatrix.mail_relay_url", Value::from("")));

    crate::build_rocket(figment)
}

/// Opens a fresh in-memory database with foreign keys on and every migration
/// applied.
pub fn setup_test_db() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn).expect("Failed to enable foreign keys");
    run_pending_migrations(&mut conn).expect("Failed to run migrations");
    conn
}

/// A single connection that stands in for the pooled [`crate::DbConn`] in
/// tests of code generic over `DbRunner`.
#[derive(Clone)]
pub struct FakeDbConn(Arc<Mutex<SqliteConnection>>);

impl FakeDbConn {
    pub fn new(conn: SqliteConnection) -> Self {
        FakeDbConn(Arc::new(Mutex::new(conn)))
    }

    pub async fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut conn = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut conn)
    }
}

pub fn setup_test_dbconn() -> FakeDbConn {
    FakeDbConn::new(setup_test_db())
}
