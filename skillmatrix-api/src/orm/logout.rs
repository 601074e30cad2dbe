//! Session revocation.

use diesel::prelude::*;

use crate::orm::login::DbRunner;
use crate::schema::sessions::dsl::*;

/// Marks a session as revoked.  The row is kept; the session guard refuses
/// revoked tokens.  Returns the number of rows affected.
pub async fn revoke_session<D: DbRunner>(
    db: &D,
    session_id: &str,
) -> Result<usize, diesel::result::Error> {
    let session_id = session_id.to_string();
    db.run(move |conn| {
        diesel::update(sessions.filter(id.eq(&session_id)))
            .set(revoked.eq(true))
            .execute(conn)
    })
    .await
}
