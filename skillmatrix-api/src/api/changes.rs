//! Server-sent change events.
//!
//! Clients open one stream per view and re-fetch the view whenever an event
//! arrives.  Events for teams the caller cannot read are never sent.
//!
//! The grants checked here are the ones loaded when the stream opened.  When
//! a grant on one of the caller's readable teams is changed or revoked, the
//! stream sends `reauthorize` and closes, so the client reconnects under its
//! current grants.

use rocket::http::Status;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::json;
use rocket::tokio::select;
use rocket::{Route, Shutdown, State, get};

use super::{ApiError, error_response};
use crate::access::AccessContext;
use crate::feed::consumer::{FeedMessage, FeedSource};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, FeedFilter, Table};

/// Parses a comma-separated table list.  Blank input means every table.
pub fn parse_tables(raw: Option<&str>) -> Result<Vec<Table>, String> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// What an open stream does with one incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Send,
    Skip,
    /// The caller's grants may have shrunk; end the stream.
    Reauthorize,
}

/// Decides the fate of `event` for a stream opened with `access` over the
/// `requested` tables (empty means every table).
pub fn route_event(access: &AccessContext, requested: &[Table], event: &ChangeEvent) -> Delivery {
    let readable = event.team_id.is_none_or(|t| access.can_read(t));
    if event.table == Table::TeamAccess
        && event.kind != ChangeKind::Insert
        && !access.is_admin()
        && readable
    {
        return Delivery::Reauthorize;
    }
    let wanted = requested.is_empty() || requested.contains(&event.table);
    if wanted && readable {
        Delivery::Send
    } else {
        Delivery::Skip
    }
}

/// Change Stream endpoint.
///
/// - **URL:** `/api/1/Changes?table=employee_skills,employees&team_id=<id>`
/// - **Method:** `GET`
/// - **Purpose:** Streams insert, update and delete events as `text/event-stream`
/// - **Authentication:** Required; a `team_id` filter needs read access to that team
///
/// Each message is an event named `change` carrying
/// `{"table", "kind", "row_id", "team_id"}`.  A `resync` event means the
/// client fell behind and should re-fetch.  A `reauthorize` event is the
/// last one on the stream; the client reconnects to continue.
#[get("/1/Changes?<table>&<team_id>")]
pub async fn change_stream(
    feed: &State<ChangeFeed>,
    access: AccessContext,
    table: Option<String>,
    team_id: Option<i32>,
    mut end: Shutdown,
) -> Result<EventStream![], ApiError> {
    let tables = parse_tables(table.as_deref())
        .map_err(|e| error_response(Status::BadRequest, e))?;
    // Grant changes are always followed so a revoke can close the stream.
    let mut subscribed = tables.clone();
    if !subscribed.is_empty() && !subscribed.contains(&Table::TeamAccess) {
        subscribed.push(Table::TeamAccess);
    }
    let mut filter = FeedFilter::tables(&subscribed);
    if let Some(team_id) = team_id {
        access.require_read(team_id)?;
        filter = filter.for_team(team_id);
    }

    let user_id = access.user_id;
    let mut subscription = feed
        .subscribe(filter)
        .map_err(|e| error_response(Status::ServiceUnavailable, e.to_string()))?
        .on_release(move || {
            debug!("Change stream for user {} closed", user_id);
            Ok(())
        });
    debug!("Change stream opened for user {}", user_id);

    Ok(EventStream! {
        loop {
            let message = select! {
                message = subscription.next() => message,
                _ = &mut end => break,
            };
            match message {
                Ok(FeedMessage::Event(event)) => match route_event(&access, &tables, &event) {
                    Delivery::Send => {
                        yield Event::json(&event).event("change");
                    }
                    Delivery::Skip => {}
                    Delivery::Reauthorize => {
                        debug!("Grants changed under change stream for user {}", user_id);
                        yield Event::json(&event).event("reauthorize");
                        break;
                    }
                },
                Ok(FeedMessage::Missed(count)) => {
                    yield Event::json(&json!({ "missed": count })).event("resync");
                }
                Err(_) => break,
            }
        }
    })
}

pub fn routes() -> Vec<Route> {
    routes![change_stream]
}
