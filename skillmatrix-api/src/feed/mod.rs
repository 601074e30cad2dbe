//! In-process change feed.
//!
//! Every mutation publishes a [`ChangeEvent`] on a broadcast channel.
//! HTTP clients follow it as server-sent events; in-process consumers use
//! [`consumer::FeedConsumer`].

pub mod consumer;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use ts_rs::TS;

use self::consumer::{FeedError, FeedSource, Subscription};

/// Default number of events buffered per subscriber before it lags.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Table {
    Departments,
    ProductionLines,
    Teams,
    Employees,
    Stations,
    EmployeeSkills,
    TeamAccess,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Departments,
        Table::ProductionLines,
        Table::Teams,
        Table::Employees,
        Table::Stations,
        Table::EmployeeSkills,
        Table::TeamAccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Departments => "departments",
            Table::ProductionLines => "production_lines",
            Table::Teams => "teams",
            Table::Employees => "employees",
            Table::Stations => "stations",
            Table::EmployeeSkills => "employee_skills",
            Table::TeamAccess => "team_access",
        }
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table '{s}'"))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: i32,
    /// Team the row belongs to, when it belongs to one.
    pub team_id: Option<i32>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, row_id: i32, team_id: Option<i32>) -> Self {
        ChangeEvent {
            table,
            kind,
            row_id,
            team_id,
        }
    }
}

/// Equality filter on table and team.  An empty `tables` list matches every
/// table; a team filter only matches events carrying that team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub tables: Vec<Table>,
    pub team_id: Option<i32>,
}

impl FeedFilter {
    pub fn tables(tables: &[Table]) -> Self {
        FeedFilter {
            tables: tables.to_vec(),
            team_id: None,
        }
    }

    pub fn for_team(mut self, team_id: i32) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let table_ok = self.tables.is_empty() || self.tables.contains(&event.table);
        let team_ok = self.team_id.is_none() || self.team_id == event.team_id;
        table_ok && team_ok
    }
}

/// Broadcast hub for change events, held as managed Rocket state.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new(DEFAULT_FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        ChangeFeed { sender }
    }

    /// Publishes an event; returns how many subscribers received it.
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        debug!("change feed: {:?}", event);
        self.sender.send(event).unwrap_or(0)
    }

    pub fn receiver(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl FeedSource for ChangeFeed {
    fn subscribe(&self, filter: FeedFilter) -> Result<Subscription, FeedError> {
        Ok(Subscription::new(self.receiver(), filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip_through_query_strings() {
        assert_eq!("employee_skills".parse::<Table>(), Ok(Table::EmployeeSkills));
        assert!("users".parse::<Table>().is_err());
    }

    #[test]
    fn filter_matches_table_and_team() {
        let event = ChangeEvent::new(Table::EmployeeSkills, ChangeKind::Update, 4, Some(2));
        assert!(FeedFilter::default().matches(&event));
        assert!(FeedFilter::tables(&[Table::EmployeeSkills]).matches(&event));
        assert!(!FeedFilter::tables(&[Table::Teams]).matches(&event));
        assert!(FeedFilter::default().for_team(2).matches(&event));
        assert!(!FeedFilter::default().for_team(3).matches(&event));

        let structural = ChangeEvent::new(Table::Stations, ChangeKind::Insert, 1, None);
        assert!(!FeedFilter::default().for_team(2).matches(&structural));
    }

    #[tokio::test]
    async fn publish_reaches_every_receiver() {
        let feed = ChangeFeed::new(8);
        assert_eq!(
            feed.publish(ChangeEvent::new(Table::Teams, ChangeKind::Insert, 1, Some(1))),
            0
        );

        let mut a = feed.receiver();
        let mut b = feed.receiver();
        let event = ChangeEvent::new(Table::Employees, ChangeKind::Delete, 9, Some(1));
        assert_eq!(feed.publish(event), 2);
        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }
}
