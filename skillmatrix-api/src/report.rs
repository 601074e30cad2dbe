//! Read-only views over the hierarchy and the rating table.
//!
//! Every function here is pure and works on the typed records produced by
//! [`crate::orm::report`]; store access and permission scoping happen before
//! these are called.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::{ContractType, EmployeeRole};

/// Minimum rating counted as sufficiently skilled unless configured otherwise.
pub const DEFAULT_QUALIFYING_THRESHOLD: i32 = 3;

/// An employee resolved through team and production line to a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedEmployee {
    pub employee_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub role: EmployeeRole,
    pub contract_type: ContractType,
    pub team_id: i32,
    pub team_name: String,
    pub production_line_id: i32,
    pub production_line_name: String,
    pub department_id: i32,
    pub department_name: String,
}

impl ResolvedEmployee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StationRef {
    pub station_id: i32,
    pub station_name: String,
    pub department_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RatingRow {
    pub employee_id: i32,
    pub station_id: i32,
    pub rating: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TeamStatistics {
    pub total: usize,
    pub leadership: usize,
    pub workforce: usize,
    pub permanent: usize,
    pub temporary: usize,
}

/// Headcount by role group and contract type in one pass.
pub fn team_statistics<I>(members: I) -> TeamStatistics
where
    I: IntoIterator<Item = (EmployeeRole, ContractType)>,
{
    members
        .into_iter()
        .fold(TeamStatistics::default(), |mut stats, (role, contract)| {
            stats.total += 1;
            if role.is_leadership() {
                stats.leadership += 1;
            }
            if role.is_workforce() {
                stats.workforce += 1;
            }
            match contract {
                ContractType::Permanent => stats.permanent += 1,
                ContractType::Temporary => stats.temporary += 1,
            }
            stats
        })
}

/// Hierarchy filter for the station rating aggregate.  A more specific
/// filter only applies when the levels above it are set as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HierarchyFilter {
    pub department_id: Option<i32>,
    pub production_line_id: Option<i32>,
    pub team_id: Option<i32>,
}

/// How finely the aggregate groups, following the deepest active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GroupLevel {
    Station,
    Department,
    ProductionLine,
    Team,
}

impl HierarchyFilter {
    pub fn level(&self) -> GroupLevel {
        match (self.department_id, self.production_line_id, self.team_id) {
            (Some(_), Some(_), Some(_)) => GroupLevel::Team,
            (Some(_), Some(_), None) => GroupLevel::ProductionLine,
            (Some(_), None, _) => GroupLevel::Department,
            (None, _, _) => GroupLevel::Station,
        }
    }

    fn admits(&self, employee: &ResolvedEmployee) -> bool {
        let level = self.level();
        let dept_ok = self.department_id.is_none_or(|d| d == employee.department_id);
        let line_ok = !matches!(level, GroupLevel::ProductionLine | GroupLevel::Team)
            || self.production_line_id == Some(employee.production_line_id);
        let team_ok = level != GroupLevel::Team || self.team_id == Some(employee.team_id);
        dept_ok && line_ok && team_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StationRatingSummary {
    pub department_id: Option<i32>,
    pub department_name: Option<String>,
    pub production_line_id: Option<i32>,
    pub production_line_name: Option<String>,
    pub team_id: Option<i32>,
    pub team_name: Option<String>,
    pub station_id: i32,
    pub station_name: String,
    pub average_rating: f64,
    pub rating_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    department: Option<(String, i32)>,
    line: Option<(String, i32)>,
    team: Option<(String, i32)>,
    station: (String, i32),
}

/// Average rating and contributing count per station, grouped at the
/// filter's level.
///
/// A rating contributes only when it is positive, its employee and station
/// are both known, and the employee's department is the station's
/// department.  Anything else is skipped without error.  Output is sorted by
/// department, line, team and station name.
pub fn station_rating_aggregate(
    employees: &[ResolvedEmployee],
    stations: &[StationRef],
    ratings: &[RatingRow],
    filter: &HierarchyFilter,
) -> Vec<StationRatingSummary> {
    let level = filter.level();
    let employees_by_id: HashMap<i32, &ResolvedEmployee> =
        employees.iter().map(|e| (e.employee_id, e)).collect();
    let stations_by_id: HashMap<i32, &StationRef> =
        stations.iter().map(|s| (s.station_id, s)).collect();

    let mut groups: BTreeMap<GroupKey, (i64, usize)> = BTreeMap::new();

    for row in ratings.iter().filter(|r| r.rating > 0) {
        let (Some(employee), Some(station)) = (
            employees_by_id.get(&row.employee_id),
            stations_by_id.get(&row.station_id),
        ) else {
            continue;
        };
        if employee.department_id != station.department_id || !filter.admits(employee) {
            continue;
        }

        let key = GroupKey {
            department: (level != GroupLevel::Station)
                .then(|| (employee.department_name.clone(), employee.department_id)),
            line: matches!(level, GroupLevel::ProductionLine | GroupLevel::Team).then(|| {
                (
                    employee.production_line_name.clone(),
                    employee.production_line_id,
                )
            }),
            team: (level == GroupLevel::Team)
                .then(|| (employee.team_name.clone(), employee.team_id)),
            station: (station.station_name.clone(), station.station_id),
        };
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += i64::from(row.rating);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (sum, count))| {
            let (department_name, department_id) = key.department.unzip();
            let (production_line_name, production_line_id) = key.line.unzip();
            let (team_name, team_id) = key.team.unzip();
            StationRatingSummary {
                department_id,
                department_name,
                production_line_id,
                production_line_name,
                team_id,
                team_name,
                station_id: key.station.1,
                station_name: key.station.0,
                average_rating: sum as f64 / count as f64,
                rating_count: count,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GapStatus {
    Short,
    Met,
    Surplus,
}

impl GapStatus {
    pub fn from_gap(gap: i64) -> Self {
        match gap {
            g if g > 0 => GapStatus::Short,
            0 => GapStatus::Met,
            _ => GapStatus::Surplus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpskillCandidate {
    pub employee_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StationGap {
    pub station_id: i32,
    pub station_name: String,
    pub target: i64,
    pub qualified_count: i64,
    /// Positive means short of the target, negative means surplus.
    pub gap: i64,
    pub status: GapStatus,
    pub level1_candidates: Vec<UpskillCandidate>,
    pub level2_candidates: Vec<UpskillCandidate>,
}

/// Staffing gap per station for one set of employees.
///
/// `targets` maps station id to the wanted headcount; stations without an
/// entry use 0.  Employees rated 1 or 2 at a station are listed as upskill
/// candidates for it.
pub fn station_gap_report(
    stations: &[StationRef],
    employees: &[ResolvedEmployee],
    ratings: &[RatingRow],
    targets: &HashMap<i32, i64>,
    threshold: i32,
) -> Vec<StationGap> {
    let ratings_by_cell: HashMap<(i32, i32), i32> = ratings
        .iter()
        .map(|r| ((r.employee_id, r.station_id), r.rating))
        .collect();

    stations
        .iter()
        .map(|station| {
            let mut qualified_count = 0;
            let mut level1_candidates = Vec::new();
            let mut level2_candidates = Vec::new();

            for employee in employees {
                match ratings_by_cell.get(&(employee.employee_id, station.station_id)) {
                    Some(&r) if r >= threshold && r > 0 => qualified_count += 1,
                    Some(1) => level1_candidates.push(candidate(employee)),
                    Some(2) => level2_candidates.push(candidate(employee)),
                    _ => {}
                }
            }

            let target = targets.get(&station.station_id).copied().unwrap_or(0);
            let gap = target - qualified_count;
            StationGap {
                station_id: station.station_id,
                station_name: station.station_name.clone(),
                target,
                qualified_count,
                gap,
                status: GapStatus::from_gap(gap),
                level1_candidates,
                level2_candidates,
            }
        })
        .collect()
}

fn candidate(employee: &ResolvedEmployee) -> UpskillCandidate {
    UpskillCandidate {
        employee_id: employee.employee_id,
        name: employee.display_name(),
    }
}
