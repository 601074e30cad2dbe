//! Matrix views and local matrix state.
//!
//! [`RatingMatrix`] is the client-side copy of a team's rating cells.  Edits
//! are applied locally first and undone with an exact inverse if the remote
//! write fails.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::access::AccessContext;
use crate::models::{Department, Employee, ProductionLine, SkillRating, Station, Team, TeamPlacement};
use crate::rating::RatingEdit;

/// Everything the matrix view of one team needs.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TeamMatrix {
    pub placement: TeamPlacement,
    pub employees: Vec<Employee>,
    pub stations: Vec<Station>,
    pub ratings: Vec<SkillRating>,
}

/// Team and department chosen for the caller without manual filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AutoSelection {
    pub department_id: i32,
    pub production_line_id: i32,
    pub team_id: i32,
}

/// The hierarchy visible to the caller.  With an auto-selection, stations
/// are limited to the selected department.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MatrixContext {
    pub departments: Vec<Department>,
    pub production_lines: Vec<ProductionLine>,
    pub teams: Vec<Team>,
    pub stations: Vec<Station>,
    pub auto_selection: Option<AutoSelection>,
}

/// Picks the team and department for a non-admin caller who can read
/// exactly one team.  `resolve` maps a team to its placement; an
/// unresolvable team yields no selection.
pub fn auto_selection<F>(access: &AccessContext, resolve: F) -> Option<AutoSelection>
where
    F: FnOnce(i32) -> Option<TeamPlacement>,
{
    let team_id = access.sole_team()?;
    resolve(team_id).map(|placement| AutoSelection {
        department_id: placement.department_id,
        production_line_id: placement.production_line_id,
        team_id: placement.team_id,
    })
}

type Cell = (i32, i32);

/// Undo record for one local edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Compensation {
    cell: Cell,
    prior: Option<i32>,
}

/// Local rating cells keyed by (employee, station).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingMatrix {
    cells: HashMap<Cell, i32>,
}

impl RatingMatrix {
    pub fn from_ratings<'a, I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = &'a SkillRating>,
    {
        RatingMatrix {
            cells: ratings
                .into_iter()
                .map(|r| ((r.employee_id, r.station_id), r.rating))
                .collect(),
        }
    }

    pub fn get(&self, employee_id: i32, station_id: i32) -> Option<i32> {
        self.cells.get(&(employee_id, station_id)).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn put(&mut self, cell: Cell, value: Option<i32>) -> Option<i32> {
        match value {
            Some(v) => self.cells.insert(cell, v),
            None => self.cells.remove(&cell),
        }
    }

    /// Applies an edit locally and returns what undoes it.
    pub fn apply(&mut self, edit: RatingEdit) -> Compensation {
        let cell = (edit.employee_id, edit.station_id);
        let prior = self.put(cell, edit.rating);
        Compensation { cell, prior }
    }

    /// Restores the cell to exactly the value it held before the edit,
    /// including "no rating".
    pub fn compensate(&mut self, compensation: Compensation) {
        self.put(compensation.cell, compensation.prior);
    }

    /// Applies `edit` locally, then runs the remote write.  On failure the
    /// local change is reverted before the error is returned.
    pub async fn apply_optimistic<F, Fut, T, E>(&mut self, edit: RatingEdit, remote: F) -> Result<T, E>
    where
        F: FnOnce(RatingEdit) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let compensation = self.apply(edit);
        let result = remote(edit).await;
        if result.is_err() {
            self.compensate(compensation);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Grant;
    use crate::models::UserRole;

    fn edit(rating: Option<i32>) -> RatingEdit {
        RatingEdit {
            employee_id: 1,
            station_id: 2,
            rating,
        }
    }

    fn placement(team_id: i32) -> TeamPlacement {
        TeamPlacement {
            team_id,
            team_name: "Early".to_string(),
            production_line_id: 20,
            production_line_name: "Line 1".to_string(),
            department_id: 30,
            department_name: "Assembly".to_string(),
        }
    }

    #[tokio::test]
    async fn failed_write_restores_prior_value() {
        let mut matrix = RatingMatrix::default();
        let _ = matrix.apply(edit(Some(2)));

        let result: Result<(), &str> = matrix
            .apply_optimistic(edit(Some(5)), |_| async { Err("store unavailable") })
            .await;
        assert!(result.is_err());
        assert_eq!(matrix.get(1, 2), Some(2));
    }

    #[tokio::test]
    async fn failed_write_restores_absence() {
        let mut matrix = RatingMatrix::default();
        let result: Result<(), &str> = matrix
            .apply_optimistic(edit(Some(3)), |_| async { Err("timeout") })
            .await;
        assert!(result.is_err());
        assert_eq!(matrix.get(1, 2), None);
        assert!(matrix.is_empty());
    }

    #[tokio::test]
    async fn failed_clear_restores_rating() {
        let mut matrix = RatingMatrix::default();
        let _ = matrix.apply(edit(Some(4)));
        let result: Result<(), &str> = matrix
            .apply_optimistic(edit(None), |_| async { Err("denied") })
            .await;
        assert!(result.is_err());
        assert_eq!(matrix.get(1, 2), Some(4));
    }

    #[tokio::test]
    async fn successful_write_keeps_local_value() {
        let mut matrix = RatingMatrix::default();
        let seen = matrix
            .apply_optimistic(edit(Some(3)), |e| async move { Ok::<_, ()>(e.rating) })
            .await;
        assert_eq!(seen, Ok(Some(3)));
        assert_eq!(matrix.get(1, 2), Some(3));
    }

    #[test]
    fn auto_selects_sole_team() {
        let ctx = AccessContext::new(
            5,
            UserRole::User,
            [Grant {
                team_id: 10,
                can_read: true,
                can_write: false,
            }],
        );
        let picked = auto_selection(&ctx, |id| Some(placement(id)));
        assert_eq!(
            picked,
            Some(AutoSelection {
                department_id: 30,
                production_line_id: 20,
                team_id: 10,
            })
        );
        assert_eq!(auto_selection(&ctx, |_| None), None);

        let admin = AccessContext::new(1, UserRole::Admin, []);
        assert_eq!(auto_selection(&admin, |id| Some(placement(id))), None);
    }
}
