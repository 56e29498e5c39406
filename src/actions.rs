//! Action applicator.
//!
//! Turns stored scenario actions into a hypothetical "after" snapshot.
//!
//! Payloads are parsed up front: one bad action (unknown type, missing or
//! unparsable field) rejects the whole batch with `InvalidActionPayload`
//! before anything is applied. Actions are then applied in the order given,
//! so a later action overrides an earlier one touching the same record.
//!
//! Targets missing from the scope are warnings, not errors.
//!
//! The input snapshot is never modified. Records are shared through `Arc`
//! and copied only when an action changes them.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ScenarioError, ScenarioWarning, Warnings};
use crate::models::{
    ActionId, ActionPayload, CapacityAdjustment, CapacityTarget, DateRange, ProjectId,
    ScenarioAction, ScheduleSnapshot, TaskId, TaskShift, TeamId, UserId,
};

/// Largest accepted `shiftDays` magnitude, roughly a century.
pub const MAX_SHIFT_DAYS: i64 = 36_500;

/// An action whose payload passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAction {
    pub id: ActionId,
    pub payload: ActionPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShiftProjectPayload {
    project_id: ProjectId,
    shift_days: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShiftTaskPayload {
    task_id: TaskId,
    #[serde(default)]
    shift_days: Option<i64>,
    #[serde(default)]
    new_start: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeCapacityPayload {
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    team_id: Option<TeamId>,
    delta_percent: f64,
    #[serde(default)]
    date_range: Option<DateRange>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeBudgetPayload {
    project_id: ProjectId,
    delta_amount: f64,
}

/// Validates one payload against its action type.
///
/// # Errors
/// `InvalidActionPayload` for unknown types, unparsable payloads, missing
/// fields, non-finite numbers, out-of-range shifts and contradictory field
/// combinations.
pub fn parse_payload(
    action_id: &ActionId,
    action_type: &str,
    payload: &serde_json::Value,
) -> Result<ActionPayload, ScenarioError> {
    let invalid = |reason: String| ScenarioError::invalid_payload(action_id, reason);
    let decode_err = |e: serde_json::Error| invalid(e.to_string());

    let check_days = |days: i64| {
        if (-MAX_SHIFT_DAYS..=MAX_SHIFT_DAYS).contains(&days) {
            Ok(days)
        } else {
            Err(invalid(format!(
                "shiftDays must be within ±{MAX_SHIFT_DAYS} days, got {days}"
            )))
        }
    };

    match action_type {
        "shift_project" => {
            let p: ShiftProjectPayload =
                serde_json::from_value(payload.clone()).map_err(decode_err)?;
            check_days(p.shift_days)?;
            Ok(ActionPayload::ShiftProject {
                project_id: p.project_id,
                shift_days: p.shift_days,
            })
        }
        "shift_task" => {
            let p: ShiftTaskPayload =
                serde_json::from_value(payload.clone()).map_err(decode_err)?;
            let shift = match (p.shift_days, p.new_start) {
                (Some(days), None) => TaskShift::ByDays(check_days(days)?),
                (None, Some(start)) => TaskShift::StartAt(start),
                (Some(_), Some(_)) => {
                    return Err(invalid("shiftDays and newStart are mutually exclusive".into()))
                }
                (None, None) => return Err(invalid("shiftDays or newStart is required".into())),
            };
            Ok(ActionPayload::ShiftTask {
                task_id: p.task_id,
                shift,
            })
        }
        "change_capacity" => {
            let p: ChangeCapacityPayload =
                serde_json::from_value(payload.clone()).map_err(decode_err)?;
            let target = match (p.user_id, p.team_id) {
                (Some(user), None) => CapacityTarget::User(user),
                (None, Some(team)) => CapacityTarget::Team(team),
                (Some(_), Some(_)) => {
                    return Err(invalid("userId and teamId are mutually exclusive".into()))
                }
                (None, None) => return Err(invalid("userId or teamId is required".into())),
            };
            if !p.delta_percent.is_finite() {
                return Err(invalid("deltaPercent must be a finite number".into()));
            }
            if let Some(range) = p.date_range {
                if range.end < range.start {
                    return Err(invalid("dateRange ends before it starts".into()));
                }
            }
            Ok(ActionPayload::ChangeCapacity {
                target,
                delta_percent: p.delta_percent,
                date_range: p.date_range,
            })
        }
        "change_budget" => {
            let p: ChangeBudgetPayload =
                serde_json::from_value(payload.clone()).map_err(decode_err)?;
            if !p.delta_amount.is_finite() {
                return Err(invalid("deltaAmount must be a finite number".into()));
            }
            Ok(ActionPayload::ChangeBudget {
                project_id: p.project_id,
                delta_amount: p.delta_amount,
            })
        }
        other => Err(invalid(format!("unknown action type '{other}'"))),
    }
}

/// Parses every action, failing on the first invalid one.
pub fn parse_actions(actions: &[ScenarioAction]) -> Result<Vec<ParsedAction>, ScenarioError> {
    actions
        .iter()
        .map(|a| {
            Ok(ParsedAction {
                id: a.id.clone(),
                payload: parse_payload(&a.id, &a.action_type, &a.payload)?,
            })
        })
        .collect()
}

/// Teams whose rosters are needed to apply `actions`.
pub fn referenced_teams(actions: &[ParsedAction]) -> BTreeSet<TeamId> {
    actions
        .iter()
        .filter_map(|a| match &a.payload {
            ActionPayload::ChangeCapacity {
                target: CapacityTarget::Team(team),
                ..
            } => Some(team.clone()),
            _ => None,
        })
        .collect()
}

/// Applies parsed actions to a copy of `before` and returns the copy.
///
/// `rosters` maps each referenced team to its members; a team missing from
/// it is reported as an unknown target.
pub fn apply_actions(
    before: &ScheduleSnapshot,
    actions: &[ParsedAction],
    rosters: &BTreeMap<TeamId, Vec<UserId>>,
    warnings: &mut Warnings,
) -> ScheduleSnapshot {
    let mut after = before.clone();

    for action in actions {
        debug!(
            action_id = %action.id,
            action_type = action.payload.action_type(),
            "Applying scenario action"
        );
        match &action.payload {
            ActionPayload::ShiftProject {
                project_id,
                shift_days,
            } => shift_project(&mut after, &action.id, project_id, *shift_days, warnings),
            ActionPayload::ShiftTask { task_id, shift } => {
                shift_task(&mut after, &action.id, task_id, *shift, warnings)
            }
            ActionPayload::ChangeCapacity {
                target,
                delta_percent,
                date_range,
            } => change_capacity(
                &mut after,
                &action.id,
                target,
                *delta_percent,
                *date_range,
                rosters,
                warnings,
            ),
            ActionPayload::ChangeBudget {
                project_id,
                delta_amount,
            } => change_budget(&mut after, &action.id, project_id, *delta_amount, warnings),
        }
    }

    after
}

fn shift_project(
    snapshot: &mut ScheduleSnapshot,
    action_id: &ActionId,
    project_id: &ProjectId,
    days: i64,
    warnings: &mut Warnings,
) {
    if !snapshot.scope.project_ids.contains(project_id) {
        warnings.push(ScenarioWarning::UnknownActionTarget {
            action_id: action_id.clone(),
            target: format!("project {project_id}"),
        });
        return;
    }
    if days == 0 {
        return;
    }

    let mut shifted = 0;
    for task in snapshot
        .tasks
        .iter_mut()
        .filter(|t| &t.project_id == project_id)
    {
        if Arc::make_mut(task).shift_days(days) {
            shifted += 1;
        } else {
            warnings.push(ScenarioWarning::ShiftOutOfRange {
                action_id: action_id.clone(),
                target: format!("task {}", task.id),
            });
        }
    }
    for alloc in snapshot
        .allocations
        .iter_mut()
        .filter(|a| &a.project_id == project_id)
    {
        if !Arc::make_mut(alloc).shift_days(days) {
            warnings.push(ScenarioWarning::ShiftOutOfRange {
                action_id: action_id.clone(),
                target: format!("allocation {}", alloc.id),
            });
        }
    }
    debug!(%project_id, days, tasks = shifted, "Shifted project");
}

fn shift_task(
    snapshot: &mut ScheduleSnapshot,
    action_id: &ActionId,
    task_id: &TaskId,
    shift: TaskShift,
    warnings: &mut Warnings,
) {
    let Some(pos) = snapshot.task_position(task_id) else {
        warnings.push(ScenarioWarning::UnknownActionTarget {
            action_id: action_id.clone(),
            target: format!("task {task_id}"),
        });
        return;
    };
    let task = Arc::make_mut(&mut snapshot.tasks[pos]);
    let moved = match shift {
        TaskShift::ByDays(days) => task.shift_days(days),
        TaskShift::StartAt(start) => task.move_start_to(start),
    };
    if !moved {
        warnings.push(ScenarioWarning::ShiftOutOfRange {
            action_id: action_id.clone(),
            target: format!("task {task_id}"),
        });
    }
}

fn change_capacity(
    snapshot: &mut ScheduleSnapshot,
    action_id: &ActionId,
    target: &CapacityTarget,
    delta_percent: f64,
    range: Option<DateRange>,
    rosters: &BTreeMap<TeamId, Vec<UserId>>,
    warnings: &mut Warnings,
) {
    let users: Vec<UserId> = match target {
        CapacityTarget::User(user) => vec![user.clone()],
        CapacityTarget::Team(team) => match rosters.get(team) {
            Some(members) => members.clone(),
            None => {
                warnings.push(ScenarioWarning::UnknownActionTarget {
                    action_id: action_id.clone(),
                    target: format!("team {team}"),
                });
                return;
            }
        },
    };

    let horizon_end = snapshot.horizon_end;
    let touches_allocation = snapshot.allocations.iter().any(|a| {
        users.contains(&a.user_id)
            && range.map_or(true, |r| a.effective_range(horizon_end).overlaps(&r))
    });
    if !touches_allocation {
        warnings.push(ScenarioWarning::CapacityChangeWithoutAllocations {
            action_id: action_id.clone(),
        });
    }

    for user_id in users {
        snapshot.capacity_adjustments.push(CapacityAdjustment {
            user_id,
            delta_percent,
            range,
        });
    }
}

fn change_budget(
    snapshot: &mut ScheduleSnapshot,
    action_id: &ActionId,
    project_id: &ProjectId,
    delta_amount: f64,
    warnings: &mut Warnings,
) {
    if !snapshot.scope.project_ids.contains(project_id) {
        warnings.push(ScenarioWarning::UnknownActionTarget {
            action_id: action_id.clone(),
            target: format!("project {project_id}"),
        });
        return;
    }
    match snapshot.financials.get_mut(project_id) {
        Some(financials) => financials.budget_at_completion += delta_amount,
        None => warnings.push(ScenarioWarning::MissingFinancials {
            project_id: project_id.clone(),
        }),
    }
}
