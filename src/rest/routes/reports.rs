// rest/routes/reports.rs — Derived-data reports.
//
// Both reports read a per-request snapshot (all employees + all tasks) and
// run the pure workload functions over it. No cross-request atomicity: two
// concurrent callers can both see the same baseline load.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::rest::ApiError;
use crate::storage::TaskRow;
use crate::tracker::workload::{busy_report, candidates, important_tasks as find_important};
use crate::AppContext;

fn task_summary(task: &TaskRow, by_id: &BTreeMap<i64, &TaskRow>) -> Value {
    let parent = task
        .parent_task
        .and_then(|p| by_id.get(&p))
        .map(|p| json!({ "id": p.id, "name": p.name, "deadline": p.deadline }));
    json!({
        "id": task.id,
        "name": task.name,
        "deadline": task.deadline,
        "status": task.status,
        "parent_task": parent,
    })
}

/// GET /api/v1/employees/busy — employees ranked by active-task load.
pub async fn busy_employees(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, ApiError> {
    let employees = ctx.storage.list_employees().await?;
    let tasks = ctx.storage.all_tasks().await?;
    let by_id: BTreeMap<i64, &TaskRow> = tasks.iter().map(|t| (t.id, t)).collect();

    let report: Vec<Value> = busy_report(&employees, &tasks)
        .into_iter()
        .map(|(employee, active)| {
            json!({
                "id": employee.id,
                "full_name": employee.full_name,
                "position": employee.position,
                "active_task_count": active.len(),
                "tasks": active
                    .iter()
                    .map(|t| task_summary(t, &by_id))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(Json(json!(report)))
}

/// GET /api/v1/tasks/important — unassigned or blocking tasks, each with the
/// employees eligible to take them.
pub async fn important_tasks(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, ApiError> {
    let employees = ctx.storage.list_employees().await?;
    let tasks = ctx.storage.all_tasks().await?;

    let report: Vec<Value> = find_important(&tasks)
        .into_iter()
        .map(|task| {
            let potential: Vec<Value> = candidates(task, &employees, &tasks)
                .into_iter()
                .map(|e| json!({ "id": e.id, "full_name": e.full_name }))
                .collect();
            json!({
                "id": task.id,
                "name": task.name,
                "deadline": task.deadline,
                "status": task.status,
                "potential_employees": potential,
            })
        })
        .collect();
    Ok(Json(json!(report)))
}
