// rest/routes/tasks.rs — Task CRUD routes.
//
// List filtering is allow-listed: {assignee, status, parent_task, deadline}
// plus the presence flags sub_tasks / has_parent. Any other query key is a
// 400 naming the allowed set. Writes run the collect-all validators before
// touching storage.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::rest::routes::double_option;
use crate::rest::ApiError;
use crate::storage::{TaskFilter, TaskRow};
use crate::tracker::validate::{creates_cycle, validate_task, FieldErrors, TaskFields};
use crate::AppContext;

const ALLOWED_FILTERS: [&str; 4] = ["assignee", "status", "parent_task", "deadline"];
const PRESENCE_FLAGS: [&str; 2] = ["sub_tasks", "has_parent"];

pub fn task_json(task: &TaskRow, sub_tasks: &[i64]) -> Value {
    json!({
        "id": task.id,
        "name": task.name,
        "parent_task": task.parent_task,
        "assignee": task.assignee,
        "deadline": task.deadline,
        "status": task.status,
        "additional_info": task.additional_info,
        "sub_tasks": sub_tasks,
        "created_at": task.created_at,
        "updated_at": task.updated_at,
    })
}

/// Ids of direct subtasks, ascending (rows arrive id-ordered from storage).
fn sub_tasks_of(id: i64, tasks: &[TaskRow]) -> Vec<i64> {
    tasks
        .iter()
        .filter(|t| t.parent_task == Some(id))
        .map(|t| t.id)
        .collect()
}

fn parse_date(field: &str, value: &str, errors: &mut FieldErrors) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Must be a valid date in YYYY-MM-DD format.");
            None
        }
    }
}

// ─── List ─────────────────────────────────────────────────────────────────────

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn filter_from_params(params: &HashMap<String, String>) -> Result<TaskFilter, ApiError> {
    let invalid: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|k| !ALLOWED_FILTERS.contains(k) && !PRESENCE_FLAGS.contains(k))
        .collect();
    if !invalid.is_empty() {
        let mut errors = FieldErrors::new();
        errors.add(
            "query",
            format!(
                "Filtering by field(s) {} is not supported. Allowed filter fields: {}.",
                invalid.join(", "),
                ALLOWED_FILTERS.join(", "),
            ),
        );
        return Err(ApiError::validation(errors));
    }

    let mut errors = FieldErrors::new();
    let mut filter = TaskFilter::default();

    if let Some(raw) = params.get("assignee") {
        match raw.parse::<i64>() {
            Ok(id) => filter.assignee = Some(id),
            Err(_) => errors.add("assignee", "Must be an integer."),
        }
    }
    if let Some(raw) = params.get("parent_task") {
        match raw.parse::<i64>() {
            Ok(id) => filter.parent_task = Some(id),
            Err(_) => errors.add("parent_task", "Must be an integer."),
        }
    }
    if let Some(raw) = params.get("deadline") {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            // Stored deadlines are zero-padded; match against that form.
            Ok(date) => filter.deadline = Some(date.format("%Y-%m-%d").to_string()),
            Err(_) => errors.add("deadline", "Must be a valid date in YYYY-MM-DD format."),
        }
    }
    filter.status = params.get("status").cloned();
    filter.sub_tasks = params.get("sub_tasks").and_then(|v| parse_flag(v));
    filter.has_parent = params.get("has_parent").and_then(|v| parse_flag(v));

    if errors.is_empty() {
        Ok(filter)
    } else {
        Err(ApiError::validation(errors))
    }
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let filter = filter_from_params(&params)?;
    let all = ctx.storage.all_tasks().await?;
    let rows = ctx.storage.list_tasks(&filter).await?;

    let list: Vec<Value> = rows
        .iter()
        .map(|t| task_json(t, &sub_tasks_of(t.id, &all)))
        .collect();
    Ok(Json(json!(list)))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let task = ctx
        .storage
        .get_task(id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    let all = ctx.storage.all_tasks().await?;
    Ok(Json(task_json(&task, &sub_tasks_of(id, &all))))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub name: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub parent_task: Option<i64>,
    #[serde(default)]
    pub assignee: Option<i64>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut required = FieldErrors::new();
    for (field, present) in [
        ("name", body.name.is_some()),
        ("deadline", body.deadline.is_some()),
        ("status", body.status.is_some()),
    ] {
        if !present {
            required.add(field, "This field is required.");
        }
    }
    if !required.is_empty() {
        return Err(ApiError::validation(required));
    }
    let name = body.name.as_deref().unwrap_or_default();
    let deadline_raw = body.deadline.as_deref().unwrap_or_default();
    let status = body.status.as_deref().unwrap_or_default();

    let mut errors = FieldErrors::new();
    let deadline = parse_date("deadline", deadline_raw, &mut errors);

    if let Some(assignee) = body.assignee {
        if ctx.storage.get_employee(assignee).await?.is_none() {
            errors.add("assignee", "Assignee employee does not exist.");
        }
    }

    let mut parent_deadline = None;
    if let Some(parent_id) = body.parent_task {
        match ctx.storage.get_task(parent_id).await? {
            Some(parent) => {
                parent_deadline =
                    NaiveDate::parse_from_str(&parent.deadline, "%Y-%m-%d").ok();
            }
            None => errors.add("parent_task", "Parent task does not exist."),
        }
    }

    errors.merge(validate_task(
        &TaskFields {
            name,
            deadline,
            deadline_is_new: true,
            status,
            parent_deadline,
        },
        Utc::now().date_naive(),
    ));
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }
    // A parse failure always records a field error, so the date exists here.
    let deadline = deadline
        .ok_or_else(|| anyhow::anyhow!("deadline passed validation without parsing"))?;

    let task = ctx
        .storage
        .create_task(
            name,
            // Re-format so the stored text is always zero-padded; the report
            // sorts and the equality filter compare deadlines as strings.
            &deadline.format("%Y-%m-%d").to_string(),
            status,
            body.parent_task,
            body.assignee,
            body.additional_info.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(task_json(&task, &[]))))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_task: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub additional_info: Option<Option<String>>,
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let existing = ctx
        .storage
        .get_task(id)
        .await?
        .ok_or(ApiError::NotFound("task"))?;

    let mut errors = FieldErrors::new();

    let name = body.name.as_deref().unwrap_or(&existing.name);
    let status = body.status.as_deref().unwrap_or(&existing.status);

    let deadline_is_new = body.deadline.is_some();
    let deadline_raw = body.deadline.as_deref().unwrap_or(&existing.deadline);
    let deadline = if deadline_is_new {
        parse_date("deadline", deadline_raw, &mut errors)
    } else {
        NaiveDate::parse_from_str(deadline_raw, "%Y-%m-%d").ok()
    };

    let assignee = match body.assignee {
        None => existing.assignee,
        Some(None) => None,
        Some(Some(employee_id)) => {
            if ctx.storage.get_employee(employee_id).await?.is_none() {
                errors.add("assignee", "Assignee employee does not exist.");
            }
            Some(employee_id)
        }
    };

    let parent_task = match body.parent_task {
        None => existing.parent_task,
        Some(None) => None,
        Some(Some(parent_id)) => {
            match ctx.storage.get_task(parent_id).await? {
                Some(_) => {
                    let all = ctx.storage.all_tasks().await?;
                    if creates_cycle(id, parent_id, &all) {
                        errors.add(
                            "parent_task",
                            "Assigning this parent task would create a cycle.",
                        );
                    }
                }
                None => errors.add("parent_task", "Parent task does not exist."),
            }
            Some(parent_id)
        }
    };

    let mut parent_deadline = None;
    if let Some(parent_id) = parent_task {
        if let Some(parent) = ctx.storage.get_task(parent_id).await? {
            parent_deadline = NaiveDate::parse_from_str(&parent.deadline, "%Y-%m-%d").ok();
        }
    }

    let additional_info = match &body.additional_info {
        Some(value) => value.as_deref().map(str::to_owned),
        None => existing.additional_info.clone(),
    };

    errors.merge(validate_task(
        &TaskFields {
            name,
            deadline,
            deadline_is_new,
            status,
            parent_deadline,
        },
        Utc::now().date_naive(),
    ));
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }
    // Canonical zero-padded form; a stored row that no longer parses keeps
    // its text untouched.
    let stored_deadline = match deadline {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => existing.deadline.clone(),
    };

    let task = ctx
        .storage
        .update_task(
            id,
            name,
            &stored_deadline,
            status,
            parent_task,
            assignee,
            additional_info.as_deref(),
        )
        .await?;
    let all = ctx.storage.all_tasks().await?;
    Ok(Json(task_json(&task, &sub_tasks_of(id, &all))))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if ctx.storage.delete_task(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("task"))
    }
}
