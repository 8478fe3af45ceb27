// rest/routes/employees.rs — Employee CRUD routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::rest::routes::double_option;
use crate::rest::ApiError;
use crate::storage::{EmployeeRow, TaskRow};
use crate::tracker::validate::{validate_employee, FieldErrors};
use crate::tracker::workload::active_task_counts;
use crate::AppContext;

pub fn employee_json(employee: &EmployeeRow, active_task_count: usize) -> Value {
    json!({
        "id": employee.id,
        "full_name": employee.full_name,
        "position": employee.position,
        "additional_info": employee.additional_info,
        "active_task_count": active_task_count,
        "created_at": employee.created_at,
        "updated_at": employee.updated_at,
    })
}

fn active_count_for(employee_id: i64, employees: &[EmployeeRow], tasks: &[TaskRow]) -> usize {
    active_task_counts(employees, tasks)
        .get(&employee_id)
        .copied()
        .unwrap_or(0)
}

pub async fn list_employees(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, ApiError> {
    let employees = ctx.storage.list_employees().await?;
    let tasks = ctx.storage.all_tasks().await?;
    let counts = active_task_counts(&employees, &tasks);

    let list: Vec<Value> = employees
        .iter()
        .map(|e| employee_json(e, counts.get(&e.id).copied().unwrap_or(0)))
        .collect();
    Ok(Json(json!(list)))
}

pub async fn get_employee(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let employee = ctx
        .storage
        .get_employee(id)
        .await?
        .ok_or(ApiError::NotFound("employee"))?;
    let employees = ctx.storage.list_employees().await?;
    let tasks = ctx.storage.all_tasks().await?;
    let count = active_count_for(id, &employees, &tasks);
    Ok(Json(employee_json(&employee, count)))
}

#[derive(Deserialize)]
pub struct CreateEmployeeRequest {
    pub full_name: Option<String>,
    pub position: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

pub async fn create_employee(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut required = FieldErrors::new();
    if body.full_name.is_none() {
        required.add("full_name", "This field is required.");
    }
    if body.position.is_none() {
        required.add("position", "This field is required.");
    }
    if !required.is_empty() {
        return Err(ApiError::validation(required));
    }
    let full_name = body.full_name.as_deref().unwrap_or_default();
    let position = body.position.as_deref().unwrap_or_default();

    let errors = validate_employee(full_name, position);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let employee = ctx
        .storage
        .create_employee(full_name, position, body.additional_info.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(employee_json(&employee, 0))))
}

#[derive(Deserialize)]
pub struct UpdateEmployeeRequest {
    pub full_name: Option<String>,
    pub position: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub additional_info: Option<Option<String>>,
}

pub async fn update_employee(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateEmployeeRequest>,
) -> Result<Json<Value>, ApiError> {
    let existing = ctx
        .storage
        .get_employee(id)
        .await?
        .ok_or(ApiError::NotFound("employee"))?;

    let full_name = body.full_name.as_deref().unwrap_or(&existing.full_name);
    let position = body.position.as_deref().unwrap_or(&existing.position);
    let additional_info = match &body.additional_info {
        Some(value) => value.as_deref(),
        None => existing.additional_info.as_deref(),
    };

    let errors = validate_employee(full_name, position);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let employee = ctx
        .storage
        .update_employee(id, full_name, position, additional_info)
        .await?;
    let employees = ctx.storage.list_employees().await?;
    let tasks = ctx.storage.all_tasks().await?;
    let count = active_count_for(id, &employees, &tasks);
    Ok(Json(employee_json(&employee, count)))
}

pub async fn delete_employee(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if ctx.storage.delete_employee(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("employee"))
    }
}
