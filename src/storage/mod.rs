// storage/mod.rs — SQLite entity store for employees and tasks.
//
// WAL-mode SQLite via sqlx. Referential actions are explicit: deleting an
// employee clears `tasks.assignee`, deleting a task clears its children's
// `parent_task` — both in the same transaction as the delete, so no
// foreign-key violation can occur and no record is ever cascade-deleted.

use anyhow::{anyhow, Context as _, Result};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::{collections::BTreeSet, path::Path, str::FromStr};

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the daemon indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

// ─── Row types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct EmployeeRow {
    pub id: i64,
    pub full_name: String,
    pub position: String,
    pub additional_info: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub name: String,
    pub parent_task: Option<i64>,
    pub assignee: Option<i64>,
    /// ISO date (`%Y-%m-%d`); lexicographic order is date order.
    pub deadline: String,
    pub status: String,
    pub additional_info: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ─── Query params ─────────────────────────────────────────────────────────────

/// Allow-listed task list filters. `sub_tasks` / `has_parent` filter by the
/// presence of children / a parent reference.
#[derive(Debug, Default, Deserialize)]
pub struct TaskFilter {
    pub assignee: Option<i64>,
    pub status: Option<String>,
    pub parent_task: Option<i64>,
    pub deadline: Option<String>,
    pub sub_tasks: Option<bool>,
    pub has_parent: Option<bool>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

// ─── Storage ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("trackd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        let stmts = [
            "CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                position TEXT NOT NULL,
                additional_info TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                parent_task INTEGER REFERENCES tasks(id),
                assignee INTEGER REFERENCES employees(id),
                deadline TEXT NOT NULL,
                status TEXT NOT NULL,
                additional_info TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_task)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
        ];
        for stmt in stmts {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .context("Creating tracker tables")?;
        }
        Ok(())
    }

    // ─── Employees ────────────────────────────────────────────────────────────

    pub async fn list_employees(&self) -> Result<Vec<EmployeeRow>> {
        let pool = self.pool.clone();
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM employees ORDER BY id")
                .fetch_all(&pool)
                .await?)
        })
        .await
    }

    pub async fn get_employee(&self, id: i64) -> Result<Option<EmployeeRow>> {
        Ok(sqlx::query_as("SELECT * FROM employees WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn create_employee(
        &self,
        full_name: &str,
        position: &str,
        additional_info: Option<&str>,
    ) -> Result<EmployeeRow> {
        let now = now_rfc3339();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO employees (full_name, position, additional_info, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(full_name)
        .bind(position)
        .bind(additional_info)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        self.get_employee(id)
            .await?
            .ok_or_else(|| anyhow!("employee not found after insert"))
    }

    /// Full-row update with merged values; `created_at` is never touched.
    pub async fn update_employee(
        &self,
        id: i64,
        full_name: &str,
        position: &str,
        additional_info: Option<&str>,
    ) -> Result<EmployeeRow> {
        sqlx::query(
            "UPDATE employees
             SET full_name = ?, position = ?, additional_info = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(full_name)
        .bind(position)
        .bind(additional_info)
        .bind(now_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_employee(id)
            .await?
            .ok_or_else(|| anyhow!("employee not found after update"))
    }

    /// Delete an employee. Their tasks survive with `assignee` cleared.
    /// Returns false when the id does not exist.
    pub async fn delete_employee(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE tasks SET assignee = NULL, updated_at = ? WHERE assignee = ?")
            .bind(now_rfc3339())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }

    // ─── Tasks ────────────────────────────────────────────────────────────────

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRow>> {
        let pool = self.pool.clone();
        let mut rows: Vec<TaskRow> = with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM tasks ORDER BY id")
                .fetch_all(&pool)
                .await?)
        })
        .await?;

        // `sub_tasks` needs the unfiltered parent set, so compute it first.
        let parents_with_children: BTreeSet<i64> =
            rows.iter().filter_map(|t| t.parent_task).collect();

        if let Some(assignee) = filter.assignee {
            rows.retain(|t| t.assignee == Some(assignee));
        }
        if let Some(ref status) = filter.status {
            rows.retain(|t| &t.status == status);
        }
        if let Some(parent) = filter.parent_task {
            rows.retain(|t| t.parent_task == Some(parent));
        }
        if let Some(ref deadline) = filter.deadline {
            rows.retain(|t| &t.deadline == deadline);
        }
        if let Some(wants_children) = filter.sub_tasks {
            rows.retain(|t| parents_with_children.contains(&t.id) == wants_children);
        }
        if let Some(wants_parent) = filter.has_parent {
            rows.retain(|t| t.parent_task.is_some() == wants_parent);
        }

        Ok(rows)
    }

    /// Every task, id-ascending. Snapshot input for the workload functions.
    pub async fn all_tasks(&self) -> Result<Vec<TaskRow>> {
        self.list_tasks(&TaskFilter::default()).await
    }

    pub async fn get_task(&self, id: i64) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_task(
        &self,
        name: &str,
        deadline: &str,
        status: &str,
        parent_task: Option<i64>,
        assignee: Option<i64>,
        additional_info: Option<&str>,
    ) -> Result<TaskRow> {
        let now = now_rfc3339();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO tasks
             (name, parent_task, assignee, deadline, status, additional_info, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(name)
        .bind(parent_task)
        .bind(assignee)
        .bind(deadline)
        .bind(status)
        .bind(additional_info)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        self.get_task(id)
            .await?
            .ok_or_else(|| anyhow!("task not found after insert"))
    }

    /// Full-row update with merged values; `created_at` is never touched.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_task(
        &self,
        id: i64,
        name: &str,
        deadline: &str,
        status: &str,
        parent_task: Option<i64>,
        assignee: Option<i64>,
        additional_info: Option<&str>,
    ) -> Result<TaskRow> {
        sqlx::query(
            "UPDATE tasks
             SET name = ?, parent_task = ?, assignee = ?, deadline = ?, status = ?,
                 additional_info = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(parent_task)
        .bind(assignee)
        .bind(deadline)
        .bind(status)
        .bind(additional_info)
        .bind(now_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_task(id)
            .await?
            .ok_or_else(|| anyhow!("task not found after update"))
    }

    /// Delete a task. Its subtasks survive with `parent_task` cleared.
    /// Returns false when the id does not exist.
    pub async fn delete_task(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE tasks SET parent_task = NULL, updated_at = ? WHERE parent_task = ?")
            .bind(now_rfc3339())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }
}

// ─── Test fixtures ────────────────────────────────────────────────────────────

#[cfg(test)]
pub fn test_employee(id: i64, full_name: &str) -> EmployeeRow {
    EmployeeRow {
        id,
        full_name: full_name.to_string(),
        position: "Developer".to_string(),
        additional_info: None,
        created_at: "2026-01-01T00:00:00+00:00".to_string(),
        updated_at: "2026-01-01T00:00:00+00:00".to_string(),
    }
}

#[cfg(test)]
pub fn test_task(
    id: i64,
    parent_task: Option<i64>,
    assignee: Option<i64>,
    deadline: &str,
    status: &str,
) -> TaskRow {
    TaskRow {
        id,
        name: format!("Task {id}"),
        parent_task,
        assignee,
        deadline: deadline.to_string(),
        status: status.to_string(),
        additional_info: None,
        created_at: "2026-01-01T00:00:00+00:00".to_string(),
        updated_at: "2026-01-01T00:00:00+00:00".to_string(),
    }
}
