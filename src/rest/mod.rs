// rest/mod.rs — Public REST API server.
//
// Axum HTTP server, local-only by default (bind address from config).
//
// Endpoints:
//   GET  /api/v1/health
//   GET  /api/v1/employees            POST /api/v1/employees
//   GET  /api/v1/employees/busy
//   GET|PATCH|PUT|DELETE /api/v1/employees/{id}
//   GET  /api/v1/tasks                POST /api/v1/tasks
//   GET  /api/v1/tasks/important
//   GET|PATCH|PUT|DELETE /api/v1/tasks/{id}

pub mod error;
pub mod routes;

pub use error::ApiError;

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(routes::health::health))
        // Employees
        .route(
            "/api/v1/employees",
            get(routes::employees::list_employees).post(routes::employees::create_employee),
        )
        .route("/api/v1/employees/busy", get(routes::reports::busy_employees))
        .route(
            "/api/v1/employees/{id}",
            get(routes::employees::get_employee)
                .patch(routes::employees::update_employee)
                .put(routes::employees::update_employee)
                .delete(routes::employees::delete_employee),
        )
        // Tasks
        .route(
            "/api/v1/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/api/v1/tasks/important", get(routes::reports::important_tasks))
        .route(
            "/api/v1/tasks/{id}",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
