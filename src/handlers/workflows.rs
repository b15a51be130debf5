// src/handlers/workflows.rs

use axum::{extract::Path, Json};

use crate::{common::error::AppError, models::workflow::WorkflowDefinition, services::workflow_catalog};

#[utoipa::path(
    get,
    path = "/api/workflows",
    tag = "Workflows",
    responses(
        (status = 200, description = "Compiled-in workflow definitions", body = [WorkflowDefinition])
    )
)]
pub async fn list_workflows() -> Json<&'static [WorkflowDefinition]> {
    Json(workflow_catalog::all())
}

#[utoipa::path(
    get,
    path = "/api/workflows/{type}",
    tag = "Workflows",
    params(("type" = String, Path, description = "Request type, e.g. CAR_BOOKING")),
    responses(
        (status = 200, description = "Workflow for the type", body = WorkflowDefinition),
        (status = 404, description = "No workflow for that type")
    )
)]
pub async fn get_workflow(Path(name): Path<String>) -> Result<Json<&'static WorkflowDefinition>, AppError> {
    workflow_catalog::workflow_by_name(&name)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No workflow for request type {name}")))
}

pub async fn health() -> &'static str {
    "OK"
}
