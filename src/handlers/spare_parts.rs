use crate::errors::ServiceError;
use crate::services::spare_parts::SparePartRequest;
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SparePartListQuery {
    #[serde(default)]
    pub only_active: bool,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Create the spare parts router
pub fn spare_parts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_spare_parts).post(create_spare_part))
        .route(
            "/:id",
            get(get_spare_part)
                .put(update_spare_part)
                .delete(delete_spare_part),
        )
}

/// List spare parts
#[utoipa::path(
    get,
    path = "/api/v1/spare-parts",
    params(SparePartListQuery),
    responses((status = 200, description = "List spare parts")),
    tag = "spare-parts"
)]
pub async fn list_spare_parts(
    State(state): State<AppState>,
    Query(query): Query<SparePartListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let response = state
        .services
        .spare_parts
        .list_spare_parts(query.only_active, page, limit)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// Create a spare part
#[utoipa::path(
    post,
    path = "/api/v1/spare-parts",
    request_body = SparePartRequest,
    responses(
        (status = 201, description = "Spare part created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate code", body = crate::errors::ErrorResponse)
    ),
    tag = "spare-parts"
)]
pub async fn create_spare_part(
    State(state): State<AppState>,
    Json(payload): Json<SparePartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.spare_parts.create_spare_part(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a spare part by ID
#[utoipa::path(
    get,
    path = "/api/v1/spare-parts/{id}",
    params(("id" = i32, Path, description = "Spare part ID")),
    responses(
        (status = 200, description = "Spare part details"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "spare-parts"
)]
pub async fn get_spare_part(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let spare_part = state.services.spare_parts.get_spare_part(id).await?;
    Ok((StatusCode::OK, Json(spare_part)))
}

/// Update a spare part
#[utoipa::path(
    put,
    path = "/api/v1/spare-parts/{id}",
    params(("id" = i32, Path, description = "Spare part ID")),
    request_body = SparePartRequest,
    responses(
        (status = 200, description = "Spare part updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "spare-parts"
)]
pub async fn update_spare_part(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<SparePartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .services
        .spare_parts
        .update_spare_part(id, payload)
        .await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Delete a spare part
#[utoipa::path(
    delete,
    path = "/api/v1/spare-parts/{id}",
    params(("id" = i32, Path, description = "Spare part ID")),
    responses(
        (status = 204, description = "Spare part deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "spare-parts"
)]
pub async fn delete_spare_part(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.spare_parts.delete_spare_part(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
