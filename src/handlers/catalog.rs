use crate::errors::ServiceError;
use crate::services::catalog::{IncidentRequest, ResolutionRequest};
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};

/// Router for the incident description catalog
pub fn incidents_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_incidents).post(create_incident))
        .route("/:id", axum::routing::put(update_incident).delete(delete_incident))
}

/// Router for the resolutions catalog
pub fn resolutions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_resolutions).post(create_resolution))
        .route(
            "/:id",
            axum::routing::put(update_resolution).delete(delete_resolution),
        )
}

/// Incident description catalog
#[utoipa::path(
    get,
    path = "/api/v1/incidents",
    responses((status = 200, description = "Incident descriptions")),
    tag = "catalogs"
)]
pub async fn list_incidents(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let incidents = state.services.catalog.list_incidents().await?;
    Ok((StatusCode::OK, Json(incidents)))
}

/// Add an incident description
#[utoipa::path(
    post,
    path = "/api/v1/incidents",
    request_body = IncidentRequest,
    responses(
        (status = 201, description = "Incident description created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "catalogs"
)]
pub async fn create_incident(
    State(state): State<AppState>,
    Json(payload): Json<IncidentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.catalog.create_incident(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edit an incident description
#[utoipa::path(
    put,
    path = "/api/v1/incidents/{id}",
    params(("id" = i32, Path, description = "Incident ID")),
    request_body = IncidentRequest,
    responses(
        (status = 200, description = "Incident description updated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalogs"
)]
pub async fn update_incident(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<IncidentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.catalog.update_incident(id, payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Delete an incident description
#[utoipa::path(
    delete,
    path = "/api/v1/incidents/{id}",
    params(("id" = i32, Path, description = "Incident ID")),
    responses(
        (status = 204, description = "Incident description deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "catalogs"
)]
pub async fn delete_incident(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_incident(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolutions catalog
#[utoipa::path(
    get,
    path = "/api/v1/resolutions",
    responses((status = 200, description = "Resolutions")),
    tag = "catalogs"
)]
pub async fn list_resolutions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let resolutions = state.services.catalog.list_resolutions().await?;
    Ok((StatusCode::OK, Json(resolutions)))
}

/// Add a resolution
#[utoipa::path(
    post,
    path = "/api/v1/resolutions",
    request_body = ResolutionRequest,
    responses(
        (status = 201, description = "Resolution created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "catalogs"
)]
pub async fn create_resolution(
    State(state): State<AppState>,
    Json(payload): Json<ResolutionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.catalog.create_resolution(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edit a resolution
#[utoipa::path(
    put,
    path = "/api/v1/resolutions/{id}",
    params(("id" = i32, Path, description = "Resolution ID")),
    request_body = ResolutionRequest,
    responses(
        (status = 200, description = "Resolution updated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalogs"
)]
pub async fn update_resolution(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ResolutionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.catalog.update_resolution(id, payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Delete a resolution
#[utoipa::path(
    delete,
    path = "/api/v1/resolutions/{id}",
    params(("id" = i32, Path, description = "Resolution ID")),
    responses(
        (status = 204, description = "Resolution deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "catalogs"
)]
pub async fn delete_resolution(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_resolution(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
