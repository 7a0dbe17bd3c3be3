use crate::errors::ServiceError;
use crate::services::assets::{ComponentRequest, CreateAssetRequest, UpdateAssetRequest};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssetListQuery {
    /// Restrict the listing to active assets
    #[serde(default)]
    pub only_active: bool,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Create the assets router
pub fn assets_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assets).post(create_asset))
        .route("/:id", get(get_asset).put(update_asset).delete(delete_asset))
        .route("/:id/components", get(list_components).post(create_component))
        .route(
            "/:id/components/:component_id",
            put(update_component).delete(delete_component),
        )
}

/// List assets
#[utoipa::path(
    get,
    path = "/api/v1/assets",
    params(AssetListQuery),
    responses((status = 200, description = "List assets")),
    tag = "assets"
)]
pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let response = state
        .services
        .assets
        .list_assets(query.only_active, page, limit)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// Create a new asset
#[utoipa::path(
    post,
    path = "/api/v1/assets",
    request_body = CreateAssetRequest,
    responses(
        (status = 201, description = "Asset created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate code", body = crate::errors::ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn create_asset(
    State(state): State<AppState>,
    Json(payload): Json<CreateAssetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.assets.create_asset(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get an asset by ID
#[utoipa::path(
    get,
    path = "/api/v1/assets/{id}",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset details"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let asset = state.services.assets.get_asset(id).await?;
    Ok((StatusCode::OK, Json(asset)))
}

/// Update an asset
#[utoipa::path(
    put,
    path = "/api/v1/assets/{id}",
    params(("id" = i32, Path, description = "Asset ID")),
    request_body = UpdateAssetRequest,
    responses(
        (status = 200, description = "Asset updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn update_asset(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAssetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.assets.update_asset(id, payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Delete an asset with no work order history
#[utoipa::path(
    delete,
    path = "/api/v1/assets/{id}",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.assets.delete_asset(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the components of an asset
#[utoipa::path(
    get,
    path = "/api/v1/assets/{id}/components",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Component list"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn list_components(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let components = state.services.assets.list_components(id).await?;
    Ok((StatusCode::OK, Json(components)))
}

/// Add a component to an asset
#[utoipa::path(
    post,
    path = "/api/v1/assets/{id}/components",
    params(("id" = i32, Path, description = "Asset ID")),
    request_body = ComponentRequest,
    responses(
        (status = 201, description = "Component created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn create_component(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ComponentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.assets.create_component(id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edit a component of an asset
#[utoipa::path(
    put,
    path = "/api/v1/assets/{id}/components/{component_id}",
    params(
        ("id" = i32, Path, description = "Asset ID"),
        ("component_id" = i32, Path, description = "Component ID")
    ),
    request_body = ComponentRequest,
    responses(
        (status = 200, description = "Component updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn update_component(
    State(state): State<AppState>,
    Path((id, component_id)): Path<(i32, i32)>,
    Json(payload): Json<ComponentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .services
        .assets
        .update_component(id, component_id, payload)
        .await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Remove a component from an asset
#[utoipa::path(
    delete,
    path = "/api/v1/assets/{id}/components/{component_id}",
    params(
        ("id" = i32, Path, description = "Asset ID"),
        ("component_id" = i32, Path, description = "Component ID")
    ),
    responses(
        (status = 204, description = "Component deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn delete_component(
    State(state): State<AppState>,
    Path((id, component_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .assets
        .delete_component(id, component_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
