use crate::errors::ServiceError;
use crate::services::order_validation::UpdateWorkOrderRequest;
use crate::services::work_orders::{
    AttachIncidentsRequest, SetResolutionRequest, UpdateIncidentRecordRequest, WorkOrderFilters,
};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WorkOrderListQuery {
    pub status_id: Option<i32>,
    pub order_type_id: Option<i32>,
    pub asset_id: Option<i32>,
    pub year: Option<i32>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Create the work orders router
pub fn work_orders_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_work_orders).post(register_work_order))
        .route("/statuses", get(list_statuses))
        .route("/types", get(list_types))
        .route("/years", get(list_years))
        .route("/:id", get(get_work_order).put(update_work_order))
        .route(
            "/:id/incidents",
            get(list_incidents).post(attach_incidents),
        )
        .route(
            "/:id/incidents/:record_id",
            put(update_incident_record).delete(detach_incident),
        )
        .route(
            "/:id/incidents/:record_id/resolution",
            put(set_incident_resolution),
        )
}

/// Register a new, unconfirmed work order
#[utoipa::path(
    post,
    path = "/api/v1/work-orders",
    responses(
        (status = 201, description = "Work order registered"),
        (status = 500, description = "Internal error", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn register_work_order(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = state.services.work_orders.register_work_order(None).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// List work orders with optional filtering
#[utoipa::path(
    get,
    path = "/api/v1/work-orders",
    params(WorkOrderListQuery),
    responses(
        (status = 200, description = "List work orders"),
    ),
    tag = "work-orders"
)]
pub async fn list_work_orders(
    State(state): State<AppState>,
    Query(query): Query<WorkOrderListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let filters = WorkOrderFilters {
        status_id: query.status_id,
        order_type_id: query.order_type_id,
        asset_id: query.asset_id,
        year: query.year,
    };
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let response = state
        .services
        .work_orders
        .list_work_orders(&filters, page, limit)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// Get a specific work order by ID
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}",
    params(("id" = i32, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Work order details", body = crate::services::work_orders::WorkOrderResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn get_work_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let work_order = state.services.work_orders.get_work_order(id).await?;
    Ok((StatusCode::OK, Json(work_order)))
}

/// Update a work order after validating the transition
#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}",
    params(("id" = i32, Path, description = "Work order ID")),
    request_body = UpdateWorkOrderRequest,
    responses(
        (status = 200, description = "Work order updated", body = crate::services::work_orders::WorkOrderResponse),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn update_work_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateWorkOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if id != payload.id {
        return Err(ServiceError::BadRequest(
            "The work order identifier does not match the request body.".to_string(),
        ));
    }

    let updated = state.services.work_orders.update_work_order(payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// List the incident records of a work order
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/incidents",
    params(("id" = i32, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Incident records"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn list_incidents(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let incidents = state.services.work_orders.list_incidents(id).await?;
    Ok((StatusCode::OK, Json(incidents)))
}

/// Attach incident records to a work order
#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/incidents",
    params(("id" = i32, Path, description = "Work order ID")),
    request_body = AttachIncidentsRequest,
    responses(
        (status = 201, description = "Incident records attached"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn attach_incidents(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AttachIncidentsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state
        .services
        .work_orders
        .attach_incidents(id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edit one incident record of a work order
#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}/incidents/{record_id}",
    params(
        ("id" = i32, Path, description = "Work order ID"),
        ("record_id" = i32, Path, description = "Incident record ID")
    ),
    request_body = UpdateIncidentRecordRequest,
    responses(
        (status = 200, description = "Incident record updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn update_incident_record(
    State(state): State<AppState>,
    Path((id, record_id)): Path<(i32, i32)>,
    Json(payload): Json<UpdateIncidentRecordRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .services
        .work_orders
        .update_incident_record(id, record_id, payload)
        .await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Set or clear the resolution of an incident record
#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}/incidents/{record_id}/resolution",
    params(
        ("id" = i32, Path, description = "Work order ID"),
        ("record_id" = i32, Path, description = "Incident record ID")
    ),
    request_body = SetResolutionRequest,
    responses(
        (status = 200, description = "Resolution updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn set_incident_resolution(
    State(state): State<AppState>,
    Path((id, record_id)): Path<(i32, i32)>,
    Json(payload): Json<SetResolutionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .services
        .work_orders
        .set_incident_resolution(id, record_id, payload)
        .await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Detach an incident record from a work order
#[utoipa::path(
    delete,
    path = "/api/v1/work-orders/{id}/incidents/{record_id}",
    params(
        ("id" = i32, Path, description = "Work order ID"),
        ("record_id" = i32, Path, description = "Incident record ID")
    ),
    responses(
        (status = 204, description = "Incident record detached"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn detach_incident(
    State(state): State<AppState>,
    Path((id, record_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .work_orders
        .detach_incident(id, record_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Order status catalog sorted by rank
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/statuses",
    responses((status = 200, description = "Order statuses")),
    tag = "work-orders"
)]
pub async fn list_statuses(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let statuses = state.services.catalog.list_order_statuses().await?;
    Ok((StatusCode::OK, Json(statuses)))
}

/// Order type catalog
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/types",
    responses((status = 200, description = "Order types")),
    tag = "work-orders"
)]
pub async fn list_types(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let types = state.services.catalog.list_order_types().await?;
    Ok((StatusCode::OK, Json(types)))
}

/// Years with at least one opened work order
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/years",
    responses((status = 200, description = "Years with orders")),
    tag = "work-orders"
)]
pub async fn list_years(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let years = state.services.work_orders.list_years().await?;
    Ok((StatusCode::OK, Json(years)))
}
