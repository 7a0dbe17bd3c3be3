use crate::errors::ServiceError;
use crate::services::kpis::KpiQuery;
use crate::AppState;
use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KpiQueryParams {
    /// Year filter; combined with `month` it selects the weekly view
    pub year: Option<i32>,
    /// Month filter (1-12)
    pub month: Option<u32>,
    /// Restrict to a single asset
    pub asset_id: Option<i32>,
}

impl KpiQueryParams {
    fn into_query(self) -> Result<KpiQuery, ServiceError> {
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(ServiceError::InvalidInput(format!(
                    "month must be between 1 and 12, got {}",
                    month
                )));
            }
            if self.year.is_none() {
                return Err(ServiceError::InvalidInput(
                    "month requires a year".to_string(),
                ));
            }
        }
        Ok(KpiQuery {
            year: self.year,
            month: self.month,
            asset_id: self.asset_id,
        })
    }
}

/// Create the KPIs router
pub fn kpis_router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(order_kpis))
        .route("/reliability", get(reliability_kpis))
}

/// Order volume and completion indicators
#[utoipa::path(
    get,
    path = "/api/v1/kpis/orders",
    params(KpiQueryParams),
    responses(
        (status = 200, description = "Order KPIs", body = crate::services::kpis::OrderKpisResponse),
        (status = 400, description = "Invalid window", body = crate::errors::ErrorResponse)
    ),
    tag = "kpis"
)]
pub async fn order_kpis(
    State(state): State<AppState>,
    Query(params): Query<KpiQueryParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let query = params.into_query()?;
    let response = state.services.kpis.order_kpis(query).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Reliability indicators over closed orders
#[utoipa::path(
    get,
    path = "/api/v1/kpis/reliability",
    params(KpiQueryParams),
    responses(
        (status = 200, description = "Reliability KPIs", body = crate::services::kpis::ReliabilityKpisResponse),
        (status = 400, description = "Invalid window", body = crate::errors::ErrorResponse)
    ),
    tag = "kpis"
)]
pub async fn reliability_kpis(
    State(state): State<AppState>,
    Query(params): Query<KpiQueryParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let query = params.into_query()?;
    let response = state.services.kpis.reliability_kpis(query).await?;
    Ok((StatusCode::OK, Json(response)))
}
