use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CMMS API",
        version = "1.0.0",
        description = r#"
# Maintenance Management API

Backend for plant maintenance: assets and their components, corrective work
orders with incident tracking, spare parts, and reliability reporting.

## Work order lifecycle

A work order is registered empty, incidents get attached while it is filled
in, and the first complete update confirms it. From then on every update is
validated against the transition rules: date consistency with the attached
incidents, closing requirements, the materials text rules, and the
cancelled-order restrictions.

## Error handling

Errors use a consistent JSON shape with appropriate HTTP status codes:

```json
{
  "error": "Bad Request",
  "message": "The closing date must be specified to close the order.",
  "timestamp": "2025-06-01T00:00:00Z"
}
```
"#,
        license(name = "MIT")
    ),
    paths(
        crate::handlers::work_orders::register_work_order,
        crate::handlers::work_orders::list_work_orders,
        crate::handlers::work_orders::get_work_order,
        crate::handlers::work_orders::update_work_order,
        crate::handlers::work_orders::list_incidents,
        crate::handlers::work_orders::attach_incidents,
        crate::handlers::work_orders::update_incident_record,
        crate::handlers::work_orders::set_incident_resolution,
        crate::handlers::work_orders::detach_incident,
        crate::handlers::work_orders::list_statuses,
        crate::handlers::work_orders::list_types,
        crate::handlers::work_orders::list_years,
        crate::handlers::assets::list_assets,
        crate::handlers::assets::create_asset,
        crate::handlers::assets::get_asset,
        crate::handlers::assets::update_asset,
        crate::handlers::assets::delete_asset,
        crate::handlers::assets::list_components,
        crate::handlers::assets::create_component,
        crate::handlers::assets::update_component,
        crate::handlers::assets::delete_component,
        crate::handlers::catalog::list_incidents,
        crate::handlers::catalog::create_incident,
        crate::handlers::catalog::update_incident,
        crate::handlers::catalog::delete_incident,
        crate::handlers::catalog::list_resolutions,
        crate::handlers::catalog::create_resolution,
        crate::handlers::catalog::update_resolution,
        crate::handlers::catalog::delete_resolution,
        crate::handlers::spare_parts::list_spare_parts,
        crate::handlers::spare_parts::create_spare_part,
        crate::handlers::spare_parts::get_spare_part,
        crate::handlers::spare_parts::update_spare_part,
        crate::handlers::spare_parts::delete_spare_part,
        crate::handlers::kpis::order_kpis,
        crate::handlers::kpis::reliability_kpis,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::services::order_validation::UpdateWorkOrderRequest,
        crate::services::work_orders::WorkOrderResponse,
        crate::services::work_orders::WorkOrderListResponse,
        crate::services::work_orders::AttachIncidentsRequest,
        crate::services::work_orders::UpdateIncidentRecordRequest,
        crate::services::work_orders::SetResolutionRequest,
        crate::services::assets::CreateAssetRequest,
        crate::services::assets::UpdateAssetRequest,
        crate::services::assets::ComponentRequest,
        crate::services::spare_parts::SparePartRequest,
        crate::services::kpis::OrderKpisResponse,
        crate::services::kpis::ReliabilityKpisResponse,
        crate::services::kpis::OrderIndicators,
        crate::services::kpis::PeriodPoint,
        crate::services::kpis::AssetOrderIndicators,
        crate::services::kpis::ReliabilityPeriodPoint,
        crate::services::kpis::ReliabilityIndicators,
        crate::services::kpis::AssetReliability,
    )),
    tags(
        (name = "work-orders", description = "Work order registration, validated updates and incident records"),
        (name = "assets", description = "Assets and their component hierarchy"),
        (name = "catalogs", description = "Incident description and resolution catalogs"),
        (name = "spare-parts", description = "Spare parts warehouse"),
        (name = "kpis", description = "Order volume and reliability indicators")
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /swagger-ui backed by the generated document
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
