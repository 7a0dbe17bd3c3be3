use crate::{
    db::DbPool,
    entities::{order_status, work_order, work_order_incident},
    errors::ServiceError,
    events::{Event, EventSender},
    models::status::StatusKind,
    services::order_validation::{OrderTransitionValidator, UpdateWorkOrderRequest},
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::order_validation;

/// Name of the status every freshly registered order starts in.
const INITIAL_STATUS_NAME: &str = "Abierta";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderResponse {
    pub id: i32,
    pub external_ref: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub resolution_comment: Option<String>,
    pub materials: Option<String>,
    pub downtime_hours: Option<f64>,
    pub confirmed: bool,
    pub asset_id: Option<i32>,
    pub status_id: Option<i32>,
    pub order_type_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderListResponse {
    pub work_orders: Vec<WorkOrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WorkOrderFilters {
    pub status_id: Option<i32>,
    pub order_type_id: Option<i32>,
    pub asset_id: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachIncidentsRequest {
    pub component_id: i32,
    pub incident_ids: Vec<i32>,
    pub detected_at: String,
    #[serde(default)]
    pub machine_stopped: bool,
    #[serde(default)]
    pub part_replaced: bool,
    #[serde(default)]
    pub affects_production: bool,
    pub downtime_hours: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateIncidentRecordRequest {
    pub incident_id: i32,
    pub component_id: i32,
    pub detected_at: String,
    #[serde(default)]
    pub machine_stopped: bool,
    #[serde(default)]
    pub part_replaced: bool,
    #[serde(default)]
    pub affects_production: bool,
    pub downtime_hours: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetResolutionRequest {
    pub resolution_id: Option<i32>,
    pub detected_at: String,
    pub resolved_at: Option<String>,
    pub downtime_hours: Option<f64>,
}

/// Merges a validated update into the persisted order.
///
/// This is the single place the write-once invariants live: once the opening
/// date, asset, status or type of an order hold a value they may change but
/// never go back to unset. The function also flips `confirmed` on the first
/// update that names an asset, which completes the initial registration.
pub fn apply_update(
    order: &work_order::Model,
    request: &UpdateWorkOrderRequest,
    opened_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
) -> Result<work_order::ActiveModel, ServiceError> {
    if order.opened_at.is_some() && opened_at.is_none() {
        return Err(ServiceError::InvalidOperation(
            "The opening date of the order cannot be cleared once set.".to_string(),
        ));
    }
    if order.asset_id.is_some() && request.asset_id == 0 {
        return Err(ServiceError::InvalidOperation(
            "The asset of the order cannot be cleared once set.".to_string(),
        ));
    }

    let mut active: work_order::ActiveModel = order.clone().into();

    if !order.confirmed {
        if request.asset_id == 0 {
            return Err(ServiceError::ValidationError(
                "The asset for which the order is created must be specified.".to_string(),
            ));
        }
        active.confirmed = Set(true);
    }

    active.external_ref = Set(request.external_ref.clone());
    active.opened_at = Set(opened_at);
    active.closed_at = Set(closed_at);
    active.comment = Set(request.comment.clone());
    active.resolution_comment = Set(request.resolution_comment.clone());
    active.materials = Set(request.materials.clone());
    active.asset_id = Set(Some(request.asset_id));
    active.status_id = Set(Some(request.status_id));
    active.order_type_id = Set(Some(request.order_type_id));

    Ok(active)
}

/// Service for managing work orders and their incident records
#[derive(Clone)]
pub struct WorkOrderService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    validator: OrderTransitionValidator,
}

impl WorkOrderService {
    /// Creates a new work order service instance
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        let validator = OrderTransitionValidator::new(db.clone());
        Self {
            db,
            event_sender,
            validator,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send domain event");
            }
        }
    }

    /// Registers a new, unconfirmed work order in the initial status.
    /// Incidents get attached while the order is filled in; the first full
    /// update confirms it.
    #[instrument(skip(self))]
    pub async fn register_work_order(
        &self,
        created_by: Option<String>,
    ) -> Result<i32, ServiceError> {
        let db = &*self.db;

        let initial_status = order_status::Entity::find()
            .filter(order_status::Column::Name.eq(INITIAL_STATUS_NAME))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Initial order status '{}' is missing from the catalog",
                    INITIAL_STATUS_NAME
                ))
            })?;

        let active = work_order::ActiveModel {
            status_id: Set(Some(initial_status.id)),
            confirmed: Set(false),
            created_by: Set(created_by),
            ..Default::default()
        };

        let created = active.insert(db).await.map_err(ServiceError::DatabaseError)?;

        info!(work_order_id = created.id, "Work order registered");
        self.emit(Event::WorkOrderRegistered(created.id)).await;

        Ok(created.id)
    }

    /// Retrieves a work order by ID
    #[instrument(skip(self), fields(work_order_id = work_order_id))]
    pub async fn get_work_order(
        &self,
        work_order_id: i32,
    ) -> Result<WorkOrderResponse, ServiceError> {
        let db = &*self.db;

        let order = work_order::Entity::find_by_id(work_order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Work order with ID {} not found", work_order_id))
            })?;

        Ok(model_to_response(order))
    }

    /// Lists work orders with optional filters and pagination
    #[instrument(skip(self))]
    pub async fn list_work_orders(
        &self,
        filters: &WorkOrderFilters,
        page: u64,
        per_page: u64,
    ) -> Result<WorkOrderListResponse, ServiceError> {
        let db = &*self.db;

        let mut condition = Condition::all();
        if let Some(status_id) = filters.status_id {
            condition = condition.add(work_order::Column::StatusId.eq(status_id));
        }
        if let Some(order_type_id) = filters.order_type_id {
            condition = condition.add(work_order::Column::OrderTypeId.eq(order_type_id));
        }
        if let Some(asset_id) = filters.asset_id {
            condition = condition.add(work_order::Column::AssetId.eq(asset_id));
        }
        if let Some(year) = filters.year {
            let start = chrono::NaiveDate::from_ymd_opt(year, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc());
            let end = chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc());
            if let (Some(start), Some(end)) = (start, end) {
                condition = condition
                    .add(work_order::Column::OpenedAt.gte(start))
                    .add(work_order::Column::OpenedAt.lt(end));
            }
        }

        let paginator = work_order::Entity::find()
            .filter(condition)
            .order_by_desc(work_order::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(WorkOrderListResponse {
            work_orders: orders.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Applies a validated update to a work order and persists it.
    ///
    /// Validation (rule set, referenced entity existence) happens first; the
    /// merge enforces the write-once invariants; only then is the row
    /// updated and the corresponding events emitted.
    #[instrument(skip(self, request), fields(work_order_id = request.id))]
    pub async fn update_work_order(
        &self,
        request: UpdateWorkOrderRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        let db = &*self.db;

        let order = self.validator.validate_update(&request).await?;

        let was_confirmed = order.confirmed;
        let old_status_id = order.status_id;

        let opened_at = order_validation::parse_optional_date_field(
            "opened_at",
            request.opened_at.as_deref(),
        )?;
        let closed_at = order_validation::parse_optional_date_field(
            "closed_at",
            request.closed_at.as_deref(),
        )?;

        let active = apply_update(&order, &request, opened_at, closed_at)?;
        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;

        info!(work_order_id = updated.id, "Work order updated");
        self.emit(Event::WorkOrderUpdated(updated.id)).await;

        if !was_confirmed && updated.confirmed {
            self.emit(Event::WorkOrderConfirmed(updated.id)).await;
        }

        if old_status_id != updated.status_id {
            let old_status = self.status_name(old_status_id).await?;
            let new_status = self.status_name(updated.status_id).await?;
            self.emit(Event::WorkOrderStatusChanged {
                work_order_id: updated.id,
                old_status: old_status.clone().unwrap_or_default(),
                new_status: new_status.clone().unwrap_or_default(),
            })
            .await;

            let entered_closed = new_status
                .as_deref()
                .map(StatusKind::from_name)
                .is_some_and(StatusKind::is_closed_family);
            if entered_closed {
                if let Some(closed_at) = updated.closed_at {
                    self.emit(Event::WorkOrderClosed {
                        work_order_id: updated.id,
                        closed_at,
                    })
                    .await;
                }
            }
        }

        Ok(model_to_response(updated))
    }

    async fn status_name(&self, status_id: Option<i32>) -> Result<Option<String>, ServiceError> {
        let db = &*self.db;
        match status_id {
            Some(id) => Ok(order_status::Entity::find_by_id(id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .map(|s| s.name)),
            None => Ok(None),
        }
    }

    async fn require_order(&self, work_order_id: i32) -> Result<work_order::Model, ServiceError> {
        let db = &*self.db;
        work_order::Entity::find_by_id(work_order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Work order with ID {} not found", work_order_id))
            })
    }

    /// Lists the incident records of an order, oldest detection first
    #[instrument(skip(self), fields(work_order_id = work_order_id))]
    pub async fn list_incidents(
        &self,
        work_order_id: i32,
    ) -> Result<Vec<work_order_incident::Model>, ServiceError> {
        let db = &*self.db;
        self.require_order(work_order_id).await?;

        work_order_incident::Entity::find()
            .filter(work_order_incident::Column::WorkOrderId.eq(work_order_id))
            .order_by_asc(work_order_incident::Column::DetectedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Attaches one record per selected incident to the order
    #[instrument(skip(self, request), fields(work_order_id = work_order_id))]
    pub async fn attach_incidents(
        &self,
        work_order_id: i32,
        request: AttachIncidentsRequest,
    ) -> Result<Vec<work_order_incident::Model>, ServiceError> {
        let db = &*self.db;

        if request.incident_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one incident must be selected.".to_string(),
            ));
        }
        if request.component_id == 0 {
            return Err(ServiceError::ValidationError(
                "A component must be selected.".to_string(),
            ));
        }

        self.require_order(work_order_id).await?;

        let detected_at =
            order_validation::parse_date_field("detected_at", &request.detected_at)?;

        let mut created = Vec::with_capacity(request.incident_ids.len());
        for incident_id in &request.incident_ids {
            let active = work_order_incident::ActiveModel {
                work_order_id: Set(work_order_id),
                incident_id: Set(*incident_id),
                component_id: Set(request.component_id),
                detected_at: Set(detected_at),
                machine_stopped: Set(request.machine_stopped),
                part_replaced: Set(request.part_replaced),
                affects_production: Set(request.affects_production),
                downtime_hours: Set(request.downtime_hours),
                ..Default::default()
            };
            let record = active.insert(db).await.map_err(ServiceError::DatabaseError)?;
            self.emit(Event::IncidentAttached {
                work_order_id,
                record_id: record.id,
            })
            .await;
            created.push(record);
        }

        info!(
            work_order_id = work_order_id,
            count = created.len(),
            "Incident records attached"
        );

        Ok(created)
    }

    async fn require_record(
        &self,
        work_order_id: i32,
        record_id: i32,
    ) -> Result<work_order_incident::Model, ServiceError> {
        let db = &*self.db;
        let record = work_order_incident::Entity::find_by_id(record_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Incident record with ID {} not found", record_id))
            })?;

        if record.work_order_id != work_order_id {
            return Err(ServiceError::BadRequest(format!(
                "Incident record {} does not belong to work order {}",
                record_id, work_order_id
            )));
        }

        Ok(record)
    }

    /// Edits an incident record of an order
    #[instrument(skip(self, request), fields(work_order_id = work_order_id, record_id = record_id))]
    pub async fn update_incident_record(
        &self,
        work_order_id: i32,
        record_id: i32,
        request: UpdateIncidentRecordRequest,
    ) -> Result<work_order_incident::Model, ServiceError> {
        let db = &*self.db;
        let record = self.require_record(work_order_id, record_id).await?;

        let detected_at =
            order_validation::parse_date_field("detected_at", &request.detected_at)?;

        let mut active: work_order_incident::ActiveModel = record.into();
        active.incident_id = Set(request.incident_id);
        active.component_id = Set(request.component_id);
        active.detected_at = Set(detected_at);
        active.machine_stopped = Set(request.machine_stopped);
        active.part_replaced = Set(request.part_replaced);
        active.affects_production = Set(request.affects_production);
        active.downtime_hours = Set(request.downtime_hours);

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;

        info!(record_id = updated.id, "Incident record updated");
        Ok(updated)
    }

    /// Sets or clears the resolution of an incident record
    #[instrument(skip(self, request), fields(work_order_id = work_order_id, record_id = record_id))]
    pub async fn set_incident_resolution(
        &self,
        work_order_id: i32,
        record_id: i32,
        request: SetResolutionRequest,
    ) -> Result<work_order_incident::Model, ServiceError> {
        let db = &*self.db;

        if let Some(resolution_id) = request.resolution_id {
            crate::entities::resolution::Entity::find_by_id(resolution_id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Resolution with ID {} not found",
                        resolution_id
                    ))
                })?;
        }

        let record = self.require_record(work_order_id, record_id).await?;

        let detected_at =
            order_validation::parse_date_field("detected_at", &request.detected_at)?;
        let resolved_at = order_validation::parse_optional_date_field(
            "resolved_at",
            request.resolved_at.as_deref(),
        )?;

        if let Some(resolved) = resolved_at {
            if detected_at > resolved {
                return Err(ServiceError::ValidationError(
                    "The detection date must be earlier than the resolution date.".to_string(),
                ));
            }
        }

        let mut active: work_order_incident::ActiveModel = record.into();
        active.resolution_id = Set(request.resolution_id);
        active.detected_at = Set(detected_at);
        active.resolved_at = Set(resolved_at);
        active.downtime_hours = Set(request.downtime_hours);

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;

        if updated.resolution_id.is_some() {
            self.emit(Event::IncidentResolved {
                work_order_id,
                record_id: updated.id,
            })
            .await;
        }

        info!(record_id = updated.id, "Incident resolution updated");
        Ok(updated)
    }

    /// Detaches an incident record from an order
    #[instrument(skip(self), fields(work_order_id = work_order_id, record_id = record_id))]
    pub async fn detach_incident(
        &self,
        work_order_id: i32,
        record_id: i32,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        let record = self.require_record(work_order_id, record_id).await?;

        work_order_incident::Entity::delete_by_id(record.id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.emit(Event::IncidentDetached {
            work_order_id,
            record_id,
        })
        .await;

        info!(record_id = record_id, "Incident record detached");
        Ok(())
    }

    /// Distinct years with at least one opened order, most recent first
    #[instrument(skip(self))]
    pub async fn list_years(&self) -> Result<Vec<i32>, ServiceError> {
        let db = &*self.db;
        let orders = work_order::Entity::find()
            .filter(work_order::Column::OpenedAt.is_not_null())
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut years: Vec<i32> = orders
            .into_iter()
            .filter_map(|o| o.opened_at.map(|d| d.year()))
            .collect();
        years.sort_unstable();
        years.dedup();
        years.reverse();

        Ok(years)
    }
}

/// Converts a work order model to response format
fn model_to_response(model: work_order::Model) -> WorkOrderResponse {
    WorkOrderResponse {
        id: model.id,
        external_ref: model.external_ref,
        opened_at: model.opened_at,
        closed_at: model.closed_at,
        comment: model.comment,
        resolution_comment: model.resolution_comment,
        materials: model.materials,
        downtime_hours: model.downtime_hours,
        confirmed: model.confirmed,
        asset_id: model.asset_id,
        status_id: model.status_id,
        order_type_id: model.order_type_id,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 8, 0, 0).unwrap()
    }

    fn persisted_order(confirmed: bool, asset_id: Option<i32>) -> work_order::Model {
        work_order::Model {
            id: 7,
            external_ref: None,
            opened_at: Some(ts(2025, 1, 10)),
            closed_at: None,
            comment: None,
            resolution_comment: None,
            materials: None,
            downtime_hours: None,
            confirmed,
            asset_id,
            status_id: Some(1),
            order_type_id: Some(1),
            created_by: None,
            created_at: ts(2025, 1, 10),
            updated_at: ts(2025, 1, 10),
        }
    }

    fn request(asset_id: i32) -> UpdateWorkOrderRequest {
        UpdateWorkOrderRequest {
            id: 7,
            external_ref: None,
            status_id: 1,
            asset_id,
            order_type_id: 1,
            comment: None,
            materials: None,
            resolution_comment: None,
            opened_at: Some("2025-01-10T08:00:00".into()),
            closed_at: None,
        }
    }

    #[test]
    fn first_full_update_confirms_the_order() {
        let order = persisted_order(false, None);
        let active = apply_update(&order, &request(3), Some(ts(2025, 1, 10)), None).unwrap();
        assert_eq!(active.confirmed.as_ref(), &true);
        assert_eq!(active.asset_id.as_ref(), &Some(3));
    }

    #[test]
    fn unconfirmed_update_without_asset_is_rejected() {
        let order = persisted_order(false, None);
        let err = apply_update(&order, &request(0), Some(ts(2025, 1, 10)), None).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn asset_cannot_be_cleared_once_set() {
        let order = persisted_order(true, Some(3));
        let err = apply_update(&order, &request(0), Some(ts(2025, 1, 10)), None).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn opening_date_cannot_be_cleared_once_set() {
        let order = persisted_order(true, Some(3));
        let err = apply_update(&order, &request(3), None, None).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn confirmed_order_keeps_confirmed_flag() {
        let order = persisted_order(true, Some(3));
        let active = apply_update(&order, &request(5), Some(ts(2025, 1, 10)), None).unwrap();
        assert_eq!(active.confirmed.as_ref(), &true);
        assert_eq!(active.asset_id.as_ref(), &Some(5));
    }
}
