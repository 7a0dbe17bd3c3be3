use crate::{
    db::DbPool,
    entities::spare_part,
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SparePartRequest {
    #[validate(length(min = 1, max = 50, message = "Code must be between 1 and 50 characters"))]
    pub code: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub warehouse: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    pub minimum_quantity: Option<i32>,
    pub unit_cost: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SparePartListResponse {
    pub spare_parts: Vec<spare_part::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for the spare parts warehouse catalog
#[derive(Clone)]
pub struct SparePartService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl SparePartService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send domain event");
            }
        }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_spare_part(
        &self,
        request: SparePartRequest,
    ) -> Result<spare_part::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;

        let existing = spare_part::Entity::find()
            .filter(spare_part::Column::Code.eq(request.code.clone()))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A spare part with code '{}' already exists",
                request.code
            )));
        }

        if request.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity cannot be negative.".to_string(),
            ));
        }

        let active = spare_part::ActiveModel {
            code: Set(request.code),
            description: Set(request.description),
            warehouse: Set(request.warehouse),
            quantity: Set(request.quantity),
            minimum_quantity: Set(request.minimum_quantity),
            unit_cost: Set(request.unit_cost),
            active: Set(request.active),
            ..Default::default()
        };

        let created = active.insert(db).await.map_err(ServiceError::DatabaseError)?;

        info!(spare_part_id = created.id, "Spare part created");
        self.emit(Event::SparePartCreated(created.id)).await;

        Ok(created)
    }

    #[instrument(skip(self), fields(spare_part_id = spare_part_id))]
    pub async fn get_spare_part(&self, spare_part_id: i32) -> Result<spare_part::Model, ServiceError> {
        let db = &*self.db;
        spare_part::Entity::find_by_id(spare_part_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Spare part with ID {} not found", spare_part_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn list_spare_parts(
        &self,
        only_active: bool,
        page: u64,
        per_page: u64,
    ) -> Result<SparePartListResponse, ServiceError> {
        let db = &*self.db;

        let mut query = spare_part::Entity::find();
        if only_active {
            query = query.filter(spare_part::Column::Active.eq(true));
        }

        let paginator = query
            .order_by_asc(spare_part::Column::Code)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let spare_parts = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(SparePartListResponse {
            spare_parts,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(spare_part_id = spare_part_id))]
    pub async fn update_spare_part(
        &self,
        spare_part_id: i32,
        request: SparePartRequest,
    ) -> Result<spare_part::Model, ServiceError> {
        request.validate()?;

        if request.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity cannot be negative.".to_string(),
            ));
        }

        let db = &*self.db;
        let existing = self.get_spare_part(spare_part_id).await?;

        if existing.code != request.code {
            let clash = spare_part::Entity::find()
                .filter(spare_part::Column::Code.eq(request.code.clone()))
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?;
            if clash.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "A spare part with code '{}' already exists",
                    request.code
                )));
            }
        }

        let mut active: spare_part::ActiveModel = existing.into();
        active.code = Set(request.code);
        active.description = Set(request.description);
        active.warehouse = Set(request.warehouse);
        active.quantity = Set(request.quantity);
        active.minimum_quantity = Set(request.minimum_quantity);
        active.unit_cost = Set(request.unit_cost);
        active.active = Set(request.active);

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;

        info!(spare_part_id = updated.id, "Spare part updated");
        self.emit(Event::SparePartUpdated(updated.id)).await;

        Ok(updated)
    }

    #[instrument(skip(self), fields(spare_part_id = spare_part_id))]
    pub async fn delete_spare_part(&self, spare_part_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db;
        self.get_spare_part(spare_part_id).await?;

        spare_part::Entity::delete_by_id(spare_part_id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(spare_part_id = spare_part_id, "Spare part deleted");
        Ok(())
    }
}
