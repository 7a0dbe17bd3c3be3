use crate::{
    db::DbPool,
    entities::{asset, component},
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
pub struct CreateAssetRequest {
    #[validate(length(min = 1, max = 50, message = "Asset code must be between 1 and 50 characters"))]
    pub code: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub description_en: Option<String>,
    #[serde(default)]
    pub criticality: i32,
    #[serde(default)]
    pub critical: bool,
    pub location: Option<String>,
    pub cost_center: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAssetRequest {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub description_en: Option<String>,
    pub criticality: i32,
    pub critical: bool,
    pub location: Option<String>,
    pub cost_center: Option<String>,
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ComponentRequest {
    #[validate(length(min = 1, max = 50, message = "Component code must be between 1 and 50 characters"))]
    pub code: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub parent_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssetListResponse {
    pub assets: Vec<asset::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing assets and their component hierarchy
#[derive(Clone)]
pub struct AssetService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl AssetService {
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
    pub async fn create_asset(&self, request: CreateAssetRequest) -> Result<asset::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;

        let existing = asset::Entity::find()
            .filter(asset::Column::Code.eq(request.code.clone()))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "An asset with code '{}' already exists",
                request.code
            )));
        }

        let active = asset::ActiveModel {
            code: Set(request.code),
            description: Set(request.description),
            description_en: Set(request.description_en),
            criticality: Set(request.criticality),
            critical: Set(request.critical),
            location: Set(request.location),
            cost_center: Set(request.cost_center),
            ..Default::default()
        };

        let created = active.insert(db).await.map_err(ServiceError::DatabaseError)?;

        info!(asset_id = created.id, "Asset created");
        self.emit(Event::AssetCreated(created.id)).await;

        Ok(created)
    }

    #[instrument(skip(self), fields(asset_id = asset_id))]
    pub async fn get_asset(&self, asset_id: i32) -> Result<asset::Model, ServiceError> {
        let db = &*self.db;
        asset::Entity::find_by_id(asset_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Asset with ID {} not found", asset_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_assets(
        &self,
        only_active: bool,
        page: u64,
        per_page: u64,
    ) -> Result<AssetListResponse, ServiceError> {
        let db = &*self.db;

        let mut query = asset::Entity::find();
        if only_active {
            query = query.filter(asset::Column::Active.eq(true));
        }

        let paginator = query
            .order_by_asc(asset::Column::Code)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let assets = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(AssetListResponse {
            assets,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(asset_id = asset_id))]
    pub async fn update_asset(
        &self,
        asset_id: i32,
        request: UpdateAssetRequest,
    ) -> Result<asset::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let existing = self.get_asset(asset_id).await?;
        let was_active = existing.active;

        let mut active: asset::ActiveModel = existing.into();
        active.description = Set(request.description);
        active.description_en = Set(request.description_en);
        active.criticality = Set(request.criticality);
        active.critical = Set(request.critical);
        active.location = Set(request.location);
        active.cost_center = Set(request.cost_center);
        active.active = Set(request.active);

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;

        info!(asset_id = updated.id, "Asset updated");
        self.emit(Event::AssetUpdated(updated.id)).await;
        if was_active && !updated.active {
            self.emit(Event::AssetDeactivated(updated.id)).await;
        }

        Ok(updated)
    }

    /// Deletes an asset that has no work order history
    #[instrument(skip(self), fields(asset_id = asset_id))]
    pub async fn delete_asset(&self, asset_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db;
        self.get_asset(asset_id).await?;

        let orders = crate::entities::work_order::Entity::find()
            .filter(crate::entities::work_order::Column::AssetId.eq(asset_id))
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if orders > 0 {
            return Err(ServiceError::Conflict(format!(
                "Asset {} is referenced by {} work orders; deactivate it instead",
                asset_id, orders
            )));
        }

        component::Entity::delete_many()
            .filter(component::Column::AssetId.eq(asset_id))
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        asset::Entity::delete_by_id(asset_id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(asset_id = asset_id, "Asset deleted");
        Ok(())
    }

    /// Lists the components of an asset, hierarchy roots first
    #[instrument(skip(self), fields(asset_id = asset_id))]
    pub async fn list_components(&self, asset_id: i32) -> Result<Vec<component::Model>, ServiceError> {
        let db = &*self.db;
        self.get_asset(asset_id).await?;

        component::Entity::find()
            .filter(component::Column::AssetId.eq(asset_id))
            .order_by_asc(component::Column::Code)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, request), fields(asset_id = asset_id))]
    pub async fn create_component(
        &self,
        asset_id: i32,
        request: ComponentRequest,
    ) -> Result<component::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        self.get_asset(asset_id).await?;

        if let Some(parent_id) = request.parent_id {
            let parent = component::Entity::find_by_id(parent_id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Component with ID {} not found", parent_id))
                })?;
            if parent.asset_id != asset_id {
                return Err(ServiceError::BadRequest(format!(
                    "Parent component {} belongs to a different asset",
                    parent_id
                )));
            }
        }

        let active = component::ActiveModel {
            asset_id: Set(asset_id),
            parent_id: Set(request.parent_id),
            code: Set(request.code),
            description: Set(request.description),
            ..Default::default()
        };

        let created = active.insert(db).await.map_err(ServiceError::DatabaseError)?;
        info!(component_id = created.id, "Component created");

        Ok(created)
    }

    #[instrument(skip(self, request), fields(asset_id = asset_id, component_id = component_id))]
    pub async fn update_component(
        &self,
        asset_id: i32,
        component_id: i32,
        request: ComponentRequest,
    ) -> Result<component::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let existing = component::Entity::find_by_id(component_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Component with ID {} not found", component_id))
            })?;

        if existing.asset_id != asset_id {
            return Err(ServiceError::BadRequest(format!(
                "Component {} does not belong to asset {}",
                component_id, asset_id
            )));
        }

        let mut active: component::ActiveModel = existing.into();
        active.code = Set(request.code);
        active.description = Set(request.description);
        active.parent_id = Set(request.parent_id);

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;
        info!(component_id = updated.id, "Component updated");

        Ok(updated)
    }

    #[instrument(skip(self), fields(asset_id = asset_id, component_id = component_id))]
    pub async fn delete_component(
        &self,
        asset_id: i32,
        component_id: i32,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        let existing = component::Entity::find_by_id(component_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Component with ID {} not found", component_id))
            })?;

        if existing.asset_id != asset_id {
            return Err(ServiceError::BadRequest(format!(
                "Component {} does not belong to asset {}",
                component_id, asset_id
            )));
        }

        component::Entity::delete_by_id(component_id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(component_id = component_id, "Component deleted");
        Ok(())
    }
}
