use crate::{
    db::DbPool,
    entities::{incident, order_status, order_type, resolution, work_order_incident},
    errors::ServiceError,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IncidentRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub failure_mechanism: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResolutionRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

/// Read/maintain the lookup catalogs: order statuses, order types,
/// incident descriptions and resolutions.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Order statuses sorted by display rank
    #[instrument(skip(self))]
    pub async fn list_order_statuses(&self) -> Result<Vec<order_status::Model>, ServiceError> {
        let db = &*self.db;
        order_status::Entity::find()
            .order_by_asc(order_status::Column::Rank)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self))]
    pub async fn list_order_types(&self) -> Result<Vec<order_type::Model>, ServiceError> {
        let db = &*self.db;
        order_type::Entity::find()
            .order_by_asc(order_type::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self))]
    pub async fn list_incidents(&self) -> Result<Vec<incident::Model>, ServiceError> {
        let db = &*self.db;
        incident::Entity::find()
            .order_by_asc(incident::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, request))]
    pub async fn create_incident(&self, request: IncidentRequest) -> Result<incident::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let active = incident::ActiveModel {
            name: Set(request.name),
            failure_mechanism: Set(request.failure_mechanism),
            ..Default::default()
        };

        let created = active.insert(db).await.map_err(ServiceError::DatabaseError)?;
        info!(incident_id = created.id, "Incident description created");
        Ok(created)
    }

    #[instrument(skip(self, request), fields(incident_id = incident_id))]
    pub async fn update_incident(
        &self,
        incident_id: i32,
        request: IncidentRequest,
    ) -> Result<incident::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let existing = incident::Entity::find_by_id(incident_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Incident with ID {} not found", incident_id))
            })?;

        let mut active: incident::ActiveModel = existing.into();
        active.name = Set(request.name);
        active.failure_mechanism = Set(request.failure_mechanism);

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;
        info!(incident_id = updated.id, "Incident description updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(incident_id = incident_id))]
    pub async fn delete_incident(&self, incident_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db;

        incident::Entity::find_by_id(incident_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Incident with ID {} not found", incident_id))
            })?;

        let in_use = work_order_incident::Entity::find()
            .filter(work_order_incident::Column::IncidentId.eq(incident_id))
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Incident {} is referenced by {} work order records",
                incident_id, in_use
            )));
        }

        incident::Entity::delete_by_id(incident_id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(incident_id = incident_id, "Incident description deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_resolutions(&self) -> Result<Vec<resolution::Model>, ServiceError> {
        let db = &*self.db;
        resolution::Entity::find()
            .order_by_asc(resolution::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, request))]
    pub async fn create_resolution(
        &self,
        request: ResolutionRequest,
    ) -> Result<resolution::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let active = resolution::ActiveModel {
            name: Set(request.name),
            ..Default::default()
        };

        let created = active.insert(db).await.map_err(ServiceError::DatabaseError)?;
        info!(resolution_id = created.id, "Resolution created");
        Ok(created)
    }

    #[instrument(skip(self, request), fields(resolution_id = resolution_id))]
    pub async fn update_resolution(
        &self,
        resolution_id: i32,
        request: ResolutionRequest,
    ) -> Result<resolution::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let existing = resolution::Entity::find_by_id(resolution_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Resolution with ID {} not found", resolution_id))
            })?;

        let mut active: resolution::ActiveModel = existing.into();
        active.name = Set(request.name);

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;
        info!(resolution_id = updated.id, "Resolution updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(resolution_id = resolution_id))]
    pub async fn delete_resolution(&self, resolution_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db;

        resolution::Entity::find_by_id(resolution_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Resolution with ID {} not found", resolution_id))
            })?;

        let in_use = work_order_incident::Entity::find()
            .filter(work_order_incident::Column::ResolutionId.eq(resolution_id))
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Resolution {} is referenced by {} work order records",
                resolution_id, in_use
            )));
        }

        resolution::Entity::delete_by_id(resolution_id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(resolution_id = resolution_id, "Resolution deleted");
        Ok(())
    }
}
