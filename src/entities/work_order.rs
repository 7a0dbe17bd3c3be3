use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Identifier of the order in the external ERP, when one exists
    pub external_ref: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub resolution_comment: Option<String>,
    pub materials: Option<String>,
    pub downtime_hours: Option<f64>,
    /// True once the order has completed its first full registration.
    /// Unconfirmed orders are still being filled in and follow looser rules.
    pub confirmed: bool,
    pub asset_id: Option<i32>,
    pub status_id: Option<i32>,
    pub order_type_id: Option<i32>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset::Entity",
        from = "Column::AssetId",
        to = "super::asset::Column::Id"
    )]
    Asset,
    #[sea_orm(
        belongs_to = "super::order_status::Entity",
        from = "Column::StatusId",
        to = "super::order_status::Column::Id"
    )]
    Status,
    #[sea_orm(
        belongs_to = "super::order_type::Entity",
        from = "Column::OrderTypeId",
        to = "super::order_type::Column::Id"
    )]
    OrderType,
    #[sea_orm(has_many = "super::work_order_incident::Entity")]
    Incidents,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl Related<super::order_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Status.def()
    }
}

impl Related<super::order_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderType.def()
    }
}

impl Related<super::work_order_incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incidents.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
            if let ActiveValue::NotSet = self.confirmed {
                self.confirmed = ActiveValue::Set(false);
            }
        }

        self.updated_at = ActiveValue::Set(now);

        Ok(self)
    }
}
