use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A maintainable element of an asset. Components may nest through
/// `parent_id` to form the asset hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "components")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub asset_id: i32,
    pub parent_id: Option<i32>,
    pub code: String,
    pub description: String,
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
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
    #[sea_orm(has_many = "super::work_order_incident::Entity")]
    IncidentRecords,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl Related<super::work_order_incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncidentRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
