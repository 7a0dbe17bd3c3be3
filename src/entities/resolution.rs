use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog of resolutions that can be applied to incident records.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resolutions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::work_order_incident::Entity")]
    IncidentRecords,
}

impl Related<super::work_order_incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncidentRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
