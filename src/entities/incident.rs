use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog of fault descriptions selectable when attaching an incident
/// record to a work order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incidents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub failure_mechanism: Option<String>,
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
