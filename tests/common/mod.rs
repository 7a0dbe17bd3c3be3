//! Shared helpers for integration tests: an in-memory SQLite database with
//! the full schema and seeded catalogs, plus small fixture builders.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use cmms_api::db::{establish_connection_with_config, DbConfig, DbPool};
use cmms_api::entities::{asset, component, incident, order_status, order_type, resolution};
use cmms_api::migrator::Migrator;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

pub async fn test_db() -> Arc<DbPool> {
    // A single connection keeps the in-memory database alive and shared.
    let cfg = DbConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let db = establish_connection_with_config(&cfg)
        .await
        .expect("test database should connect");
    Migrator::up(&db, None)
        .await
        .expect("migrations should apply");
    Arc::new(db)
}

pub fn ts(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
}

pub async fn status_id(db: &DbPool, name: &str) -> i32 {
    order_status::Entity::find()
        .filter(order_status::Column::Name.eq(name))
        .one(db)
        .await
        .expect("status query")
        .unwrap_or_else(|| panic!("status '{name}' should be seeded"))
        .id
}

pub async fn type_id(db: &DbPool, name: &str) -> i32 {
    order_type::Entity::find()
        .filter(order_type::Column::Name.eq(name))
        .one(db)
        .await
        .expect("type query")
        .unwrap_or_else(|| panic!("type '{name}' should be seeded"))
        .id
}

pub async fn seed_asset(db: &DbPool, code: &str, critical: bool) -> i32 {
    asset::ActiveModel {
        code: Set(code.to_string()),
        description: Set(format!("Asset {code}")),
        criticality: Set(if critical { 80 } else { 20 }),
        critical: Set(critical),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("asset insert")
    .id
}

pub async fn seed_component(db: &DbPool, asset_id: i32, code: &str) -> i32 {
    component::ActiveModel {
        asset_id: Set(asset_id),
        code: Set(code.to_string()),
        description: Set(format!("Component {code}")),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("component insert")
    .id
}

pub async fn seed_incident_description(db: &DbPool, name: &str) -> i32 {
    incident::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("incident insert")
    .id
}

pub async fn seed_resolution(db: &DbPool, name: &str) -> i32 {
    resolution::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("resolution insert")
    .id
}
