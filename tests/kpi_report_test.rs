//! Integration tests for the KPI reports over a seeded order history.

mod common;

use cmms_api::db::DbPool;
use cmms_api::entities::{work_order, work_order_incident};
use cmms_api::services::kpis::{KpiQuery, KpiService};
use common::*;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;

struct Seeded {
    db: Arc<DbPool>,
    critical_asset: i32,
    secondary_asset: i32,
}

async fn seed_order(
    db: &DbPool,
    asset_id: i32,
    status_id: i32,
    type_id: i32,
    opened: chrono::DateTime<chrono::Utc>,
) -> i32 {
    work_order::ActiveModel {
        opened_at: Set(Some(opened)),
        confirmed: Set(true),
        asset_id: Set(Some(asset_id)),
        status_id: Set(Some(status_id)),
        order_type_id: Set(Some(type_id)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("order insert")
    .id
}

async fn seed_history() -> Seeded {
    let db = test_db().await;

    let critical_asset = seed_asset(&db, "TURBINE-01", true).await;
    let secondary_asset = seed_asset(&db, "CONVEYOR-02", false).await;
    let component = seed_component(&db, critical_asset, "TURBINE-01-ROTOR").await;
    let incident = seed_incident_description(&db, "Vibration").await;
    let resolution = seed_resolution(&db, "Rebalanced").await;

    let closed = status_id(&db, "Cerrada").await;
    let open = status_id(&db, "Abierta").await;
    let pending_material = status_id(&db, "Abierta: Pendiente Material").await;
    let corrective = type_id(&db, "Correctiva").await;
    let preventive = type_id(&db, "Preventiva").await;

    // January: one closed corrective on the critical asset, 8h downtime.
    let closed_order = seed_order(&db, critical_asset, closed, corrective, ts(2025, 1, 5, 8)).await;
    work_order_incident::ActiveModel {
        work_order_id: Set(closed_order),
        incident_id: Set(incident),
        component_id: Set(component),
        detected_at: Set(ts(2025, 1, 5, 8)),
        resolved_at: Set(Some(ts(2025, 1, 5, 16))),
        resolution_id: Set(Some(resolution)),
        machine_stopped: Set(true),
        ..Default::default()
    }
    .insert(&*db)
    .await
    .expect("incident insert");

    // February: an open preventive on the secondary asset.
    seed_order(&db, secondary_asset, open, preventive, ts(2025, 2, 10, 8)).await;

    // March: a corrective waiting for materials on the critical asset.
    seed_order(
        &db,
        critical_asset,
        pending_material,
        corrective,
        ts(2025, 3, 15, 8),
    )
    .await;

    Seeded {
        db,
        critical_asset,
        secondary_asset,
    }
}

#[tokio::test]
async fn order_kpis_split_totals_by_status_family() {
    let seeded = seed_history().await;
    let service = KpiService::new(seeded.db.clone());

    let kpis = service
        .order_kpis(KpiQuery {
            year: Some(2025),
            month: None,
            asset_id: None,
        })
        .await
        .expect("order kpis");

    assert_eq!(kpis.total_orders, 3);
    assert_eq!(kpis.pct_completed, 33.33);
    assert_eq!(kpis.pct_pending, 33.33);
    assert_eq!(kpis.pct_material, 33.33);

    // Monthly view spans the full year.
    assert_eq!(kpis.corrective.len(), 12);
    assert_eq!(kpis.corrective[0].count, 1); // January
    assert_eq!(kpis.corrective[2].count, 1); // March
    assert_eq!(kpis.preventive[1].count, 1); // February
    assert_eq!(kpis.general.iter().map(|p| p.count).sum::<u64>(), 3);
}

#[tokio::test]
async fn order_kpis_filter_by_asset() {
    let seeded = seed_history().await;
    let service = KpiService::new(seeded.db.clone());

    let kpis = service
        .order_kpis(KpiQuery {
            year: Some(2025),
            month: None,
            asset_id: Some(seeded.secondary_asset),
        })
        .await
        .expect("order kpis");

    assert_eq!(kpis.total_orders, 1);
    assert_eq!(kpis.pct_pending, 100.0);
    assert_eq!(kpis.by_asset.len(), 1);
    assert_eq!(kpis.by_asset[0].asset_id, seeded.secondary_asset);
}

#[tokio::test]
async fn reliability_kpis_compute_downtime_based_indicators() {
    let seeded = seed_history().await;
    let service = KpiService::new(seeded.db.clone());

    let kpis = service
        .reliability_kpis(KpiQuery {
            year: Some(2025),
            month: None,
            asset_id: None,
        })
        .await
        .expect("reliability kpis");

    // Only the January corrective is closed.
    assert_eq!(kpis.closed_orders, 1);
    assert_eq!(kpis.mttr, 8.0);

    // January: one critical asset in service for 720h, 8h down.
    let january = &kpis.periods[0];
    assert_eq!(january.closed_orders, 1);
    assert_eq!(january.mtbf, 712.0);
    assert_eq!(january.mttr, 8.0);
    assert!(january.availability > 98.0 && january.availability < 100.0);

    // Empty periods report full reliability and no closed orders.
    let february = &kpis.periods[1];
    assert_eq!(february.closed_orders, 0);
    assert_eq!(february.reliability, 100.0);

    assert_eq!(kpis.by_asset.len(), 1);
    assert_eq!(kpis.by_asset[0].asset_id, seeded.critical_asset);
    assert_eq!(kpis.by_asset[0].indicators.closed_orders, 1);
}

#[tokio::test]
async fn reliability_kpis_are_empty_without_closed_orders() {
    let db = test_db().await;
    let service = KpiService::new(db.clone());

    let kpis = service
        .reliability_kpis(KpiQuery::default())
        .await
        .expect("reliability kpis");

    assert_eq!(kpis.closed_orders, 0);
    assert!(kpis.periods.is_empty());
    assert!(kpis.by_asset.is_empty());
}
