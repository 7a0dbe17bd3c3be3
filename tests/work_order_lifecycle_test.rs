//! Integration tests for the work order lifecycle against an in-memory
//! database: registration, incident attachment, validated updates and the
//! closed/cancelled status restrictions.

mod common;

use assert_matches::assert_matches;
use cmms_api::db::DbPool;
use cmms_api::errors::ServiceError;
use cmms_api::services::order_validation::UpdateWorkOrderRequest;
use cmms_api::services::work_orders::{
    AttachIncidentsRequest, SetResolutionRequest, WorkOrderService,
};
use common::*;
use std::sync::Arc;

struct Fixture {
    db: Arc<DbPool>,
    service: WorkOrderService,
    asset_id: i32,
    component_id: i32,
    incident_id: i32,
    resolution_id: i32,
    order_id: i32,
}

async fn fixture() -> Fixture {
    let db = test_db().await;
    let service = WorkOrderService::new(db.clone(), None);

    let asset_id = seed_asset(&db, "PUMP-01", true).await;
    let component_id = seed_component(&db, asset_id, "PUMP-01-MOTOR").await;
    let incident_id = seed_incident_description(&db, "Overheating").await;
    let resolution_id = seed_resolution(&db, "Replaced part").await;
    let order_id = service
        .register_work_order(None)
        .await
        .expect("registration should succeed");

    Fixture {
        db,
        service,
        asset_id,
        component_id,
        incident_id,
        resolution_id,
        order_id,
    }
}

fn update_request(f: &Fixture, status_id: i32, type_id: i32) -> UpdateWorkOrderRequest {
    UpdateWorkOrderRequest {
        id: f.order_id,
        external_ref: None,
        status_id,
        asset_id: f.asset_id,
        order_type_id: type_id,
        comment: None,
        materials: None,
        resolution_comment: None,
        opened_at: Some("2025-01-09T00:00:00".into()),
        closed_at: None,
    }
}

async fn attach_incident(f: &Fixture, detected_at: &str) -> i32 {
    let records = f
        .service
        .attach_incidents(
            f.order_id,
            AttachIncidentsRequest {
                component_id: f.component_id,
                incident_ids: vec![f.incident_id],
                detected_at: detected_at.into(),
                machine_stopped: true,
                part_replaced: false,
                affects_production: false,
                downtime_hours: None,
            },
        )
        .await
        .expect("attach should succeed");
    records[0].id
}

fn assert_validation(err: ServiceError, fragment: &str) {
    match err {
        ServiceError::ValidationError(msg) => {
            assert!(msg.contains(fragment), "unexpected message: {msg}")
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn registration_creates_an_unconfirmed_open_order() {
    let f = fixture().await;
    let order = f.service.get_work_order(f.order_id).await.unwrap();

    assert!(!order.confirmed);
    assert_eq!(order.status_id, Some(status_id(&f.db, "Abierta").await));
    assert!(order.opened_at.is_none());
}

// Scenario A: open target with a prior unresolved incident passes.
#[tokio::test]
async fn open_order_with_unresolved_incident_updates_cleanly() {
    let f = fixture().await;
    attach_incident(&f, "2025-01-09T08:00:00").await;

    let open = status_id(&f.db, "Abierta").await;
    let corrective = type_id(&f.db, "Correctiva").await;

    let updated = f
        .service
        .update_work_order(update_request(&f, open, corrective))
        .await
        .expect("open update should pass");

    assert!(updated.confirmed, "first full update confirms the order");
    assert_eq!(updated.asset_id, Some(f.asset_id));
}

// Scenario B: closing the same order reports the unresolved incident.
#[tokio::test]
async fn closing_with_unresolved_incident_is_rejected() {
    let f = fixture().await;
    attach_incident(&f, "2025-01-09T08:00:00").await;

    let closed = status_id(&f.db, "Cerrada").await;
    let corrective = type_id(&f.db, "Correctiva").await;

    let mut request = update_request(&f, closed, corrective);
    request.closed_at = Some("2025-01-10T00:00:00".into());

    let err = f.service.update_work_order(request).await.unwrap_err();
    assert_validation(err, "unresolved incidents");
}

#[tokio::test]
async fn resolving_the_incident_allows_closing() {
    let f = fixture().await;
    let record_id = attach_incident(&f, "2025-01-09T08:00:00").await;

    let open = status_id(&f.db, "Abierta").await;
    let closed = status_id(&f.db, "Cerrada").await;
    let corrective = type_id(&f.db, "Correctiva").await;

    // Confirm the order first
    f.service
        .update_work_order(update_request(&f, open, corrective))
        .await
        .unwrap();

    f.service
        .set_incident_resolution(
            f.order_id,
            record_id,
            SetResolutionRequest {
                resolution_id: Some(f.resolution_id),
                detected_at: "2025-01-09T08:00:00".into(),
                resolved_at: Some("2025-01-09T16:00:00".into()),
                downtime_hours: Some(8.0),
            },
        )
        .await
        .expect("resolution should apply");

    let mut request = update_request(&f, closed, corrective);
    request.closed_at = Some("2025-01-10T00:00:00".into());

    let updated = f.service.update_work_order(request).await.unwrap();
    assert_eq!(updated.status_id, Some(closed));
    assert!(updated.closed_at.is_some());
}

#[tokio::test]
async fn closing_date_on_open_status_is_rejected() {
    let f = fixture().await;

    let open = status_id(&f.db, "Abierta").await;
    let corrective = type_id(&f.db, "Correctiva").await;

    let mut request = update_request(&f, open, corrective);
    request.closed_at = Some("2025-01-10T00:00:00".into());

    let err = f.service.update_work_order(request).await.unwrap_err();
    assert_validation(err, "closed status before specifying a closing date");
}

#[tokio::test]
async fn missing_opening_date_is_rejected() {
    let f = fixture().await;

    let open = status_id(&f.db, "Abierta").await;
    let corrective = type_id(&f.db, "Correctiva").await;

    let mut request = update_request(&f, open, corrective);
    request.opened_at = Some(String::new());

    let err = f.service.update_work_order(request).await.unwrap_err();
    assert_validation(err, "opening date of the order must be specified");
}

// Scenario C: a cancelled order may only be reopened.
#[tokio::test]
async fn cancelled_order_only_reopens() {
    let f = fixture().await;

    let open = status_id(&f.db, "Abierta").await;
    let cancelled = status_id(&f.db, "Anulada").await;
    let closed = status_id(&f.db, "Cerrada").await;
    let corrective = type_id(&f.db, "Correctiva").await;

    // Confirm, then cancel.
    f.service
        .update_work_order(update_request(&f, open, corrective))
        .await
        .unwrap();
    f.service
        .update_work_order(update_request(&f, cancelled, corrective))
        .await
        .unwrap();

    let mut to_closed = update_request(&f, closed, corrective);
    to_closed.closed_at = Some("2025-01-10T00:00:00".into());
    let err = f.service.update_work_order(to_closed).await.unwrap_err();
    assert_validation(err, "'Abierta'");

    // Reopening is the one legal move.
    f.service
        .update_work_order(update_request(&f, open, corrective))
        .await
        .expect("reopening should pass");
}

// Scenario D: unchanged materials while closed pass; changing them fails.
#[tokio::test]
async fn closed_order_freezes_materials() {
    let f = fixture().await;

    let open = status_id(&f.db, "Abierta").await;
    let closed = status_id(&f.db, "Cerrada").await;
    let corrective = type_id(&f.db, "Correctiva").await;

    let mut confirm = update_request(&f, open, corrective);
    confirm.materials = Some("2x bearing 6204".into());
    f.service.update_work_order(confirm).await.unwrap();

    let mut close = update_request(&f, closed, corrective);
    close.materials = Some("2x bearing 6204".into());
    close.closed_at = Some("2025-01-10T00:00:00".into());
    f.service.update_work_order(close).await.unwrap();

    // Same materials: passes the freeze rule.
    let mut same = update_request(&f, closed, corrective);
    same.materials = Some("2x bearing 6204".into());
    same.closed_at = Some("2025-01-10T00:00:00".into());
    f.service.update_work_order(same).await.unwrap();

    // Changed materials: rejected.
    let mut changed = update_request(&f, closed, corrective);
    changed.materials = Some("3x bearing 6204".into());
    changed.closed_at = Some("2025-01-10T00:00:00".into());
    let err = f.service.update_work_order(changed).await.unwrap_err();
    assert_validation(err, "materials field cannot be modified");
}

#[tokio::test]
async fn unknown_references_surface_as_not_found() {
    let f = fixture().await;
    let corrective = type_id(&f.db, "Correctiva").await;
    let open = status_id(&f.db, "Abierta").await;

    let mut missing_order = update_request(&f, open, corrective);
    missing_order.id = 9999;
    let err = f.service.update_work_order(missing_order).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let missing_status = update_request(&f, 9999, corrective);
    let err = f.service.update_work_order(missing_status).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let missing_type = update_request(&f, open, 9999);
    let err = f.service.update_work_order(missing_type).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn validation_leaves_the_order_untouched() {
    let f = fixture().await;
    attach_incident(&f, "2025-01-09T08:00:00").await;

    let closed = status_id(&f.db, "Cerrada").await;
    let corrective = type_id(&f.db, "Correctiva").await;

    let mut request = update_request(&f, closed, corrective);
    request.closed_at = Some("2025-01-10T00:00:00".into());
    let before = f.service.get_work_order(f.order_id).await.unwrap();

    let _ = f.service.update_work_order(request).await.unwrap_err();

    let after = f.service.get_work_order(f.order_id).await.unwrap();
    assert_eq!(before.status_id, after.status_id);
    assert_eq!(before.confirmed, after.confirmed);
    assert_eq!(before.updated_at, after.updated_at);
}

#[tokio::test]
async fn incident_resolution_requires_consistent_dates() {
    let f = fixture().await;
    let record_id = attach_incident(&f, "2025-01-09T08:00:00").await;

    let err = f
        .service
        .set_incident_resolution(
            f.order_id,
            record_id,
            SetResolutionRequest {
                resolution_id: Some(f.resolution_id),
                detected_at: "2025-01-09T08:00:00".into(),
                resolved_at: Some("2025-01-08T08:00:00".into()),
                downtime_hours: None,
            },
        )
        .await
        .unwrap_err();

    assert_validation(err, "detection date must be earlier");
}

#[tokio::test]
async fn detaching_an_incident_removes_it_from_the_listing() {
    let f = fixture().await;
    let record_id = attach_incident(&f, "2025-01-09T08:00:00").await;

    assert_eq!(f.service.list_incidents(f.order_id).await.unwrap().len(), 1);

    f.service
        .detach_incident(f.order_id, record_id)
        .await
        .expect("detach should succeed");

    assert!(f.service.list_incidents(f.order_id).await.unwrap().is_empty());
}
