pub mod assets;
pub mod catalog;
pub mod kpis;
pub mod spare_parts;
pub mod work_orders;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub work_orders: Arc<crate::services::work_orders::WorkOrderService>,
    pub assets: Arc<crate::services::assets::AssetService>,
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub spare_parts: Arc<crate::services::spare_parts::SparePartService>,
    pub kpis: Arc<crate::services::kpis::KpiService>,
}

impl AppServices {
    /// Builds the services container shared across handlers.
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let work_orders = Arc::new(crate::services::work_orders::WorkOrderService::new(
            db.clone(),
            Some(event_sender.clone()),
        ));
        let assets = Arc::new(crate::services::assets::AssetService::new(
            db.clone(),
            Some(event_sender.clone()),
        ));
        let catalog = Arc::new(crate::services::catalog::CatalogService::new(db.clone()));
        let spare_parts = Arc::new(crate::services::spare_parts::SparePartService::new(
            db.clone(),
            Some(event_sender),
        ));
        let kpis = Arc::new(crate::services::kpis::KpiService::new(db));

        Self {
            work_orders,
            assets,
            catalog,
            spare_parts,
            kpis,
        }
    }
}
