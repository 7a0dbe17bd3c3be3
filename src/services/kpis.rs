use crate::{
    db::DbPool,
    entities::{asset, order_status, order_type, work_order, work_order_incident},
    errors::ServiceError,
    models::status::StatusKind,
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Time bucketing for the KPI series: week of year when a month is given,
/// month of year when only a year is given, calendar year otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodView {
    Weekly,
    Monthly,
    Annual,
}

const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Assumed service hours per period. Critical assets run around the clock;
/// the rest follow the plant shift calendar.
const CRITICAL_HOURS: [f64; 3] = [168.0, 720.0, 8760.0];
const NON_CRITICAL_HOURS: [f64; 3] = [80.0, 320.0, 3840.0];

impl PeriodView {
    fn from_query(year: Option<i32>, month: Option<u32>) -> Self {
        match (year, month) {
            (Some(_), Some(_)) => Self::Weekly,
            (Some(_), None) => Self::Monthly,
            _ => Self::Annual,
        }
    }

    fn period_of(self, date: DateTime<Utc>) -> i32 {
        match self {
            Self::Weekly => date.iso_week().week() as i32,
            Self::Monthly => date.month() as i32,
            Self::Annual => date.year(),
        }
    }

    fn label(self, period: i32) -> String {
        match self {
            Self::Weekly => format!("Semana {}", period),
            Self::Monthly => MONTH_LABELS
                .get((period as usize).saturating_sub(1))
                .map(|m| m.to_string())
                .unwrap_or_else(|| period.to_string()),
            Self::Annual => period.to_string(),
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Weekly => 0,
            Self::Monthly => 1,
            Self::Annual => 2,
        }
    }

    fn critical_hours(self) -> f64 {
        CRITICAL_HOURS[self.index()]
    }

    fn non_critical_hours(self) -> f64 {
        NON_CRITICAL_HOURS[self.index()]
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct KpiQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub asset_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderIndicators {
    pub total_orders: u64,
    pub pct_completed: f64,
    pub pct_pending: f64,
    pub pct_material: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PeriodPoint {
    pub period: i32,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssetOrderIndicators {
    pub asset_id: i32,
    pub indicators: OrderIndicators,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderKpisResponse {
    pub total_orders: u64,
    pub pct_completed: f64,
    pub pct_pending: f64,
    pub pct_material: f64,
    pub corrective: Vec<PeriodPoint>,
    pub preventive: Vec<PeriodPoint>,
    pub improvement: Vec<PeriodPoint>,
    pub human_error: Vec<PeriodPoint>,
    pub general: Vec<PeriodPoint>,
    pub by_asset: Vec<AssetOrderIndicators>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReliabilityPeriodPoint {
    pub period: i32,
    pub label: String,
    pub closed_orders: u64,
    pub mtbf: f64,
    pub mttr: f64,
    pub availability: f64,
    pub reliability: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReliabilityIndicators {
    pub closed_orders: u64,
    pub mtbf: f64,
    pub mttr: f64,
    pub availability: f64,
    pub reliability: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssetReliability {
    pub asset_id: i32,
    pub indicators: ReliabilityIndicators,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReliabilityKpisResponse {
    pub closed_orders: u64,
    pub mtbf: f64,
    pub mttr: f64,
    pub availability: f64,
    pub reliability: f64,
    pub periods: Vec<ReliabilityPeriodPoint>,
    pub by_asset: Vec<AssetReliability>,
}

/// One opened order flattened for the orders KPI aggregation
struct OrderRow {
    status: StatusKind,
    type_name: Option<String>,
    asset_id: Option<i32>,
    period: i32,
}

/// One incident of a closed order flattened for the reliability aggregation
#[derive(Clone)]
struct ReliabilityRow {
    order_id: i32,
    asset_id: i32,
    critical: bool,
    detected_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    period: i32,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean time between failures over one bucket of closed orders.
fn mtbf(operating_hours: f64, downtime_hours: f64, orders: u64) -> f64 {
    ((operating_hours - downtime_hours) / orders as f64).round()
}

/// Mean time to repair over one bucket of incidents.
fn mttr(repair_hours: f64, incidents: u64) -> f64 {
    (repair_hours / incidents as f64).round()
}

fn availability(mtbf: f64, mttr: f64) -> f64 {
    if mtbf == 0.0 && mttr == 0.0 {
        return 100.0;
    }
    let availability = mtbf / (mtbf + mttr) * 100.0;
    if availability < 0.0 {
        0.0
    } else {
        availability
    }
}

/// Exponential reliability over the period. A zero MTBF degenerates to 0%.
fn reliability(mtbf: f64, period_hours: f64) -> f64 {
    let rate = 1.0 / mtbf;
    (-rate * period_hours).exp() * 100.0
}

fn downtime_of(rows: &[&ReliabilityRow]) -> f64 {
    rows.iter()
        .filter_map(|r| {
            r.resolved_at
                .map(|res| ((res - r.detected_at).num_minutes() as f64 / 60.0).round())
        })
        .sum()
}

fn distinct_orders(rows: &[&ReliabilityRow]) -> u64 {
    rows.iter().map(|r| r.order_id).collect::<BTreeSet<_>>().len() as u64
}

fn order_indicators(rows: &[&OrderRow]) -> OrderIndicators {
    let total = rows.len() as u64;
    if total == 0 {
        return OrderIndicators {
            total_orders: 0,
            pct_completed: 0.0,
            pct_pending: 0.0,
            pct_material: 0.0,
        };
    }

    let completed = rows.iter().filter(|r| r.status == StatusKind::Closed).count();
    let pending = rows.iter().filter(|r| r.status.is_pending_family()).count();
    let material = rows.iter().filter(|r| r.status.is_material_family()).count();

    OrderIndicators {
        total_orders: total,
        pct_completed: round2(completed as f64 * 100.0 / total as f64),
        pct_pending: round2(pending as f64 * 100.0 / total as f64),
        pct_material: round2(material as f64 * 100.0 / total as f64),
    }
}

/// Continuous period grid between the first and last observed period.
/// Monthly views always span the whole year so the charts line up.
fn period_grid(periods: impl Iterator<Item = i32>, view: PeriodView) -> Vec<i32> {
    if view == PeriodView::Monthly {
        return (1..=12).collect();
    }
    let observed: BTreeSet<i32> = periods.collect();
    match (observed.iter().next(), observed.iter().next_back()) {
        (Some(&min), Some(&max)) => (min..=max).collect(),
        _ => Vec::new(),
    }
}

fn type_series(rows: &[OrderRow], type_name: &str, grid: &[i32], view: PeriodView) -> Vec<PeriodPoint> {
    grid.iter()
        .map(|&period| PeriodPoint {
            period,
            label: view.label(period),
            count: rows
                .iter()
                .filter(|r| {
                    r.period == period && r.type_name.as_deref() == Some(type_name)
                })
                .count() as u64,
        })
        .collect()
}

/// Computes KPI indicators from orders and closed-order incident histories.
#[derive(Clone)]
pub struct KpiService {
    db: Arc<DbPool>,
}

impl KpiService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn fetch_orders(
        &self,
        query: &KpiQuery,
    ) -> Result<Vec<work_order::Model>, ServiceError> {
        let db = &*self.db;

        let mut condition = Condition::all().add(work_order::Column::OpenedAt.is_not_null());
        if let Some(asset_id) = query.asset_id {
            condition = condition.add(work_order::Column::AssetId.eq(asset_id));
        }

        let orders = work_order::Entity::find()
            .filter(condition)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        // Year/month filtering happens in memory: opened_at is already loaded
        // and the catalog sizes here never justify pushing date arithmetic
        // into the SQL dialect.
        Ok(orders
            .into_iter()
            .filter(|o| match o.opened_at {
                Some(opened) => {
                    query.year.map_or(true, |y| opened.year() == y)
                        && query.month.map_or(true, |m| opened.month() == m)
                }
                None => false,
            })
            .collect())
    }

    async fn status_kinds(&self) -> Result<HashMap<i32, StatusKind>, ServiceError> {
        let db = &*self.db;
        let statuses = order_status::Entity::find()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(statuses
            .into_iter()
            .map(|s| (s.id, StatusKind::from_name(&s.name)))
            .collect())
    }

    /// Order volume and completion indicators for the selected window
    #[instrument(skip(self))]
    pub async fn order_kpis(&self, query: KpiQuery) -> Result<OrderKpisResponse, ServiceError> {
        let db = &*self.db;
        let view = PeriodView::from_query(query.year, query.month);

        let orders = self.fetch_orders(&query).await?;
        let kinds = self.status_kinds().await?;
        let types: HashMap<i32, String> = order_type::Entity::find()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let rows: Vec<OrderRow> = orders
            .iter()
            .filter_map(|o| {
                let opened = o.opened_at?;
                Some(OrderRow {
                    status: o
                        .status_id
                        .and_then(|id| kinds.get(&id).copied())
                        .unwrap_or(StatusKind::Other),
                    type_name: o.order_type_id.and_then(|id| types.get(&id).cloned()),
                    asset_id: o.asset_id,
                    period: view.period_of(opened),
                })
            })
            .collect();

        let all: Vec<&OrderRow> = rows.iter().collect();
        let totals = order_indicators(&all);

        let grid = period_grid(rows.iter().map(|r| r.period), view);

        let mut by_asset: Vec<AssetOrderIndicators> = Vec::new();
        let mut asset_ids: Vec<i32> = rows.iter().filter_map(|r| r.asset_id).collect();
        asset_ids.sort_unstable();
        asset_ids.dedup();
        for asset_id in asset_ids {
            let asset_rows: Vec<&OrderRow> = rows
                .iter()
                .filter(|r| r.asset_id == Some(asset_id))
                .collect();
            by_asset.push(AssetOrderIndicators {
                asset_id,
                indicators: order_indicators(&asset_rows),
            });
        }
        by_asset.sort_by(|a, b| b.indicators.total_orders.cmp(&a.indicators.total_orders));

        let general = grid
            .iter()
            .map(|&period| PeriodPoint {
                period,
                label: view.label(period),
                count: rows.iter().filter(|r| r.period == period).count() as u64,
            })
            .collect();

        Ok(OrderKpisResponse {
            total_orders: totals.total_orders,
            pct_completed: totals.pct_completed,
            pct_pending: totals.pct_pending,
            pct_material: totals.pct_material,
            corrective: type_series(&rows, "Correctiva", &grid, view),
            preventive: type_series(&rows, "Preventiva", &grid, view),
            improvement: type_series(&rows, "Mejora", &grid, view),
            human_error: type_series(&rows, "Falla Humana", &grid, view),
            general,
            by_asset,
        })
    }

    /// MTBF/MTTR/availability/reliability over closed orders
    #[instrument(skip(self))]
    pub async fn reliability_kpis(
        &self,
        query: KpiQuery,
    ) -> Result<ReliabilityKpisResponse, ServiceError> {
        let db = &*self.db;
        let view = PeriodView::from_query(query.year, query.month);

        let kinds = self.status_kinds().await?;
        let orders = self.fetch_orders(&query).await?;

        let closed_orders: Vec<&work_order::Model> = orders
            .iter()
            .filter(|o| {
                o.status_id
                    .and_then(|id| kinds.get(&id).copied())
                    .is_some_and(StatusKind::is_closed_family)
            })
            .collect();

        let criticals: HashMap<i32, bool> = asset::Entity::find()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|a| (a.id, a.critical))
            .collect();

        let order_ids: Vec<i32> = closed_orders.iter().map(|o| o.id).collect();
        let incidents = if order_ids.is_empty() {
            Vec::new()
        } else {
            work_order_incident::Entity::find()
                .filter(work_order_incident::Column::WorkOrderId.is_in(order_ids.clone()))
                .all(db)
                .await
                .map_err(ServiceError::DatabaseError)?
        };

        let order_by_id: HashMap<i32, &work_order::Model> =
            closed_orders.iter().map(|o| (o.id, *o)).collect();

        let rows: Vec<ReliabilityRow> = incidents
            .iter()
            .filter_map(|i| {
                let order = order_by_id.get(&i.work_order_id)?;
                let opened = order.opened_at?;
                let asset_id = order.asset_id?;
                Some(ReliabilityRow {
                    order_id: order.id,
                    asset_id,
                    critical: criticals.get(&asset_id).copied().unwrap_or(false),
                    detected_at: i.detected_at,
                    resolved_at: i.resolved_at,
                    period: view.period_of(opened),
                })
            })
            .collect();

        Ok(compute_reliability(&rows, view))
    }
}

fn reliability_period_points(rows: &[ReliabilityRow], view: PeriodView) -> Vec<ReliabilityPeriodPoint> {
    let grid = period_grid(rows.iter().map(|r| r.period), view);

    grid.into_iter()
        .map(|period| {
            let in_period: Vec<&ReliabilityRow> =
                rows.iter().filter(|r| r.period == period).collect();
            let closed = distinct_orders(&in_period);

            if in_period.is_empty() {
                return ReliabilityPeriodPoint {
                    period,
                    label: view.label(period),
                    closed_orders: 0,
                    mtbf: 0.0,
                    mttr: 0.0,
                    availability: 0.0,
                    reliability: 100.0,
                };
            }

            let critical_assets = in_period
                .iter()
                .filter(|r| r.critical)
                .map(|r| r.asset_id)
                .collect::<BTreeSet<_>>()
                .len() as f64;
            let non_critical_assets = in_period
                .iter()
                .filter(|r| !r.critical)
                .map(|r| r.asset_id)
                .collect::<BTreeSet<_>>()
                .len() as f64;

            let operating = critical_assets * view.critical_hours()
                + non_critical_assets * view.non_critical_hours();
            let downtime = downtime_of(&in_period);
            let incidents = in_period.len() as u64;

            let mtbf_value = mtbf(operating, downtime, closed);
            let mttr_value = mttr(downtime, incidents);

            ReliabilityPeriodPoint {
                period,
                label: view.label(period),
                closed_orders: closed,
                mtbf: mtbf_value,
                mttr: mttr_value,
                availability: availability(mtbf_value, mttr_value),
                reliability: reliability(mtbf_value, view.non_critical_hours()),
            }
        })
        .collect()
}

fn compute_reliability(rows: &[ReliabilityRow], view: PeriodView) -> ReliabilityKpisResponse {
    let periods = reliability_period_points(rows, view);

    let all: Vec<&ReliabilityRow> = rows.iter().collect();
    let total_closed = distinct_orders(&all);

    let (mut total_mtbf, mut total_mttr, mut total_availability, mut total_reliability) =
        (0.0, 0.0, 0.0, 0.0);

    if total_closed != 0 {
        let active_periods = periods.iter().filter(|p| p.closed_orders != 0).count();
        if active_periods != 0 {
            total_mtbf = (periods.iter().map(|p| p.mtbf).sum::<f64>() / active_periods as f64).round();
        }
        let total_downtime = downtime_of(&all);
        total_mttr = mttr(total_downtime, all.len() as u64);
        total_availability = availability(total_mtbf, total_mttr);
        if !periods.is_empty() {
            total_reliability =
                (periods.iter().map(|p| p.reliability).sum::<f64>() / periods.len() as f64).round();
        }
    }

    let mut asset_ids: Vec<i32> = rows.iter().map(|r| r.asset_id).collect();
    asset_ids.sort_unstable();
    asset_ids.dedup();

    let mut by_asset = Vec::new();
    for asset_id in asset_ids {
        let asset_rows: Vec<ReliabilityRow> = rows
            .iter()
            .filter(|r| r.asset_id == asset_id)
            .cloned()
            .collect();
        let asset_refs: Vec<&ReliabilityRow> = asset_rows.iter().collect();
        let closed = distinct_orders(&asset_refs);
        if closed == 0 {
            continue;
        }

        let points = reliability_period_points(&asset_rows, view);
        let active_points = points.iter().filter(|p| p.closed_orders != 0).count();
        let asset_mtbf = if active_points != 0 {
            (points.iter().map(|p| p.mtbf).sum::<f64>() / active_points as f64).round()
        } else {
            0.0
        };
        let asset_mttr = mttr(downtime_of(&asset_refs), asset_refs.len() as u64);
        let asset_reliability = if points.is_empty() {
            0.0
        } else {
            (points.iter().map(|p| p.reliability).sum::<f64>() / points.len() as f64).round()
        };

        by_asset.push(AssetReliability {
            asset_id,
            indicators: ReliabilityIndicators {
                closed_orders: closed,
                mtbf: asset_mtbf,
                mttr: asset_mttr,
                availability: availability(asset_mtbf, asset_mttr),
                reliability: asset_reliability,
            },
        });
    }
    by_asset.sort_by(|a, b| b.indicators.closed_orders.cmp(&a.indicators.closed_orders));

    ReliabilityKpisResponse {
        closed_orders: total_closed,
        mtbf: total_mtbf,
        mttr: total_mttr,
        availability: total_availability,
        reliability: total_reliability,
        periods,
        by_asset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn mtbf_subtracts_downtime_and_divides_by_orders() {
        assert_eq!(mtbf(720.0, 20.0, 7), 100.0);
    }

    #[test]
    fn mttr_divides_repair_time_by_incidents() {
        assert_eq!(mttr(45.0, 9), 5.0);
    }

    #[test]
    fn availability_handles_degenerate_inputs() {
        assert_eq!(availability(0.0, 0.0), 100.0);
        assert_eq!(availability(-50.0, 10.0), 0.0);
        let a = availability(90.0, 10.0);
        assert!((a - 90.0).abs() < 1e-9);
    }

    #[test]
    fn reliability_decays_with_period_length() {
        let short = reliability(1000.0, 80.0);
        let long = reliability(1000.0, 320.0);
        assert!(short > long);
        assert_eq!(reliability(0.0, 80.0), 0.0);
    }

    #[test]
    fn order_indicators_split_by_status_family() {
        let rows = vec![
            OrderRow {
                status: StatusKind::Closed,
                type_name: Some("Correctiva".into()),
                asset_id: Some(1),
                period: 1,
            },
            OrderRow {
                status: StatusKind::Open,
                type_name: Some("Correctiva".into()),
                asset_id: Some(1),
                period: 1,
            },
            OrderRow {
                status: StatusKind::OpenPendingMaterial,
                type_name: Some("Preventiva".into()),
                asset_id: Some(2),
                period: 2,
            },
            OrderRow {
                status: StatusKind::InProgress,
                type_name: None,
                asset_id: None,
                period: 2,
            },
        ];
        let refs: Vec<&OrderRow> = rows.iter().collect();
        let ind = order_indicators(&refs);
        assert_eq!(ind.total_orders, 4);
        assert_eq!(ind.pct_completed, 25.0);
        assert_eq!(ind.pct_pending, 50.0);
        assert_eq!(ind.pct_material, 25.0);
    }

    #[test]
    fn period_grid_is_contiguous_and_monthly_spans_the_year() {
        assert_eq!(
            period_grid([3, 7, 5].into_iter(), PeriodView::Weekly),
            vec![3, 4, 5, 6, 7]
        );
        assert_eq!(
            period_grid([4].into_iter(), PeriodView::Monthly).len(),
            12
        );
        assert!(period_grid(std::iter::empty(), PeriodView::Annual).is_empty());
    }

    #[test]
    fn empty_periods_default_to_full_reliability() {
        let rows = vec![
            ReliabilityRow {
                order_id: 1,
                asset_id: 1,
                critical: false,
                detected_at: ts(2025, 1, 5, 8),
                resolved_at: Some(ts(2025, 1, 5, 16)),
                period: 1,
            },
            ReliabilityRow {
                order_id: 2,
                asset_id: 1,
                critical: false,
                detected_at: ts(2025, 3, 5, 8),
                resolved_at: Some(ts(2025, 3, 5, 12)),
                period: 3,
            },
        ];
        let points = reliability_period_points(&rows, PeriodView::Weekly);
        // Weekly grid is contiguous between the observed periods
        assert_eq!(points.len(), 3);
        let empty = &points[1];
        assert_eq!(empty.closed_orders, 0);
        assert_eq!(empty.reliability, 100.0);
        assert_eq!(empty.mtbf, 0.0);
    }

    #[test]
    fn reliability_period_point_uses_downtime_and_distinct_orders() {
        // One non-critical asset, one order, two incidents: 8h + 4h downtime.
        let rows = vec![
            ReliabilityRow {
                order_id: 1,
                asset_id: 1,
                critical: false,
                detected_at: ts(2025, 1, 5, 8),
                resolved_at: Some(ts(2025, 1, 5, 16)),
                period: 2,
            },
            ReliabilityRow {
                order_id: 1,
                asset_id: 1,
                critical: false,
                detected_at: ts(2025, 1, 6, 8),
                resolved_at: Some(ts(2025, 1, 6, 12)),
                period: 2,
            },
        ];
        let points = reliability_period_points(&rows, PeriodView::Weekly);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.closed_orders, 1);
        // operating 80h, downtime 12h => MTBF 68; repairs 12h over 2 incidents => MTTR 6
        assert_eq!(p.mtbf, 68.0);
        assert_eq!(p.mttr, 6.0);
    }

    #[test]
    fn totals_are_zero_without_closed_orders() {
        let response = compute_reliability(&[], PeriodView::Annual);
        assert_eq!(response.closed_orders, 0);
        assert_eq!(response.mtbf, 0.0);
        assert_eq!(response.availability, 0.0);
        assert!(response.periods.is_empty());
        assert!(response.by_asset.is_empty());
    }
}
