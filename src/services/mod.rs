pub mod assets;
pub mod catalog;
pub mod kpis;
pub mod order_validation;
pub mod spare_parts;
pub mod work_orders;
