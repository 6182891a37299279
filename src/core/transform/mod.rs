//! Lead transformation
//!
//! - [`coerce`]: type coercions that never fail
//! - [`mapper`]: table-driven source → destination lead mapping
//! - [`bitrix`]: Bitrix24 field names → mapper source names

pub mod bitrix;
pub mod coerce;
pub mod mapper;

pub use bitrix::BitrixFieldMap;
pub use mapper::{lead_id, map_lead};
