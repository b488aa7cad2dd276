pub mod model;
pub mod recipients;
pub mod repo;

pub use model::{Driver, LineItem, Settlement, SettlementTotals};
pub use recipients::{dedup_selection, resolve_recipients};
pub use repo::SettlementsRepo;
