//! Concrete workflow entities.
//!
//! Each submodule declares one entity's status enum, its transition table
//! and its typed record. The instrument records carry no workflow but expose
//! the derived engineering metrics shown next to them.

mod change_control;
mod chemical_analysis;
mod instruments;
mod stock_item;
mod stock_movement;
mod user_account;

pub use change_control::{ChangeControl, ChangeControlStatus};
pub use chemical_analysis::{ChemicalAnalysis, ChemicalAnalysisStatus};
pub use instruments::{MeasurementPoint, OrificePlate, StraightRun};
pub use stock_item::{StockItem, StockItemStatus, QUARANTINE_FLAG};
pub use stock_movement::{StockMovement, StockMovementStatus};
pub use user_account::{UserAccount, UserAccountStatus};
