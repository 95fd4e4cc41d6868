pub mod ledger;
pub mod live_tracker;
pub mod pnl_calculator;
pub mod portfolio;
pub mod scheduler;
pub mod trade_desk;

pub use ledger::*;
pub use live_tracker::*;
pub use pnl_calculator::*;
pub use portfolio::*;
pub use scheduler::*;
pub use trade_desk::*;
