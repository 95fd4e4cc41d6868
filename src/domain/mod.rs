pub mod pnl;
pub mod position;
pub mod trade;

pub use pnl::*;
pub use position::*;
pub use trade::*;
