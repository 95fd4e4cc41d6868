pub mod json_store;
pub mod page_client;
pub mod redis_store;
pub mod store;

pub use json_store::*;
pub use page_client::*;
pub use redis_store::*;
pub use store::*;
