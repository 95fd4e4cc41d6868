pub mod extractor;
pub mod numeric;
pub mod page;

pub use extractor::*;
pub use numeric::*;
pub use page::*;
