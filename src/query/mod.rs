// Submodules for separation of concerns
mod builder;
mod decode;
mod plan;
mod types;

pub use builder::PagingQuery;
pub use decode::DecodeTarget;
pub use types::{Collation, Order, PagedData};
