//! Offset/limit pagination over BSON document stores.
//!
//! A [`query::PagingQuery`] collects a filter (or aggregation stages), sort keys,
//! page and limit, then runs a count and a page fetch against any
//! [`source::DocumentSource`] and returns [`query::PagedData`]: the raw
//! documents plus `total`/`page`/`perPage`/`prev`/`next`/`totalPage`.

pub mod cli;
pub mod config;
pub mod errors;
pub mod memory;
pub mod paginator;
pub mod query;
pub mod source;
pub mod utils;

pub use config::PagingConfig;
pub use errors::PageError;
pub use paginator::{PaginationData, Paginator};
pub use query::{Collation, Order, PagedData, PagingQuery};
pub use source::DocumentSource;

/// Starts a paging query against `source`.
pub fn new<S: DocumentSource + ?Sized>(source: &S) -> PagingQuery<'_, S> {
    PagingQuery::new(source)
}
