//! The document store seam.
//!
//! Paging only needs three read operations from a store: count matching
//! documents, run a find with skip/limit/sort, and run an aggregation pipeline.
//! [`crate::memory::MemoryCollection`] is the in-process implementation; a
//! driver-backed collection implements the same trait.

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use serde::{Deserialize, Serialize};

use crate::query::Collation;

/// Error raised by a source; surfaced to callers as [`crate::errors::PageError::Query`].
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountOptions {
    pub collation: Option<Collation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateOptions {
    pub collation: Option<Collation>,
}

/// Options for [`DocumentSource::find`].
///
/// - `sort` is an ordered key document (`{"price": -1, "name": 1}`).
/// - `projection` is applied after sorting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub collation: Option<Collation>,
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Name used in logs and bench lines.
    fn name(&self) -> String;

    async fn count_documents(
        &self,
        filter: &Document,
        options: &CountOptions,
    ) -> Result<u64, SourceError>;

    async fn find(
        &self,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, SourceError>;

    async fn aggregate(
        &self,
        pipeline: &[Document],
        options: &AggregateOptions,
    ) -> Result<Vec<Document>, SourceError>;
}

#[async_trait]
impl<T: DocumentSource + ?Sized> DocumentSource for Arc<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    async fn count_documents(
        &self,
        filter: &Document,
        options: &CountOptions,
    ) -> Result<u64, SourceError> {
        (**self).count_documents(filter, options).await
    }

    async fn find(
        &self,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, SourceError> {
        (**self).find(filter, options).await
    }

    async fn aggregate(
        &self,
        pipeline: &[Document],
        options: &AggregateOptions,
    ) -> Result<Vec<Document>, SourceError> {
        (**self).aggregate(pipeline, options).await
    }
}
