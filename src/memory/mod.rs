//! In-process [`DocumentSource`] over a `Vec<bson::Document>`.
//!
//! Understands the subset of the Mongo query language that paging needs:
//! comparison/set/existence operators, `$and`/`$or`/`$nor`/`$not`, ordered
//! multi-key sorts, 0/1 projections and the pipeline stages listed on
//! [`run_pipeline`]. Anything else is rejected with a [`MemoryError`] rather
//! than silently ignored.

mod eval;
mod filter;
mod pipeline;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use parking_lot::RwLock;
use thiserror::Error;

use crate::query::Collation;
use crate::source::{AggregateOptions, CountOptions, DocumentSource, FindOptions, SourceError};
use crate::utils::num::{u64_to_usize_saturating, usize_to_u64};

pub use filter::{CmpOp, Filter, eval_filter, parse_filter};
pub use pipeline::run_pipeline;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unrecognized pipeline stage name: '{0}'")]
    UnknownStage(String),

    #[error("invalid pipeline stage: {0}")]
    InvalidStage(String),

    #[error("invalid sort: {0}")]
    InvalidSort(String),

    #[error("invalid projection: {0}")]
    InvalidProjection(String),
}

pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
}

fn ignores_case(collation: Option<&Collation>) -> bool {
    collation.is_some_and(Collation::ignores_case)
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), docs: RwLock::new(Vec::new()) }
    }

    pub fn with_documents(name: impl Into<String>, docs: impl IntoIterator<Item = Document>) -> Self {
        let col = Self::new(name);
        col.insert_many(docs);
        col
    }

    /// Inserts a document, assigning an `_id` when it has none. Returns the `_id`.
    pub fn insert_one(&self, doc: Document) -> Bson {
        if let Some(id) = doc.get("_id").cloned() {
            self.docs.write().push(doc);
            return id;
        }
        let id = Bson::ObjectId(ObjectId::new());
        let mut with_id = Document::new();
        with_id.insert("_id", id.clone());
        for (k, v) in doc {
            with_id.insert(k, v);
        }
        self.docs.write().push(with_id);
        id
    }

    pub fn insert_many(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Bson> {
        docs.into_iter().map(|d| self.insert_one(d)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn clear(&self) {
        self.docs.write().clear();
    }

    /// # Errors
    /// Fails when the filter cannot be parsed.
    pub fn count_matching(&self, filter: &Document) -> Result<u64, MemoryError> {
        let filter = parse_filter(filter)?;
        let n = self.docs.read().iter().filter(|d| eval_filter(d, &filter)).count();
        Ok(usize_to_u64(n))
    }

    /// Filter, sort, skip, limit, then project. A limit of 0 or below means no limit.
    ///
    /// # Errors
    /// Fails when the filter, sort or projection is not supported.
    pub fn find_docs(&self, filter: &Document, opts: &FindOptions) -> Result<Vec<Document>, MemoryError> {
        let filter = parse_filter(filter)?;
        let mut docs: Vec<Document> =
            self.docs.read().iter().filter(|d| eval_filter(d, &filter)).cloned().collect();
        if let Some(sort) = &opts.sort {
            eval::validate_sort(sort)?;
            let ignore_case = ignores_case(opts.collation.as_ref());
            docs.sort_by(|a, b| eval::compare_docs(a, b, sort, ignore_case));
        }
        let skip = u64_to_usize_saturating(opts.skip.unwrap_or(0));
        let limit = opts
            .limit
            .filter(|l| *l > 0)
            .and_then(crate::utils::num::i64_to_usize)
            .unwrap_or(usize::MAX);
        let docs = docs.into_iter().skip(skip).take(limit);
        Ok(match &opts.projection {
            Some(p) => docs.map(|d| eval::project(&d, p)).collect::<Result<Vec<_>, _>>()?,
            None => docs.collect(),
        })
    }

    /// # Errors
    /// Fails on unknown or malformed stages.
    pub fn aggregate_docs(
        &self,
        stages: &[Document],
        collation: Option<&Collation>,
    ) -> Result<Vec<Document>, MemoryError> {
        let docs = self.docs.read().clone();
        run_pipeline(docs, stages, ignores_case(collation))
    }
}

#[async_trait]
impl DocumentSource for MemoryCollection {
    fn name(&self) -> String {
        self.name.clone()
    }

    // String equality here is always binary, so collation only affects sorting.
    async fn count_documents(&self, filter: &Document, _options: &CountOptions) -> Result<u64, SourceError> {
        Ok(self.count_matching(filter)?)
    }

    async fn find(&self, filter: &Document, options: &FindOptions) -> Result<Vec<Document>, SourceError> {
        Ok(self.find_docs(filter, options)?)
    }

    async fn aggregate(
        &self,
        pipeline: &[Document],
        options: &AggregateOptions,
    ) -> Result<Vec<Document>, SourceError> {
        Ok(self.aggregate_docs(pipeline, options.collation.as_ref())?)
    }
}
