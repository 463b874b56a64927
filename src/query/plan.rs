use bson::{Document, doc};

use crate::errors::PageError;
use crate::paginator::{self, DEFAULT_LIMIT};
use crate::source::{AggregateOptions, CountOptions, FindOptions};
use crate::utils::num::u64_to_i64_saturating;

use super::types::Collation;

pub(crate) const COUNT_FIELD: &str = "total";

/// Everything a caller configured, independent of the source it runs against.
#[derive(Debug, Clone)]
pub(crate) struct QuerySpec {
    pub filter: Option<Document>,
    pub stages: Option<Vec<Document>>,
    pub sort: Document,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub projection: Option<Document>,
    pub collation: Option<Collation>,
    pub default_limit: i64,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filter: None,
            stages: None,
            sort: Document::new(),
            page: None,
            limit: None,
            projection: None,
            collation: None,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Find,
    Aggregate,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Work {
    Find { filter: Document, count: CountOptions, options: FindOptions },
    Aggregate { data: Vec<Document>, count: Vec<Document>, options: AggregateOptions },
}

/// A validated query: what to run, plus the clamped page window.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Plan {
    pub work: Work,
    pub page: i64,
    pub limit: i64,
}

impl QuerySpec {
    /// The single validation boundary. Nothing is sent to a source unless this succeeds.
    pub(crate) fn plan(&self, mode: Mode, has_output: bool) -> Result<Plan, PageError> {
        match mode {
            Mode::Find => {
                let Some(filter) = &self.filter else {
                    return Err(PageError::validation("missing filter"));
                };
                if self.stages.is_some() {
                    return Err(PageError::validation("pipeline stages not allowed with find"));
                }
                let (page, limit) = self.window()?;
                let options = FindOptions {
                    skip: Some(paginator::skip(page, limit)),
                    limit: Some(limit),
                    sort: (!self.sort.is_empty()).then(|| self.sort.clone()),
                    projection: self.projection.clone(),
                    collation: self.collation.clone(),
                };
                let count = CountOptions { collation: self.collation.clone() };
                Ok(Plan { work: Work::Find { filter: filter.clone(), count, options }, page, limit })
            }
            Mode::Aggregate => {
                if self.filter.is_some() {
                    return Err(PageError::validation("filter not allowed with aggregate"));
                }
                if has_output {
                    return Err(PageError::validation("decode not supported for aggregate"));
                }
                if self.projection.is_some() {
                    return Err(PageError::validation("projection not supported for aggregate"));
                }
                let (page, limit) = self.window()?;
                let stages = self.stages.clone().unwrap_or_default();

                let mut data = stages.clone();
                if !self.sort.is_empty() {
                    data.push(doc! { "$sort": self.sort.clone() });
                }
                data.push(doc! { "$skip": u64_to_i64_saturating(paginator::skip(page, limit)) });
                data.push(doc! { "$limit": limit });

                let mut count = stages;
                count.push(doc! { "$count": COUNT_FIELD });

                let options = AggregateOptions { collation: self.collation.clone() };
                Ok(Plan { work: Work::Aggregate { data, count, options }, page, limit })
            }
        }
    }

    /// Both setters must have been called; the values themselves are clamped.
    fn window(&self) -> Result<(i64, i64), PageError> {
        match (self.page, self.limit) {
            (Some(page), Some(limit)) => Ok(paginator::normalize(page, limit, self.default_limit)),
            _ => Err(PageError::validation("missing page or limit")),
        }
    }
}
