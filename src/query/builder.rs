use std::time::Duration;

use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::config::PagingConfig;
use crate::errors::PageError;
use crate::paginator::Paginator;
use crate::source::DocumentSource;
use crate::utils::devlog::bench_line;
use crate::utils::num::{bson_to_i64, i64_to_u64_saturating_nonnegative, u128_to_u64_saturating, usize_to_u64};

use super::decode::{DecodeTarget, decode_into};
use super::plan::{COUNT_FIELD, Mode, Plan, QuerySpec, Work};
use super::types::{Collation, PagedData};

/// Chained configuration for one paginated query.
///
/// Configure, then call exactly one of [`PagingQuery::find`] or
/// [`PagingQuery::aggregate`]; both consume the builder.
///
/// ```no_run
/// # async fn demo(col: &pagelite::memory::MemoryCollection) -> Result<(), pagelite::errors::PageError> {
/// use bson::doc;
/// let page = pagelite::new(col)
///     .filter(doc! {"status": "active"})
///     .sort("price", -1)
///     .page(2)
///     .limit(10)
///     .find()
///     .await?;
/// println!("{} of {}", page.data.len(), page.pagination.total);
/// # Ok(())
/// # }
/// ```
pub struct PagingQuery<'a, S: DocumentSource + ?Sized> {
    source: &'a S,
    spec: QuerySpec,
    output: Option<&'a mut (dyn DecodeTarget + Send)>,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl<'a, S: DocumentSource + ?Sized> PagingQuery<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source, spec: QuerySpec::default(), output: None, deadline: None, timeout: None }
    }

    /// Applies the configured default limit and timeout. A timeout set with
    /// [`PagingQuery::timeout`] wins whether it comes before or after.
    #[must_use]
    pub fn config(mut self, cfg: &PagingConfig) -> Self {
        self.spec.default_limit = cfg.default_limit;
        if self.timeout.is_none() {
            self.timeout = cfg.timeout_ms.map(Duration::from_millis);
        }
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Document) -> Self {
        self.spec.filter = Some(filter);
        self
    }

    /// Appends pipeline stages for [`PagingQuery::aggregate`].
    #[must_use]
    pub fn stages<I: IntoIterator<Item = Document>>(mut self, stages: I) -> Self {
        self.spec.stages.get_or_insert_with(Vec::new).extend(stages);
        self
    }

    #[must_use]
    pub fn stage(self, stage: Document) -> Self {
        self.stages([stage])
    }

    /// Adds a sort key. Keys apply in call order; repeating a field replaces its
    /// direction without moving it. `value` may be `1`/`-1`, an [`super::Order`],
    /// or an expression such as `{"$meta": "textScore"}`.
    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.spec.sort.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn page(mut self, page: i64) -> Self {
        self.spec.page = Some(page);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.spec.limit = Some(limit);
        self
    }

    /// Projection for find queries.
    #[must_use]
    pub fn select(mut self, projection: Document) -> Self {
        self.spec.projection = Some(projection);
        self
    }

    #[must_use]
    pub fn collation(mut self, collation: Collation) -> Self {
        self.spec.collation = Some(collation);
        self
    }

    /// Decode the page into `out` instead of returning raw documents.
    /// Documents that do not fit `T` are skipped.
    #[must_use]
    pub fn decode<T: DeserializeOwned + Send + 'a>(mut self, out: &'a mut Vec<T>) -> Self {
        let out: &'a mut (dyn DecodeTarget + Send) = out;
        self.output = Some(out);
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to the start of execution.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs the filter as a find query.
    ///
    /// # Errors
    /// - `Validation` without a filter, with pipeline stages, or without both
    ///   `page` and `limit` having been set.
    /// - `Query` when the source fails, `Timeout` past the deadline.
    pub async fn find(self) -> Result<PagedData, PageError> {
        let plan = self.spec.plan(Mode::Find, self.output.is_some())?;
        self.run(plan).await
    }

    /// Runs the configured stages as an aggregation pipeline, with `$sort`,
    /// `$skip` and `$limit` stages appended and a `$count` pipeline for the total.
    ///
    /// # Errors
    /// - `Validation` with a filter, an output binding or a projection set, or
    ///   without both `page` and `limit` having been set.
    /// - `Query` when the source rejects a stage or fails, `Timeout` past the deadline.
    pub async fn aggregate(self) -> Result<PagedData, PageError> {
        let plan = self.spec.plan(Mode::Aggregate, self.output.is_some())?;
        self.run(plan).await
    }

    fn effective_deadline(&self, started: Instant) -> Option<Instant> {
        let relative = self.timeout.map(|t| started + t);
        match (self.deadline, relative) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    async fn run(self, plan: Plan) -> Result<PagedData, PageError> {
        let started = Instant::now();
        let deadline = self.effective_deadline(started);
        let Self { source, output, .. } = self;
        let name = source.name();
        log::debug!("paging {name}: {:?} page={} limit={}", plan.work, plan.page, plan.limit);

        let work = fetch(source, &plan.work, &name);
        let (total, docs) = match deadline {
            Some(dl) => tokio::time::timeout_at(dl, work).await.map_err(|_| PageError::Timeout {
                elapsed_ms: u128_to_u64_saturating(started.elapsed().as_millis()),
            })??,
            None => work.await?,
        };

        let pagination = Paginator::new(total, plan.page, plan.limit).pagination_data();
        let data = match output {
            Some(out) => {
                let skipped = decode_into(out, docs);
                if skipped > 0 {
                    log::warn!("{name}: {skipped} document(s) skipped while decoding page {}", plan.page);
                }
                Vec::new()
            }
            None => docs,
        };
        Ok(PagedData { data, pagination })
    }
}

/// Count and page fetch, issued together. The first failure wins.
async fn fetch<S: DocumentSource + ?Sized>(
    source: &S,
    work: &Work,
    name: &str,
) -> Result<(u64, Vec<Document>), PageError> {
    match work {
        Work::Find { filter, count, options } => {
            let total = async {
                let t = Instant::now();
                let n = source.count_documents(filter, count).await.map_err(PageError::Query)?;
                crate::dev6!("{}", bench_line("count", name, elapsed_ms(t), n));
                Ok::<_, PageError>(n)
            };
            let docs = async {
                let t = Instant::now();
                let docs = source.find(filter, options).await.map_err(PageError::Query)?;
                crate::dev6!("{}", bench_line("find", name, elapsed_ms(t), usize_to_u64(docs.len())));
                Ok::<_, PageError>(docs)
            };
            tokio::try_join!(total, docs)
        }
        Work::Aggregate { data, count, options } => {
            let total = async {
                let t = Instant::now();
                let rows = source.aggregate(count, options).await.map_err(PageError::Query)?;
                let n = rows
                    .first()
                    .and_then(|d| d.get(COUNT_FIELD))
                    .and_then(bson_to_i64)
                    .map_or(0, i64_to_u64_saturating_nonnegative);
                crate::dev6!("{}", bench_line("aggregate_count", name, elapsed_ms(t), n));
                Ok::<_, PageError>(n)
            };
            let docs = async {
                let t = Instant::now();
                let docs = source.aggregate(data, options).await.map_err(PageError::Query)?;
                crate::dev6!(
                    "{}",
                    bench_line("aggregate", name, elapsed_ms(t), usize_to_u64(docs.len()))
                );
                Ok::<_, PageError>(docs)
            };
            tokio::try_join!(total, docs)
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u128_to_u64_saturating(since.elapsed().as_millis())
}
