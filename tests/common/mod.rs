// Shared fixtures and test-double sources for the integration suites.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bson::{Document, doc};
use pagelite::memory::MemoryCollection;
use pagelite::source::{AggregateOptions, CountOptions, DocumentSource, FindOptions, SourceError};
use parking_lot::Mutex;

/// `n` documents `{_id: i, name: "product-i", quantity: i, price: i*10+5}`.
pub fn products(n: i32) -> MemoryCollection {
    MemoryCollection::with_documents(
        "products",
        (0..n).map(|i| {
            doc! {"_id": i, "name": format!("product-{i}"), "quantity": f64::from(i), "price": f64::from(i * 10 + 5)}
        }),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Count(Document, CountOptions),
    Find(Document, FindOptions),
    Aggregate(Vec<Document>, AggregateOptions),
}

/// Forwards to a [`MemoryCollection`] and remembers every call.
pub struct RecordingSource {
    pub inner: MemoryCollection,
    pub calls: Mutex<Vec<Call>>,
}

impl RecordingSource {
    pub fn new(inner: MemoryCollection) -> Self {
        Self { inner, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DocumentSource for RecordingSource {
    fn name(&self) -> String {
        "recording".into()
    }

    async fn count_documents(&self, filter: &Document, options: &CountOptions) -> Result<u64, SourceError> {
        self.calls.lock().push(Call::Count(filter.clone(), options.clone()));
        self.inner.count_documents(filter, options).await
    }

    async fn find(&self, filter: &Document, options: &FindOptions) -> Result<Vec<Document>, SourceError> {
        self.calls.lock().push(Call::Find(filter.clone(), options.clone()));
        self.inner.find(filter, options).await
    }

    async fn aggregate(
        &self,
        pipeline: &[Document],
        options: &AggregateOptions,
    ) -> Result<Vec<Document>, SourceError> {
        self.calls.lock().push(Call::Aggregate(pipeline.to_vec(), options.clone()));
        self.inner.aggregate(pipeline, options).await
    }
}

/// Count calls fail immediately; data calls sleep for `data_delay` first.
pub struct FailingCountSource {
    pub data_delay: Duration,
    pub data_calls: AtomicUsize,
}

impl FailingCountSource {
    pub fn new(data_delay: Duration) -> Self {
        Self { data_delay, data_calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl DocumentSource for FailingCountSource {
    fn name(&self) -> String {
        "failing".into()
    }

    async fn count_documents(&self, _filter: &Document, _options: &CountOptions) -> Result<u64, SourceError> {
        Err("connection reset".into())
    }

    async fn find(&self, _filter: &Document, _options: &FindOptions) -> Result<Vec<Document>, SourceError> {
        self.data_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.data_delay).await;
        Ok(vec![doc! {"late": true}])
    }

    async fn aggregate(
        &self,
        pipeline: &[Document],
        _options: &AggregateOptions,
    ) -> Result<Vec<Document>, SourceError> {
        if pipeline.last().is_some_and(|s| s.contains_key("$count")) {
            return Err("connection reset".into());
        }
        self.data_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.data_delay).await;
        Ok(Vec::new())
    }
}

/// A [`MemoryCollection`] whose every call waits `delay` before answering.
pub struct SlowSource {
    pub inner: MemoryCollection,
    pub delay: Duration,
}

#[async_trait]
impl DocumentSource for SlowSource {
    fn name(&self) -> String {
        "slow".into()
    }

    async fn count_documents(&self, filter: &Document, options: &CountOptions) -> Result<u64, SourceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.count_documents(filter, options).await
    }

    async fn find(&self, filter: &Document, options: &FindOptions) -> Result<Vec<Document>, SourceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find(filter, options).await
    }

    async fn aggregate(
        &self,
        pipeline: &[Document],
        options: &AggregateOptions,
    ) -> Result<Vec<Document>, SourceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.aggregate(pipeline, options).await
    }
}
