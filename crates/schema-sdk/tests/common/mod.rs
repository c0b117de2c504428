#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use schema_sdk::{FetchError, Result, SchemaDocument, SchemaError, SchemaSource};

/// Source that serves queued documents and counts fetches.
///
/// Once the queue is empty the last response is served again.
pub struct CountingSource {
    queue: Mutex<VecDeque<Result<SchemaDocument>>>,
    last: Mutex<Option<Result<SchemaDocument>>>,
    delay: Duration,
    fetches: AtomicUsize,
}

impl CountingSource {
    pub fn new(responses: Vec<Result<SchemaDocument>>) -> Arc<Self> {
        Self::with_delay(responses, Duration::ZERO)
    }

    pub fn with_delay(responses: Vec<Result<SchemaDocument>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(responses.into()),
            last: Mutex::new(None),
            delay,
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, response: Result<SchemaDocument>) {
        self.queue.lock().push_back(response);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    async fn fetch(&self) -> Result<SchemaDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.queue.lock().pop_front();
        match next {
            Some(response) => {
                *self.last.lock() = Some(response.clone());
                response
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Err(FetchError::Network("no response queued".into()).into())),
        }
    }
}

pub fn document(json: &str) -> SchemaDocument {
    SchemaDocument::from_json(json).unwrap()
}

pub fn versioned(version: &str) -> SchemaDocument {
    document(&format!(
        r#"{{"version":"{version}","schema":{{"types":[{{"name":"It","properties":{{"code":{{"type":"Code"}}}}}}]}}}}"#
    ))
}

pub fn network_error() -> SchemaError {
    FetchError::Network("connection reset".into()).into()
}
