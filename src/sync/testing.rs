//! In-memory backend used by the sync tests

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::domain::{EntityKind, Record};
use crate::error::{Error, Result};
use crate::sync::{PageFetcher, PageRequest};

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Row {
    pub id: String,
    pub name: String,
}

impl Row {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn range(start: usize, end: usize) -> Vec<Row> {
        (start..end)
            .map(|i| Row::new(format!("row-{i}"), format!("name-{i}")))
            .collect()
    }
}

impl Record for Row {
    const KIND: EntityKind = EntityKind::Clients;

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Scripted backend: pages over a row list, records every call, can fail
/// or hold responses until released
pub struct MemoryBackend {
    rows: Mutex<Vec<Row>>,
    calls: Mutex<Vec<PageRequest>>,
    failures: Mutex<VecDeque<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl MemoryBackend {
    pub fn with_rows(rows: Vec<Row>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            gate: None,
        })
    }

    /// Responses wait for `release` before resolving
    pub fn gated(rows: Vec<Row>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            gate: Some(Arc::new(Semaphore::new(0))),
        })
    }

    pub fn release(&self, responses: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(responses);
        }
    }

    pub fn fail_next(&self, message: &str) {
        self.failures.lock().push_back(message.to_string());
    }

    pub fn delete(&self, id: &str) {
        self.rows.lock().retain(|r| r.id != id);
    }

    pub fn calls(&self) -> Vec<PageRequest> {
        self.calls.lock().clone()
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.calls.lock().iter().map(|c| c.page).collect()
    }

    pub fn searches_requested(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|c| c.key.search().to_string())
            .collect()
    }
}

impl PageFetcher for MemoryBackend {
    type Record = Row;

    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<Vec<Row>>> {
        self.calls.lock().push(request.clone());

        // The response is computed when the request is issued
        let response = match self.failures.lock().pop_front() {
            Some(message) => Err(Error::Api {
                status: 500,
                message,
            }),
            None => {
                let search = request.key.search().to_string();
                let matching: Vec<Row> = self
                    .rows
                    .lock()
                    .iter()
                    .filter(|r| search.is_empty() || r.name.contains(&search))
                    .cloned()
                    .collect();
                let start = (request.page as usize - 1) * request.limit as usize;
                Ok(matching
                    .into_iter()
                    .skip(start)
                    .take(request.limit as usize)
                    .collect())
            }
        };

        let gate = self.gate.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                let permit = gate.acquire_owned().await.map_err(|_| Error::Invalid {
                    message: "gate closed".into(),
                })?;
                permit.forget();
            }
            response
        })
    }
}
