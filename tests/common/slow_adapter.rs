//! An adapter with controllable per-page latency, for racing fetches

#![allow(dead_code)]

use async_trait::async_trait;
use rowset::{AdapterResult, DataAdapter, DataQuery, DataResponse};
use std::collections::HashMap;
use std::time::Duration;

/// Returns an empty page after a configured delay, so tests can make an
/// earlier request resolve later than the one that superseded it.
#[derive(Default)]
pub struct SlowAdapter {
    delays: HashMap<u32, Duration>,
}

impl SlowAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, page: u32, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }
}

#[async_trait]
impl DataAdapter for SlowAdapter {
    async fn fetch(&self, query: &DataQuery) -> AdapterResult<DataResponse> {
        let page = query.page.unwrap_or(1);
        if let Some(delay) = self.delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }
        Ok(DataResponse {
            data: Vec::new(),
            total: 100,
            page,
            page_size: query.page_size.unwrap_or(10),
            metadata: None,
        })
    }
}
