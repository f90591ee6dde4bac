//! In-memory record store

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{to_rec_id, Endpoint, EndpointUpdate, NewEndpoint, RecordStore, StoreError};

/// Endpoints returned by `list_first_page` unless configured otherwise
pub const DEFAULT_FIRST_PAGE_SIZE: usize = 100;

/// Record store held in process memory, in creation order
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<Vec<Endpoint>>,
    first_page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            first_page_size: DEFAULT_FIRST_PAGE_SIZE,
        }
    }

    /// Set how many endpoints `list_first_page` returns
    pub fn with_first_page_size(mut self, size: usize) -> Self {
        self.first_page_size = size;
        self
    }

    /// Number of stored endpoints
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn next_id() -> String {
        to_rec_id(&Uuid::new_v4().simple().to_string())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, id: &str) -> Result<Endpoint, StoreError> {
        self.records
            .read()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, records: Vec<NewEndpoint>) -> Result<Vec<Endpoint>, StoreError> {
        let created: Vec<Endpoint> = records
            .into_iter()
            .map(|new| Endpoint {
                id: Self::next_id(),
                id_prop_name: new.id_prop_name,
                raw: new.raw,
            })
            .collect();

        self.records.write().extend(created.iter().cloned());
        debug!(count = created.len(), "endpoints created");
        Ok(created)
    }

    async fn update(&self, records: Vec<EndpointUpdate>) -> Result<Vec<Endpoint>, StoreError> {
        let mut stored = self.records.write();

        let mut positions = Vec::with_capacity(records.len());
        for update in &records {
            let position = stored
                .iter()
                .position(|e| e.id == update.id)
                .ok_or_else(|| StoreError::NotFound(update.id.clone()))?;
            positions.push(position);
        }

        let mut updated = Vec::with_capacity(records.len());
        for (update, position) in records.into_iter().zip(positions) {
            let endpoint = &mut stored[position];
            if let Some(id_prop_name) = update.id_prop_name {
                endpoint.id_prop_name = id_prop_name;
            }
            if let Some(raw) = update.raw {
                endpoint.raw = raw;
            }
            updated.push(endpoint.clone());
        }

        debug!(count = updated.len(), "endpoints updated");
        Ok(updated)
    }

    async fn destroy(&self, id: &str) -> Result<Endpoint, StoreError> {
        let mut stored = self.records.write();
        let position = stored
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        debug!(id, "endpoint destroyed");
        Ok(stored.remove(position))
    }

    async fn list_first_page(&self) -> Result<Vec<Endpoint>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .take(self.first_page_size)
            .cloned()
            .collect())
    }
}
