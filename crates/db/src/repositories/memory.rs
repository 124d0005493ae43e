use tokio::sync::RwLock;

use wardhouse_core::domain::SourceSnapshot;
use wardhouse_core::errors::StorageError;
use wardhouse_core::pipeline::{SourceReader, WarehouseLoad, WarehouseSink};

/// Source collaborator backed by a snapshot held in memory.
#[derive(Default)]
pub struct InMemorySourceReader {
    snapshot: RwLock<SourceSnapshot>,
}

impl InMemorySourceReader {
    pub fn new(snapshot: SourceSnapshot) -> Self {
        Self { snapshot: RwLock::new(snapshot) }
    }

    pub async fn replace(&self, snapshot: SourceSnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

#[async_trait::async_trait]
impl SourceReader for InMemorySourceReader {
    async fn read_snapshot(&self) -> Result<SourceSnapshot, StorageError> {
        Ok(self.snapshot.read().await.clone())
    }
}

#[derive(Default)]
pub struct InMemoryWarehouseSink {
    current: RwLock<Option<WarehouseLoad>>,
}

impl InMemoryWarehouseSink {
    pub async fn current(&self) -> Option<WarehouseLoad> {
        self.current.read().await.clone()
    }
}

#[async_trait::async_trait]
impl WarehouseSink for InMemoryWarehouseSink {
    async fn replace_all(&self, load: &WarehouseLoad) -> Result<(), StorageError> {
        *self.current.write().await = Some(load.clone());
        Ok(())
    }
}
