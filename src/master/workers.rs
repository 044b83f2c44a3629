use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::wire::{WorkerInfo, WorkerNetAddress};

/// Master-side record for one registered worker.
///
/// The heartbeat timestamp is atomic so heartbeats can stamp it under the
/// registry's shared lock while the lost-worker detector reads it.
#[derive(Debug)]
pub struct MasterWorkerInfo {
    id: u64,
    address: WorkerNetAddress,
    last_updated_ms: AtomicU64,
}

impl MasterWorkerInfo {
    pub fn new(id: u64, address: WorkerNetAddress, now_ms: u64) -> Self {
        Self {
            id,
            address,
            last_updated_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn address(&self) -> &WorkerNetAddress {
        &self.address
    }

    pub fn last_updated_ms(&self) -> u64 {
        self.last_updated_ms.load(Ordering::SeqCst)
    }

    pub fn touch(&self, now_ms: u64) {
        self.last_updated_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn to_worker_info(&self) -> WorkerInfo {
        WorkerInfo {
            id: self.id,
            address: self.address.clone(),
            last_updated_ms: self.last_updated_ms(),
        }
    }
}

/// Worker records indexed by id and by address at once.
///
/// Both indices always agree: every mutation goes through `insert`/`remove`,
/// which update them together. Callers guard the whole structure with a
/// reader/writer lock; iteration happens under the shared side and must not
/// mutate.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    by_id: HashMap<u64, Arc<MasterWorkerInfo>>,
    id_by_address: HashMap<WorkerNetAddress, u64>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record. Returns false (and leaves the registry unchanged)
    /// if either key is already present; evict the old record first.
    pub fn insert(&mut self, worker: Arc<MasterWorkerInfo>) -> bool {
        if self.by_id.contains_key(&worker.id()) || self.id_by_address.contains_key(worker.address())
        {
            return false;
        }
        self.id_by_address.insert(worker.address().clone(), worker.id());
        self.by_id.insert(worker.id(), worker);
        true
    }

    /// Removes by id, dropping both index entries atomically.
    pub fn remove(&mut self, worker_id: u64) -> Option<Arc<MasterWorkerInfo>> {
        let worker = self.by_id.remove(&worker_id)?;
        self.id_by_address.remove(worker.address());
        Some(worker)
    }

    pub fn contains_address(&self, address: &WorkerNetAddress) -> bool {
        self.id_by_address.contains_key(address)
    }

    pub fn get_by_address(&self, address: &WorkerNetAddress) -> Option<&Arc<MasterWorkerInfo>> {
        self.id_by_address
            .get(address)
            .and_then(|id| self.by_id.get(id))
    }

    pub fn get_by_id(&self, worker_id: u64) -> Option<&Arc<MasterWorkerInfo>> {
        self.by_id.get(&worker_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MasterWorkerInfo>> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
