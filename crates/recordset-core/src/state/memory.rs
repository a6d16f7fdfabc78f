// # Memory Control Plane
//
// In-memory implementation of ControlPlaneClient.
//
// ## Purpose
//
// Behaves like a remote DNS control plane without leaving the process:
// assigns IDs, lower-cases names, fills in a default TTL, and can be told
// to lag behind its own writes the way a real control plane does.
//
// ## Eventual Consistency Knobs
//
// - `with_visibility_lag(n)`: a new record set reads as not found `n` times
// - `with_pending_reads(n)`: after create/update, `n` reads report PENDING
// - `with_deletion_lag(n)`: after delete, `n` reads still return the record set
//
// ## When to Use
//
// - Tests and contract tests
// - Embedding demos
// - Dry runs of the reconciler

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::ControlPlaneClient;
use crate::types::{RecordField, RecordSet, RecordSetPatch, RecordSetSpec, RecordStatus};

/// TTL assigned when a record set is created without one
pub const DEFAULT_TTL: u32 = 300;

const CLIENT_NAME: &str = "memory";

#[derive(Debug)]
struct Entry {
    record: RecordSet,
    hidden_reads: usize,
    pending_reads: usize,
    deleting: Option<usize>,
}

#[derive(Debug, Default)]
struct Faults {
    create: Option<Error>,
    get: Option<Error>,
    delete: Option<Error>,
    update_of: Vec<(RecordField, Error)>,
}

#[derive(Debug, Default)]
struct Counters {
    create: AtomicUsize,
    get: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
}

/// In-memory control plane
///
/// Cloning shares the underlying state and counters.
///
/// # Example
///
/// ```rust,no_run
/// use recordset_core::{ControlPlaneClient, MemoryControlPlane, RecordSetSpec, RecordType};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let control_plane = MemoryControlPlane::new();
///
///     let spec = RecordSetSpec::new("zone-1", "Example.com.", RecordType::A, ["10.1.0.0"]);
///     let id = control_plane.create("zone-1", &spec).await?;
///
///     let record_set = control_plane.get("zone-1", &id).await?;
///     assert_eq!(record_set.name, "example.com.");
///     assert_eq!(record_set.ttl, Some(300));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryControlPlane {
    inner: Arc<RwLock<HashMap<(String, String), Entry>>>,
    faults: Arc<RwLock<Faults>>,
    counters: Arc<Counters>,
    next_id: Arc<AtomicUsize>,
    default_ttl: u32,
    ttl_granularity: Option<u32>,
    visibility_lag: usize,
    pending_reads: usize,
    deletion_lag: usize,
    partial_update: bool,
}

impl MemoryControlPlane {
    /// Create an empty, immediately consistent control plane
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            faults: Arc::new(RwLock::new(Faults::default())),
            counters: Arc::new(Counters::default()),
            next_id: Arc::new(AtomicUsize::new(1)),
            default_ttl: DEFAULT_TTL,
            ttl_granularity: None,
            visibility_lag: 0,
            pending_reads: 0,
            deletion_lag: 0,
            partial_update: true,
        }
    }

    /// TTL assigned when none is requested
    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Round every stored TTL up to a multiple of `granularity`
    pub fn with_ttl_granularity(mut self, granularity: u32) -> Self {
        self.ttl_granularity = Some(granularity.max(1));
        self
    }

    /// Number of reads for which a new record set is reported as not found
    pub fn with_visibility_lag(mut self, reads: usize) -> Self {
        self.visibility_lag = reads;
        self
    }

    /// Number of reads reporting PENDING after each create or update
    pub fn with_pending_reads(mut self, reads: usize) -> Self {
        self.pending_reads = reads;
        self
    }

    /// Number of reads that still return a deleted record set
    pub fn with_deletion_lag(mut self, reads: usize) -> Self {
        self.deletion_lag = reads;
        self
    }

    /// Whether one update call may change several fields
    pub fn with_partial_update(mut self, supported: bool) -> Self {
        self.partial_update = supported;
        self
    }

    /// Fail the next `create` call with `err`
    pub async fn fail_next_create(&self, err: Error) {
        self.faults.write().await.create = Some(err);
    }

    /// Fail the next `get` call with `err`
    pub async fn fail_next_get(&self, err: Error) {
        self.faults.write().await.get = Some(err);
    }

    /// Fail the next `delete` call with `err`
    pub async fn fail_next_delete(&self, err: Error) {
        self.faults.write().await.delete = Some(err);
    }

    /// Fail the next `update` call whose patch touches `field`
    pub async fn fail_next_update_of(&self, field: RecordField, err: Error) {
        self.faults.write().await.update_of.push((field, err));
    }

    /// Remove a record set behind the reconciler's back
    pub async fn remove_external(&self, zone_id: &str, id: &str) -> bool {
        let key = (zone_id.to_string(), id.to_string());
        self.inner.write().await.remove(&key).is_some()
    }

    /// Force the stored status of a record set
    pub async fn set_status(&self, zone_id: &str, id: &str, status: RecordStatus) -> bool {
        let key = (zone_id.to_string(), id.to_string());
        match self.inner.write().await.get_mut(&key) {
            Some(entry) => {
                entry.record.status = status;
                true
            }
            None => false,
        }
    }

    /// Stored record set without touching counters or lag
    pub async fn peek(&self, zone_id: &str, id: &str) -> Option<RecordSet> {
        let key = (zone_id.to_string(), id.to_string());
        self.inner.read().await.get(&key).map(|e| e.record.clone())
    }

    /// Number of stored record sets (including ones still being deleted)
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Number of `create` calls so far
    pub fn create_calls(&self) -> usize {
        self.counters.create.load(Ordering::SeqCst)
    }

    /// Number of `get` calls so far
    pub fn get_calls(&self) -> usize {
        self.counters.get.load(Ordering::SeqCst)
    }

    /// Number of `update` calls so far
    pub fn update_calls(&self) -> usize {
        self.counters.update.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls so far
    pub fn delete_calls(&self) -> usize {
        self.counters.delete.load(Ordering::SeqCst)
    }

    /// Number of create, update and delete calls so far
    pub fn mutating_calls(&self) -> usize {
        self.create_calls() + self.update_calls() + self.delete_calls()
    }

    fn stored_ttl(&self, ttl: u32) -> u32 {
        match self.ttl_granularity {
            Some(step) => ttl.div_ceil(step) * step,
            None => ttl,
        }
    }

    fn not_found(zone_id: &str, id: &str) -> Error {
        Error::not_found(format!("record set {} in zone {}", id, zone_id))
    }
}

impl Default for MemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlaneClient for MemoryControlPlane {
    async fn create(&self, zone_id: &str, spec: &RecordSetSpec) -> Result<String, Error> {
        self.counters.create.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.faults.write().await.create.take() {
            return Err(err);
        }

        if spec.records.is_empty() {
            return Err(Error::control_plane(CLIENT_NAME, "records must not be empty"));
        }

        let id = format!("rs-{:08}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = chrono::Utc::now();
        let record = RecordSet {
            zone_id: zone_id.to_string(),
            id: id.clone(),
            name: spec.name.to_lowercase(),
            record_type: spec.record_type,
            records: spec.records.clone(),
            ttl: Some(self.stored_ttl(spec.ttl.unwrap_or(self.default_ttl))),
            description: spec.description.clone().filter(|d| !d.is_empty()),
            status: RecordStatus::Active,
            zone_name: None,
            created_at: Some(now),
            updated_at: None,
        };

        let entry = Entry {
            record,
            hidden_reads: self.visibility_lag,
            pending_reads: self.pending_reads,
            deleting: None,
        };
        self.inner
            .write()
            .await
            .insert((zone_id.to_string(), id.clone()), entry);

        Ok(id)
    }

    async fn get(&self, zone_id: &str, id: &str) -> Result<RecordSet, Error> {
        self.counters.get.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.faults.write().await.get.take() {
            return Err(err);
        }

        let key = (zone_id.to_string(), id.to_string());
        let mut guard = self.inner.write().await;
        if guard.get(&key).is_some_and(|e| e.deleting == Some(0)) {
            guard.remove(&key);
            return Err(Self::not_found(zone_id, id));
        }
        let entry = guard.get_mut(&key).ok_or_else(|| Self::not_found(zone_id, id))?;

        if entry.hidden_reads > 0 {
            entry.hidden_reads -= 1;
            return Err(Self::not_found(zone_id, id));
        }

        if let Some(remaining) = entry.deleting {
            entry.deleting = Some(remaining - 1);
            let mut record = entry.record.clone();
            record.status = RecordStatus::Pending;
            return Ok(record);
        }

        let mut record = entry.record.clone();
        if entry.pending_reads > 0 {
            entry.pending_reads -= 1;
            record.status = RecordStatus::Pending;
        }
        Ok(record)
    }

    async fn update(
        &self,
        zone_id: &str,
        id: &str,
        patch: &RecordSetPatch,
    ) -> Result<RecordSet, Error> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        {
            let mut faults = self.faults.write().await;
            let fields = patch.fields();
            if let Some(pos) = faults
                .update_of
                .iter()
                .position(|(field, _)| fields.contains(field))
            {
                let (_, err) = faults.update_of.remove(pos);
                return Err(err);
            }
        }

        if !self.partial_update && patch.fields().len() > 1 {
            return Err(Error::control_plane(
                CLIENT_NAME,
                "only one attribute may be changed per update",
            ));
        }

        let key = (zone_id.to_string(), id.to_string());
        let mut guard = self.inner.write().await;
        let entry = match guard.get_mut(&key) {
            Some(entry) if entry.deleting.is_none() && entry.hidden_reads == 0 => entry,
            _ => return Err(Self::not_found(zone_id, id)),
        };

        if let Some(ref records) = patch.records {
            if records.is_empty() {
                return Err(Error::control_plane(CLIENT_NAME, "records must not be empty"));
            }
            entry.record.records = records.clone();
        }
        if let Some(ttl) = patch.ttl {
            entry.record.ttl = Some(self.stored_ttl(ttl));
        }
        if let Some(ref description) = patch.description {
            entry.record.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        entry.record.updated_at = Some(chrono::Utc::now());
        entry.pending_reads = self.pending_reads;

        let mut record = entry.record.clone();
        if entry.pending_reads > 0 {
            record.status = RecordStatus::Pending;
        }
        Ok(record)
    }

    async fn delete(&self, zone_id: &str, id: &str) -> Result<(), Error> {
        self.counters.delete.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.faults.write().await.delete.take() {
            return Err(err);
        }

        let key = (zone_id.to_string(), id.to_string());
        let mut guard = self.inner.write().await;
        let already_deleting = guard.get(&key).map(|e| e.deleting.is_some());
        match already_deleting {
            Some(false) if self.deletion_lag == 0 => {
                guard.remove(&key);
                Ok(())
            }
            Some(false) => {
                if let Some(entry) = guard.get_mut(&key) {
                    entry.deleting = Some(self.deletion_lag);
                }
                Ok(())
            }
            _ => Err(Self::not_found(zone_id, id)),
        }
    }

    fn supports_partial_update(&self) -> bool {
        self.partial_update
    }

    fn client_name(&self) -> &'static str {
        CLIENT_NAME
    }
}
