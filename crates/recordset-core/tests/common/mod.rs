//! Test doubles and common utilities for record set contract tests
//!
//! The in-memory control plane from the library does most of the work;
//! this module adds a recording wrapper and the fixtures the scenarios share.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use recordset_core::{
    ControlPlaneClient, Error, MemoryControlPlane, Reconciler, ReconcilerConfig, RecordSet,
    RecordSetPatch, RecordSetSpec, RecordType,
};

/// Zone used by every scenario
pub const ZONE_ID: &str = "zone-2b1a";

/// A client that records every call before delegating to a memory control plane
#[derive(Clone)]
pub struct RecordingClient {
    inner: MemoryControlPlane,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingClient {
    pub fn new(inner: MemoryControlPlane) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Calls seen so far, e.g. `get`, `update:records,ttl`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than `get`
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != "get")
            .collect()
    }

    pub fn control_plane(&self) -> &MemoryControlPlane {
        &self.inner
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl ControlPlaneClient for RecordingClient {
    async fn create(&self, zone_id: &str, spec: &RecordSetSpec) -> Result<String, Error> {
        self.record("create");
        self.inner.create(zone_id, spec).await
    }

    async fn get(&self, zone_id: &str, id: &str) -> Result<RecordSet, Error> {
        self.record("get");
        self.inner.get(zone_id, id).await
    }

    async fn update(
        &self,
        zone_id: &str,
        id: &str,
        patch: &RecordSetPatch,
    ) -> Result<RecordSet, Error> {
        let fields: Vec<&str> = patch.fields().iter().map(|f| f.as_str()).collect();
        self.record(format!("update:{}", fields.join(",")));
        self.inner.update(zone_id, id, patch).await
    }

    async fn delete(&self, zone_id: &str, id: &str) -> Result<(), Error> {
        self.record("delete");
        self.inner.delete(zone_id, id).await
    }

    fn supports_partial_update(&self) -> bool {
        self.inner.supports_partial_update()
    }

    fn client_name(&self) -> &'static str {
        "recording"
    }
}

/// Configuration with a short poll interval so scenarios run quickly
pub fn fast_config() -> ReconcilerConfig {
    ReconcilerConfig::new().with_poll_interval(Duration::from_millis(5))
}

/// Reconciler over a shared memory control plane
pub fn reconciler(control_plane: &MemoryControlPlane) -> Reconciler {
    Reconciler::new(Arc::new(control_plane.clone()), fast_config())
        .expect("reconciler construction succeeds")
}

/// Reconciler over a recording client
pub fn recording_reconciler(client: &RecordingClient) -> Reconciler {
    Reconciler::new(Arc::new(client.clone()), fast_config())
        .expect("reconciler construction succeeds")
}

/// The basic A record set used across scenarios
pub fn basic_spec() -> RecordSetSpec {
    RecordSetSpec::new(
        ZONE_ID,
        "acc-test.example.com.",
        RecordType::A,
        ["10.1.0.0"],
    )
    .with_ttl(3000)
    .with_description("a record set")
}

/// The basic record set after every mutable field changed
pub fn updated_spec() -> RecordSetSpec {
    basic_spec()
        .with_records(["10.1.0.1"])
        .with_ttl(6000)
        .with_description("an updated record set")
}
