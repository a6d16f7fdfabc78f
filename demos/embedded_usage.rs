//! Minimal embedding example for recordset-core
//!
//! This example drives one record set through its lifecycle with the
//! in-memory control plane standing in for a real DNS service. The
//! application owns the handle and decides when each step runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use recordset_core::{
    ControlPlaneClient, ExistenceVerifier, MemoryControlPlane, OperationContext, Reconciler,
    ReconcilerConfig, RecordSet, RecordSetPatch, RecordSetSpec, RecordType, Result,
};

/// Custom client that counts calls before handing them to the memory control plane
struct CountingClient {
    inner: MemoryControlPlane,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ControlPlaneClient for CountingClient {
    async fn create(&self, zone_id: &str, spec: &RecordSetSpec) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create(zone_id, spec).await
    }

    async fn get(&self, zone_id: &str, id: &str) -> Result<RecordSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(zone_id, id).await
    }

    async fn update(&self, zone_id: &str, id: &str, patch: &RecordSetPatch) -> Result<RecordSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.update(zone_id, id, patch).await
    }

    async fn delete(&self, zone_id: &str, id: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(zone_id, id).await
    }

    fn client_name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedded recordset-core Example ===\n");

    // A control plane that takes a few reads to catch up with its writes
    let control_plane = MemoryControlPlane::new()
        .with_visibility_lag(2)
        .with_pending_reads(2)
        .with_deletion_lag(2);
    let calls = Arc::new(AtomicUsize::new(0));
    let client: Arc<dyn ControlPlaneClient> = Arc::new(CountingClient {
        inner: control_plane,
        calls: calls.clone(),
    });

    let config = ReconcilerConfig::new().with_poll_interval(Duration::from_millis(50));
    let reconciler = Reconciler::new(client.clone(), config)?;
    let ctx = OperationContext::new();

    println!("1. Creating record set...");
    let desired = RecordSetSpec::new("zone-1", "www.example.com.", RecordType::A, ["10.1.0.0"])
        .with_ttl(3000)
        .with_description("a record set");
    let (id, created) = reconciler.create(&desired, &ctx).await?;
    let token = id.to_string();
    println!("   handle: {}", token);
    println!(
        "   state:  {}",
        serde_json::Value::Object(created.attributes())
    );

    println!("\n2. Updating only the TTL...");
    let updated = reconciler
        .update(&token, &desired.clone().with_ttl(1500), &ctx)
        .await?;
    println!("   ttl is now {:?}", updated.ttl);

    println!("\n3. Re-applying the same spec (no remote change expected)...");
    let before = calls.load(Ordering::SeqCst);
    reconciler
        .update(&token, &desired.clone().with_ttl(1500), &ctx)
        .await?;
    println!(
        "   {} call(s), all reads",
        calls.load(Ordering::SeqCst) - before
    );

    println!("\n4. Deleting...");
    reconciler.delete(&token, &ctx).await?;

    println!("\n5. Verifying destroy...");
    ExistenceVerifier::new(client)
        .assert_absent_token(&token)
        .await?;
    println!("   record set is gone");

    println!(
        "\n=== Example complete ({} control-plane calls) ===",
        calls.load(Ordering::SeqCst)
    );

    Ok(())
}
