// # Control Plane Client Trait
//
// Defines the interface to the remote DNS control plane that owns record sets.
//
// ## Implementations
//
// - DNS v2 (Designate-compatible) HTTP API: `recordset-client-designate` crate
// - In-process: `recordset_core::MemoryControlPlane`
//
// ## Usage
//
// ```rust,ignore
// use recordset_core::ControlPlaneClient;
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let client = /* ControlPlaneClient implementation */;
//
//     let id = client.create("zone-id", &spec).await?;
//     let current = client.get("zone-id", &id).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::types::{RecordSet, RecordSetPatch, RecordSetSpec};

/// Trait for DNS control-plane clients
///
/// Implementations translate these four calls to the control plane's API.
/// They must be thread-safe: one client is shared by every record set the
/// host manages.
///
/// # Absence
///
/// A resource that does not exist is reported as [`Error::NotFound`](crate::Error::NotFound)
/// and nothing else. The reconciler relies on this to tell "gone" apart
/// from "failed".
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoint only
/// - ✅ Parse control-plane responses
/// - ✅ Return success or failure (the reconciler decides what to do)
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Retry, back off or poll (owned by the reconciler's `wait_until`)
/// - ❌ Cache state beyond a single request
/// - ❌ Decide whether an update is needed (owned by the reconciler)
///
/// Every call may be slow and its effect may not be visible to an
/// immediately following `get`.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Create a record set in `zone_id`
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The ID assigned by the control plane
    /// - `Err(Error)`: If the request was rejected or failed
    async fn create(&self, zone_id: &str, spec: &RecordSetSpec) -> Result<String, crate::Error>;

    /// Fetch a record set
    ///
    /// # Returns
    ///
    /// - `Ok(RecordSet)`: The record set as the control plane currently reports it
    /// - `Err(Error::NotFound)`: If it does not exist
    /// - `Err(Error)`: Any other failure
    async fn get(&self, zone_id: &str, id: &str) -> Result<RecordSet, crate::Error>;

    /// Apply `patch` to a record set
    ///
    /// Only fields set in the patch are changed.
    async fn update(
        &self,
        zone_id: &str,
        id: &str,
        patch: &RecordSetPatch,
    ) -> Result<RecordSet, crate::Error>;

    /// Delete a record set
    async fn delete(&self, zone_id: &str, id: &str) -> Result<(), crate::Error>;

    /// Whether `update` accepts several fields in one call
    ///
    /// When `false` the reconciler sends one call per changed field.
    fn supports_partial_update(&self) -> bool {
        true
    }

    /// Get the client name (for logging/debugging)
    fn client_name(&self) -> &'static str;
}
