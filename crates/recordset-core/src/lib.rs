// # recordset-core
//
// Core library for reconciling DNS record sets against a remote control plane.
//
// ## Architecture Overview
//
// This library provides the lifecycle logic for a single managed record set:
// - **ControlPlaneClient**: Trait for the remote DNS control plane API
// - **RemoteStateReader**: Fetches a record set and sorts the answer into present or absent
// - **Reconciler**: Create, read, update and delete with bounded waits for consistency
// - **ExistenceVerifier**: Post-destroy check that a record set is really gone
// - **CompositeId**: The `<zone_id>/<record_id>` handle persisted by the host
//
// ## Design Principles
//
// 1. **Library-First**: The host (CLI, provisioning engine) owns persistence and scheduling
// 2. **Injected Clients**: Every component takes an `Arc<dyn ControlPlaneClient>`
// 3. **Absence Is Data**: A missing record set is `Observed::Absent`, not an error
// 4. **Bounded Waits**: Every poll loop has a deadline and honours cancellation

pub mod config;
pub mod drift;
pub mod error;
pub mod id;
pub mod reader;
pub mod reconciler;
pub mod state;
pub mod traits;
pub mod types;
pub mod verifier;
pub mod wait;

// Re-export core types for convenience
pub use config::{ReconcilerConfig, ResourceTimeouts, TimeoutConfig};
pub use error::{Error, Result};
pub use id::CompositeId;
pub use reader::RemoteStateReader;
pub use reconciler::{LifecycleState, OperationContext, Reconciler};
pub use state::MemoryControlPlane;
pub use traits::ControlPlaneClient;
pub use types::{
    Observed, RecordField, RecordSet, RecordSetPatch, RecordSetSpec, RecordStatus, RecordType,
};
pub use verifier::ExistenceVerifier;
pub use wait::{CancelSignal, Poll, wait_until};
