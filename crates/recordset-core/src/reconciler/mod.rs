//! Record set reconciler
//!
//! The Reconciler is responsible for:
//! - Creating record sets and waiting until the control plane serves them
//! - Reading current state and projecting it for drift detection
//! - Updating only the mutable fields that actually changed
//! - Deleting idempotently and waiting until the record set is gone
//!
//! ## Architecture
//!
//! ```text
//!                 create / read / update / delete
//!                              │
//!                              ▼
//!                      ┌──────────────┐
//!                      │  Reconciler  │
//!                      └──────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │ CompositeId │     │ RemoteStateRead │     │    drift    │
//! │  (decode)   │     │ (fetch/absent)  │     │  (project)  │
//! └─────────────┘     └─────────────────┘     └─────────────┘
//!                              │
//!                              ▼
//!                   ┌────────────────────┐
//!                   │ ControlPlaneClient │
//!                   └────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! `Absent -> Creating -> Present -> Updating -> Present -> Deleting -> Absent`
//!
//! The host serializes operations per record set, so nothing here locks.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{ReconcilerConfig, ResourceTimeouts};
use crate::drift;
use crate::error::{Error, Result};
use crate::id::CompositeId;
use crate::reader::RemoteStateReader;
use crate::traits::ControlPlaneClient;
use crate::types::{Observed, RecordSet, RecordSetPatch, RecordSetSpec, RecordStatus};
use crate::wait::{self, CancelSignal, Poll};

/// Record set used in error context before the control plane assigned an ID
const UNASSIGNED_ID: &str = "<unassigned>";

/// Lifecycle state of a managed record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not present on the control plane
    Absent,
    /// Create accepted, waiting to become active
    Creating,
    /// Active on the control plane
    Present,
    /// Update accepted, waiting to settle
    Updating,
    /// Delete accepted, waiting for removal
    Deleting,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Absent => "absent",
            LifecycleState::Creating => "creating",
            LifecycleState::Present => "present",
            LifecycleState::Updating => "updating",
            LifecycleState::Deleting => "deleting",
        };
        f.write_str(name)
    }
}

/// Per-call settings supplied by the host
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Timeout overrides for this resource
    pub timeouts: ResourceTimeouts,

    cancel: Option<CancelSignal>,
}

impl OperationContext {
    /// Context with default timeouts and no cancellation
    pub fn new() -> Self {
        Self::default()
    }

    /// Override timeouts for this resource
    pub fn with_timeouts(mut self, timeouts: ResourceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Abort any wait once `cancel` reads `true`
    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The cancellation signal, if any
    pub fn cancel(&self) -> Option<&CancelSignal> {
        self.cancel.as_ref()
    }
}

/// Reconciles desired record sets against the control plane
///
/// ## Threading
///
/// The reconciler holds no per-record state and can be shared across tasks
/// managing different record sets. The client is the only shared resource.
pub struct Reconciler {
    /// Control plane client
    client: Arc<dyn ControlPlaneClient>,

    /// Reader over the same client
    reader: RemoteStateReader,

    /// Default timeouts and poll interval
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `client`: Control plane client implementation
    /// - `config`: Default timeouts and poll interval
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the configuration is invalid
    pub fn new(client: Arc<dyn ControlPlaneClient>, config: ReconcilerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            reader: RemoteStateReader::new(client.clone()),
            client,
            config,
        })
    }

    /// The reader this reconciler uses
    pub fn reader(&self) -> &RemoteStateReader {
        &self.reader
    }

    /// The active configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Create a record set and wait until it is served
    ///
    /// # Returns
    ///
    /// The durable handle and the projected state read back after creation.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: `desired` failed validation; nothing was sent
    /// - `Transient`: The create call failed, or the returned ID cannot be
    ///   encoded (the record set is deleted again and its raw ID reported)
    /// - `CreateTimeout`: The record set did not become active in time
    /// - `Cancelled`: The host cancelled while waiting
    pub async fn create(
        &self,
        desired: &RecordSetSpec,
        ctx: &OperationContext,
    ) -> Result<(CompositeId, RecordSet)> {
        desired.validate()?;

        info!(
            "Creating {} record set {} in zone {} ({} -> {})",
            desired.record_type,
            desired.name,
            desired.zone_id,
            LifecycleState::Absent,
            LifecycleState::Creating
        );

        let record_id = self
            .client
            .create(&desired.zone_id, desired)
            .await
            .map_err(|e| Error::transient(&desired.zone_id, UNASSIGNED_ID, e))?;

        let id = match CompositeId::new(&desired.zone_id, &record_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    "Control plane returned record set ID '{}' that cannot be stored, deleting it",
                    record_id
                );
                if let Err(cleanup) = self.client.delete(&desired.zone_id, &record_id).await {
                    warn!("Cleanup of record set {} failed: {}", record_id, cleanup);
                }
                return Err(Error::transient(&desired.zone_id, record_id, e));
            }
        };
        let timeout = ctx.timeouts.create.unwrap_or_else(|| self.config.timeouts.create());

        let created = self
            .wait_for_active("create", &id, timeout, ctx)
            .await
            .map_err(|e| match e {
                Error::OperationTimeout {
                    timeout,
                    last_observed,
                    ..
                } => Error::CreateTimeout {
                    zone_id: id.zone_id().to_string(),
                    record_id: id.record_id().to_string(),
                    timeout,
                    last_observed,
                },
                other => other.for_record(id.zone_id(), id.record_id()),
            })?;

        info!(
            "Record set {} created ({} -> {})",
            id,
            LifecycleState::Creating,
            LifecycleState::Present
        );

        Ok((id, drift::project(created)))
    }

    /// Read the current state of a managed record set
    ///
    /// # Returns
    ///
    /// - `Ok(Observed::Present(_))`: The projected remote state
    /// - `Ok(Observed::Absent)`: The record set is gone; the host should drop it
    pub async fn read(&self, token: &str) -> Result<Observed<RecordSet>> {
        let id = CompositeId::decode(token)?;
        let observed = self.reader.fetch_by_id(id.zone_id(), id.record_id()).await?;

        if observed.is_absent() {
            info!("Record set {} no longer exists", id);
        }

        Ok(observed.map(drift::project))
    }

    /// Bring a record set in line with `desired`
    ///
    /// Only `records`, `ttl` and `description` can change in place. When
    /// nothing differs no mutating call is made and the current state is
    /// returned.
    ///
    /// # Errors
    ///
    /// - `RequiresReplacement`: zone, name or type differ
    /// - `PartialUpdateFailure`: Per-field mode and one of the calls failed
    /// - `OperationTimeout` / `Cancelled`: The update did not settle
    pub async fn update(
        &self,
        token: &str,
        desired: &RecordSetSpec,
        ctx: &OperationContext,
    ) -> Result<RecordSet> {
        let id = CompositeId::decode(token)?;
        desired.validate()?;

        let current = match self.reader.fetch_by_id(id.zone_id(), id.record_id()).await? {
            Observed::Present(current) => current,
            Observed::Absent => {
                return Err(Error::transient(
                    id.zone_id(),
                    id.record_id(),
                    Error::not_found(format!("record set {} disappeared before update", id)),
                ));
            }
        };

        let replace = drift::replacement_fields(desired, &current);
        if !replace.is_empty() {
            return Err(Error::RequiresReplacement { fields: replace });
        }

        let changed = drift::changed_fields(desired, &current);
        if changed.is_empty() {
            debug!("Record set {} already matches desired state", id);
            return Ok(drift::project(current));
        }

        info!(
            "Updating record set {} fields {:?} ({} -> {})",
            id,
            changed,
            LifecycleState::Present,
            LifecycleState::Updating
        );

        if self.client.supports_partial_update() {
            let patch = RecordSetPatch::from_fields(desired, &changed);
            self.client
                .update(id.zone_id(), id.record_id(), &patch)
                .await
                .map_err(|e| Error::transient(id.zone_id(), id.record_id(), e))?;
        } else {
            let mut committed = Vec::with_capacity(changed.len());
            for field in &changed {
                let patch = RecordSetPatch::from_fields(desired, &[*field]);
                if let Err(e) = self.client.update(id.zone_id(), id.record_id(), &patch).await {
                    warn!(
                        "Update of {} on record set {} failed after committing {:?}: {}",
                        field, id, committed, e
                    );
                    return Err(Error::PartialUpdateFailure {
                        zone_id: id.zone_id().to_string(),
                        record_id: id.record_id().to_string(),
                        committed,
                        failed: *field,
                        source: Box::new(e),
                    });
                }
                committed.push(*field);
            }
        }

        let timeout = ctx.timeouts.update.unwrap_or_else(|| self.config.timeouts.update());
        let updated = self
            .wait_for_active("update", &id, timeout, ctx)
            .await
            .map_err(|e| e.for_record(id.zone_id(), id.record_id()))?;

        if let Some(ttl) = desired.ttl
            && Some(ttl) != updated.ttl
        {
            warn!(
                "Record set {} reports ttl {:?} after requesting {}",
                id, updated.ttl, ttl
            );
        }

        info!(
            "Record set {} updated ({} -> {})",
            id,
            LifecycleState::Updating,
            LifecycleState::Present
        );

        Ok(drift::project(updated))
    }

    /// Delete a record set and wait until it is gone
    ///
    /// Deleting a record set that no longer exists succeeds, so repeated
    /// deletes and deletes racing an external removal do not fail.
    pub async fn delete(&self, token: &str, ctx: &OperationContext) -> Result<()> {
        let id = CompositeId::decode(token)?;

        info!(
            "Deleting record set {} ({} -> {})",
            id,
            LifecycleState::Present,
            LifecycleState::Deleting
        );

        match self.client.delete(id.zone_id(), id.record_id()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!("Record set {} already absent", id);
                return Ok(());
            }
            Err(e) => {
                // The delete may have raced an external removal
                if let Ok(Observed::Absent) =
                    self.reader.fetch_by_id(id.zone_id(), id.record_id()).await
                {
                    warn!("Delete of {} failed but it is already gone: {}", id, e);
                    return Ok(());
                }
                return Err(Error::transient(id.zone_id(), id.record_id(), e));
            }
        }

        let timeout = ctx.timeouts.delete.unwrap_or_else(|| self.config.timeouts.delete());
        let reader = &self.reader;
        let id = &id;
        self.wait_until(
            "delete",
            move || async move {
                match reader.fetch_by_id(id.zone_id(), id.record_id()).await? {
                    Observed::Absent => Ok(Poll::Ready(())),
                    Observed::Present(still_there) => Ok(Poll::Pending(Some(still_there))),
                }
            },
            timeout,
            ctx,
        )
        .await
        .map_err(|e| e.for_record(id.zone_id(), id.record_id()))?;

        info!(
            "Record set {} deleted ({} -> {})",
            id,
            LifecycleState::Deleting,
            LifecycleState::Absent
        );

        Ok(())
    }

    /// Poll `condition` with this reconciler's interval until it is ready
    ///
    /// See [`wait::wait_until`] for the error contract.
    pub async fn wait_until<T, F, Fut>(
        &self,
        operation: &str,
        condition: F,
        timeout: Duration,
        ctx: &OperationContext,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Poll<T>>>,
    {
        wait::wait_until(
            operation,
            timeout,
            self.config.poll_interval(),
            ctx.cancel(),
            condition,
        )
        .await
    }

    /// Wait until the record set reads back with status ACTIVE
    async fn wait_for_active(
        &self,
        operation: &str,
        id: &CompositeId,
        timeout: Duration,
        ctx: &OperationContext,
    ) -> Result<RecordSet> {
        let reader = &self.reader;
        let client_name = self.client.client_name();

        self.wait_until(
            operation,
            move || async move {
                match reader.fetch_by_id(id.zone_id(), id.record_id()).await? {
                    Observed::Present(record_set) => match record_set.status {
                        RecordStatus::Active => Ok(Poll::Ready(record_set)),
                        RecordStatus::Error => Err(Error::transient(
                            id.zone_id(),
                            id.record_id(),
                            Error::control_plane(client_name, "record set entered ERROR status"),
                        )),
                        RecordStatus::Pending => Ok(Poll::Pending(Some(record_set))),
                    },
                    Observed::Absent => Ok(Poll::Pending(None)),
                }
            },
            timeout,
            ctx,
        )
        .await
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("client", &self.client.client_name())
            .field("config", &self.config)
            .finish()
    }
}
