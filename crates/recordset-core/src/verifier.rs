//! Existence verifier
//!
//! Post-destroy checks. After a record set has been deleted the host asks
//! the control plane once more and fails if the record set still answers.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::id::CompositeId;
use crate::reader::RemoteStateReader;
use crate::traits::ControlPlaneClient;
use crate::types::{Observed, RecordSet};

/// Asserts presence or absence of record sets
#[derive(Debug, Clone)]
pub struct ExistenceVerifier {
    reader: RemoteStateReader,
}

impl ExistenceVerifier {
    /// Create a verifier over `client`
    pub fn new(client: Arc<dyn ControlPlaneClient>) -> Self {
        Self {
            reader: RemoteStateReader::new(client),
        }
    }

    /// Succeed only if the record set is gone
    ///
    /// # Errors
    ///
    /// - `UnexpectedlyPresent`: The control plane still returns it
    /// - `Transient`: The lookup failed for another reason
    pub async fn assert_absent(&self, zone_id: &str, record_id: &str) -> Result<()> {
        match self.reader.fetch_by_id(zone_id, record_id).await? {
            Observed::Absent => {
                debug!("Record set {} in zone {} confirmed absent", record_id, zone_id);
                Ok(())
            }
            Observed::Present(_) => {
                warn!("Record set {} in zone {} still exists", record_id, zone_id);
                Err(Error::UnexpectedlyPresent {
                    zone_id: zone_id.to_string(),
                    record_id: record_id.to_string(),
                })
            }
        }
    }

    /// [`assert_absent`](Self::assert_absent) for an encoded identifier
    pub async fn assert_absent_token(&self, token: &str) -> Result<()> {
        let id = CompositeId::decode(token)?;
        self.assert_absent(id.zone_id(), id.record_id()).await
    }

    /// Succeed only if the record set exists under exactly this identifier
    pub async fn assert_exists(&self, token: &str) -> Result<RecordSet> {
        let id = CompositeId::decode(token)?;

        match self.reader.fetch_by_id(id.zone_id(), id.record_id()).await? {
            Observed::Present(record_set) if record_set.id == id.record_id() => Ok(record_set),
            Observed::Present(record_set) => Err(Error::not_found(format!(
                "expected record set {}, control plane returned {}",
                id.record_id(),
                record_set.id
            ))),
            Observed::Absent => Err(Error::not_found(format!("record set {} does not exist", id))),
        }
    }
}
