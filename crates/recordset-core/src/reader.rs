//! Remote state reader
//!
//! Fetches the current state of a record set and sorts the answer into
//! present, absent, or failed. Absence is not an error here; everything
//! else is wrapped as [`Error::Transient`] with the identifiers attached
//! and returned without retrying.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::ControlPlaneClient;
use crate::types::{Observed, RecordSet};

/// Reads record sets from the control plane
#[derive(Clone)]
pub struct RemoteStateReader {
    client: Arc<dyn ControlPlaneClient>,
}

impl RemoteStateReader {
    /// Create a reader over `client`
    pub fn new(client: Arc<dyn ControlPlaneClient>) -> Self {
        Self { client }
    }

    /// Fetch a record set by its zone and ID
    ///
    /// # Returns
    ///
    /// - `Ok(Observed::Present(_))`: The record set exists
    /// - `Ok(Observed::Absent)`: The control plane reported it as not found
    /// - `Err(Error::Transient)`: Any other failure, cause attached
    pub async fn fetch_by_id(&self, zone_id: &str, record_id: &str) -> Result<Observed<RecordSet>> {
        debug!(
            "Fetching record set {} in zone {} via {}",
            record_id,
            zone_id,
            self.client.client_name()
        );

        match self.client.get(zone_id, record_id).await {
            Ok(record_set) => Ok(Observed::Present(record_set)),
            Err(e) if e.is_not_found() => {
                debug!("Record set {} in zone {} not found", record_id, zone_id);
                Ok(Observed::Absent)
            }
            Err(e) => Err(Error::transient(zone_id, record_id, e)),
        }
    }
}

impl std::fmt::Debug for RemoteStateReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStateReader")
            .field("client", &self.client.client_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryControlPlane;
    use crate::types::{RecordSetSpec, RecordType};

    #[tokio::test]
    async fn present_and_absent() {
        let control_plane = Arc::new(MemoryControlPlane::new());
        let reader = RemoteStateReader::new(control_plane.clone());

        let spec = RecordSetSpec::new("zone-1", "example.com.", RecordType::A, ["10.1.0.0"]);
        let id = control_plane.create("zone-1", &spec).await.unwrap();

        let found = reader.fetch_by_id("zone-1", &id).await.unwrap();
        assert_eq!(found.present().unwrap().id, id);

        let missing = reader.fetch_by_id("zone-1", "does-not-exist").await.unwrap();
        assert!(missing.is_absent());
    }

    #[tokio::test]
    async fn other_failures_are_transient() {
        let control_plane = Arc::new(MemoryControlPlane::new());
        control_plane.fail_next_get(Error::auth("token expired")).await;
        let reader = RemoteStateReader::new(control_plane);

        match reader.fetch_by_id("zone-1", "rs-1").await {
            Err(Error::Transient { zone_id, record_id, source }) => {
                assert_eq!(zone_id, "zone-1");
                assert_eq!(record_id, "rs-1");
                assert!(matches!(*source, Error::Authentication(_)));
            }
            other => panic!("expected Transient, got {:?}", other),
        }
    }
}
