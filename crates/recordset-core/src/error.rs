//! Error types for the record set controller
//!
//! This module defines all error types used throughout the crate.
//!
//! `NotFound` is produced by control-plane clients when a resource is gone.
//! The [`reader`](crate::reader) turns it into [`Observed::Absent`](crate::Observed)
//! so callers of the reconciler never see it as a failure on the read and
//! delete paths.

use std::time::Duration;

use thiserror::Error;

use crate::types::{RecordField, RecordSet};

/// Result type alias for record set operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the record set controller
#[derive(Error, Debug)]
pub enum Error {
    /// The control plane reports the resource as absent
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any non-absence failure while talking to the control plane
    #[error("Control plane request for record set {record_id} in zone {zone_id} failed: {source}")]
    Transient {
        /// Owning zone
        zone_id: String,
        /// Record set ID
        record_id: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// A persisted identifier could not be decoded
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// A newly created record set did not become readable in time
    #[error("Timed out after {timeout:?} waiting for record set {record_id} in zone {zone_id} to become active")]
    CreateTimeout {
        /// Owning zone
        zone_id: String,
        /// Record set ID assigned by the control plane
        record_id: String,
        /// The bound that elapsed
        timeout: Duration,
        /// Last state seen while polling, if any
        last_observed: Option<Box<RecordSet>>,
    },

    /// A bounded wait elapsed before its condition held
    #[error(
        "Operation '{operation}'{} timed out after {timeout:?}",
        target(.zone_id, .record_id)
    )]
    OperationTimeout {
        /// Name of the waiting operation
        operation: String,
        /// Owning zone, when the wait concerned one record set
        zone_id: Option<String>,
        /// Record set ID, when the wait concerned one record set
        record_id: Option<String>,
        /// The bound that elapsed
        timeout: Duration,
        /// Last state seen while polling, if any
        last_observed: Option<Box<RecordSet>>,
    },

    /// The caller cancelled a wait
    #[error("Operation '{operation}'{} was cancelled", target(.zone_id, .record_id))]
    Cancelled {
        /// Name of the waiting operation
        operation: String,
        /// Owning zone, when the wait concerned one record set
        zone_id: Option<String>,
        /// Record set ID, when the wait concerned one record set
        record_id: Option<String>,
        /// Last state seen while polling, if any
        last_observed: Option<Box<RecordSet>>,
    },

    /// Some per-field updates committed before one failed
    #[error(
        "Partial update of record set {record_id} in zone {zone_id}: committed {committed:?}, failed at {failed}: {source}"
    )]
    PartialUpdateFailure {
        /// Owning zone
        zone_id: String,
        /// Record set ID
        record_id: String,
        /// Fields whose update calls succeeded, in call order
        committed: Vec<RecordField>,
        /// Field whose update call failed
        failed: RecordField,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// Destroy verification found the record set still present
    #[error("Record set {record_id} in zone {zone_id} still exists")]
    UnexpectedlyPresent {
        /// Owning zone
        zone_id: String,
        /// Record set ID
        record_id: String,
    },

    /// An immutable attribute differs from the managed record set
    #[error("Changing {fields:?} requires replacing the record set")]
    RequiresReplacement {
        /// Attribute names that cannot be updated in place
        fields: Vec<&'static str>,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication or authorization errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Control-plane specific error
    #[error("Control plane error ({client}): {message}")]
    ControlPlane {
        /// Client name
        client: String,
        /// Error message
        message: String,
    },
}

fn target(zone_id: &Option<String>, record_id: &Option<String>) -> String {
    match (zone_id, record_id) {
        (Some(zone_id), Some(record_id)) => {
            format!(" on record set {} in zone {}", record_id, zone_id)
        }
        (Some(zone_id), None) => format!(" in zone {}", zone_id),
        (None, Some(record_id)) => format!(" on record set {}", record_id),
        (None, None) => String::new(),
    }
}

impl Error {
    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a malformed identifier error
    pub fn malformed_identifier(msg: impl Into<String>) -> Self {
        Self::MalformedIdentifier(msg.into())
    }

    /// Wrap a client failure with the identifiers it concerns
    pub fn transient(zone_id: impl Into<String>, record_id: impl Into<String>, source: Error) -> Self {
        Self::Transient {
            zone_id: zone_id.into(),
            record_id: record_id.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a control-plane specific error
    pub fn control_plane(client: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ControlPlane {
            client: client.into(),
            message: message.into(),
        }
    }

    /// True when the control plane reported the resource as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Attach record set identifiers to a timed out or cancelled wait
    ///
    /// Other errors are returned unchanged.
    pub fn for_record(self, zone_id: &str, record_id: &str) -> Self {
        match self {
            Self::OperationTimeout {
                operation,
                timeout,
                last_observed,
                ..
            } => Self::OperationTimeout {
                operation,
                zone_id: Some(zone_id.to_string()),
                record_id: Some(record_id.to_string()),
                timeout,
                last_observed,
            },
            Self::Cancelled {
                operation,
                last_observed,
                ..
            } => Self::Cancelled {
                operation,
                zone_id: Some(zone_id.to_string()),
                record_id: Some(record_id.to_string()),
                last_observed,
            },
            other => other,
        }
    }

    /// Last state observed by a timed out or cancelled wait
    pub fn last_observed(&self) -> Option<&RecordSet> {
        match self {
            Self::CreateTimeout { last_observed, .. }
            | Self::OperationTimeout { last_observed, .. }
            | Self::Cancelled { last_observed, .. } => last_observed.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_keeps_source_and_identifiers() {
        let err = Error::transient("zone-1", "rs-1", Error::auth("token expired"));
        let msg = err.to_string();
        assert!(msg.contains("zone-1"));
        assert!(msg.contains("rs-1"));
        assert!(msg.contains("token expired"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_is_recognized() {
        assert!(Error::not_found("gone").is_not_found());
        assert!(!Error::transient("z", "r", Error::not_found("gone")).is_not_found());
    }

    #[test]
    fn last_observed_only_on_waits() {
        let err = Error::OperationTimeout {
            operation: "delete".to_string(),
            zone_id: None,
            record_id: None,
            timeout: Duration::from_secs(1),
            last_observed: None,
        };
        assert!(err.last_observed().is_none());
        assert!(Error::invalid_input("x").last_observed().is_none());
    }

    #[test]
    fn for_record_names_the_record_set() {
        let err = Error::Cancelled {
            operation: "update".to_string(),
            zone_id: None,
            record_id: None,
            last_observed: None,
        }
        .for_record("zone-1", "rs-1");

        match &err {
            Error::Cancelled {
                zone_id, record_id, ..
            } => {
                assert_eq!(zone_id.as_deref(), Some("zone-1"));
                assert_eq!(record_id.as_deref(), Some("rs-1"));
            }
            other => panic!("expected Cancelled, got {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "Operation 'update' on record set rs-1 in zone zone-1 was cancelled"
        );

        assert!(matches!(
            Error::invalid_input("x").for_record("zone-1", "rs-1"),
            Error::InvalidInput(_)
        ));
    }
}
