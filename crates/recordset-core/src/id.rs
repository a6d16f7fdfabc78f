//! Composite identifier codec
//!
//! A managed record set is stored by the host engine under a single opaque
//! token binding it to its owning zone: `"<zone_id>/<record_id>"`.
//! Neither component may contain the delimiter, so decoding is unambiguous.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Separator between zone ID and record set ID
pub const DELIMITER: char = '/';

/// Decoded (zone ID, record set ID) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    zone_id: String,
    record_id: String,
}

impl CompositeId {
    /// Build an identifier, rejecting empty components and embedded delimiters
    pub fn new(zone_id: impl Into<String>, record_id: impl Into<String>) -> Result<Self> {
        let zone_id = zone_id.into();
        let record_id = record_id.into();
        check_component("zone ID", &zone_id)?;
        check_component("record set ID", &record_id)?;
        Ok(Self { zone_id, record_id })
    }

    /// Decode a stored token
    pub fn decode(token: &str) -> Result<Self> {
        let mut parts = token.split(DELIMITER);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(zone_id), Some(record_id), None) if !zone_id.is_empty() && !record_id.is_empty() => {
                Ok(Self {
                    zone_id: zone_id.to_string(),
                    record_id: record_id.to_string(),
                })
            }
            _ => Err(Error::malformed_identifier(format!(
                "expected <zone_id>{}<record_id>, got '{}'",
                DELIMITER, token
            ))),
        }
    }

    /// Owning zone ID
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Record set ID
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Split into (zone ID, record set ID)
    pub fn into_parts(self) -> (String, String) {
        (self.zone_id, self.record_id)
    }
}

fn check_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::malformed_identifier(format!("{} cannot be empty", what)));
    }
    if value.contains(DELIMITER) {
        return Err(Error::malformed_identifier(format!(
            "{} '{}' contains the delimiter '{}'",
            what, value, DELIMITER
        )));
    }
    Ok(())
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.zone_id, DELIMITER, self.record_id)
    }
}

impl FromStr for CompositeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

/// Encode (zone ID, record set ID) into a token
pub fn encode(zone_id: &str, record_id: &str) -> Result<String> {
    CompositeId::new(zone_id, record_id).map(|id| id.to_string())
}

/// Decode a token into (zone ID, record set ID)
pub fn decode(token: &str) -> Result<(String, String)> {
    CompositeId::decode(token).map(CompositeId::into_parts)
}
