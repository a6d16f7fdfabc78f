//! Record set data model
//!
//! - [`RecordSetSpec`]: desired state, as written by the user
//! - [`RecordSet`]: observed state, as returned by the control plane
//! - [`RecordSetPatch`]: the mutable subset sent on update
//! - [`Observed`]: explicit present/absent outcome of a read

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// DNS record type
///
/// The type of a record set is fixed at creation. Changing it requires
/// replacing the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Mail exchanger
    Mx,
    /// Free-form text
    Txt,
    /// Name server
    Ns,
    /// Reverse pointer
    Ptr,
    /// Service locator
    Srv,
    /// Certification authority authorization
    Caa,
}

impl RecordType {
    /// Wire name of the record type (e.g. "AAAA")
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "MX" => Ok(RecordType::Mx),
            "TXT" => Ok(RecordType::Txt),
            "NS" => Ok(RecordType::Ns),
            "PTR" => Ok(RecordType::Ptr),
            "SRV" => Ok(RecordType::Srv),
            "CAA" => Ok(RecordType::Caa),
            other => Err(Error::invalid_input(format!(
                "Unsupported record type: {}",
                other
            ))),
        }
    }
}

/// Provisioning status reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    /// Visible and served
    Active,
    /// Accepted but not yet propagated
    Pending,
    /// The control plane failed to provision the record set
    Error,
}

impl RecordStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "ACTIVE",
            RecordStatus::Pending => "PENDING",
            RecordStatus::Error => "ERROR",
        }
    }
}

impl From<String> for RecordStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => RecordStatus::Active,
            "ERROR" => RecordStatus::Error,
            // Anything in flight (PENDING, CREATE, UPDATE, ...) is still settling
            _ => RecordStatus::Pending,
        }
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable attributes of a record set, in the order per-field updates are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordField {
    /// Record values
    Records,
    /// Time-to-live
    Ttl,
    /// Free-form description
    Description,
}

impl RecordField {
    /// All mutable fields in update order
    pub const ALL: [RecordField; 3] = [RecordField::Records, RecordField::Ttl, RecordField::Description];

    /// Attribute name
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Records => "records",
            RecordField::Ttl => "ttl",
            RecordField::Description => "description",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of a record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSetSpec {
    /// Owning zone ID
    pub zone_id: String,

    /// Fully-qualified record set name (e.g. "example.com.")
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Record values; order is irrelevant
    pub records: Vec<String>,

    /// Time-to-live in seconds
    ///
    /// `None` leaves the value to the control plane. `Some(0)` is sent as is.
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

impl RecordSetSpec {
    /// Create a new desired record set
    pub fn new(
        zone_id: impl Into<String>,
        name: impl Into<String>,
        record_type: RecordType,
        records: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            name: name.into(),
            record_type,
            records: records.into_iter().map(Into::into).collect(),
            ttl: None,
            description: None,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the record values
    pub fn with_records(mut self, records: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.records = records.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the desired state before any remote call is made
    pub fn validate(&self) -> Result<()> {
        if self.zone_id.trim().is_empty() {
            return Err(Error::invalid_input("zone_id cannot be empty"));
        }
        if self.zone_id.contains(crate::id::DELIMITER) {
            return Err(Error::invalid_input(format!(
                "zone_id '{}' contains the identifier delimiter '{}'",
                self.zone_id,
                crate::id::DELIMITER
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("name cannot be empty"));
        }
        if self.name.len() > 255 {
            return Err(Error::invalid_input(format!(
                "name too long: {} chars (max 255)",
                self.name.len()
            )));
        }
        if self.records.is_empty() {
            return Err(Error::invalid_input(format!(
                "record set {} must contain at least one record",
                self.name
            )));
        }
        if self.records.iter().any(|r| r.trim().is_empty()) {
            return Err(Error::invalid_input(format!(
                "record set {} contains an empty record value",
                self.name
            )));
        }
        Ok(())
    }

    /// Description with "unset" and "empty" folded together
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Observed state of a record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Owning zone ID
    pub zone_id: String,

    /// ID assigned by the control plane
    pub id: String,

    /// Record set name as reported by the control plane
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Record values in the order the control plane returned them
    pub records: Vec<String>,

    /// Time-to-live as stored by the control plane
    ///
    /// `None` when the record set has no TTL of its own and the zone default
    /// applies. Distinct from `Some(0)`.
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Description, if any
    #[serde(default)]
    pub description: Option<String>,

    /// Provisioning status
    pub status: RecordStatus,

    /// Owning zone name, when reported
    #[serde(default)]
    pub zone_name: Option<String>,

    /// Creation time, when reported
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Last update time, when reported
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordSet {
    /// True once the control plane serves the record set
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// Description with "unset" and "empty" folded together
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// Flat attribute mapping handed to the host engine
    pub fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut attrs = serde_json::Map::new();
        attrs.insert("zone_id".into(), self.zone_id.clone().into());
        attrs.insert("id".into(), self.id.clone().into());
        attrs.insert("name".into(), self.name.clone().into());
        attrs.insert("type".into(), self.record_type.as_str().into());
        attrs.insert("records".into(), self.records.clone().into());
        attrs.insert(
            "ttl".into(),
            self.ttl.map_or(serde_json::Value::Null, Into::into),
        );
        attrs.insert("description".into(), self.description_or_empty().into());
        attrs.insert("status".into(), self.status.as_str().into());
        attrs
    }
}

/// Mutable attributes sent on update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSetPatch {
    /// New record values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<String>>,

    /// New TTL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// New description (empty string clears it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RecordSetPatch {
    /// Build a patch carrying `fields` taken from `desired`
    pub fn from_fields(desired: &RecordSetSpec, fields: &[RecordField]) -> Self {
        let mut patch = Self::default();
        for field in fields {
            match field {
                RecordField::Records => patch.records = Some(desired.records.clone()),
                RecordField::Ttl => patch.ttl = desired.ttl,
                RecordField::Description => {
                    patch.description = Some(desired.description_or_empty().to_string())
                }
            }
        }
        patch
    }

    /// True if the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.records.is_none() && self.ttl.is_none() && self.description.is_none()
    }

    /// Fields carried by this patch, in update order
    pub fn fields(&self) -> Vec<RecordField> {
        let mut fields = Vec::new();
        if self.records.is_some() {
            fields.push(RecordField::Records);
        }
        if self.ttl.is_some() {
            fields.push(RecordField::Ttl);
        }
        if self.description.is_some() {
            fields.push(RecordField::Description);
        }
        fields
    }
}

/// Outcome of a read: the control plane either has the resource or it does not
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed<T> {
    /// The resource exists
    Present(T),
    /// The resource no longer exists
    Absent,
}

impl<T> Observed<T> {
    /// True if the resource does not exist
    pub fn is_absent(&self) -> bool {
        matches!(self, Observed::Absent)
    }

    /// The present value, if any
    pub fn present(self) -> Option<T> {
        match self {
            Observed::Present(value) => Some(value),
            Observed::Absent => None,
        }
    }

    /// Borrow the present value, if any
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Observed::Present(value) => Some(value),
            Observed::Absent => None,
        }
    }

    /// Map the present value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Observed<U> {
        match self {
            Observed::Present(value) => Observed::Present(f(value)),
            Observed::Absent => Observed::Absent,
        }
    }
}
