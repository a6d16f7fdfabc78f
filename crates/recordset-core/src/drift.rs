//! Drift projection
//!
//! Maps remote state back into the desired-state representation and
//! compares the two. Pure functions only.
//!
//! The control plane lower-cases names and may return record values in any
//! order. Names are folded by [`project`]; record values are compared
//! through [`canonical_records`], which is never stored.

use std::collections::BTreeSet;

use crate::types::{RecordField, RecordSet, RecordSetSpec};

/// Normalize a freshly read record set
///
/// Only the name is rewritten. TTL and records are returned exactly as the
/// control plane reported them.
pub fn project(remote: RecordSet) -> RecordSet {
    RecordSet {
        name: remote.name.to_lowercase(),
        ..remote
    }
}

/// Order-insensitive form of a record list, for equality checks only
pub fn canonical_records<S: AsRef<str>>(records: &[S]) -> BTreeSet<String> {
    records
        .iter()
        .map(|r| r.as_ref().to_string())
        .collect()
}

/// Case-insensitive name comparison that tolerates a missing trailing dot
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// Mutable fields whose desired value differs from the observed one
///
/// An unset desired TTL is never a change: the control plane owns the value.
/// An explicit TTL differs from a remote TTL that is unset.
pub fn changed_fields(desired: &RecordSetSpec, observed: &RecordSet) -> Vec<RecordField> {
    let mut changed = Vec::new();

    if canonical_records(&desired.records) != canonical_records(&observed.records) {
        changed.push(RecordField::Records);
    }

    if desired.ttl.is_some() && desired.ttl != observed.ttl {
        changed.push(RecordField::Ttl);
    }

    if desired.description_or_empty() != observed.description_or_empty() {
        changed.push(RecordField::Description);
    }

    changed
}

/// Immutable attributes whose desired value differs from the observed one
pub fn replacement_fields(desired: &RecordSetSpec, observed: &RecordSet) -> Vec<&'static str> {
    let mut fields = Vec::new();

    if desired.zone_id != observed.zone_id {
        fields.push("zone_id");
    }
    if !same_name(&desired.name, &observed.name) {
        fields.push("name");
    }
    if desired.record_type != observed.record_type {
        fields.push("type");
    }

    fields
}
