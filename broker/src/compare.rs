//! Structural comparison for idempotent provisioning. The comparison
//! walks a fixed set of writable fields in serialized map form, so
//! read-only attributes Atlas adds to its responses (stateName,
//! srvAddress) never produce a false mismatch.

use atlas::Cluster;
use serde_json::Value;

use crate::errors::ApiError;

const COMPARED_FIELDS: [&str; 10] = [
    "backupEnabled",
    "autoScaling",
    "biConnector",
    "clusterType",
    "diskSizeGB",
    "encryptionAtRestProvider",
    "mongoDBMajorVersion",
    "numShards",
    "replicationSpecs",
    "providerSettings",
];

// Whether `existing` satisfies every compared field the desired cluster
// sets. Fields the desired side leaves empty are not compared.
pub(crate) fn clusters_match(desired: &Cluster, existing: &Cluster) -> Result<bool, ApiError> {
    let desired = serde_json::to_value(desired).map_err(serialize_error)?;
    let existing = serde_json::to_value(existing).map_err(serialize_error)?;

    Ok(COMPARED_FIELDS.iter().all(|field| match desired.get(field) {
        None => true,
        Some(want) if is_empty(want) => true,
        Some(want) => existing
            .get(field)
            .is_some_and(|have| values_match(want, have)),
    }))
}

fn serialize_error(err: serde_json::Error) -> ApiError {
    ApiError::Internal(format!("could not serialize cluster for comparison: {err}"))
}

fn values_match(want: &Value, have: &Value) -> bool {
    match (want, have) {
        (Value::Object(want), Value::Object(have)) => want.iter().all(|(key, value)| {
            is_empty(value)
                || have
                    .get(key)
                    .is_some_and(|existing| values_match(value, existing))
        }),
        (Value::Array(want), Value::Array(have)) => {
            // Order-preserving: replication specs are positional.
            want.len() == have.len()
                && want
                    .iter()
                    .zip(have)
                    .all(|(value, existing)| values_match(value, existing))
        }
        (want, have) => want == have,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
