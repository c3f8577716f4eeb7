use std::collections::BTreeMap;

use anyhow::{Context, Result};

/// Encode the given string map into a bytes payload.
///
/// Container attributes and stream definitions are persisted in the
/// coordination tree as opaque string maps. The encoding must round-trip
/// maps losslessly; key order in the payload is not significant.
pub fn encode_map(map: &BTreeMap<String, String>) -> Result<Vec<u8>> {
    serde_json::to_vec(map).context("error serializing attributes map")
}

/// Decode a bytes payload into a string map.
pub fn decode_map(data: &[u8]) -> Result<BTreeMap<String, String>> {
    serde_json::from_slice(data).context("error decoding attributes map from coordination tree")
}

/// Split a comma-delimited list into a deduplicated set of trimmed values.
///
/// An empty or whitespace-only input yields an empty set.
pub fn comma_delimited_set(val: &str) -> std::collections::BTreeSet<String> {
    val.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
