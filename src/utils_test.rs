use std::collections::BTreeMap;

use anyhow::Result;

use crate::utils;

#[test]
fn map_codec_round_trips_arbitrary_values() -> Result<()> {
    let mut map = BTreeMap::new();
    map.insert("id".into(), "c9a1".into());
    map.insert("host".into(), "worker-3.example.com".into());
    map.insert("groups".into(), "ingest, analytics".into());
    map.insert("definition".into(), "http | filter | log".into());
    map.insert("empty".into(), "".into());

    let bytes = utils::encode_map(&map)?;
    let decoded = utils::decode_map(&bytes)?;

    assert_eq!(decoded, map, "expected decoded map to match original, got {:?}", decoded);
    Ok(())
}

#[test]
fn map_codec_rejects_garbage_payload() {
    let res = utils::decode_map(b"\x00\x01not a map");
    assert!(res.is_err(), "expected decode of garbage payload to fail");
}

#[test]
fn comma_delimited_set_dedupes_and_trims() {
    let set = utils::comma_delimited_set(" ingest, analytics ,ingest,, ");
    assert_eq!(set.len(), 2, "expected 2 entries, got {:?}", set);
    assert!(set.contains("ingest"));
    assert!(set.contains("analytics"));
}

#[test]
fn comma_delimited_set_of_empty_input_is_empty() {
    assert!(utils::comma_delimited_set("").is_empty());
    assert!(utils::comma_delimited_set("  ").is_empty());
}
