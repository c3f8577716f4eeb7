use crate::error::PathError;
use crate::paths::{self, ModuleDeploymentPath, StreamDeploymentPath};
use crate::stream::ModuleType;

const NS: &str = "rill";

#[test]
fn container_path_encodes_under_registry() {
    let path = paths::container(NS, "c1").expect("expected path to build");
    assert_eq!(path, "/rill/containers/c1");
    assert_eq!(paths::child_name(&path), "c1");
}

#[test]
fn stream_paths_encode_under_their_roots() {
    assert_eq!(paths::stream_definition(NS, "ticks").unwrap(), "/rill/streams/ticks");
    assert_eq!(paths::stream_deployment(NS, "ticks").unwrap(), "/rill/deployments/streams/ticks");
    assert_eq!(
        paths::stream_module_dir(NS, "ticks", ModuleType::Processor, "scrub").unwrap(),
        "/rill/deployments/streams/ticks/processor/scrub"
    );
    assert_eq!(paths::container_deployments_dir(NS, "c1").unwrap(), "/rill/deployments/modules/c1");
}

#[test]
fn stream_deployment_path_round_trips() {
    let record = StreamDeploymentPath {
        stream: "ticks".into(),
        module_type: ModuleType::Sink,
        label: "log".into(),
        container: "c2".into(),
    };
    let path = record.build(NS).expect("expected path to build");
    assert_eq!(path, "/rill/deployments/streams/ticks/sink/log/c2");
    let decoded = StreamDeploymentPath::parse(NS, &path).expect("expected path to parse");
    assert_eq!(decoded, record);
    assert_eq!(decoded.build(NS).unwrap(), path, "re-encode must reproduce the path");
}

#[test]
fn module_deployment_path_round_trips() {
    let record = ModuleDeploymentPath {
        container: "c1".into(),
        stream: "ticks".into(),
        module_type: ModuleType::Job,
        label: "backup".into(),
    };
    let path = record.build(NS).expect("expected path to build");
    assert_eq!(path, "/rill/deployments/modules/c1/ticks.job.backup");
    let decoded = ModuleDeploymentPath::parse(NS, &path).expect("expected path to parse");
    assert_eq!(decoded, record);
    assert_eq!(decoded.build(NS).unwrap(), path, "re-encode must reproduce the path");
}

#[test]
fn module_deployment_child_name_parses_directly() {
    let decoded = ModuleDeploymentPath::parse_child("c1", "ticks.processor.scrub").expect("expected child to parse");
    assert_eq!(decoded.container, "c1");
    assert_eq!(decoded.stream, "ticks");
    assert_eq!(decoded.module_type, ModuleType::Processor);
    assert_eq!(decoded.label, "scrub");
}

#[test]
fn fields_with_path_separator_are_rejected() {
    let err = paths::container(NS, "a/b").expect_err("expected separator to be rejected");
    assert_eq!(err, PathError::ReservedCharacter { field: "container", reserved: '/', value: "a/b".into() });

    assert!(paths::stream_definition(NS, "a/b").is_err());
    assert!(StreamDeploymentPath {
        stream: "ticks".into(),
        module_type: ModuleType::Source,
        label: "a/b".into(),
        container: "c1".into(),
    }
    .build(NS)
    .is_err());
}

#[test]
fn dotted_record_fields_reject_dots() {
    let err = ModuleDeploymentPath {
        container: "c1".into(),
        stream: "ti.cks".into(),
        module_type: ModuleType::Source,
        label: "time".into(),
    }
    .build(NS)
    .expect_err("expected dot in stream name to be rejected");
    assert_eq!(err, PathError::ReservedCharacter { field: "stream", reserved: '.', value: "ti.cks".into() });
}

#[test]
fn empty_fields_are_rejected() {
    assert!(paths::container(NS, "").is_err());
    assert!(paths::stream_definition(NS, "").is_err());
}

#[test]
fn parse_rejects_foreign_and_short_paths() {
    assert!(StreamDeploymentPath::parse(NS, "/other/deployments/streams/s/source/a/c1").is_err());
    assert!(StreamDeploymentPath::parse(NS, "/rill/deployments/streams/s/source/a").is_err());
    assert!(StreamDeploymentPath::parse(NS, "/rill/deployments/streams/s/flavor/a/c1").is_err(), "unknown module type");
    assert!(ModuleDeploymentPath::parse(NS, "/rill/deployments/modules/c1").is_err());
    assert!(ModuleDeploymentPath::parse_child("c1", "ticks.processor").is_err());
}
