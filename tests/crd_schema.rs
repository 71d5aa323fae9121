// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Schema-level tests for the InstanceGroup CRD.
//!
//! These exercise the generated CustomResourceDefinition and the serde
//! round-trip of representative manifests without needing a cluster.

use instance_manager::crd::{InstanceGroup, Provisioner, ScalingConfigKind, StrategyKind};
use kube::CustomResourceExt;

#[test]
fn test_generated_crd_coordinates() {
    let crd = InstanceGroup::crd();
    assert_eq!(crd.spec.group, "instancemgr.keikoproj.io");
    assert_eq!(crd.spec.names.kind, "InstanceGroup");
    assert_eq!(crd.spec.names.plural, "instancegroups");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert!(crd
        .spec
        .names
        .short_names
        .as_ref()
        .is_some_and(|names| names.contains(&"ig".to_string())));
}

#[test]
fn test_generated_crd_serves_v1alpha1_with_status() {
    let crd = InstanceGroup::crd();
    let version = crd
        .spec
        .versions
        .iter()
        .find(|version| version.name == "v1alpha1")
        .expect("v1alpha1 must be served");
    assert!(version.served);
    assert!(version.storage);
    assert!(version.subresources.as_ref().is_some_and(|subresources| {
        subresources.status.is_some()
    }));
    assert!(version.schema.is_some());
}

#[test]
fn test_print_columns_include_state() {
    let crd = InstanceGroup::crd();
    let version = &crd.spec.versions[0];
    let columns = version
        .additional_printer_columns
        .as_ref()
        .expect("printer columns are declared");
    assert!(columns.iter().any(|column| column.name == "State"));
    assert!(columns.iter().any(|column| column.name == "Provisioner"));
}

#[test]
fn test_manifest_round_trip_self_managed() {
    let manifest = r#"
apiVersion: instancemgr.keikoproj.io/v1alpha1
kind: InstanceGroup
metadata:
  name: ig1
  namespace: default
spec:
  provisioner: eks
  eks:
    minSize: 3
    maxSize: 6
    configuration:
      clusterName: prod-eks
      image: ami-1234567890
      instanceType: m5.large
      subnets:
        - subnet-1
      securityGroups:
        - sg-1
      volumes:
        - name: /dev/xvda
          type: gp3
          size: 64
  strategy:
    type: rollingUpdate
    rollingUpdate:
      maxUnavailable: 30%
"#;
    let group: InstanceGroup = serde_yaml::from_str(manifest).expect("manifest parses");
    assert_eq!(group.spec.provisioner, Provisioner::Eks);
    assert_eq!(group.spec.strategy.strategy_type, StrategyKind::RollingUpdate);
    assert_eq!(
        group.spec.scaling_config_kind(),
        ScalingConfigKind::LaunchTemplate
    );
    assert!(group.spec.validate().is_ok());

    // Round-trip preserves the provisioner block
    let rendered = serde_yaml::to_string(&group).expect("manifest renders");
    let reparsed: InstanceGroup = serde_yaml::from_str(&rendered).expect("round trip parses");
    assert_eq!(reparsed.spec, group.spec);
}

#[test]
fn test_manifest_round_trip_crd_strategy() {
    let manifest = r#"
apiVersion: instancemgr.keikoproj.io/v1alpha1
kind: InstanceGroup
metadata:
  name: ig2
  namespace: default
spec:
  provisioner: eks
  eks:
    minSize: 1
    maxSize: 3
    configuration:
      clusterName: prod-eks
      image: ami-1234567890
      instanceType: m5.large
  strategy:
    type: crd
    crd:
      crdName: rollingupgrades.upgrademgr.keikoproj.io
      statusJSONPath: status.currentStatus
      statusSuccessString: completed
      statusFailureString: error
      spec: |
        apiVersion: upgrademgr.keikoproj.io/v1alpha1
        kind: RollingUpgrade
        metadata:
          name: rollup-nodes
        spec:
          asgName: {{ .status.activeScalingGroupName }}
"#;
    let group: InstanceGroup = serde_yaml::from_str(manifest).expect("manifest parses");
    assert!(group.spec.validate().is_ok());
    let crd = group.spec.strategy.crd.as_ref().unwrap();
    assert_eq!(
        crd.crd_name.as_deref(),
        Some("rollingupgrades.upgrademgr.keikoproj.io")
    );
}

#[test]
fn test_manifest_managed_and_fargate_provisioners() {
    let managed = r#"
spec:
  provisioner: eks-managed
  eks-managed:
    minSize: 1
    maxSize: 4
    configuration:
      clusterName: prod-eks
      instanceTypes:
        - m5.large
      subnets:
        - subnet-1
"#;
    let group: InstanceGroup = serde_yaml::from_str(&format!(
        "apiVersion: instancemgr.keikoproj.io/v1alpha1\nkind: InstanceGroup\nmetadata:\n  name: managed\n{managed}"
    ))
    .expect("managed manifest parses");
    assert_eq!(group.spec.provisioner, Provisioner::EksManaged);
    assert!(group.spec.validate().is_ok());

    let fargate = r#"
spec:
  provisioner: eks-fargate
  eks-fargate:
    clusterName: prod-eks
    subnets:
      - subnet-1
    selectors:
      - namespace: jobs
"#;
    let group: InstanceGroup = serde_yaml::from_str(&format!(
        "apiVersion: instancemgr.keikoproj.io/v1alpha1\nkind: InstanceGroup\nmetadata:\n  name: serverless\n{fargate}"
    ))
    .expect("fargate manifest parses");
    assert_eq!(group.spec.provisioner, Provisioner::EksFargate);
    assert!(group.spec.validate().is_ok());
}
