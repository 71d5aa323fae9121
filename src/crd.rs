// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for instance-group management.
//!
//! This module defines the `InstanceGroup` Custom Resource used to declare a
//! worker node pool for an EKS cluster, plus the strategy and configuration
//! sub-objects the reconcilers consume.
//!
//! # Resource Types
//!
//! - [`InstanceGroup`] - A declared worker node pool, reconciled against
//!   scaling groups, launch configurations/templates, IAM roles, managed
//!   node groups, or Fargate profiles depending on the provisioner.
//!
//! # Provisioners
//!
//! - `eks` - Self-managed scaling group (launch template by default)
//! - `eks-cf` - Legacy self-managed scaling group (launch configurations)
//! - `eks-managed` - EKS managed node group
//! - `eks-fargate` - EKS Fargate profile
//!
//! # Example: Declaring an InstanceGroup
//!
//! ```rust,no_run
//! use instance_manager::crd::{EksConfiguration, EksSpec};
//!
//! let eks = EksSpec {
//!     min_size: 3,
//!     max_size: 6,
//!     configuration_type: Default::default(),
//!     configuration: EksConfiguration {
//!         cluster_name: "prod-eks".to_string(),
//!         image: "ami-1234567890".to_string(),
//!         instance_type: "m5.large".to_string(),
//!         subnets: vec!["subnet-1234".to_string()],
//!         security_groups: vec!["sg-1234".to_string()],
//!         ..Default::default()
//!     },
//! };
//! ```

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Volume types accepted for node block devices.
pub const ALLOWED_VOLUME_TYPES: [&str; 6] = ["gp2", "gp3", "io1", "io2", "sc1", "st1"];

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. The controller maintains at least `NodesReady`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Provisioner backing an `InstanceGroup`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum Provisioner {
    /// Self-managed scaling group (launch template by default)
    #[serde(rename = "eks")]
    Eks,
    /// Legacy self-managed scaling group backed by launch configurations
    #[serde(rename = "eks-cf")]
    EksCf,
    /// EKS managed node group
    #[serde(rename = "eks-managed")]
    EksManaged,
    /// EKS Fargate profile
    #[serde(rename = "eks-fargate")]
    EksFargate,
}

impl std::fmt::Display for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Provisioner::Eks => "eks",
            Provisioner::EksCf => "eks-cf",
            Provisioner::EksManaged => "eks-managed",
            Provisioner::EksFargate => "eks-fargate",
        };
        f.write_str(s)
    }
}

/// Kind of scaling configuration backing a self-managed group.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ScalingConfigKind {
    /// Versioned launch template (new version on drift)
    #[serde(rename = "launchTemplate")]
    #[default]
    LaunchTemplate,
    /// Immutable launch configuration (replace on drift)
    #[serde(rename = "launchConfiguration")]
    LaunchConfiguration,
}

/// A key/value tag applied to cloud resources owned by the group.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudTag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

/// A node taint applied to kubelets launched by the group.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeTaint {
    /// Taint key
    pub key: String,
    /// Taint value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Taint effect: NoSchedule, PreferNoSchedule, or NoExecute
    pub effect: String,
}

/// Block-device mapping for node volumes.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeVolume {
    /// Device name, e.g. `/dev/xvda`
    pub name: String,

    /// Volume type: one of gp2, gp3, io1, io2, sc1, st1
    #[serde(rename = "type")]
    pub volume_type: String,

    /// Volume size in GiB
    pub size: i64,

    /// Provisioned IOPS (io1/io2/gp3 only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,

    /// Provisioned throughput in MiB/s (gp3 only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<i64>,

    /// Snapshot to restore the volume from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,

    /// Delete the volume when the instance terminates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_on_termination: Option<bool>,

    /// Encrypt the volume at rest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
}

/// Instance placement for launch templates.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementSpec {
    /// Availability zone to place instances in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,

    /// Host resource group ARN for license-bound workloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_resource_group_arn: Option<String>,

    /// Instance tenancy: default, dedicated, or host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenancy: Option<String>,
}

/// Instance metadata-service options for launch templates.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataOptionsSpec {
    /// Enable or disable the metadata endpoint: enabled | disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_endpoint: Option<String>,

    /// Token requirement: optional | required (IMDSv2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_tokens: Option<String>,

    /// Hop limit for metadata PUT responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_put_response_hop_limit: Option<i64>,
}

/// A scaling-group lifecycle hook declared on the group.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleHookSpec {
    /// Hook name, unique within the group
    pub name: String,

    /// Transition: instance launch or terminate
    pub lifecycle: LifecycleTransition,

    /// Default action when the heartbeat times out: CONTINUE | ABANDON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_result: Option<String>,

    /// Heartbeat timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_timeout: Option<i32>,

    /// Notification target ARN (SQS/SNS)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_arn: Option<String>,

    /// Role assumed to publish notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,

    /// Metadata passed along with the notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_metadata: Option<String>,
}

/// The lifecycle transition a hook pauses.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum LifecycleTransition {
    /// Pause on instance launch
    #[serde(rename = "launch")]
    Launch,
    /// Pause on instance terminate
    #[serde(rename = "terminate")]
    Terminate,
}

impl LifecycleTransition {
    /// The cloud-side transition string.
    #[must_use]
    pub fn as_cloud_value(&self) -> &'static str {
        match self {
            LifecycleTransition::Launch => "autoscaling:EC2_INSTANCE_LAUNCHING",
            LifecycleTransition::Terminate => "autoscaling:EC2_INSTANCE_TERMINATING",
        }
    }
}

/// Mixed-instances policy for launch-template-backed groups.
///
/// Allows a scaling group to combine several instance types and to split
/// capacity between spot and on-demand purchase options.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MixedInstancesPolicySpec {
    /// Spot allocation strategy, e.g. `capacity-optimized` or `lowest-price`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Percentage of capacity satisfied by on-demand instances (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_capacity: Option<i32>,

    /// Number of spot pools to diversify across (lowest-price only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_pools: Option<i32>,

    /// Instance types overriding the launch template's type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_types: Vec<String>,
}

/// Configuration block for self-managed (`eks` / `eks-cf`) groups.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EksConfiguration {
    /// Name of the EKS cluster nodes join
    pub cluster_name: String,

    /// AMI id, or an `ssm://<parameter>` alias resolved at reconcile time
    pub image: String,

    /// EC2 instance type for the group
    pub instance_type: String,

    /// EC2 key pair installed on nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_pair_name: Option<String>,

    /// Subnets the scaling group spans
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,

    /// Security groups attached to nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,

    /// Block-device mappings for node volumes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<NodeVolume>,

    /// Tags applied to the scaling group and propagated to instances
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<CloudTag>,

    /// Node labels passed to the kubelet
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Node taints passed to the kubelet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<NodeTaint>,

    /// Extra arguments appended to the EKS bootstrap script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_arguments: Option<String>,

    /// Maximum spot price; empty requests on-demand capacity.
    /// May also be driven by spot-recommendation events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_price: Option<String>,

    /// Existing IAM role to use instead of a managed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,

    /// Existing instance profile to use instead of a managed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_profile_name: Option<String>,

    /// Managed policy ARNs attached to the node role
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_policies: Vec<String>,

    /// License-configuration ARNs (launch template only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub license_specifications: Vec<String>,

    /// Instance placement (launch template only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementSpec>,

    /// Instance metadata-service options (launch template only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_options: Option<MetadataOptionsSpec>,

    /// Lifecycle hooks installed on the scaling group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lifecycle_hooks: Vec<LifecycleHookSpec>,

    /// Mixed-instances policy (launch template only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mixed_instances_policy: Option<MixedInstancesPolicySpec>,

    /// Auto Scaling processes suspended on the group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suspend_processes: Vec<String>,
}

/// Self-managed provisioner spec (`eks` and `eks-cf`).
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EksSpec {
    /// Minimum number of instances
    pub min_size: i32,

    /// Maximum number of instances
    pub max_size: i32,

    /// Scaling-configuration kind; launch template unless stated otherwise
    #[serde(rename = "type", default)]
    pub configuration_type: ScalingConfigKind,

    /// Node configuration
    pub configuration: EksConfiguration,
}

/// Configuration block for managed node groups.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedConfiguration {
    /// Name of the EKS cluster
    pub cluster_name: String,

    /// Instance types for the node group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_types: Vec<String>,

    /// AMI type, e.g. `AL2_x86_64`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ami_type: Option<String>,

    /// Existing node role ARN; a default role is provisioned when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_role: Option<String>,

    /// Subnets the node group spans
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,

    /// Node labels applied by the managed group
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Tags applied to the node group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<CloudTag>,

    /// Root volume size in GiB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<i32>,

    /// EC2 key pair enabling SSH access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_name: Option<String>,
}

/// Managed node-group provisioner spec (`eks-managed`).
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EksManagedSpec {
    /// Minimum number of instances
    pub min_size: i32,

    /// Maximum number of instances
    pub max_size: i32,

    /// Node-group configuration
    pub configuration: ManagedConfiguration,
}

/// A namespace/label selector scheduling pods onto Fargate.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FargateSelector {
    /// Namespace pods must run in
    pub namespace: String,

    /// Labels pods must carry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Serverless pod-profile provisioner spec (`eks-fargate`).
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EksFargateSpec {
    /// Name of the EKS cluster
    pub cluster_name: String,

    /// Existing pod execution role ARN; a default role is provisioned when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_execution_role_arn: Option<String>,

    /// Private subnets pods run in
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,

    /// Pod selectors matched by the profile
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<FargateSelector>,

    /// Tags applied to the profile
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Node-drain options for the rolling-update strategy.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrainOptions {
    /// Delete pods not managed by a controller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,

    /// Seconds to wait for the drain before terminating anyway
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

/// A readiness gate consulted before a node counts as ready.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessGate {
    /// Node condition type that must be `True`
    pub condition_type: String,
}

/// Bounded-disruption rolling-update strategy parameters.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpdateStrategySpec {
    /// Instances that may be unavailable at once: an absolute count or a
    /// percentage of desired capacity (rounded down). Clamped to desired
    /// capacity when larger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<IntOrString>,

    /// Upgrade attempts before reporting failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i32>,

    /// Drain behavior applied before termination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain_options: Option<DrainOptions>,

    /// Additional node conditions required for readiness
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readiness_gates: Vec<ReadinessGate>,
}

/// Delegated upgrade strategy driven by an external custom resource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrdStrategySpec {
    /// Resource template rendered against the InstanceGroup; placeholders
    /// of the form `{{ .path.to.field }}` resolve against the group's JSON
    /// document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,

    /// Full CRD name of the upgrade resource, e.g.
    /// `rollingupgrades.upgrademgr.keikoproj.io`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crd_name: Option<String>,

    /// Concurrency policy: forbid | allow | replace (defaults to forbid)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_policy: Option<String>,

    /// Dotted path into the upgrade resource's status, e.g.
    /// `status.currentStatus`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_json_path: Option<String>,

    /// Status value signalling success (case-insensitive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_success_string: Option<String>,

    /// Status value signalling failure (case-insensitive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_failure_string: Option<String>,
}

/// Upgrade strategy kind.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Bounded-disruption rolling update executed by this controller
    #[serde(rename = "rollingUpdate")]
    #[default]
    RollingUpdate,
    /// Rotation delegated to an external custom resource
    #[serde(rename = "crd")]
    Crd,
    /// Rotation delegated to the managed node-group service
    #[serde(rename = "managed")]
    Managed,
}

/// Upgrade strategy for the group.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeStrategy {
    /// Strategy kind
    #[serde(rename = "type", default)]
    pub strategy_type: StrategyKind,

    /// Rolling-update parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdateStrategySpec>,

    /// CRD-strategy parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crd: Option<CrdStrategySpec>,
}

/// `InstanceGroup` status subresource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupStatus {
    /// Current reconcile state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,

    /// Observed minimum size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_min: Option<i32>,

    /// Observed maximum size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_max: Option<i32>,

    /// Name of the owning scaling group, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_scaling_group_name: Option<String>,

    /// Name of the active launch configuration or launch template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_launch_configuration_name: Option<String>,

    /// Latest launch-template version, when template-backed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_template_version: Option<String>,

    /// Name of the upgrade resource issued by the CRD strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_resource_name: Option<String>,

    /// Namespace of the upgrade resource issued by the CRD strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_resource_namespace: Option<String>,

    /// ARN of the node IAM role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_instance_role_arn: Option<String>,

    /// Lifecycle of the group's capacity: spot | normal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<String>,

    /// Status conditions, at least `NodesReady`
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `InstanceGroup` declares a worker node pool for an EKS cluster.
///
/// The controller reconciles the declaration against cloud primitives until
/// the observed state matches: a scaling group with a launch configuration
/// or launch template (self-managed), a managed node group, or a Fargate
/// profile, plus the IAM role and instance profile nodes run under.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "instancemgr.keikoproj.io",
    version = "v1alpha1",
    kind = "InstanceGroup",
    namespaced,
    status = "InstanceGroupStatus",
    shortname = "ig",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.currentState"}"#,
    printcolumn = r#"{"name":"Min","type":"integer","jsonPath":".status.currentMin"}"#,
    printcolumn = r#"{"name":"Max","type":"integer","jsonPath":".status.currentMax"}"#,
    printcolumn = r#"{"name":"Group","type":"string","jsonPath":".status.activeScalingGroupName"}"#,
    printcolumn = r#"{"name":"Provisioner","type":"string","jsonPath":".spec.provisioner"}"#,
    printcolumn = r#"{"name":"Lifecycle","type":"string","jsonPath":".status.lifecycle"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupSpec {
    /// Provisioner backing this group
    pub provisioner: Provisioner,

    /// Self-managed spec (provisioner `eks`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eks: Option<EksSpec>,

    /// Legacy self-managed spec (provisioner `eks-cf`)
    #[serde(rename = "eks-cf", skip_serializing_if = "Option::is_none")]
    pub eks_cf: Option<EksSpec>,

    /// Managed node-group spec (provisioner `eks-managed`)
    #[serde(rename = "eks-managed", skip_serializing_if = "Option::is_none")]
    pub eks_managed: Option<EksManagedSpec>,

    /// Fargate profile spec (provisioner `eks-fargate`)
    #[serde(rename = "eks-fargate", skip_serializing_if = "Option::is_none")]
    pub eks_fargate: Option<EksFargateSpec>,

    /// Upgrade strategy applied when rotation is needed
    #[serde(default)]
    pub strategy: UpgradeStrategy,
}

/// Structural validation failures for an `InstanceGroup` spec.
///
/// These are permanent errors: the group enters `Error` and is not requeued
/// until the spec changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provisioner tag and the populated sub-spec disagree
    #[error("provisioner '{provisioner}' requires exactly its own configuration block")]
    ProvisionerSpecMismatch {
        /// Declared provisioner tag
        provisioner: String,
    },

    /// minSize exceeds maxSize
    #[error("minSize {min} may not exceed maxSize {max}")]
    SizeInverted {
        /// Declared minimum
        min: i32,
        /// Declared maximum
        max: i32,
    },

    /// A volume uses an unsupported type
    #[error("volume '{device}' has unsupported type '{volume_type}'")]
    UnsupportedVolumeType {
        /// Device name
        device: String,
        /// Declared type
        volume_type: String,
    },

    /// The CRD strategy is missing a required field
    #[error("crd strategy field '{field}' must not be empty")]
    CrdStrategyFieldMissing {
        /// The missing field
        field: &'static str,
    },

    /// `maxUnavailable` is not an integer or percentage
    #[error("maxUnavailable '{value}' is neither an integer nor a percentage")]
    InvalidMaxUnavailable {
        /// Declared value
        value: String,
    },

    /// The `managed` strategy only applies to managed node groups
    #[error("strategy 'managed' requires provisioner 'eks-managed'")]
    ManagedStrategyMisuse,

    /// The instance type is not permitted by controller boundaries
    #[error("instance type '{instance_type}' is restricted by controller configuration")]
    RestrictedInstanceType {
        /// Declared instance type
        instance_type: String,
    },
}

impl InstanceGroupSpec {
    /// The self-managed spec block, for both `eks` and `eks-cf`.
    #[must_use]
    pub fn self_managed(&self) -> Option<&EksSpec> {
        match self.provisioner {
            Provisioner::Eks => self.eks.as_ref(),
            Provisioner::EksCf => self.eks_cf.as_ref(),
            _ => None,
        }
    }

    /// The scaling-configuration kind the group should use.
    ///
    /// `eks-cf` always selects launch configurations.
    #[must_use]
    pub fn scaling_config_kind(&self) -> ScalingConfigKind {
        match self.provisioner {
            Provisioner::EksCf => ScalingConfigKind::LaunchConfiguration,
            _ => self
                .self_managed()
                .map(|s| s.configuration_type)
                .unwrap_or_default(),
        }
    }

    /// Validate the spec structurally.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found. Validation errors are
    /// permanent: the reconciler surfaces them via status and an event and
    /// does not requeue.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mismatch = || ValidationError::ProvisionerSpecMismatch {
            provisioner: self.provisioner.to_string(),
        };

        let populated = [
            self.eks.is_some(),
            self.eks_cf.is_some(),
            self.eks_managed.is_some(),
            self.eks_fargate.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();
        if populated != 1 {
            return Err(mismatch());
        }

        match self.provisioner {
            Provisioner::Eks | Provisioner::EksCf => {
                let spec = self.self_managed().ok_or_else(mismatch)?;
                if spec.min_size > spec.max_size {
                    return Err(ValidationError::SizeInverted {
                        min: spec.min_size,
                        max: spec.max_size,
                    });
                }
                for volume in &spec.configuration.volumes {
                    if !ALLOWED_VOLUME_TYPES.contains(&volume.volume_type.as_str()) {
                        return Err(ValidationError::UnsupportedVolumeType {
                            device: volume.name.clone(),
                            volume_type: volume.volume_type.clone(),
                        });
                    }
                }
            }
            Provisioner::EksManaged => {
                let spec = self.eks_managed.as_ref().ok_or_else(mismatch)?;
                if spec.min_size > spec.max_size {
                    return Err(ValidationError::SizeInverted {
                        min: spec.min_size,
                        max: spec.max_size,
                    });
                }
            }
            Provisioner::EksFargate => {
                self.eks_fargate.as_ref().ok_or_else(mismatch)?;
            }
        }

        self.validate_strategy()
    }

    fn validate_strategy(&self) -> Result<(), ValidationError> {
        match self.strategy.strategy_type {
            StrategyKind::RollingUpdate => {
                if let Some(rolling) = &self.strategy.rolling_update {
                    if let Some(IntOrString::String(value)) = &rolling.max_unavailable {
                        if !value.ends_with('%') || value.trim_end_matches('%').parse::<i32>().is_err()
                        {
                            return Err(ValidationError::InvalidMaxUnavailable {
                                value: value.clone(),
                            });
                        }
                    }
                }
                Ok(())
            }
            StrategyKind::Crd => {
                let crd = self.strategy.crd.as_ref().ok_or(
                    ValidationError::CrdStrategyFieldMissing { field: "crd" },
                )?;
                let required: [(&'static str, Option<&String>); 5] = [
                    ("spec", crd.spec.as_ref()),
                    ("crdName", crd.crd_name.as_ref()),
                    ("statusJSONPath", crd.status_json_path.as_ref()),
                    ("statusSuccessString", crd.status_success_string.as_ref()),
                    ("statusFailureString", crd.status_failure_string.as_ref()),
                ];
                for (field, value) in required {
                    if value.map(String::as_str).unwrap_or("").trim().is_empty() {
                        return Err(ValidationError::CrdStrategyFieldMissing { field });
                    }
                }
                Ok(())
            }
            StrategyKind::Managed => {
                if self.provisioner == Provisioner::EksManaged {
                    Ok(())
                } else {
                    Err(ValidationError::ManagedStrategyMisuse)
                }
            }
        }
    }
}

impl InstanceGroup {
    /// Whether the resource carries a deletion timestamp.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// The group's cluster name, independent of provisioner.
    #[must_use]
    pub fn cluster_name(&self) -> Option<&str> {
        match self.spec.provisioner {
            Provisioner::Eks | Provisioner::EksCf => self
                .spec
                .self_managed()
                .map(|s| s.configuration.cluster_name.as_str()),
            Provisioner::EksManaged => self
                .spec
                .eks_managed
                .as_ref()
                .map(|s| s.configuration.cluster_name.as_str()),
            Provisioner::EksFargate => self
                .spec
                .eks_fargate
                .as_ref()
                .map(|s| s.cluster_name.as_str()),
        }
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
