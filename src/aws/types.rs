// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain types for observed cloud state and mutation inputs.
//!
//! The capability traits in [`crate::aws::api`] speak these types rather than
//! vendor SDK types, so reconcilers and strategies stay testable against
//! in-memory doubles and the SDK surface stays confined to
//! [`crate::aws::clients`].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A reference to a launch template, as carried on a scaling group or an
/// instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateReference {
    /// Template id (`lt-...`)
    pub id: Option<String>,
    /// Template name
    pub name: Option<String>,
    /// Version the reference pins: a number, `$Latest`, or `$Default`
    pub version: Option<String>,
}

/// One instance inside a scaling group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupInstance {
    /// EC2 instance id
    pub id: String,
    /// Lifecycle state reported by the scaling group, e.g. `InService`
    pub lifecycle_state: String,
    /// Launch configuration the instance was launched from, if any
    pub launch_configuration_name: Option<String>,
    /// Launch template the instance was launched from, if any
    pub launch_template: Option<TemplateReference>,
}

/// Observed scaling group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScalingGroup {
    /// Group name
    pub name: String,
    /// Minimum capacity
    pub min_size: i32,
    /// Maximum capacity
    pub max_size: i32,
    /// Desired capacity
    pub desired_capacity: i32,
    /// Subnet ids the group spans
    pub subnets: Vec<String>,
    /// Attached launch configuration, if configuration-backed
    pub launch_configuration_name: Option<String>,
    /// Attached launch template, if template-backed
    pub launch_template: Option<TemplateReference>,
    /// Launch template inside a mixed-instances policy, if any
    pub mixed_instances_template: Option<TemplateReference>,
    /// Current members
    pub instances: Vec<GroupInstance>,
    /// Group tags
    pub tags: BTreeMap<String, String>,
    /// Suspended Auto Scaling processes
    pub suspended_processes: Vec<String>,
    /// Group status; set while a delete is in progress
    pub status: Option<String>,
}

impl ScalingGroup {
    /// The template reference in effect, whether direct or mixed-instances.
    #[must_use]
    pub fn template_reference(&self) -> Option<&TemplateReference> {
        self.launch_template
            .as_ref()
            .or(self.mixed_instances_template.as_ref())
    }

    /// Whether the cloud reports the group as deleting.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.contains("Delete"))
    }
}

/// Instance placement parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    /// Availability zone
    pub availability_zone: Option<String>,
    /// Host resource group ARN
    pub host_resource_group_arn: Option<String>,
    /// Tenancy: default, dedicated, or host
    pub tenancy: Option<String>,
}

/// Instance metadata-service options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataOptions {
    /// enabled | disabled
    pub http_endpoint: Option<String>,
    /// optional | required
    pub http_tokens: Option<String>,
    /// Hop limit for PUT responses
    pub http_put_response_hop_limit: Option<i64>,
}

/// A block-device mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockDevice {
    /// Device name, e.g. `/dev/xvda`
    pub device_name: String,
    /// Volume type: gp2, gp3, io1, io2, sc1, st1
    pub volume_type: String,
    /// Size in GiB
    pub size: i64,
    /// Provisioned IOPS
    pub iops: Option<i64>,
    /// Provisioned throughput in MiB/s
    pub throughput: Option<i64>,
    /// Snapshot the volume restores from
    pub snapshot_id: Option<String>,
    /// Delete with the instance
    pub delete_on_termination: Option<bool>,
    /// Encrypt at rest
    pub encrypted: Option<bool>,
}

/// The common input to scaling-configuration creation, and the canonical
/// shape observed launch configurations and template versions are parsed
/// into. Drift detection compares an input against an observed payload
/// field by field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigurationInput {
    /// Resource name (full name for launch configurations, template name
    /// for launch templates)
    pub name: String,
    /// AMI id
    pub image_id: String,
    /// Instance type
    pub instance_type: String,
    /// Key pair name
    pub key_name: Option<String>,
    /// Security group ids
    pub security_groups: Vec<String>,
    /// Base64-encoded user data
    pub user_data: String,
    /// Instance profile ARN
    pub instance_profile_arn: Option<String>,
    /// Block-device mappings
    pub block_devices: Vec<BlockDevice>,
    /// Maximum spot price; None requests on-demand capacity
    pub spot_price: Option<String>,
    /// License-configuration ARNs (templates only)
    pub license_specifications: Vec<String>,
    /// Placement (templates only)
    pub placement: Option<Placement>,
    /// Metadata options (templates only)
    pub metadata_options: Option<MetadataOptions>,
}

/// Observed launch configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaunchConfiguration {
    /// Configuration name
    pub name: String,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Parsed payload for drift comparison
    pub payload: ConfigurationInput,
}

/// Observed launch template head.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchTemplate {
    /// Template id (`lt-...`)
    pub id: String,
    /// Template name
    pub name: String,
    /// Highest version number
    pub latest_version: i64,
    /// Version the `$Default` pointer selects
    pub default_version: i64,
}

/// One version of a launch template.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaunchTemplateVersion {
    /// Owning template id
    pub template_id: String,
    /// Owning template name
    pub template_name: String,
    /// Version number
    pub version: i64,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Parsed payload for drift comparison
    pub payload: ConfigurationInput,
}

/// Reference a scaling group uses to launch instances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupConfigRef {
    /// Point the group at a launch configuration by name
    LaunchConfiguration(String),
    /// Point the group at a launch template version
    LaunchTemplate(TemplateReference),
    /// Point the group at a template through a mixed-instances policy
    MixedInstances {
        /// The template reference
        template: TemplateReference,
        /// Spot allocation strategy
        strategy: Option<String>,
        /// Percentage of capacity served on-demand
        base_capacity: Option<i32>,
        /// Spot pool count for lowest-price allocation
        spot_pools: Option<i32>,
        /// Instance type overrides
        instance_types: Vec<String>,
    },
}

/// Input to scaling-group create/update.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalingGroupInput {
    /// Group name
    pub name: String,
    /// Minimum capacity
    pub min_size: i32,
    /// Maximum capacity
    pub max_size: i32,
    /// Desired capacity; None leaves the current value alone
    pub desired_capacity: Option<i32>,
    /// Subnet ids
    pub subnets: Vec<String>,
    /// Launch reference
    pub config_ref: GroupConfigRef,
    /// Tags, with propagate-at-launch
    pub tags: Vec<(String, String, bool)>,
}

/// Input to lifecycle-hook creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleHookInput {
    /// Hook name
    pub name: String,
    /// Cloud-side transition string
    pub transition: String,
    /// CONTINUE or ABANDON on timeout
    pub default_result: Option<String>,
    /// Heartbeat timeout seconds
    pub heartbeat_timeout: Option<i32>,
    /// Notification target ARN
    pub notification_arn: Option<String>,
    /// Role assumed to publish notifications
    pub role_arn: Option<String>,
    /// Opaque metadata included in notifications
    pub notification_metadata: Option<String>,
}

/// Observed IAM role.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Role {
    /// Role name
    pub name: String,
    /// Role ARN
    pub arn: String,
}

/// Observed instance profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceProfile {
    /// Profile name
    pub name: String,
    /// Profile ARN
    pub arn: String,
    /// Names of roles attached to the profile
    pub roles: Vec<String>,
}

/// Lifecycle of a managed node group, bucketed from the cloud status string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeGroup {
    /// Node group name
    pub name: String,
    /// Cloud status, e.g. `ACTIVE`, `CREATING`, `CREATE_FAILED`
    pub status: String,
    /// Observed minimum size
    pub min_size: i32,
    /// Observed maximum size
    pub max_size: i32,
    /// Observed desired size
    pub desired_size: i32,
    /// Node role ARN
    pub node_role: Option<String>,
    /// Node labels applied by the service
    pub labels: BTreeMap<String, String>,
}

/// Input to managed node-group create/update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeGroupInput {
    /// Node group name
    pub name: String,
    /// EKS cluster name
    pub cluster_name: String,
    /// Minimum size
    pub min_size: i32,
    /// Maximum size
    pub max_size: i32,
    /// Desired size
    pub desired_size: i32,
    /// Instance types
    pub instance_types: Vec<String>,
    /// AMI type
    pub ami_type: Option<String>,
    /// Node role ARN
    pub node_role: String,
    /// Subnets
    pub subnets: Vec<String>,
    /// Node labels
    pub labels: BTreeMap<String, String>,
    /// Tags
    pub tags: BTreeMap<String, String>,
    /// Root volume size in GiB
    pub volume_size: Option<i32>,
    /// SSH key pair
    pub ssh_key_name: Option<String>,
}

/// Observed Fargate profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FargateProfile {
    /// Profile name
    pub name: String,
    /// Cloud status, e.g. `ACTIVE`, `CREATING`, `CREATE_FAILED`
    pub status: String,
    /// Pod execution role ARN
    pub pod_execution_role_arn: Option<String>,
}

/// Input to Fargate profile creation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FargateProfileInput {
    /// Profile name
    pub name: String,
    /// EKS cluster name
    pub cluster_name: String,
    /// Pod execution role ARN
    pub pod_execution_role_arn: String,
    /// Private subnets
    pub subnets: Vec<String>,
    /// Pod selectors: namespace plus labels
    pub selectors: Vec<(String, BTreeMap<String, String>)>,
    /// Tags
    pub tags: BTreeMap<String, String>,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
