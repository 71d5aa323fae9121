// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud capability traits and the cloud error taxonomy.
//!
//! Reconcilers and strategies depend only on these traits. Production
//! implementations in [`crate::aws::clients`] layer a TTL response cache and
//! throttle counting over the vendor SDK; unit tests implement the traits
//! with in-memory doubles.
//!
//! A not-found observation is modeled as `Ok(None)` on describe operations
//! and as [`CloudError::NotFound`] on mutations, where the delete paths
//! swallow it.

use crate::aws::types::{
    ConfigurationInput, FargateProfile, FargateProfileInput, InstanceProfile, LaunchConfiguration,
    LaunchTemplate, LaunchTemplateVersion, LifecycleHookInput, NodeGroup, NodeGroupInput, Role,
    ScalingGroup, ScalingGroupInput,
};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by cloud capability implementations.
///
/// The variants the reconcilers branch on (`NotFound`, `AlreadyExists`,
/// `LimitExceeded`, `Throttled`) are split out; everything else collapses
/// into `Api`.
#[derive(Error, Debug, Clone)]
pub enum CloudError {
    /// The referenced resource does not exist
    #[error("cloud resource not found: {0}")]
    NotFound(String),

    /// The resource already exists
    #[error("cloud resource already exists: {0}")]
    AlreadyExists(String),

    /// A service limit was hit; on add-role-to-instance-profile this means
    /// the role is already attached
    #[error("cloud limit exceeded: {0}")]
    LimitExceeded(String),

    /// The request was throttled after the client's own retries
    #[error("cloud request throttled: {0}")]
    Throttled(String),

    /// Any other service error
    #[error("cloud api error [{code}]: {message}")]
    Api {
        /// Service error code
        code: String,
        /// Service error message
        message: String,
    },
}

impl CloudError {
    /// Whether the error should be retried by a later reconcile rather than
    /// failing the group permanently.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Throttled(_))
            || matches!(self, CloudError::Api { code, .. } if code.starts_with("InternalServer") || code == "ServiceUnavailable")
    }
}

/// Result alias for cloud calls.
pub type CloudResult<T> = Result<T, CloudError>;

/// Collapse a not-found error into success. Delete paths treat a missing
/// resource as already gone.
#[must_use = "the remaining error still needs handling"]
pub fn swallow_not_found(result: CloudResult<()>) -> CloudResult<()> {
    match result {
        Err(CloudError::NotFound(_)) => Ok(()),
        other => other,
    }
}

/// Scaling-group and launch-configuration operations (Auto Scaling service).
#[async_trait]
pub trait ScalingApi: Send + Sync {
    /// List every scaling group, paginated to completion.
    async fn describe_scaling_groups(&self) -> CloudResult<Vec<ScalingGroup>>;

    /// Create a scaling group.
    async fn create_scaling_group(&self, input: &ScalingGroupInput) -> CloudResult<()>;

    /// Update an existing scaling group in place.
    async fn update_scaling_group(&self, input: &ScalingGroupInput) -> CloudResult<()>;

    /// Replace the tag set on a group.
    async fn update_group_tags(&self, group: &str, tags: &[(String, String, bool)])
        -> CloudResult<()>;

    /// Delete a scaling group and its instances.
    async fn delete_scaling_group(&self, name: &str) -> CloudResult<()>;

    /// Terminate one instance without decrementing desired capacity.
    async fn terminate_instance(&self, instance_id: &str) -> CloudResult<()>;

    /// List launch configurations whose name starts with `prefix`.
    async fn describe_launch_configurations(
        &self,
        prefix: &str,
    ) -> CloudResult<Vec<LaunchConfiguration>>;

    /// Create a launch configuration.
    async fn create_launch_configuration(&self, input: &ConfigurationInput) -> CloudResult<()>;

    /// Delete a launch configuration by name.
    async fn delete_launch_configuration(&self, name: &str) -> CloudResult<()>;

    /// Install or update a lifecycle hook on a group.
    async fn put_lifecycle_hook(&self, group: &str, hook: &LifecycleHookInput) -> CloudResult<()>;

    /// Names of lifecycle hooks currently on a group.
    async fn describe_lifecycle_hooks(&self, group: &str) -> CloudResult<Vec<String>>;

    /// Remove a lifecycle hook from a group.
    async fn delete_lifecycle_hook(&self, group: &str, hook: &str) -> CloudResult<()>;

    /// Suspend the named Auto Scaling processes.
    async fn suspend_processes(&self, group: &str, processes: &[String]) -> CloudResult<()>;

    /// Resume the named Auto Scaling processes.
    async fn resume_processes(&self, group: &str, processes: &[String]) -> CloudResult<()>;
}

/// Launch-template operations (EC2 service).
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Look up a launch template by name; `Ok(None)` when absent.
    async fn describe_launch_template(&self, name: &str) -> CloudResult<Option<LaunchTemplate>>;

    /// All versions of a template, unordered; empty when the template is
    /// absent.
    async fn describe_template_versions(
        &self,
        name: &str,
    ) -> CloudResult<Vec<LaunchTemplateVersion>>;

    /// Create a template with its first version.
    async fn create_launch_template(&self, input: &ConfigurationInput)
        -> CloudResult<LaunchTemplate>;

    /// Issue a new version of an existing template.
    async fn create_template_version(
        &self,
        name: &str,
        input: &ConfigurationInput,
    ) -> CloudResult<LaunchTemplateVersion>;

    /// Point the `$Default` version at `version`.
    async fn set_default_version(&self, name: &str, version: i64) -> CloudResult<()>;

    /// Delete specific template versions.
    async fn delete_template_versions(&self, name: &str, versions: &[i64]) -> CloudResult<()>;

    /// Delete a template and all its versions.
    async fn delete_launch_template(&self, name: &str) -> CloudResult<()>;
}

/// IAM role and instance-profile operations.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Look up a role by name; `Ok(None)` when absent.
    async fn get_role(&self, name: &str) -> CloudResult<Option<Role>>;

    /// Create a role with the given trust policy document.
    async fn create_role(&self, name: &str, trust_policy: &str) -> CloudResult<Role>;

    /// Delete a role by name.
    async fn delete_role(&self, name: &str) -> CloudResult<()>;

    /// Look up an instance profile by name; `Ok(None)` when absent.
    async fn get_instance_profile(&self, name: &str) -> CloudResult<Option<InstanceProfile>>;

    /// Create an instance profile.
    async fn create_instance_profile(&self, name: &str) -> CloudResult<InstanceProfile>;

    /// Delete an instance profile by name.
    async fn delete_instance_profile(&self, name: &str) -> CloudResult<()>;

    /// Attach a role to a profile. `LimitExceeded` means already attached.
    async fn add_role_to_instance_profile(&self, profile: &str, role: &str) -> CloudResult<()>;

    /// Detach a role from a profile.
    async fn remove_role_from_instance_profile(&self, profile: &str, role: &str)
        -> CloudResult<()>;

    /// Attach a managed policy to a role.
    async fn attach_role_policy(&self, role: &str, policy_arn: &str) -> CloudResult<()>;

    /// Detach a managed policy from a role.
    async fn detach_role_policy(&self, role: &str, policy_arn: &str) -> CloudResult<()>;

    /// ARNs of managed policies attached to a role, paginated to completion.
    async fn list_attached_policies(&self, role: &str) -> CloudResult<Vec<String>>;
}

/// Managed node-group and Fargate-profile operations (EKS service).
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Look up a managed node group; `Ok(None)` when absent.
    async fn describe_node_group(
        &self,
        cluster: &str,
        name: &str,
    ) -> CloudResult<Option<NodeGroup>>;

    /// Create a managed node group.
    async fn create_node_group(&self, input: &NodeGroupInput) -> CloudResult<()>;

    /// Update a node group's scaling configuration and labels.
    async fn update_node_group(&self, input: &NodeGroupInput) -> CloudResult<()>;

    /// Delete a managed node group.
    async fn delete_node_group(&self, cluster: &str, name: &str) -> CloudResult<()>;

    /// Look up a Fargate profile; `Ok(None)` when absent.
    async fn describe_fargate_profile(
        &self,
        cluster: &str,
        name: &str,
    ) -> CloudResult<Option<FargateProfile>>;

    /// Create a Fargate profile.
    async fn create_fargate_profile(&self, input: &FargateProfileInput) -> CloudResult<()>;

    /// Delete a Fargate profile.
    async fn delete_fargate_profile(&self, cluster: &str, name: &str) -> CloudResult<()>;
}

/// Parameter Store lookups (SSM service), used for `ssm://` image aliases.
#[async_trait]
pub trait ParameterApi: Send + Sync {
    /// Fetch a parameter value; `Ok(None)` when the parameter is absent.
    async fn get_parameter(&self, name: &str) -> CloudResult<Option<String>>;
}
