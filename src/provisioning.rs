// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! IAM role and instance-profile provisioning.
//!
//! Self-managed groups run nodes under a role and instance profile that
//! share one deterministic name. Creation must tolerate IAM's propagation
//! lag: the profile exists before the role can be attached, and a role
//! delete can race the policy detachments that precede it, so both paths
//! carry bounded waits. Managed node groups and Fargate profiles use a
//! single default execution role with one default policy when the spec
//! supplies none.

use crate::aws::api::{swallow_not_found, CloudError, CloudResult, IdentityApi};
use crate::aws::types::{InstanceProfile, Role};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Trust policy allowing EC2 instances to assume a node role.
pub const EC2_TRUST_POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Principal": { "Service": "ec2.amazonaws.com" },
      "Action": "sts:AssumeRole"
    }
  ]
}"#;

/// Trust policy allowing the Fargate service to assume an execution role.
pub const FARGATE_TRUST_POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Principal": { "Service": "eks-fargate-pods.amazonaws.com" },
      "Action": "sts:AssumeRole"
    }
  ]
}"#;

/// The role/profile pair a self-managed group runs under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeIdentity {
    /// The node role
    pub role: Role,
    /// The instance profile wrapping the role
    pub profile: InstanceProfile,
}

/// Split the attached-policy reality against the declaration.
///
/// Returns `(to_attach, to_detach)`.
#[must_use]
pub fn policy_diff(attached: &[String], declared: &[String]) -> (Vec<String>, Vec<String>) {
    let to_attach = declared
        .iter()
        .filter(|arn| !attached.contains(arn))
        .cloned()
        .collect();
    let to_detach = attached
        .iter()
        .filter(|arn| !declared.contains(arn))
        .cloned()
        .collect();
    (to_attach, to_detach)
}

/// Ensure the role and instance profile for a self-managed group exist,
/// are attached to each other, and carry exactly the declared policies.
///
/// # Arguments
///
/// * `identity` - IAM capability handle
/// * `name` - Deterministic shared name for role and profile
/// * `trust_policy` - Trust policy document for role creation
/// * `declared_policies` - Managed policy ARNs the role must carry
/// * `propagation_delay` - Wait after creating the profile before attaching
///   the role; IAM propagation lags the create call
///
/// # Errors
///
/// Returns the first cloud error that is not an expected race
/// (already-exists, limit-exceeded on attach).
pub async fn ensure_node_identity(
    identity: &Arc<dyn IdentityApi>,
    name: &str,
    trust_policy: &str,
    declared_policies: &[String],
    propagation_delay: Duration,
) -> CloudResult<NodeIdentity> {
    let role = match identity.get_role(name).await? {
        Some(role) => role,
        None => {
            info!(role = %name, "Creating node role");
            match identity.create_role(name, trust_policy).await {
                Ok(role) => role,
                Err(CloudError::AlreadyExists(_)) => identity
                    .get_role(name)
                    .await?
                    .ok_or_else(|| CloudError::NotFound(name.to_string()))?,
                Err(err) => return Err(err),
            }
        }
    };

    let (profile, created) = match identity.get_instance_profile(name).await? {
        Some(profile) => (profile, false),
        None => {
            info!(profile = %name, "Creating instance profile");
            match identity.create_instance_profile(name).await {
                Ok(profile) => (profile, true),
                Err(CloudError::AlreadyExists(_)) => (
                    identity
                        .get_instance_profile(name)
                        .await?
                        .ok_or_else(|| CloudError::NotFound(name.to_string()))?,
                    false,
                ),
                Err(err) => return Err(err),
            }
        }
    };

    if created && !propagation_delay.is_zero() {
        debug!(
            delay_secs = propagation_delay.as_secs(),
            "Waiting out instance-profile propagation"
        );
        tokio::time::sleep(propagation_delay).await;
    }

    if !profile.roles.contains(&role.name) {
        match identity
            .add_role_to_instance_profile(&profile.name, &role.name)
            .await
        {
            Ok(()) => {}
            // Limit-exceeded means a role is already attached
            Err(CloudError::LimitExceeded(_)) => {
                debug!(profile = %profile.name, "Role already attached to profile");
            }
            Err(err) => return Err(err),
        }
    }

    let attached = identity.list_attached_policies(&role.name).await?;
    let (to_attach, to_detach) = policy_diff(&attached, declared_policies);
    for arn in &to_attach {
        info!(role = %role.name, policy = %arn, "Attaching managed policy");
        identity.attach_role_policy(&role.name, arn).await?;
    }
    for arn in &to_detach {
        info!(role = %role.name, policy = %arn, "Detaching removed policy");
        identity.detach_role_policy(&role.name, arn).await?;
    }

    Ok(NodeIdentity { role, profile })
}

/// Tear down a group's role and instance profile.
///
/// Detaches every managed policy, removes the role from the profile,
/// deletes the profile, then deletes the role with bounded retries — IAM
/// propagation may briefly report the role as still holding policies.
/// Every not-found along the way is success.
///
/// # Errors
///
/// Returns an error if any step fails for a reason other than not-found,
/// or if the role delete keeps failing after the retry budget.
pub async fn delete_node_identity(
    identity: &Arc<dyn IdentityApi>,
    name: &str,
    max_attempts: u32,
    retry_delay: Duration,
) -> CloudResult<()> {
    let attached = match identity.list_attached_policies(name).await {
        Ok(attached) => attached,
        Err(CloudError::NotFound(_)) => Vec::new(),
        Err(err) => return Err(err),
    };
    for arn in &attached {
        swallow_not_found(identity.detach_role_policy(name, arn).await)?;
    }

    swallow_not_found(identity.remove_role_from_instance_profile(name, name).await)?;
    swallow_not_found(identity.delete_instance_profile(name).await)?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match identity.delete_role(name).await {
            Ok(()) => {
                info!(role = %name, "Deleted node role");
                return Ok(());
            }
            Err(CloudError::NotFound(_)) => return Ok(()),
            Err(err) if attempt < max_attempts => {
                warn!(
                    role = %name,
                    attempt,
                    error = %err,
                    "Role delete failed, retrying after propagation delay"
                );
                tokio::time::sleep(retry_delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Ensure a single default execution role exists with one default policy.
///
/// Used by the managed node-group and Fargate provisioners when the spec
/// supplies no role ARN.
///
/// # Errors
///
/// Returns the first unexpected cloud error.
pub async fn ensure_default_role(
    identity: &Arc<dyn IdentityApi>,
    name: &str,
    trust_policy: &str,
    default_policy: &str,
) -> CloudResult<Role> {
    let role = match identity.get_role(name).await? {
        Some(role) => role,
        None => {
            info!(role = %name, "Creating default execution role");
            match identity.create_role(name, trust_policy).await {
                Ok(role) => role,
                Err(CloudError::AlreadyExists(_)) => identity
                    .get_role(name)
                    .await?
                    .ok_or_else(|| CloudError::NotFound(name.to_string()))?,
                Err(err) => return Err(err),
            }
        }
    };

    let attached = identity.list_attached_policies(&role.name).await?;
    if !attached.iter().any(|arn| arn == default_policy) {
        identity
            .attach_role_policy(&role.name, default_policy)
            .await?;
    }
    Ok(role)
}

/// Tear down a default execution role.
///
/// # Errors
///
/// Returns an error if a step fails for a reason other than not-found.
pub async fn delete_default_role(
    identity: &Arc<dyn IdentityApi>,
    name: &str,
    default_policy: &str,
) -> CloudResult<()> {
    swallow_not_found(identity.detach_role_policy(name, default_policy).await)?;
    swallow_not_found(identity.delete_role(name).await)
}

#[cfg(test)]
#[path = "provisioning_tests.rs"]
mod provisioning_tests;
