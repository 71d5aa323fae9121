// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scaling-configuration abstraction.
//!
//! A scaling group launches instances either from an immutable **launch
//! configuration** (replaced wholesale on change) or from a versioned
//! **launch template** (a new version is issued on change). This module
//! hides that difference behind one trait so the self-managed reconciler
//! can discover, drift-check, rotate, and garbage-collect either kind:
//!
//! - [`launch_configuration`] - replace-on-change variant with retain-N GC
//! - [`launch_template`] - version-on-change variant with retain-R GC
//!
//! Naming is deterministic: configurations are `<prefix>-<suffix>` where
//! the suffix hashes the create input, and the *launch id* used to key
//! upgrade resources is the last dash segment of a configuration name or
//! `<template-id>-<version>` for templates.

pub mod launch_configuration;
pub mod launch_template;

use crate::aws::api::CloudResult;
pub use crate::aws::api::swallow_not_found;
use crate::aws::types::{ConfigurationInput, GroupConfigRef, GroupInstance, ScalingGroup};
use crate::aws::CloudClients;
use crate::constants::CONFIG_NAME_SUFFIX_LEN;
use crate::crd::ScalingConfigKind;
use async_trait::async_trait;
use launch_configuration::LaunchConfigurationAdapter;
use launch_template::LaunchTemplateAdapter;
use sha2::{Digest, Sha256};

/// Input to scaling-configuration deletion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionInput {
    /// Number of most-recent versions/configurations to keep
    pub retain_versions: usize,
    /// Remove everything owned by the prefix instead of retaining
    pub delete_all: bool,
}

/// The opaque resource behind a scaling configuration, for status reporting.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigResource {
    /// Active launch configuration
    LaunchConfiguration(crate::aws::types::LaunchConfiguration),
    /// Launch template head plus latest version number
    LaunchTemplate(crate::aws::types::LaunchTemplate),
    /// Nothing discovered yet
    None,
}

/// Polymorphic scaling-configuration capability set.
///
/// Implementations carry the state discovered by [`discover`] and answer
/// pure questions (`drifted`, `rotation_needed`, `provisioned`) against it;
/// `create` and `delete` mutate the cloud.
///
/// [`discover`]: ScalingConfiguration::discover
#[async_trait]
pub trait ScalingConfiguration: Send + Sync {
    /// Observe the current cloud state for this configuration.
    async fn discover(&mut self) -> CloudResult<()>;

    /// Whether an active configuration exists.
    fn provisioned(&self) -> bool;

    /// Name of the active configuration resource.
    fn name(&self) -> Option<String>;

    /// Launch id keying upgrade resources: the last dash segment of a
    /// configuration name, or `<template-id>-<version>`.
    fn launch_id(&self) -> Option<String>;

    /// Latest version number as reported in status, when versioned.
    fn latest_version(&self) -> Option<i64>;

    /// Whether the latest configuration differs from the input.
    fn drifted(&self, input: &ConfigurationInput) -> bool;

    /// Create (or version) the configuration and return the reference the
    /// scaling group should launch from.
    async fn create(&mut self, input: &ConfigurationInput) -> CloudResult<GroupConfigRef>;

    /// Garbage-collect or fully remove owned configurations.
    async fn delete(&mut self, input: &DeletionInput) -> CloudResult<()>;

    /// Ids of instances running a configuration other than the latest, in
    /// stable (group) order.
    fn update_targets(&self, instances: &[GroupInstance]) -> Vec<String>;

    /// Whether any group instance runs a configuration other than the latest.
    fn rotation_needed(&self, instances: &[GroupInstance]) -> bool {
        !self.update_targets(instances).is_empty()
    }

    /// The launch reference a scaling group should currently point at,
    /// when an active configuration exists.
    fn current_reference(&self) -> Option<GroupConfigRef>;

    /// The underlying resource, for status write-back.
    fn resource(&self) -> ConfigResource;
}

/// Pick the configuration kind from an observed scaling group, when one
/// exists; the declared kind decides otherwise.
#[must_use]
pub fn kind_from_observation(group: Option<&ScalingGroup>) -> Option<ScalingConfigKind> {
    let group = group?;
    if group.launch_configuration_name.is_some() {
        Some(ScalingConfigKind::LaunchConfiguration)
    } else if group.template_reference().is_some() {
        Some(ScalingConfigKind::LaunchTemplate)
    } else {
        None
    }
}

/// Construct the adapter for a configuration kind.
///
/// The observed group (when present) decides which variant is live so a
/// declared-kind change still drains the old variant before switching.
#[must_use]
pub fn new_scaling_configuration(
    declared: ScalingConfigKind,
    clients: &CloudClients,
    prefix: &str,
    observed: Option<&ScalingGroup>,
) -> Box<dyn ScalingConfiguration> {
    let kind = kind_from_observation(observed).unwrap_or(declared);
    match kind {
        ScalingConfigKind::LaunchConfiguration => Box::new(LaunchConfigurationAdapter::new(
            clients.scaling.clone(),
            prefix,
            observed.and_then(|group| group.launch_configuration_name.clone()),
        )),
        ScalingConfigKind::LaunchTemplate => {
            Box::new(LaunchTemplateAdapter::new(clients.compute.clone(), prefix))
        }
    }
}

/// Deterministic suffix for a configuration name, hashing exactly the
/// fields [`payload_drifted`] compares, with the same order normalization.
/// Equal inputs produce equal names; any drift-visible change produces a
/// fresh one — the two functions must agree, or a drifted input would
/// rename to the stale configuration and never rotate.
#[must_use]
pub fn config_suffix(input: &ConfigurationInput) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.image_id.as_bytes());
    hasher.update(input.instance_type.as_bytes());
    hasher.update(input.key_name.as_deref().unwrap_or_default().as_bytes());
    let mut groups = input.security_groups.clone();
    groups.sort();
    for group in &groups {
        hasher.update(group.as_bytes());
    }
    hasher.update(input.user_data.as_bytes());
    hasher.update(
        input
            .instance_profile_arn
            .as_deref()
            .unwrap_or_default()
            .as_bytes(),
    );
    hasher.update(input.spot_price.as_deref().unwrap_or_default().as_bytes());

    let mut devices = input.block_devices.clone();
    devices.sort_by(|a, b| a.device_name.cmp(&b.device_name));
    for device in &devices {
        hasher.update(device.device_name.as_bytes());
        hasher.update(device.volume_type.as_bytes());
        hasher.update(device.size.to_le_bytes());
        hasher.update(device.iops.unwrap_or(-1).to_le_bytes());
        hasher.update(device.throughput.unwrap_or(-1).to_le_bytes());
        hasher.update(device.snapshot_id.as_deref().unwrap_or_default().as_bytes());
        // Tri-state encoding keeps None distinct from an explicit false
        hasher.update([
            device.delete_on_termination.map_or(2, u8::from),
            device.encrypted.map_or(2, u8::from),
        ]);
    }

    let mut licenses = input.license_specifications.clone();
    licenses.sort();
    for arn in &licenses {
        hasher.update(arn.as_bytes());
    }
    if let Some(placement) = &input.placement {
        hasher.update(
            placement
                .availability_zone
                .as_deref()
                .unwrap_or_default()
                .as_bytes(),
        );
        hasher.update(
            placement
                .host_resource_group_arn
                .as_deref()
                .unwrap_or_default()
                .as_bytes(),
        );
        hasher.update(placement.tenancy.as_deref().unwrap_or_default().as_bytes());
    }
    if let Some(options) = &input.metadata_options {
        hasher.update(options.http_endpoint.as_deref().unwrap_or_default().as_bytes());
        hasher.update(options.http_tokens.as_deref().unwrap_or_default().as_bytes());
        hasher.update(options.http_put_response_hop_limit.unwrap_or(-1).to_le_bytes());
    }

    let digest = hasher.finalize();
    let mut suffix = String::with_capacity(CONFIG_NAME_SUFFIX_LEN);
    for byte in digest.iter().take(CONFIG_NAME_SUFFIX_LEN / 2) {
        suffix.push_str(&format!("{byte:02x}"));
    }
    suffix
}

/// Derive the launch id from a configuration name: its last dash segment.
#[must_use]
pub fn launch_id_from_config_name(name: &str) -> Option<String> {
    name.rsplit('-').next().map(String::from)
}

/// Derive the launch id for a template version: `<template-id>-<version>`.
#[must_use]
pub fn template_launch_id(template_id: &str, version: i64) -> String {
    format!("{template_id}-{version}")
}

fn normalized_opt(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Compare an observed payload against the declared input on the drift
/// fields. Order-independent for security groups; order-normalized for
/// block devices (by device name) and license specifications (by ARN).
///
/// Pure: equal inputs against equal payloads always agree.
#[must_use]
pub fn payload_drifted(observed: &ConfigurationInput, input: &ConfigurationInput) -> bool {
    if observed.image_id != input.image_id
        || observed.instance_type != input.instance_type
        || normalized_opt(&observed.key_name) != normalized_opt(&input.key_name)
        || observed.user_data != input.user_data
        || normalized_opt(&observed.instance_profile_arn)
            != normalized_opt(&input.instance_profile_arn)
        || normalized_opt(&observed.spot_price) != normalized_opt(&input.spot_price)
    {
        return true;
    }

    let mut observed_groups = observed.security_groups.clone();
    let mut input_groups = input.security_groups.clone();
    observed_groups.sort();
    input_groups.sort();
    if observed_groups != input_groups {
        return true;
    }

    let mut observed_devices = observed.block_devices.clone();
    let mut input_devices = input.block_devices.clone();
    observed_devices.sort_by(|a, b| a.device_name.cmp(&b.device_name));
    input_devices.sort_by(|a, b| a.device_name.cmp(&b.device_name));
    if observed_devices != input_devices {
        return true;
    }

    let mut observed_licenses = observed.license_specifications.clone();
    let mut input_licenses = input.license_specifications.clone();
    observed_licenses.sort();
    input_licenses.sort();
    if observed_licenses != input_licenses {
        return true;
    }

    if observed.placement != input.placement {
        return true;
    }

    observed.metadata_options != input.metadata_options
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
