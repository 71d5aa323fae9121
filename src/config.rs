// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller configuration.
//!
//! An optional YAML file (passed via `--controller-config`) layers shared
//! defaults and boundaries over every reconciled InstanceGroup: default
//! subnets and tags merged into specs, managed policies appended to node
//! roles, and restricted instance types rejected at validation time.
//! CLI flags override individual fields after loading.

use crate::constants::{
    DEFAULT_MAX_WORKERS, DEFAULT_RETAINED_LAUNCH_CONFIGURATIONS,
    DEFAULT_RETAINED_TEMPLATE_VERSIONS, DEFAULT_SPOT_RECOMMENDATION_MINUTES,
    ERROR_BACKOFF_MAX_SECS, IAM_PROPAGATION_DELAY_SECS,
};
use crate::crd::{CloudTag, EksConfiguration, ValidationError};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Instance types and sizes the controller refuses to provision.
#[derive(Clone, Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Boundaries {
    /// Instance types rejected at validation time
    pub restricted_instance_types: Vec<String>,
}

/// Defaults merged into every InstanceGroup spec.
#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SharedDefaults {
    /// Subnets used when a spec declares none
    pub subnets: Vec<String>,
    /// Tags appended to every scaling group
    pub tags: Vec<CloudTag>,
    /// Managed policies appended to every node role
    pub managed_policies: Vec<String>,
}

/// Root controller configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Concurrent reconcile workers
    pub max_workers: usize,

    /// Freshness window for spot-recommendation events, in minutes
    pub spot_recommendation_minutes: i64,

    /// Launch-template versions retained during garbage collection
    pub retained_template_versions: usize,

    /// Launch configurations retained during garbage collection
    pub retained_launch_configurations: usize,

    /// Wait between instance-profile creation and role attachment
    pub iam_propagation_delay_secs: u64,

    /// Ceiling for transient-error exponential backoff
    pub max_backoff_secs: u64,

    /// Provisioning boundaries
    pub boundaries: Boundaries,

    /// Shared defaults merged into specs
    pub defaults: SharedDefaults,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            spot_recommendation_minutes: DEFAULT_SPOT_RECOMMENDATION_MINUTES,
            retained_template_versions: DEFAULT_RETAINED_TEMPLATE_VERSIONS,
            retained_launch_configurations: DEFAULT_RETAINED_LAUNCH_CONFIGURATIONS,
            iam_propagation_delay_secs: IAM_PROPAGATION_DELAY_SECS,
            max_backoff_secs: ERROR_BACKOFF_MAX_SECS,
            boundaries: Boundaries::default(),
            defaults: SharedDefaults::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from a YAML file, or defaults when no path is
    /// given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading controller config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing controller config {}", path.display()))?;
        info!(path = %path.display(), "Loaded controller configuration");
        Ok(config)
    }

    /// Merge shared defaults into a self-managed configuration block.
    ///
    /// Declared values win: subnets are only defaulted when empty, tags and
    /// managed policies are appended without duplicating declared entries.
    pub fn apply_defaults(&self, configuration: &mut EksConfiguration) {
        if configuration.subnets.is_empty() {
            configuration.subnets.clone_from(&self.defaults.subnets);
        }
        for tag in &self.defaults.tags {
            if !configuration.tags.iter().any(|t| t.key == tag.key) {
                configuration.tags.push(tag.clone());
            }
        }
        for policy in &self.defaults.managed_policies {
            if !configuration.managed_policies.contains(policy) {
                configuration.managed_policies.push(policy.clone());
            }
        }
    }

    /// Reject instance types the boundaries forbid.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RestrictedInstanceType`] for a forbidden
    /// type.
    pub fn check_boundaries(&self, instance_type: &str) -> Result<(), ValidationError> {
        if self
            .boundaries
            .restricted_instance_types
            .iter()
            .any(|restricted| restricted == instance_type)
        {
            return Err(ValidationError::RestrictedInstanceType {
                instance_type: instance_type.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
