// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Launch-configuration variant of the scaling-configuration abstraction.
//!
//! Launch configurations are immutable: drift is resolved by creating a
//! *new* configuration under a fresh deterministic suffix and pointing the
//! scaling group at it. Superseded configurations are garbage-collected,
//! keeping the N most recently created (default 2).

use crate::aws::api::{CloudError, CloudResult, ScalingApi};
use crate::aws::types::{ConfigurationInput, GroupConfigRef, GroupInstance, LaunchConfiguration};
use crate::scaling::{
    config_suffix, launch_id_from_config_name, payload_drifted, swallow_not_found, ConfigResource,
    DeletionInput, ScalingConfiguration,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Adapter over prefix-named launch configurations.
pub struct LaunchConfigurationAdapter {
    api: Arc<dyn ScalingApi>,
    prefix: String,
    /// Configuration the scaling group currently points at, by name
    attached_name: Option<String>,
    /// Prefix-matched configurations, sorted by creation time ascending
    discovered: Vec<LaunchConfiguration>,
    /// The active (attached) configuration, when discovered
    target: Option<LaunchConfiguration>,
}

impl LaunchConfigurationAdapter {
    /// Create an adapter for a group's configuration prefix.
    #[must_use]
    pub fn new(api: Arc<dyn ScalingApi>, prefix: &str, attached_name: Option<String>) -> Self {
        Self {
            api,
            prefix: prefix.to_string(),
            attached_name,
            discovered: Vec::new(),
            target: None,
        }
    }

    fn full_name(&self, input: &ConfigurationInput) -> String {
        format!("{}-{}", self.prefix, config_suffix(input))
    }
}

#[async_trait]
impl ScalingConfiguration for LaunchConfigurationAdapter {
    async fn discover(&mut self) -> CloudResult<()> {
        let mut configurations = self.api.describe_launch_configurations(&self.prefix).await?;
        configurations.sort_by_key(|config| config.created);
        self.target = self.attached_name.as_ref().and_then(|attached| {
            configurations
                .iter()
                .find(|config| &config.name == attached)
                .cloned()
        });
        debug!(
            prefix = %self.prefix,
            discovered = configurations.len(),
            attached = ?self.attached_name,
            "Discovered launch configurations"
        );
        self.discovered = configurations;
        Ok(())
    }

    fn provisioned(&self) -> bool {
        self.target.is_some()
    }

    fn name(&self) -> Option<String> {
        self.target.as_ref().map(|config| config.name.clone())
    }

    fn launch_id(&self) -> Option<String> {
        self.name()
            .as_deref()
            .and_then(launch_id_from_config_name)
    }

    fn latest_version(&self) -> Option<i64> {
        None
    }

    fn drifted(&self, input: &ConfigurationInput) -> bool {
        match &self.target {
            Some(target) => payload_drifted(&target.payload, input),
            // No active configuration counts as drift
            None => true,
        }
    }

    async fn create(&mut self, input: &ConfigurationInput) -> CloudResult<GroupConfigRef> {
        let name = self.full_name(input);
        let mut create_input = input.clone();
        create_input.name.clone_from(&name);

        match self.api.create_launch_configuration(&create_input).await {
            Ok(()) => info!(configuration = %name, "Created launch configuration"),
            // Equal inputs hash to the same name; the configuration is current
            Err(CloudError::AlreadyExists(_)) => {
                debug!(configuration = %name, "Launch configuration already current")
            }
            Err(err) => return Err(err),
        }

        self.attached_name = Some(name.clone());
        Ok(GroupConfigRef::LaunchConfiguration(name))
    }

    async fn delete(&mut self, input: &DeletionInput) -> CloudResult<()> {
        let candidates: Vec<String> = if input.delete_all {
            self.discovered.iter().map(|c| c.name.clone()).collect()
        } else if self.discovered.len() > input.retain_versions {
            // discovered is sorted ascending; drop the oldest beyond the
            // retention count
            self.discovered[..self.discovered.len() - input.retain_versions]
                .iter()
                .map(|c| c.name.clone())
                .collect()
        } else {
            Vec::new()
        };

        for name in candidates {
            info!(configuration = %name, "Garbage-collecting launch configuration");
            swallow_not_found(self.api.delete_launch_configuration(&name).await)?;
            self.discovered.retain(|c| c.name != name);
        }
        Ok(())
    }

    fn update_targets(&self, instances: &[GroupInstance]) -> Vec<String> {
        let Some(target) = &self.target else {
            return Vec::new();
        };
        instances
            .iter()
            .filter(|instance| {
                instance.launch_configuration_name.as_deref() != Some(target.name.as_str())
            })
            .map(|instance| instance.id.clone())
            .collect()
    }

    fn current_reference(&self) -> Option<GroupConfigRef> {
        self.target
            .as_ref()
            .map(|target| GroupConfigRef::LaunchConfiguration(target.name.clone()))
    }

    fn resource(&self) -> ConfigResource {
        match &self.target {
            Some(target) => ConfigResource::LaunchConfiguration(target.clone()),
            None => ConfigResource::None,
        }
    }
}

#[cfg(test)]
#[path = "launch_configuration_tests.rs"]
mod launch_configuration_tests;
