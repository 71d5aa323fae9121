// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Launch-template variant of the scaling-configuration abstraction.
//!
//! One template per group, named by the group prefix. Drift is resolved by
//! issuing a new *version* and advancing the `$Default` pointer; up to a
//! configurable number of recent versions are retained (default 10), older
//! ones are garbage-collected FIFO by creation time.

use crate::aws::api::{CloudResult, ComputeApi};
use crate::aws::types::{
    ConfigurationInput, GroupConfigRef, GroupInstance, LaunchTemplate, LaunchTemplateVersion,
    TemplateReference,
};
use crate::scaling::{
    payload_drifted, swallow_not_found, template_launch_id, ConfigResource, DeletionInput,
    ScalingConfiguration,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Adapter over a group's versioned launch template.
pub struct LaunchTemplateAdapter {
    api: Arc<dyn ComputeApi>,
    name: String,
    template: Option<LaunchTemplate>,
    /// All versions, sorted by creation time ascending
    versions: Vec<LaunchTemplateVersion>,
}

impl LaunchTemplateAdapter {
    /// Create an adapter for a group's template name.
    #[must_use]
    pub fn new(api: Arc<dyn ComputeApi>, name: &str) -> Self {
        Self {
            api,
            name: name.to_string(),
            template: None,
            versions: Vec::new(),
        }
    }

    /// The highest-numbered version observed.
    #[must_use]
    pub fn latest(&self) -> Option<&LaunchTemplateVersion> {
        self.versions.iter().max_by_key(|version| version.version)
    }
}

#[async_trait]
impl ScalingConfiguration for LaunchTemplateAdapter {
    async fn discover(&mut self) -> CloudResult<()> {
        self.template = self.api.describe_launch_template(&self.name).await?;
        let mut versions = if self.template.is_some() {
            self.api.describe_template_versions(&self.name).await?
        } else {
            Vec::new()
        };
        versions.sort_by_key(|version| (version.created, version.version));
        debug!(
            template = %self.name,
            versions = versions.len(),
            latest = ?versions.last().map(|v| v.version),
            "Discovered launch template"
        );
        self.versions = versions;
        Ok(())
    }

    fn provisioned(&self) -> bool {
        self.template.is_some()
    }

    fn name(&self) -> Option<String> {
        self.template.as_ref().map(|template| template.name.clone())
    }

    fn launch_id(&self) -> Option<String> {
        let template = self.template.as_ref()?;
        let latest = self.latest()?;
        Some(template_launch_id(&template.id, latest.version))
    }

    fn latest_version(&self) -> Option<i64> {
        self.latest().map(|version| version.version)
    }

    fn drifted(&self, input: &ConfigurationInput) -> bool {
        match self.latest() {
            Some(latest) => payload_drifted(&latest.payload, input),
            // No version at all counts as drift
            None => true,
        }
    }

    async fn create(&mut self, input: &ConfigurationInput) -> CloudResult<GroupConfigRef> {
        let mut create_input = input.clone();
        create_input.name.clone_from(&self.name);

        let template = match &self.template {
            None => {
                let template = self.api.create_launch_template(&create_input).await?;
                info!(template = %self.name, "Created launch template");
                self.template = Some(template.clone());
                let versions = self.api.describe_template_versions(&self.name).await?;
                self.versions = versions;
                template
            }
            Some(template) => {
                let version = self
                    .api
                    .create_template_version(&self.name, &create_input)
                    .await?;
                info!(
                    template = %self.name,
                    version = version.version,
                    "Issued launch-template version"
                );
                self.api
                    .set_default_version(&self.name, version.version)
                    .await?;
                self.versions.push(version);
                template.clone()
            }
        };

        Ok(GroupConfigRef::LaunchTemplate(TemplateReference {
            id: Some(template.id),
            name: Some(self.name.clone()),
            version: Some("$Latest".to_string()),
        }))
    }

    async fn delete(&mut self, input: &DeletionInput) -> CloudResult<()> {
        if input.delete_all {
            info!(template = %self.name, "Deleting launch template");
            swallow_not_found(self.api.delete_launch_template(&self.name).await)?;
            self.template = None;
            self.versions.clear();
            return Ok(());
        }

        if self.versions.len() <= input.retain_versions {
            return Ok(());
        }

        // versions is sorted by creation time ascending; drop the oldest
        // beyond the retention count
        let stale: Vec<i64> = self.versions[..self.versions.len() - input.retain_versions]
            .iter()
            .map(|version| version.version)
            .collect();
        info!(
            template = %self.name,
            stale = stale.len(),
            retained = input.retain_versions,
            "Garbage-collecting launch-template versions"
        );
        swallow_not_found(self.api.delete_template_versions(&self.name, &stale).await)?;
        self.versions
            .retain(|version| !stale.contains(&version.version));
        Ok(())
    }

    fn update_targets(&self, instances: &[GroupInstance]) -> Vec<String> {
        let Some(latest) = self.latest() else {
            return Vec::new();
        };
        instances
            .iter()
            .filter(|instance| {
                let Some(reference) = &instance.launch_template else {
                    // Instance launched outside the template entirely
                    return true;
                };
                if reference.name.as_deref() != Some(self.name.as_str()) {
                    return true;
                }
                reference
                    .version
                    .as_deref()
                    .and_then(|version| version.parse::<i64>().ok())
                    != Some(latest.version)
            })
            .map(|instance| instance.id.clone())
            .collect()
    }

    fn current_reference(&self) -> Option<GroupConfigRef> {
        let template = self.template.as_ref()?;
        Some(GroupConfigRef::LaunchTemplate(TemplateReference {
            id: Some(template.id.clone()),
            name: Some(self.name.clone()),
            version: Some("$Latest".to_string()),
        }))
    }

    fn resource(&self) -> ConfigResource {
        match &self.template {
            Some(template) => ConfigResource::LaunchTemplate(template.clone()),
            None => ConfigResource::None,
        }
    }
}

#[cfg(test)]
#[path = "launch_template_tests.rs"]
mod launch_template_tests;
