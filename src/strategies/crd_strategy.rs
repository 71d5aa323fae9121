// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Delegated ("CRD") upgrade strategy.
//!
//! Rotation is handed to an external custom resource: the strategy renders
//! a resource template against the InstanceGroup, stamps it with ownership
//! and scope annotations, names it after the active launch id, submits it,
//! and then watches a dotted path into its status until the value matches
//! the configured success or failure string (case-insensitively).
//!
//! Template placeholders of the form `{{ .path.to.field }}` resolve
//! against the group's JSON document with the same dotted-path engine used
//! for the status watch.

use crate::constants::MAX_RESOURCE_NAME_LEN;
use crate::crd::{CrdStrategySpec, InstanceGroup};
use crate::labels::{K8S_MANAGED_BY, MANAGED_BY_VALUE, UPGRADE_SCOPE_ANNOTATION};
use anyhow::{anyhow, Context as AnyhowContext, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Client, ResourceExt};
use serde_json::Value;
use tracing::{debug, info, warn};

/// How the strategy treats concurrent in-flight upgrade resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Do nothing while any owned resource is still active
    #[default]
    Forbid,
    /// Submit regardless of other active resources
    Allow,
    /// Delete other active resources, then submit
    Replace,
}

impl ConcurrencyPolicy {
    /// Parse the declared policy; missing or unrecognized values fall back
    /// to `Forbid`.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("allow") => ConcurrencyPolicy::Allow,
            Some("replace") => ConcurrencyPolicy::Replace,
            _ => ConcurrencyPolicy::Forbid,
        }
    }
}

/// Where the watched resource stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeStatus {
    /// Status matches neither string yet
    Active,
    /// Status matches the success string
    Succeeded,
    /// Status matches the failure string
    Failed,
}

/// Outcome of one strategy tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// The upgrade resource is still converging; requeue
    Modifying,
    /// The upgrade resource reported success
    Modified,
    /// The upgrade resource reported failure
    Failed(String),
}

/// The submitted resource's coordinates, for status write-back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategyResource {
    /// Resource name
    pub name: String,
    /// Resource namespace
    pub namespace: String,
}

/// Resolve a dotted path (optionally wrapped in `{...}` or starting with
/// `.`) into a JSON document, stringifying the leaf.
#[must_use]
pub fn resolve_path(root: &Value, path: &str) -> Option<String> {
    let trimmed = path
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
        .trim_start_matches('.');

    let mut current = root;
    for segment in trimmed.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = current.get(segment)?;
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Render `{{ .path }}` placeholders in a template against a JSON document.
///
/// Unresolvable placeholders render as empty strings with a warning, so a
/// template typo produces a visible validation failure downstream rather
/// than a silently stale literal.
#[must_use]
pub fn render_template(template: &str, document: &Value) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rendered.push_str(&rest[start..]);
            return rendered;
        };
        let expression = &after[..end];
        match resolve_path(document, expression) {
            Some(value) => rendered.push_str(&value),
            None => {
                warn!(expression = %expression.trim(), "Template placeholder did not resolve");
            }
        }
        rest = &after[end + 2..];
    }
    rendered.push_str(rest);
    rendered
}

/// Normalize an upgrade-resource name against the launch id.
///
/// Appends `-<launch-id>` when not already suffixed; falls back to
/// `instancemgr-<launch-id>` when the result would exceed the 63-character
/// object-name limit.
#[must_use]
pub fn normalize_resource_name(name: &str, launch_id: &str) -> String {
    let suffix = format!("-{launch_id}");
    let named = if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    };
    if named.len() > MAX_RESOURCE_NAME_LEN {
        format!("instancemgr-{launch_id}")
    } else {
        named
    }
}

/// Classify a resource document against the status matchers.
#[must_use]
pub fn classify_status(
    document: &Value,
    json_path: &str,
    success: &str,
    failure: &str,
) -> UpgradeStatus {
    let Some(value) = resolve_path(document, json_path) else {
        return UpgradeStatus::Active;
    };
    if value.eq_ignore_ascii_case(success) {
        UpgradeStatus::Succeeded
    } else if value.eq_ignore_ascii_case(failure) {
        UpgradeStatus::Failed
    } else {
        UpgradeStatus::Active
    }
}

/// Whether a dynamic object carries this controller's ownership annotations
/// scoped to the given scaling group.
#[must_use]
pub fn is_owned_by_scope(resource: &DynamicObject, scaling_group_name: &str) -> bool {
    let annotations = resource.annotations();
    annotations.get(K8S_MANAGED_BY).map(String::as_str) == Some(MANAGED_BY_VALUE)
        && annotations.get(UPGRADE_SCOPE_ANNOTATION).map(String::as_str)
            == Some(scaling_group_name)
}

fn is_kube_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 404)
}

fn is_kube_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 409)
}

/// Run one tick of the CRD strategy.
///
/// # Arguments
///
/// * `client` - Kubernetes client
/// * `group` - The owning InstanceGroup
/// * `strategy` - Validated strategy parameters
/// * `scaling_group_name` - Active scaling group, used as the upgrade scope
/// * `launch_id` - Launch id of the configuration being rotated to
///
/// # Errors
///
/// Returns an error when the rendered template cannot be parsed or when
/// Kubernetes calls fail transiently; a missing CRD surfaces as a
/// [`StrategyOutcome::Failed`] so the group lands in `Error` without a
/// retry.
pub async fn run_crd_strategy(
    client: &Client,
    group: &InstanceGroup,
    strategy: &CrdStrategySpec,
    scaling_group_name: &str,
    launch_id: &str,
) -> Result<(StrategyOutcome, StrategyResource)> {
    let template = strategy.spec.as_deref().unwrap_or_default();
    let crd_name = strategy.crd_name.as_deref().unwrap_or_default();
    let json_path = strategy.status_json_path.as_deref().unwrap_or_default();
    let success = strategy.status_success_string.as_deref().unwrap_or_default();
    let failure = strategy.status_failure_string.as_deref().unwrap_or_default();
    let policy = ConcurrencyPolicy::parse(strategy.concurrency_policy.as_deref());

    // Render and parse the upgrade resource
    let group_document = serde_json::to_value(group).context("encoding group for rendering")?;
    let rendered = render_template(template, &group_document);
    let mut document: Value =
        serde_yaml::from_str(&rendered).context("parsing rendered upgrade resource")?;

    let metadata = document
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow!("rendered upgrade resource has no metadata"))?;

    let raw_name = metadata
        .get("name")
        .and_then(Value::as_str)
        .map_or_else(|| group.name_any(), String::from);
    let name = normalize_resource_name(&raw_name, launch_id);
    let namespace = metadata
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or("default")
        .to_string();
    metadata.insert("name".to_string(), Value::String(name.clone()));
    metadata.insert("namespace".to_string(), Value::String(namespace.clone()));

    let annotations = metadata
        .entry("annotations")
        .or_insert_with(|| Value::Object(serde_json::Map::new()))
        .as_object_mut()
        .ok_or_else(|| anyhow!("upgrade resource annotations are not a map"))?;
    annotations.insert(
        K8S_MANAGED_BY.to_string(),
        Value::String(MANAGED_BY_VALUE.to_string()),
    );
    annotations.insert(
        UPGRADE_SCOPE_ANNOTATION.to_string(),
        Value::String(scaling_group_name.to_string()),
    );

    let coordinates = StrategyResource {
        name: name.clone(),
        namespace: namespace.clone(),
    };

    // The named CRD must exist; a missing definition is a permanent
    // failure, not a retry
    let crd_api: Api<CustomResourceDefinition> = Api::all(client.clone());
    let crd = match crd_api.get(crd_name).await {
        Ok(crd) => crd,
        Err(err) if is_kube_not_found(&err) => {
            return Ok((
                StrategyOutcome::Failed(format!(
                    "custom resource definition '{crd_name}' does not exist"
                )),
                coordinates,
            ));
        }
        Err(err) => return Err(err).context("fetching upgrade resource definition"),
    };

    let version = crd
        .spec
        .versions
        .iter()
        .find(|version| version.storage)
        .or_else(|| crd.spec.versions.first())
        .ok_or_else(|| anyhow!("custom resource definition '{crd_name}' serves no versions"))?;
    let api_resource = ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(&crd.spec.group, &version.name, &crd.spec.names.kind),
        &crd.spec.names.plural,
    );
    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), &namespace, &api_resource);

    // Partition owned resources into active and settled
    let owned: Vec<DynamicObject> = api
        .list(&ListParams::default())
        .await
        .context("listing owned upgrade resources")?
        .items
        .into_iter()
        .filter(|resource| is_owned_by_scope(resource, scaling_group_name))
        .collect();

    let mut active = Vec::new();
    let mut inactive = Vec::new();
    for resource in owned {
        let resource_document =
            serde_json::to_value(&resource).context("encoding owned upgrade resource")?;
        match classify_status(&resource_document, json_path, success, failure) {
            UpgradeStatus::Active => active.push(resource),
            _ => inactive.push(resource),
        }
    }

    match policy {
        ConcurrencyPolicy::Forbid => {
            if !active.is_empty() {
                debug!(
                    active = active.len(),
                    "Concurrency policy forbids a new upgrade while one is active"
                );
                return Ok((StrategyOutcome::Modifying, coordinates));
            }
        }
        ConcurrencyPolicy::Replace => {
            let mut intended_is_active = false;
            for resource in &active {
                if resource.name_any() == name {
                    intended_is_active = true;
                    continue;
                }
                info!(resource = %resource.name_any(), "Replacing active upgrade resource");
                match api.delete(&resource.name_any(), &DeleteParams::default()).await {
                    Ok(_) => {}
                    Err(err) if is_kube_not_found(&err) => {}
                    Err(err) => return Err(err).context("replacing active upgrade resource"),
                }
            }
            if intended_is_active {
                return Ok((StrategyOutcome::Modifying, coordinates));
            }
        }
        ConcurrencyPolicy::Allow => {}
    }

    // Clean a settled resource occupying the intended coordinates
    for resource in &inactive {
        if resource.name_any() == name {
            debug!(resource = %name, "Removing settled upgrade resource before resubmission");
            match api.delete(&name, &DeleteParams::default()).await {
                Ok(_) => {}
                Err(err) if is_kube_not_found(&err) => {}
                Err(err) => return Err(err).context("cleaning stale upgrade resource"),
            }
        }
    }

    // Submit; a concurrent creation is success
    let object: DynamicObject =
        serde_json::from_value(document).context("shaping upgrade resource")?;
    match api.create(&PostParams::default(), &object).await {
        Ok(_) => info!(resource = %name, namespace = %namespace, "Submitted upgrade resource"),
        Err(err) if is_kube_already_exists(&err) => {
            debug!(resource = %name, "Upgrade resource already submitted");
        }
        Err(err) => return Err(err).context("submitting upgrade resource"),
    }

    // Observe: absent means the API hasn't caught up yet
    let fetched = match api.get(&name).await {
        Ok(resource) => resource,
        Err(err) if is_kube_not_found(&err) => {
            return Ok((StrategyOutcome::Modifying, coordinates));
        }
        Err(err) => return Err(err).context("fetching submitted upgrade resource"),
    };

    let fetched_document =
        serde_json::to_value(&fetched).context("encoding submitted upgrade resource")?;
    let outcome = match classify_status(&fetched_document, json_path, success, failure) {
        UpgradeStatus::Succeeded => StrategyOutcome::Modified,
        UpgradeStatus::Failed => StrategyOutcome::Failed(format!(
            "upgrade resource {namespace}/{name} reported '{failure}'"
        )),
        UpgradeStatus::Active => StrategyOutcome::Modifying,
    };
    Ok((outcome, coordinates))
}

#[cfg(test)]
#[path = "crd_strategy_tests.rs"]
mod crd_strategy_tests;
