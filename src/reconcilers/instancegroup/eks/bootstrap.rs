// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Node bootstrap through the `aws-auth` ConfigMap.
//!
//! Self-managed nodes can only join the cluster once their IAM role is
//! mapped into `kube-system/aws-auth` under `mapRoles`. The BootstrapNodes
//! action upserts that mapping; deletion removes it again, but only when no
//! other InstanceGroup still shares the role.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Namespace holding the auth ConfigMap
pub const AWS_AUTH_NAMESPACE: &str = "kube-system";

/// Name of the auth ConfigMap
pub const AWS_AUTH_CONFIGMAP: &str = "aws-auth";

/// Groups every node role is mapped into
pub const NODE_GROUPS: [&str; 2] = ["system:bootstrappers", "system:nodes"];

/// Username template the kubelet authenticates as
pub const NODE_USERNAME: &str = "system:node:{{EC2PrivateDNSName}}";

/// One `mapRoles` entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleMapping {
    /// Mapped IAM role ARN
    pub rolearn: String,
    /// Username the role authenticates as
    pub username: String,
    /// Groups granted to the role
    pub groups: Vec<String>,
}

impl RoleMapping {
    /// The standard node mapping for a role ARN.
    #[must_use]
    pub fn node(role_arn: &str) -> Self {
        Self {
            rolearn: role_arn.to_string(),
            username: NODE_USERNAME.to_string(),
            groups: NODE_GROUPS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Add a node-role mapping to a `mapRoles` document.
///
/// Returns the updated document, or `None` when the mapping was already
/// present and nothing needs writing.
///
/// # Errors
///
/// Returns an error if the existing document is not valid YAML.
pub fn upsert_role_mapping(map_roles: &str, role_arn: &str) -> Result<Option<String>> {
    let mut mappings: Vec<RoleMapping> = if map_roles.trim().is_empty() {
        Vec::new()
    } else {
        serde_yaml::from_str(map_roles).context("parsing aws-auth mapRoles")?
    };

    if mappings.iter().any(|mapping| mapping.rolearn == role_arn) {
        return Ok(None);
    }

    mappings.push(RoleMapping::node(role_arn));
    let rendered = serde_yaml::to_string(&mappings).context("rendering aws-auth mapRoles")?;
    Ok(Some(rendered))
}

/// Remove a node-role mapping from a `mapRoles` document.
///
/// Returns the updated document, or `None` when the role was not mapped.
///
/// # Errors
///
/// Returns an error if the existing document is not valid YAML.
pub fn remove_role_mapping(map_roles: &str, role_arn: &str) -> Result<Option<String>> {
    if map_roles.trim().is_empty() {
        return Ok(None);
    }
    let mut mappings: Vec<RoleMapping> =
        serde_yaml::from_str(map_roles).context("parsing aws-auth mapRoles")?;
    let before = mappings.len();
    mappings.retain(|mapping| mapping.rolearn != role_arn);
    if mappings.len() == before {
        return Ok(None);
    }
    let rendered = serde_yaml::to_string(&mappings).context("rendering aws-auth mapRoles")?;
    Ok(Some(rendered))
}

async fn fetch_configmap(client: &Client) -> Result<Option<ConfigMap>> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), AWS_AUTH_NAMESPACE);
    match api.get(AWS_AUTH_CONFIGMAP).await {
        Ok(configmap) => Ok(Some(configmap)),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(None),
        Err(err) => Err(err).context("fetching aws-auth ConfigMap"),
    }
}

/// Ensure the node role is mapped into `aws-auth`, creating the ConfigMap
/// when the cluster has none yet.
///
/// # Errors
///
/// Returns an error if the ConfigMap cannot be read or written.
pub async fn ensure_node_role_mapping(client: &Client, role_arn: &str) -> Result<()> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), AWS_AUTH_NAMESPACE);

    let Some(configmap) = fetch_configmap(client).await? else {
        info!(role = %role_arn, "Creating aws-auth ConfigMap with node role mapping");
        let rendered = serde_yaml::to_string(&vec![RoleMapping::node(role_arn)])
            .context("rendering aws-auth mapRoles")?;
        let mut data = BTreeMap::new();
        data.insert("mapRoles".to_string(), rendered);
        let configmap = ConfigMap {
            metadata: kube::core::ObjectMeta {
                name: Some(AWS_AUTH_CONFIGMAP.to_string()),
                namespace: Some(AWS_AUTH_NAMESPACE.to_string()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        };
        api.create(&PostParams::default(), &configmap)
            .await
            .context("creating aws-auth ConfigMap")?;
        return Ok(());
    };

    let current = configmap
        .data
        .as_ref()
        .and_then(|data| data.get("mapRoles"))
        .cloned()
        .unwrap_or_default();

    let Some(updated) = upsert_role_mapping(&current, role_arn)? else {
        debug!(role = %role_arn, "Node role already mapped in aws-auth");
        return Ok(());
    };

    info!(role = %role_arn, "Mapping node role into aws-auth");
    let patch = json!({ "data": { "mapRoles": updated } });
    api.patch(
        AWS_AUTH_CONFIGMAP,
        &PatchParams::default(),
        &Patch::Merge(&patch),
    )
    .await
    .context("updating aws-auth ConfigMap")?;
    Ok(())
}

/// Remove the node role from `aws-auth`.
///
/// A missing ConfigMap or mapping is success: there is nothing to remove.
///
/// # Errors
///
/// Returns an error if the ConfigMap cannot be read or written.
pub async fn remove_node_role_mapping(client: &Client, role_arn: &str) -> Result<()> {
    let Some(configmap) = fetch_configmap(client).await? else {
        return Ok(());
    };
    let current = configmap
        .data
        .as_ref()
        .and_then(|data| data.get("mapRoles"))
        .cloned()
        .unwrap_or_default();

    let Some(updated) = remove_role_mapping(&current, role_arn)? else {
        return Ok(());
    };

    info!(role = %role_arn, "Removing node role from aws-auth");
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), AWS_AUTH_NAMESPACE);
    let patch = json!({ "data": { "mapRoles": updated } });
    api.patch(
        AWS_AUTH_CONFIGMAP,
        &PatchParams::default(),
        &Patch::Merge(&patch),
    )
    .await
    .context("updating aws-auth ConfigMap")?;
    Ok(())
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod bootstrap_tests;
