// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud and cluster discovery for instance groups.
//!
//! Builds the per-reconcile observation snapshot: the matching scaling
//! group (by identity tag, with a prefix fallback), the cluster nodes that
//! belong to it keyed by the providerID's instance id, and their readiness.
//! The snapshot is immutable for the remainder of the reconcile; a missing
//! resource is a valid nil observation, never an error.

use crate::crd::ReadinessGate;
use crate::aws::types::ScalingGroup;
use crate::labels::GROUP_IDENTITY_TAG;
use crate::reconcilers::pagination::list_all_paginated;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use std::collections::HashSet;

/// A cluster node correlated to a scaling-group instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterNode {
    /// Node name
    pub name: String,
    /// EC2 instance id from the providerID's last segment
    pub instance_id: String,
    /// Whether `Ready=True` and every readiness gate holds
    pub ready: bool,
}

/// Select the scaling group owned by an InstanceGroup.
///
/// Matches the identity tag `instancemgr.keikoproj.io/instancegroup ==
/// namespace/name` first; when no tag matches, falls back to the
/// deterministic name prefix.
#[must_use]
pub fn select_scaling_group<'a>(
    groups: &'a [ScalingGroup],
    identity: &str,
    prefix: &str,
) -> Option<&'a ScalingGroup> {
    groups
        .iter()
        .find(|group| {
            group
                .tags
                .get(GROUP_IDENTITY_TAG)
                .is_some_and(|value| value == identity)
        })
        .or_else(|| groups.iter().find(|group| group.name == prefix))
}

/// Extract the EC2 instance id from a node's providerID.
///
/// Provider ids look like `aws:///us-west-2a/i-0123456789abcdef0`; the
/// instance id is the last slash-separated segment.
#[must_use]
pub fn instance_id_from_provider_id(provider_id: &str) -> Option<String> {
    provider_id
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(String::from)
}

/// Whether a node is ready: condition `Ready=True`, plus every declared
/// readiness gate's condition at `True`.
#[must_use]
pub fn node_is_ready(node: &Node, readiness_gates: &[ReadinessGate]) -> bool {
    let conditions = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref());
    let Some(conditions) = conditions else {
        return false;
    };

    let holds = |condition_type: &str| {
        conditions
            .iter()
            .any(|condition| condition.type_ == condition_type && condition.status == "True")
    };

    holds("Ready")
        && readiness_gates
            .iter()
            .all(|gate| holds(&gate.condition_type))
}

/// List cluster nodes and correlate them to the group's instance ids.
///
/// # Errors
///
/// Returns an error if the node list cannot be fetched.
pub async fn discover_cluster_nodes(
    client: &Client,
    instance_ids: &HashSet<String>,
    readiness_gates: &[ReadinessGate],
) -> Result<Vec<ClusterNode>> {
    let api: Api<Node> = Api::all(client.clone());
    let nodes = list_all_paginated(&api, ListParams::default())
        .await
        .context("listing cluster nodes")?;

    Ok(nodes
        .iter()
        .filter_map(|node| {
            let provider_id = node.spec.as_ref()?.provider_id.as_deref()?;
            let instance_id = instance_id_from_provider_id(provider_id)?;
            if !instance_ids.contains(&instance_id) {
                return None;
            }
            Some(ClusterNode {
                name: node.name_any(),
                instance_id,
                ready: node_is_ready(node, readiness_gates),
            })
        })
        .collect())
}

#[cfg(test)]
#[path = "cloud_tests.rs"]
mod cloud_tests;
