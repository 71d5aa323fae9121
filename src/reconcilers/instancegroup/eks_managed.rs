// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Managed node-group provisioner (`eks-managed`).
//!
//! The node-group service owns instance lifecycle and rotation; this
//! handler converges the group's scaling configuration, labels, and role,
//! and maps the service's status strings onto the reconcile state machine.

use crate::aws::api::CloudError;
use crate::aws::types::{NodeGroup, NodeGroupInput};
use crate::constants::DEFAULT_MANAGED_NODE_POLICY;
use crate::context::Context;
use crate::crd::{EksManagedSpec, InstanceGroup};
use crate::events::EventKind;
use crate::labels::{group_identity_value, resource_prefix};
use crate::provisioning::{delete_default_role, ensure_default_role, EC2_TRUST_POLICY};
use crate::reconcilers::instancegroup::types::ReconcileOutcome;
use crate::reconcilers::state::{next_state, node_group_bucket, Intent, ReconcileState};
use crate::reconcilers::status::{nodes_ready_condition, upsert_condition};
use anyhow::{anyhow, Result};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

fn cloud_err(err: CloudError) -> anyhow::Error {
    anyhow::Error::new(err)
}

/// Reconcile a managed node group for one tick.
///
/// # Errors
///
/// Returns an error for transient failures the outer reconciler should
/// retry with backoff.
pub async fn reconcile_managed(
    ctx: &Arc<Context>,
    group: &InstanceGroup,
) -> Result<ReconcileOutcome> {
    let spec = group
        .spec
        .eks_managed
        .as_ref()
        .ok_or_else(|| anyhow!("managed provisioner without configuration block"))?;

    let namespace = group.namespace().unwrap_or_default();
    let name = group.name_any();
    let identity_value = group_identity_value(&namespace, &name);
    let prefix = resource_prefix(&spec.configuration.cluster_name, &namespace, &name);

    let observed = ctx
        .cloud
        .cluster
        .describe_node_group(&spec.configuration.cluster_name, &prefix)
        .await
        .map_err(cloud_err)?;

    let intent = if group.is_deleting() {
        Intent::Delete
    } else {
        Intent::CreateOrUpdate
    };
    let bucket = observed
        .as_ref()
        .map(|node_group| node_group_bucket(&node_group.status));
    let state = next_state(intent, bucket);

    debug!(
        group = %identity_value,
        status = observed.as_ref().map(|g| g.status.as_str()),
        ?state,
        "Derived managed reconcile state"
    );

    let mut status = group.status.clone().unwrap_or_default();
    status.active_scaling_group_name = Some(prefix.clone());

    match state {
        ReconcileState::InitCreate => {
            let node_role = resolve_node_role(ctx, spec, &prefix).await?;
            status.nodes_instance_role_arn = Some(node_role.clone());
            let input = node_group_input(spec, &prefix, &node_role, None);
            info!(node_group = %prefix, "Creating managed node group");
            ctx.cloud
                .cluster
                .create_node_group(&input)
                .await
                .map_err(cloud_err)?;
            status.current_min = Some(spec.min_size);
            status.current_max = Some(spec.max_size);
            let payload = BTreeMap::from([
                ("nodeGroup".to_string(), prefix),
                ("instanceCount".to_string(), spec.min_size.to_string()),
                ("reason".to_string(), "created".to_string()),
            ]);
            Ok(
                ReconcileOutcome::new(ReconcileState::ReconcileModifying, status)
                    .with_event(EventKind::InstanceGroupCreated, payload),
            )
        }
        ReconcileState::InitUpdate => {
            let observed =
                observed.ok_or_else(|| anyhow!("update path without an observed node group"))?;
            status.nodes_instance_role_arn = observed.node_role.clone();
            status.current_min = Some(spec.min_size);
            status.current_max = Some(spec.max_size);

            if managed_update_needed(&observed, spec) {
                let node_role = observed
                    .node_role
                    .clone()
                    .unwrap_or_else(|| prefix.clone());
                let input = node_group_input(spec, &prefix, &node_role, Some(&observed));
                info!(node_group = %prefix, "Updating managed node group");
                ctx.cloud
                    .cluster
                    .update_node_group(&input)
                    .await
                    .map_err(cloud_err)?;
                return Ok(ReconcileOutcome::new(
                    ReconcileState::ReconcileModifying,
                    status,
                ));
            }

            // ACTIVE with no pending change: the service reports capacity
            let ready = observed.status == "ACTIVE";
            let total = usize::try_from(observed.desired_size).unwrap_or_default();
            let condition = nodes_ready_condition(ready, if ready { total } else { 0 }, total);
            let transitioned = upsert_condition(&mut status.conditions, condition);
            let payload = BTreeMap::from([
                ("nodeGroup".to_string(), prefix),
                ("instanceCount".to_string(), observed.desired_size.to_string()),
            ]);

            let state = if ready {
                ReconcileState::Ready
            } else {
                ReconcileState::ReconcileModifying
            };
            let mut outcome = ReconcileOutcome::new(state, status);
            if transitioned {
                let kind = if ready {
                    EventKind::NodesReady
                } else {
                    EventKind::NodesNotReady
                };
                outcome = outcome.with_event(kind, payload);
            }
            Ok(outcome)
        }
        ReconcileState::InitDelete => {
            info!(node_group = %prefix, "Deleting managed node group");
            ctx.cloud
                .cluster
                .delete_node_group(&spec.configuration.cluster_name, &prefix)
                .await
                .map_err(cloud_err)?;
            Ok(ReconcileOutcome::new(ReconcileState::Deleting, status))
        }
        ReconcileState::Deleted => {
            if spec.configuration.node_role.is_none() {
                delete_default_role(&ctx.cloud.identity, &prefix, DEFAULT_MANAGED_NODE_POLICY)
                    .await
                    .map_err(cloud_err)?;
            }
            let payload = BTreeMap::from([
                ("nodeGroup".to_string(), prefix),
                ("reason".to_string(), "deleted".to_string()),
            ]);
            Ok(ReconcileOutcome::new(ReconcileState::Deleted, status)
                .with_event(EventKind::InstanceGroupDeleted, payload))
        }
        other => Ok(ReconcileOutcome::new(other, status)),
    }
}

/// The declared role ARN, or a provisioned default execution role.
async fn resolve_node_role(
    ctx: &Arc<Context>,
    spec: &EksManagedSpec,
    prefix: &str,
) -> Result<String> {
    if let Some(role) = &spec.configuration.node_role {
        return Ok(role.clone());
    }
    let role = ensure_default_role(
        &ctx.cloud.identity,
        prefix,
        EC2_TRUST_POLICY,
        DEFAULT_MANAGED_NODE_POLICY,
    )
    .await
    .map_err(cloud_err)?;
    Ok(role.arn)
}

/// Whether the observed node group differs from the declaration.
fn managed_update_needed(observed: &NodeGroup, spec: &EksManagedSpec) -> bool {
    observed.min_size != spec.min_size
        || observed.max_size != spec.max_size
        || observed.labels != spec.configuration.labels
}

/// Assemble the node-group input, preserving observed desired size on
/// update (clamped into the declared bounds).
fn node_group_input(
    spec: &EksManagedSpec,
    name: &str,
    node_role: &str,
    observed: Option<&NodeGroup>,
) -> NodeGroupInput {
    let desired = observed
        .map(|node_group| node_group.desired_size)
        .unwrap_or(spec.min_size)
        .clamp(spec.min_size, spec.max_size);

    NodeGroupInput {
        name: name.to_string(),
        cluster_name: spec.configuration.cluster_name.clone(),
        min_size: spec.min_size,
        max_size: spec.max_size,
        desired_size: desired,
        instance_types: spec.configuration.instance_types.clone(),
        ami_type: spec.configuration.ami_type.clone(),
        node_role: node_role.to_string(),
        subnets: spec.configuration.subnets.clone(),
        labels: spec.configuration.labels.clone(),
        tags: spec
            .configuration
            .tags
            .iter()
            .map(|tag| (tag.key.clone(), tag.value.clone()))
            .collect(),
        volume_size: spec.configuration.volume_size,
        ssh_key_name: spec.configuration.ssh_key_name.clone(),
    }
}

#[cfg(test)]
#[path = "eks_managed_tests.rs"]
mod eks_managed_tests;
