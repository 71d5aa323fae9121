// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Serverless pod-profile provisioner (`eks-fargate`).
//!
//! Fargate profiles are immutable: the handler creates the profile with its
//! selectors and pod execution role, maps the service's status strings onto
//! the state machine, and deletes on teardown. A spec change on a live
//! profile requires delete-and-recreate by the operator, which the status
//! surface makes visible.

use crate::aws::api::CloudError;
use crate::aws::types::FargateProfileInput;
use crate::constants::DEFAULT_FARGATE_POLICY;
use crate::context::Context;
use crate::crd::{EksFargateSpec, InstanceGroup};
use crate::events::EventKind;
use crate::labels::{group_identity_value, resource_prefix};
use crate::provisioning::{delete_default_role, ensure_default_role, FARGATE_TRUST_POLICY};
use crate::reconcilers::instancegroup::types::ReconcileOutcome;
use crate::reconcilers::state::{fargate_profile_bucket, next_state, Intent, ReconcileState};
use anyhow::{anyhow, Result};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

fn cloud_err(err: CloudError) -> anyhow::Error {
    anyhow::Error::new(err)
}

/// Reconcile a Fargate profile for one tick.
///
/// # Errors
///
/// Returns an error for transient failures the outer reconciler should
/// retry with backoff.
pub async fn reconcile_fargate(
    ctx: &Arc<Context>,
    group: &InstanceGroup,
) -> Result<ReconcileOutcome> {
    let spec = group
        .spec
        .eks_fargate
        .as_ref()
        .ok_or_else(|| anyhow!("fargate provisioner without configuration block"))?;

    let namespace = group.namespace().unwrap_or_default();
    let name = group.name_any();
    let identity_value = group_identity_value(&namespace, &name);
    let prefix = resource_prefix(&spec.cluster_name, &namespace, &name);

    let observed = ctx
        .cloud
        .cluster
        .describe_fargate_profile(&spec.cluster_name, &prefix)
        .await
        .map_err(cloud_err)?;

    let intent = if group.is_deleting() {
        Intent::Delete
    } else {
        Intent::CreateOrUpdate
    };
    let bucket = observed
        .as_ref()
        .map(|profile| fargate_profile_bucket(&profile.status));
    let state = next_state(intent, bucket);

    debug!(
        group = %identity_value,
        status = observed.as_ref().map(|p| p.status.as_str()),
        ?state,
        "Derived fargate reconcile state"
    );

    let mut status = group.status.clone().unwrap_or_default();
    status.active_scaling_group_name = Some(prefix.clone());

    match state {
        ReconcileState::InitCreate => {
            let role_arn = resolve_execution_role(ctx, spec, &prefix).await?;
            status.nodes_instance_role_arn = Some(role_arn.clone());
            let input = profile_input(spec, &prefix, &role_arn);
            info!(profile = %prefix, "Creating fargate profile");
            ctx.cloud
                .cluster
                .create_fargate_profile(&input)
                .await
                .map_err(cloud_err)?;
            let payload = BTreeMap::from([
                ("fargateProfile".to_string(), prefix),
                ("reason".to_string(), "created".to_string()),
            ]);
            Ok(
                ReconcileOutcome::new(ReconcileState::ReconcileModifying, status)
                    .with_event(EventKind::InstanceGroupCreated, payload),
            )
        }
        ReconcileState::InitUpdate => {
            // Profiles are immutable; an ACTIVE profile is converged
            let observed =
                observed.ok_or_else(|| anyhow!("update path without an observed profile"))?;
            status.nodes_instance_role_arn = observed.pod_execution_role_arn.clone();
            Ok(ReconcileOutcome::new(ReconcileState::Ready, status))
        }
        ReconcileState::InitDelete => {
            info!(profile = %prefix, "Deleting fargate profile");
            ctx.cloud
                .cluster
                .delete_fargate_profile(&spec.cluster_name, &prefix)
                .await
                .map_err(cloud_err)?;
            Ok(ReconcileOutcome::new(ReconcileState::Deleting, status))
        }
        ReconcileState::Deleted => {
            if spec.pod_execution_role_arn.is_none() {
                delete_default_role(
                    &ctx.cloud.identity,
                    &execution_role_name(&prefix),
                    DEFAULT_FARGATE_POLICY,
                )
                .await
                .map_err(cloud_err)?;
            }
            let payload = BTreeMap::from([
                ("fargateProfile".to_string(), prefix),
                ("reason".to_string(), "deleted".to_string()),
            ]);
            Ok(ReconcileOutcome::new(ReconcileState::Deleted, status)
                .with_event(EventKind::InstanceGroupDeleted, payload))
        }
        other => Ok(ReconcileOutcome::new(other, status)),
    }
}

fn execution_role_name(prefix: &str) -> String {
    format!("{prefix}-pod-execution")
}

/// The declared execution role, or a provisioned default.
async fn resolve_execution_role(
    ctx: &Arc<Context>,
    spec: &EksFargateSpec,
    prefix: &str,
) -> Result<String> {
    if let Some(role_arn) = &spec.pod_execution_role_arn {
        return Ok(role_arn.clone());
    }
    let role = ensure_default_role(
        &ctx.cloud.identity,
        &execution_role_name(prefix),
        FARGATE_TRUST_POLICY,
        DEFAULT_FARGATE_POLICY,
    )
    .await
    .map_err(cloud_err)?;
    Ok(role.arn)
}

fn profile_input(spec: &EksFargateSpec, name: &str, role_arn: &str) -> FargateProfileInput {
    FargateProfileInput {
        name: name.to_string(),
        cluster_name: spec.cluster_name.clone(),
        pod_execution_role_arn: role_arn.to_string(),
        subnets: spec.subnets.clone(),
        selectors: spec
            .selectors
            .iter()
            .map(|selector| (selector.namespace.clone(), selector.labels.clone()))
            .collect(),
        tags: spec.tags.clone(),
    }
}

#[cfg(test)]
#[path = "eks_fargate_tests.rs"]
mod eks_fargate_tests;
