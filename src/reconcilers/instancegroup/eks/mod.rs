// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Self-managed provisioner (`eks` and `eks-cf`).
//!
//! Reconciles an InstanceGroup against a scaling group plus its launch
//! configuration or launch template, the node IAM role and instance
//! profile, lifecycle hooks, suspended processes, and the `aws-auth` node
//! bootstrap. Rotation on drift goes through the declared upgrade strategy.
//!
//! ## Module Structure
//!
//! - [`bootstrap`] - `aws-auth` ConfigMap role mapping
//! - [`userdata`] - Node bootstrap-script assembly

pub mod bootstrap;
pub mod userdata;

use crate::aws::api::CloudError;
use crate::aws::types::{
    BlockDevice, ConfigurationInput, GroupConfigRef, LifecycleHookInput, MetadataOptions,
    Placement, ScalingGroup, ScalingGroupInput,
};
use crate::context::Context;
use crate::crd::{EksConfiguration, EksSpec, InstanceGroup, InstanceGroupStatus, StrategyKind};
use crate::events::{self, EventKind};
use crate::labels::{
    group_identity_value, resource_prefix, CLUSTER_OWNERSHIP_TAG, GROUP_IDENTITY_TAG,
};
use crate::provisioning::{
    delete_node_identity, ensure_node_identity, NodeIdentity, EC2_TRUST_POLICY,
};
use crate::reconcilers::instancegroup::cloud::{discover_cluster_nodes, select_scaling_group};
use crate::reconcilers::instancegroup::types::ReconcileOutcome;
use crate::reconcilers::state::{next_state, scaling_group_bucket, Intent, ReconcileState};
use crate::reconcilers::status::{nodes_ready_condition, upsert_condition};
use crate::scaling::{new_scaling_configuration, DeletionInput, ScalingConfiguration};
use crate::strategies::crd_strategy::{run_crd_strategy, StrategyOutcome};
use crate::strategies::rolling::{run_rolling_update, RollingUpdateRequest};
use anyhow::{anyhow, Context as AnyhowContext, Result};
use kube::ResourceExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

fn cloud_err(err: CloudError) -> anyhow::Error {
    anyhow::Error::new(err)
}

/// Reconcile a self-managed group for one tick.
///
/// # Errors
///
/// Returns an error for transient failures the outer reconciler should
/// retry with backoff; permanent states surface through the outcome.
pub async fn reconcile_self_managed(
    ctx: &Arc<Context>,
    group: &InstanceGroup,
) -> Result<ReconcileOutcome> {
    let spec = group
        .spec
        .self_managed()
        .ok_or_else(|| anyhow!("self-managed provisioner without configuration block"))?;
    let mut configuration = spec.configuration.clone();
    ctx.config.apply_defaults(&mut configuration);

    let namespace = group.namespace().unwrap_or_default();
    let name = group.name_any();
    let identity_value = group_identity_value(&namespace, &name);
    let prefix = resource_prefix(&configuration.cluster_name, &namespace, &name);

    let groups = ctx
        .cloud
        .scaling
        .describe_scaling_groups()
        .await
        .map_err(cloud_err)?;
    let observed = select_scaling_group(&groups, &identity_value, &prefix).cloned();

    let intent = if group.is_deleting() {
        Intent::Delete
    } else {
        Intent::CreateOrUpdate
    };
    let bucket = observed.as_ref().map(scaling_group_bucket);
    let state = next_state(intent, bucket);

    debug!(
        group = %identity_value,
        observed = observed.as_ref().map(|g| g.name.as_str()),
        ?state,
        "Derived self-managed reconcile state"
    );

    let mut status = group.status.clone().unwrap_or_default();

    match state {
        ReconcileState::InitCreate | ReconcileState::InitUpdate => {
            converge(ctx, group, spec, &configuration, observed, &prefix, status).await
        }
        ReconcileState::Deleting | ReconcileState::ReconcileModifying => {
            Ok(ReconcileOutcome::new(state, status))
        }
        ReconcileState::InitDelete => {
            let observed =
                observed.ok_or_else(|| anyhow!("delete path without an observed group"))?;
            info!(scaling_group = %observed.name, "Deleting scaling group");
            ctx.cloud
                .scaling
                .delete_scaling_group(&observed.name)
                .await
                .map_err(cloud_err)?;
            Ok(ReconcileOutcome::new(ReconcileState::Deleting, status))
        }
        ReconcileState::Deleted => {
            finalize_delete(ctx, group, &configuration, &prefix, &mut status).await?;
            let payload = BTreeMap::from([
                ("scalingGroup".to_string(), prefix.clone()),
                ("reason".to_string(), "deleted".to_string()),
            ]);
            Ok(ReconcileOutcome::new(ReconcileState::Deleted, status)
                .with_event(EventKind::InstanceGroupDeleted, payload))
        }
        other => Ok(ReconcileOutcome::new(other, status)),
    }
}

/// Run the create/update side effects and decide the post-converge state.
#[allow(clippy::too_many_lines)]
async fn converge(
    ctx: &Arc<Context>,
    group: &InstanceGroup,
    spec: &EksSpec,
    configuration: &EksConfiguration,
    observed: Option<ScalingGroup>,
    prefix: &str,
    mut status: InstanceGroupStatus,
) -> Result<ReconcileOutcome> {
    let namespace = group.namespace().unwrap_or_default();
    let name = group.name_any();
    let identity_value = group_identity_value(&namespace, &name);

    // Node identity: bring-your-own or managed role/profile
    let identity = resolve_node_identity(ctx, configuration, prefix).await?;
    status.nodes_instance_role_arn = Some(identity.role.arn.clone());

    // Image aliases resolve through the Parameter Store
    let image_id = resolve_image(ctx, &configuration.image).await?;

    // Spot recommendations override the declared spot price
    let spot_price = resolve_spot_price(ctx, &namespace, &name, configuration, &mut status).await?;

    let input = build_configuration_input(
        configuration,
        &image_id,
        &identity.profile.arn,
        spot_price,
    );

    // Scaling configuration: discover, create on drift, garbage-collect
    let mut adapter = new_scaling_configuration(
        group.spec.scaling_config_kind(),
        &ctx.cloud,
        prefix,
        observed.as_ref(),
    );
    adapter.discover().await.map_err(cloud_err)?;

    let config_ref = if adapter.provisioned() && !adapter.drifted(&input) {
        adapter
            .current_reference()
            .ok_or_else(|| anyhow!("provisioned configuration without a reference"))?
    } else {
        info!(group = %identity_value, "Scaling configuration drifted, issuing a new one");
        adapter.create(&input).await.map_err(cloud_err)?
    };
    let config_ref = wrap_mixed_instances(config_ref, configuration);

    status.active_launch_configuration_name = adapter.name();
    status.latest_template_version = adapter.latest_version().map(|version| version.to_string());

    // Scaling group create or in-place update
    let group_name = observed
        .as_ref()
        .map_or_else(|| prefix.to_string(), |g| g.name.clone());
    let group_input = ScalingGroupInput {
        name: group_name.clone(),
        min_size: spec.min_size,
        max_size: spec.max_size,
        desired_capacity: observed.is_none().then_some(spec.min_size),
        subnets: configuration.subnets.clone(),
        config_ref,
        tags: group_tags(&identity_value, configuration),
    };

    let mut created = false;
    match &observed {
        None => {
            info!(scaling_group = %group_name, "Creating scaling group");
            ctx.cloud
                .scaling
                .create_scaling_group(&group_input)
                .await
                .map_err(cloud_err)?;
            created = true;
        }
        Some(observed_group) => {
            if group_update_needed(observed_group, &group_input) {
                info!(scaling_group = %group_name, "Updating scaling group");
                ctx.cloud
                    .scaling
                    .update_scaling_group(&group_input)
                    .await
                    .map_err(cloud_err)?;
            }
            ctx.cloud
                .scaling
                .update_group_tags(&group_name, &group_input.tags)
                .await
                .map_err(cloud_err)?;
        }
    }

    status.active_scaling_group_name = Some(group_name.clone());
    status.current_min = Some(spec.min_size);
    status.current_max = Some(spec.max_size);

    reconcile_lifecycle_hooks(ctx, &group_name, configuration).await?;
    reconcile_suspended_processes(ctx, &group_name, configuration, observed.as_ref()).await?;

    // Nodes can only join once the role is mapped into aws-auth
    bootstrap::ensure_node_role_mapping(&ctx.client, &identity.role.arn).await?;

    // Retention GC for superseded configurations/versions
    adapter
        .delete(&DeletionInput {
            retain_versions: retention_for(group, ctx),
            delete_all: false,
        })
        .await
        .map_err(cloud_err)?;

    if created {
        let payload = BTreeMap::from([
            ("scalingGroup".to_string(), group_name),
            ("instanceCount".to_string(), spec.min_size.to_string()),
            ("reason".to_string(), "created".to_string()),
        ]);
        return Ok(
            ReconcileOutcome::new(ReconcileState::ReconcileModifying, status)
                .with_event(EventKind::InstanceGroupCreated, payload),
        );
    }

    // Re-observe after mutation for rotation and readiness decisions
    let observed = observed.ok_or_else(|| anyhow!("update path without an observed group"))?;
    decide_rotation_and_readiness(ctx, group, &observed, adapter.as_ref(), status).await
}

/// Post-converge decision: rotate drifted instances or report readiness.
async fn decide_rotation_and_readiness(
    ctx: &Arc<Context>,
    group: &InstanceGroup,
    observed: &ScalingGroup,
    adapter: &dyn ScalingConfiguration,
    mut status: InstanceGroupStatus,
) -> Result<ReconcileOutcome> {
    let namespace = group.namespace().unwrap_or_default();
    let name = group.name_any();

    let readiness_gates = group
        .spec
        .strategy
        .rolling_update
        .as_ref()
        .map(|rolling| rolling.readiness_gates.clone())
        .unwrap_or_default();

    let instance_ids: HashSet<String> = observed
        .instances
        .iter()
        .map(|instance| instance.id.clone())
        .collect();
    let nodes = discover_cluster_nodes(&ctx.client, &instance_ids, &readiness_gates).await?;
    let ready_ids: HashSet<String> = nodes
        .iter()
        .filter(|node| node.ready)
        .map(|node| node.instance_id.clone())
        .collect();

    let targets = adapter.update_targets(&observed.instances);
    if !targets.is_empty() {
        status.current_state = Some(ReconcileState::InitUpgrade.to_string());
        return run_upgrade(ctx, group, observed, adapter, targets, &ready_ids, status).await;
    }

    // No rotation pending; readiness decides Ready vs further polling
    let desired = usize::try_from(observed.desired_capacity).unwrap_or_default();
    let ready = observed.instances.len() == desired
        && !observed.instances.is_empty()
        && observed
            .instances
            .iter()
            .all(|instance| ready_ids.contains(&instance.id));

    let condition = nodes_ready_condition(ready, ready_ids.len(), observed.instances.len());
    let transitioned = upsert_condition(&mut status.conditions, condition);

    let payload = BTreeMap::from([
        ("scalingGroup".to_string(), observed.name.clone()),
        (
            "instanceCount".to_string(),
            observed.instances.len().to_string(),
        ),
        ("readyCount".to_string(), ready_ids.len().to_string()),
    ]);

    if ready {
        let mut outcome = ReconcileOutcome::new(ReconcileState::Ready, status);
        if transitioned {
            outcome = outcome.with_event(EventKind::NodesReady, payload);
        }
        Ok(outcome)
    } else {
        debug!(
            group = %format!("{namespace}/{name}"),
            ready = ready_ids.len(),
            desired,
            "Waiting for nodes to become ready"
        );
        let mut outcome = ReconcileOutcome::new(ReconcileState::ReconcileModifying, status);
        if transitioned {
            outcome = outcome.with_event(EventKind::NodesNotReady, payload);
        }
        Ok(outcome)
    }
}

/// Drive one tick of the declared upgrade strategy.
async fn run_upgrade(
    ctx: &Arc<Context>,
    group: &InstanceGroup,
    observed: &ScalingGroup,
    adapter: &dyn ScalingConfiguration,
    targets: Vec<String>,
    ready_ids: &HashSet<String>,
    mut status: InstanceGroupStatus,
) -> Result<ReconcileOutcome> {
    match group.spec.strategy.strategy_type {
        StrategyKind::RollingUpdate | StrategyKind::Managed => {
            let request = RollingUpdateRequest {
                all_instances: observed
                    .instances
                    .iter()
                    .map(|instance| instance.id.clone())
                    .collect(),
                update_targets: targets,
                desired_capacity: observed.desired_capacity,
                max_unavailable: group
                    .spec
                    .strategy
                    .rolling_update
                    .as_ref()
                    .and_then(|rolling| rolling.max_unavailable.clone()),
                ready_instance_ids: ready_ids.clone(),
            };
            let decision = run_rolling_update(&ctx.cloud.scaling, &request)
                .await
                .map_err(cloud_err)?;
            if decision.done {
                // Nothing left to terminate; the readiness pass on the next
                // tick reports Ready
                Ok(ReconcileOutcome::new(
                    ReconcileState::ReconcileModifying,
                    status,
                ))
            } else {
                info!(
                    scaling_group = %observed.name,
                    terminated = decision.terminate.len(),
                    "Rolling update tick complete"
                );
                Ok(ReconcileOutcome::new(
                    ReconcileState::ReconcileModifying,
                    status,
                ))
            }
        }
        StrategyKind::Crd => {
            let strategy = group
                .spec
                .strategy
                .crd
                .as_ref()
                .ok_or_else(|| anyhow!("crd strategy without parameters"))?;
            let launch_id = adapter
                .launch_id()
                .ok_or_else(|| anyhow!("crd strategy without an active launch id"))?;
            let (outcome, resource) = run_crd_strategy(
                &ctx.client,
                group,
                strategy,
                &observed.name,
                &launch_id,
            )
            .await?;

            status.strategy_resource_name = Some(resource.name);
            status.strategy_resource_namespace = Some(resource.namespace);

            match outcome {
                StrategyOutcome::Modifying => Ok(ReconcileOutcome::new(
                    ReconcileState::ReconcileModifying,
                    status,
                )),
                StrategyOutcome::Modified => Ok(ReconcileOutcome::new(
                    ReconcileState::ReconcileModified,
                    status,
                )),
                StrategyOutcome::Failed(message) => {
                    warn!(scaling_group = %observed.name, %message, "Upgrade resource failed");
                    let payload = BTreeMap::from([
                        ("scalingGroup".to_string(), observed.name.clone()),
                        ("reason".to_string(), message),
                    ]);
                    Ok(ReconcileOutcome::new(ReconcileState::Error, status)
                        .with_event(EventKind::InstanceGroupUpgradeFailed, payload))
                }
            }
        }
    }
}

/// Tear down everything owned by the group once the scaling group is gone.
async fn finalize_delete(
    ctx: &Arc<Context>,
    group: &InstanceGroup,
    configuration: &EksConfiguration,
    prefix: &str,
    status: &mut InstanceGroupStatus,
) -> Result<()> {
    let mut adapter =
        new_scaling_configuration(group.spec.scaling_config_kind(), &ctx.cloud, prefix, None);
    adapter.discover().await.map_err(cloud_err)?;
    adapter
        .delete(&DeletionInput {
            retain_versions: 0,
            delete_all: true,
        })
        .await
        .map_err(cloud_err)?;

    if let Some(role_arn) = status.nodes_instance_role_arn.as_deref() {
        bootstrap::remove_node_role_mapping(&ctx.client, role_arn).await?;
    }

    // Only roles this controller provisioned are deleted
    if configuration.role_name.is_none() {
        delete_node_identity(
            &ctx.cloud.identity,
            prefix,
            crate::constants::IAM_DELETE_MAX_ATTEMPTS,
            Duration::from_secs(crate::constants::IAM_DELETE_RETRY_DELAY_SECS),
        )
        .await
        .map_err(cloud_err)?;
    }

    status.active_scaling_group_name = None;
    status.active_launch_configuration_name = None;
    status.latest_template_version = None;
    Ok(())
}

/// Resolve the node role and instance profile: bring-your-own when the
/// spec names them, managed otherwise.
async fn resolve_node_identity(
    ctx: &Arc<Context>,
    configuration: &EksConfiguration,
    prefix: &str,
) -> Result<NodeIdentity> {
    if let Some(role_name) = configuration.role_name.as_deref() {
        let role = ctx
            .cloud
            .identity
            .get_role(role_name)
            .await
            .map_err(cloud_err)?
            .ok_or_else(|| anyhow!("declared role '{role_name}' does not exist"))?;
        let profile_name = configuration
            .instance_profile_name
            .as_deref()
            .unwrap_or(role_name);
        let profile = ctx
            .cloud
            .identity
            .get_instance_profile(profile_name)
            .await
            .map_err(cloud_err)?
            .ok_or_else(|| anyhow!("declared instance profile '{profile_name}' does not exist"))?;
        return Ok(NodeIdentity { role, profile });
    }

    let mut policies: Vec<String> = crate::constants::DEFAULT_NODE_POLICIES
        .iter()
        .map(ToString::to_string)
        .collect();
    for policy in &configuration.managed_policies {
        if !policies.contains(policy) {
            policies.push(policy.clone());
        }
    }

    ensure_node_identity(
        &ctx.cloud.identity,
        prefix,
        EC2_TRUST_POLICY,
        &policies,
        Duration::from_secs(ctx.config.iam_propagation_delay_secs),
    )
    .await
    .map_err(cloud_err)
}

/// Resolve `ssm://` image aliases through the Parameter Store.
async fn resolve_image(ctx: &Arc<Context>, image: &str) -> Result<String> {
    let Some(parameter) = image.strip_prefix("ssm://") else {
        return Ok(image.to_string());
    };
    let value = ctx
        .cloud
        .parameters
        .get_parameter(parameter)
        .await
        .map_err(cloud_err)?;
    value.ok_or_else(|| anyhow!("image alias 'ssm://{parameter}' did not resolve"))
}

/// Pick the spot price: a fresh recommendation event wins over the spec.
async fn resolve_spot_price(
    ctx: &Arc<Context>,
    namespace: &str,
    name: &str,
    configuration: &EksConfiguration,
    status: &mut InstanceGroupStatus,
) -> Result<Option<String>> {
    let recommendation = events::get_spot_recommendation(
        &ctx.client,
        namespace,
        name,
        ctx.config.spot_recommendation_minutes,
    )
    .await
    .context("looking up spot recommendations")?;

    let spot_price = match recommendation {
        Some(recommendation) if recommendation.use_spot => {
            info!(
                group = %format!("{namespace}/{name}"),
                price = %recommendation.spot_price,
                "Applying spot recommendation"
            );
            Some(recommendation.spot_price)
        }
        Some(_) => None,
        None => configuration
            .spot_price
            .clone()
            .filter(|price| !price.is_empty()),
    };

    status.lifecycle = Some(if spot_price.is_some() { "spot" } else { "normal" }.to_string());
    Ok(spot_price)
}

/// Assemble the scaling-configuration input from the declared spec.
fn build_configuration_input(
    configuration: &EksConfiguration,
    image_id: &str,
    instance_profile_arn: &str,
    spot_price: Option<String>,
) -> ConfigurationInput {
    ConfigurationInput {
        name: String::new(),
        image_id: image_id.to_string(),
        instance_type: configuration.instance_type.clone(),
        key_name: configuration.key_pair_name.clone(),
        security_groups: configuration.security_groups.clone(),
        user_data: userdata::build_user_data(configuration),
        instance_profile_arn: Some(instance_profile_arn.to_string()),
        block_devices: configuration
            .volumes
            .iter()
            .map(|volume| BlockDevice {
                device_name: volume.name.clone(),
                volume_type: volume.volume_type.clone(),
                size: volume.size,
                iops: volume.iops,
                throughput: volume.throughput,
                snapshot_id: volume.snapshot_id.clone(),
                delete_on_termination: volume.delete_on_termination,
                encrypted: volume.encrypted,
            })
            .collect(),
        spot_price,
        license_specifications: configuration.license_specifications.clone(),
        placement: configuration.placement.as_ref().map(|placement| Placement {
            availability_zone: placement.availability_zone.clone(),
            host_resource_group_arn: placement.host_resource_group_arn.clone(),
            tenancy: placement.tenancy.clone(),
        }),
        metadata_options: configuration
            .metadata_options
            .as_ref()
            .map(|options| MetadataOptions {
                http_endpoint: options.http_endpoint.clone(),
                http_tokens: options.http_tokens.clone(),
                http_put_response_hop_limit: options.http_put_response_hop_limit,
            }),
    }
}

/// Wrap a template reference into the mixed-instances policy when declared.
fn wrap_mixed_instances(
    config_ref: GroupConfigRef,
    configuration: &EksConfiguration,
) -> GroupConfigRef {
    let Some(policy) = &configuration.mixed_instances_policy else {
        return config_ref;
    };
    match config_ref {
        GroupConfigRef::LaunchTemplate(template) => GroupConfigRef::MixedInstances {
            template,
            strategy: policy.strategy.clone(),
            base_capacity: policy.base_capacity,
            spot_pools: policy.spot_pools,
            instance_types: policy.instance_types.clone(),
        },
        other => other,
    }
}

/// The group's tag set: identity and ownership first, declared tags after.
fn group_tags(identity_value: &str, configuration: &EksConfiguration) -> Vec<(String, String, bool)> {
    let mut tags = vec![
        (
            GROUP_IDENTITY_TAG.to_string(),
            identity_value.to_string(),
            true,
        ),
        (
            CLUSTER_OWNERSHIP_TAG.to_string(),
            configuration.cluster_name.clone(),
            true,
        ),
    ];
    for tag in &configuration.tags {
        tags.push((tag.key.clone(), tag.value.clone(), true));
    }
    tags
}

/// Whether an observed scaling group differs from the intended input.
fn group_update_needed(observed: &ScalingGroup, input: &ScalingGroupInput) -> bool {
    if observed.min_size != input.min_size || observed.max_size != input.max_size {
        return true;
    }

    let mut observed_subnets = observed.subnets.clone();
    let mut input_subnets = input.subnets.clone();
    observed_subnets.sort();
    input_subnets.sort();
    if observed_subnets != input_subnets {
        return true;
    }

    match &input.config_ref {
        GroupConfigRef::LaunchConfiguration(name) => {
            observed.launch_configuration_name.as_deref() != Some(name.as_str())
        }
        GroupConfigRef::LaunchTemplate(template) => {
            let Some(reference) = observed.template_reference() else {
                return true;
            };
            reference.name != template.name || reference.version != template.version
        }
        GroupConfigRef::MixedInstances { template, .. } => {
            let Some(reference) = observed.mixed_instances_template.as_ref() else {
                return true;
            };
            reference.name != template.name || reference.version != template.version
        }
    }
}

/// Converge lifecycle hooks: put every declared hook, remove undeclared
/// ones.
async fn reconcile_lifecycle_hooks(
    ctx: &Arc<Context>,
    group_name: &str,
    configuration: &EksConfiguration,
) -> Result<()> {
    let existing = ctx
        .cloud
        .scaling
        .describe_lifecycle_hooks(group_name)
        .await
        .map_err(cloud_err)?;

    for hook in &configuration.lifecycle_hooks {
        let input = LifecycleHookInput {
            name: hook.name.clone(),
            transition: hook.lifecycle.as_cloud_value().to_string(),
            default_result: hook.default_result.clone(),
            heartbeat_timeout: hook.heartbeat_timeout,
            notification_arn: hook.notification_arn.clone(),
            role_arn: hook.role_arn.clone(),
            notification_metadata: hook.notification_metadata.clone(),
        };
        ctx.cloud
            .scaling
            .put_lifecycle_hook(group_name, &input)
            .await
            .map_err(cloud_err)?;
    }

    let declared: HashSet<&str> = configuration
        .lifecycle_hooks
        .iter()
        .map(|hook| hook.name.as_str())
        .collect();
    for hook in existing {
        if !declared.contains(hook.as_str()) {
            info!(scaling_group = %group_name, hook = %hook, "Removing undeclared lifecycle hook");
            ctx.cloud
                .scaling
                .delete_lifecycle_hook(group_name, &hook)
                .await
                .map_err(cloud_err)?;
        }
    }
    Ok(())
}

/// Converge suspended processes against the declaration.
async fn reconcile_suspended_processes(
    ctx: &Arc<Context>,
    group_name: &str,
    configuration: &EksConfiguration,
    observed: Option<&ScalingGroup>,
) -> Result<()> {
    let current: HashSet<String> = observed
        .map(|group| group.suspended_processes.iter().cloned().collect())
        .unwrap_or_default();
    let declared: HashSet<String> = configuration.suspend_processes.iter().cloned().collect();

    let to_suspend: Vec<String> = declared.difference(&current).cloned().collect();
    let to_resume: Vec<String> = current.difference(&declared).cloned().collect();

    if !to_suspend.is_empty() {
        ctx.cloud
            .scaling
            .suspend_processes(group_name, &to_suspend)
            .await
            .map_err(cloud_err)?;
    }
    if !to_resume.is_empty() {
        ctx.cloud
            .scaling
            .resume_processes(group_name, &to_resume)
            .await
            .map_err(cloud_err)?;
    }
    Ok(())
}

/// The retention count for the active configuration kind.
fn retention_for(group: &InstanceGroup, ctx: &Arc<Context>) -> usize {
    match group.spec.scaling_config_kind() {
        crate::crd::ScalingConfigKind::LaunchConfiguration => {
            ctx.config.retained_launch_configurations
        }
        crate::crd::ScalingConfigKind::LaunchTemplate => ctx.config.retained_template_versions,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
