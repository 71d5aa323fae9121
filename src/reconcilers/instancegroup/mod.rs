// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! InstanceGroup reconciliation.
//!
//! One reconcile tick performs, in order: fetch-time validation, finalizer
//! management, provisioner dispatch (cloud discovery, state derivation,
//! action), status write-back, event publishing, and the requeue decision.
//!
//! ## Module Structure
//!
//! - [`cloud`] - Scaling-group selection and cluster-node discovery
//! - [`eks`] - Self-managed provisioner (`eks`, `eks-cf`)
//! - [`eks_managed`] - Managed node-group provisioner
//! - [`eks_fargate`] - Fargate profile provisioner
//! - [`types`] - The per-tick outcome shared by all provisioners

pub mod cloud;
pub mod eks;
pub mod eks_fargate;
pub mod eks_managed;
pub mod types;

pub use types::ReconcileOutcome;

use crate::constants::{
    ONGOING_REQUEUE_DURATION_SECS, READY_REQUEUE_DURATION_SECS, RECONCILE_TIMEOUT_SECS,
};
use crate::context::Context;
use crate::crd::{InstanceGroup, Provisioner};
use crate::events;
use crate::labels::FINALIZER_INSTANCE_GROUP;
use crate::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
use crate::reconcilers::state::ReconcileState;
use crate::reconcilers::status::patch_status;
use anyhow::{anyhow, Result};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Map a terminal-or-ongoing state onto the requeue policy.
#[must_use]
pub fn requeue_for(state: ReconcileState) -> Action {
    match state {
        // Poll cloud convergence on a short interval
        ReconcileState::ReconcileModifying
        | ReconcileState::Deleting
        | ReconcileState::ReconcileModified
        | ReconcileState::Init
        | ReconcileState::InitCreate
        | ReconcileState::InitUpdate
        | ReconcileState::InitDelete
        | ReconcileState::InitUpgrade => {
            Action::requeue(Duration::from_secs(ONGOING_REQUEUE_DURATION_SECS))
        }
        // Resync-only states
        ReconcileState::Ready => Action::requeue(Duration::from_secs(READY_REQUEUE_DURATION_SECS)),
        // Terminal without automatic requeue
        ReconcileState::Deleted | ReconcileState::Error => Action::await_change(),
    }
}

/// Reconcile one InstanceGroup to its next state.
///
/// # Errors
///
/// Returns an error only for transient failures; the caller's error policy
/// requeues those with exponential backoff. Permanent failures set the
/// `Error` state and complete successfully without an automatic requeue.
pub async fn reconcile_instancegroup(
    ctx: Arc<Context>,
    group: Arc<InstanceGroup>,
) -> Result<Action> {
    let namespace = group.namespace().unwrap_or_default();
    let name = group.name_any();
    let key = format!("{namespace}/{name}");

    info!(group = %key, provisioner = %group.spec.provisioner, "Reconciling InstanceGroup");

    // Deleting without our finalizer means we never provisioned anything
    if group.is_deleting()
        && !group
            .finalizers()
            .iter()
            .any(|finalizer| finalizer == FINALIZER_INSTANCE_GROUP)
    {
        return Ok(Action::await_change());
    }

    // Structural validation; failures are permanent
    let mut validation = group.spec.validate().err();
    if validation.is_none() {
        if let Some(spec) = group.spec.self_managed() {
            validation = ctx
                .config
                .check_boundaries(&spec.configuration.instance_type)
                .err();
        }
    }
    if let Some(validation_error) = validation {
        warn!(group = %key, error = %validation_error, "InstanceGroup failed validation");
        let mut status = group.status.clone().unwrap_or_default();
        status.current_state = Some(ReconcileState::Error.to_string());
        patch_status(&ctx.client, &group, &status).await?;
        return Ok(Action::await_change());
    }

    // The finalizer must be present before the first provisioning action
    if !group.is_deleting() {
        ensure_finalizer(&ctx.client, group.as_ref(), FINALIZER_INSTANCE_GROUP).await?;
    }

    // Provisioner dispatch under the overall reconcile deadline
    let outcome = tokio::time::timeout(
        Duration::from_secs(RECONCILE_TIMEOUT_SECS),
        dispatch(&ctx, &group),
    )
    .await
    .map_err(|_| anyhow!("reconcile of {key} exceeded its deadline"))??;

    patch_status(&ctx.client, &group, &outcome.status).await?;

    for (kind, payload) in &outcome.events {
        if let Err(err) = events::publish(&ctx.client, &group, *kind, payload).await {
            // An unpublished event never blocks convergence
            warn!(group = %key, error = %err, "Failed to publish event");
        }
    }

    if outcome.state == ReconcileState::Deleted {
        remove_finalizer(&ctx.client, group.as_ref(), FINALIZER_INSTANCE_GROUP).await?;
    }

    info!(group = %key, state = %outcome.state, "Reconcile complete");
    Ok(requeue_for(outcome.state))
}

async fn dispatch(ctx: &Arc<Context>, group: &Arc<InstanceGroup>) -> Result<ReconcileOutcome> {
    match group.spec.provisioner {
        Provisioner::Eks | Provisioner::EksCf => eks::reconcile_self_managed(ctx, group).await,
        Provisioner::EksManaged => eks_managed::reconcile_managed(ctx, group).await,
        Provisioner::EksFargate => eks_fargate::reconcile_fargate(ctx, group).await,
    }
}
