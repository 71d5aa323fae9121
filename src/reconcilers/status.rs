// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers and the status write-back.
//!
//! Conditions follow the standard Kubernetes shape; the controller
//! maintains at least `NodesReady`. Status writes go through the status
//! subresource with optimistic concurrency — a conflicting write is not an
//! error, the next reconcile simply observes fresher state.

use crate::crd::{Condition, InstanceGroup, InstanceGroupStatus};
use anyhow::{Context, Result};
use chrono::Utc;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::{debug, warn};

/// Condition type reporting node readiness for the group.
pub const CONDITION_NODES_READY: &str = "NodesReady";

/// Create a new Kubernetes condition with the current timestamp.
///
/// # Arguments
///
/// * `condition_type` - The type of condition (e.g., "`NodesReady`")
/// * `status` - The status: "True", "False", or "Unknown"
/// * `reason` - A programmatic identifier in `CamelCase`
/// * `message` - A human-readable explanation
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// The `NodesReady` condition for a readiness observation.
#[must_use]
pub fn nodes_ready_condition(ready: bool, ready_count: usize, total: usize) -> Condition {
    if ready {
        create_condition(
            CONDITION_NODES_READY,
            "True",
            "NodesReady",
            &format!("all {total} nodes are ready"),
        )
    } else {
        create_condition(
            CONDITION_NODES_READY,
            "False",
            "NodesNotReady",
            &format!("{ready_count} of {total} nodes are ready"),
        )
    }
}

/// Insert or replace a condition by type.
///
/// Returns `true` when the condition set changed in a way observers can
/// see (type or status or message), so callers can skip no-op status
/// writes. The transition timestamp alone never counts as a change.
pub fn upsert_condition(conditions: &mut Vec<Condition>, new_condition: Condition) -> bool {
    match conditions
        .iter_mut()
        .find(|condition| condition.r#type == new_condition.r#type)
    {
        Some(existing) => {
            let changed = existing.status != new_condition.status
                || existing.message != new_condition.message;
            if changed {
                *existing = new_condition;
            }
            changed
        }
        None => {
            conditions.push(new_condition);
            true
        }
    }
}

/// Write the group's status subresource.
///
/// A conflict (stale resource version) is swallowed: the enqueued
/// re-reconcile will observe and write fresher state.
///
/// # Errors
///
/// Returns an error for any failure other than an optimistic-concurrency
/// conflict.
pub async fn patch_status(
    client: &Client,
    group: &InstanceGroup,
    status: &InstanceGroupStatus,
) -> Result<()> {
    let namespace = group.namespace().unwrap_or_default();
    let name = group.name_any();
    let api: Api<InstanceGroup> = Api::namespaced(client.clone(), &namespace);

    let patch = json!({ "status": status });
    match api
        .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
    {
        Ok(_) => {
            debug!(
                group = %name,
                state = ?status.current_state,
                "Wrote status"
            );
            Ok(())
        }
        Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
            warn!(group = %name, "Status write conflicted; next reconcile will converge");
            Ok(())
        }
        Err(err) => Err(err).with_context(|| format!("writing status for {namespace}/{name}")),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
