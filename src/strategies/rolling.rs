// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded-disruption rolling-update strategy.
//!
//! Each tick re-observes the scaling group and the cluster, so the strategy
//! is idempotent: it terminates at most `maxUnavailable` update targets per
//! tick, waits for replacement nodes to report Ready before touching more,
//! and reports done once no update targets remain. Termination happens at
//! the scaling-group layer without decrementing desired capacity, so the
//! group replaces what the strategy removes.

use crate::aws::api::{CloudResult, ScalingApi};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// One tick's worth of observed input.
#[derive(Clone, Debug, Default)]
pub struct RollingUpdateRequest {
    /// Every instance id in the scaling group
    pub all_instances: Vec<String>,
    /// Instance ids whose running configuration is not the latest, in
    /// stable (discovery) order
    pub update_targets: Vec<String>,
    /// The group's desired capacity
    pub desired_capacity: i32,
    /// Declared disruption budget; defaults to 1
    pub max_unavailable: Option<IntOrString>,
    /// Instance ids whose mapped node reports `Ready=True`
    pub ready_instance_ids: HashSet<String>,
}

/// The action a tick decided on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollingDecision {
    /// No update targets remain; rotation is complete
    pub done: bool,
    /// Instance ids to terminate this tick
    pub terminate: Vec<String>,
}

/// Resolve `maxUnavailable` against the desired capacity.
///
/// Percentages are taken of desired capacity and rounded down; the result
/// is clamped into `[1, desired]` — a budget larger than the group is
/// clamped rather than rejected, and a rounded-down zero still makes
/// progress.
#[must_use]
pub fn resolve_max_unavailable(value: Option<&IntOrString>, desired_capacity: i32) -> i32 {
    let raw = match value {
        None => 1,
        Some(IntOrString::Int(count)) => *count,
        Some(IntOrString::String(percent)) => {
            let numeric = percent
                .trim_end_matches('%')
                .parse::<i64>()
                .unwrap_or(0)
                .clamp(0, 100);
            i32::try_from(i64::from(desired_capacity) * numeric / 100).unwrap_or(0)
        }
    };
    raw.clamp(1, desired_capacity.max(1))
}

/// Decide one tick of the rolling update. Pure.
#[must_use]
pub fn rolling_update_tick(request: &RollingUpdateRequest) -> RollingDecision {
    if request.update_targets.is_empty() {
        return RollingDecision {
            done: true,
            terminate: Vec::new(),
        };
    }

    let max_unavailable =
        resolve_max_unavailable(request.max_unavailable.as_ref(), request.desired_capacity);

    let ready_count = request
        .all_instances
        .iter()
        .filter(|id| request.ready_instance_ids.contains(*id))
        .count();
    let floor = request.all_instances.len().saturating_sub(
        usize::try_from(max_unavailable).unwrap_or(0),
    );

    if ready_count < floor {
        debug!(
            ready = ready_count,
            floor, "Holding rotation until replacements are ready"
        );
        return RollingDecision {
            done: false,
            terminate: Vec::new(),
        };
    }

    let batch = request
        .update_targets
        .iter()
        .take(usize::try_from(max_unavailable).unwrap_or(0).min(request.update_targets.len()))
        .cloned()
        .collect();

    RollingDecision {
        done: false,
        terminate: batch,
    }
}

/// Execute one tick: decide, then terminate the chosen instances at the
/// scaling-group layer without decrementing desired capacity.
///
/// # Errors
///
/// Returns the first termination error; already-terminated instances
/// surface as not-found and are treated as progress.
pub async fn run_rolling_update(
    scaling: &Arc<dyn ScalingApi>,
    request: &RollingUpdateRequest,
) -> CloudResult<RollingDecision> {
    let decision = rolling_update_tick(request);

    for instance_id in &decision.terminate {
        info!(instance = %instance_id, "Terminating update target");
        crate::aws::api::swallow_not_found(scaling.terminate_instance(instance_id).await)?;
    }

    Ok(decision)
}

#[cfg(test)]
#[path = "rolling_tests.rs"]
mod rolling_tests;
