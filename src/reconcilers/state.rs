// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconcile state machine.
//!
//! The next reconcile state is a pure function of three inputs: the
//! declared intent (create-or-update vs delete, read off the deletion
//! timestamp), whether the primary cloud resource is provisioned, and the
//! provisioner-specific substate of that resource bucketed into
//! [`ResourceBucket`]. No suspension happens inside this module; handlers
//! run the side effects for `Init*` states and advance from there.

use std::fmt;

/// The finite set of reconcile states written to `status.currentState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileState {
    /// Initial state before discovery
    Init,
    /// Create path selected
    InitCreate,
    /// Update path selected
    InitUpdate,
    /// Delete path selected
    InitDelete,
    /// Node rotation selected
    InitUpgrade,
    /// A cloud mutation is converging
    ReconcileModifying,
    /// The upgrade resource reported success
    ReconcileModified,
    /// Cloud-side deletion is converging
    Deleting,
    /// Terminal: everything owned by the group is gone
    Deleted,
    /// Terminal: observed state matches the declaration
    Ready,
    /// Terminal: unrecoverable failure, operator intervention required
    Error,
}

impl ReconcileState {
    /// Whether the state ends the reconcile loop for this generation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconcileState::Ready | ReconcileState::Deleted | ReconcileState::Error
        )
    }

    /// Whether the state polls cloud convergence on a short requeue.
    #[must_use]
    pub fn is_ongoing(&self) -> bool {
        matches!(
            self,
            ReconcileState::ReconcileModifying | ReconcileState::Deleting
        )
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReconcileState::Init => "Init",
            ReconcileState::InitCreate => "InitCreate",
            ReconcileState::InitUpdate => "InitUpdate",
            ReconcileState::InitDelete => "InitDelete",
            ReconcileState::InitUpgrade => "InitUpgrade",
            ReconcileState::ReconcileModifying => "ReconcileModifying",
            ReconcileState::ReconcileModified => "ReconcileModified",
            ReconcileState::Deleting => "Deleting",
            ReconcileState::Deleted => "Deleted",
            ReconcileState::Ready => "Ready",
            ReconcileState::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Declared intent, read off the deletion timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Converge toward the declared spec
    CreateOrUpdate,
    /// Tear down everything owned by the group
    Delete,
}

/// Substate buckets of the primary cloud resource.
///
/// The bucketization is provisioner-specific; see [`node_group_bucket`] and
/// [`fargate_profile_bucket`] for the managed mappings and
/// [`scaling_group_bucket`] for self-managed groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceBucket {
    /// A cloud-side mutation is in flight
    Ongoing,
    /// The resource settled in a workable state
    Finite,
    /// The resource finished deleting
    FiniteDeleted,
    /// The resource degraded but an update can recover it
    UpdateRecoverable,
    /// The resource failed terminally on the create/update path
    Unrecoverable,
    /// The resource failed terminally on the delete path
    UnrecoverableDelete,
}

/// Derive the next reconcile state.
///
/// `bucket` is `None` when the primary resource was not provisioned;
/// callers pass `provisioned = bucket.is_some()` implicitly through that.
#[must_use]
pub fn next_state(intent: Intent, bucket: Option<ResourceBucket>) -> ReconcileState {
    match (intent, bucket) {
        (Intent::CreateOrUpdate, None) => ReconcileState::InitCreate,
        (Intent::CreateOrUpdate, Some(bucket)) => match bucket {
            ResourceBucket::Ongoing => ReconcileState::ReconcileModifying,
            ResourceBucket::Finite
            | ResourceBucket::UpdateRecoverable
            // A finished delete on the create path means recreate via update
            | ResourceBucket::FiniteDeleted => ReconcileState::InitUpdate,
            ResourceBucket::Unrecoverable | ResourceBucket::UnrecoverableDelete => {
                ReconcileState::Error
            }
        },
        (Intent::Delete, None) => ReconcileState::Deleted,
        (Intent::Delete, Some(bucket)) => match bucket {
            ResourceBucket::Ongoing => ReconcileState::Deleting,
            ResourceBucket::Finite | ResourceBucket::UpdateRecoverable => {
                ReconcileState::InitDelete
            }
            ResourceBucket::FiniteDeleted => ReconcileState::Deleted,
            ResourceBucket::UnrecoverableDelete | ResourceBucket::Unrecoverable => {
                ReconcileState::Error
            }
        },
    }
}

/// Bucketize a managed node-group status string.
#[must_use]
pub fn node_group_bucket(status: &str) -> ResourceBucket {
    match status {
        "CREATING" | "UPDATING" | "DELETING" => ResourceBucket::Ongoing,
        "ACTIVE" => ResourceBucket::Finite,
        "DEGRADED" => ResourceBucket::UpdateRecoverable,
        "CREATE_FAILED" => ResourceBucket::Unrecoverable,
        "DELETE_FAILED" => ResourceBucket::UnrecoverableDelete,
        _ => ResourceBucket::Ongoing,
    }
}

/// Bucketize a Fargate-profile status string.
#[must_use]
pub fn fargate_profile_bucket(status: &str) -> ResourceBucket {
    match status {
        "CREATING" | "DELETING" => ResourceBucket::Ongoing,
        "ACTIVE" => ResourceBucket::Finite,
        "CREATE_FAILED" => ResourceBucket::Unrecoverable,
        "DELETE_FAILED" => ResourceBucket::UnrecoverableDelete,
        _ => ResourceBucket::Ongoing,
    }
}

/// Bucketize a self-managed scaling group.
///
/// Scaling groups expose no lifecycle field beyond a status that is only
/// set while a delete is in flight; a present group is otherwise workable
/// and the update handler decides between upgrade and ready.
#[must_use]
pub fn scaling_group_bucket(group: &crate::aws::types::ScalingGroup) -> ResourceBucket {
    if group.is_deleting() {
        ResourceBucket::Ongoing
    } else {
        ResourceBucket::Finite
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
