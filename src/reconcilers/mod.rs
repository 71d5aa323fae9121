// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for instance groups.
//!
//! The controller follows the standard pattern:
//!
//! 1. **Watch** - Monitor InstanceGroup changes via the Kubernetes API
//! 2. **Discover** - Build the immutable cloud+cluster observation snapshot
//! 3. **Derive** - Compute the next reconcile state from intent and
//!    observation (a pure function, see [`state`])
//! 4. **Act** - Run the side effect for the derived state
//! 5. **Status** - Write `status.currentState` and publish events
//!
//! # Modules
//!
//! - [`instancegroup`] - The per-resource reconciler and its provisioners
//! - [`state`] - The reconcile state machine
//! - [`finalizers`] - Finalizer add/remove helpers
//! - [`status`] - Condition helpers and the status write-back
//! - [`pagination`] - Paginated Kubernetes list helper

pub mod finalizers;
pub mod instancegroup;
pub mod pagination;
pub mod state;
pub mod status;

pub use instancegroup::{reconcile_instancegroup, requeue_for};
pub use state::{next_state, Intent, ReconcileState, ResourceBucket};
