// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common tag, label, and annotation constants used across the controller.
//!
//! Cloud resources are correlated back to their owning `InstanceGroup` by
//! tags; externally-issued upgrade resources are correlated by annotations.
//! This module defines those keys plus the helpers that build their values.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label/annotation for the tool managing a resource
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

// ============================================================================
// Cloud-Resource Tags
// ============================================================================

/// Tag identifying the owning `InstanceGroup` on every scaling group.
/// The value is `<namespace>/<name>` and the tag propagates at launch.
pub const GROUP_IDENTITY_TAG: &str = "instancemgr.keikoproj.io/instancegroup";

/// Tag marking cloud resources created by this controller
pub const CLUSTER_OWNERSHIP_TAG: &str = "instancemgr.keikoproj.io/cluster";

// ============================================================================
// Upgrade-Resource Annotations
// ============================================================================

/// Annotation value for `app.kubernetes.io/managed-by` on owned upgrade resources
pub const MANAGED_BY_VALUE: &str = "instance-manager";

/// Annotation scoping an upgrade resource to one scaling group
pub const UPGRADE_SCOPE_ANNOTATION: &str = "instancemgr.keikoproj.io/upgrade-scope";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `InstanceGroup` resources
pub const FINALIZER_INSTANCE_GROUP: &str = "instancemgr.keikoproj.io/instancegroup-finalizer";

/// Build the identity-tag value for a group.
#[must_use]
pub fn group_identity_value(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Deterministic prefix for cloud resources owned by a group.
///
/// Used for scaling-group, launch-configuration, launch-template, role, and
/// instance-profile names: `<cluster>-<namespace>-<name>`.
#[must_use]
pub fn resource_prefix(cluster_name: &str, namespace: &str, name: &str) -> String {
    format!("{cluster_name}-{namespace}-{name}")
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;
