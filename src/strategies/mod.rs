// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Node-rotation upgrade strategies.
//!
//! When the scaling configuration drifts, running instances must be
//! replaced ("rotated") so that every node runs the latest configuration.
//! Two strategies implement that rotation:
//!
//! - [`rolling`] - this controller terminates update targets itself,
//!   bounded by `maxUnavailable` and gated on cluster node readiness
//! - [`crd_strategy`] - rotation is delegated to an external custom
//!   resource whose status the controller watches to completion
//!
//! The `managed` strategy has no module here: managed node groups rotate
//! through the node-group service's own update mechanism.

pub mod crd_strategy;
pub mod rolling;
