// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Instance Manager - EKS Instance-Group Controller for Kubernetes
//!
//! Instance-manager is a Kubernetes controller written in Rust that manages
//! the lifecycle of worker node pools ("instance groups") for EKS clusters
//! through a Custom Resource Definition.
//!
//! ## Overview
//!
//! Users declare an [`crd::InstanceGroup`] and the controller reconciles it
//! against cloud primitives until observed state matches: scaling groups
//! with launch configurations or versioned launch templates, IAM roles and
//! instance profiles, managed node groups, and Fargate profiles.
//!
//! ## Modules
//!
//! - [`crd`] - The InstanceGroup Custom Resource Definition
//! - [`reconcilers`] - The per-resource state machine and provisioners
//! - [`scaling`] - Drift detection and rotation over launch
//!   configurations and launch templates
//! - [`strategies`] - Rolling-update and delegated upgrade strategies
//! - [`provisioning`] - IAM role and instance-profile lifecycle
//! - [`aws`] - Cloud capability traits, cache, and SDK clients
//! - [`events`] - Cluster events and spot-recommendation lookup
//!
//! ## Example
//!
//! ```rust,no_run
//! use instance_manager::crd::{EksConfiguration, EksSpec, InstanceGroupSpec, Provisioner};
//!
//! let spec = InstanceGroupSpec {
//!     provisioner: Provisioner::Eks,
//!     eks: Some(EksSpec {
//!         min_size: 3,
//!         max_size: 6,
//!         configuration_type: Default::default(),
//!         configuration: EksConfiguration {
//!             cluster_name: "prod-eks".to_string(),
//!             image: "ami-1234567890".to_string(),
//!             instance_type: "m5.large".to_string(),
//!             ..Default::default()
//!         },
//!     }),
//!     eks_cf: None,
//!     eks_managed: None,
//!     eks_fargate: None,
//!     strategy: Default::default(),
//! };
//! assert!(spec.validate().is_ok());
//! ```
//!
//! ## Features
//!
//! - **Drift Detection** - Deterministic comparison of declared and
//!   observed launch configurations
//! - **Bounded Rotation** - Rolling updates capped by `maxUnavailable`
//! - **Delegated Upgrades** - Rotation via an external custom resource
//! - **Spot Awareness** - Recommendation events drive spot pricing

pub mod aws;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod events;
pub mod labels;
pub mod metrics;
pub mod provisioning;
pub mod reconcilers;
pub mod scaling;
pub mod strategies;
