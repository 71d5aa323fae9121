// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the instance-manager controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the InstanceGroup CRD
pub const API_GROUP: &str = "instancemgr.keikoproj.io";

/// API version for the InstanceGroup CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "instancemgr.keikoproj.io/v1alpha1";

/// Kind name for the `InstanceGroup` resource
pub const KIND_INSTANCE_GROUP: &str = "InstanceGroup";

/// Name of the controller as reported in events and ownership annotations
pub const CONTROLLER_NAME: &str = "instance-manager";

// ============================================================================
// Reconciliation Constants
// ============================================================================

/// Default number of concurrent reconcile workers
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Requeue interval while a cloud mutation is converging (seconds)
pub const ONGOING_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue interval for groups that reached `Ready` (resync only)
pub const READY_REQUEUE_DURATION_SECS: u64 = 300;

/// Base delay for transient-error exponential backoff (seconds)
pub const ERROR_BACKOFF_BASE_SECS: u64 = 5;

/// Ceiling for transient-error exponential backoff (seconds)
pub const ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Overall deadline for a single reconcile (seconds)
pub const RECONCILE_TIMEOUT_SECS: u64 = 600;

/// Page size for paginated Kubernetes list operations
pub const KUBE_LIST_PAGE_SIZE: u32 = 500;

// ============================================================================
// Scaling-Configuration Constants
// ============================================================================

/// Number of launch-template versions retained during garbage collection
pub const DEFAULT_RETAINED_TEMPLATE_VERSIONS: usize = 10;

/// Number of prefix-matched launch configurations retained during garbage collection
pub const DEFAULT_RETAINED_LAUNCH_CONFIGURATIONS: usize = 2;

/// Hex length of the deterministic suffix appended to launch-configuration names
pub const CONFIG_NAME_SUFFIX_LEN: usize = 12;

/// Kubernetes object names may not exceed this length
pub const MAX_RESOURCE_NAME_LEN: usize = 63;

// ============================================================================
// IAM Constants
// ============================================================================

/// Delay between instance-profile creation and role attachment (seconds).
/// IAM propagation lags behind the create call.
pub const IAM_PROPAGATION_DELAY_SECS: u64 = 15;

/// Attempts when deleting a role that may still see attached-policy lag
pub const IAM_DELETE_MAX_ATTEMPTS: u32 = 5;

/// Delay between role-delete attempts (seconds)
pub const IAM_DELETE_RETRY_DELAY_SECS: u64 = 3;

/// Managed policies attached to default node roles
pub const DEFAULT_NODE_POLICIES: [&str; 3] = [
    "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy",
    "arn:aws:iam::aws:policy/AmazonEKS_CNI_Policy",
    "arn:aws:iam::aws:policy/AmazonEC2ContainerRegistryReadOnly",
];

/// Managed policy attached to the default Fargate pod execution role
pub const DEFAULT_FARGATE_POLICY: &str =
    "arn:aws:iam::aws:policy/AmazonEKSFargatePodExecutionRolePolicy";

/// Managed policy attached to the default managed-node-group role
pub const DEFAULT_MANAGED_NODE_POLICY: &str = "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy";

// ============================================================================
// Spot Recommendation Constants
// ============================================================================

/// Event reason scanned for spot recommendations
pub const SPOT_RECOMMENDATION_REASON: &str = "SpotRecommendationGiven";

/// Default freshness window for spot-recommendation events (minutes)
pub const DEFAULT_SPOT_RECOMMENDATION_MINUTES: i64 = 10;

// ============================================================================
// Cloud Cache Constants
// ============================================================================

/// TTL for describe-scaling-group responses (seconds)
pub const CACHE_TTL_SCALING_GROUPS_SECS: u64 = 60;

/// TTL for describe-launch-configuration responses (seconds)
pub const CACHE_TTL_LAUNCH_CONFIGURATIONS_SECS: u64 = 60;

/// TTL for describe-launch-template-version responses (seconds)
pub const CACHE_TTL_TEMPLATE_VERSIONS_SECS: u64 = 60;

/// TTL for describe-instance-type responses (seconds)
pub const CACHE_TTL_INSTANCE_TYPES_SECS: u64 = 86_400;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default leader election retry period (2 seconds)
pub const DEFAULT_LEASE_RETRY_PERIOD_SECS: u64 = 2;

/// Default lease name
pub const DEFAULT_LEASE_NAME: &str = "instance-manager-leader";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default bind address for the metrics HTTP server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
