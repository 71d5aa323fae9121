// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud provider integration.
//!
//! - [`api`] - Capability traits the reconcilers depend on, and the cloud
//!   error taxonomy
//! - [`types`] - Domain types for observed state and mutation inputs
//! - [`clients`] - Production implementations over the vendor SDK
//! - [`cache`] - Read-through TTL response cache
//!
//! The region is resolved from `AWS_REGION` (or the SDK's default provider
//! chain, which falls back to instance metadata); per-call retry with
//! exponential backoff is configured on the shared SDK config.

pub mod api;
pub mod cache;
pub mod clients;
pub mod types;

use crate::aws::api::{ClusterApi, ComputeApi, IdentityApi, ParameterApi, ScalingApi};
use crate::aws::clients::{
    AwsClusterClient, AwsComputeClient, AwsIdentityClient, AwsParameterClient, AwsScalingClient,
};
use anyhow::Result;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::Region;
use std::sync::Arc;
use tracing::info;

/// Maximum attempts for a single cloud call before the error surfaces.
const CLOUD_MAX_ATTEMPTS: u32 = 6;

/// Bundle of the cloud capability handles shared across reconciles.
///
/// The handles are trait objects so unit tests can substitute in-memory
/// doubles for any subset of the capabilities.
#[derive(Clone)]
pub struct CloudClients {
    /// Scaling groups and launch configurations
    pub scaling: Arc<dyn ScalingApi>,
    /// Launch templates
    pub compute: Arc<dyn ComputeApi>,
    /// IAM roles and instance profiles
    pub identity: Arc<dyn IdentityApi>,
    /// Managed node groups and Fargate profiles
    pub cluster: Arc<dyn ClusterApi>,
    /// Parameter Store lookups
    pub parameters: Arc<dyn ParameterApi>,
}

/// Build the production cloud clients.
///
/// # Arguments
///
/// * `region` - Explicit region override; falls back to `AWS_REGION` and
///   the SDK default provider chain when unset
///
/// # Errors
///
/// Returns an error if the SDK configuration cannot be assembled.
pub async fn load_cloud_clients(region: Option<String>) -> Result<CloudClients> {
    let region_provider =
        RegionProviderChain::first_try(region.map(Region::new)).or_default_provider();

    let config = aws_config::from_env()
        .region(region_provider)
        .retry_config(RetryConfig::standard().with_max_attempts(CLOUD_MAX_ATTEMPTS))
        .load()
        .await;

    info!(
        region = ?config.region(),
        max_attempts = CLOUD_MAX_ATTEMPTS,
        "Cloud SDK configuration loaded"
    );

    Ok(CloudClients {
        scaling: Arc::new(AwsScalingClient::new(aws_sdk_autoscaling::Client::new(
            &config,
        ))),
        compute: Arc::new(AwsComputeClient::new(aws_sdk_ec2::Client::new(&config))),
        identity: Arc::new(AwsIdentityClient::new(aws_sdk_iam::Client::new(&config))),
        cluster: Arc::new(AwsClusterClient::new(aws_sdk_eks::Client::new(&config))),
        parameters: Arc::new(AwsParameterClient::new(aws_sdk_ssm::Client::new(&config))),
    })
}
