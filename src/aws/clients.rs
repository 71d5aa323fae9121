// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Production implementations of the cloud capability traits.
//!
//! Each client wraps one vendor SDK client, converts SDK shapes into the
//! domain types in [`crate::aws::types`], counts throttles into the
//! Prometheus registry, and layers the read-through TTL cache from
//! [`crate::aws::cache`] over the describe operations. SDK types do not
//! leak past this module.

use crate::aws::api::{
    CloudError, CloudResult, ClusterApi, ComputeApi, IdentityApi, ParameterApi, ScalingApi,
};
use crate::aws::cache::ResponseCache;
use crate::aws::types::{
    BlockDevice, ConfigurationInput, FargateProfile, FargateProfileInput, GroupConfigRef,
    GroupInstance, InstanceProfile, LaunchConfiguration, LaunchTemplate, LaunchTemplateVersion,
    LifecycleHookInput, MetadataOptions, NodeGroup, NodeGroupInput, Placement, Role, ScalingGroup,
    ScalingGroupInput, TemplateReference,
};
use crate::constants::{
    CACHE_TTL_LAUNCH_CONFIGURATIONS_SECS, CACHE_TTL_SCALING_GROUPS_SECS,
    CACHE_TTL_TEMPLATE_VERSIONS_SECS,
};
use crate::metrics;
use async_trait::async_trait;
use aws_sdk_autoscaling::error::{BuildError, ProvideErrorMetadata, SdkError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

const THROTTLE_CODES: [&str; 4] = [
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

const NOT_FOUND_CODES: [&str; 5] = [
    "NoSuchEntity",
    "ResourceNotFoundException",
    "ParameterNotFound",
    "InvalidLaunchTemplateName.NotFoundException",
    "InvalidLaunchTemplateId.NotFound",
];

const ALREADY_EXISTS_CODES: [&str; 4] = [
    "EntityAlreadyExists",
    "AlreadyExists",
    "ResourceInUseException",
    "InvalidLaunchTemplateName.AlreadyExistsException",
];

/// Map an SDK error into the cloud error taxonomy, counting throttles.
fn to_cloud_error<E, R>(service: &'static str, err: SdkError<E, R>) -> CloudError
where
    E: ProvideErrorMetadata,
{
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = err.message().unwrap_or("no message").to_string();

    if THROTTLE_CODES.contains(&code.as_str()) {
        metrics::record_cloud_throttle(service);
        return CloudError::Throttled(format!("{service}: {message}"));
    }
    if NOT_FOUND_CODES.contains(&code.as_str()) {
        return CloudError::NotFound(message);
    }
    // The Auto Scaling API reports missing resources through ValidationError
    if code == "ValidationError" && message.to_lowercase().contains("not found") {
        return CloudError::NotFound(message);
    }
    if ALREADY_EXISTS_CODES.contains(&code.as_str()) {
        return CloudError::AlreadyExists(message);
    }
    if code == "LimitExceeded" || code == "LimitExceededException" {
        return CloudError::LimitExceeded(message);
    }
    CloudError::Api { code, message }
}

fn build_error(err: BuildError) -> CloudError {
    CloudError::Api {
        code: "InvalidInput".to_string(),
        message: err.to_string(),
    }
}

fn convert_time(time: Option<&aws_sdk_autoscaling::primitives::DateTime>) -> DateTime<Utc> {
    time.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_default()
}

// ============================================================================
// Auto Scaling
// ============================================================================

/// [`ScalingApi`] backed by the Auto Scaling SDK client.
pub struct AwsScalingClient {
    client: aws_sdk_autoscaling::Client,
    groups: ResponseCache<Vec<ScalingGroup>>,
    configurations: ResponseCache<Vec<LaunchConfiguration>>,
}

impl AwsScalingClient {
    /// Wrap an SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_autoscaling::Client) -> Self {
        Self {
            client,
            groups: ResponseCache::new(),
            configurations: ResponseCache::new(),
        }
    }

    fn convert_template_spec(
        spec: &aws_sdk_autoscaling::types::LaunchTemplateSpecification,
    ) -> TemplateReference {
        TemplateReference {
            id: spec.launch_template_id().map(String::from),
            name: spec.launch_template_name().map(String::from),
            version: spec.version().map(String::from),
        }
    }

    fn convert_group(group: &aws_sdk_autoscaling::types::AutoScalingGroup) -> ScalingGroup {
        let mixed_instances_template = group
            .mixed_instances_policy()
            .and_then(|policy| policy.launch_template())
            .and_then(|template| template.launch_template_specification())
            .map(Self::convert_template_spec);

        ScalingGroup {
            name: group.auto_scaling_group_name().unwrap_or_default().to_string(),
            min_size: group.min_size().unwrap_or_default(),
            max_size: group.max_size().unwrap_or_default(),
            desired_capacity: group.desired_capacity().unwrap_or_default(),
            subnets: group
                .vpc_zone_identifier()
                .map(|subnets| {
                    subnets
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            launch_configuration_name: group.launch_configuration_name().map(String::from),
            launch_template: group.launch_template().map(Self::convert_template_spec),
            mixed_instances_template,
            instances: group
                .instances()
                .iter()
                .map(|instance| GroupInstance {
                    id: instance.instance_id().unwrap_or_default().to_string(),
                    lifecycle_state: instance
                        .lifecycle_state()
                        .map(|state| state.as_str().to_string())
                        .unwrap_or_default(),
                    launch_configuration_name: instance
                        .launch_configuration_name()
                        .map(String::from),
                    launch_template: instance.launch_template().map(Self::convert_template_spec),
                })
                .collect(),
            tags: group
                .tags()
                .iter()
                .filter_map(|tag| {
                    Some((
                        tag.key()?.to_string(),
                        tag.value().unwrap_or_default().to_string(),
                    ))
                })
                .collect(),
            suspended_processes: group
                .suspended_processes()
                .iter()
                .filter_map(|process| process.process_name().map(String::from))
                .collect(),
            status: group.status().map(String::from),
        }
    }

    fn convert_configuration(
        config: &aws_sdk_autoscaling::types::LaunchConfiguration,
    ) -> LaunchConfiguration {
        let block_devices = config
            .block_device_mappings()
            .iter()
            .map(|mapping| {
                let ebs = mapping.ebs();
                BlockDevice {
                    device_name: mapping.device_name().unwrap_or_default().to_string(),
                    volume_type: ebs
                        .and_then(|e| e.volume_type())
                        .unwrap_or_default()
                        .to_string(),
                    size: i64::from(ebs.and_then(|e| e.volume_size()).unwrap_or_default()),
                    iops: ebs.and_then(|e| e.iops()).map(i64::from),
                    throughput: ebs.and_then(|e| e.throughput()).map(i64::from),
                    snapshot_id: ebs.and_then(|e| e.snapshot_id()).map(String::from),
                    delete_on_termination: ebs.and_then(|e| e.delete_on_termination()),
                    encrypted: ebs.and_then(|e| e.encrypted()),
                }
            })
            .collect();

        LaunchConfiguration {
            name: config
                .launch_configuration_name()
                .unwrap_or_default()
                .to_string(),
            created: convert_time(config.created_time()),
            payload: ConfigurationInput {
                name: config
                    .launch_configuration_name()
                    .unwrap_or_default()
                    .to_string(),
                image_id: config.image_id().unwrap_or_default().to_string(),
                instance_type: config.instance_type().unwrap_or_default().to_string(),
                key_name: config.key_name().map(String::from),
                security_groups: config.security_groups().to_vec(),
                user_data: config.user_data().unwrap_or_default().to_string(),
                instance_profile_arn: config.iam_instance_profile().map(String::from),
                block_devices,
                spot_price: config.spot_price().map(String::from),
                license_specifications: Vec::new(),
                placement: None,
                metadata_options: None,
            },
        }
    }

    fn group_tags(
        group_name: &str,
        tags: &[(String, String, bool)],
    ) -> Result<Vec<aws_sdk_autoscaling::types::Tag>, BuildError> {
        tags.iter()
            .map(|(key, value, propagate)| {
                aws_sdk_autoscaling::types::Tag::builder()
                    .key(key)
                    .value(value)
                    .propagate_at_launch(*propagate)
                    .resource_id(group_name)
                    .resource_type("auto-scaling-group")
                    .build()
            })
            .collect()
    }

    fn config_ref_parts(
        config_ref: &GroupConfigRef,
    ) -> (
        Option<String>,
        Option<aws_sdk_autoscaling::types::LaunchTemplateSpecification>,
        Option<aws_sdk_autoscaling::types::MixedInstancesPolicy>,
    ) {
        match config_ref {
            GroupConfigRef::LaunchConfiguration(name) => (Some(name.clone()), None, None),
            GroupConfigRef::LaunchTemplate(template) => {
                let spec = aws_sdk_autoscaling::types::LaunchTemplateSpecification::builder()
                    .set_launch_template_id(template.id.clone())
                    .set_launch_template_name(template.name.clone())
                    .set_version(template.version.clone())
                    .build();
                (None, Some(spec), None)
            }
            GroupConfigRef::MixedInstances {
                template,
                strategy,
                base_capacity,
                spot_pools,
                instance_types,
            } => {
                let spec = aws_sdk_autoscaling::types::LaunchTemplateSpecification::builder()
                    .set_launch_template_id(template.id.clone())
                    .set_launch_template_name(template.name.clone())
                    .set_version(template.version.clone())
                    .build();
                let overrides = instance_types
                    .iter()
                    .map(|instance_type| {
                        aws_sdk_autoscaling::types::LaunchTemplateOverrides::builder()
                            .instance_type(instance_type)
                            .build()
                    })
                    .collect::<Vec<_>>();
                let distribution = aws_sdk_autoscaling::types::InstancesDistribution::builder()
                    .set_spot_allocation_strategy(strategy.clone())
                    .set_on_demand_percentage_above_base_capacity(*base_capacity)
                    .set_spot_instance_pools(*spot_pools)
                    .build();
                let policy = aws_sdk_autoscaling::types::MixedInstancesPolicy::builder()
                    .launch_template(
                        aws_sdk_autoscaling::types::LaunchTemplate::builder()
                            .launch_template_specification(spec)
                            .set_overrides(Some(overrides))
                            .build(),
                    )
                    .instances_distribution(distribution)
                    .build();
                (None, None, Some(policy))
            }
        }
    }
}

#[async_trait]
impl ScalingApi for AwsScalingClient {
    async fn describe_scaling_groups(&self) -> CloudResult<Vec<ScalingGroup>> {
        if let Some(groups) = self.groups.get("describe-scaling-groups", "all") {
            debug!("describe-scaling-groups served from cache");
            return Ok(groups);
        }

        let pages = self
            .client
            .describe_auto_scaling_groups()
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;

        let groups: Vec<ScalingGroup> = pages.iter().map(Self::convert_group).collect();
        self.groups.put(
            "describe-scaling-groups",
            "all",
            groups.clone(),
            Duration::from_secs(CACHE_TTL_SCALING_GROUPS_SECS),
        );
        Ok(groups)
    }

    async fn create_scaling_group(&self, input: &ScalingGroupInput) -> CloudResult<()> {
        let (config_name, template_spec, mixed_policy) = Self::config_ref_parts(&input.config_ref);
        let tags = Self::group_tags(&input.name, &input.tags).map_err(build_error)?;

        self.client
            .create_auto_scaling_group()
            .auto_scaling_group_name(&input.name)
            .min_size(input.min_size)
            .max_size(input.max_size)
            .set_desired_capacity(input.desired_capacity)
            .vpc_zone_identifier(input.subnets.join(","))
            .set_launch_configuration_name(config_name)
            .set_launch_template(template_spec)
            .set_mixed_instances_policy(mixed_policy)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;

        self.groups.invalidate("describe-scaling-groups");
        Ok(())
    }

    async fn update_scaling_group(&self, input: &ScalingGroupInput) -> CloudResult<()> {
        let (config_name, template_spec, mixed_policy) = Self::config_ref_parts(&input.config_ref);

        self.client
            .update_auto_scaling_group()
            .auto_scaling_group_name(&input.name)
            .min_size(input.min_size)
            .max_size(input.max_size)
            .set_desired_capacity(input.desired_capacity)
            .vpc_zone_identifier(input.subnets.join(","))
            .set_launch_configuration_name(config_name)
            .set_launch_template(template_spec)
            .set_mixed_instances_policy(mixed_policy)
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;

        self.groups.invalidate("describe-scaling-groups");
        Ok(())
    }

    async fn update_group_tags(
        &self,
        group: &str,
        tags: &[(String, String, bool)],
    ) -> CloudResult<()> {
        let tags = Self::group_tags(group, tags).map_err(build_error)?;
        self.client
            .create_or_update_tags()
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        self.groups.invalidate("describe-scaling-groups");
        Ok(())
    }

    async fn delete_scaling_group(&self, name: &str) -> CloudResult<()> {
        self.client
            .delete_auto_scaling_group()
            .auto_scaling_group_name(name)
            .force_delete(true)
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        self.groups.invalidate("describe-scaling-groups");
        Ok(())
    }

    async fn terminate_instance(&self, instance_id: &str) -> CloudResult<()> {
        self.client
            .terminate_instance_in_auto_scaling_group()
            .instance_id(instance_id)
            .should_decrement_desired_capacity(false)
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        self.groups.invalidate("describe-scaling-groups");
        Ok(())
    }

    async fn describe_launch_configurations(
        &self,
        prefix: &str,
    ) -> CloudResult<Vec<LaunchConfiguration>> {
        if let Some(configs) = self.configurations.get("describe-launch-configurations", prefix) {
            return Ok(configs);
        }

        let pages = self
            .client
            .describe_launch_configurations()
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;

        let configs: Vec<LaunchConfiguration> = pages
            .iter()
            .filter(|config| {
                config
                    .launch_configuration_name()
                    .is_some_and(|name| name.starts_with(prefix))
            })
            .map(Self::convert_configuration)
            .collect();

        self.configurations.put(
            "describe-launch-configurations",
            prefix,
            configs.clone(),
            Duration::from_secs(CACHE_TTL_LAUNCH_CONFIGURATIONS_SECS),
        );
        Ok(configs)
    }

    async fn create_launch_configuration(&self, input: &ConfigurationInput) -> CloudResult<()> {
        let block_devices = input
            .block_devices
            .iter()
            .map(|device| {
                let ebs = aws_sdk_autoscaling::types::Ebs::builder()
                    .volume_type(&device.volume_type)
                    .volume_size(i32::try_from(device.size).unwrap_or(i32::MAX))
                    .set_iops(device.iops.map(|iops| i32::try_from(iops).unwrap_or(i32::MAX)))
                    .set_throughput(
                        device
                            .throughput
                            .map(|throughput| i32::try_from(throughput).unwrap_or(i32::MAX)),
                    )
                    .set_snapshot_id(device.snapshot_id.clone())
                    .set_delete_on_termination(device.delete_on_termination)
                    .set_encrypted(device.encrypted)
                    .build();
                aws_sdk_autoscaling::types::BlockDeviceMapping::builder()
                    .device_name(&device.device_name)
                    .ebs(ebs)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(build_error)?;

        self.client
            .create_launch_configuration()
            .launch_configuration_name(&input.name)
            .image_id(&input.image_id)
            .instance_type(&input.instance_type)
            .set_key_name(input.key_name.clone())
            .set_security_groups(Some(input.security_groups.clone()))
            .user_data(&input.user_data)
            .set_iam_instance_profile(input.instance_profile_arn.clone())
            .set_spot_price(input.spot_price.clone())
            .set_block_device_mappings(Some(block_devices))
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;

        self.configurations
            .invalidate("describe-launch-configurations");
        Ok(())
    }

    async fn delete_launch_configuration(&self, name: &str) -> CloudResult<()> {
        self.client
            .delete_launch_configuration()
            .launch_configuration_name(name)
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        self.configurations
            .invalidate("describe-launch-configurations");
        Ok(())
    }

    async fn put_lifecycle_hook(&self, group: &str, hook: &LifecycleHookInput) -> CloudResult<()> {
        self.client
            .put_lifecycle_hook()
            .auto_scaling_group_name(group)
            .lifecycle_hook_name(&hook.name)
            .lifecycle_transition(&hook.transition)
            .set_default_result(hook.default_result.clone())
            .set_heartbeat_timeout(hook.heartbeat_timeout)
            .set_notification_target_arn(hook.notification_arn.clone())
            .set_role_arn(hook.role_arn.clone())
            .set_notification_metadata(hook.notification_metadata.clone())
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        Ok(())
    }

    async fn describe_lifecycle_hooks(&self, group: &str) -> CloudResult<Vec<String>> {
        let output = self
            .client
            .describe_lifecycle_hooks()
            .auto_scaling_group_name(group)
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        Ok(output
            .lifecycle_hooks()
            .iter()
            .filter_map(|hook| hook.lifecycle_hook_name().map(String::from))
            .collect())
    }

    async fn delete_lifecycle_hook(&self, group: &str, hook: &str) -> CloudResult<()> {
        self.client
            .delete_lifecycle_hook()
            .auto_scaling_group_name(group)
            .lifecycle_hook_name(hook)
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        Ok(())
    }

    async fn suspend_processes(&self, group: &str, processes: &[String]) -> CloudResult<()> {
        self.client
            .suspend_processes()
            .auto_scaling_group_name(group)
            .set_scaling_processes(Some(processes.to_vec()))
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        Ok(())
    }

    async fn resume_processes(&self, group: &str, processes: &[String]) -> CloudResult<()> {
        self.client
            .resume_processes()
            .auto_scaling_group_name(group)
            .set_scaling_processes(Some(processes.to_vec()))
            .send()
            .await
            .map_err(|e| to_cloud_error("autoscaling", e))?;
        Ok(())
    }
}

// ============================================================================
// EC2 (launch templates)
// ============================================================================

/// [`ComputeApi`] backed by the EC2 SDK client.
pub struct AwsComputeClient {
    client: aws_sdk_ec2::Client,
    versions: ResponseCache<Vec<LaunchTemplateVersion>>,
}

impl AwsComputeClient {
    /// Wrap an SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self {
            client,
            versions: ResponseCache::new(),
        }
    }

    fn convert_template(template: &aws_sdk_ec2::types::LaunchTemplate) -> LaunchTemplate {
        LaunchTemplate {
            id: template.launch_template_id().unwrap_or_default().to_string(),
            name: template
                .launch_template_name()
                .unwrap_or_default()
                .to_string(),
            latest_version: template.latest_version_number().unwrap_or_default(),
            default_version: template.default_version_number().unwrap_or_default(),
        }
    }

    fn convert_version(
        version: &aws_sdk_ec2::types::LaunchTemplateVersion,
    ) -> LaunchTemplateVersion {
        let data = version.launch_template_data();
        let payload = data.map(Self::convert_data).unwrap_or_default();

        LaunchTemplateVersion {
            template_id: version.launch_template_id().unwrap_or_default().to_string(),
            template_name: version
                .launch_template_name()
                .unwrap_or_default()
                .to_string(),
            version: version.version_number().unwrap_or_default(),
            created: version
                .create_time()
                .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
                .unwrap_or_default(),
            payload,
        }
    }

    fn convert_data(data: &aws_sdk_ec2::types::ResponseLaunchTemplateData) -> ConfigurationInput {
        let block_devices = data
            .block_device_mappings()
            .iter()
            .map(|mapping| {
                let ebs = mapping.ebs();
                BlockDevice {
                    device_name: mapping.device_name().unwrap_or_default().to_string(),
                    volume_type: ebs
                        .and_then(|e| e.volume_type())
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_default(),
                    size: i64::from(ebs.and_then(|e| e.volume_size()).unwrap_or_default()),
                    iops: ebs.and_then(|e| e.iops()).map(i64::from),
                    throughput: ebs.and_then(|e| e.throughput()).map(i64::from),
                    snapshot_id: ebs.and_then(|e| e.snapshot_id()).map(String::from),
                    delete_on_termination: ebs.and_then(|e| e.delete_on_termination()),
                    encrypted: ebs.and_then(|e| e.encrypted()),
                }
            })
            .collect();

        ConfigurationInput {
            name: String::new(),
            image_id: data.image_id().unwrap_or_default().to_string(),
            instance_type: data
                .instance_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            key_name: data.key_name().map(String::from),
            security_groups: data.security_group_ids().to_vec(),
            user_data: data.user_data().unwrap_or_default().to_string(),
            instance_profile_arn: data
                .iam_instance_profile()
                .and_then(|profile| profile.arn().or(profile.name()))
                .map(String::from),
            block_devices,
            spot_price: data
                .instance_market_options()
                .and_then(|market| market.spot_options())
                .and_then(|spot| spot.max_price())
                .map(String::from),
            license_specifications: data
                .license_specifications()
                .iter()
                .filter_map(|license| license.license_configuration_arn().map(String::from))
                .collect(),
            placement: data.placement().map(|placement| Placement {
                availability_zone: placement.availability_zone().map(String::from),
                host_resource_group_arn: placement.host_resource_group_arn().map(String::from),
                tenancy: placement.tenancy().map(|t| t.as_str().to_string()),
            }),
            metadata_options: data.metadata_options().map(|options| MetadataOptions {
                http_endpoint: options.http_endpoint().map(|v| v.as_str().to_string()),
                http_tokens: options.http_tokens().map(|v| v.as_str().to_string()),
                http_put_response_hop_limit: options.http_put_response_hop_limit().map(i64::from),
            }),
        }
    }

    fn request_data(
        input: &ConfigurationInput,
    ) -> aws_sdk_ec2::types::RequestLaunchTemplateData {
        let mut builder = aws_sdk_ec2::types::RequestLaunchTemplateData::builder()
            .image_id(&input.image_id)
            .instance_type(aws_sdk_ec2::types::InstanceType::from(
                input.instance_type.as_str(),
            ))
            .set_key_name(input.key_name.clone())
            .set_security_group_ids(Some(input.security_groups.clone()))
            .user_data(&input.user_data);

        if let Some(arn) = &input.instance_profile_arn {
            builder = builder.iam_instance_profile(
                aws_sdk_ec2::types::LaunchTemplateIamInstanceProfileSpecificationRequest::builder()
                    .arn(arn)
                    .build(),
            );
        }

        if let Some(price) = &input.spot_price {
            builder = builder.instance_market_options(
                aws_sdk_ec2::types::LaunchTemplateInstanceMarketOptionsRequest::builder()
                    .market_type(aws_sdk_ec2::types::MarketType::Spot)
                    .spot_options(
                        aws_sdk_ec2::types::LaunchTemplateSpotMarketOptionsRequest::builder()
                            .max_price(price)
                            .build(),
                    )
                    .build(),
            );
        }

        let block_devices = input
            .block_devices
            .iter()
            .map(|device| {
                let ebs = aws_sdk_ec2::types::LaunchTemplateEbsBlockDeviceRequest::builder()
                    .volume_type(aws_sdk_ec2::types::VolumeType::from(
                        device.volume_type.as_str(),
                    ))
                    .volume_size(i32::try_from(device.size).unwrap_or(i32::MAX))
                    .set_iops(device.iops.map(|iops| i32::try_from(iops).unwrap_or(i32::MAX)))
                    .set_throughput(
                        device
                            .throughput
                            .map(|throughput| i32::try_from(throughput).unwrap_or(i32::MAX)),
                    )
                    .set_snapshot_id(device.snapshot_id.clone())
                    .set_delete_on_termination(device.delete_on_termination)
                    .set_encrypted(device.encrypted)
                    .build();
                aws_sdk_ec2::types::LaunchTemplateBlockDeviceMappingRequest::builder()
                    .device_name(&device.device_name)
                    .ebs(ebs)
                    .build()
            })
            .collect::<Vec<_>>();
        builder = builder.set_block_device_mappings(Some(block_devices));

        let licenses = input
            .license_specifications
            .iter()
            .map(|arn| {
                aws_sdk_ec2::types::LaunchTemplateLicenseConfigurationRequest::builder()
                    .license_configuration_arn(arn)
                    .build()
            })
            .collect::<Vec<_>>();
        if !licenses.is_empty() {
            builder = builder.set_license_specifications(Some(licenses));
        }

        if let Some(placement) = &input.placement {
            builder = builder.placement(
                aws_sdk_ec2::types::LaunchTemplatePlacementRequest::builder()
                    .set_availability_zone(placement.availability_zone.clone())
                    .set_host_resource_group_arn(placement.host_resource_group_arn.clone())
                    .set_tenancy(
                        placement
                            .tenancy
                            .as_deref()
                            .map(aws_sdk_ec2::types::Tenancy::from),
                    )
                    .build(),
            );
        }

        if let Some(options) = &input.metadata_options {
            builder = builder.metadata_options(
                aws_sdk_ec2::types::LaunchTemplateInstanceMetadataOptionsRequest::builder()
                    .set_http_endpoint(options.http_endpoint.as_deref().map(
                        aws_sdk_ec2::types::LaunchTemplateInstanceMetadataEndpointState::from,
                    ))
                    .set_http_tokens(
                        options
                            .http_tokens
                            .as_deref()
                            .map(aws_sdk_ec2::types::LaunchTemplateHttpTokensState::from),
                    )
                    .set_http_put_response_hop_limit(
                        options
                            .http_put_response_hop_limit
                            .map(|limit| i32::try_from(limit).unwrap_or(i32::MAX)),
                    )
                    .build(),
            );
        }

        builder.build()
    }
}

#[async_trait]
impl ComputeApi for AwsComputeClient {
    async fn describe_launch_template(&self, name: &str) -> CloudResult<Option<LaunchTemplate>> {
        let result = self
            .client
            .describe_launch_templates()
            .launch_template_names(name)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .launch_templates()
                .first()
                .map(Self::convert_template)),
            Err(err) => match to_cloud_error("ec2", err) {
                CloudError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn describe_template_versions(
        &self,
        name: &str,
    ) -> CloudResult<Vec<LaunchTemplateVersion>> {
        if let Some(versions) = self.versions.get("describe-template-versions", name) {
            return Ok(versions);
        }

        let result = self
            .client
            .describe_launch_template_versions()
            .launch_template_name(name)
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await;

        let versions: Vec<LaunchTemplateVersion> = match result {
            Ok(pages) => pages.iter().map(Self::convert_version).collect(),
            Err(err) => match to_cloud_error("ec2", err) {
                CloudError::NotFound(_) => Vec::new(),
                other => return Err(other),
            },
        };

        self.versions.put(
            "describe-template-versions",
            name,
            versions.clone(),
            Duration::from_secs(CACHE_TTL_TEMPLATE_VERSIONS_SECS),
        );
        Ok(versions)
    }

    async fn create_launch_template(
        &self,
        input: &ConfigurationInput,
    ) -> CloudResult<LaunchTemplate> {
        let output = self
            .client
            .create_launch_template()
            .launch_template_name(&input.name)
            .launch_template_data(Self::request_data(input))
            .send()
            .await
            .map_err(|e| to_cloud_error("ec2", e))?;

        self.versions.invalidate("describe-template-versions");
        output
            .launch_template()
            .map(Self::convert_template)
            .ok_or_else(|| CloudError::Api {
                code: "MissingOutput".to_string(),
                message: "create-launch-template returned no template".to_string(),
            })
    }

    async fn create_template_version(
        &self,
        name: &str,
        input: &ConfigurationInput,
    ) -> CloudResult<LaunchTemplateVersion> {
        let output = self
            .client
            .create_launch_template_version()
            .launch_template_name(name)
            .launch_template_data(Self::request_data(input))
            .send()
            .await
            .map_err(|e| to_cloud_error("ec2", e))?;

        self.versions.invalidate("describe-template-versions");
        output
            .launch_template_version()
            .map(Self::convert_version)
            .ok_or_else(|| CloudError::Api {
                code: "MissingOutput".to_string(),
                message: "create-launch-template-version returned no version".to_string(),
            })
    }

    async fn set_default_version(&self, name: &str, version: i64) -> CloudResult<()> {
        self.client
            .modify_launch_template()
            .launch_template_name(name)
            .default_version(version.to_string())
            .send()
            .await
            .map_err(|e| to_cloud_error("ec2", e))?;
        self.versions.invalidate("describe-template-versions");
        Ok(())
    }

    async fn delete_template_versions(&self, name: &str, versions: &[i64]) -> CloudResult<()> {
        if versions.is_empty() {
            return Ok(());
        }
        self.client
            .delete_launch_template_versions()
            .launch_template_name(name)
            .set_versions(Some(versions.iter().map(ToString::to_string).collect()))
            .send()
            .await
            .map_err(|e| to_cloud_error("ec2", e))?;
        self.versions.invalidate("describe-template-versions");
        Ok(())
    }

    async fn delete_launch_template(&self, name: &str) -> CloudResult<()> {
        self.client
            .delete_launch_template()
            .launch_template_name(name)
            .send()
            .await
            .map_err(|e| to_cloud_error("ec2", e))?;
        self.versions.invalidate("describe-template-versions");
        Ok(())
    }
}

// ============================================================================
// IAM
// ============================================================================

/// [`IdentityApi`] backed by the IAM SDK client.
pub struct AwsIdentityClient {
    client: aws_sdk_iam::Client,
}

impl AwsIdentityClient {
    /// Wrap an SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityApi for AwsIdentityClient {
    async fn get_role(&self, name: &str) -> CloudResult<Option<Role>> {
        match self.client.get_role().role_name(name).send().await {
            Ok(output) => Ok(output.role().map(|role| Role {
                name: role.role_name().to_string(),
                arn: role.arn().to_string(),
            })),
            Err(err) => match to_cloud_error("iam", err) {
                CloudError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn create_role(&self, name: &str, trust_policy: &str) -> CloudResult<Role> {
        let output = self
            .client
            .create_role()
            .role_name(name)
            .assume_role_policy_document(trust_policy)
            .send()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;

        output
            .role()
            .map(|role| Role {
                name: role.role_name().to_string(),
                arn: role.arn().to_string(),
            })
            .ok_or_else(|| CloudError::Api {
                code: "MissingOutput".to_string(),
                message: "create-role returned no role".to_string(),
            })
    }

    async fn delete_role(&self, name: &str) -> CloudResult<()> {
        self.client
            .delete_role()
            .role_name(name)
            .send()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;
        Ok(())
    }

    async fn get_instance_profile(&self, name: &str) -> CloudResult<Option<InstanceProfile>> {
        match self
            .client
            .get_instance_profile()
            .instance_profile_name(name)
            .send()
            .await
        {
            Ok(output) => Ok(output.instance_profile().map(|profile| InstanceProfile {
                name: profile.instance_profile_name().to_string(),
                arn: profile.arn().to_string(),
                roles: profile
                    .roles()
                    .iter()
                    .map(|role| role.role_name().to_string())
                    .collect(),
            })),
            Err(err) => match to_cloud_error("iam", err) {
                CloudError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn create_instance_profile(&self, name: &str) -> CloudResult<InstanceProfile> {
        let output = self
            .client
            .create_instance_profile()
            .instance_profile_name(name)
            .send()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;

        output
            .instance_profile()
            .map(|profile| InstanceProfile {
                name: profile.instance_profile_name().to_string(),
                arn: profile.arn().to_string(),
                roles: Vec::new(),
            })
            .ok_or_else(|| CloudError::Api {
                code: "MissingOutput".to_string(),
                message: "create-instance-profile returned no profile".to_string(),
            })
    }

    async fn delete_instance_profile(&self, name: &str) -> CloudResult<()> {
        self.client
            .delete_instance_profile()
            .instance_profile_name(name)
            .send()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;
        Ok(())
    }

    async fn add_role_to_instance_profile(&self, profile: &str, role: &str) -> CloudResult<()> {
        self.client
            .add_role_to_instance_profile()
            .instance_profile_name(profile)
            .role_name(role)
            .send()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;
        Ok(())
    }

    async fn remove_role_from_instance_profile(
        &self,
        profile: &str,
        role: &str,
    ) -> CloudResult<()> {
        self.client
            .remove_role_from_instance_profile()
            .instance_profile_name(profile)
            .role_name(role)
            .send()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;
        Ok(())
    }

    async fn attach_role_policy(&self, role: &str, policy_arn: &str) -> CloudResult<()> {
        self.client
            .attach_role_policy()
            .role_name(role)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;
        Ok(())
    }

    async fn detach_role_policy(&self, role: &str, policy_arn: &str) -> CloudResult<()> {
        self.client
            .detach_role_policy()
            .role_name(role)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;
        Ok(())
    }

    async fn list_attached_policies(&self, role: &str) -> CloudResult<Vec<String>> {
        let policies = self
            .client
            .list_attached_role_policies()
            .role_name(role)
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await
            .map_err(|e| to_cloud_error("iam", e))?;

        Ok(policies
            .iter()
            .filter_map(|policy| policy.policy_arn().map(String::from))
            .collect())
    }
}

// ============================================================================
// EKS
// ============================================================================

/// [`ClusterApi`] backed by the EKS SDK client.
pub struct AwsClusterClient {
    client: aws_sdk_eks::Client,
}

impl AwsClusterClient {
    /// Wrap an SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_eks::Client) -> Self {
        Self { client }
    }

    fn convert_node_group(group: &aws_sdk_eks::types::Nodegroup) -> NodeGroup {
        let scaling = group.scaling_config();
        NodeGroup {
            name: group.nodegroup_name().unwrap_or_default().to_string(),
            status: group
                .status()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default(),
            min_size: scaling.and_then(|s| s.min_size()).unwrap_or_default(),
            max_size: scaling.and_then(|s| s.max_size()).unwrap_or_default(),
            desired_size: scaling.and_then(|s| s.desired_size()).unwrap_or_default(),
            node_role: group.node_role().map(String::from),
            labels: group
                .labels()
                .map(|labels| {
                    labels
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<BTreeMap<_, _>>()
                })
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl ClusterApi for AwsClusterClient {
    async fn describe_node_group(
        &self,
        cluster: &str,
        name: &str,
    ) -> CloudResult<Option<NodeGroup>> {
        match self
            .client
            .describe_nodegroup()
            .cluster_name(cluster)
            .nodegroup_name(name)
            .send()
            .await
        {
            Ok(output) => Ok(output.nodegroup().map(Self::convert_node_group)),
            Err(err) => match to_cloud_error("eks", err) {
                CloudError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn create_node_group(&self, input: &NodeGroupInput) -> CloudResult<()> {
        let scaling = aws_sdk_eks::types::NodegroupScalingConfig::builder()
            .min_size(input.min_size)
            .max_size(input.max_size)
            .desired_size(input.desired_size)
            .build();

        let mut request = self
            .client
            .create_nodegroup()
            .cluster_name(&input.cluster_name)
            .nodegroup_name(&input.name)
            .scaling_config(scaling)
            .node_role(&input.node_role)
            .set_subnets(Some(input.subnets.clone()))
            .set_instance_types(Some(input.instance_types.clone()))
            .set_labels(Some(
                input.labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ))
            .set_tags(Some(
                input.tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ));

        if let Some(ami_type) = &input.ami_type {
            request = request.ami_type(aws_sdk_eks::types::AmiTypes::from(ami_type.as_str()));
        }
        if let Some(volume_size) = input.volume_size {
            request = request.disk_size(volume_size);
        }
        if let Some(key) = &input.ssh_key_name {
            request = request.remote_access(
                aws_sdk_eks::types::RemoteAccessConfig::builder()
                    .ec2_ssh_key(key)
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| to_cloud_error("eks", e))?;
        Ok(())
    }

    async fn update_node_group(&self, input: &NodeGroupInput) -> CloudResult<()> {
        let scaling = aws_sdk_eks::types::NodegroupScalingConfig::builder()
            .min_size(input.min_size)
            .max_size(input.max_size)
            .desired_size(input.desired_size)
            .build();

        let labels = aws_sdk_eks::types::UpdateLabelsPayload::builder()
            .set_add_or_update_labels(Some(
                input.labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ))
            .build();

        self.client
            .update_nodegroup_config()
            .cluster_name(&input.cluster_name)
            .nodegroup_name(&input.name)
            .scaling_config(scaling)
            .labels(labels)
            .send()
            .await
            .map_err(|e| to_cloud_error("eks", e))?;
        Ok(())
    }

    async fn delete_node_group(&self, cluster: &str, name: &str) -> CloudResult<()> {
        self.client
            .delete_nodegroup()
            .cluster_name(cluster)
            .nodegroup_name(name)
            .send()
            .await
            .map_err(|e| to_cloud_error("eks", e))?;
        Ok(())
    }

    async fn describe_fargate_profile(
        &self,
        cluster: &str,
        name: &str,
    ) -> CloudResult<Option<FargateProfile>> {
        match self
            .client
            .describe_fargate_profile()
            .cluster_name(cluster)
            .fargate_profile_name(name)
            .send()
            .await
        {
            Ok(output) => Ok(output.fargate_profile().map(|profile| FargateProfile {
                name: profile
                    .fargate_profile_name()
                    .unwrap_or_default()
                    .to_string(),
                status: profile
                    .status()
                    .map(|status| status.as_str().to_string())
                    .unwrap_or_default(),
                pod_execution_role_arn: profile.pod_execution_role_arn().map(String::from),
            })),
            Err(err) => match to_cloud_error("eks", err) {
                CloudError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn create_fargate_profile(&self, input: &FargateProfileInput) -> CloudResult<()> {
        let selectors = input
            .selectors
            .iter()
            .map(|(namespace, labels)| {
                aws_sdk_eks::types::FargateProfileSelector::builder()
                    .namespace(namespace)
                    .set_labels(Some(
                        labels
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect::<HashMap<_, _>>(),
                    ))
                    .build()
            })
            .collect::<Vec<_>>();

        self.client
            .create_fargate_profile()
            .cluster_name(&input.cluster_name)
            .fargate_profile_name(&input.name)
            .pod_execution_role_arn(&input.pod_execution_role_arn)
            .set_subnets(Some(input.subnets.clone()))
            .set_selectors(Some(selectors))
            .set_tags(Some(
                input.tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ))
            .send()
            .await
            .map_err(|e| to_cloud_error("eks", e))?;
        Ok(())
    }

    async fn delete_fargate_profile(&self, cluster: &str, name: &str) -> CloudResult<()> {
        self.client
            .delete_fargate_profile()
            .cluster_name(cluster)
            .fargate_profile_name(name)
            .send()
            .await
            .map_err(|e| to_cloud_error("eks", e))?;
        Ok(())
    }
}

// ============================================================================
// SSM
// ============================================================================

/// [`ParameterApi`] backed by the SSM SDK client.
pub struct AwsParameterClient {
    client: aws_sdk_ssm::Client,
}

impl AwsParameterClient {
    /// Wrap an SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterApi for AwsParameterClient {
    async fn get_parameter(&self, name: &str) -> CloudResult<Option<String>> {
        match self.client.get_parameter().name(name).send().await {
            Ok(output) => Ok(output
                .parameter()
                .and_then(|parameter| parameter.value())
                .map(String::from)),
            Err(err) => match to_cloud_error("ssm", err) {
                CloudError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }
}
