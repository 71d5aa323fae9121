// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `eks/mod.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        build_configuration_input, group_tags, group_update_needed, wrap_mixed_instances,
    };
    use crate::aws::types::{GroupConfigRef, ScalingGroup, ScalingGroupInput, TemplateReference};
    use crate::crd::{CloudTag, EksConfiguration, MixedInstancesPolicySpec, NodeVolume};
    use crate::labels::{CLUSTER_OWNERSHIP_TAG, GROUP_IDENTITY_TAG};

    fn configuration() -> EksConfiguration {
        EksConfiguration {
            cluster_name: "prod-eks".to_string(),
            image: "ami-123".to_string(),
            instance_type: "m5.large".to_string(),
            subnets: vec!["subnet-1".to_string(), "subnet-2".to_string()],
            security_groups: vec!["sg-1".to_string()],
            ..Default::default()
        }
    }

    fn template_ref() -> TemplateReference {
        TemplateReference {
            id: Some("lt-0abc".to_string()),
            name: Some("prod-eks-default-ig1".to_string()),
            version: Some("$Latest".to_string()),
        }
    }

    fn group_input(config_ref: GroupConfigRef) -> ScalingGroupInput {
        ScalingGroupInput {
            name: "prod-eks-default-ig1".to_string(),
            min_size: 3,
            max_size: 6,
            desired_capacity: None,
            subnets: vec!["subnet-1".to_string(), "subnet-2".to_string()],
            config_ref,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_group_tags_lead_with_identity() {
        let mut config = configuration();
        config.tags.push(CloudTag {
            key: "team".to_string(),
            value: "platform".to_string(),
        });
        let tags = group_tags("default/ig1", &config);
        assert_eq!(
            tags[0],
            (GROUP_IDENTITY_TAG.to_string(), "default/ig1".to_string(), true)
        );
        assert_eq!(
            tags[1],
            (CLUSTER_OWNERSHIP_TAG.to_string(), "prod-eks".to_string(), true)
        );
        assert!(tags
            .iter()
            .any(|(key, value, _)| key == "team" && value == "platform"));
    }

    #[test]
    fn test_configuration_input_carries_volumes_and_profile() {
        let mut config = configuration();
        config.volumes.push(NodeVolume {
            name: "/dev/xvda".to_string(),
            volume_type: "gp3".to_string(),
            size: 64,
            iops: Some(3000),
            throughput: None,
            snapshot_id: None,
            delete_on_termination: Some(true),
            encrypted: Some(true),
        });

        let input = build_configuration_input(
            &config,
            "ami-resolved",
            "arn:aws:iam::1:instance-profile/p",
            Some("0.10".to_string()),
        );
        assert_eq!(input.image_id, "ami-resolved");
        assert_eq!(
            input.instance_profile_arn.as_deref(),
            Some("arn:aws:iam::1:instance-profile/p")
        );
        assert_eq!(input.spot_price.as_deref(), Some("0.10"));
        assert_eq!(input.block_devices.len(), 1);
        assert_eq!(input.block_devices[0].device_name, "/dev/xvda");
        assert!(!input.user_data.is_empty());
    }

    #[test]
    fn test_mixed_instances_wraps_template_refs_only() {
        let mut config = configuration();
        config.mixed_instances_policy = Some(MixedInstancesPolicySpec {
            strategy: Some("capacity-optimized".to_string()),
            base_capacity: Some(25),
            spot_pools: None,
            instance_types: vec!["m5.large".to_string(), "m5a.large".to_string()],
        });

        let wrapped =
            wrap_mixed_instances(GroupConfigRef::LaunchTemplate(template_ref()), &config);
        assert!(matches!(wrapped, GroupConfigRef::MixedInstances { .. }));

        let untouched = wrap_mixed_instances(
            GroupConfigRef::LaunchConfiguration("ig-abc".to_string()),
            &config,
        );
        assert_eq!(
            untouched,
            GroupConfigRef::LaunchConfiguration("ig-abc".to_string())
        );
    }

    #[test]
    fn test_update_needed_on_size_change() {
        let observed = ScalingGroup {
            name: "prod-eks-default-ig1".to_string(),
            min_size: 3,
            max_size: 5,
            subnets: vec!["subnet-1".to_string(), "subnet-2".to_string()],
            launch_template: Some(template_ref()),
            ..Default::default()
        };
        let input = group_input(GroupConfigRef::LaunchTemplate(template_ref()));
        assert!(group_update_needed(&observed, &input));
    }

    #[test]
    fn test_update_not_needed_when_converged() {
        let observed = ScalingGroup {
            name: "prod-eks-default-ig1".to_string(),
            min_size: 3,
            max_size: 6,
            subnets: vec!["subnet-2".to_string(), "subnet-1".to_string()],
            launch_template: Some(template_ref()),
            ..Default::default()
        };
        let input = group_input(GroupConfigRef::LaunchTemplate(template_ref()));
        assert!(!group_update_needed(&observed, &input));
    }

    #[test]
    fn test_update_needed_when_pointer_moves() {
        let observed = ScalingGroup {
            name: "prod-eks-default-ig1".to_string(),
            min_size: 3,
            max_size: 6,
            subnets: vec!["subnet-1".to_string(), "subnet-2".to_string()],
            launch_configuration_name: Some("prod-eks-default-ig1-old".to_string()),
            ..Default::default()
        };
        let input = group_input(GroupConfigRef::LaunchConfiguration(
            "prod-eks-default-ig1-new".to_string(),
        ));
        assert!(group_update_needed(&observed, &input));
    }
}
