// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `scaling/mod.rs`

#[cfg(test)]
mod tests {
    use crate::aws::types::{BlockDevice, ConfigurationInput, ScalingGroup, TemplateReference};
    use crate::crd::ScalingConfigKind;
    use crate::scaling::{
        config_suffix, kind_from_observation, launch_id_from_config_name, payload_drifted,
        template_launch_id,
    };

    fn base_input() -> ConfigurationInput {
        ConfigurationInput {
            name: "prod-eks-default-ig1".to_string(),
            image_id: "ami-123".to_string(),
            instance_type: "m5.large".to_string(),
            key_name: Some("ops".to_string()),
            security_groups: vec!["sg-1".to_string(), "sg-2".to_string()],
            user_data: "dXNlcmRhdGE=".to_string(),
            instance_profile_arn: Some("arn:aws:iam::1:instance-profile/p".to_string()),
            block_devices: vec![BlockDevice {
                device_name: "/dev/xvda".to_string(),
                volume_type: "gp3".to_string(),
                size: 64,
                iops: None,
                throughput: None,
                snapshot_id: None,
                delete_on_termination: Some(true),
                encrypted: Some(true),
            }],
            spot_price: None,
            license_specifications: vec![],
            placement: None,
            metadata_options: None,
        }
    }

    #[test]
    fn test_equal_payloads_do_not_drift() {
        assert!(!payload_drifted(&base_input(), &base_input()));
    }

    #[test]
    fn test_image_change_drifts() {
        let mut observed = base_input();
        observed.image_id = "ami-456".to_string();
        assert!(payload_drifted(&observed, &base_input()));
    }

    #[test]
    fn test_security_group_order_is_ignored() {
        let mut observed = base_input();
        observed.security_groups = vec!["sg-2".to_string(), "sg-1".to_string()];
        assert!(!payload_drifted(&observed, &base_input()));
    }

    #[test]
    fn test_block_device_order_is_normalized_by_device_name() {
        let second = BlockDevice {
            device_name: "/dev/xvdb".to_string(),
            volume_type: "gp2".to_string(),
            size: 100,
            iops: None,
            throughput: None,
            snapshot_id: None,
            delete_on_termination: None,
            encrypted: None,
        };
        let mut a = base_input();
        a.block_devices.push(second.clone());
        let mut b = base_input();
        b.block_devices.insert(0, second);
        assert!(!payload_drifted(&a, &b));
    }

    #[test]
    fn test_license_order_is_normalized() {
        let mut a = base_input();
        a.license_specifications = vec!["arn:b".to_string(), "arn:a".to_string()];
        let mut b = base_input();
        b.license_specifications = vec!["arn:a".to_string(), "arn:b".to_string()];
        assert!(!payload_drifted(&a, &b));
    }

    #[test]
    fn test_empty_and_absent_optionals_are_equal() {
        let mut observed = base_input();
        observed.spot_price = Some(String::new());
        let mut input = base_input();
        input.spot_price = None;
        assert!(!payload_drifted(&observed, &input));
    }

    #[test]
    fn test_drift_check_is_idempotent() {
        let mut observed = base_input();
        observed.user_data = "b3RoZXI=".to_string();
        let input = base_input();
        let first = payload_drifted(&observed, &input);
        let second = payload_drifted(&observed, &input);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn test_config_suffix_is_deterministic() {
        assert_eq!(config_suffix(&base_input()), config_suffix(&base_input()));
    }

    #[test]
    fn test_config_suffix_changes_with_drift_fields() {
        let mut changed = base_input();
        changed.image_id = "ami-456".to_string();
        assert_ne!(config_suffix(&base_input()), config_suffix(&changed));
    }

    #[test]
    fn test_config_suffix_changes_with_block_device_details() {
        // Any block-device field that counts as drift must also rename the
        // configuration, or the stale name swallows the new create
        let base = base_input();

        let mut iops = base.clone();
        iops.block_devices[0].iops = Some(4000);
        assert!(payload_drifted(&base, &iops));
        assert_ne!(config_suffix(&base), config_suffix(&iops));

        let mut encrypted = base.clone();
        encrypted.block_devices[0].encrypted = Some(false);
        assert!(payload_drifted(&base, &encrypted));
        assert_ne!(config_suffix(&base), config_suffix(&encrypted));

        let mut throughput = base.clone();
        throughput.block_devices[0].throughput = Some(250);
        assert!(payload_drifted(&base, &throughput));
        assert_ne!(config_suffix(&base), config_suffix(&throughput));

        let mut snapshot = base.clone();
        snapshot.block_devices[0].snapshot_id = Some("snap-1".to_string());
        assert!(payload_drifted(&base, &snapshot));
        assert_ne!(config_suffix(&base), config_suffix(&snapshot));

        let mut termination = base.clone();
        termination.block_devices[0].delete_on_termination = None;
        assert!(payload_drifted(&base, &termination));
        assert_ne!(config_suffix(&base), config_suffix(&termination));
    }

    #[test]
    fn test_config_suffix_ignores_block_device_order() {
        let second = BlockDevice {
            device_name: "/dev/xvdb".to_string(),
            volume_type: "gp2".to_string(),
            size: 100,
            iops: None,
            throughput: None,
            snapshot_id: None,
            delete_on_termination: None,
            encrypted: None,
        };
        let mut a = base_input();
        a.block_devices.push(second.clone());
        let mut b = base_input();
        b.block_devices.insert(0, second);
        // Order-only differences are not drift, so the name must not move
        assert!(!payload_drifted(&a, &b));
        assert_eq!(config_suffix(&a), config_suffix(&b));
    }

    #[test]
    fn test_config_suffix_length() {
        assert_eq!(config_suffix(&base_input()).len(), 12);
    }

    #[test]
    fn test_launch_id_from_config_name_takes_last_segment() {
        assert_eq!(
            launch_id_from_config_name("prod-eks-default-ig1-abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_template_launch_id_format() {
        assert_eq!(template_launch_id("lt-0abc", 4), "lt-0abc-4");
    }

    #[test]
    fn test_kind_from_observation_prefers_configuration() {
        let group = ScalingGroup {
            launch_configuration_name: Some("prod-eks-default-ig1-abc".to_string()),
            ..Default::default()
        };
        assert_eq!(
            kind_from_observation(Some(&group)),
            Some(ScalingConfigKind::LaunchConfiguration)
        );
    }

    #[test]
    fn test_kind_from_observation_detects_templates() {
        let group = ScalingGroup {
            launch_template: Some(TemplateReference {
                id: Some("lt-1".to_string()),
                name: Some("prod-eks-default-ig1".to_string()),
                version: Some("$Latest".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(
            kind_from_observation(Some(&group)),
            Some(ScalingConfigKind::LaunchTemplate)
        );
    }

    #[test]
    fn test_kind_from_observation_none_without_group() {
        assert_eq!(kind_from_observation(None), None);
    }
}
