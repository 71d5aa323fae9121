// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::ControllerConfig;
    use crate::crd::{CloudTag, EksConfiguration, ValidationError};
    use std::io::Write;

    #[test]
    fn test_defaults_without_a_file() {
        let config = ControllerConfig::load(None).unwrap();
        assert_eq!(config.max_workers, 5);
        assert_eq!(config.spot_recommendation_minutes, 10);
        assert_eq!(config.retained_template_versions, 10);
        assert_eq!(config.retained_launch_configurations, 2);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "maxWorkers: 10\nboundaries:\n  restrictedInstanceTypes:\n    - t2.micro\ndefaults:\n  subnets:\n    - subnet-1"
        )
        .unwrap();

        let config = ControllerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_workers, 10);
        assert_eq!(
            config.boundaries.restricted_instance_types,
            vec!["t2.micro".to_string()]
        );
        assert_eq!(config.defaults.subnets, vec!["subnet-1".to_string()]);
        // Unspecified fields keep their defaults
        assert_eq!(config.spot_recommendation_minutes, 10);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maxWorkers: [not a number").unwrap();
        assert!(ControllerConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_apply_defaults_only_fills_gaps() {
        let mut config = ControllerConfig::default();
        config.defaults.subnets = vec!["subnet-default".to_string()];
        config.defaults.tags = vec![CloudTag {
            key: "team".to_string(),
            value: "platform".to_string(),
        }];

        let mut declared = EksConfiguration {
            cluster_name: "c".to_string(),
            subnets: vec!["subnet-own".to_string()],
            tags: vec![CloudTag {
                key: "team".to_string(),
                value: "apps".to_string(),
            }],
            ..Default::default()
        };
        config.apply_defaults(&mut declared);

        // Declared subnets and tags win
        assert_eq!(declared.subnets, vec!["subnet-own".to_string()]);
        assert_eq!(declared.tags.len(), 1);
        assert_eq!(declared.tags[0].value, "apps");

        let mut empty = EksConfiguration {
            cluster_name: "c".to_string(),
            ..Default::default()
        };
        config.apply_defaults(&mut empty);
        assert_eq!(empty.subnets, vec!["subnet-default".to_string()]);
        assert_eq!(empty.tags.len(), 1);
    }

    #[test]
    fn test_boundaries_reject_restricted_types() {
        let mut config = ControllerConfig::default();
        config.boundaries.restricted_instance_types = vec!["t2.micro".to_string()];
        assert!(config.check_boundaries("m5.large").is_ok());
        assert!(matches!(
            config.check_boundaries("t2.micro"),
            Err(ValidationError::RestrictedInstanceType { .. })
        ));
    }
}
