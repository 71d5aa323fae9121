// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `instancegroup/eks_managed.rs`

#[cfg(test)]
mod tests {
    use super::super::eks_managed::{managed_update_needed, node_group_input};
    use crate::aws::types::NodeGroup;
    use crate::crd::{EksManagedSpec, ManagedConfiguration};
    use std::collections::BTreeMap;

    fn spec(min: i32, max: i32) -> EksManagedSpec {
        EksManagedSpec {
            min_size: min,
            max_size: max,
            configuration: ManagedConfiguration {
                cluster_name: "prod-eks".to_string(),
                instance_types: vec!["m5.large".to_string()],
                subnets: vec!["subnet-1".to_string()],
                ..Default::default()
            },
        }
    }

    fn observed(min: i32, max: i32, desired: i32) -> NodeGroup {
        NodeGroup {
            name: "prod-eks-default-ig1".to_string(),
            status: "ACTIVE".to_string(),
            min_size: min,
            max_size: max,
            desired_size: desired,
            node_role: Some("arn:role".to_string()),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_no_update_when_converged() {
        assert!(!managed_update_needed(&observed(1, 3, 2), &spec(1, 3)));
    }

    #[test]
    fn test_update_on_scaling_change() {
        assert!(managed_update_needed(&observed(1, 3, 2), &spec(2, 3)));
        assert!(managed_update_needed(&observed(1, 3, 2), &spec(1, 4)));
    }

    #[test]
    fn test_update_on_label_change() {
        let mut declared = spec(1, 3);
        declared
            .configuration
            .labels
            .insert("pool".to_string(), "ig1".to_string());
        assert!(managed_update_needed(&observed(1, 3, 2), &declared));
    }

    #[test]
    fn test_input_defaults_desired_to_min_on_create() {
        let input = node_group_input(&spec(2, 6), "ng", "arn:role", None);
        assert_eq!(input.desired_size, 2);
        assert_eq!(input.node_role, "arn:role");
    }

    #[test]
    fn test_input_preserves_observed_desired_within_bounds() {
        let input = node_group_input(&spec(2, 6), "ng", "arn:role", Some(&observed(1, 8, 4)));
        assert_eq!(input.desired_size, 4);

        // Observed desired outside the new bounds is clamped
        let input = node_group_input(&spec(2, 3), "ng", "arn:role", Some(&observed(1, 8, 7)));
        assert_eq!(input.desired_size, 3);
    }
}
