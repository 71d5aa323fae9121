// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `aws/types.rs`

#[cfg(test)]
mod tests {
    use crate::aws::types::{ScalingGroup, TemplateReference};

    #[test]
    fn test_template_reference_prefers_direct_over_mixed() {
        let group = ScalingGroup {
            name: "g".to_string(),
            launch_template: Some(TemplateReference {
                id: Some("lt-1".to_string()),
                name: Some("direct".to_string()),
                version: Some("3".to_string()),
            }),
            mixed_instances_template: Some(TemplateReference {
                id: Some("lt-2".to_string()),
                name: Some("mixed".to_string()),
                version: Some("1".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(
            group.template_reference().unwrap().name.as_deref(),
            Some("direct")
        );
    }

    #[test]
    fn test_template_reference_falls_back_to_mixed() {
        let group = ScalingGroup {
            name: "g".to_string(),
            mixed_instances_template: Some(TemplateReference {
                id: Some("lt-2".to_string()),
                name: Some("mixed".to_string()),
                version: Some("1".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(
            group.template_reference().unwrap().name.as_deref(),
            Some("mixed")
        );
    }

    #[test]
    fn test_is_deleting_reads_group_status() {
        let mut group = ScalingGroup::default();
        assert!(!group.is_deleting());
        group.status = Some("Delete in progress".to_string());
        assert!(group.is_deleting());
    }
}
