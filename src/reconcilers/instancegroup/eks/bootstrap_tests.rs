// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `eks/bootstrap.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::instancegroup::eks::bootstrap::{
        remove_role_mapping, upsert_role_mapping, RoleMapping, NODE_USERNAME,
    };

    const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/prod-eks-default-ig1";

    #[test]
    fn test_upsert_into_empty_document() {
        let updated = upsert_role_mapping("", ROLE_ARN).unwrap().unwrap();
        let mappings: Vec<RoleMapping> = serde_yaml::from_str(&updated).unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].rolearn, ROLE_ARN);
        assert_eq!(mappings[0].username, NODE_USERNAME);
        assert_eq!(
            mappings[0].groups,
            vec!["system:bootstrappers".to_string(), "system:nodes".to_string()]
        );
    }

    #[test]
    fn test_upsert_preserves_existing_mappings() {
        let existing = serde_yaml::to_string(&vec![RoleMapping::node("arn:other")]).unwrap();
        let updated = upsert_role_mapping(&existing, ROLE_ARN).unwrap().unwrap();
        let mappings: Vec<RoleMapping> = serde_yaml::from_str(&updated).unwrap();
        assert_eq!(mappings.len(), 2);
        assert!(mappings.iter().any(|m| m.rolearn == "arn:other"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let existing = serde_yaml::to_string(&vec![RoleMapping::node(ROLE_ARN)]).unwrap();
        assert!(upsert_role_mapping(&existing, ROLE_ARN).unwrap().is_none());
    }

    #[test]
    fn test_remove_deletes_only_the_target() {
        let existing = serde_yaml::to_string(&vec![
            RoleMapping::node(ROLE_ARN),
            RoleMapping::node("arn:other"),
        ])
        .unwrap();
        let updated = remove_role_mapping(&existing, ROLE_ARN).unwrap().unwrap();
        let mappings: Vec<RoleMapping> = serde_yaml::from_str(&updated).unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].rolearn, "arn:other");
    }

    #[test]
    fn test_remove_of_unmapped_role_is_noop() {
        let existing = serde_yaml::to_string(&vec![RoleMapping::node("arn:other")]).unwrap();
        assert!(remove_role_mapping(&existing, ROLE_ARN).unwrap().is_none());
        assert!(remove_role_mapping("", ROLE_ARN).unwrap().is_none());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(upsert_role_mapping("not: [valid", ROLE_ARN).is_err());
    }
}
