// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `strategies/crd_strategy.rs`

#[cfg(test)]
mod tests {
    use crate::labels::{K8S_MANAGED_BY, UPGRADE_SCOPE_ANNOTATION};
    use crate::strategies::crd_strategy::{
        classify_status, is_owned_by_scope, normalize_resource_name, render_template,
        resolve_path, ConcurrencyPolicy, UpgradeStatus,
    };
    use kube::core::DynamicObject;
    use serde_json::json;

    #[test]
    fn test_concurrency_policy_parse_defaults_to_forbid() {
        assert_eq!(ConcurrencyPolicy::parse(None), ConcurrencyPolicy::Forbid);
        assert_eq!(
            ConcurrencyPolicy::parse(Some("bogus")),
            ConcurrencyPolicy::Forbid
        );
        assert_eq!(
            ConcurrencyPolicy::parse(Some("Allow")),
            ConcurrencyPolicy::Allow
        );
        assert_eq!(
            ConcurrencyPolicy::parse(Some("replace")),
            ConcurrencyPolicy::Replace
        );
    }

    #[test]
    fn test_resolve_path_walks_nested_documents() {
        let document = json!({"status": {"currentStatus": "completed", "count": 3}});
        assert_eq!(
            resolve_path(&document, "status.currentStatus").as_deref(),
            Some("completed")
        );
        assert_eq!(resolve_path(&document, "status.count").as_deref(), Some("3"));
        assert!(resolve_path(&document, "status.missing").is_none());
    }

    #[test]
    fn test_resolve_path_accepts_wrapped_forms() {
        let document = json!({"status": {"phase": "running"}});
        assert_eq!(
            resolve_path(&document, "{.status.phase}").as_deref(),
            Some("running")
        );
        assert_eq!(
            resolve_path(&document, ".status.phase").as_deref(),
            Some("running")
        );
    }

    #[test]
    fn test_render_template_substitutes_group_fields() {
        let document = json!({
            "metadata": {"name": "ig1"},
            "status": {"activeScalingGroupName": "prod-eks-default-ig1"}
        });
        let template = "spec:\n  asgName: {{ .status.activeScalingGroupName }}\n";
        assert_eq!(
            render_template(template, &document),
            "spec:\n  asgName: prod-eks-default-ig1\n"
        );
    }

    #[test]
    fn test_render_template_blanks_unresolvable_placeholders() {
        let document = json!({"metadata": {"name": "ig1"}});
        assert_eq!(
            render_template("value: {{ .status.missing }}!", &document),
            "value: !"
        );
    }

    #[test]
    fn test_render_template_without_placeholders_is_identity() {
        let document = json!({});
        assert_eq!(render_template("plain: text", &document), "plain: text");
    }

    #[test]
    fn test_normalize_appends_launch_id() {
        assert_eq!(normalize_resource_name("upgrade", "abc123"), "upgrade-abc123");
    }

    #[test]
    fn test_normalize_is_identity_when_suffixed() {
        assert_eq!(
            normalize_resource_name("upgrade-abc123", "abc123"),
            "upgrade-abc123"
        );
    }

    #[test]
    fn test_normalize_falls_back_on_long_names() {
        let long = "a".repeat(70);
        assert_eq!(
            normalize_resource_name(&long, "lt-0abc-4"),
            "instancemgr-lt-0abc-4"
        );
    }

    #[test]
    fn test_classify_status_is_case_insensitive() {
        let document = json!({"status": {"currentStatus": "Completed"}});
        assert_eq!(
            classify_status(&document, "status.currentStatus", "completed", "error"),
            UpgradeStatus::Succeeded
        );
        let document = json!({"status": {"currentStatus": "ERROR"}});
        assert_eq!(
            classify_status(&document, "status.currentStatus", "completed", "error"),
            UpgradeStatus::Failed
        );
    }

    #[test]
    fn test_unset_status_is_active() {
        let document = json!({"spec": {}});
        assert_eq!(
            classify_status(&document, "status.currentStatus", "completed", "error"),
            UpgradeStatus::Active
        );
    }

    fn owned_resource(managed_by: &str, scope: &str) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "upgrademgr.keikoproj.io/v1alpha1",
            "kind": "RollingUpgrade",
            "metadata": {
                "name": "upgrade-abc",
                "namespace": "default",
                "annotations": {
                    K8S_MANAGED_BY: managed_by,
                    UPGRADE_SCOPE_ANNOTATION: scope,
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_ownership_requires_both_annotations() {
        let resource = owned_resource("instance-manager", "prod-eks-default-ig1");
        assert!(is_owned_by_scope(&resource, "prod-eks-default-ig1"));
        assert!(!is_owned_by_scope(&resource, "another-group"));

        let foreign = owned_resource("someone-else", "prod-eks-default-ig1");
        assert!(!is_owned_by_scope(&foreign, "prod-eks-default-ig1"));
    }
}
