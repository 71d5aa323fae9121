// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `provisioning.rs`

#[cfg(test)]
mod tests {
    use crate::aws::api::{CloudError, CloudResult, IdentityApi};
    use crate::aws::types::{InstanceProfile, Role};
    use crate::provisioning::{
        delete_node_identity, ensure_default_role, ensure_node_identity, policy_diff,
        EC2_TRUST_POLICY,
    };
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory double for the IAM capability.
    #[derive(Default)]
    struct FakeIdentity {
        roles: Mutex<BTreeMap<String, Vec<String>>>,
        profiles: Mutex<BTreeMap<String, Vec<String>>>,
        delete_role_failures: Mutex<u32>,
    }

    impl FakeIdentity {
        fn empty() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn arn(name: &str) -> String {
            format!("arn:aws:iam::123456789012:role/{name}")
        }
    }

    #[async_trait]
    impl IdentityApi for FakeIdentity {
        async fn get_role(&self, name: &str) -> CloudResult<Option<Role>> {
            Ok(self.roles.lock().unwrap().get(name).map(|_| Role {
                name: name.to_string(),
                arn: Self::arn(name),
            }))
        }

        async fn create_role(&self, name: &str, _trust_policy: &str) -> CloudResult<Role> {
            let mut roles = self.roles.lock().unwrap();
            if roles.contains_key(name) {
                return Err(CloudError::AlreadyExists(name.to_string()));
            }
            roles.insert(name.to_string(), Vec::new());
            Ok(Role {
                name: name.to_string(),
                arn: Self::arn(name),
            })
        }

        async fn delete_role(&self, name: &str) -> CloudResult<()> {
            let mut failures = self.delete_role_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(CloudError::Api {
                    code: "DeleteConflict".to_string(),
                    message: "policies still detaching".to_string(),
                });
            }
            if self.roles.lock().unwrap().remove(name).is_none() {
                return Err(CloudError::NotFound(name.to_string()));
            }
            Ok(())
        }

        async fn get_instance_profile(&self, name: &str) -> CloudResult<Option<InstanceProfile>> {
            Ok(self
                .profiles
                .lock()
                .unwrap()
                .get(name)
                .map(|roles| InstanceProfile {
                    name: name.to_string(),
                    arn: format!("arn:aws:iam::123456789012:instance-profile/{name}"),
                    roles: roles.clone(),
                }))
        }

        async fn create_instance_profile(&self, name: &str) -> CloudResult<InstanceProfile> {
            let mut profiles = self.profiles.lock().unwrap();
            if profiles.contains_key(name) {
                return Err(CloudError::AlreadyExists(name.to_string()));
            }
            profiles.insert(name.to_string(), Vec::new());
            Ok(InstanceProfile {
                name: name.to_string(),
                arn: format!("arn:aws:iam::123456789012:instance-profile/{name}"),
                roles: Vec::new(),
            })
        }

        async fn delete_instance_profile(&self, name: &str) -> CloudResult<()> {
            if self.profiles.lock().unwrap().remove(name).is_none() {
                return Err(CloudError::NotFound(name.to_string()));
            }
            Ok(())
        }

        async fn add_role_to_instance_profile(
            &self,
            profile: &str,
            role: &str,
        ) -> CloudResult<()> {
            let mut profiles = self.profiles.lock().unwrap();
            let roles = profiles
                .get_mut(profile)
                .ok_or_else(|| CloudError::NotFound(profile.to_string()))?;
            if !roles.is_empty() {
                return Err(CloudError::LimitExceeded(
                    "instance profile already holds a role".to_string(),
                ));
            }
            roles.push(role.to_string());
            Ok(())
        }

        async fn remove_role_from_instance_profile(
            &self,
            profile: &str,
            role: &str,
        ) -> CloudResult<()> {
            let mut profiles = self.profiles.lock().unwrap();
            let roles = profiles
                .get_mut(profile)
                .ok_or_else(|| CloudError::NotFound(profile.to_string()))?;
            roles.retain(|r| r != role);
            Ok(())
        }

        async fn attach_role_policy(&self, role: &str, policy_arn: &str) -> CloudResult<()> {
            let mut roles = self.roles.lock().unwrap();
            let policies = roles
                .get_mut(role)
                .ok_or_else(|| CloudError::NotFound(role.to_string()))?;
            policies.push(policy_arn.to_string());
            Ok(())
        }

        async fn detach_role_policy(&self, role: &str, policy_arn: &str) -> CloudResult<()> {
            let mut roles = self.roles.lock().unwrap();
            let policies = roles
                .get_mut(role)
                .ok_or_else(|| CloudError::NotFound(role.to_string()))?;
            policies.retain(|p| p != policy_arn);
            Ok(())
        }

        async fn list_attached_policies(&self, role: &str) -> CloudResult<Vec<String>> {
            Ok(self
                .roles
                .lock()
                .unwrap()
                .get(role)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn identity_handle(fake: &Arc<FakeIdentity>) -> Arc<dyn IdentityApi> {
        fake.clone()
    }

    #[test]
    fn test_policy_diff_splits_attach_and_detach() {
        let attached = vec!["arn:a".to_string(), "arn:b".to_string()];
        let declared = vec!["arn:b".to_string(), "arn:c".to_string()];
        let (to_attach, to_detach) = policy_diff(&attached, &declared);
        assert_eq!(to_attach, vec!["arn:c".to_string()]);
        assert_eq!(to_detach, vec!["arn:a".to_string()]);
    }

    #[test]
    fn test_policy_diff_converged_is_empty() {
        let set = vec!["arn:a".to_string()];
        let (to_attach, to_detach) = policy_diff(&set, &set);
        assert!(to_attach.is_empty());
        assert!(to_detach.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_creates_role_profile_and_policies() {
        let fake = FakeIdentity::empty();
        let api = identity_handle(&fake);
        let declared = vec!["arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy".to_string()];

        let node = ensure_node_identity(
            &api,
            "ig1-default",
            EC2_TRUST_POLICY,
            &declared,
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(node.role.name, "ig1-default");
        assert_eq!(node.profile.name, "ig1-default");
        assert_eq!(
            fake.profiles.lock().unwrap().get("ig1-default").unwrap(),
            &vec!["ig1-default".to_string()]
        );
        assert_eq!(fake.roles.lock().unwrap().get("ig1-default").unwrap(), &declared);
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent_and_diffs_policies() {
        let fake = FakeIdentity::empty();
        let api = identity_handle(&fake);

        let initial = vec!["arn:old".to_string()];
        ensure_node_identity(&api, "ig1", EC2_TRUST_POLICY, &initial, Duration::ZERO)
            .await
            .unwrap();

        // Second pass with a changed declaration attaches the new policy
        // and detaches the removed one; limit-exceeded on re-attach of the
        // role is ignored.
        let updated = vec!["arn:new".to_string()];
        ensure_node_identity(&api, "ig1", EC2_TRUST_POLICY, &updated, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(fake.roles.lock().unwrap().get("ig1").unwrap(), &updated);
    }

    #[tokio::test]
    async fn test_delete_retries_role_deletion() {
        let fake = FakeIdentity::empty();
        let api = identity_handle(&fake);
        ensure_node_identity(
            &api,
            "ig1",
            EC2_TRUST_POLICY,
            &["arn:a".to_string()],
            Duration::ZERO,
        )
        .await
        .unwrap();

        // First two role deletes race propagation and fail
        *fake.delete_role_failures.lock().unwrap() = 2;

        delete_node_identity(&api, "ig1", 5, Duration::ZERO)
            .await
            .unwrap();

        assert!(fake.roles.lock().unwrap().is_empty());
        assert!(fake.profiles.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_of_absent_identity_is_success() {
        let fake = FakeIdentity::empty();
        let api = identity_handle(&fake);
        delete_node_identity(&api, "never-created", 3, Duration::ZERO)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_default_role_single_policy() {
        let fake = FakeIdentity::empty();
        let api = identity_handle(&fake);

        let role = ensure_default_role(&api, "fargate-default", EC2_TRUST_POLICY, "arn:pol")
            .await
            .unwrap();
        assert_eq!(role.name, "fargate-default");

        // Idempotent: policy is not attached twice
        ensure_default_role(&api, "fargate-default", EC2_TRUST_POLICY, "arn:pol")
            .await
            .unwrap();
        assert_eq!(
            fake.roles.lock().unwrap().get("fargate-default").unwrap(),
            &vec!["arn:pol".to_string()]
        );
    }
}
