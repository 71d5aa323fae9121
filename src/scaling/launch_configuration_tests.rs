// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `scaling/launch_configuration.rs`

#[cfg(test)]
mod tests {
    use crate::aws::api::{CloudError, CloudResult, ScalingApi};
    use crate::aws::types::{
        ConfigurationInput, GroupConfigRef, GroupInstance, LaunchConfiguration,
        LifecycleHookInput, ScalingGroup, ScalingGroupInput,
    };
    use crate::scaling::launch_configuration::LaunchConfigurationAdapter;
    use crate::scaling::{DeletionInput, ScalingConfiguration};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    /// In-memory double for the Auto Scaling capability.
    #[derive(Default)]
    struct FakeScaling {
        configurations: Mutex<Vec<LaunchConfiguration>>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeScaling {
        fn with_configurations(configs: Vec<LaunchConfiguration>) -> Arc<Self> {
            Arc::new(Self {
                configurations: Mutex::new(configs),
                deleted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ScalingApi for FakeScaling {
        async fn describe_scaling_groups(&self) -> CloudResult<Vec<ScalingGroup>> {
            Ok(Vec::new())
        }

        async fn create_scaling_group(&self, _input: &ScalingGroupInput) -> CloudResult<()> {
            Ok(())
        }

        async fn update_scaling_group(&self, _input: &ScalingGroupInput) -> CloudResult<()> {
            Ok(())
        }

        async fn update_group_tags(
            &self,
            _group: &str,
            _tags: &[(String, String, bool)],
        ) -> CloudResult<()> {
            Ok(())
        }

        async fn delete_scaling_group(&self, _name: &str) -> CloudResult<()> {
            Ok(())
        }

        async fn terminate_instance(&self, _instance_id: &str) -> CloudResult<()> {
            Ok(())
        }

        async fn describe_launch_configurations(
            &self,
            prefix: &str,
        ) -> CloudResult<Vec<LaunchConfiguration>> {
            Ok(self
                .configurations
                .lock()
                .unwrap()
                .iter()
                .filter(|config| config.name.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn create_launch_configuration(
            &self,
            input: &ConfigurationInput,
        ) -> CloudResult<()> {
            let mut configurations = self.configurations.lock().unwrap();
            if configurations.iter().any(|c| c.name == input.name) {
                return Err(CloudError::AlreadyExists(input.name.clone()));
            }
            configurations.push(LaunchConfiguration {
                name: input.name.clone(),
                created: Utc::now(),
                payload: input.clone(),
            });
            Ok(())
        }

        async fn delete_launch_configuration(&self, name: &str) -> CloudResult<()> {
            let mut configurations = self.configurations.lock().unwrap();
            let before = configurations.len();
            configurations.retain(|config| config.name != name);
            if configurations.len() == before {
                return Err(CloudError::NotFound(name.to_string()));
            }
            self.deleted.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn put_lifecycle_hook(
            &self,
            _group: &str,
            _hook: &LifecycleHookInput,
        ) -> CloudResult<()> {
            Ok(())
        }

        async fn describe_lifecycle_hooks(&self, _group: &str) -> CloudResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn delete_lifecycle_hook(&self, _group: &str, _hook: &str) -> CloudResult<()> {
            Ok(())
        }

        async fn suspend_processes(&self, _group: &str, _processes: &[String]) -> CloudResult<()> {
            Ok(())
        }

        async fn resume_processes(&self, _group: &str, _processes: &[String]) -> CloudResult<()> {
            Ok(())
        }
    }

    fn configuration(name: &str, created_secs: i64, image: &str) -> LaunchConfiguration {
        LaunchConfiguration {
            name: name.to_string(),
            created: Utc.timestamp_opt(created_secs, 0).unwrap(),
            payload: ConfigurationInput {
                name: name.to_string(),
                image_id: image.to_string(),
                instance_type: "m5.large".to_string(),
                ..Default::default()
            },
        }
    }

    fn input(image: &str) -> ConfigurationInput {
        ConfigurationInput {
            image_id: image.to_string(),
            instance_type: "m5.large".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_discover_selects_attached_target() {
        let api = FakeScaling::with_configurations(vec![
            configuration("ig-a", 100, "ami-1"),
            configuration("ig-b", 200, "ami-2"),
        ]);
        let mut adapter =
            LaunchConfigurationAdapter::new(api, "ig", Some("ig-b".to_string()));
        adapter.discover().await.unwrap();
        assert!(adapter.provisioned());
        assert_eq!(adapter.name().as_deref(), Some("ig-b"));
        assert_eq!(adapter.launch_id().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_missing_target_counts_as_drift() {
        let api = FakeScaling::with_configurations(Vec::new());
        let mut adapter = LaunchConfigurationAdapter::new(api, "ig", None);
        adapter.discover().await.unwrap();
        assert!(!adapter.provisioned());
        assert!(adapter.drifted(&input("ami-1")));
    }

    #[tokio::test]
    async fn test_unchanged_payload_does_not_drift() {
        let api = FakeScaling::with_configurations(vec![configuration("ig-a", 100, "ami-1")]);
        let mut adapter =
            LaunchConfigurationAdapter::new(api, "ig", Some("ig-a".to_string()));
        adapter.discover().await.unwrap();
        let mut current = input("ami-1");
        current.name = "ig-a".to_string();
        assert!(!adapter.drifted(&current));
        assert!(adapter.drifted(&input("ami-2")));
    }

    #[tokio::test]
    async fn test_create_uses_deterministic_suffix() {
        let api = FakeScaling::with_configurations(Vec::new());
        let mut adapter = LaunchConfigurationAdapter::new(api.clone(), "ig", None);
        adapter.discover().await.unwrap();

        let reference = adapter.create(&input("ami-1")).await.unwrap();
        let GroupConfigRef::LaunchConfiguration(name) = reference else {
            panic!("expected a launch-configuration reference");
        };
        assert!(name.starts_with("ig-"));

        // Same input creates the same name; already-exists is success
        let again = adapter.create(&input("ami-1")).await.unwrap();
        assert_eq!(again, GroupConfigRef::LaunchConfiguration(name));
    }

    #[tokio::test]
    async fn test_delete_retains_most_recent() {
        let api = FakeScaling::with_configurations(vec![
            configuration("ig-old", 100, "ami-1"),
            configuration("ig-mid", 200, "ami-2"),
            configuration("ig-new", 300, "ami-3"),
        ]);
        let mut adapter =
            LaunchConfigurationAdapter::new(api.clone(), "ig", Some("ig-new".to_string()));
        adapter.discover().await.unwrap();

        adapter
            .delete(&DeletionInput {
                retain_versions: 2,
                delete_all: false,
            })
            .await
            .unwrap();

        assert_eq!(*api.deleted.lock().unwrap(), vec!["ig-old".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_all_removes_every_prefix_match() {
        let api = FakeScaling::with_configurations(vec![
            configuration("ig-old", 100, "ami-1"),
            configuration("ig-new", 300, "ami-3"),
        ]);
        let mut adapter =
            LaunchConfigurationAdapter::new(api.clone(), "ig", Some("ig-new".to_string()));
        adapter.discover().await.unwrap();

        adapter
            .delete(&DeletionInput {
                retain_versions: 2,
                delete_all: true,
            })
            .await
            .unwrap();

        assert!(api.configurations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rotation_needed_for_mismatched_instances() {
        let api = FakeScaling::with_configurations(vec![configuration("ig-new", 300, "ami-3")]);
        let mut adapter =
            LaunchConfigurationAdapter::new(api, "ig", Some("ig-new".to_string()));
        adapter.discover().await.unwrap();

        let current = GroupInstance {
            id: "i-1".to_string(),
            launch_configuration_name: Some("ig-new".to_string()),
            ..Default::default()
        };
        let stale = GroupInstance {
            id: "i-2".to_string(),
            launch_configuration_name: Some("ig-old".to_string()),
            ..Default::default()
        };

        assert!(!adapter.rotation_needed(std::slice::from_ref(&current)));
        assert!(adapter.rotation_needed(&[current, stale]));
    }
}
