// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `scaling/launch_template.rs`

#[cfg(test)]
mod tests {
    use crate::aws::api::{CloudError, CloudResult, ComputeApi};
    use crate::aws::types::{
        ConfigurationInput, GroupConfigRef, GroupInstance, LaunchTemplate, LaunchTemplateVersion,
        TemplateReference,
    };
    use crate::scaling::launch_template::LaunchTemplateAdapter;
    use crate::scaling::{DeletionInput, ScalingConfiguration};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    /// In-memory double for the launch-template capability.
    #[derive(Default)]
    struct FakeCompute {
        template: Mutex<Option<LaunchTemplate>>,
        versions: Mutex<Vec<LaunchTemplateVersion>>,
        default_version: Mutex<Option<i64>>,
        clock: Mutex<i64>,
    }

    impl FakeCompute {
        fn empty() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn with_versions(versions: Vec<LaunchTemplateVersion>) -> Arc<Self> {
            let latest = versions.iter().map(|v| v.version).max().unwrap_or(1);
            Arc::new(Self {
                template: Mutex::new(Some(LaunchTemplate {
                    id: "lt-0abc".to_string(),
                    name: "ig".to_string(),
                    latest_version: latest,
                    default_version: latest,
                })),
                versions: Mutex::new(versions),
                default_version: Mutex::new(Some(latest)),
                clock: Mutex::new(1_000),
            })
        }
    }

    #[async_trait]
    impl ComputeApi for FakeCompute {
        async fn describe_launch_template(
            &self,
            name: &str,
        ) -> CloudResult<Option<LaunchTemplate>> {
            Ok(self
                .template
                .lock()
                .unwrap()
                .clone()
                .filter(|template| template.name == name))
        }

        async fn describe_template_versions(
            &self,
            _name: &str,
        ) -> CloudResult<Vec<LaunchTemplateVersion>> {
            Ok(self.versions.lock().unwrap().clone())
        }

        async fn create_launch_template(
            &self,
            input: &ConfigurationInput,
        ) -> CloudResult<LaunchTemplate> {
            let template = LaunchTemplate {
                id: "lt-0abc".to_string(),
                name: input.name.clone(),
                latest_version: 1,
                default_version: 1,
            };
            *self.template.lock().unwrap() = Some(template.clone());
            self.versions.lock().unwrap().push(LaunchTemplateVersion {
                template_id: template.id.clone(),
                template_name: template.name.clone(),
                version: 1,
                created: Utc.timestamp_opt(100, 0).unwrap(),
                payload: input.clone(),
            });
            Ok(template)
        }

        async fn create_template_version(
            &self,
            name: &str,
            input: &ConfigurationInput,
        ) -> CloudResult<LaunchTemplateVersion> {
            let mut versions = self.versions.lock().unwrap();
            let next = versions.iter().map(|v| v.version).max().unwrap_or(0) + 1;
            let mut clock = self.clock.lock().unwrap();
            *clock += 1;
            let version = LaunchTemplateVersion {
                template_id: "lt-0abc".to_string(),
                template_name: name.to_string(),
                version: next,
                created: Utc.timestamp_opt(*clock, 0).unwrap(),
                payload: input.clone(),
            };
            versions.push(version.clone());
            Ok(version)
        }

        async fn set_default_version(&self, _name: &str, version: i64) -> CloudResult<()> {
            *self.default_version.lock().unwrap() = Some(version);
            Ok(())
        }

        async fn delete_template_versions(
            &self,
            _name: &str,
            versions: &[i64],
        ) -> CloudResult<()> {
            self.versions
                .lock()
                .unwrap()
                .retain(|v| !versions.contains(&v.version));
            Ok(())
        }

        async fn delete_launch_template(&self, name: &str) -> CloudResult<()> {
            let mut template = self.template.lock().unwrap();
            if template.is_none() {
                return Err(CloudError::NotFound(name.to_string()));
            }
            *template = None;
            self.versions.lock().unwrap().clear();
            Ok(())
        }
    }

    fn version(number: i64, created_secs: i64, image: &str) -> LaunchTemplateVersion {
        LaunchTemplateVersion {
            template_id: "lt-0abc".to_string(),
            template_name: "ig".to_string(),
            version: number,
            created: Utc.timestamp_opt(created_secs, 0).unwrap(),
            payload: ConfigurationInput {
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
    async fn test_first_create_provisions_the_template() {
        let api = FakeCompute::empty();
        let mut adapter = LaunchTemplateAdapter::new(api.clone(), "ig");
        adapter.discover().await.unwrap();
        assert!(!adapter.provisioned());

        let reference = adapter.create(&input("ami-1")).await.unwrap();
        let GroupConfigRef::LaunchTemplate(reference) = reference else {
            panic!("expected a launch-template reference");
        };
        assert_eq!(reference.name.as_deref(), Some("ig"));
        assert_eq!(reference.version.as_deref(), Some("$Latest"));
        assert!(adapter.provisioned());
        assert_eq!(adapter.latest_version(), Some(1));
    }

    #[tokio::test]
    async fn test_drift_issues_new_version_and_advances_default() {
        let api = FakeCompute::with_versions(vec![version(1, 100, "ami-1")]);
        let mut adapter = LaunchTemplateAdapter::new(api.clone(), "ig");
        adapter.discover().await.unwrap();

        assert!(!adapter.drifted(&input("ami-1")));
        assert!(adapter.drifted(&input("ami-2")));

        adapter.create(&input("ami-2")).await.unwrap();
        assert_eq!(adapter.latest_version(), Some(2));
        assert_eq!(*api.default_version.lock().unwrap(), Some(2));
        assert_eq!(adapter.launch_id().as_deref(), Some("lt-0abc-2"));
    }

    #[tokio::test]
    async fn test_delete_retains_most_recent_versions() {
        let api = FakeCompute::with_versions(vec![
            version(1, 100, "ami-1"),
            version(2, 200, "ami-2"),
            version(3, 300, "ami-3"),
            version(4, 400, "ami-4"),
        ]);
        let mut adapter = LaunchTemplateAdapter::new(api.clone(), "ig");
        adapter.discover().await.unwrap();

        adapter
            .delete(&DeletionInput {
                retain_versions: 2,
                delete_all: false,
            })
            .await
            .unwrap();

        let remaining: Vec<i64> = api
            .versions
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(remaining, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_delete_all_removes_the_template() {
        let api = FakeCompute::with_versions(vec![version(1, 100, "ami-1")]);
        let mut adapter = LaunchTemplateAdapter::new(api.clone(), "ig");
        adapter.discover().await.unwrap();

        adapter
            .delete(&DeletionInput {
                retain_versions: 10,
                delete_all: true,
            })
            .await
            .unwrap();
        assert!(api.template.lock().unwrap().is_none());

        // A second delete sees not-found and still succeeds
        adapter
            .delete(&DeletionInput {
                retain_versions: 10,
                delete_all: true,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rotation_needed_on_version_or_name_mismatch() {
        let api = FakeCompute::with_versions(vec![version(1, 100, "ami-1"), version(2, 200, "ami-2")]);
        let mut adapter = LaunchTemplateAdapter::new(api, "ig");
        adapter.discover().await.unwrap();

        let current = GroupInstance {
            id: "i-1".to_string(),
            launch_template: Some(TemplateReference {
                id: Some("lt-0abc".to_string()),
                name: Some("ig".to_string()),
                version: Some("2".to_string()),
            }),
            ..Default::default()
        };
        let stale_version = GroupInstance {
            id: "i-2".to_string(),
            launch_template: Some(TemplateReference {
                id: Some("lt-0abc".to_string()),
                name: Some("ig".to_string()),
                version: Some("1".to_string()),
            }),
            ..Default::default()
        };
        let foreign_template = GroupInstance {
            id: "i-3".to_string(),
            launch_template: Some(TemplateReference {
                id: Some("lt-0def".to_string()),
                name: Some("other".to_string()),
                version: Some("2".to_string()),
            }),
            ..Default::default()
        };

        assert!(!adapter.rotation_needed(std::slice::from_ref(&current)));
        assert!(adapter.rotation_needed(&[current.clone(), stale_version]));
        assert!(adapter.rotation_needed(&[current, foreign_template]));
    }
}
