// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for InstanceGroup resources.
//!
//! The finalizer is set before the first provisioning action and removed
//! only after the group reaches terminal `Deleted` — cloud teardown must
//! finish before Kubernetes garbage-collects the object. Unlike the stock
//! finalizer helper, removal here is an explicit reconciler decision, not
//! a cleanup callback.

use anyhow::{Context, Result};
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use tracing::{debug, info};

/// The finalizer list with one entry added, or `None` when already present.
#[must_use]
pub fn with_finalizer(current: &[String], finalizer: &str) -> Option<Vec<String>> {
    if current.iter().any(|f| f == finalizer) {
        return None;
    }
    let mut updated = current.to_vec();
    updated.push(finalizer.to_string());
    Some(updated)
}

/// The finalizer list with one entry removed, or `None` when absent.
#[must_use]
pub fn without_finalizer(current: &[String], finalizer: &str) -> Option<Vec<String>> {
    if !current.iter().any(|f| f == finalizer) {
        return None;
    }
    Some(
        current
            .iter()
            .filter(|f| f.as_str() != finalizer)
            .cloned()
            .collect(),
    )
}

/// Add the finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the metadata patch fails.
pub async fn ensure_finalizer<K>(client: &Client, resource: &K, finalizer: &str) -> Result<()>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug,
{
    let Some(finalizers) = with_finalizer(resource.finalizers(), finalizer) else {
        return Ok(());
    };

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<K> = Api::namespaced(client.clone(), &namespace);

    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("adding finalizer to {namespace}/{name}"))?;

    info!(resource = %name, namespace = %namespace, "Added finalizer");
    Ok(())
}

/// Remove the finalizer from a resource, releasing it for garbage
/// collection.
///
/// # Errors
///
/// Returns an error if the metadata patch fails.
pub async fn remove_finalizer<K>(client: &Client, resource: &K, finalizer: &str) -> Result<()>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug,
{
    let Some(finalizers) = without_finalizer(resource.finalizers(), finalizer) else {
        debug!(resource = %resource.name_any(), "Finalizer already absent");
        return Ok(());
    };

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<K> = Api::namespaced(client.clone(), &namespace);

    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("removing finalizer from {namespace}/{name}"))?;

    info!(resource = %name, namespace = %namespace, "Removed finalizer");
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
