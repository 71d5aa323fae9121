// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Node user-data assembly for self-managed groups.
//!
//! Nodes join the cluster through the EKS bootstrap script baked into the
//! AMI. The user data wires the declared kubelet labels and taints into
//! `--kubelet-extra-args` and appends any raw bootstrap arguments from the
//! spec. The result is base64-encoded, which is also the form drift
//! detection compares.

use crate::crd::{EksConfiguration, NodeTaint};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::BTreeMap;

/// Render kubelet `--node-labels` from the declared label map.
#[must_use]
pub fn format_node_labels(labels: &BTreeMap<String, String>) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    let rendered = labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    Some(format!("--node-labels={rendered}"))
}

/// Render kubelet `--register-with-taints` from the declared taints.
#[must_use]
pub fn format_taints(taints: &[NodeTaint]) -> Option<String> {
    if taints.is_empty() {
        return None;
    }
    let rendered = taints
        .iter()
        .map(|taint| {
            let value = taint.value.as_deref().unwrap_or_default();
            format!("{}={}:{}", taint.key, value, taint.effect)
        })
        .collect::<Vec<_>>()
        .join(",");
    Some(format!("--register-with-taints={rendered}"))
}

/// Assemble the base64-encoded user data for a node.
#[must_use]
pub fn build_user_data(configuration: &EksConfiguration) -> String {
    let mut kubelet_args = Vec::new();
    if let Some(labels) = format_node_labels(&configuration.labels) {
        kubelet_args.push(labels);
    }
    if let Some(taints) = format_taints(&configuration.taints) {
        kubelet_args.push(taints);
    }

    let mut bootstrap = format!("/etc/eks/bootstrap.sh {}", configuration.cluster_name);
    if !kubelet_args.is_empty() {
        bootstrap.push_str(&format!(" --kubelet-extra-args '{}'", kubelet_args.join(" ")));
    }
    if let Some(arguments) = configuration
        .bootstrap_arguments
        .as_deref()
        .filter(|arguments| !arguments.trim().is_empty())
    {
        bootstrap.push(' ');
        bootstrap.push_str(arguments.trim());
    }

    let script = format!("#!/bin/bash\nset -o xtrace\n{bootstrap}\n");
    BASE64.encode(script)
}

#[cfg(test)]
#[path = "userdata_tests.rs"]
mod userdata_tests;
