// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster event publishing and spot-recommendation lookup.
//!
//! Events serve two audiences: users watching `kubectl describe`, and
//! machines — spot recommendations arrive as cluster events with reason
//! `SpotRecommendationGiven` whose message body is a small JSON payload.
//! The JSON-encoded message map is the wire form for both directions.

use crate::constants::{
    API_GROUP_VERSION, CONTROLLER_NAME, KIND_INSTANCE_GROUP, SPOT_RECOMMENDATION_REASON,
};
use crate::crd::InstanceGroup;
use crate::reconcilers::pagination::list_all_paginated;
use anyhow::{Context as AnyhowContext, Result};
use chrono::{Duration, Utc};
use k8s_openapi::api::core::v1::{Event, EventSource, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta, Time};
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Significant transitions published as cluster events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// The group's cloud resources were created
    InstanceGroupCreated,
    /// The group's cloud resources were deleted
    InstanceGroupDeleted,
    /// All nodes in the group report Ready
    NodesReady,
    /// One or more nodes stopped reporting Ready
    NodesNotReady,
    /// The upgrade strategy reported failure
    InstanceGroupUpgradeFailed,
}

impl EventKind {
    /// The event reason string.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            EventKind::InstanceGroupCreated => "InstanceGroupCreated",
            EventKind::InstanceGroupDeleted => "InstanceGroupDeleted",
            EventKind::NodesReady => "NodesReady",
            EventKind::NodesNotReady => "NodesNotReady",
            EventKind::InstanceGroupUpgradeFailed => "InstanceGroupUpgradeFailed",
        }
    }

    /// The event level: `Warning` for failures, `Normal` otherwise.
    #[must_use]
    pub fn level(&self) -> &'static str {
        match self {
            EventKind::NodesNotReady | EventKind::InstanceGroupUpgradeFailed => "Warning",
            _ => "Normal",
        }
    }
}

/// Publish a cluster event against the group's involved-object reference.
///
/// The message is the JSON-encoded key/value map so downstream tooling can
/// parse it.
///
/// # Errors
///
/// Returns an error if the event cannot be created.
pub async fn publish(
    client: &Client,
    group: &InstanceGroup,
    kind: EventKind,
    payload: &BTreeMap<String, String>,
) -> Result<()> {
    let namespace = group.namespace().unwrap_or_else(|| "default".to_string());
    let name = group.name_any();
    let now = Utc::now();

    let event = Event {
        metadata: ObjectMeta {
            name: Some(format!("{name}.{:x}", now.timestamp_micros())),
            namespace: Some(namespace.clone()),
            ..Default::default()
        },
        involved_object: ObjectReference {
            api_version: Some(API_GROUP_VERSION.to_string()),
            kind: Some(KIND_INSTANCE_GROUP.to_string()),
            name: Some(name.clone()),
            namespace: Some(namespace.clone()),
            uid: group.metadata.uid.clone(),
            ..Default::default()
        },
        reason: Some(kind.reason().to_string()),
        message: Some(serde_json::to_string(payload).context("encoding event payload")?),
        type_: Some(kind.level().to_string()),
        source: Some(EventSource {
            component: Some(CONTROLLER_NAME.to_string()),
            ..Default::default()
        }),
        first_timestamp: Some(Time(now)),
        last_timestamp: Some(Time(now)),
        event_time: Some(MicroTime(now)),
        count: Some(1),
        ..Default::default()
    };

    let api: Api<Event> = Api::namespaced(client.clone(), &namespace);
    api.create(&PostParams::default(), &event)
        .await
        .with_context(|| format!("publishing {} event for {namespace}/{name}", kind.reason()))?;
    debug!(reason = kind.reason(), group = %name, "Published cluster event");
    Ok(())
}

/// The machine-readable body of a spot-recommendation event.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpotRecommendation {
    /// Payload schema version
    pub api_version: String,
    /// Recommended maximum spot price
    pub spot_price: String,
    /// Whether the group should request spot capacity at all
    pub use_spot: bool,
}

/// Pick the freshest recommendation within the window from raw events.
///
/// Events are matched on reason and involved-object name before this is
/// called; unparseable bodies are skipped with a warning.
#[must_use]
pub fn freshest_recommendation(
    events: &[Event],
    now: chrono::DateTime<Utc>,
    window: Duration,
) -> Option<SpotRecommendation> {
    let mut dated: Vec<(chrono::DateTime<Utc>, SpotRecommendation)> = events
        .iter()
        .filter_map(|event| {
            let timestamp = event.last_timestamp.as_ref().map(|t| t.0)?;
            let message = event.message.as_deref()?;
            match serde_json::from_str::<SpotRecommendation>(message) {
                Ok(recommendation) => Some((timestamp, recommendation)),
                Err(err) => {
                    warn!(error = %err, "Skipping unparseable spot-recommendation event");
                    None
                }
            }
        })
        .collect();

    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated
        .into_iter()
        .find(|(timestamp, _)| now.signed_duration_since(*timestamp) <= window)
        .map(|(_, recommendation)| recommendation)
}

/// Look up the freshest spot recommendation for a group.
///
/// Scans cluster events with reason `SpotRecommendationGiven` whose
/// involved object is the group, and returns the most recent one inside
/// the freshness window.
///
/// # Errors
///
/// Returns an error if the event list cannot be fetched.
pub async fn get_spot_recommendation(
    client: &Client,
    namespace: &str,
    group_name: &str,
    window_minutes: i64,
) -> Result<Option<SpotRecommendation>> {
    let api: Api<Event> = Api::namespaced(client.clone(), namespace);
    let params = ListParams::default().fields(&format!(
        "reason={SPOT_RECOMMENDATION_REASON},involvedObject.name={group_name}"
    ));
    let events = list_all_paginated(&api, params)
        .await
        .with_context(|| format!("listing spot-recommendation events for {group_name}"))?;

    Ok(freshest_recommendation(
        &events,
        Utc::now(),
        Duration::minutes(window_minutes),
    ))
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
