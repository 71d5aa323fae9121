// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared types for the instance-group reconcilers.

use crate::crd::InstanceGroupStatus;
use crate::events::EventKind;
use crate::reconcilers::state::ReconcileState;
use std::collections::BTreeMap;

/// What a provisioner handler decided for one reconcile tick.
///
/// The orchestrator writes the status, publishes the events, and maps the
/// state onto a requeue policy.
#[derive(Clone, Debug)]
pub struct ReconcileOutcome {
    /// The derived reconcile state
    pub state: ReconcileState,
    /// Status to write back
    pub status: InstanceGroupStatus,
    /// Events to publish, with their key/value payloads
    pub events: Vec<(EventKind, BTreeMap<String, String>)>,
}

impl ReconcileOutcome {
    /// An outcome carrying forward a status with a new state.
    #[must_use]
    pub fn new(state: ReconcileState, mut status: InstanceGroupStatus) -> Self {
        status.current_state = Some(state.to_string());
        Self {
            state,
            status,
            events: Vec::new(),
        }
    }

    /// Attach an event to publish.
    #[must_use]
    pub fn with_event(mut self, kind: EventKind, payload: BTreeMap<String, String>) -> Self {
        self.events.push((kind, payload));
        self
    }
}
