// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the controller.
//!
//! Every reconcile receives an `Arc<Context>` bundling the Kubernetes
//! client, the cloud capability handles, the loaded configuration, the
//! worker-bound semaphore, and the per-key failure counters that drive
//! transient-error backoff.

use crate::aws::CloudClients;
use crate::config::ControllerConfig;
use crate::constants::ERROR_BACKOFF_BASE_SECS;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Shared context passed to all reconciles.
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Cloud capability handles (process-wide, cached, concurrent-safe)
    pub cloud: CloudClients,

    /// Loaded controller configuration
    pub config: ControllerConfig,

    /// Bounds concurrent reconciles across distinct keys
    pub workers: Arc<Semaphore>,

    /// Consecutive transient-failure counts per `namespace/name` key
    failures: Mutex<HashMap<String, u32>>,
}

impl Context {
    /// Assemble the context.
    #[must_use]
    pub fn new(client: Client, cloud: CloudClients, config: ControllerConfig) -> Self {
        let workers = Arc::new(Semaphore::new(config.max_workers));
        Self {
            client,
            cloud,
            config,
            workers,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a transient failure for a key and return the backoff to apply:
    /// exponential in the consecutive-failure count, capped at the
    /// configured ceiling.
    pub fn record_failure(&self, key: &str) -> Duration {
        let mut failures = self.failures.lock().expect("failure map poisoned");
        let count = failures.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        backoff_delay(*count, self.config.max_backoff_secs)
    }

    /// Clear the failure count after a successful reconcile.
    pub fn clear_failures(&self, key: &str) {
        self.failures
            .lock()
            .expect("failure map poisoned")
            .remove(key);
    }
}

/// Exponential backoff for the Nth consecutive transient failure, capped.
#[must_use]
pub fn backoff_delay(consecutive_failures: u32, cap_secs: u64) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(16);
    let delay = ERROR_BACKOFF_BASE_SECS.saturating_mul(1_u64 << exponent);
    Duration::from_secs(delay.min(cap_secs))
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
