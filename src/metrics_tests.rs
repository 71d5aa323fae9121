// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `metrics.rs`

#[cfg(test)]
mod tests {
    use crate::metrics::{
        gather_metrics, record_cloud_throttle, record_reconciliation_error,
        record_reconciliation_success,
    };
    use std::time::Duration;

    #[test]
    fn test_gather_exposes_recorded_metrics() {
        record_reconciliation_success(Duration::from_millis(50));
        record_reconciliation_error(Duration::from_millis(75));
        record_cloud_throttle("autoscaling");

        let rendered = gather_metrics().unwrap();
        assert!(rendered.contains("instancemgr_keikoproj_io_reconciliations_total"));
        assert!(rendered.contains("instancemgr_keikoproj_io_reconciliation_duration_seconds"));
        assert!(rendered.contains("instancemgr_keikoproj_io_cloud_throttle_total"));
        assert!(rendered.contains("service=\"autoscaling\""));
    }
}
