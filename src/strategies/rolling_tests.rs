// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `strategies/rolling.rs`

#[cfg(test)]
mod tests {
    use crate::strategies::rolling::{
        resolve_max_unavailable, rolling_update_tick, RollingUpdateRequest,
    };
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use std::collections::HashSet;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn ready(names: &[&str]) -> HashSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_defaults_to_one() {
        assert_eq!(resolve_max_unavailable(None, 5), 1);
    }

    #[test]
    fn test_percentages_round_down() {
        assert_eq!(
            resolve_max_unavailable(Some(&IntOrString::String("30%".to_string())), 5),
            1
        );
        assert_eq!(
            resolve_max_unavailable(Some(&IntOrString::String("50%".to_string())), 5),
            2
        );
    }

    #[test]
    fn test_clamped_to_desired_capacity() {
        assert_eq!(resolve_max_unavailable(Some(&IntOrString::Int(10)), 4), 4);
    }

    #[test]
    fn test_rounded_down_zero_still_progresses() {
        assert_eq!(
            resolve_max_unavailable(Some(&IntOrString::String("10%".to_string())), 3),
            1
        );
    }

    #[test]
    fn test_no_targets_means_done() {
        let request = RollingUpdateRequest {
            all_instances: ids(&["i-1", "i-2"]),
            update_targets: Vec::new(),
            desired_capacity: 2,
            max_unavailable: None,
            ready_instance_ids: ready(&["i-1", "i-2"]),
        };
        let decision = rolling_update_tick(&request);
        assert!(decision.done);
        assert!(decision.terminate.is_empty());
    }

    #[test]
    fn test_terminates_at_most_max_unavailable() {
        let request = RollingUpdateRequest {
            all_instances: ids(&["i-1", "i-2", "i-3", "i-4", "i-5"]),
            update_targets: ids(&["i-1", "i-2", "i-3", "i-4"]),
            desired_capacity: 5,
            max_unavailable: Some(IntOrString::Int(2)),
            ready_instance_ids: ready(&["i-1", "i-2", "i-3", "i-4", "i-5"]),
        };
        let decision = rolling_update_tick(&request);
        assert!(!decision.done);
        assert_eq!(decision.terminate, ids(&["i-1", "i-2"]));
    }

    #[test]
    fn test_waits_while_replacements_not_ready() {
        // Two instances already down; the budget of 2 is spent
        let request = RollingUpdateRequest {
            all_instances: ids(&["i-1", "i-2", "i-3", "i-4", "i-5"]),
            update_targets: ids(&["i-3", "i-4"]),
            desired_capacity: 5,
            max_unavailable: Some(IntOrString::Int(2)),
            ready_instance_ids: ready(&["i-3", "i-4", "i-5"]),
        };
        let decision = rolling_update_tick(&request);
        assert!(!decision.done);
        assert!(decision.terminate.is_empty());
    }

    #[test]
    fn test_bounded_rotation_converges_over_ticks() {
        // Five instances, maxUnavailable=2, four drifted: the concrete
        // scenario from the bounded-rotation contract.
        let mut targets = ids(&["i-1", "i-2", "i-3", "i-4"]);
        let all = ids(&["i-1", "i-2", "i-3", "i-4", "i-5"]);

        // Tick 1: everything ready, terminate first two targets
        let decision = rolling_update_tick(&RollingUpdateRequest {
            all_instances: all.clone(),
            update_targets: targets.clone(),
            desired_capacity: 5,
            max_unavailable: Some(IntOrString::Int(2)),
            ready_instance_ids: ready(&["i-1", "i-2", "i-3", "i-4", "i-5"]),
        });
        assert_eq!(decision.terminate, ids(&["i-1", "i-2"]));
        targets.retain(|id| !decision.terminate.contains(id));

        // Tick 2: replacements i-6/i-7 are ready, two more terminations
        let all = ids(&["i-3", "i-4", "i-5", "i-6", "i-7"]);
        let decision = rolling_update_tick(&RollingUpdateRequest {
            all_instances: all.clone(),
            update_targets: targets.clone(),
            desired_capacity: 5,
            max_unavailable: Some(IntOrString::Int(2)),
            ready_instance_ids: ready(&["i-3", "i-4", "i-5", "i-6", "i-7"]),
        });
        assert_eq!(decision.terminate, ids(&["i-3", "i-4"]));
        targets.retain(|id| !decision.terminate.contains(id));

        // Tick 3: no targets left
        let decision = rolling_update_tick(&RollingUpdateRequest {
            all_instances: ids(&["i-5", "i-6", "i-7", "i-8", "i-9"]),
            update_targets: targets,
            desired_capacity: 5,
            max_unavailable: Some(IntOrString::Int(2)),
            ready_instance_ids: ready(&["i-5", "i-6", "i-7", "i-8", "i-9"]),
        });
        assert!(decision.done);
    }

    #[test]
    fn test_tick_is_idempotent() {
        let request = RollingUpdateRequest {
            all_instances: ids(&["i-1", "i-2", "i-3"]),
            update_targets: ids(&["i-2"]),
            desired_capacity: 3,
            max_unavailable: Some(IntOrString::Int(1)),
            ready_instance_ids: ready(&["i-1", "i-2", "i-3"]),
        };
        assert_eq!(rolling_update_tick(&request), rolling_update_tick(&request));
    }
}
