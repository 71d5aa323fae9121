// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::finalizers::{with_finalizer, without_finalizer};

    const FINALIZER: &str = "instancemgr.keikoproj.io/instancegroup-finalizer";

    #[test]
    fn test_with_finalizer_appends_when_absent() {
        let current = vec!["other/finalizer".to_string()];
        let updated = with_finalizer(&current, FINALIZER).unwrap();
        assert_eq!(
            updated,
            vec!["other/finalizer".to_string(), FINALIZER.to_string()]
        );
    }

    #[test]
    fn test_with_finalizer_is_none_when_present() {
        let current = vec![FINALIZER.to_string()];
        assert!(with_finalizer(&current, FINALIZER).is_none());
    }

    #[test]
    fn test_without_finalizer_removes_only_the_target() {
        let current = vec![FINALIZER.to_string(), "other/finalizer".to_string()];
        let updated = without_finalizer(&current, FINALIZER).unwrap();
        assert_eq!(updated, vec!["other/finalizer".to_string()]);
    }

    #[test]
    fn test_without_finalizer_is_none_when_absent() {
        let current = vec!["other/finalizer".to_string()];
        assert!(without_finalizer(&current, FINALIZER).is_none());
    }
}
