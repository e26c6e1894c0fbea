//! # Reconciliation Diff
//!
//! Turns the previous and desired track id of one provider into the ordered
//! playlist mutations that move the playlist from one to the other.
//!
//! ```text
//! previous  desired   plan
//! None      None      Unchanged
//! None      X         Add X
//! X         None      Remove X
//! X         X         Unchanged
//! X         Y         Replace: remove X, then add Y
//! ```

use serde::Serialize;

/// Previous and desired track id of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationDiff {
    pub previous: Option<String>,
    pub desired: Option<String>,
}

impl ReconciliationDiff {
    pub fn new(previous: Option<String>, desired: Option<String>) -> Self {
        Self { previous, desired }
    }

    pub fn plan(&self) -> ReconciliationPlan {
        match (&self.previous, &self.desired) {
            (None, None) => ReconciliationPlan::Unchanged,
            (Some(previous), Some(desired)) if previous == desired => {
                ReconciliationPlan::Unchanged
            }
            (None, Some(desired)) => ReconciliationPlan::Add {
                desired: desired.clone(),
            },
            (Some(previous), None) => ReconciliationPlan::Remove {
                previous: previous.clone(),
            },
            (Some(previous), Some(desired)) => ReconciliationPlan::Replace {
                previous: previous.clone(),
                desired: desired.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconciliationPlan {
    Unchanged,
    Add { desired: String },
    Remove { previous: String },
    Replace { previous: String, desired: String },
}

impl ReconciliationPlan {
    /// Mutations in execution order. Removal always precedes addition.
    pub fn steps(&self) -> Vec<MembershipStep> {
        match self {
            ReconciliationPlan::Unchanged => Vec::new(),
            ReconciliationPlan::Add { desired } => {
                vec![MembershipStep::EnsurePresent(desired.clone())]
            }
            ReconciliationPlan::Remove { previous } => {
                vec![MembershipStep::EnsureAbsent(previous.clone())]
            }
            ReconciliationPlan::Replace { previous, desired } => vec![
                MembershipStep::EnsureAbsent(previous.clone()),
                MembershipStep::EnsurePresent(desired.clone()),
            ],
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, ReconciliationPlan::Unchanged)
    }
}

/// One idempotent playlist mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "track_id", rename_all = "snake_case")]
pub enum MembershipStep {
    EnsurePresent(String),
    EnsureAbsent(String),
}

impl MembershipStep {
    pub fn track_id(&self) -> &str {
        match self {
            MembershipStep::EnsurePresent(id) | MembershipStep::EnsureAbsent(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(previous: Option<&str>, desired: Option<&str>) -> ReconciliationPlan {
        ReconciliationDiff::new(previous.map(String::from), desired.map(String::from)).plan()
    }

    #[test]
    fn test_truth_table() {
        assert_eq!(plan(None, None), ReconciliationPlan::Unchanged);
        assert_eq!(
            plan(None, Some("x")),
            ReconciliationPlan::Add {
                desired: "x".into()
            }
        );
        assert_eq!(
            plan(Some("x"), None),
            ReconciliationPlan::Remove {
                previous: "x".into()
            }
        );
        assert_eq!(plan(Some("x"), Some("x")), ReconciliationPlan::Unchanged);
        assert_eq!(
            plan(Some("x"), Some("y")),
            ReconciliationPlan::Replace {
                previous: "x".into(),
                desired: "y".into()
            }
        );
    }

    #[test]
    fn test_replace_removes_before_adding() {
        let steps = plan(Some("v1"), Some("v2")).steps();
        assert_eq!(
            steps,
            vec![
                MembershipStep::EnsureAbsent("v1".into()),
                MembershipStep::EnsurePresent("v2".into()),
            ]
        );
    }

    #[test]
    fn test_unchanged_has_no_steps() {
        assert!(plan(Some("x"), Some("x")).steps().is_empty());
        assert!(plan(None, None).is_unchanged());
    }

    #[test]
    fn test_plan_serialization() {
        let json = serde_json::to_value(plan(None, Some("v1"))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "add", "desired": "v1"}));

        let step = serde_json::to_value(MembershipStep::EnsureAbsent("v1".into())).unwrap();
        assert_eq!(step, serde_json::json!({"op": "ensure_absent", "track_id": "v1"}));
    }
}
