//! Selection reconciliation
//!
//! Pure planning: diff a desired selection against the committed one and
//! name the store mutations that close the gap. Dispatch and state live in
//! `session`; everything here is testable without a network.

use crate::error::{PickerError, PickerResult};
use crate::types::{CandidateIndex, RecordRef, Selection};
use std::collections::BTreeSet;

/// The store mutations that move `current` to `desired`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Records to associate, resolved through the candidate index
    pub to_add: Vec<RecordRef>,
    /// Records to disassociate, resolved from the committed selection
    pub to_remove: Vec<RecordRef>,
}

impl ReconcilePlan {
    /// True when the selection is already where it should be
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of mutations the plan will dispatch
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

/// Diff `desired` against `current`, resolving additions through `index`
///
/// Additions are labels in `desired` but not in `current`; each must resolve
/// to a record in `index` or the whole call fails with
/// [`PickerError::LookupMiss`] before anything is dispatched. Removals are
/// labels in `current` but not in `desired`, resolved from the selection's
/// own records. An empty `desired` removes everything currently selected.
/// Reconciling a selection against itself yields an empty plan.
pub fn reconcile(
    desired: &BTreeSet<String>,
    current: &Selection,
    index: &CandidateIndex,
) -> PickerResult<ReconcilePlan> {
    let mut to_add = Vec::new();
    for label in desired {
        if current.contains(label) {
            continue;
        }
        let record = index.resolve(label).ok_or_else(|| PickerError::LookupMiss {
            label: label.clone(),
        })?;
        to_add.push(record.clone());
    }

    let to_remove: Vec<RecordRef> = current
        .iter()
        .filter(|record| !desired.contains(&record.label))
        .cloned()
        .collect();

    Ok(ReconcilePlan { to_add, to_remove })
}

/// Which direction a dispatched mutation went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Associate,
    Disassociate,
}

/// What happened to one dispatched mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub kind: MutationKind,
    pub record: RecordRef,
    /// Failure message when the call failed; the error itself was already
    /// logged at the call site
    pub error: Option<String>,
}

impl MutationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-label outcomes of a settled reconcile batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub outcomes: Vec<MutationOutcome>,
}

impl CommitReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(MutationOutcome::succeeded)
    }

    /// Outcomes whose mutation failed
    pub fn failures(&self) -> impl Iterator<Item = &MutationOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// The committed selection after a batch settles
///
/// Successful associations enter the selection and successful
/// disassociations leave it; a failed mutation keeps its label on the side
/// it was on, so the result is `desired` minus failed additions plus failed
/// removals.
pub fn commit_selection(current: &Selection, report: &CommitReport) -> Selection {
    let mut next = current.clone();
    for outcome in &report.outcomes {
        if !outcome.succeeded() {
            continue;
        }
        match outcome.kind {
            MutationKind::Associate => next.insert(outcome.record.clone()),
            MutationKind::Disassociate => {
                next.remove(&outcome.record.label);
            }
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(id: &str, label: &str) -> RecordRef {
        RecordRef::new(id, label)
    }

    fn labels(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn index(records: &[(&str, &str)]) -> CandidateIndex {
        CandidateIndex::new(records.iter().map(|(id, label)| record(id, label)).collect())
    }

    #[test]
    fn reconciling_a_selection_against_itself_is_empty() {
        let current = Selection::from_records([record("1", "Alpha"), record("2", "Beta")]);
        let plan = reconcile(&current.labels(), &current, &index(&[])).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }

    #[test]
    fn pure_addition_resolves_through_the_index() {
        let current = Selection::from_records([record("1", "Alpha")]);
        let idx = index(&[("1", "Alpha"), ("2", "Beta")]);
        let plan = reconcile(&labels(&["Alpha", "Beta"]), &current, &idx).unwrap();

        assert_eq!(plan.to_add, vec![record("2", "Beta")]);
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn pure_removal_resolves_from_the_selection() {
        let current = Selection::from_records([record("1", "Alpha")]);
        let plan = reconcile(&labels(&[]), &current, &index(&[])).unwrap();

        assert!(plan.to_add.is_empty());
        assert_eq!(plan.to_remove, vec![record("1", "Alpha")]);
    }

    #[test]
    fn empty_desired_removes_everything() {
        let current = Selection::from_records([
            record("1", "Alpha"),
            record("2", "Beta"),
            record("3", "Gamma"),
        ]);
        let plan = reconcile(&BTreeSet::new(), &current, &index(&[])).unwrap();
        assert_eq!(plan.to_remove.len(), 3);
    }

    #[test]
    fn unresolvable_label_fails_before_any_mutation() {
        let current = Selection::from_records([record("1", "Alpha")]);
        let idx = index(&[("1", "Alpha")]);
        let result = reconcile(&labels(&["Alpha", "Zeta"]), &current, &idx);

        match result {
            Err(PickerError::LookupMiss { label }) => assert_eq!(label, "Zeta"),
            other => panic!("expected LookupMiss, got {other:?}"),
        }
    }

    #[test]
    fn removal_does_not_consult_the_index() {
        // The candidate index has moved on; removal still works from the
        // selection's own record.
        let current = Selection::from_records([record("1", "Alpha")]);
        let idx = index(&[("9", "Unrelated")]);
        let plan = reconcile(&labels(&[]), &current, &idx).unwrap();
        assert_eq!(plan.to_remove, vec![record("1", "Alpha")]);
    }

    #[test]
    fn commit_keeps_failed_additions_out() {
        let current = Selection::from_records([record("1", "Alpha")]);
        let report = CommitReport {
            outcomes: vec![
                MutationOutcome {
                    kind: MutationKind::Associate,
                    record: record("2", "Beta"),
                    error: None,
                },
                MutationOutcome {
                    kind: MutationKind::Associate,
                    record: record("3", "Gamma"),
                    error: Some("connection reset".to_string()),
                },
            ],
        };

        let next = commit_selection(&current, &report);
        assert!(next.contains("Alpha"));
        assert!(next.contains("Beta"));
        assert!(!next.contains("Gamma"));
        assert!(!report.all_succeeded());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn commit_keeps_failed_removals_in() {
        let current = Selection::from_records([record("1", "Alpha"), record("2", "Beta")]);
        let report = CommitReport {
            outcomes: vec![
                MutationOutcome {
                    kind: MutationKind::Disassociate,
                    record: record("1", "Alpha"),
                    error: None,
                },
                MutationOutcome {
                    kind: MutationKind::Disassociate,
                    record: record("2", "Beta"),
                    error: Some("504".to_string()),
                },
            ],
        };

        let next = commit_selection(&current, &report);
        assert!(!next.contains("Alpha"));
        assert!(next.contains("Beta"));
    }

    proptest! {
        #[test]
        fn self_reconcile_is_always_empty(
            entries in proptest::collection::btree_map("[a-z]{1,6}", "[0-9]{1,4}", 0..8)
        ) {
            let current: Selection = entries
                .iter()
                .map(|(label, id)| RecordRef::new(id.as_str(), label.as_str()))
                .collect();
            let plan = reconcile(&current.labels(), &current, &CandidateIndex::default()).unwrap();
            prop_assert!(plan.is_empty());
        }

        #[test]
        fn plan_partitions_the_label_space(
            desired in proptest::collection::btree_set("[a-d]{1,2}", 0..6),
            committed in proptest::collection::btree_set("[a-d]{1,2}", 0..6),
        ) {
            // Index covers every label in play, selection covers `committed`
            let universe: BTreeSet<String> = desired.union(&committed).cloned().collect();
            let idx = CandidateIndex::new(
                universe.iter().map(|l| RecordRef::new(l.as_str(), l.as_str())).collect(),
            );
            let current: Selection = committed
                .iter()
                .map(|l| RecordRef::new(l.as_str(), l.as_str()))
                .collect();

            let plan = reconcile(&desired, &current, &idx).unwrap();

            for added in &plan.to_add {
                prop_assert!(desired.contains(&added.label));
                prop_assert!(!committed.contains(&added.label));
            }
            for removed in &plan.to_remove {
                prop_assert!(committed.contains(&removed.label));
                prop_assert!(!desired.contains(&removed.label));
            }
            let kept = committed.intersection(&desired).count();
            prop_assert_eq!(plan.to_add.len() + kept, desired.len());
            prop_assert_eq!(plan.to_remove.len() + kept, committed.len());
        }
    }
}
