//! Property-based tests for cross-reference paths and dependency ordering.
//!
//! Uses proptest to generate random paths and random dependency facts in random
//! insertion orders, then verify the laws hold.

use proptest::prelude::*;
use std::collections::HashSet;
use ydl::dependency_queue::DependencyQueue;
use ydl::reference::{Path, Segment, Syntax};

// ===========================================================================
// Generators
// ===========================================================================

/// Keys as they appear in documents: no slashes, no surrounding whitespace.
/// Digit-only keys (with and without leading zeros) are included on purpose.
fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_.-]( ?[a-zA-Z0-9_.-]){0,8}",
        "[0-9]{1,4}",
    ]
}

fn arb_segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        arb_key().prop_map(Segment::Key),
        (0..100_000usize).prop_map(Segment::Index),
    ]
}

fn arb_path() -> impl Strategy<Value = Path> {
    proptest::collection::vec(arb_segment(), 1..6).prop_map(Path::new)
}

/// Dependency facts `(dependent, prerequisite)` that form a DAG (larger ids depend on
/// smaller ones), in random insertion order.
fn arb_acyclic_facts() -> impl Strategy<Value = Vec<(usize, usize)>> {
    proptest::collection::vec((0..20usize, 0..20usize), 0..40)
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.max(b), a.min(b)))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn queue_of(facts: &[(usize, usize)]) -> DependencyQueue<usize> {
    let mut queue = DependencyQueue::new();
    for (dependent, prerequisite) in facts {
        queue.add_dependency(*dependent, [*prerequisite]);
    }
    queue
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Round-trip: parse(format(path)) == path, for any scheme.
    #[test]
    fn format_then_parse(path in arb_path(), scheme in "[a-z]{1,6}") {
        let syntax = Syntax::new(scheme);
        let text = syntax.format(&path);

        prop_assert!(syntax.is_reference(&text), "{}", text);
        prop_assert_eq!(syntax.parse(&text), Some(path));
    }

    /// Segments are the same step exactly when they are written the same way.
    #[test]
    fn segment_identity_is_textual(a in arb_segment(), b in arb_segment()) {
        prop_assert_eq!(a == b, a.to_string() == b.to_string());
    }

    /// Distinct mapping keys never share a slot.
    #[test]
    fn distinct_keys_are_distinct_segments(a in arb_key(), b in arb_key()) {
        prop_assume!(a != b);
        prop_assert_ne!(Segment::Key(a), Segment::Key(b));
    }

    /// Topo invariant: every id exactly once, prerequisites before their dependents.
    #[test]
    fn order_respects_every_fact(facts in arb_acyclic_facts()) {
        let order = queue_of(&facts).topological_order().expect("facts are acyclic");

        let ids: HashSet<usize> = facts.iter().flat_map(|(a, b)| [*a, *b]).collect();
        prop_assert_eq!(order.len(), ids.len());

        let position = |id: usize| order.iter().position(|x| *x == id).expect("id is ordered");
        for (dependent, prerequisite) in &facts {
            prop_assert!(
                position(*prerequisite) < position(*dependent),
                "{} must come before {} in {:?}", prerequisite, dependent, order
            );
        }
    }

    /// Determinism: the same facts in the same order give the same order.
    #[test]
    fn order_is_deterministic(facts in arb_acyclic_facts()) {
        let first = queue_of(&facts).topological_order().expect("facts are acyclic");
        let second = queue_of(&facts).topological_order().expect("facts are acyclic");
        prop_assert_eq!(first, second);
    }

    /// Diamond: whatever the insertion order, the shared prerequisite comes first and the
    /// top comes last.
    #[test]
    fn diamond_in_any_insertion_order(
        facts in Just(vec![("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]).prop_shuffle()
    ) {
        let mut queue = DependencyQueue::new();
        for (dependent, prerequisite) in &facts {
            queue.add_dependency(*dependent, [*prerequisite]);
        }

        let order = queue.topological_order().expect("diamond is acyclic");
        prop_assert_eq!(order.len(), 4);
        prop_assert_eq!(order.first(), Some(&"d"));
        prop_assert_eq!(order.last(), Some(&"a"));
    }

    /// Closing a chain into a ring reports every member of the ring.
    #[test]
    fn ring_reports_all_members(len in 2..12usize) {
        let mut queue = DependencyQueue::new();
        for id in 0..len - 1 {
            queue.add_dependency(id + 1, [id]);
        }
        queue.add_dependency(0, [len - 1]);

        let err = queue.topological_order().expect_err("ring is a cycle");
        let mut members = err.cycle.clone();
        members.sort();
        prop_assert_eq!(members, (0..len).collect::<Vec<_>>());
    }
}
