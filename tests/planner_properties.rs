//! Broader scheduling properties of `core::planner::plan` than the
//! module's own unit tests cover: diamond dependencies, disjoint
//! components, and every scheduled name appearing exactly once.

use fashion::core::planner::{plan, PlanInput};
use std::collections::HashSet;

fn pi(name: &str, inputs: &[&str], outputs: &[&str]) -> PlanInput {
    PlanInput {
        name: name.to_string(),
        input_kinds: inputs.iter().map(|s| s.to_string()).collect(),
        output_kinds: outputs.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn diamond_dependency_respects_both_branches_before_the_join() {
    // a -> b, a -> c, (b, c) -> d
    let xforms = vec![
        pi("a", &[], &["x"]),
        pi("b", &["x"], &["y"]),
        pi("c", &["x"], &["z"]),
        pi("d", &["y", "z"], &[]),
    ];
    let result = plan(&xforms);
    assert!(result.valid);
    let pos = |n: &str| result.exec_list.iter().position(|x| x == n).unwrap();
    assert!(pos("a") < pos("b"));
    assert!(pos("a") < pos("c"));
    assert!(pos("b") < pos("d"));
    assert!(pos("c") < pos("d"));
}

#[test]
fn disjoint_components_both_get_scheduled() {
    let xforms = vec![pi("p1", &[], &["x"]), pi("c1", &["x"], &[]), pi("p2", &[], &["y"]), pi("c2", &["y"], &[])];
    let result = plan(&xforms);
    assert!(result.valid);
    assert_eq!(result.exec_list.len(), 4);
}

#[test]
fn every_transform_appears_exactly_once() {
    let xforms = vec![
        pi("a", &[], &["x", "y"]),
        pi("b", &["x"], &["z"]),
        pi("c", &["y"], &["z"]),
        pi("d", &["z"], &[]),
    ];
    let result = plan(&xforms);
    assert!(result.valid);
    let mut seen = HashSet::new();
    for name in &result.exec_list {
        assert!(seen.insert(name.clone()), "{} scheduled more than once", name);
    }
    assert_eq!(seen.len(), xforms.len());
}

#[test]
fn a_transform_with_no_inputs_or_outputs_is_always_schedulable() {
    let xforms = vec![pi("standalone", &[], &[])];
    let result = plan(&xforms);
    assert!(result.valid);
    assert_eq!(result.exec_list, vec!["standalone".to_string()]);
}

#[test]
fn partial_cycle_still_schedules_the_unrelated_rest() {
    // a <-> b cycle; c is independent and must still be scheduled.
    let xforms = vec![pi("a", &["y"], &["x"]), pi("b", &["x"], &["y"]), pi("c", &[], &[])];
    let result = plan(&xforms);
    assert!(!result.valid);
    assert!(result.exec_list.contains(&"c".to_string()));
    assert_eq!(result.unscheduled, vec!["a".to_string(), "b".to_string()]);
}
