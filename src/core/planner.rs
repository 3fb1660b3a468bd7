//! Execution planner — orders transform objects into rounds by their
//! declared input/output kinds.
//!
//! Grounded on `original_source/fashion/runway.py`'s `plan()`. A kind only
//! becomes "available" once every transform that produces it has been
//! scheduled, not as soon as the first producer runs — a kind with two
//! producers behaves like a multi-writer append-only stream that
//! downstream readers must wait to be fully appended before they're ready.
//! This is stricter than a bare topological sort over individual edges.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct PlanInput {
    pub name: String,
    pub input_kinds: Vec<String>,
    pub output_kinds: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Transform names in the order they should run. Members of the same
    /// round have no relative order constraint between them.
    pub exec_list: Vec<String>,
    pub leaf_inputs: HashSet<String>,
    pub leaf_outputs: HashSet<String>,
    pub intermediate: HashSet<String>,
    /// True iff every transform was scheduled (no cycle).
    pub valid: bool,
    /// Transforms left unscheduled because of a dependency cycle.
    pub unscheduled: Vec<String>,
}

pub fn plan(xforms: &[PlanInput]) -> ExecutionPlan {
    let xf_outputs: HashMap<&str, HashSet<&str>> =
        xforms.iter().map(|x| (x.name.as_str(), x.output_kinds.iter().map(|s| s.as_str()).collect())).collect();
    let xf_inputs: HashMap<&str, HashSet<&str>> =
        xforms.iter().map(|x| (x.name.as_str(), x.input_kinds.iter().map(|s| s.as_str()).collect())).collect();
    let xf_names: HashSet<&str> = xforms.iter().map(|x| x.name.as_str()).collect();

    let all_outputs: HashSet<&str> = xf_outputs.values().flatten().copied().collect();
    let all_inputs: HashSet<&str> = xf_inputs.values().flatten().copied().collect();

    let leaf_inputs: HashSet<&str> = all_inputs.difference(&all_outputs).copied().collect();
    let leaf_outputs: HashSet<&str> = all_outputs.difference(&all_inputs).copied().collect();
    let intermediate: HashSet<&str> = all_inputs.intersection(&all_outputs).copied().collect();

    let mut xf_by_output: HashMap<&str, HashSet<&str>> = HashMap::new();
    for (name, kinds) in &xf_outputs {
        for k in kinds {
            xf_by_output.entry(k).or_default().insert(name);
        }
    }

    let mut avail_inputs: HashSet<&str> = leaf_inputs.clone();
    let mut avail_xforms: HashSet<&str> = xf_names.clone();
    let mut exec_list: Vec<&str> = Vec::new();

    loop {
        let ready: HashSet<&str> =
            avail_xforms.iter().filter(|name| xf_inputs[*name].is_subset(&avail_inputs)).copied().collect();
        if ready.is_empty() {
            break;
        }
        for name in &ready {
            avail_xforms.remove(name);
        }
        let mut ordered_ready: Vec<&str> = ready.iter().copied().collect();
        ordered_ready.sort_unstable();
        exec_list.extend(ordered_ready);

        let mut ready_outputs: HashSet<&str> = HashSet::new();
        for name in &ready {
            ready_outputs.extend(xf_outputs[name].iter().copied());
        }
        for outp in ready_outputs {
            let all_producers_scheduled = xf_by_output
                .get(outp)
                .map_or(true, |producers| producers.iter().all(|p| !avail_xforms.contains(p)));
            if all_producers_scheduled {
                avail_inputs.insert(outp);
            }
        }
    }

    let valid = avail_xforms.is_empty();
    let mut unscheduled: Vec<String> = avail_xforms.iter().map(|s| s.to_string()).collect();
    unscheduled.sort();

    ExecutionPlan {
        exec_list: exec_list.into_iter().map(|s| s.to_string()).collect(),
        leaf_inputs: leaf_inputs.into_iter().map(|s| s.to_string()).collect(),
        leaf_outputs: leaf_outputs.into_iter().map(|s| s.to_string()).collect(),
        intermediate: intermediate.into_iter().map(|s| s.to_string()).collect(),
        valid,
        unscheduled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pi(name: &str, inputs: &[&str], outputs: &[&str]) -> PlanInput {
        PlanInput {
            name: name.to_string(),
            input_kinds: inputs.iter().map(|s| s.to_string()).collect(),
            output_kinds: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn linear_chain_schedules_in_order() {
        let xforms = vec![pi("b", &["x"], &["y"]), pi("a", &[], &["x"]), pi("c", &["y"], &[])];
        let plan = plan(&xforms);
        assert!(plan.valid);
        let pos = |n: &str| plan.exec_list.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn a_kind_waits_for_every_producer() {
        let xforms =
            vec![pi("p1", &[], &["shared"]), pi("p2", &["gate"], &["shared"]), pi("consumer", &["shared"], &[])];
        let plan = plan(&xforms);
        assert!(plan.valid);
        let pos = |n: &str| plan.exec_list.iter().position(|x| x == n).unwrap();
        assert!(pos("p1") < pos("consumer"));
        assert!(pos("p2") < pos("consumer"));
    }

    #[test]
    fn cycle_leaves_transforms_unscheduled() {
        let xforms = vec![pi("a", &["y"], &["x"]), pi("b", &["x"], &["y"])];
        let plan = plan(&xforms);
        assert!(!plan.valid);
        assert_eq!(plan.unscheduled.len(), 2);
    }

    #[test]
    fn leaf_and_intermediate_kinds_classified() {
        let xforms = vec![pi("a", &["in"], &["mid"]), pi("b", &["mid"], &["out"])];
        let plan = plan(&xforms);
        assert!(plan.leaf_inputs.contains("in"));
        assert!(plan.leaf_outputs.contains("out"));
        assert!(plan.intermediate.contains("mid"));
    }
}
