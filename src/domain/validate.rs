//! Fail-soft validation for editors.
//!
//! Runs the same required-field checks as the compiler but keeps going after
//! a problem, so every issue in a tree is reported at once. No predicates are
//! built, and partially filled trees are fine to pass in.

use crate::domain::condition::{ConditionNode, parse_nodes};
use crate::domain::error::ConditionError;
use crate::domain::registry::{self, Family};

/// Decodes and validates a JSON condition array. `null` or empty input is valid.
pub fn validate_json(raw: &str) -> Vec<String> {
    match parse_nodes(raw) {
        Ok(nodes) => validate_conditions(&nodes),
        Err(err) => vec![err.to_string()],
    }
}

/// Every structural problem in the tree as `"<path>: <problem>"`. Empty means valid.
pub fn validate_conditions(nodes: &[ConditionNode]) -> Vec<String> {
    let mut problems = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        validate_node(node, &format!("condition[{i}]"), &mut problems);
    }
    problems
        .into_iter()
        .map(|err| err.to_string())
        .collect()
}

fn validate_node(node: &ConditionNode, path: &str, problems: &mut Vec<ConditionError>) {
    if node.op.is_empty() {
        problems.push(ConditionError::MissingOp.at(path));
        return;
    }
    // An unknown operator's fields are unknowable, so its children are skipped.
    let Some(spec) = registry::lookup(&node.op) else {
        problems.push(ConditionError::UnknownOperator(node.op.clone()).at(path));
        return;
    };
    problems.extend(
        registry::check_required(spec, node)
            .into_iter()
            .map(|err| err.at(path)),
    );
    // Leaf operators ignore `conditions`, so stray children are not checked.
    if spec.family != Family::Composite {
        return;
    }
    for (i, child) in node.conditions.iter().enumerate() {
        validate_node(child, &format!("{path}.conditions[{i}]"), problems);
    }
}
