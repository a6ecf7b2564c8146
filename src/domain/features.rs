//! Required-feature extraction: every indicator column a condition tree reads.

use std::collections::BTreeSet;

use crate::domain::condition::ConditionNode;
use crate::domain::registry::{self, Family};

/// Walks the whole tree, composite children included, and returns the
/// de-duplicated, sorted column names the data pipeline has to supply.
pub fn extract_required_features(nodes: &[ConditionNode]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    for node in nodes {
        collect(node, &mut seen);
    }
    seen.into_iter().collect()
}

fn collect(node: &ConditionNode, seen: &mut BTreeSet<String>) {
    let named = [
        node.col(),
        node.reference.as_ref().and_then(|r| r.column()),
        node.level_col(),
        node.indicator_col(),
        node.pattern_col(),
        node.width_col(),
        node.ref_col(),
    ];
    seen.extend(named.into_iter().flatten().map(str::to_string));

    let Some(spec) = registry::lookup(&node.op) else {
        return;
    };
    seen.extend(spec.implicit_features.iter().map(|c| c.to_string()));

    if spec.family == Family::Composite {
        for child in &node.conditions {
            collect(child, seen);
        }
    }
}
