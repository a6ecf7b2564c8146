//! Condition compiler: turns a node tree into runtime predicates.
//!
//! Compilation is fail-fast. The first problem aborts the whole compile and
//! comes back wrapped with the index path of the offending node, e.g.
//! `condition[0].conditions[1]: rising: missing n`.

use tracing::debug;

use crate::domain::condition::{ConditionNode, parse_nodes};
use crate::domain::error::ConditionError;
use crate::domain::operators::{ConditionFn, Operand};
use crate::domain::registry::{self, Family};

/// Compiles each node in order into one predicate per node.
pub fn compile(nodes: &[ConditionNode]) -> Result<Vec<ConditionFn>, ConditionError> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| compile_node(node, &format!("condition[{i}]")))
        .collect()
}

/// Parses a JSON condition array and compiles it. Empty input and `null`
/// yield no predicates; malformed JSON is an error.
pub fn parse_and_compile(raw: &str) -> Result<Vec<ConditionFn>, ConditionError> {
    let nodes = parse_nodes(raw)?;
    compile(&nodes)
}

/// Resolves a node's `ref` into an operand. A column wins over a value.
pub fn resolve_ref(node: &ConditionNode) -> Result<Operand, ConditionError> {
    let Some(r) = &node.reference else {
        return Err(ConditionError::MissingRef {
            op: node.op.clone(),
        });
    };
    if let Some(col) = r.column() {
        return Ok(Operand::Column(col.to_string()));
    }
    r.value
        .map(Operand::Constant)
        .ok_or_else(|| ConditionError::InvalidRef {
            op: node.op.clone(),
        })
}

fn compile_node(node: &ConditionNode, path: &str) -> Result<ConditionFn, ConditionError> {
    if node.op.is_empty() {
        return Err(ConditionError::MissingOp.at(path));
    }
    let spec = registry::lookup(&node.op)
        .ok_or_else(|| ConditionError::UnknownOperator(node.op.clone()).at(path))?;
    if let Some(err) = registry::check_required(spec, node).into_iter().next() {
        return Err(err.at(path));
    }

    let children = if spec.family == Family::Composite {
        compile_children(&node.conditions, path)?
    } else {
        Vec::new()
    };

    debug!(path, op = spec.name, family = %spec.family, "compiled condition");
    (spec.build)(node, children).map_err(|e| e.at(path))
}

/// Errors come back already wrapped with the full child path.
fn compile_children(
    nodes: &[ConditionNode],
    path: &str,
) -> Result<Vec<ConditionFn>, ConditionError> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, child)| compile_node(child, &format!("{path}.conditions[{i}]")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::Ref;
    use crate::domain::operators::test_support::*;

    fn nodes(raw: &str) -> Vec<ConditionNode> {
        parse_nodes(raw).unwrap()
    }

    #[test]
    fn compiles_crosses_above() {
        let fns = parse_and_compile(
            r#"[{"op":"crosses_above","col":"close","ref":{"col":"ema_20"}}]"#,
        )
        .unwrap();
        let bars = vec![
            with(bar(10.0, 10.0, 10.0, 10.0), &[("ema_20", 11.0)]),
            with(bar(12.0, 12.0, 12.0, 12.0), &[("ema_20", 11.0)]),
        ];
        assert_eq!(fns.len(), 1);
        assert!(!fns[0].eval(&bars, 0));
        assert!(fns[0].eval(&bars, 1));
    }

    #[test]
    fn composite_all_of() {
        let fns = parse_and_compile(
            r#"[{"op":"all_of","conditions":[
                {"op":"above","col":"rsi_14","ref":{"value":30}},
                {"op":"below","col":"rsi_14","ref":{"value":70}}
            ]}]"#,
        )
        .unwrap();
        assert!(fns[0].eval(&column("rsi_14", &[55.0]), 0));
        assert!(!fns[0].eval(&column("rsi_14", &[25.0]), 0));
    }

    #[test]
    fn unknown_operator_names_the_tag() {
        let err = compile(&nodes(r#"[{"op":"foobar"}]"#)).unwrap_err();
        assert!(err.to_string().contains("foobar"));
        assert_eq!(err.root(), &ConditionError::UnknownOperator("foobar".into()));
    }

    #[test]
    fn missing_op() {
        let err = compile(&nodes(r#"[{"col":"close"}]"#)).unwrap_err();
        assert_eq!(err.to_string(), "condition[0]: missing op");
    }

    #[test]
    fn error_path_points_at_index() {
        let err = compile(&nodes(
            r#"[{"op":"rising","col":"close","n":3},{"op":"rising","col":"close"}]"#,
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "condition[1]: rising: missing n");
    }

    #[test]
    fn nested_error_path() {
        let err = compile(&nodes(
            r#"[{"op":"all_of","conditions":[
                {"op":"above","col":"rsi_14","ref":{"value":30}},
                {"op":"rising","n":3}
            ]}]"#,
        ))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "condition[0].conditions[1]: rising: missing col"
        );
    }

    #[test]
    fn fail_fast_returns_first_error() {
        let err = compile(&nodes(r#"[{"op":"rising","n":3},{"op":"squeeze"}]"#)).unwrap_err();
        assert_eq!(
            err.root(),
            &ConditionError::MissingField {
                op: "rising".into(),
                field: "col"
            }
        );
    }

    #[test]
    fn empty_composite_is_an_error() {
        let err = compile(&nodes(r#"[{"op":"all_of","conditions":[]}]"#)).unwrap_err();
        assert_eq!(
            err.root(),
            &ConditionError::EmptyCompositeChildren { op: "all_of".into() }
        );
    }

    #[test]
    fn null_and_empty_compile_to_nothing() {
        assert!(parse_and_compile("null").unwrap().is_empty());
        assert!(parse_and_compile("").unwrap().is_empty());
        assert!(parse_and_compile("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            parse_and_compile("[{"),
            Err(ConditionError::MalformedJson(_))
        ));
    }

    #[test]
    fn resolve_ref_prefers_column() {
        let node = ConditionNode {
            reference: Some(Ref {
                col: Some("ema_20".into()),
                value: Some(1.0),
            }),
            ..ConditionNode::new("above")
        };
        assert_eq!(resolve_ref(&node), Ok(Operand::Column("ema_20".into())));
        let node = ConditionNode {
            reference: Some(Ref::value(30.0)),
            ..ConditionNode::new("above")
        };
        assert_eq!(resolve_ref(&node), Ok(Operand::Constant(30.0)));
    }

    #[test]
    fn squeeze_default_lookback() {
        let fns = parse_and_compile(r#"[{"op":"squeeze","width_col":"bb_width"}]"#).unwrap();
        let mut widths: Vec<f64> = (0..60).map(|i| 100.0 - i as f64).collect();
        let bars = column("bb_width", &widths);
        assert!(!fns[0].eval(&bars, 59));
        widths.push(1.0);
        let bars = column("bb_width", &widths);
        assert!(fns[0].eval(&bars, 60));
    }

    #[test]
    fn divergence_default_lookback() {
        let fns = parse_and_compile(r#"[{"op":"bullish_divergence","indicator_col":"rsi_14"}]"#)
            .unwrap();
        let mut bars = column("rsi_14", &[30.0; 15]);
        bars[0] = with(bar(100.0, 101.0, 95.0, 100.0), &[("rsi_14", 25.0)]);
        bars[14] = with(bar(94.0, 95.0, 93.0, 94.0), &[("rsi_14", 31.0)]);
        assert!(!fns[0].eval(&bars, 13));
        assert!(fns[0].eval(&bars, 14));
    }

    #[test]
    fn every_registered_operator_compiles_when_complete() {
        for spec in registry::operators() {
            let node = ConditionNode {
                col: Some("close".into()),
                reference: Some(Ref::value(1.0)),
                n: Some(2),
                lookback: Some(3),
                level_col: Some("ema_20".into()),
                indicator_col: Some("rsi_14".into()),
                pattern_col: Some("cdl_doji".into()),
                width_col: Some("bb_width".into()),
                ref_col: Some("ema_20".into()),
                pct: Some(0.3),
                factor: Some(0.8),
                conditions: vec![ConditionNode {
                    col: Some("close".into()),
                    n: Some(2),
                    ..ConditionNode::new("rising")
                }],
                ..ConditionNode::new(spec.name)
            };
            assert!(compile(&[node]).is_ok(), "{}", spec.name);
        }
    }
}
