//! End-to-end tests for the condition engine.
//!
//! Tests cover:
//! - The documented scenarios (crossing, composite, unknown op, squeeze)
//! - Fail-fast compile against fail-soft validation on the same tree
//! - Feature extraction for implicit columns
//! - Strategy compile and scan through a DataPort, in memory and from CSV

mod common;

use common::*;
use stratcond::adapters::csv_adapter::CsvAdapter;
use stratcond::adapters::file_config_adapter::FileConfigAdapter;
use stratcond::domain::condition::parse_nodes;
use stratcond::domain::scan::{ScanOptions, scan, scan_with};
use stratcond::domain::strategy::{PositionState, Signal, build_strategy};
use stratcond::ports::data_port::DataPort;
use stratcond::{
    ConditionError, StratcondError, compile, extract_required_features, parse_and_compile,
    validate_json,
};

const RSI_STRATEGY: &str = r#"
[strategy]
name = RSI reversal
direction = long_only
entry_long = [{"op":"crosses_above","col":"rsi_14","ref":{"value":30}}]
exit_long = [{"op":"crosses_below","col":"rsi_14","ref":{"value":70}}]
"#;

mod scenarios {
    use super::*;

    #[test]
    fn crossing_needs_a_prior_bar() {
        let bars = vec![
            bar_with(bar(0, 10.0, 10.5, 9.5, 10.0), &[("ema_20", 11.0)]),
            bar_with(bar(1, 12.0, 12.5, 11.5, 12.0), &[("ema_20", 11.0)]),
        ];
        let fns = parse_and_compile(
            r#"[{"op":"crosses_above","col":"close","ref":{"col":"ema_20"}}]"#,
        )
        .unwrap();
        assert!(fns[0].eval(&bars, 1));
        assert!(!fns[0].eval(&bars, 0));
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
    fn unknown_operator_is_named() {
        let err = parse_and_compile(r#"[{"op":"foobar"}]"#).unwrap_err();
        assert!(err.to_string().contains("foobar"));
        assert!(matches!(err.root(), ConditionError::UnknownOperator(op) if op == "foobar"));
    }

    #[test]
    fn squeeze_over_trailing_window() {
        let fns = parse_and_compile(r#"[{"op":"squeeze","width_col":"bb_width","lookback":3}]"#)
            .unwrap();
        let bars = column("bb_width", &[10.0, 8.0, 6.0, 4.0]);
        assert!(fns[0].eval(&bars, 3));
    }

    #[test]
    fn null_and_empty_input_compile_to_nothing() {
        assert!(parse_and_compile("null").unwrap().is_empty());
        assert!(parse_and_compile("").unwrap().is_empty());
        assert!(parse_and_compile("[]").unwrap().is_empty());
    }

    #[test]
    fn out_of_range_index_is_false() {
        let fns = parse_and_compile(r#"[{"op":"above","col":"close","ref":{"value":0}}]"#)
            .unwrap();
        let bars = closes(&[1.0, 2.0]);
        assert!(fns[0].eval(&bars, 1));
        assert!(!fns[0].eval(&bars, 2));
        assert!(!fns[0].eval(&[], 0));
    }
}

mod fail_fast_vs_fail_soft {
    use super::*;

    const TWO_PROBLEMS: &str = r#"[
        {"op":"rising","col":"close"},
        {"op":"all_of","conditions":[{"op":"above","col":"rsi_14"}]}
    ]"#;

    #[test]
    fn compile_reports_first_problem_only() {
        let nodes = parse_nodes(TWO_PROBLEMS).unwrap();
        let err = compile(&nodes).unwrap_err();
        assert_eq!(err.to_string(), "condition[0]: rising: missing n");
    }

    #[test]
    fn validate_reports_every_problem() {
        let problems = validate_json(TWO_PROBLEMS);
        assert_eq!(
            problems,
            vec![
                "condition[0]: rising: missing n",
                "condition[1].conditions[0]: above: missing ref",
            ]
        );
    }

    #[test]
    fn valid_tree_compiles_and_validates() {
        let raw = r#"[{"op":"any_of","conditions":[
            {"op":"gap_up"},
            {"op":"held_above","col":"close","threshold":50,"n":3}
        ]}]"#;
        assert!(validate_json(raw).is_empty());
        assert_eq!(parse_and_compile(raw).unwrap().len(), 1);
    }
}

mod features {
    use super::*;

    fn features(raw: &str) -> Vec<String> {
        extract_required_features(&parse_nodes(raw).unwrap())
    }

    #[test]
    fn implicit_columns() {
        assert!(features(r#"[{"op":"gap_up"}]"#).contains(&"atr_14".to_string()));
        assert!(
            features(r#"[{"op":"adx_in_range","low":20,"high":30}]"#)
                .contains(&"adx_14".to_string())
        );
    }

    #[test]
    fn nested_columns_are_sorted_and_unique() {
        let got = features(
            r#"[{"op":"all_of","conditions":[
                {"op":"crosses_above","col":"ema_20","ref":{"col":"ema_50"}},
                {"op":"above","col":"rsi_14","ref":{"value":50}},
                {"op":"any_of","conditions":[{"op":"rising","col":"ema_20","n":3}]}
            ]}]"#,
        );
        assert_eq!(got, vec!["ema_20", "ema_50", "rsi_14"]);
    }
}

mod strategy_scan {
    use super::*;

    fn rsi_bars() -> Vec<stratcond::BarData> {
        column("rsi_14", &[25.0, 35.0, 50.0, 75.0, 65.0, 28.0, 31.0])
    }

    #[test]
    fn scan_through_data_port() {
        let port = MockDataPort::new().with_bars("BHP", rsi_bars());
        let config = FileConfigAdapter::from_string(RSI_STRATEGY).unwrap();
        let strategy = build_strategy(&config).unwrap();

        let bars = port.fetch_series("BHP").unwrap();
        let report = scan(&strategy, &bars);
        let got: Vec<_> = report.events.iter().map(|e| (e.index, e.signal)).collect();
        assert_eq!(
            got,
            vec![
                (1, Signal::EntryLong),
                (4, Signal::ExitLong),
                (6, Signal::EntryLong),
            ]
        );
        assert_eq!(report.final_state, PositionState::Long);
        assert_eq!(report.events[0].timestamp, day(1));
    }

    #[test]
    fn data_port_errors_propagate() {
        let port = MockDataPort::new().with_error("CBA", "delisted");
        let err = port.fetch_series("CBA").unwrap_err();
        assert!(matches!(err, StratcondError::Data { .. }));
        assert!(port.fetch_series("WBC").is_err());
    }

    #[test]
    fn invalid_set_names_the_set() {
        let config = FileConfigAdapter::from_string(
            "[strategy]\nname = broken\nentry_long = [{\"op\":\"rising\",\"col\":\"close\"}]\n",
        )
        .unwrap();
        let err = build_strategy(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "entry_long: condition[0]: rising: missing n"
        );
    }

    #[test]
    fn csv_series_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        write_csv(
            dir.path(),
            "BHP",
            "date,open,high,low,close,volume,rsi_14\n\
             2024-01-03,100,101,99,100,1000,50\n\
             2024-01-01,100,101,99,100,1000,25\n\
             2024-01-02,100,101,99,100,1000,35\n\
             2024-01-04,100,101,99,100,1000,75\n\
             2024-01-05,100,101,99,100,1000,65\n",
        );
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.list_symbols().unwrap(), vec!["BHP"]);

        let config = FileConfigAdapter::from_string(RSI_STRATEGY).unwrap();
        let strategy = build_strategy(&config).unwrap();
        let bars = adapter.fetch_series("BHP").unwrap();
        let report = scan_with(&strategy, &bars, &ScanOptions::default()).unwrap();

        let got: Vec<_> = report
            .events
            .iter()
            .map(|e| (e.timestamp.date().to_string(), e.signal))
            .collect();
        assert_eq!(
            got,
            vec![
                ("2024-01-02".to_string(), Signal::EntryLong),
                ("2024-01-05".to_string(), Signal::ExitLong),
            ]
        );
    }
}
