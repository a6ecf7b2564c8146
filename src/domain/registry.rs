//! Operator registry.
//!
//! One static table maps each operator tag to its family, its required
//! fields, the indicator columns it reads implicitly, and its constructor.
//! The compiler, the validator and the feature extractor all read this table,
//! so an operator's field rules live in exactly one place.

use std::fmt;

use crate::domain::compiler::resolve_ref;
use crate::domain::condition::ConditionNode;
use crate::domain::error::ConditionError;
use crate::domain::operators::{
    self, ADX, ATR, ATR_SMA, BB_LOWER, BB_UPPER, BB_WIDTH, ConditionFn, EMA_FAST, EMA_SLOW,
    MACD_HIST, RSI, Side, TRIX, channel, comparison, oscillator, price_action, trend, volatility,
};

/// Lookback used by divergence and was-then-crosses operators when unset.
pub const DEFAULT_LOOKBACK: usize = 14;
/// Lookback used by `squeeze` when unset.
pub const DEFAULT_SQUEEZE_LOOKBACK: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Family {
    Comparison,
    Composite,
    Trend,
    PriceAction,
    Volatility,
    Channel,
    Oscillator,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Comparison => "comparison",
            Family::Composite => "composite",
            Family::Trend => "trend",
            Family::PriceAction => "price_action",
            Family::Volatility => "volatility",
            Family::Channel => "channel",
            Family::Oscillator => "oscillator",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node field an operator cannot be compiled without.
///
/// String fields count as present when non-empty; numeric fields when `> 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Col,
    Ref,
    N,
    Lookback,
    LevelCol,
    IndicatorCol,
    PatternCol,
    WidthCol,
    RefCol,
    Pct,
    Factor,
    Conditions,
}

impl Field {
    /// JSON key of the field.
    pub fn name(self) -> &'static str {
        match self {
            Field::Col => "col",
            Field::Ref => "ref",
            Field::N => "n",
            Field::Lookback => "lookback",
            Field::LevelCol => "level_col",
            Field::IndicatorCol => "indicator_col",
            Field::PatternCol => "pattern_col",
            Field::WidthCol => "width_col",
            Field::RefCol => "ref_col",
            Field::Pct => "pct",
            Field::Factor => "factor",
            Field::Conditions => "conditions",
        }
    }

    fn text(self, node: &ConditionNode) -> Option<&str> {
        match self {
            Field::Col => node.col(),
            Field::LevelCol => node.level_col(),
            Field::IndicatorCol => node.indicator_col(),
            Field::PatternCol => node.pattern_col(),
            Field::WidthCol => node.width_col(),
            Field::RefCol => node.ref_col(),
            _ => None,
        }
    }

    fn count(self, node: &ConditionNode) -> Option<usize> {
        match self {
            Field::N => node.n(),
            Field::Lookback => node.lookback(),
            _ => None,
        }
    }

    fn amount(self, node: &ConditionNode) -> Option<f64> {
        match self {
            Field::Pct => node.pct(),
            Field::Factor => node.factor(),
            _ => None,
        }
    }

    fn missing(self, op: &str) -> ConditionError {
        let op = op.to_string();
        match self {
            Field::Ref => ConditionError::MissingRef { op },
            Field::Conditions => ConditionError::EmptyCompositeChildren { op },
            field => ConditionError::MissingField {
                op,
                field: field.name(),
            },
        }
    }

    /// The problem with this field on `node`, if any.
    fn problem(self, node: &ConditionNode) -> Option<ConditionError> {
        let present = match self {
            Field::Ref => {
                return match &node.reference {
                    None => Some(self.missing(&node.op)),
                    Some(r) if r.column().is_none() && r.value.is_none() => {
                        Some(ConditionError::InvalidRef {
                            op: node.op.clone(),
                        })
                    }
                    Some(_) => None,
                };
            }
            Field::Conditions => !node.conditions.is_empty(),
            Field::N | Field::Lookback => self.count(node).is_some(),
            Field::Pct | Field::Factor => self.amount(node).is_some(),
            _ => self.text(node).is_some(),
        };
        (!present).then(|| self.missing(&node.op))
    }
}

/// Builds a predicate from a node whose required fields are present.
/// Composite operators receive their already-compiled children.
pub type Build = fn(&ConditionNode, Vec<ConditionFn>) -> Result<ConditionFn, ConditionError>;

pub struct OpSpec {
    pub name: &'static str,
    pub family: Family,
    pub required: &'static [Field],
    /// Indicator columns read without being named on the node.
    pub implicit_features: &'static [&'static str],
    pub build: Build,
}

impl fmt::Debug for OpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpSpec")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("required", &self.required)
            .field("implicit_features", &self.implicit_features)
            .finish()
    }
}

fn text(node: &ConditionNode, field: Field) -> Result<String, ConditionError> {
    field
        .text(node)
        .map(str::to_string)
        .ok_or_else(|| field.missing(&node.op))
}

fn count(node: &ConditionNode, field: Field) -> Result<usize, ConditionError> {
    field.count(node).ok_or_else(|| field.missing(&node.op))
}

fn amount(node: &ConditionNode, field: Field) -> Result<f64, ConditionError> {
    field.amount(node).ok_or_else(|| field.missing(&node.op))
}

const ATR_ONLY: &[&str] = &[ATR];
const RIBBON: &[&str] = &[ATR, EMA_FAST, EMA_SLOW];
const MAJORITY: &[&str] = &[EMA_FAST, EMA_SLOW, RSI, MACD_HIST];

static OPERATORS: &[OpSpec] = &[
    // comparison
    OpSpec {
        name: "crosses_above",
        family: Family::Comparison,
        required: &[Field::Col, Field::Ref],
        implicit_features: &[],
        build: |n, _| Ok(comparison::crosses(text(n, Field::Col)?, resolve_ref(n)?, Side::Up)),
    },
    OpSpec {
        name: "crosses_below",
        family: Family::Comparison,
        required: &[Field::Col, Field::Ref],
        implicit_features: &[],
        build: |n, _| Ok(comparison::crosses(text(n, Field::Col)?, resolve_ref(n)?, Side::Down)),
    },
    OpSpec {
        name: "above",
        family: Family::Comparison,
        required: &[Field::Col, Field::Ref],
        implicit_features: &[],
        build: |n, _| Ok(comparison::compare(text(n, Field::Col)?, resolve_ref(n)?, Side::Up)),
    },
    OpSpec {
        name: "below",
        family: Family::Comparison,
        required: &[Field::Col, Field::Ref],
        implicit_features: &[],
        build: |n, _| Ok(comparison::compare(text(n, Field::Col)?, resolve_ref(n)?, Side::Down)),
    },
    OpSpec {
        name: "breaks_above_level",
        family: Family::Comparison,
        required: &[Field::LevelCol],
        implicit_features: &[],
        build: |n, _| Ok(comparison::breaks_level(text(n, Field::LevelCol)?, Side::Up)),
    },
    OpSpec {
        name: "breaks_below_level",
        family: Family::Comparison,
        required: &[Field::LevelCol],
        implicit_features: &[],
        build: |n, _| Ok(comparison::breaks_level(text(n, Field::LevelCol)?, Side::Down)),
    },
    // composite
    OpSpec {
        name: "all_of",
        family: Family::Composite,
        required: &[Field::Conditions],
        implicit_features: &[],
        build: |_, children| Ok(operators::all_of(children)),
    },
    OpSpec {
        name: "any_of",
        family: Family::Composite,
        required: &[Field::Conditions],
        implicit_features: &[],
        build: |_, children| Ok(operators::any_of(children)),
    },
    // trend
    OpSpec {
        name: "rising",
        family: Family::Trend,
        required: &[Field::Col, Field::N],
        implicit_features: &[],
        build: |n, _| Ok(trend::directional(text(n, Field::Col)?, count(n, Field::N)?, Side::Up)),
    },
    OpSpec {
        name: "falling",
        family: Family::Trend,
        required: &[Field::Col, Field::N],
        implicit_features: &[],
        build: |n, _| Ok(trend::directional(text(n, Field::Col)?, count(n, Field::N)?, Side::Down)),
    },
    OpSpec {
        name: "consecutive_higher_closes",
        family: Family::Trend,
        required: &[Field::N],
        implicit_features: &[],
        build: |n, _| Ok(trend::consecutive_closes(count(n, Field::N)?, Side::Up)),
    },
    OpSpec {
        name: "consecutive_lower_closes",
        family: Family::Trend,
        required: &[Field::N],
        implicit_features: &[],
        build: |n, _| Ok(trend::consecutive_closes(count(n, Field::N)?, Side::Down)),
    },
    OpSpec {
        name: "held_above",
        family: Family::Trend,
        required: &[Field::Col, Field::N],
        implicit_features: &[],
        build: |n, _| {
            Ok(trend::held(text(n, Field::Col)?, n.threshold(), count(n, Field::N)?, Side::Up))
        },
    },
    OpSpec {
        name: "held_below",
        family: Family::Trend,
        required: &[Field::Col, Field::N],
        implicit_features: &[],
        build: |n, _| {
            Ok(trend::held(text(n, Field::Col)?, n.threshold(), count(n, Field::N)?, Side::Down))
        },
    },
    OpSpec {
        name: "was_below_then_crosses_above",
        family: Family::Trend,
        required: &[Field::Col],
        implicit_features: &[],
        build: |n, _| {
            Ok(trend::was_then_crosses(
                text(n, Field::Col)?,
                n.threshold(),
                n.lookback_or(DEFAULT_LOOKBACK),
                Side::Up,
            ))
        },
    },
    OpSpec {
        name: "was_above_then_crosses_below",
        family: Family::Trend,
        required: &[Field::Col],
        implicit_features: &[],
        build: |n, _| {
            Ok(trend::was_then_crosses(
                text(n, Field::Col)?,
                n.threshold(),
                n.lookback_or(DEFAULT_LOOKBACK),
                Side::Down,
            ))
        },
    },
    OpSpec {
        name: "flat_slope",
        family: Family::Trend,
        required: &[Field::Col],
        implicit_features: &[],
        build: |n, _| Ok(trend::flat_slope(text(n, Field::Col)?, n.epsilon())),
    },
    // price action
    OpSpec {
        name: "pullback_to",
        family: Family::PriceAction,
        required: &[Field::LevelCol],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(price_action::pullback(text(n, Field::LevelCol)?, n.tolerance_atr_mult(), Side::Up))
        },
    },
    OpSpec {
        name: "pullback_below",
        family: Family::PriceAction,
        required: &[Field::LevelCol],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(price_action::pullback(text(n, Field::LevelCol)?, n.tolerance_atr_mult(), Side::Down))
        },
    },
    OpSpec {
        name: "candle_bullish",
        family: Family::PriceAction,
        required: &[Field::PatternCol],
        implicit_features: &[],
        build: |n, _| Ok(price_action::candle(text(n, Field::PatternCol)?, Side::Up)),
    },
    OpSpec {
        name: "candle_bearish",
        family: Family::PriceAction,
        required: &[Field::PatternCol],
        implicit_features: &[],
        build: |n, _| Ok(price_action::candle(text(n, Field::PatternCol)?, Side::Down)),
    },
    OpSpec {
        name: "gap_up",
        family: Family::PriceAction,
        required: &[],
        implicit_features: ATR_ONLY,
        build: |n, _| Ok(price_action::gap(n.atr_mult(), Side::Up)),
    },
    OpSpec {
        name: "gap_down",
        family: Family::PriceAction,
        required: &[],
        implicit_features: ATR_ONLY,
        build: |n, _| Ok(price_action::gap(n.atr_mult(), Side::Down)),
    },
    OpSpec {
        name: "in_top_pct_of_range",
        family: Family::PriceAction,
        required: &[Field::Pct],
        implicit_features: &[],
        build: |n, _| Ok(price_action::in_pct_of_range(amount(n, Field::Pct)?, Side::Up)),
    },
    OpSpec {
        name: "in_bottom_pct_of_range",
        family: Family::PriceAction,
        required: &[Field::Pct],
        implicit_features: &[],
        build: |n, _| Ok(price_action::in_pct_of_range(amount(n, Field::Pct)?, Side::Down)),
    },
    OpSpec {
        name: "narrowest_range",
        family: Family::PriceAction,
        required: &[Field::Lookback],
        implicit_features: &[],
        build: |n, _| Ok(price_action::narrowest_range(count(n, Field::Lookback)?)),
    },
    OpSpec {
        name: "range_exceeds_atr",
        family: Family::PriceAction,
        required: &[],
        implicit_features: ATR_ONLY,
        build: |n, _| Ok(price_action::range_exceeds_atr(n.multiplier())),
    },
    // volatility
    OpSpec {
        name: "squeeze",
        family: Family::Volatility,
        required: &[Field::WidthCol],
        implicit_features: &[],
        build: |n, _| {
            Ok(volatility::squeeze(
                text(n, Field::WidthCol)?,
                n.lookback_or(DEFAULT_SQUEEZE_LOOKBACK),
            ))
        },
    },
    OpSpec {
        name: "bb_width_increasing",
        family: Family::Volatility,
        required: &[Field::N],
        implicit_features: &[BB_WIDTH],
        build: |n, _| Ok(volatility::bb_width_increasing(count(n, Field::N)?)),
    },
    OpSpec {
        name: "adx_in_range",
        family: Family::Volatility,
        required: &[],
        implicit_features: &[ADX],
        build: |n, _| {
            Ok(volatility::adx_in_range(
                n.low.unwrap_or(0.0),
                n.high.unwrap_or(0.0),
            ))
        },
    },
    OpSpec {
        name: "atr_not_bottom_pct",
        family: Family::Volatility,
        required: &[Field::Pct, Field::Lookback],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(volatility::atr_not_bottom_pct(
                amount(n, Field::Pct)?,
                count(n, Field::Lookback)?,
            ))
        },
    },
    OpSpec {
        name: "atr_below_contracted_sma",
        family: Family::Volatility,
        required: &[Field::Factor],
        implicit_features: &[ATR, ATR_SMA],
        build: |n, _| Ok(volatility::atr_below_contracted_sma(amount(n, Field::Factor)?)),
    },
    // channel
    OpSpec {
        name: "deviation_below",
        family: Family::Channel,
        required: &[Field::Col, Field::RefCol],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(channel::deviation(
                text(n, Field::Col)?,
                text(n, Field::RefCol)?,
                n.atr_mult(),
                Side::Down,
            ))
        },
    },
    OpSpec {
        name: "deviation_above",
        family: Family::Channel,
        required: &[Field::Col, Field::RefCol],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(channel::deviation(
                text(n, Field::Col)?,
                text(n, Field::RefCol)?,
                n.atr_mult(),
                Side::Up,
            ))
        },
    },
    OpSpec {
        name: "close_above_upper_channel",
        family: Family::Channel,
        required: &[Field::Col],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(channel::close_outside_channel(text(n, Field::Col)?, n.multiplier(), Side::Up))
        },
    },
    OpSpec {
        name: "close_below_lower_channel",
        family: Family::Channel,
        required: &[Field::Col],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(channel::close_outside_channel(text(n, Field::Col)?, n.multiplier(), Side::Down))
        },
    },
    OpSpec {
        name: "breaks_above_sma_envelope",
        family: Family::Channel,
        required: &[Field::Col],
        implicit_features: ATR_ONLY,
        build: |n, _| Ok(channel::breaks_envelope(text(n, Field::Col)?, n.multiplier(), Side::Up)),
    },
    OpSpec {
        name: "breaks_below_sma_envelope",
        family: Family::Channel,
        required: &[Field::Col],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(channel::breaks_envelope(text(n, Field::Col)?, n.multiplier(), Side::Down))
        },
    },
    OpSpec {
        name: "ribbon_break_long",
        family: Family::Channel,
        required: &[Field::Lookback],
        implicit_features: RIBBON,
        build: |n, _| {
            Ok(channel::ribbon_break(count(n, Field::Lookback)?, n.multiplier(), Side::Up))
        },
    },
    OpSpec {
        name: "ribbon_break_short",
        family: Family::Channel,
        required: &[Field::Lookback],
        implicit_features: RIBBON,
        build: |n, _| {
            Ok(channel::ribbon_break(count(n, Field::Lookback)?, n.multiplier(), Side::Down))
        },
    },
    OpSpec {
        name: "ribbon_exit_long",
        family: Family::Channel,
        required: &[],
        implicit_features: RIBBON,
        build: |n, _| Ok(channel::ribbon_exit(n.multiplier(), Side::Up)),
    },
    OpSpec {
        name: "ribbon_exit_short",
        family: Family::Channel,
        required: &[],
        implicit_features: RIBBON,
        build: |n, _| Ok(channel::ribbon_exit(n.multiplier(), Side::Down)),
    },
    OpSpec {
        name: "mean_rev_long",
        family: Family::Channel,
        required: &[Field::RefCol],
        implicit_features: ATR_ONLY,
        build: |n, _| Ok(channel::mean_reversion(text(n, Field::RefCol)?, n.multiplier(), Side::Up)),
    },
    OpSpec {
        name: "mean_rev_short",
        family: Family::Channel,
        required: &[Field::RefCol],
        implicit_features: ATR_ONLY,
        build: |n, _| {
            Ok(channel::mean_reversion(text(n, Field::RefCol)?, n.multiplier(), Side::Down))
        },
    },
    // oscillator
    OpSpec {
        name: "bullish_divergence",
        family: Family::Oscillator,
        required: &[Field::IndicatorCol],
        implicit_features: &[],
        build: |n, _| {
            Ok(oscillator::divergence(
                text(n, Field::IndicatorCol)?,
                n.lookback_or(DEFAULT_LOOKBACK),
                Side::Up,
            ))
        },
    },
    OpSpec {
        name: "bearish_divergence",
        family: Family::Oscillator,
        required: &[Field::IndicatorCol],
        implicit_features: &[],
        build: |n, _| {
            Ok(oscillator::divergence(
                text(n, Field::IndicatorCol)?,
                n.lookback_or(DEFAULT_LOOKBACK),
                Side::Down,
            ))
        },
    },
    OpSpec {
        name: "trix_crosses_above_sma",
        family: Family::Oscillator,
        required: &[],
        implicit_features: &[TRIX],
        build: |_, _| Ok(oscillator::trix_cross(Side::Up)),
    },
    OpSpec {
        name: "trix_crosses_below_sma",
        family: Family::Oscillator,
        required: &[],
        implicit_features: &[TRIX],
        build: |_, _| Ok(oscillator::trix_cross(Side::Down)),
    },
    OpSpec {
        name: "double_tap_below_bb",
        family: Family::Oscillator,
        required: &[Field::Lookback],
        implicit_features: &[BB_LOWER],
        build: |n, _| Ok(oscillator::double_tap(count(n, Field::Lookback)?, Side::Down)),
    },
    OpSpec {
        name: "double_tap_above_bb",
        family: Family::Oscillator,
        required: &[Field::Lookback],
        implicit_features: &[BB_UPPER],
        build: |n, _| Ok(oscillator::double_tap(count(n, Field::Lookback)?, Side::Up)),
    },
    OpSpec {
        name: "majority_bull",
        family: Family::Oscillator,
        required: &[],
        implicit_features: MAJORITY,
        build: |_, _| Ok(oscillator::majority(Side::Up)),
    },
    OpSpec {
        name: "majority_bear",
        family: Family::Oscillator,
        required: &[],
        implicit_features: MAJORITY,
        build: |_, _| Ok(oscillator::majority(Side::Down)),
    },
];

/// Looks up an operator by its tag.
pub fn lookup(op: &str) -> Option<&'static OpSpec> {
    OPERATORS.iter().find(|spec| spec.name == op)
}

/// Every registered operator, in table order.
pub fn operators() -> &'static [OpSpec] {
    OPERATORS
}

/// All required-field problems of `node`, in the order the fields are declared.
pub fn check_required(spec: &OpSpec, node: &ConditionNode) -> Vec<ConditionError> {
    spec.required
        .iter()
        .filter_map(|field| field.problem(node))
        .collect()
}
